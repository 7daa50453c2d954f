//! Error types for the unityver-core library.
//!
//! Only failures that the caller can act on surface here. A probe that simply
//! finds no version at an offset is not an error; it is an absent result.

use std::io::ErrorKind;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for unityver operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for all unityver operations
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Failed to open a candidate file
    #[error("failed to open file '{path}': {source}")]
    FileOpen {
        /// Path to the file that failed to open
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Failed to seek or read while probing an offset
    #[error("I/O error while probing offset {offset:#x}: {source}")]
    Io {
        /// Offset being probed when the error occurred
        offset: u64,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The bytes before the terminator were not valid UTF-8
    #[error("string at offset {offset:#x} is not valid UTF-8: {source}")]
    InvalidUtf8 {
        /// Offset where the string began
        offset: u64,
        /// Underlying decode error
        #[source]
        source: std::string::FromUtf8Error,
    },
}

impl Error {
    /// Creates a new file open error
    pub fn file_open(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileOpen {
            path: path.into(),
            source,
        }
    }

    /// Creates a new probe I/O error
    pub fn io(offset: u64, source: std::io::Error) -> Self {
        Self::Io { offset, source }
    }

    /// Creates a new UTF-8 decode error
    pub fn invalid_utf8(offset: u64, source: std::string::FromUtf8Error) -> Self {
        Self::InvalidUtf8 { offset, source }
    }

    /// Returns true if the prober should treat this as "no match here" and
    /// move on to the next offset
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::InvalidUtf8 { .. } => true,
            Self::Io { source, .. } => matches!(
                source.kind(),
                ErrorKind::UnexpectedEof | ErrorKind::InvalidData | ErrorKind::InvalidInput
            ),
            Self::FileOpen { .. } => false,
        }
    }
}
