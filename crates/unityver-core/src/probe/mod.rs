//! Offset probing for the embedded Unity version string.
//!
//! ## Algorithm Overview
//!
//! 1. Try each known offset in priority order; the first one holding a
//!    NUL-terminated semantic version wins
//! 2. Otherwise scan every 4-byte-aligned offset below `len - 0x14`
//! 3. Give up if neither stage matches
//!
//! Offsets that hold garbage, non-UTF-8 bytes, or run off the end of the file
//! are simply skipped. Each offset is first judged from the bytes already
//! buffered, so a long run without a terminator is not re-read from every
//! aligned start. Only I/O errors that make the stream itself unusable
//! are returned.
//!
//! ## Extensibility
//!
//! The [`ProbeStrategy`] trait allows other search orders to be plugged into
//! the aggregator:
//!
//! ```no_run
//! use unityver_core::probe::{ProbeResult, ProbeStrategy};
//! use unityver_core::Result;
//! use std::io::{Read, Seek};
//!
//! struct HeaderOnly;
//!
//! impl ProbeStrategy for HeaderOnly {
//!     fn probe<R: Read + Seek>(&self, reader: R) -> Result<Option<ProbeResult>> {
//!         // Custom probing logic
//!         Ok(None)
//!     }
//!
//!     fn is_known_offset(&self, offset: u64) -> bool {
//!         offset == 0x14
//!     }
//! }
//! ```

mod offsets;

use crate::error::{Error, Result};
use crate::reader::read_c_string;
use crate::version::{is_version, may_start_version, version_prefix};
use std::fs::File;
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::Path;
use tracing::{debug, trace};

pub use offsets::{
    scan_offsets, CandidateOffsets, ProbeStage, DEFAULT_STRIDE, DEFAULT_TAIL_MARGIN,
    KNOWN_OFFSETS,
};

/// A version string and the offset it was read from
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProbeResult {
    /// Byte offset where the NUL-terminated string began
    pub offset: u64,
    /// The decoded version string, suffix included
    pub version: String,
}

impl ProbeResult {
    /// Creates a new probe result
    pub fn new(offset: u64, version: impl Into<String>) -> Self {
        Self {
            offset,
            version: version.into(),
        }
    }
}

/// Configuration for the prober
#[derive(Debug, Clone)]
pub struct ProberConfig {
    /// Offsets tried before the scan, in priority order
    pub known_offsets: Vec<u64>,
    /// Distance between scanned offsets
    pub stride: u64,
    /// Trailing bytes never used as a scan start
    pub tail_margin: u64,
    /// Read buffer size; consecutive offsets inside it need no new read
    pub buffer_capacity: usize,
}

impl Default for ProberConfig {
    fn default() -> Self {
        Self {
            known_offsets: KNOWN_OFFSETS.to_vec(),
            stride: DEFAULT_STRIDE,
            tail_margin: DEFAULT_TAIL_MARGIN,
            buffer_capacity: 8 * 1024,
        }
    }
}

impl ProberConfig {
    /// Creates a new prober config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends extra known offsets after the existing ones, skipping repeats
    pub fn extra_known_offsets(mut self, offsets: impl IntoIterator<Item = u64>) -> Self {
        for offset in offsets {
            if !self.known_offsets.contains(&offset) {
                self.known_offsets.push(offset);
            }
        }
        self
    }

    /// Sets the read buffer size
    pub fn buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = capacity;
        self
    }
}

/// Trait for implementing custom probing strategies
pub trait ProbeStrategy {
    /// Find the first version string in `reader`
    fn probe<R: Read + Seek>(&self, reader: R) -> Result<Option<ProbeResult>>;

    /// Whether `offset` belongs to this strategy's known set
    fn is_known_offset(&self, offset: u64) -> bool;

    /// Open `path` and probe it. The file is closed before returning.
    fn probe_file(&self, path: &Path) -> Result<Option<ProbeResult>> {
        let file = File::open(path).map_err(|e| Error::file_open(path, e))?;
        self.probe(file)
    }
}

/// Primary prober: known offsets, then an aligned scan
#[derive(Debug, Clone, Default)]
pub struct Prober {
    config: ProberConfig,
}

impl Prober {
    /// Creates a new prober with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new prober with custom configuration
    pub fn with_config(config: ProberConfig) -> Self {
        Self { config }
    }
}

impl ProbeStrategy for Prober {
    fn probe<R: Read + Seek>(&self, reader: R) -> Result<Option<ProbeResult>> {
        let mut reader = PeekReader::new(reader, self.config.buffer_capacity)?;
        let len = reader.len;

        debug!(
            "Probing {} bytes ({} known offsets)",
            len,
            self.config.known_offsets.len()
        );

        let candidates = CandidateOffsets::new(
            &self.config.known_offsets,
            len,
            self.config.stride,
            self.config.tail_margin,
        );

        let mut scanning = false;
        for (stage, offset) in candidates {
            if stage == ProbeStage::Scan && !scanning {
                debug!("No known offset matched, scanning aligned offsets");
                scanning = true;
            }

            match reader.probe_at(offset) {
                Ok(Some(version)) => {
                    debug!(
                        "Found version {:?} ({}) at {:#x} during {:?} stage",
                        version,
                        version_prefix(&version).unwrap_or_default(),
                        offset,
                        stage
                    );
                    return Ok(Some(ProbeResult::new(offset, version)));
                }
                Ok(None) => {}
                Err(e) if e.is_recoverable() => {
                    trace!("Skipping offset {:#x}: {}", offset, e);
                }
                Err(e) => return Err(e),
            }
        }

        debug!("Probe complete: no version found");
        Ok(None)
    }

    fn is_known_offset(&self, offset: u64) -> bool {
        self.config.known_offsets.contains(&offset)
    }
}

/// Buffered reader that remembers its logical position between probes
struct PeekReader<R> {
    inner: BufReader<R>,
    /// Logical position, or `None` after a read whose length was not tracked
    pos: Option<u64>,
    len: u64,
}

impl<R: Read + Seek> PeekReader<R> {
    fn new(reader: R, capacity: usize) -> Result<Self> {
        let mut inner = BufReader::with_capacity(capacity.max(1), reader);
        let len = inner
            .seek(SeekFrom::End(0))
            .map_err(|e| Error::io(0, e))?;
        Ok(Self {
            inner,
            pos: Some(len),
            len,
        })
    }

    /// Moves to `offset`, keeping the buffer when the target lies inside it
    fn seek_to(&mut self, offset: u64) -> Result<()> {
        let delta = self.pos.and_then(|at| {
            i64::try_from(offset)
                .ok()?
                .checked_sub(i64::try_from(at).ok()?)
        });
        self.pos = None;

        match delta {
            Some(delta) => self.inner.seek_relative(delta),
            None => self.inner.seek(SeekFrom::Start(offset)).map(drop),
        }
        .map_err(|e| Error::io(offset, e))?;

        self.pos = Some(offset);
        Ok(())
    }

    /// Read the string at `offset` and keep it if it is a version
    fn probe_at(&mut self, offset: u64) -> Result<Option<String>> {
        self.seek_to(offset)?;

        let buffered = self.inner.fill_buf().map_err(|e| Error::io(offset, e))?;
        let (head, terminated) = match buffered.iter().position(|&b| b == 0) {
            Some(end) => (&buffered[..end], true),
            None => (buffered, false),
        };
        if head.is_empty() || !may_start_version(head, terminated) {
            return Ok(None);
        }

        self.pos = None;
        let text = read_c_string(&mut self.inner, offset)?;
        Ok(is_version(&text).then_some(text))
    }
}

/// Probe a file with the default prober
///
/// This is a convenience function that opens the file and probes it.
pub fn probe_file(path: impl AsRef<Path>) -> Result<Option<ProbeResult>> {
    Prober::new().probe_file(path.as_ref())
}
