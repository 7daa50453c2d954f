//! Discovery of `.assets` files under a game directory.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};
use walkdir::WalkDir;

/// Extension of Unity serialized asset files, without the dot
pub const ASSETS_EXTENSION: &str = "assets";

/// Walks a directory tree looking for assets files
#[derive(Debug, Clone)]
pub struct AssetsLocator {
    root: PathBuf,
    extension: OsString,
    follow_links: bool,
}

impl AssetsLocator {
    /// Creates a locator rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            extension: OsString::from(ASSETS_EXTENSION),
            follow_links: false,
        }
    }

    /// Follow symlinked directories during the walk
    pub fn follow_links(mut self, yes: bool) -> Self {
        self.follow_links = yes;
        self
    }

    /// Match a different extension (case-sensitive, without the dot)
    pub fn extension(mut self, extension: impl Into<OsString>) -> Self {
        self.extension = extension.into();
        self
    }

    /// Starts a fresh walk over the tree
    pub fn files(&self) -> AssetsFiles {
        debug!(
            "Searching for .{} files in {}",
            self.extension.to_string_lossy(),
            self.root.display()
        );
        AssetsFiles {
            // A root that is itself a file is not searched
            inner: WalkDir::new(&self.root)
                .min_depth(1)
                .follow_links(self.follow_links)
                .into_iter(),
            extension: self.extension.clone(),
        }
    }

    /// The first assets file in walk order
    pub fn first(&self) -> Option<PathBuf> {
        self.files().next()
    }
}

/// Lazy iterator over assets files, in directory-listing order
pub struct AssetsFiles {
    inner: walkdir::IntoIter,
    extension: OsString,
}

impl Iterator for AssetsFiles {
    type Item = PathBuf;

    fn next(&mut self) -> Option<PathBuf> {
        for entry in self.inner.by_ref() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    debug!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };

            let path = entry.path();

            // Follows symlinks, so linked files still count
            if !path.is_file() {
                continue;
            }

            if path.extension() != Some(self.extension.as_os_str()) {
                continue;
            }

            trace!("Found assets file: {}", path.display());
            return Some(entry.into_path());
        }

        None
    }
}

/// Iterate over every assets file under `root`
pub fn assets_files(root: impl AsRef<Path>) -> AssetsFiles {
    AssetsLocator::new(root.as_ref()).files()
}
