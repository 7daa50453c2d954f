//! Semantic-version prefix validation.
//!
//! Unity writes its build version as `major.minor.patch` followed by a
//! release suffix (`2019.4.31f1`, `5.6.7p3`, `2022.2.0b16`). Only the numeric
//! prefix is checked; whatever follows it is ignored.

use regex::{bytes, Regex};
use std::sync::OnceLock;

/// `major.minor.patch`, each group `0` or a number without a leading zero
const VERSION_PREFIX_PATTERN: &str = r"^(0|[1-9][0-9]*)\.(0|[1-9][0-9]*)\.(0|[1-9][0-9]*)";

/// Every proper prefix of a `major.minor.patch` match, including the empty one
const PARTIAL_VERSION_PATTERN: &str =
    r"^(?:(?:0|[1-9][0-9]*)(?:\.(?:(?:0|[1-9][0-9]*)\.?)?)?)?\z";

fn version_prefix_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(VERSION_PREFIX_PATTERN).expect("version pattern is valid"))
}

fn version_prefix_bytes_regex() -> &'static bytes::Regex {
    static RE: OnceLock<bytes::Regex> = OnceLock::new();
    RE.get_or_init(|| {
        bytes::Regex::new(VERSION_PREFIX_PATTERN).expect("version pattern is valid")
    })
}

fn partial_version_regex() -> &'static bytes::Regex {
    static RE: OnceLock<bytes::Regex> = OnceLock::new();
    RE.get_or_init(|| {
        bytes::Regex::new(PARTIAL_VERSION_PATTERN).expect("partial version pattern is valid")
    })
}

/// Returns true if `text` starts with a semantic version
pub fn is_version(text: &str) -> bool {
    version_prefix_regex().is_match(text)
}

/// Returns the `major.minor.patch` prefix of `text`, if it has one
pub fn version_prefix(text: &str) -> Option<&str> {
    version_prefix_regex().find(text).map(|m| m.as_str())
}

/// Returns false when no string starting with `head` can be a version.
///
/// `terminated` says whether `head` is the whole string or only the bytes
/// seen so far. Cheap enough to run at every scanned offset before committing
/// to a full read.
pub fn may_start_version(head: &[u8], terminated: bool) -> bool {
    version_prefix_bytes_regex().is_match(head)
        || (!terminated && partial_version_regex().is_match(head))
}
