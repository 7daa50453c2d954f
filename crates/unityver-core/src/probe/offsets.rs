//! Offset sequences consulted by the prober.
//!
//! The search is two stages joined end to end: a short prioritized list of
//! offsets where serialized-file headers are known to keep the version
//! string, then every aligned offset of the file body.

use std::iter::{Chain, Copied, StepBy};
use std::ops::Range;
use std::slice::Iter;

/// Offsets where the version string has been observed, in priority order.
///
/// - `0x14`: header layout used before serialized-file format 22
/// - `0x30`: widened header with 64-bit sizes (format 22 and later)
pub const KNOWN_OFFSETS: &[u64] = &[0x14, 0x30];

/// Alignment of the version string inside the container
pub const DEFAULT_STRIDE: u64 = 4;

/// Bytes at the end of the file that the aligned scan never probes
pub const DEFAULT_TAIL_MARGIN: u64 = 0x14;

/// Which stage of the search an offset belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeStage {
    /// One of the configured known offsets
    Known,
    /// The aligned fallback scan
    Scan,
}

/// Aligned offsets `0, stride, 2 * stride, …` strictly below
/// `len - tail_margin`. Empty when the file is not longer than the margin.
pub fn scan_offsets(len: u64, stride: u64, tail_margin: u64) -> StepBy<Range<u64>> {
    let bound = len.saturating_sub(tail_margin);
    // step_by panics on zero
    let step = usize::try_from(stride.max(1)).unwrap_or(usize::MAX);
    (0..bound).step_by(step)
}

/// Iterator over every offset the prober tries, tagged with its stage
pub struct CandidateOffsets<'a> {
    inner: Chain<Copied<Iter<'a, u64>>, StepBy<Range<u64>>>,
    known_len: usize,
    yielded: usize,
}

impl<'a> CandidateOffsets<'a> {
    /// Known offsets first, then the aligned scan of a `len`-byte file
    pub fn new(known: &'a [u64], len: u64, stride: u64, tail_margin: u64) -> Self {
        Self {
            inner: known
                .iter()
                .copied()
                .chain(scan_offsets(len, stride, tail_margin)),
            known_len: known.len(),
            yielded: 0,
        }
    }
}

impl Iterator for CandidateOffsets<'_> {
    type Item = (ProbeStage, u64);

    fn next(&mut self) -> Option<Self::Item> {
        let offset = self.inner.next()?;
        let stage = if self.yielded < self.known_len {
            ProbeStage::Known
        } else {
            ProbeStage::Scan
        };
        self.yielded += 1;
        Some((stage, offset))
    }
}
