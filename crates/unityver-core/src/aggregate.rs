//! Driving the prober across candidate files and voting on the result.
//!
//! Two modes are supported:
//!
//! - [`Aggregator::first_match`] probes only the first candidate
//! - [`Aggregator::exhaustive`] probes every candidate and keeps a
//!   [`VersionTally`]; the version with the most agreeing files wins
//!
//! Ties are settled by discovery order. The leader only changes when another
//! version's count becomes strictly greater than the leader's.

use crate::error::Result;
use crate::locate::AssetsLocator;
use crate::probe::{ProbeResult, ProbeStrategy, Prober};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{debug, info, trace};

/// Where unknown offsets should be reported
pub const REPORT_URL: &str = "https://github.com/19h/unityver/issues";

/// Occurrence count per version string, plus the running leader
#[derive(Debug, Clone, Default)]
pub struct VersionTally {
    counts: HashMap<String, usize>,
    leader: Option<(ProbeResult, usize)>,
}

impl VersionTally {
    /// Creates an empty tally
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one more file agreeing on `result.version` and returns the new
    /// count for that version
    pub fn record(&mut self, result: ProbeResult) -> usize {
        let count = self.counts.entry(result.version.clone()).or_insert(0);
        *count += 1;
        let count = *count;

        if let Some((leader, best)) = self.leader.as_mut() {
            if leader.version == result.version {
                *best = count;
                return count;
            }
            if count <= *best {
                return count;
            }
            debug!(
                "{:?} overtakes {:?} with {} files",
                result.version, leader.version, count
            );
        }

        self.leader = Some((result, count));
        count
    }

    /// Number of files that agreed on `version`
    pub fn count(&self, version: &str) -> usize {
        self.counts.get(version).copied().unwrap_or(0)
    }

    /// The leading result and its count
    pub fn leader(&self) -> Option<(&ProbeResult, usize)> {
        self.leader.as_ref().map(|(result, count)| (result, *count))
    }

    /// Number of distinct versions seen
    pub fn distinct(&self) -> usize {
        self.counts.len()
    }

    /// Consumes the tally, returning the leader
    pub fn into_leader(self) -> Option<(ProbeResult, usize)> {
        self.leader
    }
}

/// What a run over the candidate files produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// No assets file exists under the root
    NoCandidates,
    /// First-match mode: the file that was probed and what it yielded
    FirstMatch {
        /// The probed file
        path: PathBuf,
        /// Its version, if one was found
        result: Option<ProbeResult>,
    },
    /// Exhaustive mode: files were found but none yielded a version
    NoneParsed {
        /// Number of files probed
        total: usize,
    },
    /// Exhaustive mode: the majority version
    Consensus {
        /// The winning version and the offset it was read from
        winner: ProbeResult,
        /// Number of files that agree on it
        agreeing: usize,
        /// Number of files probed
        total: usize,
    },
}

impl Outcome {
    /// The version this outcome settled on, if any
    pub fn winner(&self) -> Option<&ProbeResult> {
        match self {
            Self::FirstMatch { result, .. } => result.as_ref(),
            Self::Consensus { winner, .. } => Some(winner),
            Self::NoCandidates | Self::NoneParsed { .. } => None,
        }
    }

    /// The winning result, if it was read from an offset `strategy` does not
    /// already know about
    pub fn unknown_offset<S: ProbeStrategy>(&self, strategy: &S) -> Option<&ProbeResult> {
        self.winner()
            .filter(|winner| !strategy.is_known_offset(winner.offset))
    }
}

/// Multi-line notice asking for an unknown offset to be reported
pub fn unknown_offset_notice(result: &ProbeResult) -> String {
    format!(
        "Found Unity build version \"{version}\" at offset {offset} ({offset:#x}), \
         which is not a known offset.\n\
         Please report this offset so it can be checked first in future releases:\n  \
         {url}",
        version = result.version,
        offset = result.offset,
        url = REPORT_URL,
    )
}

/// Runs a probing strategy over candidate files
#[derive(Debug, Clone, Default)]
pub struct Aggregator<S = Prober> {
    strategy: S,
}

impl Aggregator<Prober> {
    /// Creates an aggregator using the default prober
    pub fn new() -> Self {
        Self::default()
    }
}

impl<S: ProbeStrategy> Aggregator<S> {
    /// Creates an aggregator using a custom strategy
    pub fn with_strategy(strategy: S) -> Self {
        Self { strategy }
    }

    /// Returns the probing strategy
    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    /// Probe only the first candidate
    pub fn first_match<I>(&self, candidates: I) -> Result<Outcome>
    where
        I: IntoIterator<Item = PathBuf>,
    {
        let Some(path) = candidates.into_iter().next() else {
            debug!("No candidate files");
            return Ok(Outcome::NoCandidates);
        };

        debug!("Probing first candidate: {}", path.display());
        let result = self.strategy.probe_file(&path)?;
        Ok(Outcome::FirstMatch { path, result })
    }

    /// Probe every candidate and vote on the version
    pub fn exhaustive<I>(&self, candidates: I) -> Result<Outcome>
    where
        I: IntoIterator<Item = PathBuf>,
    {
        let mut tally = VersionTally::new();
        let mut total = 0;

        for path in candidates {
            total += 1;
            match self.strategy.probe_file(&path)? {
                Some(result) => {
                    trace!(
                        "{}: {:?} at {:#x}",
                        path.display(),
                        result.version,
                        result.offset
                    );
                    tally.record(result);
                }
                None => trace!("{}: no version found", path.display()),
            }
        }

        info!(
            "Probed {} files, {} distinct versions",
            total,
            tally.distinct()
        );

        Ok(match tally.into_leader() {
            Some((winner, agreeing)) => Outcome::Consensus {
                winner,
                agreeing,
                total,
            },
            None if total > 0 => Outcome::NoneParsed { total },
            None => Outcome::NoCandidates,
        })
    }

    /// [`first_match`](Self::first_match) over the files `locator` finds
    pub fn first_match_in(&self, locator: &AssetsLocator) -> Result<Outcome> {
        self.first_match(locator.files())
    }

    /// [`exhaustive`](Self::exhaustive) over the files `locator` finds
    pub fn exhaustive_in(&self, locator: &AssetsLocator) -> Result<Outcome> {
        self.exhaustive(locator.files())
    }

    /// The unknown-offset notice for `outcome`, if its winner needs one
    pub fn notice(&self, outcome: &Outcome) -> Option<String> {
        outcome
            .unknown_offset(&self.strategy)
            .map(unknown_offset_notice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::io::{Read, Seek};
    use std::path::Path;

    /// Strategy answering from a fixed table instead of reading files
    #[derive(Default)]
    struct Scripted {
        answers: HashMap<PathBuf, ProbeResult>,
        failing: Option<PathBuf>,
        probed: RefCell<Vec<PathBuf>>,
    }

    impl Scripted {
        fn answer(mut self, path: &str, offset: u64, version: &str) -> Self {
            self.answers
                .insert(PathBuf::from(path), ProbeResult::new(offset, version));
            self
        }
    }

    impl ProbeStrategy for Scripted {
        fn probe<R: Read + Seek>(&self, _reader: R) -> Result<Option<ProbeResult>> {
            Ok(None)
        }

        fn is_known_offset(&self, offset: u64) -> bool {
            offset == 0x14
        }

        fn probe_file(&self, path: &Path) -> Result<Option<ProbeResult>> {
            self.probed.borrow_mut().push(path.to_path_buf());
            if self.failing.as_deref() == Some(path) {
                return Err(Error::file_open(
                    path,
                    std::io::Error::new(std::io::ErrorKind::NotFound, "vanished"),
                ));
            }
            Ok(self.answers.get(path).cloned())
        }
    }

    fn paths(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(|name| PathBuf::from(*name)).collect()
    }

    #[test]
    fn test_tally_strict_increase() {
        let mut tally = VersionTally::new();
        assert_eq!(tally.record(ProbeResult::new(0x14, "1.0.0")), 1);
        assert_eq!(tally.record(ProbeResult::new(0x14, "2.0.0")), 1);
        assert_eq!(tally.leader().unwrap().0.version, "1.0.0");

        assert_eq!(tally.record(ProbeResult::new(0x30, "2.0.0")), 2);
        let (leader, count) = tally.leader().unwrap();
        assert_eq!(leader, &ProbeResult::new(0x30, "2.0.0"));
        assert_eq!(count, 2);

        // Catching up is not enough
        tally.record(ProbeResult::new(0x14, "1.0.0"));
        assert_eq!(tally.leader().unwrap().0.version, "2.0.0");
        assert_eq!(tally.count("1.0.0"), 2);
        assert_eq!(tally.count("3.0.0"), 0);
        assert_eq!(tally.distinct(), 2);
    }

    #[test]
    fn test_majority_wins() {
        let strategy = Scripted::default()
            .answer("a.assets", 0x14, "1.0.0")
            .answer("b.assets", 0x14, "2.0.0")
            .answer("c.assets", 0x14, "1.0.0");
        let aggregator = Aggregator::with_strategy(strategy);

        let outcome = aggregator
            .exhaustive(paths(&["a.assets", "b.assets", "c.assets"]))
            .unwrap();
        assert_eq!(
            outcome,
            Outcome::Consensus {
                winner: ProbeResult::new(0x14, "1.0.0"),
                agreeing: 2,
                total: 3,
            }
        );
    }

    #[test]
    fn test_tie_keeps_first() {
        let strategy = Scripted::default()
            .answer("a.assets", 0x14, "1.0.0")
            .answer("b.assets", 0x14, "2.0.0");
        let aggregator = Aggregator::with_strategy(strategy);

        let outcome = aggregator
            .exhaustive(paths(&["a.assets", "b.assets"]))
            .unwrap();
        assert_eq!(
            outcome,
            Outcome::Consensus {
                winner: ProbeResult::new(0x14, "1.0.0"),
                agreeing: 1,
                total: 2,
            }
        );

        // Same files, other discovery order
        let outcome = aggregator
            .exhaustive(paths(&["b.assets", "a.assets"]))
            .unwrap();
        assert_eq!(outcome.winner().unwrap().version, "2.0.0");
    }

    #[test]
    fn test_unparsed_files_count_toward_total() {
        let strategy = Scripted::default()
            .answer("b.assets", 0x14, "5.6.7f1")
            .answer("d.assets", 0x14, "5.6.7f1");
        let aggregator = Aggregator::with_strategy(strategy);

        let outcome = aggregator
            .exhaustive(paths(&["a.assets", "b.assets", "c.assets", "d.assets"]))
            .unwrap();
        assert_eq!(
            outcome,
            Outcome::Consensus {
                winner: ProbeResult::new(0x14, "5.6.7f1"),
                agreeing: 2,
                total: 4,
            }
        );
    }

    #[test]
    fn test_none_parsed_vs_no_candidates() {
        let aggregator = Aggregator::with_strategy(Scripted::default());

        let outcome = aggregator
            .exhaustive(paths(&["a.assets", "b.assets"]))
            .unwrap();
        assert_eq!(outcome, Outcome::NoneParsed { total: 2 });

        assert_eq!(aggregator.exhaustive(Vec::new()).unwrap(), Outcome::NoCandidates);
        assert_eq!(aggregator.first_match(Vec::new()).unwrap(), Outcome::NoCandidates);
    }

    #[test]
    fn test_first_match_probes_once() {
        let strategy = Scripted::default()
            .answer("a.assets", 0x14, "2020.3.1f1")
            .answer("b.assets", 0x14, "2021.1.1f1");
        let aggregator = Aggregator::with_strategy(strategy);

        let outcome = aggregator
            .first_match(paths(&["a.assets", "b.assets"]))
            .unwrap();
        assert_eq!(
            outcome,
            Outcome::FirstMatch {
                path: PathBuf::from("a.assets"),
                result: Some(ProbeResult::new(0x14, "2020.3.1f1")),
            }
        );
        assert_eq!(
            *aggregator.strategy().probed.borrow(),
            paths(&["a.assets"])
        );

        let outcome = aggregator.first_match(paths(&["z.assets"])).unwrap();
        assert_eq!(outcome.winner(), None);
        assert!(matches!(outcome, Outcome::FirstMatch { result: None, .. }));
    }

    #[test]
    fn test_probe_error_propagates() {
        let strategy = Scripted {
            failing: Some(PathBuf::from("b.assets")),
            ..Scripted::default()
        }
        .answer("a.assets", 0x14, "1.0.0");
        let aggregator = Aggregator::with_strategy(strategy);

        let err = aggregator
            .exhaustive(paths(&["a.assets", "b.assets", "c.assets"]))
            .unwrap_err();
        assert!(matches!(err, Error::FileOpen { .. }));
        // Nothing after the failure is probed
        assert_eq!(aggregator.strategy().probed.borrow().len(), 2);
    }

    #[test]
    fn test_notice_only_for_unknown_offsets() {
        let strategy = Scripted::default()
            .answer("known.assets", 0x14, "2019.4.31f1")
            .answer("odd.assets", 0x40, "2019.4.31f1");
        let aggregator = Aggregator::with_strategy(strategy);

        let known = aggregator.first_match(paths(&["known.assets"])).unwrap();
        assert_eq!(aggregator.notice(&known), None);

        let odd = aggregator.first_match(paths(&["odd.assets"])).unwrap();
        let notice = aggregator.notice(&odd).unwrap();
        assert!(notice.contains("\"2019.4.31f1\""));
        assert!(notice.contains("offset 64 (0x40)"));
        assert!(notice.contains(REPORT_URL));
        assert!(notice.lines().count() > 1);

        // The winner's recorded offset decides, even if other files used a known one
        let voted = aggregator
            .exhaustive(paths(&["odd.assets", "known.assets"]))
            .unwrap();
        assert!(aggregator.notice(&voted).is_some());

        let none = aggregator.exhaustive(paths(&["missing.assets"])).unwrap();
        assert_eq!(aggregator.notice(&none), None);
        assert_eq!(aggregator.notice(&Outcome::NoCandidates), None);
    }

    #[test]
    fn test_exhaustive_on_disk() {
        let temp = tempfile::TempDir::new().unwrap();
        let write = |name: &str, version: &[u8]| {
            let mut data = vec![0u8; 0x60];
            data[0x14..0x14 + version.len()].copy_from_slice(version);
            std::fs::write(temp.path().join(name), data).unwrap();
        };
        write("globalgamemanagers.assets", b"2021.3.5f1");
        write("sharedassets0.assets", b"2021.3.5f1");
        write("sharedassets1.assets", b"2020.1.0f1");
        std::fs::write(temp.path().join("resources.assets"), b"short").unwrap();

        let aggregator = Aggregator::new();
        let outcome = aggregator
            .exhaustive_in(&AssetsLocator::new(temp.path()))
            .unwrap();
        assert_eq!(
            outcome,
            Outcome::Consensus {
                winner: ProbeResult::new(0x14, "2021.3.5f1"),
                agreeing: 2,
                total: 4,
            }
        );
        assert_eq!(aggregator.notice(&outcome), None);

        let first = aggregator
            .first_match_in(&AssetsLocator::new(temp.path()))
            .unwrap();
        assert!(matches!(first, Outcome::FirstMatch { .. }));
    }
}
