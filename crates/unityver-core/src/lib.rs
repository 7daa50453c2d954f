//! # unityver-core
//!
//! A library for discovering the Unity build version a game was built with,
//! by reading it out of the game's serialized `.assets` files.
//!
//! This crate provides the core functionality for:
//! - Finding `.assets` files under a game directory
//! - Probing a file for its embedded NUL-terminated version string
//! - Voting across many files for the most likely version
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`reader`]: NUL-terminated string reading
//! - [`version`]: Semantic-version prefix validation
//! - [`probe`]: Known-offset and aligned-scan probing
//! - [`locate`]: Directory walking
//! - [`aggregate`]: First-match and majority-vote drivers
//! - [`error`]: Error types and handling
//!
//! ## Example
//!
//! ```no_run
//! use unityver_core::{Aggregator, AssetsLocator, Outcome};
//!
//! let aggregator = Aggregator::new();
//! let outcome = aggregator.exhaustive_in(&AssetsLocator::new("./MyGame_Data"))?;
//!
//! if let Outcome::Consensus { winner, agreeing, total } = &outcome {
//!     println!("{agreeing}/{total} files say {}", winner.version);
//! }
//! if let Some(notice) = aggregator.notice(&outcome) {
//!     println!("{notice}");
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Extensibility
//!
//! - [`ProbeStrategy`]: Customize where and how a file is searched
//!

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unreachable_pub)]

pub mod aggregate;
pub mod error;
pub mod locate;
pub mod probe;
pub mod reader;
pub mod version;

// Re-export primary types for convenience
pub use aggregate::{unknown_offset_notice, Aggregator, Outcome, VersionTally, REPORT_URL};
pub use error::{Error, Result};
pub use locate::{assets_files, AssetsFiles, AssetsLocator, ASSETS_EXTENSION};
pub use probe::{ProbeResult, ProbeStrategy, Prober, ProberConfig, KNOWN_OFFSETS};
pub use version::is_version;
