//! unityver - Discover the Unity build version of a game
//!
//! This tool finds the `.assets` files under a game directory and reads the
//! Unity build version embedded in them.

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, Level};
use tracing_subscriber::EnvFilter;
use unityver_core::{Aggregator, AssetsLocator, Outcome, Prober, ProberConfig};

/// Parses an assets file to discover the Unity build version
#[derive(Parser, Debug)]
#[command(name = "unityver")]
#[command(author, version, about, long_about = None)]
#[command(disable_version_flag = true)]
struct Cli {
    /// Root game directory
    root: PathBuf,

    /// Exhaustively check every assets file, for extra sanity
    #[arg(short = 'a', long)]
    check_all: bool,

    /// Extra offset to try before scanning (decimal or 0x-prefixed hex, repeatable)
    #[arg(long = "offset", value_name = "OFFSET", value_parser = parse_offset)]
    offsets: Vec<u64>,

    /// Follow symlinked directories while searching
    #[arg(long)]
    follow_links: bool,

    /// Verbosity level (--verbose, repeat for more)
    #[arg(long, action = ArgAction::Count)]
    verbose: u8,

    /// Print version
    #[arg(short = 'v', long = "version", action = ArgAction::Version)]
    version: Option<bool>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    run(&cli, &mut std::io::stdout().lock())
}

/// Search, probe and write the status lines (and notice, if any) to `out`
fn run<W: Write>(cli: &Cli, out: &mut W) -> Result<()> {
    let config = ProberConfig::new().extra_known_offsets(cli.offsets.iter().copied());
    debug!("Known offsets: {:x?}", config.known_offsets);

    let aggregator = Aggregator::with_strategy(Prober::with_config(config));
    let locator = AssetsLocator::new(&cli.root).follow_links(cli.follow_links);

    let outcome = if cli.check_all {
        aggregator.exhaustive_in(&locator)
    } else {
        aggregator.first_match_in(&locator)
    }
    .with_context(|| format!("Failed to probe assets files in {}", cli.root.display()))?;

    for line in report(&outcome, &cli.root, cli.check_all) {
        writeln!(out, "{}", line)?;
    }

    if let Some(notice) = aggregator.notice(&outcome) {
        writeln!(out)?;
        writeln!(out, "{}", notice)?;
    }

    Ok(())
}

/// Parse an offset given as decimal or `0x` hex
fn parse_offset(s: &str) -> std::result::Result<u64, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("invalid offset '{}': {}", s, e))
}

/// Status lines describing `outcome`
fn report(outcome: &Outcome, root: &Path, check_all: bool) -> Vec<String> {
    // Not-found messages are full sentences and end with a period
    match outcome {
        Outcome::NoCandidates if check_all => {
            vec![format!("Failed to find an assets file in {}.", root.display())]
        }
        Outcome::NoCandidates => {
            vec![format!("Could not find an assets file in {}.", root.display())]
        }
        Outcome::FirstMatch { path, result } => {
            let status = match result {
                Some(result) => format!("Unity build version: {}", result.version),
                None => "Failed to parse Unity build version.".to_string(),
            };
            vec![format!("Assets file: {}", path.display()), status]
        }
        Outcome::NoneParsed { total } => vec![format!(
            "Failed to parse Unity build version from {} assets files.",
            total
        )],
        Outcome::Consensus {
            winner,
            agreeing,
            total,
        } => vec![format!(
            "{} out of {} assets files agree, \"{}\" is the Unity build version.",
            agreeing, total, winner.version
        )],
    }
}
