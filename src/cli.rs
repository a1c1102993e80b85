//! Command-line interface definitions.
//!
//! Uses clap derive API for argument parsing.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::output::Format;

/// A terminal client for the Korean Meteorological Administration's Public
/// Earthquake Warning System (PEWS).
#[derive(Parser, Debug)]
#[command(name = "pews")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Command to run
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose debug logging
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    pub quiet: bool,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// One-shot fetch of a single snapshot, then exit
    Tail(TailArgs),

    /// Poll continuously, streaming station and earthquake updates
    Live(LiveArgs),
}

/// Arguments for the `tail` command.
#[derive(Parser, Debug)]
pub struct TailArgs {
    /// Replay prefix for a recorded snapshot pair, e.g.
    /// `https://example.com/fixtures/20260131120000` — fetches
    /// `<prefix>.b` and, if staF is set, `<prefix>.s`.
    ///
    /// Absence (together with `--dir`) means live polling for a single
    /// tick against the real endpoint instead of a replay fixture.
    #[arg(long, conflicts_with = "dir")]
    pub url: Option<String>,

    /// Local directory containing a captured snapshot pair for offline
    /// simulation: `snapshot.b` and, when staF is set, `snapshot.s`.
    /// Mutually exclusive with `--url`.
    #[arg(long, conflicts_with = "url")]
    pub dir: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'f', default_value = "human", value_parser = parse_format)]
    pub format: Format,
}

/// Arguments for the `live` command.
#[derive(Parser, Debug)]
pub struct LiveArgs {
    /// Output format
    #[arg(long, short = 'f', default_value = "human", value_parser = parse_format)]
    pub format: Format,
}

/// Parse an output format from string.
fn parse_format(s: &str) -> Result<Format, String> {
    s.parse()
}
