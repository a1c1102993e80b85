//! pews-tail - a terminal client for the Korean Meteorological
//! Administration's Public Earthquake Warning System (PEWS).
//!
//! Polls a binary snapshot endpoint once per second, decodes per-station
//! instrumental intensity and in-progress earthquake records, and streams
//! them to a chosen output format.

use std::io;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::error;

mod bitview;
mod cli;
mod client;
mod decoder;
mod errors;
mod escape;
mod models;
mod output;
mod poll;
mod stations;
mod tide;

use cli::{Cli, Command};
use client::PewsClient;
use output::{Sink, WriterSink};

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.quiet);

    match cli.command {
        Command::Tail(args) => cmd_tail(args),
        Command::Live(args) => cmd_live(args),
    }
}

/// Initialize tracing subscriber.
fn init_tracing(verbose: bool, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

/// Execute the `tail` command: a single fetch and decode, then exit.
///
/// With `--url` or `--dir`, replays a recorded `.b`/`.s` pair in
/// simulation mode (`HEADER_LEN_SIM`). Otherwise performs one live tick
/// against the real endpoint after a tide refresh.
fn cmd_tail(args: cli::TailArgs) -> Result<()> {
    let client = PewsClient::new().context("failed to create PEWS client")?;
    let stdout = io::stdout();
    let mut sink = WriterSink::new(stdout.lock(), args.format);

    if let Some(url) = &args.url {
        poll::run_simulation(&client, url, &mut sink).context("simulation tick failed")?;
        return Ok(());
    }

    if let Some(dir) = &args.dir {
        poll::run_simulation_from_dir(dir, &mut sink).context("simulation tick failed")?;
        return Ok(());
    }

    let mut estimator = tide::TideEstimator::new();
    if let Err(e) = estimator.refresh(client.inner()) {
        tracing::warn!("initial tide refresh failed, starting from default tide: {e}");
    }
    let p_time = estimator.p_time();

    let mut state = models::PollState::default();
    match poll::tick(&client, &mut state, &p_time, decoder::HEADER_LEN)? {
        poll::TickOutcome::Snapshot(snapshot) => sink.emit(&snapshot)?,
        poll::TickOutcome::Skipped | poll::TickOutcome::SkippedForceTideRefresh => {
            tracing::info!("snapshot not yet published for {p_time}, nothing to show");
        }
    }
    Ok(())
}

/// Execute the `live` command: poll continuously until interrupted.
fn cmd_live(args: cli::LiveArgs) -> Result<()> {
    let client = PewsClient::new().context("failed to create PEWS client")?;
    let stdout = io::stdout();
    let mut sink = WriterSink::new(stdout.lock(), args.format);

    tracing::info!("polling PEWS every 1s (press Ctrl+C to stop)");
    poll::run_live(&client, &mut sink).context("poll loop failed")?;
    Ok(())
}
