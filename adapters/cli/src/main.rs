#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that trains agents and replays trained tables.

mod play;
mod train;

use anyhow::Result;
use clap::{Parser, Subcommand};

/// Q-learning agent for tile-based puzzle levels.
#[derive(Debug, Parser)]
#[command(name = "tile-quest", version)]
struct Cli {
    /// Log every decision and episode.
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Train a Q-table over a campaign and save it to disk.
    Train(train::TrainArgs),
    /// Replay a trained Q-table headlessly, printing every decision.
    Play(play::PlayArgs),
}

/// Entry point for the Tile Quest command-line interface.
fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Train(args) => train::run(args),
        Command::Play(args) => play::run(args),
    }
}

/// Installs the global subscriber; `RUST_LOG` overrides the default level.
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
