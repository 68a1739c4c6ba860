//! Tandem — bidirectional roster reconciliation CLI.
//!
//! # Usage
//!
//! ```text
//! tandem init --spreadsheet-id <id> [--database <path>] [--force]
//! tandem cycle [--dry-run]
//! tandem diff
//! tandem status [--json] [--check]
//! tandem watch [--interval <secs>]
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    cycle::CycleArgs, diff::DiffArgs, init::InitArgs, status::StatusArgs, watch::WatchArgs,
};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "tandem",
    version,
    about = "Reconcile an employee roster between a database and a cloud spreadsheet",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a starter config and create the roster table.
    Init(InitArgs),

    /// Run one reconciliation cycle.
    Cycle(CycleArgs),

    /// Show unified diffs of what a cycle would write.
    Diff(DiffArgs),

    /// Show config, watermark, and store visibility.
    Status(StatusArgs),

    /// Run cycles on an interval in the foreground.
    Watch(WatchArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Init(args) => args.run(),
        Commands::Cycle(args) => args.run(),
        Commands::Diff(args) => args.run(),
        Commands::Status(args) => args.run(),
        Commands::Watch(args) => args.run(),
    }
}
