//! `tandem cycle` — run one reconciliation cycle.

use anyhow::{bail, Context, Result};
use clap::Args;

use tandem_core::config;
use tandem_sync::{run_cycle, timestamp, CycleReport, SideOutcome};

use super::{home_dir, open_stores, policy_of};

/// Arguments for `tandem cycle`.
#[derive(Args, Debug)]
pub struct CycleArgs {
    /// Show what would be written without writing or touching the watermark.
    #[arg(long)]
    pub dry_run: bool,
}

impl CycleArgs {
    pub fn run(self) -> Result<()> {
        let home = home_dir()?;
        let settings = config::load_at(&home).context("failed to load config")?;
        let (mut database, mut sheet) = open_stores(&settings)?;

        let report = run_cycle(
            &mut database,
            &mut sheet,
            &home,
            &policy_of(&settings),
            self.dry_run,
        )
        .context("cycle failed")?;

        print_report(&report);

        if !self.dry_run
            && !(report.database_write.succeeded() && report.sheet_write.succeeded())
        {
            bail!("one or more writers failed; watermark left untouched");
        }
        Ok(())
    }
}

fn print_report(report: &CycleReport) {
    let prefix = if report.dry_run { "[dry-run] " } else { "" };
    println!(
        "{prefix}✓ cycle complete ({} database + {} sheet records read)",
        report.database_read, report.sheet_read
    );
    if report.database_dropped + report.sheet_dropped > 0 {
        println!(
            "  !  dropped without id: {} database, {} sheet",
            report.database_dropped, report.sheet_dropped
        );
    }
    print_side("database", report.queued_to_database, &report.database_write);
    print_side("sheet", report.queued_to_sheet, &report.sheet_write);

    match report.watermark_after {
        Some(after) => println!("  watermark → {}", timestamp::format_naive(after)),
        None if report.dry_run => println!(
            "  watermark unchanged ({})",
            timestamp::format_naive(report.watermark_before)
        ),
        None => println!(
            "  watermark frozen at {}",
            timestamp::format_naive(report.watermark_before)
        ),
    }
}

fn print_side(label: &str, queued: usize, outcome: &SideOutcome) {
    match outcome {
        SideOutcome::Applied { written } => println!("  ✎  {label}: wrote {written} of {queued}"),
        SideOutcome::WouldApply { queued } => println!("  ~  {label}: would write {queued}"),
        SideOutcome::Failed { error } => println!("  ✗  {label}: {error}"),
    }
}
