//! `tandem watch` — run cycles on an interval in the foreground.

use anyhow::{Context, Result};
use clap::Args;

use tandem_core::config;

use super::{home_dir, open_stores};

/// Arguments for `tandem watch`.
#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Seconds between cycles; overrides the configured interval.
    #[arg(long)]
    pub interval: Option<u64>,
}

impl WatchArgs {
    pub fn run(self) -> Result<()> {
        let home = home_dir()?;
        let mut settings = config::load_at(&home).context("failed to load config")?;
        if let Some(secs) = self.interval {
            settings.interval_secs = secs;
        }

        // Fail fast on missing credentials or an unopenable database instead
        // of logging the same startup error every tick.
        drop(open_stores(&settings)?);

        println!(
            "Watching every {}s — ctrl-c to stop.",
            settings.interval_secs
        );
        tandem_daemon::start_blocking(&home, settings).context("scheduler failed")
    }
}
