//! `tandem diff` — show unified diffs for what a cycle would write.

use anyhow::{Context, Result};
use clap::Args;

use tandem_core::config;
use tandem_sync::diff_records;

use super::{home_dir, open_stores, policy_of};

/// Arguments for `tandem diff`.
#[derive(Args, Debug)]
pub struct DiffArgs {}

impl DiffArgs {
    pub fn run(self) -> Result<()> {
        let home = home_dir()?;
        let settings = config::load_at(&home).context("failed to load config")?;
        let (mut database, mut sheet) = open_stores(&settings)?;

        let diffs = diff_records(&mut database, &mut sheet, &home, &policy_of(&settings))
            .context("diff failed")?;

        if diffs.is_empty() {
            println!("No pending changes.");
            return Ok(());
        }

        for diff in diffs {
            print!("{}", diff.unified_diff);
            if !diff.unified_diff.ends_with('\n') {
                println!();
            }
        }
        Ok(())
    }
}
