//! `tandem init` — write a starter config and create the roster table.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;

use tandem_core::{config, Settings};
use tandem_db::DatabaseStore;

use super::home_dir;

/// Arguments for `tandem init`.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Spreadsheet id to reconcile against.
    #[arg(long)]
    pub spreadsheet_id: String,

    /// Path for the SQLite roster database.
    #[arg(long, default_value = "roster.db")]
    pub database: PathBuf,

    /// Overwrite an existing config.
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    pub fn run(self) -> Result<()> {
        let home = home_dir()?;
        let config_path = config::config_path_at(&home);
        if config_path.exists() && !self.force {
            bail!(
                "config already exists at {}; pass --force to overwrite",
                config_path.display()
            );
        }

        let settings = Settings::template(self.database, self.spreadsheet_id);
        config::save_at(&home, &settings).context("failed to write config")?;

        let store = DatabaseStore::from_settings(&settings.database)
            .context("failed to open the roster database")?;
        store
            .install_schema()
            .context("failed to create the roster table")?;

        println!("✓ Wrote {}", config_path.display());
        println!(
            "  Roster table '{}' ready in {}",
            settings.database.table,
            settings.database.path.display()
        );
        println!("  Set sheet credentials via `sheet.token_file` or $TANDEM_SHEET_TOKEN.");
        Ok(())
    }
}
