//! Command implementations and shared wiring.

pub mod cycle;
pub mod diff;
pub mod init;
pub mod status;
pub mod watch;

use std::path::PathBuf;

use anyhow::{Context, Result};

use tandem_core::Settings;
use tandem_db::DatabaseStore;
use tandem_sheet::SheetStore;
use tandem_sync::ReconcilePolicy;

pub(crate) fn home_dir() -> Result<PathBuf> {
    dirs::home_dir().context("could not determine home directory")
}

/// Open both collaborator stores from settings. Credential and connection
/// problems surface here, before any cycle work starts.
pub(crate) fn open_stores(settings: &Settings) -> Result<(DatabaseStore, SheetStore)> {
    let database = DatabaseStore::from_settings(&settings.database)
        .context("failed to open the roster database")?;
    let sheet = SheetStore::from_settings(&settings.sheet)
        .context("failed to set up the sheet client")?;
    Ok((database, sheet))
}

pub(crate) fn policy_of(settings: &Settings) -> ReconcilePolicy {
    ReconcilePolicy {
        watermark_gating: settings.watermark_gating,
    }
}
