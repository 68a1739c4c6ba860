//! Foreground scheduler: one reconciliation cycle per interval tick.
//!
//! Cycles never overlap — each tick's cycle is awaited before the next tick
//! is taken (missed ticks are delayed, not stacked). A failed cycle is
//! logged and the loop continues; only ctrl-c or a broken runtime stops it.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::time::MissedTickBehavior;

use tandem_core::Settings;
use tandem_db::DatabaseStore;
use tandem_sheet::SheetStore;
use tandem_sync::{run_cycle, CycleReport, ReconcilePolicy};

use crate::error::{io_err, DaemonError};

/// Start the scheduler and block the current thread until it exits.
pub fn start_blocking(home: &Path, settings: Settings) -> Result<(), DaemonError> {
    init_tracing();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;
    runtime.block_on(run(home.to_path_buf(), settings))
}

/// Run the scheduler loop. The first cycle starts immediately.
pub async fn run(home: PathBuf, settings: Settings) -> Result<(), DaemonError> {
    let mut interval = tokio::time::interval(cycle_period(settings.interval_secs));
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            signal = &mut ctrl_c => {
                match signal {
                    Ok(()) => {
                        tracing::info!("received ctrl-c, shutting down");
                        return Ok(());
                    }
                    Err(err) => return Err(DaemonError::Signal(err.to_string())),
                }
            }
            _ = interval.tick() => {
                let home = home.clone();
                let settings = settings.clone();
                let outcome = tokio::task::spawn_blocking(move || {
                    run_one_cycle(&home, &settings)
                })
                .await
                .map_err(|err| DaemonError::Join(err.to_string()))?;

                match outcome {
                    Ok(report) => log_report(&report),
                    // Next tick gets a fresh attempt; the watermark was left
                    // alone by the failed cycle.
                    Err(err) => tracing::error!(error = %err, "cycle failed"),
                }
            }
        }
    }
}

/// Wire up both stores from settings and run a single live cycle.
pub fn run_one_cycle(home: &Path, settings: &Settings) -> Result<CycleReport, DaemonError> {
    let mut database = DatabaseStore::from_settings(&settings.database)?;
    let mut sheet = SheetStore::from_settings(&settings.sheet)?;
    let policy = ReconcilePolicy {
        watermark_gating: settings.watermark_gating,
    };
    Ok(run_cycle(&mut database, &mut sheet, home, &policy, false)?)
}

fn log_report(report: &CycleReport) {
    tracing::info!(
        database_read = report.database_read,
        sheet_read = report.sheet_read,
        to_database = report.queued_to_database,
        to_sheet = report.queued_to_sheet,
        advanced = report.advanced(),
        "cycle completed",
    );
    if report.database_dropped + report.sheet_dropped > 0 {
        tracing::warn!(
            database_dropped = report.database_dropped,
            sheet_dropped = report.sheet_dropped,
            "records without an id were dropped this cycle",
        );
    }
}

fn cycle_period(interval_secs: u64) -> Duration {
    Duration::from_secs(interval_secs.max(1))
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}
