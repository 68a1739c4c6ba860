//! One reconciliation cycle over injected record stores.
//!
//! ## `run_cycle` — per-cycle protocol
//!
//! 1. Capture the cycle start time (the candidate next watermark).
//! 2. Load the current watermark.
//! 3. Fetch both sides; a failed fetch aborts the cycle with the watermark
//!    untouched — never reconcile against a missing side.
//! 4. Build snapshots (id-less records dropped, duplicate ids last-seen-wins).
//! 5. Reconcile.
//! 6. Apply each side's list; one side failing does not stop the other.
//! 7. Advance the watermark to the start time only when both writers
//!    succeeded, so unreplicated changes are re-examined next cycle.

use std::fmt;
use std::path::Path;

use chrono::{Local, NaiveDateTime};

use tandem_core::{Record, Snapshot, ID_FIELD};

use crate::error::SyncError;
use crate::reconcile::{reconcile, ReconcilePolicy};
use crate::watermark;

// ---------------------------------------------------------------------------
// Store contract
// ---------------------------------------------------------------------------

/// Which side of the reconciliation a store serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Database,
    Sheet,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Database => write!(f, "database"),
            Side::Sheet => write!(f, "sheet"),
        }
    }
}

/// A record store collaborator: one full read plus one id-keyed upsert batch
/// per cycle. Implementations live outside this crate and are injected into
/// [`run_cycle`].
pub trait RecordStore {
    fn side(&self) -> Side;

    /// Full read of the store's current records.
    fn fetch(&mut self) -> Result<Vec<Record>, SyncError>;

    /// Upsert every record by its id field; returns how many were written.
    fn apply(&mut self, records: &[Record]) -> Result<usize, SyncError>;
}

// ---------------------------------------------------------------------------
// Cycle report
// ---------------------------------------------------------------------------

/// Outcome of applying one side's decision list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SideOutcome {
    /// Records were written (possibly zero — an empty list is a success).
    Applied { written: usize },
    /// Dry-run mode: the records *would* have been written.
    WouldApply { queued: usize },
    /// The writer failed; the watermark must not advance past this cycle.
    Failed { error: String },
}

impl SideOutcome {
    pub fn succeeded(&self) -> bool {
        matches!(self, SideOutcome::Applied { .. })
    }
}

/// Summary of a single cycle, returned to the CLI and daemon.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub dry_run: bool,
    pub started_at: NaiveDateTime,
    pub watermark_before: NaiveDateTime,
    /// `Some` only when the watermark was advanced this cycle.
    pub watermark_after: Option<NaiveDateTime>,
    pub database_read: usize,
    pub sheet_read: usize,
    pub database_dropped: usize,
    pub sheet_dropped: usize,
    pub queued_to_database: usize,
    pub queued_to_sheet: usize,
    pub database_write: SideOutcome,
    pub sheet_write: SideOutcome,
}

impl CycleReport {
    pub fn advanced(&self) -> bool {
        self.watermark_after.is_some()
    }
}

// ---------------------------------------------------------------------------
// run_cycle
// ---------------------------------------------------------------------------

/// Run one reconciliation cycle.
///
/// `database` and `sheet` are the two injected collaborators; `home` roots
/// the watermark store. With `dry_run` nothing is written and the watermark
/// is left alone.
pub fn run_cycle(
    database: &mut dyn RecordStore,
    sheet: &mut dyn RecordStore,
    home: &Path,
    policy: &ReconcilePolicy,
    dry_run: bool,
) -> Result<CycleReport, SyncError> {
    let started_at = watermark::truncate_to_seconds(Local::now().naive_local());
    let watermark_before = watermark::load_at(home)?;

    let db_rows = database.fetch()?;
    let sheet_rows = sheet.fetch()?;

    let db_snapshot = snapshot_side(Side::Database, db_rows);
    let sheet_snapshot = snapshot_side(Side::Sheet, sheet_rows);

    let outcome = reconcile(&db_snapshot, &sheet_snapshot, watermark_before, policy);
    tracing::info!(
        "reconciled {} database + {} sheet records: {} queued to sheet, {} to database",
        db_snapshot.len(),
        sheet_snapshot.len(),
        outcome.to_sheet.len(),
        outcome.to_database.len(),
    );

    let mut report = CycleReport {
        dry_run,
        started_at,
        watermark_before,
        watermark_after: None,
        database_read: db_snapshot.len(),
        sheet_read: sheet_snapshot.len(),
        database_dropped: db_snapshot.dropped_missing_id(),
        sheet_dropped: sheet_snapshot.dropped_missing_id(),
        queued_to_database: outcome.to_database.len(),
        queued_to_sheet: outcome.to_sheet.len(),
        database_write: SideOutcome::WouldApply {
            queued: outcome.to_database.len(),
        },
        sheet_write: SideOutcome::WouldApply {
            queued: outcome.to_sheet.len(),
        },
    };

    if dry_run {
        return Ok(report);
    }

    report.database_write = apply_side(database, &outcome.to_database);
    report.sheet_write = apply_side(sheet, &outcome.to_sheet);

    if report.database_write.succeeded() && report.sheet_write.succeeded() {
        watermark::save_at(home, started_at)?;
        report.watermark_after = Some(started_at);
    } else {
        tracing::warn!("watermark frozen at {watermark_before}: a writer failed this cycle");
    }

    Ok(report)
}

fn apply_side(store: &mut dyn RecordStore, records: &[Record]) -> SideOutcome {
    if records.is_empty() {
        return SideOutcome::Applied { written: 0 };
    }
    match store.apply(records) {
        Ok(written) => {
            tracing::info!("{}: wrote {written} record(s)", store.side());
            SideOutcome::Applied { written }
        }
        Err(err) => {
            tracing::error!("{}: apply failed: {err}", store.side());
            SideOutcome::Failed {
                error: err.to_string(),
            }
        }
    }
}

fn snapshot_side(side: Side, rows: Vec<Record>) -> Snapshot {
    for row in &rows {
        if row.employee_id().is_none() {
            tracing::warn!("{side}: dropping record without a usable {ID_FIELD}: {row:?}");
        }
    }
    let snapshot = Snapshot::from_records(rows);
    if snapshot.dropped_missing_id() > 0 {
        tracing::warn!(
            "{side}: dropped {} record(s) without {ID_FIELD}",
            snapshot.dropped_missing_id()
        );
    }
    snapshot
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    use tandem_core::{EmployeeId, FieldValue, LAST_UPDATED_FIELD};

    use crate::error::store_err;

    struct MemStore {
        side: Side,
        rows: Vec<Record>,
        fail_fetch: bool,
        fail_apply: bool,
        applied: Vec<Record>,
    }

    impl MemStore {
        fn new(side: Side, rows: Vec<Record>) -> Self {
            Self {
                side,
                rows,
                fail_fetch: false,
                fail_apply: false,
                applied: Vec::new(),
            }
        }

        fn ids_applied(&self) -> Vec<EmployeeId> {
            self.applied.iter().filter_map(|r| r.employee_id()).collect()
        }
    }

    impl RecordStore for MemStore {
        fn side(&self) -> Side {
            self.side
        }

        fn fetch(&mut self) -> Result<Vec<Record>, SyncError> {
            if self.fail_fetch {
                return Err(store_err(
                    self.side,
                    std::io::Error::other("fetch unavailable"),
                ));
            }
            Ok(self.rows.clone())
        }

        fn apply(&mut self, records: &[Record]) -> Result<usize, SyncError> {
            if self.fail_apply {
                return Err(store_err(
                    self.side,
                    std::io::Error::other("write refused"),
                ));
            }
            for record in records {
                let id = record.employee_id();
                self.rows.retain(|r| r.employee_id() != id);
                self.rows.push(record.clone());
                self.applied.push(record.clone());
            }
            Ok(records.len())
        }
    }

    fn record(id: &str, last_updated: &str) -> Record {
        let mut record = Record::new();
        record.set(ID_FIELD, FieldValue::Text(id.into()));
        record.set(LAST_UPDATED_FIELD, FieldValue::Text(last_updated.into()));
        record
    }

    fn init_logs() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn cycle_moves_records_and_advances_watermark() {
        let home = TempDir::new().unwrap();
        let mut db = MemStore::new(Side::Database, vec![record("7", "2024-03-01 10:00:00")]);
        let mut sheet = MemStore::new(Side::Sheet, vec![record("7", "2024-03-02 09:00:00")]);

        let report = run_cycle(
            &mut db,
            &mut sheet,
            home.path(),
            &ReconcilePolicy::default(),
            false,
        )
        .expect("cycle");

        assert_eq!(db.ids_applied(), vec![EmployeeId::from("7")]);
        assert!(sheet.applied.is_empty());
        assert!(report.advanced());
        assert_eq!(
            watermark::load_at(home.path()).unwrap(),
            report.started_at
        );
    }

    #[test]
    fn dry_run_writes_nothing_and_keeps_the_watermark() {
        let home = TempDir::new().unwrap();
        let mut db = MemStore::new(Side::Database, vec![record("7", "2024-03-01 10:00:00")]);
        let mut sheet = MemStore::new(Side::Sheet, vec![]);

        let report = run_cycle(
            &mut db,
            &mut sheet,
            home.path(),
            &ReconcilePolicy::default(),
            true,
        )
        .expect("cycle");

        assert!(db.applied.is_empty() && sheet.applied.is_empty());
        assert!(!report.advanced());
        assert_eq!(report.sheet_write, SideOutcome::WouldApply { queued: 1 });
        assert_eq!(
            watermark::load_at(home.path()).unwrap(),
            watermark::default_epoch(),
            "dry run must not create a watermark"
        );
    }

    #[test]
    fn fetch_failure_skips_the_cycle_entirely() {
        let home = TempDir::new().unwrap();
        let mut db = MemStore::new(Side::Database, vec![record("7", "2024-03-01 10:00:00")]);
        db.fail_fetch = true;
        let mut sheet = MemStore::new(Side::Sheet, vec![]);

        let err = run_cycle(
            &mut db,
            &mut sheet,
            home.path(),
            &ReconcilePolicy::default(),
            false,
        )
        .expect_err("fetch failure must abort");
        assert!(matches!(err, SyncError::Store { side: Side::Database, .. }));
        assert!(
            !watermark::store_path_at(home.path()).exists(),
            "watermark must not advance on a skipped cycle"
        );
    }

    #[test]
    fn partial_write_failure_freezes_watermark_but_applies_other_side() {
        init_logs();
        let home = TempDir::new().unwrap();
        // Each side holds one record the other has never seen, so both
        // writers have work to do.
        let mut db = MemStore::new(Side::Database, vec![record("1", "2024-03-01 10:00:00")]);
        let mut sheet = MemStore::new(Side::Sheet, vec![record("2", "2024-03-01 11:00:00")]);
        sheet.fail_apply = true;

        let report = run_cycle(
            &mut db,
            &mut sheet,
            home.path(),
            &ReconcilePolicy::default(),
            false,
        )
        .expect("cycle reports per-side failures without erroring");

        assert_eq!(db.ids_applied(), vec![EmployeeId::from("2")]);
        assert!(matches!(report.sheet_write, SideOutcome::Failed { .. }));
        assert!(report.database_write.succeeded());
        assert!(!report.advanced());
        assert!(!watermark::store_path_at(home.path()).exists());
    }

    #[test]
    fn quiet_cycle_still_advances_the_watermark() {
        let home = TempDir::new().unwrap();
        let shared = record("7", "2024-03-01 10:00:00");
        let mut db = MemStore::new(Side::Database, vec![shared.clone()]);
        let mut sheet = MemStore::new(Side::Sheet, vec![shared]);

        let report = run_cycle(
            &mut db,
            &mut sheet,
            home.path(),
            &ReconcilePolicy::default(),
            false,
        )
        .expect("cycle");

        assert_eq!(report.queued_to_database + report.queued_to_sheet, 0);
        assert!(report.advanced(), "no-op cycles still mark completion");
    }

    #[test]
    fn second_cycle_after_first_is_idempotent() {
        let home = TempDir::new().unwrap();
        let mut db = MemStore::new(Side::Database, vec![record("7", "2024-03-01 10:00:00")]);
        let mut sheet = MemStore::new(Side::Sheet, vec![]);

        let first = run_cycle(
            &mut db,
            &mut sheet,
            home.path(),
            &ReconcilePolicy::default(),
            false,
        )
        .expect("first cycle");
        assert_eq!(first.queued_to_sheet, 1);

        let second = run_cycle(
            &mut db,
            &mut sheet,
            home.path(),
            &ReconcilePolicy::default(),
            false,
        )
        .expect("second cycle");
        assert_eq!(second.queued_to_sheet + second.queued_to_database, 0);
        assert!(sheet.applied.len() == 1, "no rewrites on the second cycle");
    }
}
