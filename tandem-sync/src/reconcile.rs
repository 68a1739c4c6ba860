//! Bidirectional reconciliation.
//!
//! Decision precedence per employee id:
//! 1. Present on one side only → propagate to the other side, regardless of
//!    watermark.
//! 2. Present on both with two ordered timestamps → strictly newer side wins;
//!    exact tie is a no-op. Under watermark gating, pairs where neither side
//!    changed since the last cycle are skipped.
//! 3. Present on both with one ordered timestamp → that side propagates when
//!    it changed since the last cycle.
//! 4. No ordered timestamp on either side → inert.
//!
//! Each decision moves one side's record wholesale; fields are never merged.

use std::collections::HashSet;

use chrono::NaiveDateTime;

use tandem_core::{EmployeeId, Record, Snapshot};

use crate::cycle::Side;
use crate::timestamp;

/// Knobs for [`reconcile`].
///
/// `watermark_gating` preserves the historical asymmetry: one-sided records
/// always propagate, while paired records are only examined when a timestamp
/// exceeds the watermark. Disabling it makes paired comparison unconditional
/// too, so a strictly newer side always propagates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcilePolicy {
    pub watermark_gating: bool,
}

impl Default for ReconcilePolicy {
    fn default() -> Self {
        Self {
            watermark_gating: true,
        }
    }
}

/// Decision for a single employee id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Queue the database record for the sheet.
    WriteSheet,
    /// Queue the sheet record for the database.
    WriteDatabase,
    /// Leave both sides untouched.
    Noop(NoopReason),
}

/// Why a paired record produced no write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoopReason {
    /// Both timestamps equal.
    Tie,
    /// Neither side changed since the watermark.
    Unchanged,
    /// No ordered timestamp on either side.
    Unordered,
}

/// The two decision lists produced by one reconciliation pass.
///
/// Mutual exclusivity invariant: no employee id appears in both lists.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcileOutcome {
    pub to_database: Vec<Record>,
    pub to_sheet: Vec<Record>,
}

impl ReconcileOutcome {
    pub fn is_empty(&self) -> bool {
        self.to_database.is_empty() && self.to_sheet.is_empty()
    }
}

/// Classify one id's pair of records into exactly one [`Decision`].
///
/// `db`/`sheet` are the records for the same id on each side; at least one
/// must be present.
pub fn classify_pair(
    db: Option<&Record>,
    sheet: Option<&Record>,
    watermark: NaiveDateTime,
    policy: &ReconcilePolicy,
) -> Decision {
    match (db, sheet) {
        (Some(db_record), Some(sheet_record)) => {
            let t_db = timestamp::normalize(db_record.last_updated());
            let t_sheet = timestamp::normalize(sheet_record.last_updated());
            match (t_db, t_sheet) {
                (Some(t_db), Some(t_sheet)) => {
                    if policy.watermark_gating && t_db <= watermark && t_sheet <= watermark {
                        return Decision::Noop(NoopReason::Unchanged);
                    }
                    if t_db > t_sheet {
                        Decision::WriteSheet
                    } else if t_sheet > t_db {
                        Decision::WriteDatabase
                    } else {
                        Decision::Noop(NoopReason::Tie)
                    }
                }
                (Some(t_db), None) => {
                    if !policy.watermark_gating || t_db > watermark {
                        Decision::WriteSheet
                    } else {
                        Decision::Noop(NoopReason::Unchanged)
                    }
                }
                (None, Some(t_sheet)) => {
                    if !policy.watermark_gating || t_sheet > watermark {
                        Decision::WriteDatabase
                    } else {
                        Decision::Noop(NoopReason::Unchanged)
                    }
                }
                (None, None) => Decision::Noop(NoopReason::Unordered),
            }
        }
        // One-sided records propagate regardless of watermark: a record the
        // other side has never seen must reach it even when its timestamp is
        // old, missing, or unparsable.
        (Some(_), None) => Decision::WriteSheet,
        (None, Some(_)) => Decision::WriteDatabase,
        (None, None) => Decision::Noop(NoopReason::Unordered),
    }
}

/// Reconcile two snapshots against the watermark.
///
/// Pure: inputs are not mutated and no I/O happens. Malformed timestamps are
/// logged and downgraded to absent for this pass; they never abort other
/// records. List order is unspecified.
pub fn reconcile(
    db: &Snapshot,
    sheet: &Snapshot,
    watermark: NaiveDateTime,
    policy: &ReconcilePolicy,
) -> ReconcileOutcome {
    let ids: HashSet<&EmployeeId> = db.ids().chain(sheet.ids()).collect();

    let mut outcome = ReconcileOutcome::default();
    for id in ids {
        let db_record = db.get(id);
        let sheet_record = sheet.get(id);
        warn_malformed(Side::Database, id, db_record);
        warn_malformed(Side::Sheet, id, sheet_record);

        match classify_pair(db_record, sheet_record, watermark, policy) {
            Decision::WriteSheet => {
                if let Some(record) = db_record {
                    outcome.to_sheet.push(record.clone());
                }
            }
            Decision::WriteDatabase => {
                if let Some(record) = sheet_record {
                    outcome.to_database.push(record.clone());
                }
            }
            Decision::Noop(reason) => {
                tracing::debug!("{id}: no action ({reason:?})");
            }
        }
    }
    outcome
}

fn warn_malformed(side: Side, id: &EmployeeId, record: Option<&Record>) {
    let Some(record) = record else { return };
    let raw = record.last_updated();
    if timestamp::is_malformed(raw) {
        tracing::warn!("{side}: unparsable last_updated for employee {id}: {raw:?}");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    use tandem_core::{FieldValue, ID_FIELD, LAST_UPDATED_FIELD};

    fn record(id: &str, last_updated: Option<&str>) -> Record {
        let mut record = Record::new();
        record.set(ID_FIELD, FieldValue::Text(id.into()));
        record.set("FirstName", FieldValue::Text("Ana".into()));
        if let Some(ts) = last_updated {
            record.set(LAST_UPDATED_FIELD, FieldValue::Text(ts.into()));
        }
        record
    }

    fn snapshot(records: Vec<Record>) -> Snapshot {
        Snapshot::from_records(records)
    }

    fn watermark(raw: &str) -> NaiveDateTime {
        timestamp::parse_text(raw).expect("valid watermark literal")
    }

    fn ids_of(records: &[Record]) -> BTreeSet<String> {
        records
            .iter()
            .filter_map(|r| r.employee_id())
            .map(|id| id.0)
            .collect()
    }

    #[test]
    fn one_sided_database_record_propagates() {
        let db = snapshot(vec![record("7", Some("2024-03-01 10:00:00"))]);
        let sheet = snapshot(vec![]);
        let outcome = reconcile(
            &db,
            &sheet,
            watermark("2024-01-01 00:00:00"),
            &ReconcilePolicy::default(),
        );

        assert_eq!(ids_of(&outcome.to_sheet), BTreeSet::from(["7".to_string()]));
        assert!(outcome.to_database.is_empty());
    }

    #[test]
    fn newer_sheet_side_wins_paired_comparison() {
        let db = snapshot(vec![record("7", Some("2024-03-01 10:00:00"))]);
        let sheet = snapshot(vec![record("7", Some("2024-03-02 09:00:00"))]);
        let outcome = reconcile(
            &db,
            &sheet,
            watermark("2024-01-01 00:00:00"),
            &ReconcilePolicy::default(),
        );

        assert_eq!(ids_of(&outcome.to_database), BTreeSet::from(["7".to_string()]));
        assert!(outcome.to_sheet.is_empty());
    }

    #[test]
    fn equal_timestamps_are_a_noop() {
        let db = snapshot(vec![record("7", Some("2024-03-01 10:00:00"))]);
        let sheet = snapshot(vec![record("7", Some("2024-03-01 10:00:00"))]);
        let outcome = reconcile(
            &db,
            &sheet,
            watermark("2024-01-01 00:00:00"),
            &ReconcilePolicy::default(),
        );

        assert!(outcome.is_empty());
    }

    #[test]
    fn one_sided_record_ignores_the_watermark() {
        // Older than the watermark, still propagates: the sheet has never
        // seen this record.
        let db = snapshot(vec![record("7", Some("2023-06-01 00:00:00"))]);
        let sheet = snapshot(vec![]);
        let outcome = reconcile(
            &db,
            &sheet,
            watermark("2024-01-01 00:00:00"),
            &ReconcilePolicy::default(),
        );

        assert_eq!(ids_of(&outcome.to_sheet), BTreeSet::from(["7".to_string()]));
    }

    #[test]
    fn malformed_timestamp_behaves_like_missing() {
        let db = snapshot(vec![record("7", Some("bad-value"))]);
        let sheet = snapshot(vec![record("7", Some("2024-01-01 00:00:00"))]);
        let outcome = reconcile(
            &db,
            &sheet,
            watermark("2020-01-01 00:00:00"),
            &ReconcilePolicy::default(),
        );

        // Sheet is the only ordered side and exceeds the watermark.
        assert_eq!(ids_of(&outcome.to_database), BTreeSet::from(["7".to_string()]));
        assert!(outcome.to_sheet.is_empty());

        let missing = snapshot(vec![record("7", None)]);
        let same = reconcile(
            &missing,
            &sheet,
            watermark("2020-01-01 00:00:00"),
            &ReconcilePolicy::default(),
        );
        assert_eq!(ids_of(&same.to_database), ids_of(&outcome.to_database));
    }

    #[test]
    fn paired_records_below_watermark_are_skipped_under_gating() {
        let db = snapshot(vec![record("7", Some("2023-02-01 10:00:00"))]);
        let sheet = snapshot(vec![record("7", Some("2023-01-01 10:00:00"))]);
        let outcome = reconcile(
            &db,
            &sheet,
            watermark("2024-01-01 00:00:00"),
            &ReconcilePolicy::default(),
        );

        assert!(outcome.is_empty());
    }

    #[test]
    fn gating_disabled_propagates_stale_differences() {
        let db = snapshot(vec![record("7", Some("2023-02-01 10:00:00"))]);
        let sheet = snapshot(vec![record("7", Some("2023-01-01 10:00:00"))]);
        let outcome = reconcile(
            &db,
            &sheet,
            watermark("2024-01-01 00:00:00"),
            &ReconcilePolicy {
                watermark_gating: false,
            },
        );

        assert_eq!(ids_of(&outcome.to_sheet), BTreeSet::from(["7".to_string()]));
        assert!(outcome.to_database.is_empty());
    }

    #[test]
    fn both_timestamps_absent_is_inert() {
        let db = snapshot(vec![record("7", None)]);
        let sheet = snapshot(vec![record("7", Some("nonsense"))]);
        let outcome = reconcile(
            &db,
            &sheet,
            watermark("2020-01-01 00:00:00"),
            &ReconcilePolicy::default(),
        );

        assert!(outcome.is_empty());
    }

    #[test]
    fn no_id_appears_in_both_lists() {
        let db = snapshot(vec![
            record("1", Some("2024-03-01 10:00:00")),
            record("2", Some("2024-02-01 10:00:00")),
            record("3", Some("2024-01-10 10:00:00")),
        ]);
        let sheet = snapshot(vec![
            record("1", Some("2024-03-02 10:00:00")),
            record("2", Some("2024-01-01 10:00:00")),
            record("4", Some("2024-01-05 10:00:00")),
        ]);
        let outcome = reconcile(
            &db,
            &sheet,
            watermark("2024-01-01 00:00:00"),
            &ReconcilePolicy::default(),
        );

        let to_db = ids_of(&outcome.to_database);
        let to_sheet = ids_of(&outcome.to_sheet);
        assert!(to_db.is_disjoint(&to_sheet), "{to_db:?} vs {to_sheet:?}");
        assert_eq!(
            to_db,
            BTreeSet::from(["1".to_string(), "4".to_string()])
        );
        assert_eq!(
            to_sheet,
            BTreeSet::from(["2".to_string(), "3".to_string()])
        );
    }

    #[test]
    fn second_pass_after_advancing_watermark_is_empty() {
        let db = snapshot(vec![record("7", Some("2024-03-01 10:00:00"))]);
        let sheet = snapshot(vec![record("7", Some("2024-03-02 09:00:00"))]);
        let policy = ReconcilePolicy::default();

        let first = reconcile(&db, &sheet, watermark("2024-01-01 00:00:00"), &policy);
        assert!(!first.is_empty());

        // Apply the winner to the database side, as a cycle would, then run
        // again with the watermark advanced past the cycle.
        let db = snapshot(vec![record("7", Some("2024-03-02 09:00:00"))]);
        let second = reconcile(&db, &sheet, watermark("2024-03-03 00:00:00"), &policy);
        assert!(second.is_empty());
    }

    #[test]
    fn classify_reports_noop_reasons() {
        let policy = ReconcilePolicy::default();
        let wm = watermark("2024-01-01 00:00:00");

        let a = record("7", Some("2024-03-01 10:00:00"));
        let b = record("7", Some("2024-03-01 10:00:00"));
        assert_eq!(
            classify_pair(Some(&a), Some(&b), wm, &policy),
            Decision::Noop(NoopReason::Tie)
        );

        let a = record("7", None);
        let b = record("7", None);
        assert_eq!(
            classify_pair(Some(&a), Some(&b), wm, &policy),
            Decision::Noop(NoopReason::Unordered)
        );

        let a = record("7", Some("2023-01-01 00:00:00"));
        let b = record("7", Some("2023-01-02 00:00:00"));
        assert_eq!(
            classify_pair(Some(&a), Some(&b), wm, &policy),
            Decision::Noop(NoopReason::Unchanged)
        );
    }
}
