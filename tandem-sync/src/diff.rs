//! Dry-run unified diff support for `tandem diff`.

use std::path::Path;

use similar::TextDiff;

use tandem_core::{EmployeeId, FieldValue, Record, Snapshot};

use crate::cycle::{RecordStore, Side};
use crate::error::SyncError;
use crate::reconcile::{reconcile, ReconcilePolicy};
use crate::watermark;

/// A single queued record rendered as a unified diff against the
/// destination side's current state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordDiff {
    pub id: EmployeeId,
    pub destination: Side,
    pub unified_diff: String,
}

/// Render what a cycle would write and compare it to each destination's
/// current record.
///
/// Nothing is written and the watermark is left alone.
pub fn diff_records(
    database: &mut dyn RecordStore,
    sheet: &mut dyn RecordStore,
    home: &Path,
    policy: &ReconcilePolicy,
) -> Result<Vec<RecordDiff>, SyncError> {
    let watermark = watermark::load_at(home)?;
    let db_snapshot = Snapshot::from_records(database.fetch()?);
    let sheet_snapshot = Snapshot::from_records(sheet.fetch()?);

    let outcome = reconcile(&db_snapshot, &sheet_snapshot, watermark, policy);

    let mut diffs = Vec::new();
    collect_side(
        &mut diffs,
        Side::Database,
        &db_snapshot,
        &outcome.to_database,
    );
    collect_side(&mut diffs, Side::Sheet, &sheet_snapshot, &outcome.to_sheet);
    diffs.sort_by(|a, b| (a.destination as u8, &a.id.0).cmp(&(b.destination as u8, &b.id.0)));
    Ok(diffs)
}

fn collect_side(
    diffs: &mut Vec<RecordDiff>,
    destination: Side,
    current: &Snapshot,
    queued: &[Record],
) {
    for record in queued {
        let Some(id) = record.employee_id() else {
            continue;
        };
        let existing = render_record(current.get(&id));
        let incoming = render_record(Some(record));
        if existing == incoming {
            continue;
        }

        let old_header = format!("a/{id} ({destination})");
        let new_header = format!("b/{id} ({destination})");
        let unified = TextDiff::from_lines(&existing, &incoming)
            .unified_diff()
            .header(&old_header, &new_header)
            .context_radius(3)
            .to_string();

        diffs.push(RecordDiff {
            id,
            destination,
            unified_diff: unified,
        });
    }
}

fn render_record(record: Option<&Record>) -> String {
    let Some(record) = record else {
        return String::new();
    };
    let mut out = String::new();
    for (name, value) in record.fields() {
        out.push_str(name);
        out.push_str(": ");
        out.push_str(&render_value(value));
        out.push('\n');
    }
    out
}

fn render_value(value: &FieldValue) -> String {
    match value {
        FieldValue::Null => "(null)".to_string(),
        other => other.to_cell_string(),
    }
}
