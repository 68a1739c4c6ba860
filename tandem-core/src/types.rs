//! Domain types for the tandem roster.
//!
//! Records are schemaless field maps keyed by column name; the only two
//! fields with reserved meaning are [`ID_FIELD`] and [`LAST_UPDATED_FIELD`].
//! All types are serializable/deserializable via serde.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

/// Field naming the stable record identifier. Always treated as an opaque
/// string for equality and lookup, never parsed numerically.
pub const ID_FIELD: &str = "EmployeeID";

/// Field carrying the record's last-modified timestamp
/// (`YYYY-MM-DD HH:MM:SS`, timezone-naive, second precision).
pub const LAST_UPDATED_FIELD: &str = "last_updated";

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A strongly-typed employee identifier, used as the snapshot key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EmployeeId(pub String);

impl fmt::Display for EmployeeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for EmployeeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for EmployeeId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Field values
// ---------------------------------------------------------------------------

/// A single scalar cell value.
///
/// Deserializes untagged: JSON strings become [`FieldValue::Text`], numbers
/// become [`FieldValue::Number`], `null` becomes [`FieldValue::Null`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Number(f64),
    Null,
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Cell rendering used when a value must become sheet text.
    ///
    /// Whole-number floats drop the fractional part so an id ingested as
    /// `7.0` round-trips as `"7"`.
    pub fn to_cell_string(&self) -> String {
        match self {
            FieldValue::Text(s) => s.clone(),
            FieldValue::Number(n) if n.fract() == 0.0 && n.is_finite() => {
                format!("{}", *n as i64)
            }
            FieldValue::Number(n) => n.to_string(),
            FieldValue::Null => String::new(),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_owned())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        FieldValue::Number(n)
    }
}

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// One employee record: an ordered mapping from field name to scalar value.
///
/// Payload fields (everything except [`ID_FIELD`] and [`LAST_UPDATED_FIELD`])
/// are opaque: the reconciler never inspects them, only moves the record as
/// a unit.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: BTreeMap<String, FieldValue>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: impl Into<String>, value: FieldValue) {
        self.fields.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// The record's identifier, if present and non-empty.
    ///
    /// A numeric id cell is coerced to its text form; the id is never
    /// treated as a number afterwards.
    pub fn employee_id(&self) -> Option<EmployeeId> {
        match self.fields.get(ID_FIELD)? {
            FieldValue::Text(s) if !s.trim().is_empty() => Some(EmployeeId::from(s.trim())),
            numeric @ FieldValue::Number(_) => Some(EmployeeId(numeric.to_cell_string())),
            _ => None,
        }
    }

    /// Raw `last_updated` value, unparsed. `None` when the field is absent.
    pub fn last_updated(&self) -> Option<&FieldValue> {
        self.fields.get(LAST_UPDATED_FIELD)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.fields.iter()
    }

    pub fn field_names(&self) -> impl Iterator<Item = &String> {
        self.fields.keys()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl FromIterator<(String, FieldValue)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, FieldValue)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// A full read of one side's records at a point in time, keyed by id.
///
/// At most one record per [`EmployeeId`]; when a source yields duplicates the
/// last-seen record wins. Records without a usable id are dropped and
/// counted — callers decide whether to log them.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    records: HashMap<EmployeeId, Record>,
    dropped_missing_id: usize,
}

impl Snapshot {
    pub fn from_records(rows: impl IntoIterator<Item = Record>) -> Self {
        let mut records = HashMap::new();
        let mut dropped_missing_id = 0;
        for record in rows {
            match record.employee_id() {
                Some(id) => {
                    records.insert(id, record);
                }
                None => dropped_missing_id += 1,
            }
        }
        Self {
            records,
            dropped_missing_id,
        }
    }

    pub fn get(&self, id: &EmployeeId) -> Option<&Record> {
        self.records.get(id)
    }

    pub fn contains(&self, id: &EmployeeId) -> bool {
        self.records.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &EmployeeId> {
        self.records.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&EmployeeId, &Record)> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Source rows discarded during construction because they carried no
    /// usable [`ID_FIELD`].
    pub fn dropped_missing_id(&self) -> usize {
        self.dropped_missing_id
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn record(pairs: &[(&str, FieldValue)]) -> Record {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn employee_id_display_and_equality() {
        let a = EmployeeId::from("7");
        let b = EmployeeId::from(String::from("7"));
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "7");
    }

    #[test]
    fn numeric_id_coerces_to_text() {
        let rec = record(&[(ID_FIELD, FieldValue::Number(7.0))]);
        assert_eq!(rec.employee_id(), Some(EmployeeId::from("7")));
    }

    #[test]
    fn blank_or_null_id_is_missing() {
        let rec = record(&[(ID_FIELD, FieldValue::Text("   ".into()))]);
        assert_eq!(rec.employee_id(), None);
        let rec = record(&[(ID_FIELD, FieldValue::Null)]);
        assert_eq!(rec.employee_id(), None);
        assert_eq!(Record::new().employee_id(), None);
    }

    #[test]
    fn field_value_json_roundtrip() {
        let json = r#"{"EmployeeID":"7","Salary":1200.5,"EndDate":null}"#;
        let rec: Record = serde_json::from_str(json).expect("deserialize");
        assert_eq!(rec.get("EmployeeID"), Some(&FieldValue::Text("7".into())));
        assert_eq!(rec.get("Salary"), Some(&FieldValue::Number(1200.5)));
        assert_eq!(rec.get("EndDate"), Some(&FieldValue::Null));

        let back = serde_json::to_string(&rec).expect("serialize");
        let again: Record = serde_json::from_str(&back).expect("re-deserialize");
        assert_eq!(rec, again);
    }

    #[rstest]
    #[case(FieldValue::Number(7.0), "7")]
    #[case(FieldValue::Number(7.5), "7.5")]
    #[case(FieldValue::Number(-3.0), "-3")]
    #[case(FieldValue::Text("x".into()), "x")]
    #[case(FieldValue::Null, "")]
    fn cell_string_rendering(#[case] value: FieldValue, #[case] expected: &str) {
        assert_eq!(value.to_cell_string(), expected);
    }

    #[test]
    fn snapshot_last_seen_wins_on_duplicate_ids() {
        let first = record(&[(ID_FIELD, "7".into()), ("Department", "Sales".into())]);
        let second = record(&[(ID_FIELD, "7".into()), ("Department", "Support".into())]);
        let snapshot = Snapshot::from_records(vec![first, second]);

        assert_eq!(snapshot.len(), 1);
        let kept = snapshot.get(&EmployeeId::from("7")).expect("record");
        assert_eq!(kept.get("Department"), Some(&FieldValue::Text("Support".into())));
    }

    #[test]
    fn snapshot_drops_and_counts_idless_records() {
        let with_id = record(&[(ID_FIELD, "1".into())]);
        let without_id = record(&[("FirstName", "Ana".into())]);
        let snapshot = Snapshot::from_records(vec![with_id, without_id]);

        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.dropped_missing_id(), 1);
    }
}
