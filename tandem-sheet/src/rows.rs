//! Pure cell/row mapping between sheet values and [`Record`]s.
//!
//! The first row of a fetched range is the header naming fields; every
//! following row is zipped against it. Rows whose cell count does not match
//! the header are unusable and reported back to the caller, never fatal.

use std::collections::HashMap;

use serde_json::Value as Cell;

use tandem_core::{FieldValue, Record};

/// Render a raw cell as header text.
pub fn cell_text(cell: &Cell) -> String {
    match cell {
        Cell::String(s) => s.clone(),
        Cell::Number(n) => n.to_string(),
        Cell::Bool(b) => b.to_string(),
        Cell::Null => String::new(),
        other => other.to_string(),
    }
}

/// Map a raw cell into a scalar field value. Empty cells are `Null`.
pub fn cell_to_field(cell: &Cell) -> FieldValue {
    match cell {
        Cell::String(s) if s.is_empty() => FieldValue::Null,
        Cell::String(s) => FieldValue::Text(s.clone()),
        Cell::Number(n) => n
            .as_f64()
            .map(FieldValue::Number)
            .unwrap_or(FieldValue::Null),
        Cell::Null => FieldValue::Null,
        other => FieldValue::Text(cell_text(other)),
    }
}

/// Render a field value as an outgoing cell. `Null` becomes the empty
/// string — the values API has no way to write an actual null.
pub fn field_to_cell(value: &FieldValue) -> Cell {
    match value {
        FieldValue::Text(s) => Cell::String(s.clone()),
        FieldValue::Number(n) => serde_json::Number::from_f64(*n)
            .map(Cell::Number)
            .unwrap_or_else(|| Cell::String(value.to_cell_string())),
        FieldValue::Null => Cell::String(String::new()),
    }
}

/// Extract the header row as field names.
pub fn header_of(values: &[Vec<Cell>]) -> Option<Vec<String>> {
    let first = values.first()?;
    if first.is_empty() {
        return None;
    }
    Some(first.iter().map(cell_text).collect())
}

/// Zip data rows (everything after the header) against the header.
///
/// Returns the records plus the 1-based sheet row numbers of rows dropped
/// for a header/cell count mismatch.
pub fn records_from_values(values: &[Vec<Cell>], header: &[String]) -> (Vec<Record>, Vec<usize>) {
    let mut records = Vec::new();
    let mut dropped = Vec::new();
    for (offset, row) in values.iter().skip(1).enumerate() {
        // Header lives in sheet row 1; first data row is row 2.
        let row_number = offset + 2;
        if row.len() != header.len() {
            dropped.push(row_number);
            continue;
        }
        let record: Record = header
            .iter()
            .cloned()
            .zip(row.iter().map(cell_to_field))
            .collect();
        records.push(record);
    }
    (records, dropped)
}

/// Render one record as a row ordered by the header. Fields the header does
/// not name are omitted; header columns the record lacks become empty cells.
pub fn record_to_row(header: &[String], record: &Record) -> Vec<Cell> {
    header
        .iter()
        .map(|name| {
            record
                .get(name)
                .map(field_to_cell)
                .unwrap_or_else(|| Cell::String(String::new()))
        })
        .collect()
}

/// Map id cell text to the 1-based sheet row number holding it.
///
/// Later rows win on duplicate ids, mirroring snapshot construction.
pub fn row_numbers_by_id(values: &[Vec<Cell>], id_index: usize) -> HashMap<String, usize> {
    let mut rows = HashMap::new();
    for (offset, row) in values.iter().skip(1).enumerate() {
        let Some(cell) = row.get(id_index) else {
            continue;
        };
        let id = cell_text(cell);
        if id.trim().is_empty() {
            continue;
        }
        rows.insert(id.trim().to_string(), offset + 2);
    }
    rows
}

/// Spreadsheet column letter for a zero-based index: 0 → A, 25 → Z, 26 → AA.
pub fn column_letter(index: usize) -> String {
    let mut letters = Vec::new();
    let mut n = index + 1;
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push((b'A' + rem as u8) as char);
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
