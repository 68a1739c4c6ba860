//! Spreadsheet-side record store.
//!
//! Reads the whole tab each cycle (header row + data rows) and writes by
//! locating existing rows through the configured id column: matched rows are
//! updated in place, unknown ids are appended after the last used row.

use serde_json::Value as Cell;

use tandem_core::config::SheetSettings;
use tandem_core::{ConfigError, Record, ID_FIELD};
use tandem_sync::{store_err, RecordStore, Side, SyncError};

use crate::client::SheetClient;
use crate::error::SheetError;
use crate::rows::{
    column_letter, header_of, record_to_row, records_from_values, row_numbers_by_id,
};

#[derive(Debug)]
pub struct SheetStore {
    client: SheetClient,
    tab: String,
    id_column: String,
}

impl SheetStore {
    pub fn new(client: SheetClient, tab: impl Into<String>, id_column: impl Into<String>) -> Self {
        Self {
            client,
            tab: tab.into(),
            id_column: id_column.into(),
        }
    }

    /// Build a store from config settings, resolving credentials. Fails fast
    /// when no token can be found.
    pub fn from_settings(settings: &SheetSettings) -> Result<Self, ConfigError> {
        Ok(Self::new(
            SheetClient::from_settings(settings)?,
            settings.tab.clone(),
            settings.id_column.clone(),
        ))
    }

    fn full_range(&self) -> String {
        format!("{}!A1:Z", self.tab)
    }

    /// Read every record from the tab. The first row names the fields;
    /// rows that do not line up with the header are dropped with a warning.
    pub fn fetch_records(&self) -> Result<Vec<Record>, SheetError> {
        let values = self.client.get_values(&self.full_range())?;
        let Some(header) = header_of(&values) else {
            tracing::info!("sheet: no rows in {:?}", self.tab);
            return Ok(Vec::new());
        };

        let (records, dropped) = records_from_values(&values, &header);
        for row_number in &dropped {
            tracing::warn!(
                "sheet: dropping row {row_number}: cell count does not match the {}-column header",
                header.len()
            );
        }
        tracing::debug!("sheet: fetched {} record(s)", records.len());
        Ok(records)
    }

    /// Upsert a batch: update rows whose id is already present, append the
    /// rest. Returns rows updated + appended.
    pub fn apply_records(&self, records: &[Record]) -> Result<usize, SheetError> {
        if records.is_empty() {
            return Ok(0);
        }

        let values = self.client.get_values(&self.full_range())?;
        let header = header_of(&values).ok_or_else(|| SheetError::MissingHeader {
            tab: self.tab.clone(),
        })?;
        let id_index = header
            .iter()
            .position(|name| name == &self.id_column)
            .ok_or_else(|| SheetError::MissingIdColumn {
                tab: self.tab.clone(),
                column: self.id_column.clone(),
            })?;

        let row_numbers = row_numbers_by_id(&values, id_index);
        let last_column = column_letter(header.len().saturating_sub(1));

        let mut appends: Vec<Vec<Cell>> = Vec::new();
        let mut updated = 0;
        for record in records {
            let Some(id) = record.employee_id() else {
                tracing::warn!("sheet: refusing to write a record without {ID_FIELD}");
                continue;
            };
            let row = record_to_row(&header, record);
            match row_numbers.get(id.0.as_str()) {
                Some(row_number) => {
                    let range =
                        format!("{}!A{row_number}:{last_column}{row_number}", self.tab);
                    self.client.update_values(&range, vec![row])?;
                    updated += 1;
                }
                None => appends.push(row),
            }
        }

        let appended = appends.len();
        if !appends.is_empty() {
            // Append after the last used row.
            let next_row = values.len() + 1;
            let range = format!("{}!A{next_row}", self.tab);
            self.client.append_values(&range, appends)?;
        }

        tracing::info!("sheet: updated {updated}, appended {appended} row(s)");
        Ok(updated + appended)
    }
}

impl RecordStore for SheetStore {
    fn side(&self) -> Side {
        Side::Sheet
    }

    fn fetch(&mut self) -> Result<Vec<Record>, SyncError> {
        self.fetch_records().map_err(|e| store_err(Side::Sheet, e))
    }

    fn apply(&mut self, records: &[Record]) -> Result<usize, SyncError> {
        self.apply_records(records)
            .map_err(|e| store_err(Side::Sheet, e))
    }
}
