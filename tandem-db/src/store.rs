//! SQLite-backed roster store.
//!
//! The table is read column-agnostically (`SELECT *`) so deployments can
//! carry extra payload columns without code changes. Upserts follow the
//! check-then-update-or-insert shape and run inside one transaction per
//! batch. Record fields that name no table column are skipped with a
//! warning; they never fail the batch.

use std::path::Path;
use std::time::Duration;

use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{params_from_iter, Connection};

use tandem_core::config::DatabaseSettings;
use tandem_core::{FieldValue, Record, ID_FIELD};
use tandem_sync::{store_err, RecordStore, Side, SyncError};

use crate::error::{io_err, DbError};

#[derive(Debug)]
pub struct DatabaseStore {
    conn: Connection,
    table: String,
}

impl DatabaseStore {
    /// Open (or create) the database file. The roster table itself is not
    /// created here — see [`DatabaseStore::install_schema`].
    pub fn open(path: impl AsRef<Path>, table: impl Into<String>) -> Result<Self, DbError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
            }
        }
        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        Ok(Self {
            conn,
            table: table.into(),
        })
    }

    /// Open from config settings.
    pub fn from_settings(settings: &DatabaseSettings) -> Result<Self, DbError> {
        Self::open(&settings.path, settings.table.clone())
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Create the default roster table when it does not exist yet. Used by
    /// `tandem init` and tests; production tables usually pre-exist.
    pub fn install_schema(&self) -> Result<(), DbError> {
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} (\n\
             \tEmployeeID TEXT PRIMARY KEY,\n\
             \tFirstName TEXT,\n\
             \tLastName TEXT,\n\
             \tEmail TEXT,\n\
             \tPhoneNumber TEXT,\n\
             \tDepartment TEXT,\n\
             \tRole TEXT,\n\
             \tStatus TEXT,\n\
             \tStartDate TEXT,\n\
             \tEndDate TEXT,\n\
             \tlast_updated TEXT\n\
             );",
            quote_ident(&self.table)
        );
        self.conn.execute_batch(&sql)?;
        Ok(())
    }

    /// Full-table read, every column mapped to a [`FieldValue`].
    ///
    /// The id column is always read as text, even when stored numerically.
    /// BLOB cells have no scalar form and are skipped with a warning.
    pub fn fetch_records(&self) -> Result<Vec<Record>, DbError> {
        self.assert_table_exists()?;
        let sql = format!("SELECT * FROM {}", quote_ident(&self.table));
        let mut stmt = self.conn.prepare(&sql)?;
        let column_names: Vec<String> =
            stmt.column_names().into_iter().map(String::from).collect();

        let mut records = Vec::new();
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let mut record = Record::new();
            for (idx, name) in column_names.iter().enumerate() {
                let value = match row.get_ref(idx)? {
                    ValueRef::Null => FieldValue::Null,
                    ValueRef::Integer(n) if name == ID_FIELD => FieldValue::Text(n.to_string()),
                    ValueRef::Integer(n) => FieldValue::Number(n as f64),
                    ValueRef::Real(n) => FieldValue::Number(n),
                    ValueRef::Text(bytes) => {
                        FieldValue::Text(String::from_utf8_lossy(bytes).into_owned())
                    }
                    ValueRef::Blob(_) => {
                        tracing::warn!("database: skipping BLOB cell in column {name:?}");
                        continue;
                    }
                };
                record.set(name.clone(), value);
            }
            records.push(record);
        }
        tracing::debug!("database: fetched {} record(s)", records.len());
        Ok(records)
    }

    /// Upsert a batch by id: update the row when the id exists, insert it
    /// otherwise. All payload fields including `last_updated` are written.
    /// Runs in a single transaction; returns how many records were applied.
    pub fn upsert_records(&mut self, records: &[Record]) -> Result<usize, DbError> {
        self.assert_table_exists()?;
        let table_columns = self.table_columns()?;
        if !table_columns.iter().any(|c| c == ID_FIELD) {
            return Err(DbError::MissingIdColumn {
                table: self.table.clone(),
                column: ID_FIELD.to_string(),
            });
        }

        let tx = self.conn.transaction()?;
        let mut written = 0;
        for record in records {
            let Some(id) = record.employee_id() else {
                tracing::warn!("database: refusing to upsert a record without {ID_FIELD}");
                continue;
            };

            let mut columns = Vec::new();
            let mut values = Vec::new();
            for (name, value) in record.fields() {
                if name == ID_FIELD {
                    continue;
                }
                if !table_columns.iter().any(|c| c == name) {
                    tracing::warn!(
                        "database: employee {id}: skipping field {name:?} (no such column)"
                    );
                    continue;
                }
                columns.push(name.clone());
                values.push(to_sql_value(value));
            }

            let exists_sql = format!(
                "SELECT COUNT(*) FROM {} WHERE {} = ?1",
                quote_ident(&self.table),
                quote_ident(ID_FIELD)
            );
            let exists: i64 = tx.query_row(&exists_sql, [&id.0], |row| row.get(0))?;

            if exists > 0 {
                if columns.is_empty() {
                    written += 1;
                    continue;
                }
                let assignments: Vec<String> = columns
                    .iter()
                    .enumerate()
                    .map(|(i, c)| format!("{} = ?{}", quote_ident(c), i + 1))
                    .collect();
                let sql = format!(
                    "UPDATE {} SET {} WHERE {} = ?{}",
                    quote_ident(&self.table),
                    assignments.join(", "),
                    quote_ident(ID_FIELD),
                    columns.len() + 1
                );
                let mut params = values.clone();
                params.push(SqlValue::Text(id.0.clone()));
                tx.execute(&sql, params_from_iter(params))?;
            } else {
                let mut insert_columns = vec![quote_ident(ID_FIELD)];
                insert_columns.extend(columns.iter().map(|c| quote_ident(c)));
                let placeholders: Vec<String> =
                    (1..=insert_columns.len()).map(|i| format!("?{i}")).collect();
                let sql = format!(
                    "INSERT INTO {} ({}) VALUES ({})",
                    quote_ident(&self.table),
                    insert_columns.join(", "),
                    placeholders.join(", ")
                );
                let mut params = vec![SqlValue::Text(id.0.clone())];
                params.extend(values.clone());
                tx.execute(&sql, params_from_iter(params))?;
            }
            written += 1;
        }
        tx.commit()?;
        tracing::info!("database: applied {written} record(s)");
        Ok(written)
    }

    fn assert_table_exists(&self) -> Result<(), DbError> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [&self.table],
            |row| row.get(0),
        )?;
        if count == 0 {
            return Err(DbError::MissingTable {
                table: self.table.clone(),
            });
        }
        Ok(())
    }

    fn table_columns(&self) -> Result<Vec<String>, DbError> {
        let sql = format!("PRAGMA table_info({})", quote_ident(&self.table));
        let mut stmt = self.conn.prepare(&sql)?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }
}

impl RecordStore for DatabaseStore {
    fn side(&self) -> Side {
        Side::Database
    }

    fn fetch(&mut self) -> Result<Vec<Record>, SyncError> {
        self.fetch_records()
            .map_err(|e| store_err(Side::Database, e))
    }

    fn apply(&mut self, records: &[Record]) -> Result<usize, SyncError> {
        self.upsert_records(records)
            .map_err(|e| store_err(Side::Database, e))
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn to_sql_value(value: &FieldValue) -> SqlValue {
    match value {
        FieldValue::Null => SqlValue::Null,
        FieldValue::Text(s) => SqlValue::Text(s.clone()),
        FieldValue::Number(n) if n.fract() == 0.0 && n.is_finite() => {
            SqlValue::Integer(*n as i64)
        }
        FieldValue::Number(n) => SqlValue::Real(*n),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
