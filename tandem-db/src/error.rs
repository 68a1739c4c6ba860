//! Error types for tandem-db.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from the database-side store.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configured roster table is absent — an unrecoverable setup error.
    #[error("table {table:?} does not exist; run `tandem init` or fix the config")]
    MissingTable { table: String },

    /// The roster table has no id column to upsert against.
    #[error("table {table:?} has no {column:?} column")]
    MissingIdColumn { table: String, column: String },
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> DbError {
    DbError::Io {
        path: path.into(),
        source,
    }
}
