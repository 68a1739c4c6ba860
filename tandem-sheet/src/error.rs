//! Error types for tandem-sheet.

use thiserror::Error;

/// All errors that can arise from the spreadsheet-side store.
#[derive(Debug, Error)]
pub enum SheetError {
    /// Transport or non-2xx response from the values API. Boxed — the ureq
    /// error type is large.
    #[error("sheet API error: {0}")]
    Http(#[from] Box<ureq::Error>),

    /// Failed reading a response body.
    #[error("sheet response I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("sheet JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The sheet has no header row to name fields.
    #[error("sheet {tab:?} has no header row")]
    MissingHeader { tab: String },

    /// The header row does not contain the configured id column.
    #[error("sheet {tab:?} header has no {column:?} column")]
    MissingIdColumn { tab: String, column: String },
}
