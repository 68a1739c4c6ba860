//! Error types for tandem-sync.

use std::path::PathBuf;

use thiserror::Error;

use crate::cycle::Side;

/// All errors that can arise from reconciliation cycles.
#[derive(Debug, Error)]
pub enum SyncError {
    /// An error from configuration handling.
    #[error("config error: {0}")]
    Config(#[from] tandem_core::ConfigError),

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization error (watermark store).
    #[error("watermark JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The watermark file held something that is not a timestamp.
    #[error("unreadable watermark at {path}: {raw:?}")]
    Watermark { path: PathBuf, raw: String },

    /// A collaborator store failed. Carries which side so a cycle report can
    /// attribute the failure.
    #[error("{side} store error: {source}")]
    Store {
        side: Side,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}

/// Wrap a store-specific error for one side. Used by `RecordStore`
/// implementations outside this crate.
pub fn store_err(
    side: Side,
    source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
) -> SyncError {
    SyncError::Store {
        side,
        source: source.into(),
    }
}
