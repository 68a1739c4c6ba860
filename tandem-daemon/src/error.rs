use std::path::PathBuf;

use thiserror::Error;

/// Error surface for the daemon runtime.
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config error: {0}")]
    Config(#[from] tandem_core::ConfigError),

    #[error("database store error: {0}")]
    Db(#[from] tandem_db::DbError),

    #[error("sync error: {0}")]
    Sync(#[from] tandem_sync::SyncError),

    #[error("cycle task join error: {0}")]
    Join(String),

    #[error("signal handler failed: {0}")]
    Signal(String),
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> DaemonError {
    DaemonError::Io {
        path: path.into(),
        source,
    }
}
