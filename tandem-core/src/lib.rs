//! Tandem core library — domain types, configuration, errors.
//!
//! Public API surface:
//! - [`types`] — records, snapshots, field values
//! - [`error`] — [`ConfigError`]
//! - [`config`] — load / save / token resolution

pub mod config;
pub mod error;
pub mod types;

pub use config::Settings;
pub use error::ConfigError;
pub use types::{EmployeeId, FieldValue, Record, Snapshot, ID_FIELD, LAST_UPDATED_FIELD};
