//! # tandem-sheet
//!
//! Spreadsheet-side [`tandem_sync::RecordStore`] collaborator: an HTTP
//! client for a Sheets-values-style REST API plus the header-driven mapping
//! between sheet rows and records.

mod client;
mod error;
pub mod rows;
mod store;

pub use client::SheetClient;
pub use error::SheetError;
pub use store::SheetStore;
