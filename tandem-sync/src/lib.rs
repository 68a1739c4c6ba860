//! # tandem-sync
//!
//! Bidirectional reconciliation core: timestamp normalization, pair
//! classification, the watermark store, and the cycle driver over injected
//! [`RecordStore`] collaborators.
//!
//! Call [`run_cycle`] to execute one full reconcile-and-apply pass, or
//! [`reconcile`] directly for the pure decision step.

pub mod cycle;
pub mod diff;
pub mod error;
pub mod reconcile;
pub mod timestamp;
pub mod watermark;

pub use cycle::{run_cycle, CycleReport, RecordStore, Side, SideOutcome};
pub use diff::{diff_records, RecordDiff};
pub use error::{store_err, SyncError};
pub use reconcile::{
    classify_pair, reconcile, Decision, NoopReason, ReconcileOutcome, ReconcilePolicy,
};
