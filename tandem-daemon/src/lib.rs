//! Periodic scheduler for tandem: runs one reconciliation cycle per interval
//! tick until interrupted.

mod error;
mod runtime;

pub use error::DaemonError;
pub use runtime::{run, run_one_cycle, start_blocking};
