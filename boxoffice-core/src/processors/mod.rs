//! Background processors.
//!
//! - `ReconciliationWorker`: receives `CompensationRequired`, retries the
//!   credit until it lands

pub mod reconciliation;

pub use reconciliation::ReconciliationWorker;
