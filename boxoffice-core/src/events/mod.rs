//! Events passed from the order engine to background processors.
//!
//! # Event Flow
//!
//! 1. `OrderEngine` fails to credit back a debit -> `CompensationRequired`
//! 2. `ReconciliationWorker` keeps retrying the credit until it lands
//!
//! Events carry everything needed to act on them; the worker does not
//! re-read the order.

pub mod channels;
pub mod types;

pub use channels::{
    CompensationReceiver, CompensationSender, DEFAULT_CHANNEL_BUFFER, compensation_channel,
};
pub use types::CompensationRequired;
