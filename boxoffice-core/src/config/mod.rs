//! Runtime configuration shared between the server and the order engine.
//!
//! Loading and parsing live in the server crate; these are the validated
//! values, kept behind a [`ConfigStore`] so they can be hot reloaded.

mod config_store;
mod order_settings;

pub use config_store::ConfigStore;
pub use order_settings::{CompensationPolicy, OrderSettings};
