#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![forbid(unsafe_code)]

pub mod catalog;
pub mod config;
pub mod engine;
pub mod entities;
pub mod events;
pub mod framework;
pub mod journal;
pub mod ledger;
pub mod processors;
pub mod utils;
