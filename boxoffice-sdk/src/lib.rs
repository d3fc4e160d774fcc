//! Wire types shared by the boxoffice server and its clients.
//!
//! Enable the `client` feature for a typed HTTP client.

#[cfg(feature = "client")]
pub mod client;
pub mod objects;
