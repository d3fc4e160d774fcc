//! Application state shared across all request handlers.

use crate::config::file::StorageBackend;
use boxoffice_core::engine::OrderEngine;

/// Cheap to clone; the engine holds its backends behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub engine: OrderEngine,
    /// Reported by `/health`.
    pub backend: StorageBackend,
}

impl AppState {
    pub fn new(engine: OrderEngine, backend: StorageBackend) -> Self {
        Self { engine, backend }
    }
}
