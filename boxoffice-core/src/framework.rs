use sqlx::PgPool;
use thiserror::Error;

/// Executes `kanau` processors against the shared connection pool.
#[derive(Clone)]
pub struct DatabaseProcessor {
    pub pool: PgPool,
}

impl DatabaseProcessor {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Fault raised by a backing store. Never interpreted by the order engine,
/// only propagated.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Database error
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored row violates a domain constraint (e.g. negative stock).
    #[error("corrupt record: {0}")]
    Corrupt(String),

    /// The store cannot serve requests right now.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

impl StorageError {
    /// Whether the failed write certainly did not apply, so repeating it
    /// cannot apply it twice.
    ///
    /// A rejected statement or a pool that never handed out a connection
    /// is safe. A connection lost mid-request is not: the server may have
    /// committed before the reply was lost.
    pub fn is_retry_safe(&self) -> bool {
        match self {
            StorageError::Unavailable(_) => true,
            StorageError::Corrupt(_) => false,
            StorageError::Database(e) => {
                matches!(e, sqlx::Error::Database(_) | sqlx::Error::PoolTimedOut)
            }
        }
    }
}
