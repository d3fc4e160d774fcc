//! Runtime settings read by the order engine on every call.

use std::time::Duration;

/// Retry schedule for crediting back a debit whose reservation failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompensationPolicy {
    /// Credit attempts made inline before the debt is handed to the
    /// reconciliation worker. Values below 1 are treated as 1.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles on every further attempt.
    pub base_delay: Duration,
}

impl Default for CompensationPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(50),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderSettings {
    /// Label stored on successful orders.
    pub payment_method: String,
    /// Deadline applied when a request does not carry its own.
    pub request_timeout: Duration,
    pub compensation: CompensationPolicy,
}

impl Default for OrderSettings {
    fn default() -> Self {
        Self {
            payment_method: "QRIS".to_string(),
            request_timeout: Duration::from_secs(5),
            compensation: CompensationPolicy::default(),
        }
    }
}
