//! Crediting back a debit after the reservation step failed.

use crate::config::CompensationPolicy;
use crate::entities::UserId;
use crate::ledger::{AccountLedger, LedgerError};
use crate::utils::backoff::retry_delay;
use rust_decimal::Decimal;
use tracing::{debug, warn};

/// Credit `amount` back to `buyer_id`, retrying with exponential backoff.
///
/// Credits are not idempotent, so only storage failures that certainly did
/// not apply the credit are retried (see [`crate::framework::StorageError::is_retry_safe`]).
/// Anything else, including a connection lost with the outcome unknown, is
/// returned immediately and left to an operator. Otherwise the last error is
/// returned after `policy.max_attempts` attempts.
pub async fn retry_credit(
    ledger: &dyn AccountLedger,
    buyer_id: UserId,
    amount: Decimal,
    policy: &CompensationPolicy,
) -> Result<Decimal, LedgerError> {
    let attempts = policy.max_attempts.max(1);
    let mut attempt = 0;
    loop {
        match ledger.credit(buyer_id, amount).await {
            Ok(balance) => {
                debug!(%buyer_id, %amount, attempt, "Compensation credit applied");
                return Ok(balance);
            }
            Err(e) if !is_retryable(&e) => return Err(e),
            Err(e) => {
                attempt += 1;
                if attempt >= attempts {
                    return Err(e);
                }
                let delay = retry_delay(policy.base_delay, attempt - 1);
                warn!(
                    %buyer_id,
                    %amount,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Compensation credit failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

pub(crate) fn is_retryable(err: &LedgerError) -> bool {
    matches!(err, LedgerError::Storage(e) if e.is_retry_safe())
}
