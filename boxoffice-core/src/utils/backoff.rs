use std::time::Duration;

/// Exponent cap for [`retry_delay`].
pub const MAX_BACKOFF_EXPONENT: u32 = 11;

/// Delay before retry number `attempt + 1`: `base * 2^attempt`, with the
/// exponent capped at [`MAX_BACKOFF_EXPONENT`].
pub fn retry_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(1u32 << attempt.min(MAX_BACKOFF_EXPONENT))
}
