use backon::ExponentialBuilder;
use std::time::Duration;

/// Creates the exponential backoff builder for the opt-in transient retry policy
///
/// Configured with:
/// - Initial interval: 500ms
/// - Max interval: 4s
/// - Max times: 3
/// - Factor: 2.0
/// - Jitter enabled
///
/// The client does not retry transient failures unless this (or another
/// builder) is passed to [`Client::with_transient_retry`](crate::Client::with_transient_retry).
#[must_use]
pub fn default_backoff_builder() -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_min_delay(Duration::from_millis(500))
        .with_max_delay(Duration::from_secs(4))
        .with_max_times(3)
        .with_factor(2.0)
        .with_jitter()
}

/// Determines if an HTTP status code should trigger a transient retry
///
/// Retries on: 408, 409, 429, and 5xx. 401 is handled separately by the
/// one-shot credential refresh and is never retried here.
#[must_use]
pub const fn is_retryable_status(code: u16) -> bool {
    matches!(code, 408 | 409 | 429 | 500..=599)
}
