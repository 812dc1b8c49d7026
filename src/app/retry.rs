//! Caller-side retry with exponential backoff for transient portal failures.
//!
//! The core never retries. The binary wraps each service call with
//! [`with_retry!`], which classifies a failed attempt into a
//! [`FailureType`] and asks the [`RetryPolicy`] whether to try again.
//!
//! Only transport faults are candidates. Rejected logins, missing tokens and
//! expired sessions are never retried: repeating a failed login can trip the
//! portal's lockout policy.

use std::time::Duration;

use moodle_core::{PortalError, TransportError};
use rand::Rng;
use tracing::{debug, instrument};

/// Default maximum attempts (including the first).
pub(crate) const DEFAULT_MAX_RETRIES: u8 = 3;

const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);
const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(32);
const DEFAULT_BACKOFF_MULTIPLIER: f32 = 2.0;
const MAX_JITTER: Duration = Duration::from_millis(500);

/// Classification of a failed portal operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FailureType {
    /// Timeouts, connection faults, 408 and 5xx.
    Transient,
    /// Bad URLs, redirect loops, other 4xx, TLS faults.
    Permanent,
    /// Rejected credentials, expired or missing session.
    NeedsAuth,
    /// HTTP 429.
    RateLimited,
}

/// Decision on whether to retry a failed operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RetryDecision {
    /// Retry after `delay`; `attempt` is the 1-indexed number of the next try.
    Retry { delay: Duration, attempt: u32 },
    /// Give up.
    DoNotRetry { reason: String },
}

/// Exponential backoff: `min(base * multiplier^(attempt-1), max) + jitter`.
#[derive(Debug, Clone)]
pub(crate) struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
    backoff_multiplier: f32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: u32::from(DEFAULT_MAX_RETRIES),
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
        }
    }
}

impl RetryPolicy {
    /// Policy with `max_attempts` (at least 1) and default delays.
    #[must_use]
    pub(crate) fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    #[cfg(test)]
    fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
        }
    }

    /// Decides whether to retry after `attempt` (1-indexed) failed.
    #[instrument(skip(self), fields(max_attempts = self.max_attempts))]
    pub(crate) fn should_retry(&self, failure_type: FailureType, attempt: u32) -> RetryDecision {
        match failure_type {
            FailureType::Permanent => {
                return RetryDecision::DoNotRetry {
                    reason: "permanent failure - retry would not help".to_string(),
                };
            }
            FailureType::NeedsAuth => {
                return RetryDecision::DoNotRetry {
                    reason: "authentication failure - retrying may lock the account".to_string(),
                };
            }
            FailureType::Transient | FailureType::RateLimited => {}
        }

        if attempt >= self.max_attempts {
            debug!(attempt, max = self.max_attempts, "max attempts reached");
            return RetryDecision::DoNotRetry {
                reason: format!("max attempts ({}) exhausted", self.max_attempts),
            };
        }

        let delay = self.calculate_delay(attempt);
        debug!(
            attempt,
            next_attempt = attempt + 1,
            delay_ms = delay.as_millis(),
            "will retry"
        );
        RetryDecision::Retry {
            delay,
            attempt: attempt + 1,
        }
    }

    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    fn calculate_delay(&self, attempt: u32) -> Duration {
        let base_ms = self.base_delay.as_millis() as f64;
        let multiplier = f64::from(self.backoff_multiplier);
        let exponent = f64::from(attempt.saturating_sub(1));
        let delay_ms = base_ms * multiplier.powf(exponent);
        let capped_ms = delay_ms.min(self.max_delay.as_millis() as f64);
        Duration::from_millis(capped_ms as u64) + calculate_jitter()
    }
}

#[allow(clippy::cast_possible_truncation)]
fn calculate_jitter() -> Duration {
    let mut rng = rand::thread_rng();
    let jitter_ms = rng.gen_range(0..=MAX_JITTER.as_millis() as u64);
    Duration::from_millis(jitter_ms)
}

/// Classifies a portal error for retry decisions.
pub(crate) fn classify_error(error: &PortalError) -> FailureType {
    if let Some(transport) = error.transport_error() {
        return classify_transport_error(transport);
    }
    match error {
        PortalError::LoginRejected { .. }
        | PortalError::NotAuthenticated
        | PortalError::SessionExpired { .. } => FailureType::NeedsAuth,
        _ => FailureType::Permanent,
    }
}

/// Classifies a failed login. A throttled login is never repeated.
///
/// A 429 while logging in may come from the portal's brute-force guard, so
/// it is treated as an authentication failure rather than rate limiting.
pub(crate) fn classify_login_error(error: &PortalError) -> FailureType {
    match classify_error(error) {
        FailureType::RateLimited => FailureType::NeedsAuth,
        other => other,
    }
}

fn classify_transport_error(error: &TransportError) -> FailureType {
    match error {
        TransportError::Timeout { .. } => FailureType::Transient,
        TransportError::Network { reason, .. } => {
            if is_tls_failure(reason) {
                FailureType::Permanent
            } else {
                FailureType::Transient
            }
        }
        TransportError::HttpStatus { status, .. } => classify_http_status(*status),
        TransportError::TooManyRedirects { .. }
        | TransportError::ClientBuild { .. }
        | TransportError::InvalidUrl { .. } => FailureType::Permanent,
    }
}

fn classify_http_status(status: u16) -> FailureType {
    match status {
        401 | 403 => FailureType::NeedsAuth,
        408 => FailureType::Transient,
        429 => FailureType::RateLimited,
        status if (500..600).contains(&status) => FailureType::Transient,
        _ => FailureType::Permanent,
    }
}

fn is_tls_failure(reason: &str) -> bool {
    let reason = reason.to_lowercase();
    reason.contains("certificate")
        || reason.contains("tls")
        || reason.contains("ssl")
        || reason.contains("handshake")
}

/// Awaits `$op` until it succeeds or `$policy` gives up, sleeping between attempts.
///
/// `$op` is re-evaluated for each attempt, so it may borrow a session mutably.
/// Failures go through [`classify_error`] unless `classify = path` names
/// another classifier.
macro_rules! with_retry {
    ($policy:expr, $label:expr, $op:expr) => {
        $crate::app::retry::with_retry!(
            $policy,
            $label,
            $op,
            classify = $crate::app::retry::classify_error
        )
    };
    ($policy:expr, $label:expr, $op:expr, classify = $classify:path) => {{
        let mut attempt: u32 = 1;
        loop {
            match $op.await {
                Ok(value) => break Ok(value),
                Err(error) => {
                    let failure = $classify(&error);
                    match $policy.should_retry(failure, attempt) {
                        $crate::app::retry::RetryDecision::Retry {
                            delay,
                            attempt: next,
                        } => {
                            ::tracing::warn!(
                                operation = $label,
                                attempt,
                                delay_ms = delay.as_millis(),
                                error = %error,
                                "retrying after transient failure"
                            );
                            ::tokio::time::sleep(delay).await;
                            attempt = next;
                        }
                        $crate::app::retry::RetryDecision::DoNotRetry { reason } => {
                            ::tracing::debug!(operation = $label, %reason, "not retrying");
                            break Err(error);
                        }
                    }
                }
            }
        }
    }};
}

pub(crate) use with_retry;
