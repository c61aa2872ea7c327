// Retry logic for remote calls
use crate::port::RemoteError;
use std::time::Duration;
use tracing::{debug, warn};

/// What to do after a failed attempt
#[derive(Debug, PartialEq, Eq)]
pub enum RetryDecision {
    /// Session expired: refresh it, then retry if that worked and budget remains
    Reauthenticate,
    /// Retry after sleeping for the given delay (zero means immediately)
    Retry(Duration),
    /// Surface the failure to the caller
    GiveUp,
}

/// Retry policy shared by every attempt of one command
///
/// A command gets `max_retries + 1` attempts in total. Session failures and
/// generic failures draw from the same budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
    backoff_base: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, backoff_base: Duration) -> Self {
        Self {
            max_retries,
            backoff_base,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// True if another attempt may follow attempt number `attempt` (1-based)
    pub fn has_attempts_left(&self, attempt: u32) -> bool {
        attempt < self.max_attempts()
    }

    /// Linear backoff: `backoff_base * attempt`
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.backoff_base.saturating_mul(attempt)
    }

    /// Decide how to proceed after attempt number `attempt` failed with `error`
    ///
    /// Session failures always ask for re-authentication, even on the last
    /// attempt, so the shared session is fresh for whatever runs next. The
    /// caller checks `has_attempts_left` before actually retrying.
    pub fn decide(&self, error: &RemoteError, attempt: u32, can_reauthenticate: bool) -> RetryDecision {
        if error.is_session_invalid() {
            if can_reauthenticate {
                debug!(attempt = %attempt, "Session invalid, re-authentication required");
                return RetryDecision::Reauthenticate;
            }
            return RetryDecision::GiveUp;
        }

        if !self.has_attempts_left(attempt) {
            warn!(
                attempt = %attempt,
                max_attempts = %self.max_attempts(),
                error = %error,
                "Max retry attempts reached"
            );
            return RetryDecision::GiveUp;
        }

        let delay = self.backoff_for(attempt);
        debug!(
            attempt = %attempt,
            delay_ms = %delay.as_millis(),
            error = %error,
            "Scheduling retry"
        );
        RetryDecision::Retry(delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport() -> RemoteError {
        RemoteError::Transport("HTTP 502: bad gateway".into())
    }

    #[test]
    fn test_attempt_budget() {
        let policy = RetryPolicy::new(2, Duration::ZERO);
        assert_eq!(policy.max_attempts(), 3);
        assert!(policy.has_attempts_left(1));
        assert!(policy.has_attempts_left(2));
        assert!(!policy.has_attempts_left(3));
    }

    #[test]
    fn test_zero_retries_means_single_attempt() {
        let policy = RetryPolicy::new(0, Duration::ZERO);
        assert_eq!(policy.decide(&transport(), 1, true), RetryDecision::GiveUp);
    }

    #[test]
    fn test_linear_backoff() {
        let policy = RetryPolicy::new(3, Duration::from_millis(100));
        assert_eq!(
            policy.decide(&transport(), 1, false),
            RetryDecision::Retry(Duration::from_millis(100))
        );
        assert_eq!(
            policy.decide(&transport(), 2, false),
            RetryDecision::Retry(Duration::from_millis(200))
        );
        assert_eq!(policy.decide(&transport(), 4, false), RetryDecision::GiveUp);
    }

    #[test]
    fn test_session_invalid_requires_reauth() {
        let policy = RetryPolicy::new(2, Duration::ZERO);
        let expired = RemoteError::SessionInvalid("Authentication session is invalid".into());

        assert_eq!(policy.decide(&expired, 1, true), RetryDecision::Reauthenticate);
        // Even on the last attempt, the session is refreshed
        assert_eq!(policy.decide(&expired, 3, true), RetryDecision::Reauthenticate);
        assert_eq!(policy.decide(&expired, 1, false), RetryDecision::GiveUp);
    }

    #[test]
    fn test_api_errors_are_retried_like_transport() {
        let policy = RetryPolicy::new(1, Duration::ZERO);
        let api = RemoteError::Api("Thing not found".into());
        assert_eq!(
            policy.decide(&api, 1, true),
            RetryDecision::Retry(Duration::ZERO)
        );
    }
}
