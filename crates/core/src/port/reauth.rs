// Re-authentication Port
// Capability to refresh the shared session credential

use async_trait::async_trait;

/// Re-authenticator trait
///
/// Returns whether a fresh session was obtained. Implementations report
/// failure as `false` rather than an error; the queue only needs to know
/// whether retrying is worthwhile.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Reauthenticator: Send + Sync {
    async fn reauthenticate(&self) -> bool;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Counts invocations and replays scripted outcomes
    pub struct CountingReauthenticator {
        outcomes: Mutex<VecDeque<bool>>,
        fallback: bool,
        latency: Duration,
        calls: AtomicUsize,
    }

    impl CountingReauthenticator {
        pub fn succeeding() -> Self {
            Self::new(true)
        }

        pub fn failing() -> Self {
            Self::new(false)
        }

        fn new(fallback: bool) -> Self {
            Self {
                outcomes: Mutex::new(VecDeque::new()),
                fallback,
                latency: Duration::ZERO,
                calls: AtomicUsize::new(0),
            }
        }

        pub fn with_outcomes(mut self, outcomes: impl IntoIterator<Item = bool>) -> Self {
            self.outcomes = Mutex::new(outcomes.into_iter().collect());
            self
        }

        pub fn with_latency(mut self, latency: Duration) -> Self {
            self.latency = latency;
            self
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Reauthenticator for CountingReauthenticator {
        async fn reauthenticate(&self) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.latency.is_zero() {
                tokio::time::sleep(self.latency).await;
            }
            self.outcomes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(self.fallback)
        }
    }
}
