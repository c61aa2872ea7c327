// Coalescing re-authentication
//
// Several workers can hit an expired session at the same moment. Only the
// first one talks to the server; the rest wait for it and reuse its outcome.

use crate::port::Reauthenticator;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Wraps a `Reauthenticator` so concurrent callers trigger one refresh
pub struct CoalescingReauthenticator<R> {
    inner: R,
    /// Bumped after every successful refresh
    generation: AtomicU64,
    gate: Mutex<()>,
}

impl<R: Reauthenticator> CoalescingReauthenticator<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            generation: AtomicU64::new(0),
            gate: Mutex::new(()),
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<R: Reauthenticator> Reauthenticator for CoalescingReauthenticator<R> {
    async fn reauthenticate(&self) -> bool {
        let observed = self.generation.load(Ordering::SeqCst);
        let _gate = self.gate.lock().await;

        if self.generation.load(Ordering::SeqCst) != observed {
            debug!("Session already refreshed by a concurrent caller");
            return true;
        }

        let refreshed = self.inner.reauthenticate().await;
        if refreshed {
            let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            info!(generation = %generation, "Session refreshed");
        }
        refreshed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::reauth::mocks::CountingReauthenticator;
    use crate::port::reauth::MockReauthenticator;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_concurrent_callers_share_one_refresh() {
        let reauth = Arc::new(CoalescingReauthenticator::new(
            CountingReauthenticator::succeeding().with_latency(Duration::from_millis(50)),
        ));

        let calls = (0..5).map(|_| {
            let reauth = Arc::clone(&reauth);
            tokio::spawn(async move { reauth.reauthenticate().await })
        });
        let results = futures::future::join_all(calls).await;

        assert!(results.into_iter().all(|r| r.unwrap()));
        assert_eq!(reauth.inner.call_count(), 1);
        assert_eq!(reauth.generation(), 1);
    }

    #[tokio::test]
    async fn test_sequential_callers_each_refresh() {
        let reauth = CoalescingReauthenticator::new(CountingReauthenticator::succeeding());

        assert!(reauth.reauthenticate().await);
        assert!(reauth.reauthenticate().await);
        assert_eq!(reauth.inner.call_count(), 2);
    }

    #[tokio::test]
    async fn test_failure_does_not_advance_generation() {
        let mut inner = MockReauthenticator::new();
        inner.expect_reauthenticate().times(2).returning(|| false);
        let reauth = CoalescingReauthenticator::new(inner);

        assert!(!reauth.reauthenticate().await);
        assert!(!reauth.reauthenticate().await);
        assert_eq!(reauth.generation(), 0);
    }
}
