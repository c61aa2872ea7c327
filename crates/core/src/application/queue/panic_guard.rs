// Panic isolation for worker safety
use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use tracing::error;

/// Result of a panic-guarded execution
#[derive(Debug)]
pub enum PanicGuardResult<T> {
    /// Execution completed
    Success(T),
    /// Execution panicked
    Panicked(String),
}

/// Drive a future with panic isolation
///
/// The future runs on the calling task, so cancelling that task (e.g. via
/// `JoinHandle::abort`) also cancels the guarded work.
pub async fn execute_guarded<F, T>(future: F) -> PanicGuardResult<T>
where
    F: Future<Output = T>,
{
    match AssertUnwindSafe(future).catch_unwind().await {
        Ok(result) => PanicGuardResult::Success(result),
        Err(panic_info) => {
            let panic_msg = panic_message(panic_info.as_ref());
            error!(panic_msg = %panic_msg, "Command execution panicked");
            PanicGuardResult::Panicked(panic_msg)
        }
    }
}

fn panic_message(panic_info: &(dyn Any + Send)) -> String {
    if let Some(s) = panic_info.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic_info.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_success_passes_through() {
        let result = execute_guarded(async { 42 }).await;
        assert!(matches!(result, PanicGuardResult::Success(42)));
    }

    #[tokio::test]
    async fn test_panic_is_caught() {
        let result = execute_guarded(async {
            tokio::task::yield_now().await;
            panic!("boom");
        })
        .await;

        match result {
            PanicGuardResult::Panicked(msg) => assert_eq!(msg, "boom"),
            PanicGuardResult::Success(()) => panic!("expected panic to be caught"),
        }
    }

    #[tokio::test]
    async fn test_formatted_panic_message() {
        let code = 7;
        let result = execute_guarded(async move {
            if code > 0 {
                panic!("failed with code {}", code);
            }
        })
        .await;

        assert!(matches!(result, PanicGuardResult::Panicked(msg) if msg == "failed with code 7"));
    }
}
