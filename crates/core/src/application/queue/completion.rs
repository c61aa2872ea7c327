// Completion handle - one-shot delivery of a command outcome

use crate::error::CommandError;
use serde_json::Value;
use std::time::Duration;
use tokio::sync::oneshot;

/// Outcome delivered to a waiting caller
pub type CommandOutcome = Result<Value, CommandError>;

/// Worker side of a completion handle
///
/// `resolve` consumes the handle, so an outcome is delivered at most once.
#[derive(Debug)]
pub struct Completion {
    sender: oneshot::Sender<CommandOutcome>,
}

/// Caller side of a completion handle
#[derive(Debug)]
pub struct CompletionHandle {
    receiver: oneshot::Receiver<CommandOutcome>,
}

pub fn completion_channel() -> (Completion, CompletionHandle) {
    let (sender, receiver) = oneshot::channel();
    (Completion { sender }, CompletionHandle { receiver })
}

impl Completion {
    /// Deliver the outcome; returns false if the caller stopped waiting
    pub fn resolve(self, outcome: CommandOutcome) -> bool {
        self.sender.send(outcome).is_ok()
    }

    pub fn is_waiting(&self) -> bool {
        !self.sender.is_closed()
    }
}

impl CompletionHandle {
    /// Wait for the outcome, at most `timeout`
    ///
    /// A dropped `Completion` means the worker went away without resolving,
    /// which only happens when the queue is cancelled.
    pub async fn wait(self, timeout: Duration) -> CommandOutcome {
        match tokio::time::timeout(timeout, self.receiver).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => Err(CommandError::QueueStopped),
            Err(_) => Err(CommandError::Timeout(timeout)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_resolved_outcome_reaches_caller() {
        let (completion, handle) = completion_channel();
        assert!(completion.resolve(Ok(json!({"ok": true}))));
        assert_eq!(
            handle.wait(Duration::from_secs(1)).await,
            Ok(json!({"ok": true}))
        );
    }

    #[tokio::test]
    async fn test_wait_times_out() {
        let (_completion, handle) = completion_channel();
        let timeout = Duration::from_millis(20);
        assert_eq!(handle.wait(timeout).await, Err(CommandError::Timeout(timeout)));
    }

    #[tokio::test]
    async fn test_dropped_completion_reports_stopped() {
        let (completion, handle) = completion_channel();
        drop(completion);
        assert_eq!(
            handle.wait(Duration::from_secs(1)).await,
            Err(CommandError::QueueStopped)
        );
    }

    #[test]
    fn test_resolve_after_caller_left() {
        let (completion, handle) = completion_channel();
        drop(handle);
        assert!(!completion.is_waiting());
        assert!(!completion.resolve(Ok(Value::Null)));
    }
}
