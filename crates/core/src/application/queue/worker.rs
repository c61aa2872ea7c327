// Worker - per-identity execution loop

use super::completion::Completion;
use super::panic_guard::{execute_guarded, PanicGuardResult};
use super::runner::CommandRunner;
use crate::domain::{Command, Identity};
use crate::error::CommandError;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{debug, error, info};

/// A queued command plus the handle its caller waits on, if any
#[derive(Debug)]
pub(crate) struct QueueEntry {
    pub command: Command,
    pub completion: Option<Completion>,
}

/// Receiving end of an identity's queue, shared so a respawned worker
/// keeps consuming the same pending commands
pub(crate) type SharedReceiver = Arc<Mutex<UnboundedReceiver<QueueEntry>>>;

/// Drains one identity's queue, one command at a time
pub(crate) struct Worker {
    identity: Identity,
    receiver: SharedReceiver,
    runner: Arc<CommandRunner>,
    pacing: Duration,
}

impl Worker {
    pub fn new(
        identity: Identity,
        receiver: SharedReceiver,
        runner: Arc<CommandRunner>,
        pacing: Duration,
    ) -> Self {
        Self {
            identity,
            receiver,
            runner,
            pacing,
        }
    }

    /// Run until the stop sentinel is dequeued or the queue closes
    ///
    /// Never returns an error: every outcome, including a panic inside the
    /// runner, is delivered to the command's completion handle.
    pub async fn run(self) {
        info!(identity = %self.identity, "Worker started");
        let mut receiver = self.receiver.lock().await;

        while let Some(QueueEntry {
            command,
            completion,
        }) = receiver.recv().await
        {
            if command.operation.is_stop() {
                if let Some(completion) = completion {
                    completion.resolve(Ok(Value::Null));
                }
                info!(identity = %self.identity, "Stop sentinel received");
                break;
            }

            let outcome = match execute_guarded(self.runner.run(&command)).await {
                PanicGuardResult::Success(outcome) => outcome,
                PanicGuardResult::Panicked(msg) => Err(CommandError::Unexpected(msg)),
            };

            match &outcome {
                Ok(_) => debug!(
                    identity = %self.identity,
                    command_id = %command.id,
                    label = %command.tag(),
                    operation = %command.operation,
                    "Command completed"
                ),
                Err(e) => error!(
                    identity = %self.identity,
                    command_id = %command.id,
                    label = %command.tag(),
                    operation = %command.operation,
                    error = %e,
                    "Command failed"
                ),
            }

            if let Some(completion) = completion {
                if !completion.resolve(outcome) {
                    debug!(
                        command_id = %command.id,
                        "Caller no longer waiting, outcome dropped"
                    );
                }
            }

            if !self.pacing.is_zero() {
                sleep(self.pacing).await;
            }
        }

        info!(identity = %self.identity, "Worker stopped");
    }
}
