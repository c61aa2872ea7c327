// Command runner - executes one command with retry and re-authentication

use crate::application::retry::{RetryDecision, RetryPolicy};
use crate::domain::{CallShape, Command, ExecutionPlan};
use crate::error::CommandError;
use crate::port::{Reauthenticator, RemoteCallClient, RemoteError};
use serde_json::Value;
use std::sync::Arc;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Turns a command into remote calls, applying the retry policy
pub struct CommandRunner {
    client: Arc<dyn RemoteCallClient>,
    reauth: Option<Arc<dyn Reauthenticator>>,
    policy: RetryPolicy,
}

impl CommandRunner {
    pub fn new(
        client: Arc<dyn RemoteCallClient>,
        reauth: Option<Arc<dyn Reauthenticator>>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            client,
            reauth,
            policy,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Execute `command` to completion
    ///
    /// Remote failures come back as `CommandError::Remote` carrying the
    /// error of the last attempt, unwrapped.
    pub async fn run(&self, command: &Command) -> Result<Value, CommandError> {
        match command.operation.plan(&command.identity) {
            ExecutionPlan::Sleep(duration) => {
                sleep(duration).await;
                Ok(Value::Null)
            }
            ExecutionPlan::Call(shape) => Ok(self.call_with_retry(command, &shape).await?),
            ExecutionPlan::Shutdown => Ok(Value::Null),
        }
    }

    async fn call_with_retry(&self, command: &Command, shape: &CallShape) -> Result<Value, RemoteError> {
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            let error = match self.client.call(&shape.command, shape.params.clone()).await {
                Ok(value) => {
                    debug!(
                        command_id = %command.id,
                        attempt = %attempt,
                        remote_command = %shape.command,
                        "Remote call succeeded"
                    );
                    return Ok(value);
                }
                Err(e) => e,
            };

            match self.policy.decide(&error, attempt, self.reauth.is_some()) {
                RetryDecision::Reauthenticate => {
                    let refreshed = match &self.reauth {
                        Some(reauth) => reauth.reauthenticate().await,
                        None => false,
                    };
                    if !refreshed {
                        warn!(
                            command_id = %command.id,
                            attempt = %attempt,
                            "Re-authentication failed"
                        );
                        return Err(error);
                    }
                    if !self.policy.has_attempts_left(attempt) {
                        return Err(error);
                    }
                    info!(
                        command_id = %command.id,
                        attempt = %attempt,
                        "Retrying after re-authentication"
                    );
                }
                RetryDecision::Retry(delay) => {
                    warn!(
                        command_id = %command.id,
                        attempt = %attempt,
                        error = %error,
                        "Remote call failed, retrying"
                    );
                    if !delay.is_zero() {
                        sleep(delay).await;
                    }
                }
                RetryDecision::GiveUp => return Err(error),
            }
        }
    }
}
