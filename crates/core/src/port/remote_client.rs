// Remote Call Client Port
// Abstraction over the session-authenticated TR50 command API

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Failures a remote call can report
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// The server no longer accepts the session credential
    #[error("Session invalid: {0}")]
    SessionInvalid(String),

    /// Network, timeout, HTTP or parse failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// Any other failure reported by the server
    #[error("API error: {0}")]
    Api(String),
}

impl RemoteError {
    pub fn is_session_invalid(&self) -> bool {
        matches!(self, RemoteError::SessionInvalid(_))
    }
}

/// Remote Call Client trait
///
/// Implementations:
/// - Tr50Client: JSON over HTTP (infra-tr50 crate)
/// - mocks::ScriptedClient: replays scripted replies (tests)
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RemoteCallClient: Send + Sync {
    /// Invoke `command` with `params` and return the response payload
    ///
    /// # Errors
    /// - RemoteError::SessionInvalid when the session has expired
    /// - RemoteError::Transport for network/protocol failures
    /// - RemoteError::Api for any other server-reported failure
    async fn call(&self, command: &str, params: Value) -> Result<Value, RemoteError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::{Duration, Instant};

    /// Scripted reply for a single call
    #[derive(Debug, Clone)]
    pub enum Reply {
        /// Succeed with `{"command": .., "params": ..}`
        Echo,
        /// Succeed with the given value
        Value(Value),
        /// Fail with the given error
        Fail(RemoteError),
        /// Sleep, then echo
        Sleep(Duration),
        /// Never complete
        Hang,
        /// Panic with the given message
        Panic(String),
    }

    /// A call the client has seen
    #[derive(Debug, Clone)]
    pub struct RecordedCall {
        pub command: String,
        pub params: Value,
        pub started_at: Instant,
    }

    /// Remote client that replays a script, then falls back to a default reply
    pub struct ScriptedClient {
        script: Mutex<VecDeque<Reply>>,
        fallback: Reply,
        calls: Mutex<Vec<RecordedCall>>,
    }

    impl ScriptedClient {
        pub fn new() -> Self {
            Self::always(Reply::Echo)
        }

        pub fn always(fallback: Reply) -> Self {
            Self {
                script: Mutex::new(VecDeque::new()),
                fallback,
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn with_script(replies: impl IntoIterator<Item = Reply>) -> Self {
            let client = Self::new();
            client.script.lock().unwrap().extend(replies);
            client
        }

        pub fn push(&self, reply: Reply) {
            self.script.lock().unwrap().push_back(reply);
        }

        pub fn calls(&self) -> Vec<RecordedCall> {
            self.calls.lock().unwrap().clone()
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    impl Default for ScriptedClient {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl RemoteCallClient for ScriptedClient {
        async fn call(&self, command: &str, params: Value) -> Result<Value, RemoteError> {
            self.calls.lock().unwrap().push(RecordedCall {
                command: command.to_string(),
                params: params.clone(),
                started_at: Instant::now(),
            });

            let reply = self
                .script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| self.fallback.clone());

            let echo = json!({ "command": command, "params": params });
            match reply {
                Reply::Echo => Ok(echo),
                Reply::Value(v) => Ok(v),
                Reply::Fail(e) => Err(e),
                Reply::Sleep(d) => {
                    tokio::time::sleep(d).await;
                    Ok(echo)
                }
                Reply::Hang => std::future::pending().await,
                Reply::Panic(msg) => panic!("{}", msg),
            }
        }
    }
}
