// Command Domain Model

use super::operation::Operation;
use std::time::Duration;
use uuid::Uuid;

/// Device identifier (IMEI) that partitions command queues
pub type Identity = String;

/// Command ID (UUID v4), only used to correlate log lines
pub type CommandId = Uuid;

/// One unit of work for a single device
#[derive(Debug, Clone)]
pub struct Command {
    pub id: CommandId,
    pub identity: Identity,
    pub operation: Operation,
    /// Free-text tag for logs, never interpreted by the queue
    pub label: String,
    /// Overrides the caller's wait timeout when set
    pub timeout: Option<Duration>,
}

impl Command {
    pub fn new(identity: impl Into<Identity>, operation: Operation) -> Self {
        Self {
            id: Uuid::new_v4(),
            identity: identity.into(),
            operation,
            label: String::new(),
            timeout: None,
        }
    }

    pub fn delay(identity: impl Into<Identity>, duration: Duration) -> Self {
        Self::new(identity, Operation::Delay(duration))
    }

    pub(crate) fn stop(identity: impl Into<Identity>) -> Self {
        Self::new(identity, Operation::Stop).with_label("stop")
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Label if set, otherwise the identity
    pub fn tag(&self) -> &str {
        if self.label.is_empty() {
            &self.identity
        } else {
            &self.label
        }
    }
}
