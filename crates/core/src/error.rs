// Central Error Types for the Application

use crate::port::RemoteError;
use std::time::Duration;
use thiserror::Error;

/// Failure reported on a command's completion handle
///
/// Remote failures are carried through untouched, so a caller sees the
/// same `RemoteError` the last attempt produced.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CommandError {
    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error("Timed out after {0:?} waiting for command completion")]
    Timeout(Duration),

    #[error("Unexpected failure: {0}")]
    Unexpected(String),

    #[error("Command queue is stopped")]
    QueueStopped,

    #[error("Operation '{0}' is reserved for queue shutdown")]
    ReservedOperation(String),
}

impl CommandError {
    /// Returns the underlying remote failure, if any
    pub fn as_remote(&self) -> Option<&RemoteError> {
        match self {
            CommandError::Remote(e) => Some(e),
            _ => None,
        }
    }
}

/// Application-level error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
