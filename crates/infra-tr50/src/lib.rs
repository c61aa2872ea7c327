// Ambrogio Infrastructure - TR50 Adapter
// Implements: RemoteCallClient, Reauthenticator

mod client;
mod config;
mod envelope;
mod reauth;

pub use client::Tr50Client;
pub use config::{Credentials, Tr50Config, DEFAULT_ENDPOINT, DEFAULT_REQUEST_TIMEOUT};
pub use envelope::{classify, SESSION_INVALID_MARKER};
pub use reauth::Tr50Reauthenticator;
