// Port Layer - Interfaces for external dependencies

pub mod reauth;
pub mod remote_client;

// Re-exports
pub use reauth::Reauthenticator;
pub use remote_client::{RemoteCallClient, RemoteError};
