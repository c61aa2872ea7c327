// Application Layer - Command queue and mower use cases

pub mod mower;
pub mod queue;
pub mod reauth;
pub mod retry;

// Re-exports
pub use mower::{KeepOut, MowerAction, MowerCommands};
pub use queue::{CommandQueue, CommandRunner};
pub use reauth::CoalescingReauthenticator;
pub use retry::{RetryDecision, RetryPolicy};
