// Ambrogio Core - Domain Logic, Ports & Command Queue
// NO infrastructure dependencies (Hexagonal Architecture)

pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod port;

pub use config::QueueConfig;
pub use error::{AppError, CommandError, Result};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
