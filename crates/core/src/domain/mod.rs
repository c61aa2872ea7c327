// Domain Layer - Pure data types and projections

pub mod command;
pub mod mower_state;
pub mod operation;

// Re-exports
pub use command::{Command, CommandId, Identity};
pub use mower_state::{Lookup, MowerState, PositionSource, Timestamp};
pub use operation::{CallShape, ExecutionPlan, MethodCall, Operation};
