// Queue constants (no magic values)
use std::time::Duration;

/// Pause between consecutive commands of one identity (none)
pub const DEFAULT_PACING: Duration = Duration::ZERO;

/// Retries allowed on top of the first attempt (3 attempts total)
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Base of the linear backoff between generic retries (none)
pub const DEFAULT_BACKOFF_BASE: Duration = Duration::ZERO;

/// Caller wait timeout when neither command nor caller sets one (30s)
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(30);
