//! Domain Constants
//!
//! Common constants used throughout the domain layer

/// Exit code indicating successful child termination
pub const SUCCESS_EXIT_CODE: i32 = 0;

/// Exit code recorded when the child could not be launched at all
/// (shell convention for "command not found")
pub const LAUNCH_FAILURE_EXIT_CODE: i32 = 127;

/// Default delay before a restart attempt in seconds
pub const DEFAULT_RESTART_DELAY_SEC: u64 = 1;

/// Default maximum delay for exponential restart backoff in seconds
pub const DEFAULT_RESTART_MAX_DELAY_SEC: u64 = 60;

/// Default grace period for a stop request before SIGKILL escalation
pub const DEFAULT_STOP_TIMEOUT_SEC: u64 = 5;

/// Default maximum restarts within the start limit interval
pub const DEFAULT_MAX_RESTARTS: u32 = 5;

/// Default start limit interval in seconds
pub const DEFAULT_START_LIMIT_INTERVAL_SEC: u64 = 10;

/// Exponential backoff base for restart delays
pub const RESTART_BACKOFF_BASE: u32 = 2;

/// Interval between resident-memory samples in milliseconds
pub const MEMORY_POLL_INTERVAL_MS: u64 = 1000;

/// Interval between liveness probes while waiting for a stopping child
pub const STOP_POLL_INTERVAL_MS: u64 = 100;

/// Signal numbers used for stop and escalation
pub const SIGTERM: i32 = 15;
pub const SIGKILL: i32 = 9;

/// Memory unit constants (binary convention: 1G = 2^30 bytes)
pub const BYTES_PER_KB: u64 = 1024;
pub const BYTES_PER_MB: u64 = 1024 * 1024;
pub const BYTES_PER_GB: u64 = 1024 * 1024 * 1024;
pub const BYTES_PER_TB: u64 = 1024 * 1024 * 1024 * 1024;
