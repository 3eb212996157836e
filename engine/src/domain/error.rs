//! Domain-level errors
//! These represent supervision failures and business rule violations

use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum DomainError {
    // Configuration errors (fatal at load time for the affected unit)
    #[error("invalid configuration: {0}")]
    Config(String),

    // Launch errors (executable/interpreter missing, spawn failure)
    #[error("failed to launch '{unit}': {reason}")]
    Launch { unit: String, reason: String },

    // Runtime errors (signal delivery, child bookkeeping)
    #[error("runtime failure: {0}")]
    Runtime(String),

    // Graceful shutdown grace period expired
    #[error("unit '{unit}' did not exit within the {timeout_secs}s grace period")]
    ShutdownTimeout { unit: String, timeout_secs: u64 },

    // Unit lifecycle errors
    #[error("unit '{0}' not found")]
    UnitNotFound(String),

    #[error("unit '{0}' already exists")]
    DuplicateUnit(String),

    #[error("unit is already running (PID: {0})")]
    AlreadyRunning(u32),

    #[error("unit is not running")]
    NotRunning,

    #[error("invalid state transition from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },

    // Validation errors
    #[error("invalid unit name: {0}")]
    InvalidName(String),
}

pub type Result<T> = std::result::Result<T, DomainError>;
