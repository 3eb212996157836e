//! ExitReason value object
//! Why a child process stopped running

use serde::{Deserialize, Serialize};
use std::fmt;

/// The cause of a child exit, fed into restart evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitReason {
    /// The child exited on its own with the given exit code
    Exited(i32),

    /// The supervisor terminated the child for exceeding its memory ceiling
    MemoryLimitExceeded,
}

impl ExitReason {
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            ExitReason::Exited(code) => Some(*code),
            ExitReason::MemoryLimitExceeded => None,
        }
    }

    /// Resource-triggered exits count as failures regardless of exit code
    pub fn is_resource_triggered(&self) -> bool {
        matches!(self, ExitReason::MemoryLimitExceeded)
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitReason::Exited(code) => write!(f, "exited({})", code),
            ExitReason::MemoryLimitExceeded => write!(f, "memory-limit-exceeded"),
        }
    }
}
