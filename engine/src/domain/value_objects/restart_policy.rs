//! RestartPolicy value object
//! Defines when a unit should be automatically relaunched

use crate::domain::value_objects::ExitReason;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Policy for automatically restarting a unit after its child stops
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum RestartPolicy {
    /// Never restart the unit
    #[default]
    Never,

    /// Always restart, regardless of how the child stopped
    Always,

    /// Restart only on failure: a non-zero exit code or a
    /// resource-triggered termination
    OnFailure,
}

impl RestartPolicy {
    /// Check whether the unit should be restarted for the given exit reason
    pub fn should_restart(&self, reason: &ExitReason) -> bool {
        match self {
            RestartPolicy::Never => false,
            RestartPolicy::Always => true,
            RestartPolicy::OnFailure => match reason {
                ExitReason::Exited(code) => *code != crate::domain::constants::SUCCESS_EXIT_CODE,
                ExitReason::MemoryLimitExceeded => true,
            },
        }
    }

    /// Parse from string representation
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "never" | "no" => Some(RestartPolicy::Never),
            "always" => Some(RestartPolicy::Always),
            "on-failure" | "onfailure" => Some(RestartPolicy::OnFailure),
            _ => None,
        }
    }

    /// Map the boolean `autorestart` option onto a policy
    pub fn from_autorestart(autorestart: bool) -> Self {
        if autorestart {
            RestartPolicy::Always
        } else {
            RestartPolicy::Never
        }
    }
}

impl fmt::Display for RestartPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RestartPolicy::Never => write!(f, "never"),
            RestartPolicy::Always => write!(f, "always"),
            RestartPolicy::OnFailure => write!(f, "on-failure"),
        }
    }
}
