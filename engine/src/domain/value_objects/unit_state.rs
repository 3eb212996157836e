//! UnitState value object
//! Represents the lifecycle state of a managed unit

use serde::{Deserialize, Serialize};
use std::fmt;

/// The state of a unit in its supervision lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum UnitState {
    /// Unit definition loaded but never started
    #[default]
    Idle,

    /// Unit is currently starting up
    Starting,

    /// Child process is running
    Running,

    /// An explicit stop is in progress
    Stopping,

    /// Child exited on its own; restart evaluation pending or declined
    Exited,

    /// Child was terminated for breaching its memory ceiling
    MemoryExceeded,

    /// A restart has been scheduled and is waiting out its backoff delay
    Restarting,

    /// Terminal: explicitly stopped, or parked after restart evaluation
    Stopped,
}

impl UnitState {
    /// Check if the unit currently owns a live (or launching) child
    pub fn is_running(&self) -> bool {
        matches!(self, UnitState::Running | UnitState::Starting)
    }

    /// Check if the unit is in a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, UnitState::Stopped)
    }

    /// Check if the unit can be started
    pub fn can_start(&self) -> bool {
        matches!(
            self,
            UnitState::Idle | UnitState::Stopped | UnitState::Exited | UnitState::MemoryExceeded
        )
    }

    /// Check if the unit can be stopped
    pub fn can_stop(&self) -> bool {
        matches!(
            self,
            UnitState::Starting | UnitState::Running | UnitState::Restarting
        )
    }

    /// Validate state transition
    pub fn can_transition_to(&self, new_state: UnitState) -> bool {
        use UnitState::*;

        match (self, new_state) {
            // From Idle (initial state)
            (Idle, Starting) => true,

            // From Stopped (manual start of a parked unit)
            (Stopped, Starting) => true,

            // From Starting
            (Starting, Running) => true,
            (Starting, Exited) => true, // Exits before the spawn settles
            (Starting, Stopping) => true,

            // From Running
            (Running, Stopping) => true,
            (Running, Exited) => true,
            (Running, MemoryExceeded) => true,

            // From Stopping
            (Stopping, Stopped) => true,

            // From Exited
            (Exited, Starting | Restarting | Stopped) => true,

            // From MemoryExceeded
            (MemoryExceeded, Starting | Restarting | Stopped) => true,

            // From Restarting
            (Restarting, Starting) => true,
            (Restarting, Stopping) => true, // Stop cancels a pending restart

            // Same state is always allowed
            (a, b) if *a == b => true,

            // Everything else is invalid
            _ => false,
        }
    }
}

impl fmt::Display for UnitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitState::Idle => write!(f, "idle"),
            UnitState::Starting => write!(f, "starting"),
            UnitState::Running => write!(f, "running"),
            UnitState::Stopping => write!(f, "stopping"),
            UnitState::Exited => write!(f, "exited"),
            UnitState::MemoryExceeded => write!(f, "memory-exceeded"),
            UnitState::Restarting => write!(f, "restarting"),
            UnitState::Stopped => write!(f, "stopped"),
        }
    }
}
