mod exit_reason;
mod memory_limit;
mod restart_policy;
mod unit_id;
mod unit_state;

pub use exit_reason::ExitReason;
pub use memory_limit::MemoryLimit;
pub use restart_policy::RestartPolicy;
pub use unit_id::UnitId;
pub use unit_state::UnitState;
