pub mod constants;
pub mod entities;
pub mod error;
pub mod ports;
pub mod services;
pub mod use_cases;
pub mod value_objects;

pub use entities::{LogConfig, ProcessSpec, SpecBuilder, Unit};
pub use error::{DomainError, Result};
pub use value_objects::{ExitReason, MemoryLimit, RestartPolicy, UnitId, UnitState};
