mod memory_reader;
mod process_executor;
mod unit_repository;

pub use memory_reader::MemoryUsageReader;
pub use process_executor::{ProcessExecutor, ProcessExitHandle, SpawnConfig, SpawnResult};
pub use unit_repository::UnitRepository;
