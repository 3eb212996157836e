//! Infrastructure adapters
//! Concrete implementations of the domain ports, plus configuration loading

mod config;
mod in_memory_repository;
mod log_sink;
mod memory_reader;
mod unix_executor;

pub use config::{AppConfig, EcosystemFile, ParsedApp};
pub use in_memory_repository::InMemoryUnitRepository;
pub use log_sink::{LogStream, UnitLogSink};
pub use memory_reader::ProcfsMemoryReader;
pub use unix_executor::UnixProcessExecutor;
