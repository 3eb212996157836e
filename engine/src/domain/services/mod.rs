mod config_loading;
mod memory_watch;
mod supervision;

pub use config_loading::ConfigLoadingService;
pub use memory_watch::MemoryWatchService;
pub use supervision::{SupervisionService, UnitExitEvent};
