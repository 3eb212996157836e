mod load_config;
mod restart_unit;
mod start_unit;
mod stop_unit;
mod unit_status;

pub use load_config::{LoadConfig, LoadConfigCommand, LoadConfigResponse, LoadConfigUseCase};
pub use restart_unit::{RestartUnit, RestartUnitResponse, RestartUnitUseCase};
pub use start_unit::{StartUnit, StartUnitResponse, StartUnitUseCase};
pub use stop_unit::{StopUnit, StopUnitResponse, StopUnitUseCase};
pub use unit_status::{UnitStatus, UnitStatusUseCase, UnitStatusView};
