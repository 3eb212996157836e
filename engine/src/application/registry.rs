//! Use case registry
//! Composition root wiring repository, executor, and services into the
//! use cases. Owned explicitly by the caller; no ambient singletons.

use crate::domain::ports::{MemoryUsageReader, ProcessExecutor, UnitRepository};
use crate::domain::services::{MemoryWatchService, SupervisionService, UnitExitEvent};
use crate::domain::use_cases::{
    LoadConfig, LoadConfigUseCase, RestartUnit, RestartUnitUseCase, StartUnit, StartUnitUseCase,
    StopUnit, StopUnitUseCase, UnitStatus, UnitStatusUseCase,
};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Registry for all application use cases
pub struct UseCaseRegistry {
    start_unit: Arc<dyn StartUnit>,
    stop_unit: Arc<dyn StopUnit>,
    restart_unit: Arc<dyn RestartUnit>,
    load_config: Arc<dyn LoadConfig>,
    unit_status: Arc<dyn UnitStatus>,
    supervisor: Arc<SupervisionService>,
}

impl UseCaseRegistry {
    /// Wire up all use cases against the given adapters.
    /// Also returns the exit-event receiver that must be passed to
    /// [`SupervisionService::run`] for supervision to take effect.
    pub fn new(
        repository: Arc<dyn UnitRepository>,
        executor: Arc<dyn ProcessExecutor>,
        memory_reader: Arc<dyn MemoryUsageReader>,
    ) -> (Self, mpsc::UnboundedReceiver<UnitExitEvent>) {
        let memory_watch = Arc::new(MemoryWatchService::new(
            repository.clone(),
            executor.clone(),
            memory_reader,
        ));
        let (supervisor, exit_rx) =
            SupervisionService::new(repository.clone(), executor.clone(), memory_watch);

        let start_unit: Arc<dyn StartUnit> = Arc::new(StartUnitUseCase::new(
            repository.clone(),
            supervisor.clone(),
        ));
        let stop_unit: Arc<dyn StopUnit> = Arc::new(StopUnitUseCase::new(
            repository.clone(),
            executor,
            supervisor.clone(),
        ));
        let restart_unit: Arc<dyn RestartUnit> =
            Arc::new(RestartUnitUseCase::new(stop_unit.clone(), start_unit.clone()));
        let load_config: Arc<dyn LoadConfig> = Arc::new(LoadConfigUseCase::new(
            repository.clone(),
            start_unit.clone(),
        ));
        let unit_status: Arc<dyn UnitStatus> = Arc::new(UnitStatusUseCase::new(repository));

        (
            Self {
                start_unit,
                stop_unit,
                restart_unit,
                load_config,
                unit_status,
                supervisor,
            },
            exit_rx,
        )
    }

    pub fn start_unit(&self) -> Arc<dyn StartUnit> {
        self.start_unit.clone()
    }

    pub fn stop_unit(&self) -> Arc<dyn StopUnit> {
        self.stop_unit.clone()
    }

    pub fn restart_unit(&self) -> Arc<dyn RestartUnit> {
        self.restart_unit.clone()
    }

    pub fn load_config(&self) -> Arc<dyn LoadConfig> {
        self.load_config.clone()
    }

    pub fn unit_status(&self) -> Arc<dyn UnitStatus> {
        self.unit_status.clone()
    }

    pub fn supervisor(&self) -> Arc<SupervisionService> {
        self.supervisor.clone()
    }
}
