//! StartUnit use case
//! Operator-initiated start of a managed unit

use crate::domain::ports::UnitRepository;
use crate::domain::services::SupervisionService;
use crate::domain::{DomainError, UnitId};
use async_trait::async_trait;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct StartUnitResponse {
    pub unit_id: UnitId,
    pub pid: u32,
}

/// Use case for starting a unit
#[async_trait]
pub trait StartUnit: Send + Sync {
    async fn execute(&self, name: &str) -> Result<StartUnitResponse, DomainError>;
}

pub struct StartUnitUseCase {
    repository: Arc<dyn UnitRepository>,
    supervisor: Arc<SupervisionService>,
}

impl StartUnitUseCase {
    pub fn new(repository: Arc<dyn UnitRepository>, supervisor: Arc<SupervisionService>) -> Self {
        Self {
            repository,
            supervisor,
        }
    }
}

#[async_trait]
impl StartUnit for StartUnitUseCase {
    async fn execute(&self, name: &str) -> Result<StartUnitResponse, DomainError> {
        let mut unit = self
            .repository
            .find_by_name(name)
            .await?
            .ok_or_else(|| DomainError::UnitNotFound(name.to_string()))?;

        // Never spawn a second child for a unit that already has one
        if unit.is_running() {
            return Err(DomainError::AlreadyRunning(unit.pid().unwrap_or(0)));
        }
        if !unit.can_start() {
            return Err(DomainError::InvalidStateTransition {
                from: unit.state().to_string(),
                to: "starting".to_string(),
            });
        }

        // A fresh operator-initiated start begins a new session
        unit.reset_session();
        let unit_id = unit.id();
        self.repository.save(unit).await?;

        let pid = self.supervisor.spawn_unit(&unit_id).await?;

        Ok(StartUnitResponse { unit_id, pid })
    }
}
