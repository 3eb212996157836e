//! UnitStatus query
//! Read-only projection of the runtime record

use crate::domain::ports::UnitRepository;
use crate::domain::{DomainError, ExitReason, Unit, UnitState};
use async_trait::async_trait;
use std::sync::Arc;

/// Snapshot of one unit's runtime record
#[derive(Debug, Clone)]
pub struct UnitStatusView {
    pub name: String,
    pub state: UnitState,
    pub pid: Option<u32>,
    pub exit_code: Option<i32>,
    pub last_exit_reason: Option<ExitReason>,
    pub restart_count: u32,
}

impl From<&Unit> for UnitStatusView {
    fn from(unit: &Unit) -> Self {
        Self {
            name: unit.name().to_string(),
            state: unit.state(),
            pid: unit.pid(),
            exit_code: unit.exit_code(),
            last_exit_reason: unit.last_exit_reason(),
            restart_count: unit.restart_count(),
        }
    }
}

/// Query for unit status
#[async_trait]
pub trait UnitStatus: Send + Sync {
    async fn list(&self) -> Result<Vec<UnitStatusView>, DomainError>;
    async fn get(&self, name: &str) -> Result<UnitStatusView, DomainError>;
}

pub struct UnitStatusUseCase {
    repository: Arc<dyn UnitRepository>,
}

impl UnitStatusUseCase {
    pub fn new(repository: Arc<dyn UnitRepository>) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl UnitStatus for UnitStatusUseCase {
    async fn list(&self) -> Result<Vec<UnitStatusView>, DomainError> {
        let mut views: Vec<UnitStatusView> = self
            .repository
            .find_all()
            .await?
            .iter()
            .map(UnitStatusView::from)
            .collect();
        views.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(views)
    }

    async fn get(&self, name: &str) -> Result<UnitStatusView, DomainError> {
        let unit = self
            .repository
            .find_by_name(name)
            .await?
            .ok_or_else(|| DomainError::UnitNotFound(name.to_string()))?;
        Ok(UnitStatusView::from(&unit))
    }
}
