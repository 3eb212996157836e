//! In-memory unit repository
//! Thread-safe implementation of the UnitRepository port

use crate::domain::{ports::UnitRepository, DomainError, Unit, UnitId};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::debug;

/// Thread-safe in-memory unit repository.
/// Suitable for a single supervisor process; state does not survive
/// a daemon restart.
#[derive(Clone)]
pub struct InMemoryUnitRepository {
    units: Arc<RwLock<HashMap<UnitId, Unit>>>,
}

impl InMemoryUnitRepository {
    pub fn new() -> Self {
        Self {
            units: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryUnitRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UnitRepository for InMemoryUnitRepository {
    async fn save(&self, unit: Unit) -> Result<(), DomainError> {
        debug!(
            unit_id = %unit.id(),
            unit = %unit.name(),
            state = %unit.state(),
            "Saving unit"
        );
        let mut units = self.units.write().unwrap();
        units.insert(unit.id(), unit);
        Ok(())
    }

    async fn find_by_id(&self, id: &UnitId) -> Result<Option<Unit>, DomainError> {
        let units = self.units.read().unwrap();
        Ok(units.get(id).cloned())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Unit>, DomainError> {
        let units = self.units.read().unwrap();
        Ok(units.values().find(|u| u.name() == name).cloned())
    }

    async fn find_all(&self) -> Result<Vec<Unit>, DomainError> {
        let units = self.units.read().unwrap();
        Ok(units.values().cloned().collect())
    }

    async fn delete(&self, id: &UnitId) -> Result<(), DomainError> {
        debug!(unit_id = %id, "Deleting unit");
        let mut units = self.units.write().unwrap();
        units.remove(id);
        Ok(())
    }

    async fn exists_by_name(&self, name: &str) -> Result<bool, DomainError> {
        let units = self.units.read().unwrap();
        Ok(units.values().any(|u| u.name() == name))
    }
}
