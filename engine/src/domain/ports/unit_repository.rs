//! UnitRepository port
//! Interface for storing and retrieving managed units

use crate::domain::{DomainError, Unit, UnitId};
use async_trait::async_trait;

/// Port for unit persistence
#[async_trait]
pub trait UnitRepository: Send + Sync {
    /// Save a unit (insert or update)
    async fn save(&self, unit: Unit) -> Result<(), DomainError>;

    /// Find a unit by its ID
    async fn find_by_id(&self, id: &UnitId) -> Result<Option<Unit>, DomainError>;

    /// Find a unit by its name
    async fn find_by_name(&self, name: &str) -> Result<Option<Unit>, DomainError>;

    /// Get all units
    async fn find_all(&self) -> Result<Vec<Unit>, DomainError>;

    /// Delete a unit by its ID
    async fn delete(&self, id: &UnitId) -> Result<(), DomainError>;

    /// Check if a unit with the given name exists
    async fn exists_by_name(&self, name: &str) -> Result<bool, DomainError>;
}
