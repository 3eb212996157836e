//! LoadConfig use case
//! Loads an ecosystem file into the unit registry, isolating per-unit
//! configuration errors so one bad entry never takes down its siblings

use crate::domain::ports::UnitRepository;
use crate::domain::services::ConfigLoadingService;
use crate::domain::use_cases::StartUnit;
use crate::domain::{DomainError, Unit};
use crate::infrastructure::EcosystemFile;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Debug, Clone)]
pub struct LoadConfigCommand {
    pub path: String,
    /// Start every successfully loaded unit immediately
    pub start_all: bool,
}

#[derive(Debug, Clone)]
pub struct LoadConfigResponse {
    /// Names of the units now present in the registry
    pub loaded: Vec<String>,
    /// (unit name, error message) for every entry that was skipped
    pub failed: Vec<(String, String)>,
}

/// Use case for loading configuration
#[async_trait]
pub trait LoadConfig: Send + Sync {
    async fn execute(&self, command: LoadConfigCommand) -> Result<LoadConfigResponse, DomainError>;
}

pub struct LoadConfigUseCase {
    repository: Arc<dyn UnitRepository>,
    start_unit: Arc<dyn StartUnit>,
}

impl LoadConfigUseCase {
    pub fn new(repository: Arc<dyn UnitRepository>, start_unit: Arc<dyn StartUnit>) -> Self {
        Self {
            repository,
            start_unit,
        }
    }
}

#[async_trait]
impl LoadConfig for LoadConfigUseCase {
    async fn execute(&self, command: LoadConfigCommand) -> Result<LoadConfigResponse, DomainError> {
        let file = EcosystemFile::load(&command.path).map_err(DomainError::Config)?;
        if file.apps.is_empty() {
            warn!(path = %command.path, "Configuration declares no apps");
        }

        let mut loaded: Vec<String> = Vec::new();
        let mut failed: Vec<(String, String)> = Vec::new();

        for app in file.apps {
            let app_name = app.name.clone();
            let config = match app.config {
                Ok(config) => config,
                Err(message) => {
                    error!(unit = %app_name, error = %message, "Skipping app with invalid configuration");
                    failed.push((app_name, message));
                    continue;
                }
            };

            let specs = match ConfigLoadingService::parse_app(config) {
                Ok(specs) => specs,
                Err(e) => {
                    error!(unit = %app_name, error = %e, "Skipping app with invalid configuration");
                    failed.push((app_name, e.to_string()));
                    continue;
                }
            };

            for spec in specs {
                let name = spec.name().to_string();
                if self.repository.exists_by_name(&name).await? {
                    let e = DomainError::DuplicateUnit(name.clone());
                    error!(unit = %name, error = %e, "Skipping duplicate unit");
                    failed.push((name, e.to_string()));
                    continue;
                }
                self.repository.save(Unit::new(spec)).await?;
                loaded.push(name);
            }
        }

        info!(
            path = %command.path,
            loaded = loaded.len(),
            failed = failed.len(),
            "Configuration loaded"
        );

        if command.start_all {
            for name in &loaded {
                if let Err(e) = self.start_unit.execute(name).await {
                    error!(unit = %name, error = %e, "Failed to start unit");
                    failed.push((name.clone(), e.to_string()));
                }
            }
        }

        Ok(LoadConfigResponse { loaded, failed })
    }
}
