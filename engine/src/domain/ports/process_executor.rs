//! ProcessExecutor port
//! Interface for spawning and signalling system processes

use crate::domain::{DomainError, LogConfig, Unit};
use async_trait::async_trait;
use std::future::Future;
use std::pin::Pin;

/// Configuration for spawning a child process
#[derive(Debug, Clone)]
pub struct SpawnConfig {
    pub unit_name: String,
    pub command: String,
    pub args: Vec<String>,
    pub working_dir: Option<String>,
    pub env_vars: Vec<(String, String)>,
    pub log: LogConfig,
}

impl SpawnConfig {
    pub fn from_unit(unit: &Unit) -> Self {
        let (command, args) = unit.spec().launch_command();

        let env_vars: Vec<(String, String)> = unit
            .spec()
            .env()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        Self {
            unit_name: unit.name().to_string(),
            command,
            args,
            working_dir: unit.spec().cwd().map(|s| s.to_string()),
            env_vars,
            log: unit.spec().log().clone(),
        }
    }
}

/// Handle resolving to the child's exit code once it has fully exited.
/// This allows event-driven exit monitoring without polling.
pub type ProcessExitHandle = Pin<Box<dyn Future<Output = Result<i32, DomainError>> + Send>>;

/// Result of spawning a child process
pub struct SpawnResult {
    pub pid: u32,
    /// None means the child cannot be monitored for exit
    pub exit_handle: Option<ProcessExitHandle>,
}

impl std::fmt::Debug for SpawnResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpawnResult")
            .field("pid", &self.pid)
            .field("exit_handle", &self.exit_handle.is_some())
            .finish()
    }
}

/// Port for executing system processes
#[async_trait]
pub trait ProcessExecutor: Send + Sync {
    /// Spawn a new child process
    async fn spawn(&self, config: SpawnConfig) -> Result<SpawnResult, DomainError>;

    /// Send a signal to a running child
    async fn kill(&self, pid: u32, signal: i32) -> Result<(), DomainError>;

    /// Check whether a child is still alive
    async fn is_running(&self, pid: u32) -> Result<bool, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ProcessSpec;

    #[test]
    fn test_spawn_config_from_unit() {
        let spec = ProcessSpec::builder("weather", "/opt/station/collect.py")
            .interpreter("/opt/venv/bin/python")
            .cwd("/opt/station")
            .env_var("NODE_ENV", "production")
            .build()
            .unwrap();
        let unit = Unit::new(spec);

        let config = SpawnConfig::from_unit(&unit);
        assert_eq!(config.unit_name, "weather");
        assert_eq!(config.command, "/opt/venv/bin/python");
        assert_eq!(config.args, vec!["/opt/station/collect.py".to_string()]);
        assert_eq!(config.working_dir, Some("/opt/station".to_string()));
        assert!(config
            .env_vars
            .contains(&("NODE_ENV".to_string(), "production".to_string())));
    }

    #[test]
    fn test_spawn_config_without_interpreter() {
        let spec = ProcessSpec::builder("svc", "/usr/local/bin/svc")
            .args(vec!["--port".to_string(), "8080".to_string()])
            .build()
            .unwrap();
        let unit = Unit::new(spec);

        let config = SpawnConfig::from_unit(&unit);
        assert_eq!(config.command, "/usr/local/bin/svc");
        assert_eq!(config.args, vec!["--port".to_string(), "8080".to_string()]);
        assert_eq!(config.working_dir, None);
        assert!(config.env_vars.is_empty());
    }
}
