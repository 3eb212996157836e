//! Configuration loading service
//! Translates ecosystem app entries into validated process specs

use crate::domain::{DomainError, LogConfig, MemoryLimit, ProcessSpec, RestartPolicy};
use crate::infrastructure::AppConfig;
use tracing::warn;

/// Service for turning raw app configuration into domain specs
pub struct ConfigLoadingService;

impl ConfigLoadingService {
    /// Build the specs declared by one app entry.
    /// `instances` above 1 expands into one spec per index, named
    /// `name-0` through `name-(n-1)`.
    pub fn parse_app(config: AppConfig) -> Result<Vec<ProcessSpec>, DomainError> {
        let policy = Self::resolve_restart_policy(&config)?;

        let memory_limit = match &config.max_memory_restart {
            Some(s) => MemoryLimit::parse(s).map_err(|e| {
                DomainError::Config(format!("unit '{}': max_memory_restart: {}", config.name, e))
            })?,
            None => MemoryLimit::none(),
        };

        if config.instances == 0 {
            return Err(DomainError::Config(format!(
                "unit '{}': instances must be at least 1",
                config.name
            )));
        }

        if config.watch {
            warn!(
                unit = %config.name,
                "watch is not supported; the flag is recorded but never triggers restarts"
            );
        }

        let log = LogConfig {
            out_file: config.out_file,
            error_file: config.error_file,
            log_file: config.log_file,
            date_format: config.log_date_format,
        };

        let mut builder = ProcessSpec::builder(config.name, config.script)
            .args(config.args)
            .env(config.env)
            .restart_policy(policy)
            .watch(config.watch)
            .memory_limit(memory_limit)
            .log(log);
        if let Some(interpreter) = config.interpreter {
            builder = builder.interpreter(interpreter);
        }
        if let Some(cwd) = config.cwd {
            builder = builder.cwd(cwd);
        }
        if let Some(delay) = config.restart_delay {
            builder = builder.restart_delay_sec(delay);
        }
        if let Some(max) = config.max_restarts {
            builder = builder.max_restarts(max);
        }
        if let Some(timeout) = config.kill_timeout {
            builder = builder.stop_timeout_sec(timeout);
        }

        let template = builder.build()?;
        if config.instances == 1 {
            return Ok(vec![template]);
        }

        (0..config.instances)
            .map(|i| template.clone_with_name(format!("{}-{}", template.name(), i)))
            .collect()
    }

    /// Resolve the restart policy: an explicit `restart` option wins over
    /// the boolean `autorestart`
    fn resolve_restart_policy(config: &AppConfig) -> Result<RestartPolicy, DomainError> {
        match config.restart.as_deref() {
            Some(s) => RestartPolicy::parse(s).ok_or_else(|| {
                DomainError::Config(format!(
                    "unit '{}': unknown restart policy '{}'",
                    config.name, s
                ))
            }),
            None => Ok(RestartPolicy::from_autorestart(config.autorestart)),
        }
    }
}
