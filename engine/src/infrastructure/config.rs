//! Ecosystem configuration loading from YAML
//!
//! The schema is closed: an app entry carrying an unrecognized key is
//! rejected rather than silently ignored. Entries are deserialized one by
//! one so a malformed app never aborts its siblings.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Raw top-level document shape
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawEcosystem {
    apps: Vec<serde_yaml::Value>,
}

/// One app entry from the ecosystem file
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Unique identifier for the managed unit
    pub name: String,

    /// Path to the entry point to execute
    pub script: String,

    /// Runtime used to execute `script`; absent means the script runs directly
    #[serde(default)]
    pub interpreter: Option<String>,

    #[serde(default)]
    pub args: Vec<String>,

    /// Working directory for the child process
    #[serde(default)]
    pub cwd: Option<String>,

    /// Number of concurrent copies to supervise
    #[serde(default = "default_instances")]
    pub instances: u32,

    #[serde(default = "default_autorestart")]
    pub autorestart: bool,

    /// Explicit restart policy ("always", "on-failure", "never");
    /// overrides `autorestart` when present
    #[serde(default)]
    pub restart: Option<String>,

    /// Filesystem-change-triggered restart; recorded but not acted on
    #[serde(default)]
    pub watch: bool,

    /// Memory ceiling string, e.g. "1G"
    #[serde(default)]
    pub max_memory_restart: Option<String>,

    /// Environment variables merged into the child's environment
    #[serde(default)]
    pub env: HashMap<String, String>,

    /// Timestamp format for log lines
    #[serde(default)]
    pub log_date_format: Option<String>,

    #[serde(default)]
    pub error_file: Option<String>,

    #[serde(default)]
    pub out_file: Option<String>,

    #[serde(default)]
    pub log_file: Option<String>,

    /// Base delay in seconds before a restart attempt
    #[serde(default)]
    pub restart_delay: Option<u64>,

    /// Maximum restarts within the start limit interval
    #[serde(default)]
    pub max_restarts: Option<u32>,

    /// Grace period in seconds before a stop escalates to SIGKILL
    #[serde(default)]
    pub kill_timeout: Option<u64>,
}

fn default_instances() -> u32 {
    1
}

fn default_autorestart() -> bool {
    true
}

/// One app entry, deserialized independently of its siblings
#[derive(Debug)]
pub struct ParsedApp {
    pub name: String,
    pub config: Result<AppConfig, String>,
}

/// A loaded ecosystem file
#[derive(Debug)]
pub struct EcosystemFile {
    pub apps: Vec<ParsedApp>,
}

impl EcosystemFile {
    /// Load an ecosystem file from disk
    pub fn load(path: &str) -> Result<Self, String> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read config file '{}': {}", path, e))?;

        let raw: RawEcosystem = serde_yaml::from_str(&contents)
            .map_err(|e| format!("failed to parse config file '{}': {}", path, e))?;

        let apps = raw
            .apps
            .into_iter()
            .map(|value| {
                let name = value
                    .get("name")
                    .and_then(serde_yaml::Value::as_str)
                    .unwrap_or("<unnamed>")
                    .to_string();
                let config = serde_yaml::from_value::<AppConfig>(value)
                    .map_err(|e| format!("invalid app entry '{}': {}", name, e));
                ParsedApp { name, config }
            })
            .collect();

        Ok(Self { apps })
    }
}
