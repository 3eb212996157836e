//! Unit entity
//! Core domain aggregate: one managed unit's immutable definition plus the
//! runtime record owned by its supervisor loop

use crate::domain::{
    constants::*, DomainError, ExitReason, MemoryLimit, RestartPolicy, UnitId, UnitState,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::SystemTime;

/// Log sink paths and line formatting for one unit
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    /// Sink for the child's stdout
    pub out_file: Option<String>,
    /// Sink for the child's stderr
    pub error_file: Option<String>,
    /// Combined sink receiving both streams, interleaved
    pub log_file: Option<String>,
    /// Timestamp format for log lines ("YYYY-MM-DD HH:mm:ss" style tokens)
    pub date_format: Option<String>,
}

impl LogConfig {
    pub fn is_configured(&self) -> bool {
        self.out_file.is_some() || self.error_file.is_some() || self.log_file.is_some()
    }
}

/// Immutable definition of a managed unit.
/// Built once at configuration load; never mutated while supervised.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessSpec {
    name: String,
    script: String,
    interpreter: Option<String>,
    args: Vec<String>,
    cwd: Option<String>,
    env: HashMap<String, String>,
    restart_policy: RestartPolicy,
    watch: bool,
    memory_limit: MemoryLimit,
    log: LogConfig,
    restart_delay_sec: u64,
    restart_max_delay_sec: u64,
    max_restarts: u32,
    start_limit_interval_sec: u64,
    stop_timeout_sec: u64,
}

impl ProcessSpec {
    /// Create a builder for constructing a spec with a fluent interface
    pub fn builder(name: impl Into<String>, script: impl Into<String>) -> SpecBuilder {
        SpecBuilder::new(name, script)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn script(&self) -> &str {
        &self.script
    }

    pub fn interpreter(&self) -> Option<&str> {
        self.interpreter.as_deref()
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn cwd(&self) -> Option<&str> {
        self.cwd.as_deref()
    }

    pub fn env(&self) -> &HashMap<String, String> {
        &self.env
    }

    pub fn restart_policy(&self) -> RestartPolicy {
        self.restart_policy
    }

    pub fn watch(&self) -> bool {
        self.watch
    }

    pub fn memory_limit(&self) -> MemoryLimit {
        self.memory_limit
    }

    pub fn log(&self) -> &LogConfig {
        &self.log
    }

    pub fn restart_delay_sec(&self) -> u64 {
        self.restart_delay_sec
    }

    pub fn restart_max_delay_sec(&self) -> u64 {
        self.restart_max_delay_sec
    }

    pub fn max_restarts(&self) -> u32 {
        self.max_restarts
    }

    pub fn start_limit_interval_sec(&self) -> u64 {
        self.start_limit_interval_sec
    }

    pub fn stop_timeout_sec(&self) -> u64 {
        self.stop_timeout_sec
    }

    /// Command and argv the child is launched with.
    /// When an interpreter is declared it runs the script; otherwise the
    /// script is executed directly.
    pub fn launch_command(&self) -> (String, Vec<String>) {
        match &self.interpreter {
            Some(interpreter) => {
                let mut args = Vec::with_capacity(self.args.len() + 1);
                args.push(self.script.clone());
                args.extend(self.args.iter().cloned());
                (interpreter.clone(), args)
            }
            None => (self.script.clone(), self.args.clone()),
        }
    }

    /// Clone this spec under a new name.
    /// Used to expand `instances: n` into per-index units.
    pub fn clone_with_name(&self, name: String) -> Result<ProcessSpec, DomainError> {
        validate_name(&name)?;
        let mut spec = self.clone();
        spec.name = name;
        Ok(spec)
    }
}

fn validate_name(name: &str) -> Result<(), DomainError> {
    if name.is_empty() {
        return Err(DomainError::InvalidName(
            "unit name cannot be empty".to_string(),
        ));
    }
    if name.contains(char::is_whitespace) {
        return Err(DomainError::InvalidName(format!(
            "unit name '{}' cannot contain whitespace",
            name
        )));
    }
    Ok(())
}

/// Fluent builder for [`ProcessSpec`]
pub struct SpecBuilder {
    name: String,
    script: String,
    interpreter: Option<String>,
    args: Vec<String>,
    cwd: Option<String>,
    env: HashMap<String, String>,
    restart_policy: RestartPolicy,
    watch: bool,
    memory_limit: MemoryLimit,
    log: LogConfig,
    restart_delay_sec: u64,
    restart_max_delay_sec: u64,
    max_restarts: u32,
    start_limit_interval_sec: u64,
    stop_timeout_sec: u64,
}

impl SpecBuilder {
    fn new(name: impl Into<String>, script: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            script: script.into(),
            interpreter: None,
            args: Vec::new(),
            cwd: None,
            env: HashMap::new(),
            restart_policy: RestartPolicy::default(),
            watch: false,
            memory_limit: MemoryLimit::none(),
            log: LogConfig::default(),
            restart_delay_sec: DEFAULT_RESTART_DELAY_SEC,
            restart_max_delay_sec: DEFAULT_RESTART_MAX_DELAY_SEC,
            max_restarts: DEFAULT_MAX_RESTARTS,
            start_limit_interval_sec: DEFAULT_START_LIMIT_INTERVAL_SEC,
            stop_timeout_sec: DEFAULT_STOP_TIMEOUT_SEC,
        }
    }

    pub fn interpreter(mut self, interpreter: impl Into<String>) -> Self {
        self.interpreter = Some(interpreter.into());
        self
    }

    pub fn args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    pub fn cwd(mut self, cwd: impl Into<String>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn env(mut self, env: HashMap<String, String>) -> Self {
        self.env = env;
        self
    }

    pub fn env_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn restart_policy(mut self, policy: RestartPolicy) -> Self {
        self.restart_policy = policy;
        self
    }

    pub fn watch(mut self, watch: bool) -> Self {
        self.watch = watch;
        self
    }

    pub fn memory_limit(mut self, limit: MemoryLimit) -> Self {
        self.memory_limit = limit;
        self
    }

    pub fn log(mut self, log: LogConfig) -> Self {
        self.log = log;
        self
    }

    pub fn restart_delay_sec(mut self, secs: u64) -> Self {
        self.restart_delay_sec = secs;
        self
    }

    pub fn restart_max_delay_sec(mut self, secs: u64) -> Self {
        self.restart_max_delay_sec = secs;
        self
    }

    pub fn max_restarts(mut self, max: u32) -> Self {
        self.max_restarts = max;
        self
    }

    pub fn start_limit_interval_sec(mut self, secs: u64) -> Self {
        self.start_limit_interval_sec = secs;
        self
    }

    pub fn stop_timeout_sec(mut self, secs: u64) -> Self {
        self.stop_timeout_sec = secs;
        self
    }

    pub fn build(self) -> Result<ProcessSpec, DomainError> {
        validate_name(&self.name)?;
        if self.script.is_empty() {
            return Err(DomainError::Config(format!(
                "unit '{}': script cannot be empty",
                self.name
            )));
        }
        Ok(ProcessSpec {
            name: self.name,
            script: self.script,
            interpreter: self.interpreter,
            args: self.args,
            cwd: self.cwd,
            env: self.env,
            restart_policy: self.restart_policy,
            watch: self.watch,
            memory_limit: self.memory_limit,
            log: self.log,
            restart_delay_sec: self.restart_delay_sec,
            restart_max_delay_sec: self.restart_max_delay_sec,
            max_restarts: self.max_restarts,
            start_limit_interval_sec: self.start_limit_interval_sec,
            stop_timeout_sec: self.stop_timeout_sec,
        })
    }
}

/// Managed unit aggregate: the spec plus its supervisor-owned runtime record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Unit {
    // Identity and definition
    id: UnitId,
    spec: ProcessSpec,

    // Runtime record (mutated only through the transition methods below)
    state: UnitState,
    pid: Option<u32>,
    exit_code: Option<i32>,
    last_exit_reason: Option<ExitReason>,

    // Restart bookkeeping
    restart_count: u32,        // Restarts in the current session
    consecutive_failures: u32, // Drives exponential backoff
    start_times: Vec<SystemTime>,

    // Timestamps
    created_at: SystemTime,
    started_at: Option<SystemTime>,
    stopped_at: Option<SystemTime>,
}

impl Unit {
    pub fn new(spec: ProcessSpec) -> Self {
        Self {
            id: UnitId::generate(),
            spec,
            state: UnitState::default(),
            pid: None,
            exit_code: None,
            last_exit_reason: None,
            restart_count: 0,
            consecutive_failures: 0,
            start_times: Vec::new(),
            created_at: SystemTime::now(),
            started_at: None,
            stopped_at: None,
        }
    }

    // ===== Getters =====

    pub fn id(&self) -> UnitId {
        self.id
    }

    pub fn name(&self) -> &str {
        self.spec.name()
    }

    pub fn spec(&self) -> &ProcessSpec {
        &self.spec
    }

    pub fn state(&self) -> UnitState {
        self.state
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }

    pub fn last_exit_reason(&self) -> Option<ExitReason> {
        self.last_exit_reason
    }

    pub fn restart_count(&self) -> u32 {
        self.restart_count
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn created_at(&self) -> SystemTime {
        self.created_at
    }

    pub fn started_at(&self) -> Option<SystemTime> {
        self.started_at
    }

    pub fn stopped_at(&self) -> Option<SystemTime> {
        self.stopped_at
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running()
    }

    pub fn can_start(&self) -> bool {
        self.state.can_start()
    }

    pub fn can_stop(&self) -> bool {
        self.state.can_stop()
    }

    // ===== State transitions =====

    fn transition_to(&mut self, new_state: UnitState) -> Result<(), DomainError> {
        if !self.state.can_transition_to(new_state) {
            return Err(DomainError::InvalidStateTransition {
                from: self.state.to_string(),
                to: new_state.to_string(),
            });
        }
        self.state = new_state;
        Ok(())
    }

    pub fn mark_starting(&mut self) -> Result<(), DomainError> {
        self.transition_to(UnitState::Starting)?;
        self.started_at = Some(SystemTime::now());
        Ok(())
    }

    pub fn mark_running(&mut self, pid: u32) -> Result<(), DomainError> {
        self.transition_to(UnitState::Running)?;
        self.pid = Some(pid);
        Ok(())
    }

    pub fn mark_stopping(&mut self) -> Result<(), DomainError> {
        self.transition_to(UnitState::Stopping)
    }

    pub fn mark_stopped(&mut self) -> Result<(), DomainError> {
        self.transition_to(UnitState::Stopped)?;
        self.pid = None;
        self.stopped_at = Some(SystemTime::now());
        Ok(())
    }

    /// Record that the memory watcher is about to terminate the child.
    /// The exit that follows keeps `memory-limit-exceeded` as its reason.
    pub fn mark_memory_exceeded(&mut self) -> Result<(), DomainError> {
        self.transition_to(UnitState::MemoryExceeded)?;
        self.last_exit_reason = Some(ExitReason::MemoryLimitExceeded);
        Ok(())
    }

    /// Record an observed child exit.
    /// An exit during an explicit stop lands in Stopped; an exit after a
    /// memory kill stays in MemoryExceeded; a spontaneous exit lands in
    /// Exited with the exit code as its reason.
    pub fn mark_exited(&mut self, exit_code: i32) -> Result<(), DomainError> {
        let new_state = match self.state {
            UnitState::Stopping | UnitState::Stopped => UnitState::Stopped,
            UnitState::MemoryExceeded => UnitState::MemoryExceeded,
            _ => UnitState::Exited,
        };
        self.transition_to(new_state)?;
        self.exit_code = Some(exit_code);
        if new_state == UnitState::Exited {
            self.last_exit_reason = Some(ExitReason::Exited(exit_code));
        }
        self.pid = None;
        self.stopped_at = Some(SystemTime::now());
        Ok(())
    }

    pub fn mark_restarting(&mut self) -> Result<(), DomainError> {
        self.transition_to(UnitState::Restarting)
    }

    /// A failed launch leaves the unit in Exited with no live child.
    /// Only reachable from Starting, where the transition is always legal.
    pub fn mark_launch_failed(&mut self) {
        self.state = UnitState::Exited;
        self.last_exit_reason = Some(ExitReason::Exited(LAUNCH_FAILURE_EXIT_CODE));
        self.pid = None;
        self.stopped_at = Some(SystemTime::now());
    }

    // ===== Restart bookkeeping =====

    /// A fresh operator-initiated start begins a new session
    pub fn reset_session(&mut self) {
        self.restart_count = 0;
        self.consecutive_failures = 0;
    }

    pub fn increment_restart_count(&mut self) {
        self.restart_count += 1;
    }

    pub fn increment_failures(&mut self) {
        self.consecutive_failures += 1;
    }

    pub fn reset_failures(&mut self) {
        self.consecutive_failures = 0;
    }

    /// Record a start time for start limit checking
    pub fn record_start_time(&mut self) {
        self.start_times.push(SystemTime::now());
    }

    /// Check if the unit has been started too many times within the
    /// start limit interval
    pub fn is_start_limit_exceeded(&mut self) -> bool {
        let now = SystemTime::now();
        let cutoff = now - std::time::Duration::from_secs(self.spec.start_limit_interval_sec());

        // Drop start times outside the interval
        self.start_times.retain(|&time| time >= cutoff);

        self.start_times.len() >= self.spec.max_restarts() as usize
    }

    /// Restart delay in seconds, with exponential backoff over
    /// consecutive failures
    pub fn calculate_restart_delay(&self) -> u64 {
        if self.consecutive_failures == 0 {
            return self.spec.restart_delay_sec();
        }

        let exponential_delay = self.spec.restart_delay_sec()
            * (RESTART_BACKOFF_BASE as u64).pow(self.consecutive_failures - 1);

        exponential_delay.min(self.spec.restart_max_delay_sec())
    }
}
