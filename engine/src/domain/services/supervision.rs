//! Supervision service
//! Event-driven monitoring and automatic restart handling for managed units.
//! Child exits arrive as events over a channel (no polling); restart
//! evaluation applies the unit's policy, exponential backoff, and the
//! start limit window.

use crate::domain::constants::{LAUNCH_FAILURE_EXIT_CODE, SUCCESS_EXIT_CODE};
use crate::domain::ports::{ProcessExecutor, ProcessExitHandle, SpawnConfig, UnitRepository};
use crate::domain::services::MemoryWatchService;
use crate::domain::{DomainError, ExitReason, ProcessSpec, Unit, UnitId, UnitState};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Notification that a unit's child has fully exited
#[derive(Debug, Clone)]
pub struct UnitExitEvent {
    pub unit_id: UnitId,
    pub pid: u32,
    pub exit_code: i32,
}

/// Supervision service
/// Single coordinator for unit lifecycle management:
/// - exit monitoring via per-child exit handles
/// - automatic restarts based on policy, with backoff and start limits
/// - memory watch registration for units with a configured ceiling
pub struct SupervisionService {
    repository: Arc<dyn UnitRepository>,
    executor: Arc<dyn ProcessExecutor>,
    memory_watch: Arc<MemoryWatchService>,
    exit_tx: mpsc::UnboundedSender<UnitExitEvent>,
    restart_cancels: Mutex<HashMap<UnitId, CancellationToken>>,
}

impl SupervisionService {
    /// Create a new supervisor along with the receiving end of its
    /// exit-event channel (to be passed to [`SupervisionService::run`])
    pub fn new(
        repository: Arc<dyn UnitRepository>,
        executor: Arc<dyn ProcessExecutor>,
        memory_watch: Arc<MemoryWatchService>,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<UnitExitEvent>) {
        let (exit_tx, exit_rx) = mpsc::unbounded_channel();
        (
            Arc::new(Self {
                repository,
                executor,
                memory_watch,
                exit_tx,
                restart_cancels: Mutex::new(HashMap::new()),
            }),
            exit_rx,
        )
    }

    /// Validate, spawn, and register a unit's child process.
    /// The unit must already be in a state that allows starting
    /// (the use-case layer enforces the operator-facing guards).
    pub async fn spawn_unit(&self, unit_id: &UnitId) -> Result<u32, DomainError> {
        let mut unit = self
            .repository
            .find_by_id(unit_id)
            .await?
            .ok_or_else(|| DomainError::UnitNotFound(unit_id.to_string()))?;

        validate_launch_paths(unit.spec())?;

        unit.record_start_time();
        unit.mark_starting()?;
        self.repository.save(unit.clone()).await?;

        let config = SpawnConfig::from_unit(&unit);
        match self.executor.spawn(config).await {
            Ok(result) => {
                unit.mark_running(result.pid)?;
                self.repository.save(unit.clone()).await?;
                self.register_started_unit(&unit, result.exit_handle);
                info!(unit = %unit.name(), pid = result.pid, "Unit launched");
                Ok(result.pid)
            }
            Err(e) => {
                error!(unit = %unit.name(), error = %e, "Failed to launch unit");
                unit.mark_launch_failed();
                self.repository.save(unit).await?;
                Err(e)
            }
        }
    }

    /// Register a freshly spawned child for exit monitoring and, when a
    /// memory ceiling is configured, for memory watching
    pub fn register_started_unit(&self, unit: &Unit, exit_handle: Option<ProcessExitHandle>) {
        if let Some(handle) = exit_handle {
            let tx = self.exit_tx.clone();
            let unit_id = unit.id();
            let pid = unit.pid().unwrap_or(0);
            let name = unit.name().to_string();

            tokio::spawn(async move {
                let exit_code = match handle.await {
                    Ok(code) => code,
                    Err(e) => {
                        error!(unit = %name, error = %e, "Failed to observe child exit");
                        -1
                    }
                };
                debug!(unit = %name, pid = pid, exit_code = exit_code, "Child exit observed");
                let _ = tx.send(UnitExitEvent {
                    unit_id,
                    pid,
                    exit_code,
                });
            });
        }

        if unit.spec().memory_limit().has_limit() {
            self.memory_watch.start_watching(unit.id());
        }
    }

    /// Cancel a pending restart backoff for the unit, if any.
    /// Called by an explicit stop to suppress further automatic restarts.
    pub fn cancel_pending_restart(&self, unit_id: &UnitId) {
        if let Some(token) = self.restart_cancels.lock().unwrap().get(unit_id) {
            token.cancel();
        }
    }

    /// Run the supervision loop until the cancellation token fires.
    /// Each exit event is handled on its own task so one unit's restart
    /// backoff never delays another unit's exit handling.
    pub async fn run(
        self: Arc<Self>,
        mut exit_rx: mpsc::UnboundedReceiver<UnitExitEvent>,
        cancellation_token: CancellationToken,
    ) {
        info!("Supervisor started (event-driven)");

        loop {
            tokio::select! {
                _ = cancellation_token.cancelled() => {
                    info!("Supervisor received shutdown signal");
                    break;
                }
                Some(event) = exit_rx.recv() => {
                    info!(
                        unit_id = %event.unit_id,
                        pid = event.pid,
                        exit_code = event.exit_code,
                        "Received unit exit event"
                    );

                    let supervisor = self.clone();
                    tokio::spawn(async move {
                        if let Err(e) = supervisor.handle_exit_event(event).await {
                            error!(error = %e, "Error handling unit exit");
                        }
                    });
                }
            }
        }

        info!("Supervisor stopped");
    }

    /// Handle a unit exit event
    async fn handle_exit_event(&self, event: UnitExitEvent) -> Result<(), DomainError> {
        let mut unit = match self.repository.find_by_id(&event.unit_id).await? {
            Some(u) => u,
            None => {
                warn!(
                    unit_id = %event.unit_id,
                    "Exit event for unknown unit (may have been removed)"
                );
                return Ok(());
            }
        };

        // A previous incarnation's watcher may fire after a restart or an
        // explicit stop already recorded the exit; those events are stale.
        if unit.pid() != Some(event.pid) {
            debug!(
                unit = %unit.name(),
                event_pid = event.pid,
                current_pid = ?unit.pid(),
                "Stale exit event, ignoring"
            );
            return Ok(());
        }

        unit.mark_exited(event.exit_code)?;

        match unit.state() {
            UnitState::Stopped => {
                info!(
                    unit = %unit.name(),
                    exit_code = event.exit_code,
                    "Unit stopped explicitly (not evaluating restart)"
                );
                self.repository.save(unit).await?;
                return Ok(());
            }
            UnitState::MemoryExceeded => {
                warn!(
                    unit = %unit.name(),
                    exit_code = event.exit_code,
                    "Unit terminated after exceeding its memory ceiling"
                );
                unit.increment_failures();
            }
            UnitState::Exited => {
                if event.exit_code == SUCCESS_EXIT_CODE {
                    info!(unit = %unit.name(), "Unit exited cleanly");
                    unit.reset_failures();
                } else {
                    warn!(
                        unit = %unit.name(),
                        exit_code = event.exit_code,
                        "Unit exited with failure"
                    );
                    unit.increment_failures();
                }
            }
            _ => {}
        }

        let reason = unit
            .last_exit_reason()
            .unwrap_or(ExitReason::Exited(event.exit_code));
        self.repository.save(unit.clone()).await?;

        self.evaluate_restart(unit, reason).await
    }

    /// Apply the restart policy for a stopped child.
    /// Loops so that launch failures during a restart are themselves fed
    /// back through the policy, bounded by the start limit window.
    async fn evaluate_restart(
        &self,
        unit: Unit,
        mut reason: ExitReason,
    ) -> Result<(), DomainError> {
        let unit_id = unit.id();
        let name = unit.name().to_string();
        let policy = unit.spec().restart_policy();
        drop(unit);

        loop {
            if !policy.should_restart(&reason) {
                info!(
                    unit = %name,
                    reason = %reason,
                    policy = %policy,
                    "Restart policy declines restart, unit is terminal"
                );
                self.park_terminal(&unit_id).await?;
                return Ok(());
            }

            let mut unit = self
                .repository
                .find_by_id(&unit_id)
                .await?
                .ok_or_else(|| DomainError::UnitNotFound(name.clone()))?;

            if unit.is_start_limit_exceeded() {
                warn!(
                    unit = %name,
                    max_restarts = unit.spec().max_restarts(),
                    interval_sec = unit.spec().start_limit_interval_sec(),
                    "Start limit exceeded, parking unit"
                );
                self.repository.save(unit).await?;
                self.park_terminal(&unit_id).await?;
                return Ok(());
            }

            let delay = unit.calculate_restart_delay();
            unit.mark_restarting()?;
            self.repository.save(unit).await?;

            info!(
                unit = %name,
                delay_secs = delay,
                reason = %reason,
                "Scheduling restart"
            );

            let token = self.register_restart_token(unit_id);
            if delay > 0 {
                tokio::select! {
                    _ = token.cancelled() => {
                        debug!(unit = %name, "Pending restart cancelled");
                        self.clear_restart_token(&unit_id);
                        return Ok(());
                    }
                    _ = sleep(Duration::from_secs(delay)) => {}
                }
            }
            self.clear_restart_token(&unit_id);
            if token.is_cancelled() {
                debug!(unit = %name, "Pending restart cancelled");
                return Ok(());
            }

            // The unit may have been stopped while the backoff was pending
            let current = self
                .repository
                .find_by_id(&unit_id)
                .await?
                .ok_or_else(|| DomainError::UnitNotFound(name.clone()))?;
            if current.state() != UnitState::Restarting {
                debug!(
                    unit = %name,
                    state = %current.state(),
                    "Unit state changed, aborting restart"
                );
                return Ok(());
            }

            let mut unit = current;
            unit.increment_restart_count();
            let restart_count = unit.restart_count();
            self.repository.save(unit).await?;

            match self.spawn_unit(&unit_id).await {
                Ok(pid) => {
                    info!(unit = %name, pid = pid, restart_count = restart_count, "Unit restarted");
                    return Ok(());
                }
                Err(e) => {
                    error!(unit = %name, error = %e, "Restart attempt failed to launch");
                    let mut unit = self
                        .repository
                        .find_by_id(&unit_id)
                        .await?
                        .ok_or_else(|| DomainError::UnitNotFound(name.clone()))?;
                    unit.increment_failures();
                    self.repository.save(unit).await?;
                    reason = ExitReason::Exited(LAUNCH_FAILURE_EXIT_CODE);
                }
            }
        }
    }

    /// Park a unit in its terminal state after restart evaluation declined
    async fn park_terminal(&self, unit_id: &UnitId) -> Result<(), DomainError> {
        let Some(mut unit) = self.repository.find_by_id(unit_id).await? else {
            return Ok(());
        };
        if unit.state() != UnitState::Stopped {
            unit.mark_stopped()?;
            self.repository.save(unit).await?;
        }
        Ok(())
    }

    fn register_restart_token(&self, unit_id: UnitId) -> CancellationToken {
        let token = CancellationToken::new();
        self.restart_cancels
            .lock()
            .unwrap()
            .insert(unit_id, token.clone());
        token
    }

    fn clear_restart_token(&self, unit_id: &UnitId) {
        self.restart_cancels.lock().unwrap().remove(unit_id);
    }
}

/// Check that the paths a unit launches from actually exist and are
/// executable before asking the OS to spawn it
pub(crate) fn validate_launch_paths(spec: &ProcessSpec) -> Result<(), DomainError> {
    let launch_error = |reason: String| DomainError::Launch {
        unit: spec.name().to_string(),
        reason,
    };

    let script = Path::new(spec.script());
    if !script.exists() {
        return Err(launch_error(format!(
            "script '{}' does not exist",
            spec.script()
        )));
    }

    match spec.interpreter() {
        Some(interpreter) => {
            let path = Path::new(interpreter);
            if !path.exists() {
                return Err(launch_error(format!(
                    "interpreter '{}' does not exist",
                    interpreter
                )));
            }
            if !is_executable(path) {
                return Err(launch_error(format!(
                    "interpreter '{}' is not executable",
                    interpreter
                )));
            }
        }
        None => {
            if !is_executable(script) {
                return Err(launch_error(format!(
                    "script '{}' is not executable",
                    spec.script()
                )));
            }
        }
    }

    if let Some(cwd) = spec.cwd() {
        let dir = Path::new(cwd);
        if !dir.is_dir() {
            return Err(launch_error(format!(
                "working directory '{}' does not exist",
                cwd
            )));
        }
    }

    Ok(())
}

fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    std::fs::metadata(path)
        .map(|m| m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}
