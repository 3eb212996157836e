//! StopUnit use case
//! Graceful stop with bounded escalation to SIGKILL

use crate::domain::constants::{SIGKILL, SIGTERM, STOP_POLL_INTERVAL_MS};
use crate::domain::ports::{ProcessExecutor, UnitRepository};
use crate::domain::services::SupervisionService;
use crate::domain::{DomainError, UnitState};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct StopUnitResponse {
    /// Whether a termination signal was actually sent.
    /// False when the unit had no live child (idempotent no-op).
    pub signaled: bool,
}

/// Use case for stopping a unit
#[async_trait]
pub trait StopUnit: Send + Sync {
    async fn execute(&self, name: &str) -> Result<StopUnitResponse, DomainError>;
}

pub struct StopUnitUseCase {
    repository: Arc<dyn UnitRepository>,
    executor: Arc<dyn ProcessExecutor>,
    supervisor: Arc<SupervisionService>,
}

impl StopUnitUseCase {
    pub fn new(
        repository: Arc<dyn UnitRepository>,
        executor: Arc<dyn ProcessExecutor>,
        supervisor: Arc<SupervisionService>,
    ) -> Self {
        Self {
            repository,
            executor,
            supervisor,
        }
    }

    /// Poll until the child is gone or the deadline passes
    async fn wait_for_exit(&self, pid: u32, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            match self.executor.is_running(pid).await {
                Ok(false) => return true,
                _ => sleep(Duration::from_millis(STOP_POLL_INTERVAL_MS)).await,
            }
        }
        false
    }
}

#[async_trait]
impl StopUnit for StopUnitUseCase {
    async fn execute(&self, name: &str) -> Result<StopUnitResponse, DomainError> {
        let mut unit = self
            .repository
            .find_by_name(name)
            .await?
            .ok_or_else(|| DomainError::UnitNotFound(name.to_string()))?;

        // Idempotent: stopping a unit with no live child is a no-op
        if !unit.can_stop() {
            debug!(
                unit = %name,
                state = %unit.state(),
                "Stop requested but unit is not running, nothing to do"
            );
            return Ok(StopUnitResponse { signaled: false });
        }

        // Suppress any pending automatic restart before touching the child
        self.supervisor.cancel_pending_restart(&unit.id());

        unit.mark_stopping()?;
        self.repository.save(unit.clone()).await?;

        let Some(pid) = unit.pid() else {
            // A restart was pending; there is no child to signal
            unit.mark_stopped()?;
            self.repository.save(unit).await?;
            info!(unit = %name, "Pending restart cancelled, unit stopped");
            return Ok(StopUnitResponse { signaled: false });
        };

        let timeout_secs = unit.spec().stop_timeout_sec();
        info!(unit = %name, pid = pid, timeout_secs = timeout_secs, "Stopping unit");

        if let Err(e) = self.executor.kill(pid, SIGTERM).await {
            warn!(
                unit = %name,
                pid = pid,
                error = %e,
                "Failed to signal child (may have already exited)"
            );
        }

        if !self
            .wait_for_exit(pid, Duration::from_secs(timeout_secs))
            .await
        {
            let timeout_err = DomainError::ShutdownTimeout {
                unit: name.to_string(),
                timeout_secs,
            };
            warn!(unit = %name, pid = pid, error = %timeout_err, "Escalating to SIGKILL");

            if let Err(e) = self.executor.kill(pid, SIGKILL).await {
                warn!(unit = %name, pid = pid, error = %e, "Failed to force-kill child");
            }
            // SIGKILL cannot be ignored; give the kernel a moment
            self.wait_for_exit(pid, Duration::from_secs(2)).await;
        }

        // The exit event may have finalized the state concurrently
        let mut unit = self
            .repository
            .find_by_name(name)
            .await?
            .ok_or_else(|| DomainError::UnitNotFound(name.to_string()))?;
        if unit.state() != UnitState::Stopped {
            unit.mark_stopped()?;
            self.repository.save(unit).await?;
        }

        info!(unit = %name, "Unit stopped");
        Ok(StopUnitResponse { signaled: true })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::{SpawnConfig, SpawnResult};
    use crate::domain::services::MemoryWatchService;
    use crate::domain::{ProcessSpec, Unit};
    use crate::infrastructure::InMemoryUnitRepository;
    use std::collections::HashSet;

    /// Executor whose children die on SIGTERM only if `obeys_term` is set
    struct MockExecutor {
        running: Arc<tokio::sync::Mutex<HashSet<u32>>>,
        kills: Arc<tokio::sync::Mutex<Vec<(u32, i32)>>>,
        obeys_term: bool,
    }

    impl MockExecutor {
        fn new(obeys_term: bool) -> Self {
            Self {
                running: Arc::new(tokio::sync::Mutex::new(HashSet::new())),
                kills: Arc::new(tokio::sync::Mutex::new(Vec::new())),
                obeys_term,
            }
        }

        async fn add_running(&self, pid: u32) {
            self.running.lock().await.insert(pid);
        }
    }

    #[async_trait]
    impl ProcessExecutor for MockExecutor {
        async fn spawn(&self, _config: SpawnConfig) -> Result<SpawnResult, DomainError> {
            Ok(SpawnResult {
                pid: 1234,
                exit_handle: None,
            })
        }

        async fn kill(&self, pid: u32, signal: i32) -> Result<(), DomainError> {
            self.kills.lock().await.push((pid, signal));
            if signal == SIGKILL || (signal == SIGTERM && self.obeys_term) {
                self.running.lock().await.remove(&pid);
            }
            Ok(())
        }

        async fn is_running(&self, pid: u32) -> Result<bool, DomainError> {
            Ok(self.running.lock().await.contains(&pid))
        }
    }

    struct NoUsageReader;

    impl crate::domain::ports::MemoryUsageReader for NoUsageReader {
        fn rss_bytes(&self, _pid: u32) -> Option<u64> {
            None
        }
    }

    fn build_use_case(
        repo: Arc<InMemoryUnitRepository>,
        executor: Arc<MockExecutor>,
    ) -> StopUnitUseCase {
        let memory_watch = Arc::new(MemoryWatchService::new(
            repo.clone(),
            executor.clone(),
            Arc::new(NoUsageReader),
        ));
        let (supervisor, _exit_rx) =
            SupervisionService::new(repo.clone(), executor.clone(), memory_watch);
        StopUnitUseCase::new(repo, executor, supervisor)
    }

    fn running_unit(name: &str, stop_timeout_sec: u64) -> Unit {
        let spec = ProcessSpec::builder(name, "/bin/sh")
            .stop_timeout_sec(stop_timeout_sec)
            .build()
            .unwrap();
        let mut unit = Unit::new(spec);
        unit.mark_starting().unwrap();
        unit.mark_running(1234).unwrap();
        unit
    }

    #[tokio::test]
    async fn test_graceful_stop() {
        let repo = Arc::new(InMemoryUnitRepository::new());
        let executor = Arc::new(MockExecutor::new(true));
        executor.add_running(1234).await;
        let use_case = build_use_case(repo.clone(), executor.clone());

        repo.save(running_unit("svc", 5)).await.unwrap();

        let response = use_case.execute("svc").await.unwrap();
        assert!(response.signaled);

        let updated = repo.find_by_name("svc").await.unwrap().unwrap();
        assert_eq!(updated.state(), UnitState::Stopped);
        assert_eq!(updated.pid(), None);

        // Exactly one SIGTERM, no escalation
        let kills = executor.kills.lock().await;
        assert_eq!(kills.as_slice(), &[(1234, SIGTERM)]);
    }

    #[tokio::test]
    async fn test_stop_escalates_to_sigkill_after_grace_period() {
        let repo = Arc::new(InMemoryUnitRepository::new());
        let executor = Arc::new(MockExecutor::new(false));
        executor.add_running(1234).await;
        let use_case = build_use_case(repo.clone(), executor.clone());

        // Short grace period so the test is quick
        repo.save(running_unit("stubborn", 1)).await.unwrap();

        let response = use_case.execute("stubborn").await.unwrap();
        assert!(response.signaled);

        let updated = repo.find_by_name("stubborn").await.unwrap().unwrap();
        assert_eq!(updated.state(), UnitState::Stopped);

        let kills = executor.kills.lock().await;
        assert_eq!(kills.as_slice(), &[(1234, SIGTERM), (1234, SIGKILL)]);
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let repo = Arc::new(InMemoryUnitRepository::new());
        let executor = Arc::new(MockExecutor::new(true));
        executor.add_running(1234).await;
        let use_case = build_use_case(repo.clone(), executor.clone());

        repo.save(running_unit("svc", 5)).await.unwrap();

        let first = use_case.execute("svc").await.unwrap();
        assert!(first.signaled);

        // Second stop sends no further signal and is not an error
        let second = use_case.execute("svc").await.unwrap();
        assert!(!second.signaled);

        let kills = executor.kills.lock().await;
        assert_eq!(kills.len(), 1);
    }

    #[tokio::test]
    async fn test_stop_never_started_unit_is_a_no_op() {
        let repo = Arc::new(InMemoryUnitRepository::new());
        let executor = Arc::new(MockExecutor::new(true));
        let use_case = build_use_case(repo.clone(), executor.clone());

        let spec = ProcessSpec::builder("fresh", "/bin/sh").build().unwrap();
        repo.save(Unit::new(spec)).await.unwrap();

        let response = use_case.execute("fresh").await.unwrap();
        assert!(!response.signaled);
        assert!(executor.kills.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_stop_unknown_unit() {
        let repo = Arc::new(InMemoryUnitRepository::new());
        let executor = Arc::new(MockExecutor::new(true));
        let use_case = build_use_case(repo, executor);

        let result = use_case.execute("missing").await;
        assert!(matches!(result, Err(DomainError::UnitNotFound(_))));
    }

    #[tokio::test]
    async fn test_stop_finalizes_pending_restart() {
        let repo = Arc::new(InMemoryUnitRepository::new());
        let executor = Arc::new(MockExecutor::new(true));
        let use_case = build_use_case(repo.clone(), executor.clone());

        // Unit waiting out a restart backoff: no live child
        let mut unit = running_unit("flappy", 5);
        unit.mark_exited(1).unwrap();
        unit.mark_restarting().unwrap();
        repo.save(unit).await.unwrap();

        let response = use_case.execute("flappy").await.unwrap();
        assert!(!response.signaled);

        let updated = repo.find_by_name("flappy").await.unwrap().unwrap();
        assert_eq!(updated.state(), UnitState::Stopped);
        assert!(executor.kills.lock().await.is_empty());
    }
}
