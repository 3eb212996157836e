//! Memory watch service
//! Samples resident memory of running children on a fixed interval and
//! forcibly terminates any child above its configured ceiling. The
//! supervision service then applies the restart policy to the resulting
//! exit, which carries the `memory-limit-exceeded` reason.

use crate::domain::constants::{MEMORY_POLL_INTERVAL_MS, SIGKILL};
use crate::domain::ports::{MemoryUsageReader, ProcessExecutor, UnitRepository};
use crate::domain::UnitId;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, warn};

/// Per-unit memory polling
pub struct MemoryWatchService {
    repository: Arc<dyn UnitRepository>,
    executor: Arc<dyn ProcessExecutor>,
    memory_reader: Arc<dyn MemoryUsageReader>,
    poll_interval: Duration,
}

impl MemoryWatchService {
    pub fn new(
        repository: Arc<dyn UnitRepository>,
        executor: Arc<dyn ProcessExecutor>,
        memory_reader: Arc<dyn MemoryUsageReader>,
    ) -> Self {
        Self {
            repository,
            executor,
            memory_reader,
            poll_interval: Duration::from_millis(MEMORY_POLL_INTERVAL_MS),
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Spawn a background task that watches one unit's child.
    /// The task ends when the child stops running; a restarted child is
    /// registered again by the supervisor.
    pub fn start_watching(&self, unit_id: UnitId) {
        let repository = self.repository.clone();
        let executor = self.executor.clone();
        let memory_reader = self.memory_reader.clone();
        let poll_interval = self.poll_interval;

        tokio::spawn(async move {
            Self::watch_loop(unit_id, repository, executor, memory_reader, poll_interval).await;
        });
    }

    async fn watch_loop(
        unit_id: UnitId,
        repository: Arc<dyn UnitRepository>,
        executor: Arc<dyn ProcessExecutor>,
        memory_reader: Arc<dyn MemoryUsageReader>,
        poll_interval: Duration,
    ) {
        loop {
            sleep(poll_interval).await;

            let unit = match repository.find_by_id(&unit_id).await {
                Ok(Some(u)) => u,
                Ok(None) => {
                    debug!(unit_id = %unit_id, "Unit no longer exists, stopping memory watch");
                    break;
                }
                Err(e) => {
                    error!(unit_id = %unit_id, error = %e, "Failed to load unit for memory check");
                    continue;
                }
            };

            let limit = unit.spec().memory_limit();
            if !limit.has_limit() {
                debug!(unit = %unit.name(), "No memory ceiling configured, stopping watch");
                break;
            }

            if !unit.is_running() {
                debug!(unit = %unit.name(), "Unit not running, stopping memory watch");
                break;
            }

            let Some(pid) = unit.pid() else {
                continue;
            };

            let Some(rss) = memory_reader.rss_bytes(pid) else {
                debug!(unit = %unit.name(), pid = pid, "No memory sample available");
                continue;
            };

            if limit.is_exceeded_by(rss) {
                warn!(
                    unit = %unit.name(),
                    pid = pid,
                    rss_bytes = rss,
                    limit = %limit,
                    "Memory ceiling exceeded, terminating child"
                );

                let mut updated = unit.clone();
                if let Err(e) = updated.mark_memory_exceeded() {
                    // The unit changed state under us (exit or stop in flight)
                    debug!(unit = %unit.name(), error = %e, "Skipping memory kill");
                    break;
                }
                if let Err(e) = repository.save(updated).await {
                    error!(unit = %unit.name(), error = %e, "Failed to save unit before memory kill");
                    break;
                }

                if let Err(e) = executor.kill(pid, SIGKILL).await {
                    error!(
                        unit = %unit.name(),
                        pid = pid,
                        error = %e,
                        "Failed to terminate child over memory ceiling"
                    );
                }
                break;
            }
        }
    }
}
