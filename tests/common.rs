//! Shared helpers for end-to-end tests
//!
//! Each test wires a full engine (real executor, real procfs memory
//! reader, in-memory registry) and drives it through the use-case layer
//! against real `/bin/sh` children. The supervisor loop runs until the
//! [`TestEngine`] guard drops.

use oversee_engine::application::UseCaseRegistry;
use oversee_engine::domain::ports::UnitRepository;
use oversee_engine::domain::{ProcessSpec, SpecBuilder, Unit};
use oversee_engine::infrastructure::{
    InMemoryUnitRepository, ProcfsMemoryReader, UnixProcessExecutor,
};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

static NAME_COUNTER: AtomicU32 = AtomicU32::new(0);

/// Unique unit name so parallel tests never collide
pub fn unique_unit_name(prefix: &str) -> String {
    format!(
        "{}-{}-{}",
        prefix,
        std::process::id(),
        NAME_COUNTER.fetch_add(1, Ordering::SeqCst)
    )
}

/// Spec builder for an inline shell command
pub fn sh_spec(name: &str, body: &str) -> SpecBuilder {
    ProcessSpec::builder(name, "/bin/sh").args(vec!["-c".to_string(), body.to_string()])
}

/// A running engine with its supervisor loop active
pub struct TestEngine {
    pub registry: UseCaseRegistry,
    pub repository: Arc<InMemoryUnitRepository>,
    shutdown: CancellationToken,
}

impl TestEngine {
    /// Must be called from within a tokio runtime
    pub fn start() -> Self {
        let repository = Arc::new(InMemoryUnitRepository::new());
        let executor = Arc::new(UnixProcessExecutor::new());
        let memory_reader = Arc::new(ProcfsMemoryReader::new());
        let (registry, exit_rx) =
            UseCaseRegistry::new(repository.clone(), executor, memory_reader);

        let shutdown = CancellationToken::new();
        tokio::spawn(registry.supervisor().run(exit_rx, shutdown.clone()));

        Self {
            registry,
            repository,
            shutdown,
        }
    }

    pub async fn add_unit(&self, spec: ProcessSpec) {
        self.repository.save(Unit::new(spec)).await.unwrap();
    }

    /// Poll the unit until the predicate holds; None on timeout
    pub async fn wait_for_unit<F>(
        &self,
        name: &str,
        timeout: Duration,
        predicate: F,
    ) -> Option<Unit>
    where
        F: Fn(&Unit) -> bool,
    {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if let Some(unit) = self.repository.find_by_name(name).await.unwrap() {
                if predicate(&unit) {
                    return Some(unit);
                }
            }
            if tokio::time::Instant::now() >= deadline {
                return None;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }
}

impl Drop for TestEngine {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
