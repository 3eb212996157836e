//! RestartUnit use case
//! Operator-initiated restart: an explicit stop followed by a fresh start

use crate::domain::use_cases::{StartUnit, StopUnit};
use crate::domain::{DomainError, UnitId};
use async_trait::async_trait;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct RestartUnitResponse {
    pub unit_id: UnitId,
    pub pid: u32,
}

/// Use case for restarting a unit
#[async_trait]
pub trait RestartUnit: Send + Sync {
    async fn execute(&self, name: &str) -> Result<RestartUnitResponse, DomainError>;
}

pub struct RestartUnitUseCase {
    stop_unit: Arc<dyn StopUnit>,
    start_unit: Arc<dyn StartUnit>,
}

impl RestartUnitUseCase {
    pub fn new(stop_unit: Arc<dyn StopUnit>, start_unit: Arc<dyn StartUnit>) -> Self {
        Self {
            stop_unit,
            start_unit,
        }
    }
}

#[async_trait]
impl RestartUnit for RestartUnitUseCase {
    async fn execute(&self, name: &str) -> Result<RestartUnitResponse, DomainError> {
        // Stop is idempotent, so this works from any state
        self.stop_unit.execute(name).await?;
        let started = self.start_unit.execute(name).await?;

        Ok(RestartUnitResponse {
            unit_id: started.unit_id,
            pid: started.pid,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::use_cases::{StartUnitResponse, StopUnitResponse};
    use std::sync::atomic::{AtomicU32, Ordering};

    struct RecordingStop {
        calls: AtomicU32,
    }

    #[async_trait]
    impl StopUnit for RecordingStop {
        async fn execute(&self, _name: &str) -> Result<StopUnitResponse, DomainError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(StopUnitResponse { signaled: true })
        }
    }

    struct RecordingStart {
        calls: AtomicU32,
    }

    #[async_trait]
    impl StartUnit for RecordingStart {
        async fn execute(&self, _name: &str) -> Result<StartUnitResponse, DomainError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(StartUnitResponse {
                unit_id: UnitId::generate(),
                pid: 4321,
            })
        }
    }

    #[tokio::test]
    async fn test_restart_stops_then_starts() {
        let stop = Arc::new(RecordingStop {
            calls: AtomicU32::new(0),
        });
        let start = Arc::new(RecordingStart {
            calls: AtomicU32::new(0),
        });
        let use_case = RestartUnitUseCase::new(stop.clone(), start.clone());

        let response = use_case.execute("svc").await.unwrap();
        assert_eq!(response.pid, 4321);
        assert_eq!(stop.calls.load(Ordering::SeqCst), 1);
        assert_eq!(start.calls.load(Ordering::SeqCst), 1);
    }
}
