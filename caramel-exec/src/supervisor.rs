use crate::{driver::ExecutionHandle, error::Error, types::ExecutionOutcome};
use tokio::time::{self, Duration};
use tracing::{debug, warn};

/// Races a unit's completion against a fixed deadline
#[derive(Debug, Clone, Copy)]
pub struct TimeoutSupervisor {
    deadline: Duration,
    stop_grace: Duration,
}

impl TimeoutSupervisor {
    pub fn new(deadline: Duration, stop_grace: Duration) -> Self {
        Self {
            deadline,
            stop_grace,
        }
    }

    /// Exactly one of completion or the deadline decides the outcome. When
    /// the deadline wins, the pending wait is dropped, so a late exit is
    /// never observed, and a single stop request is sent to the unit.
    pub async fn supervise(&self, handle: &mut ExecutionHandle) -> Result<ExecutionOutcome, Error> {
        let waited = time::timeout(self.deadline, handle.wait()).await;
        match waited {
            Ok(Ok((exit_code, output))) => {
                debug!("Unit {} exited with code {}", handle.unit(), exit_code);
                Ok(ExecutionOutcome::Completed { exit_code, output })
            }
            Ok(Err(e)) => Err(e),
            Err(_) => {
                warn!(
                    "Unit {} exceeded the {}s deadline, stopping",
                    handle.unit(),
                    self.deadline.as_secs_f32()
                );
                if let Err(e) = handle.stop_if_running(self.stop_grace).await {
                    warn!("Failed to stop timed out unit {}: {}", handle.unit(), e);
                }
                Ok(ExecutionOutcome::TimedOut)
            }
        }
    }
}
