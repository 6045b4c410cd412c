use crate::{
    driver::ExecutionHandle,
    error::Error,
    types::{ExecutionOutcome, ExecutionResult},
    workspace::Workspace,
};
use std::time::Duration;
use tracing::{error, info, warn};

/// Turns an outcome into the caller's result and releases the request's
/// resources.
#[derive(Debug, Clone, Copy)]
pub struct ResultAssembler {
    stop_grace: Duration,
}

impl ResultAssembler {
    pub fn new(stop_grace: Duration) -> Self {
        Self { stop_grace }
    }

    pub fn to_result(outcome: Result<ExecutionOutcome, Error>) -> ExecutionResult {
        match outcome {
            Ok(ExecutionOutcome::Completed { exit_code, output }) => {
                info!("Execution completed with exit code {}", exit_code);
                ExecutionResult::active(output)
            }
            Ok(ExecutionOutcome::TimedOut) => {
                info!("Execution timed out");
                ExecutionResult::timeout()
            }
            Err(e) => {
                error!("Execution failed: {}", e);
                ExecutionResult::error(e.to_string())
            }
        }
    }

    /// Build the result, then stop and remove the unit and remove the
    /// workspace. Cleanup failures are logged and never change the result.
    pub async fn finish(
        &self,
        outcome: Result<ExecutionOutcome, Error>,
        handle: Option<ExecutionHandle>,
        workspace: Option<Workspace>,
    ) -> ExecutionResult {
        let result = Self::to_result(outcome);

        if let Some(mut handle) = handle {
            if let Err(e) = handle.stop_if_running(self.stop_grace).await {
                warn!("Failed to stop unit {}: {}", handle.unit(), e);
            }
            if let Err(e) = handle.remove().await {
                warn!("Failed to remove unit {}: {}", handle.unit(), e);
            }
        }

        if let Some(workspace) = workspace {
            if let Err(e) = workspace.teardown().await {
                warn!("{}", e);
            }
        }

        result
    }
}
