use crate::{
    config::ContainerLimits,
    error::Error,
    languages::{LanguageProfile, LAUNCHER_FILE},
    runtime::{ContainerRuntime, UnitId, UnitSpec, VolumeBind},
    workspace::Workspace,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Lifecycle of one execution unit as seen by its handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitState {
    Created,
    Running,
    Exited,
    Stopped,
    Removed,
}

/// Provisions execution units bound to a workspace
pub struct ExecutionDriver {
    runtime: Arc<dyn ContainerRuntime>,
    limits: ContainerLimits,
}

impl ExecutionDriver {
    pub fn new(runtime: Arc<dyn ContainerRuntime>, limits: ContainerLimits) -> Self {
        Self { runtime, limits }
    }

    /// Describe the unit that runs `workspace` with `profile`
    pub fn unit_spec(&self, profile: &LanguageProfile, workspace: &Workspace) -> UnitSpec {
        UnitSpec {
            name: format!("caramel-{}", workspace.id()),
            image: profile.image.clone(),
            command: vec!["bash".to_string(), LAUNCHER_FILE.to_string()],
            working_dir: self.limits.workdir.clone(),
            bind: VolumeBind {
                host_path: workspace.root_dir().to_path_buf(),
                container_path: self.limits.workdir.clone(),
            },
            memory_bytes: self.limits.memory_bytes,
            nano_cpus: self.limits.nano_cpus,
            network_disabled: self.limits.network_disabled,
        }
    }

    /// Create and start a unit. If the start fails, the created unit is
    /// removed before the error is returned.
    pub async fn run(
        &self,
        profile: &LanguageProfile,
        workspace: &Workspace,
    ) -> Result<ExecutionHandle, Error> {
        let spec = self.unit_spec(profile, workspace);
        let unit = self.runtime.create(&spec).await?;
        debug!("Created unit {} from image {}", unit, spec.image);

        let mut handle = ExecutionHandle {
            runtime: self.runtime.clone(),
            unit,
            state: UnitState::Created,
        };

        if let Err(e) = self.runtime.start(&handle.unit).await {
            if let Err(cleanup) = handle.remove().await {
                warn!("Failed to remove unit after start failure: {}", cleanup);
            }
            return Err(e);
        }
        handle.state = UnitState::Running;
        debug!("Started unit {}", handle.unit);

        Ok(handle)
    }
}

/// A started execution unit.
///
/// Stop and remove are each issued at most once. A handle dropped before it
/// was removed schedules a forced removal on the current runtime.
pub struct ExecutionHandle {
    runtime: Arc<dyn ContainerRuntime>,
    unit: UnitId,
    state: UnitState,
}

impl ExecutionHandle {
    pub fn unit(&self) -> &UnitId {
        &self.unit
    }

    pub fn state(&self) -> UnitState {
        self.state
    }

    /// Wait for the program to exit, then collect its combined output.
    ///
    /// Cancel safe: dropping the future leaves the handle `Running` and the
    /// unit untouched.
    pub async fn wait(&mut self) -> Result<(i64, String), Error> {
        let exit_code = self.runtime.wait(&self.unit).await?;
        if self.state == UnitState::Running {
            self.state = UnitState::Exited;
        }
        let output = self.runtime.logs(&self.unit).await?;
        Ok((exit_code, output))
    }

    /// Stop the unit if it is still running. Returns whether a stop was issued.
    pub async fn stop_if_running(&mut self, grace: Duration) -> Result<bool, Error> {
        if self.state != UnitState::Running {
            return Ok(false);
        }
        self.state = UnitState::Stopped;
        self.runtime.stop(&self.unit, grace).await?;
        debug!("Stopped unit {}", self.unit);
        Ok(true)
    }

    pub async fn remove(&mut self) -> Result<(), Error> {
        if self.state == UnitState::Removed {
            return Ok(());
        }
        self.state = UnitState::Removed;
        self.runtime.remove(&self.unit).await?;
        debug!("Removed unit {}", self.unit);
        Ok(())
    }
}

impl Drop for ExecutionHandle {
    fn drop(&mut self) {
        if self.state == UnitState::Removed {
            return;
        }
        warn!("Unit {} dropped before removal", self.unit);
        if let Ok(rt) = tokio::runtime::Handle::try_current() {
            let runtime = self.runtime.clone();
            let unit = self.unit.clone();
            rt.spawn(async move {
                if let Err(e) = runtime.remove(&unit).await {
                    warn!("Failed to remove abandoned unit {}: {}", unit, e);
                }
            });
        }
    }
}
