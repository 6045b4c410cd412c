//! Container runtime abstraction consumed by the execution driver

mod docker;

pub use docker::DockerRuntime;

use crate::error::Error;
use async_trait::async_trait;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Identifier the runtime assigned to a created unit
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UnitId(String);

impl UnitId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Read-write bind of a host directory into the unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeBind {
    pub host_path: PathBuf,
    pub container_path: String,
}

/// Everything needed to create one execution unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitSpec {
    pub name: String,
    pub image: String,
    /// Argument vector, never passed through a shell
    pub command: Vec<String>,
    pub working_dir: String,
    pub bind: VolumeBind,
    pub memory_bytes: Option<i64>,
    pub nano_cpus: Option<i64>,
    pub network_disabled: bool,
}

/// Operations the pipeline needs from a container runtime.
///
/// `create` and `start` report failures as [`Error::Provision`]; the other
/// operations use [`Error::Runtime`].
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    async fn create(&self, spec: &UnitSpec) -> Result<UnitId, Error>;

    async fn start(&self, unit: &UnitId) -> Result<(), Error>;

    /// Block until the process inside the unit exits and return its exit code
    async fn wait(&self, unit: &UnitId) -> Result<i64, Error>;

    /// Full combined stdout/stderr of the unit
    async fn logs(&self, unit: &UnitId) -> Result<String, Error>;

    /// Ask the unit to stop, killing it once `grace` has elapsed
    async fn stop(&self, unit: &UnitId, grace: Duration) -> Result<(), Error>;

    /// Forcibly remove the unit
    async fn remove(&self, unit: &UnitId) -> Result<(), Error>;
}
