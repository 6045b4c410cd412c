//! # Code Execution Service
//!
//! Runs untrusted code snippets inside short-lived containers. Each request
//! gets its own scratch workspace and execution unit, is bounded by a
//! wall-clock deadline, and has every resource it created released before its
//! result is returned.

mod assembler;
mod config;
mod driver;
mod error;
mod languages;
mod runtime;
mod service;
mod supervisor;
mod types;
mod workspace;

#[cfg(test)]
mod tests;

pub use assembler::ResultAssembler;
pub use config::{ContainerLimits, ExecConfig};
pub use driver::{ExecutionDriver, ExecutionHandle, UnitState};
pub use error::Error;
pub use languages::{render_launcher, shell_escape, LanguageProfile, LanguageTable};
pub use runtime::{ContainerRuntime, DockerRuntime, UnitId, UnitSpec, VolumeBind};
pub use service::CodeExecutionService;
pub use supervisor::TimeoutSupervisor;
pub use types::{ExecutionOutcome, ExecutionRequest, ExecutionResult, ExecutionStatus};
pub use workspace::Workspace;

/// Result type for code execution operations
pub type Result<T> = std::result::Result<T, Error>;
