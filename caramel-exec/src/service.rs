use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, error, field, info, info_span, Instrument, Span};

use crate::{
    assembler::ResultAssembler,
    config::ExecConfig,
    driver::ExecutionDriver,
    error::Error,
    languages::{LanguageProfile, LanguageTable},
    runtime::ContainerRuntime,
    supervisor::TimeoutSupervisor,
    types::{ExecutionRequest, ExecutionResult},
    workspace::Workspace,
};

/// Runs one independent pipeline per request:
/// resolve, stage, run, supervise, assemble.
#[derive(Clone)]
pub struct CodeExecutionService {
    languages: Arc<LanguageTable>,
    driver: Arc<ExecutionDriver>,
    supervisor: TimeoutSupervisor,
    assembler: ResultAssembler,
    scratch_root: Arc<PathBuf>,
    semaphore: Option<Arc<Semaphore>>,
}

impl CodeExecutionService {
    pub async fn new(config: ExecConfig, runtime: Arc<dyn ContainerRuntime>) -> Result<Self, Error> {
        config.validate()?;
        let languages = config.language_table()?;

        tokio::fs::create_dir_all(&config.scratch_root)
            .await
            .map_err(|e| {
                Error::Workspace(format!(
                    "Failed to create scratch root {}: {}",
                    config.scratch_root.display(),
                    e
                ))
            })?;
        // Bind mounts need an absolute host path
        let scratch_root = tokio::fs::canonicalize(&config.scratch_root)
            .await
            .map_err(|e| {
                Error::Workspace(format!(
                    "Failed to resolve scratch root {}: {}",
                    config.scratch_root.display(),
                    e
                ))
            })?;

        info!(
            "Execution service ready: {} languages, scratch root {}, deadline {}s",
            languages.len(),
            scratch_root.display(),
            config.deadline_secs
        );

        Ok(Self {
            languages: Arc::new(languages),
            driver: Arc::new(ExecutionDriver::new(runtime, config.container.clone())),
            supervisor: TimeoutSupervisor::new(config.deadline(), config.stop_grace()),
            assembler: ResultAssembler::new(config.stop_grace()),
            scratch_root: Arc::new(scratch_root),
            semaphore: config
                .max_concurrent
                .map(|permits| Arc::new(Semaphore::new(permits))),
        })
    }

    /// Check a request without creating anything
    pub fn validate(&self, request: &ExecutionRequest) -> Result<&LanguageProfile, Error> {
        if request.language.trim().is_empty() {
            return Err(Error::InvalidRequest("language is required".to_string()));
        }
        self.languages.resolve(&request.language)
    }

    /// Execute a request. Failures are reported through the result's status;
    /// every resource the request created is released before this returns.
    pub async fn execute(&self, request: ExecutionRequest) -> ExecutionResult {
        let span = info_span!(
            "execution",
            language = %request.language,
            workspace = field::Empty
        );
        self.run_pipeline(request).instrument(span).await
    }

    async fn run_pipeline(&self, request: ExecutionRequest) -> ExecutionResult {
        let profile = match self.validate(&request) {
            Ok(profile) => profile,
            Err(e) => {
                info!("Rejected request: {}", e);
                return ExecutionResult::error(e.to_string());
            }
        };

        let _permit = match &self.semaphore {
            Some(semaphore) => match semaphore.clone().acquire_owned().await {
                Ok(permit) => Some(permit),
                Err(e) => {
                    error!("Failed to acquire execution permit: {}", e);
                    return ExecutionResult::error(format!(
                        "Failed to acquire execution permit: {}",
                        e
                    ));
                }
            },
            None => None,
        };

        let workspace = match Workspace::stage(&self.scratch_root, profile, &request).await {
            Ok(workspace) => workspace,
            Err(e) => return self.assembler.finish(Err(e), None, None).await,
        };
        Span::current().record("workspace", workspace.id());
        debug!("Staged {} bytes of source", request.code.len());

        let mut handle = match self.driver.run(profile, &workspace).await {
            Ok(handle) => handle,
            Err(e) => return self.assembler.finish(Err(e), None, Some(workspace)).await,
        };

        let outcome = self.supervisor.supervise(&mut handle).await;
        self.assembler
            .finish(outcome, Some(handle), Some(workspace))
            .await
    }

    /// Supported language names, sorted
    pub fn languages(&self) -> Vec<&str> {
        self.languages.names()
    }

    pub fn get_available_slots(&self) -> Option<usize> {
        self.semaphore.as_ref().map(|s| s.available_permits())
    }
}
