use crate::{
    error::Error,
    languages::{LanguageProfile, LanguageTable},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Service configuration, usually read from a TOML file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecConfig {
    /// Directory under which per-request workspaces are created
    pub scratch_root: PathBuf,

    /// Wall-clock limit for one execution, in seconds
    pub deadline_secs: u64,

    /// How long a timed-out unit may take to stop before it is killed
    pub stop_grace_secs: u64,

    /// Optional cap on executions running at the same time
    pub max_concurrent: Option<usize>,

    /// Settings applied to every execution unit
    pub container: ContainerLimits,

    /// Replaces the built-in language table when present
    pub languages: Option<BTreeMap<String, LanguageProfile>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerLimits {
    /// Mount point of the workspace inside the unit
    pub workdir: String,
    pub memory_bytes: Option<i64>,
    pub nano_cpus: Option<i64>,
    pub network_disabled: bool,
}

impl Default for ContainerLimits {
    fn default() -> Self {
        Self {
            workdir: "/workspace".to_string(),
            memory_bytes: Some(512 * 1024 * 1024), // 512MB
            nano_cpus: Some(1_000_000_000),        // 1 CPU
            network_disabled: true,
        }
    }
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self {
            scratch_root: std::env::temp_dir().join("caramel-exec"),
            deadline_secs: 30,
            stop_grace_secs: 2,
            max_concurrent: None,
            container: ContainerLimits::default(),
            languages: None,
        }
    }
}

impl ExecConfig {
    /// Read and validate a TOML configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, Error> {
        let config: ExecConfig =
            toml::from_str(raw).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.deadline_secs == 0 {
            return Err(Error::Config("deadline_secs must be positive".to_string()));
        }
        if self.max_concurrent == Some(0) {
            return Err(Error::Config("max_concurrent must be positive".to_string()));
        }
        if !self.container.workdir.starts_with('/') {
            return Err(Error::Config(format!(
                "container workdir must be absolute, got {:?}",
                self.container.workdir
            )));
        }
        self.language_table().map(|_| ())
    }

    /// Build the immutable language table this configuration describes
    pub fn language_table(&self) -> Result<LanguageTable, Error> {
        match &self.languages {
            Some(profiles) => LanguageTable::from_profiles(profiles.clone()),
            None => Ok(LanguageTable::builtin()),
        }
    }

    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.deadline_secs)
    }

    pub fn stop_grace(&self) -> Duration {
        Duration::from_secs(self.stop_grace_secs)
    }

    pub fn with_scratch_root(mut self, scratch_root: impl Into<PathBuf>) -> Self {
        self.scratch_root = scratch_root.into();
        self
    }

    pub fn with_deadline_secs(mut self, deadline_secs: u64) -> Self {
        self.deadline_secs = deadline_secs;
        self
    }

    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = Some(max_concurrent);
        self
    }
}
