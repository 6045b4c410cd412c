//! Language profiles: the static mapping from a logical language name to the
//! container image, entry file and command that run it.

mod builtin;
mod launcher;

pub use launcher::{render_launcher, shell_escape};

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// File names reserved inside every workspace
pub const INPUT_FILE: &str = "input";
pub const LAUNCHER_FILE: &str = "launcher";

/// Everything needed to build and run one language
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageProfile {
    /// Container image, assumed to be present on the host
    pub image: String,
    /// Name the submitted source is written under
    pub source_file: String,
    /// Compilation steps, run in order before `run`
    #[serde(default)]
    pub build: Vec<Vec<String>>,
    /// Program invocation; receives the request's stdin
    pub run: Vec<String>,
}

impl LanguageProfile {
    pub fn new(image: &str, source_file: &str, build: &[&[&str]], run: &[&str]) -> Self {
        Self {
            image: image.to_string(),
            source_file: source_file.to_string(),
            build: build
                .iter()
                .map(|step| step.iter().map(|arg| arg.to_string()).collect())
                .collect(),
            run: run.iter().map(|arg| arg.to_string()).collect(),
        }
    }

    fn validate(&self, name: &str) -> Result<(), Error> {
        if self.image.trim().is_empty() {
            return Err(Error::Config(format!("{name}: image must not be empty")));
        }
        let file = self.source_file.as_str();
        if file.is_empty()
            || file.contains('/')
            || file == "."
            || file == ".."
            || file == INPUT_FILE
            || file == LAUNCHER_FILE
        {
            return Err(Error::Config(format!(
                "{name}: invalid source file name {file:?}"
            )));
        }
        if self.run.is_empty() {
            return Err(Error::Config(format!("{name}: run command must not be empty")));
        }
        if self.build.iter().any(|step| step.is_empty()) {
            return Err(Error::Config(format!("{name}: empty build step")));
        }
        Ok(())
    }
}

/// Immutable lookup table, built once at start-up and only read afterwards
#[derive(Debug, Clone)]
pub struct LanguageTable {
    profiles: HashMap<String, LanguageProfile>,
}

impl LanguageTable {
    /// The languages supported out of the box
    pub fn builtin() -> Self {
        Self {
            profiles: builtin::profiles(),
        }
    }

    /// Build a table from configured profiles, rejecting incomplete entries
    pub fn from_profiles(profiles: BTreeMap<String, LanguageProfile>) -> Result<Self, Error> {
        if profiles.is_empty() {
            return Err(Error::Config("language table is empty".to_string()));
        }
        for (name, profile) in &profiles {
            profile.validate(name)?;
        }
        Ok(Self {
            profiles: profiles.into_iter().collect(),
        })
    }

    /// Resolve a language name. Matching is exact and case-sensitive.
    pub fn resolve(&self, language: &str) -> Result<&LanguageProfile, Error> {
        self.profiles
            .get(language)
            .ok_or_else(|| Error::UnknownLanguage(language.to_string()))
    }

    /// Supported language names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.profiles.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

impl Default for LanguageTable {
    fn default() -> Self {
        Self::builtin()
    }
}
