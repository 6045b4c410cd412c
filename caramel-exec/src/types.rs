use serde::{Deserialize, Serialize};
use std::fmt;

/// Code execution request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionRequest {
    /// Logical language name, e.g. `Python3` or `Gcc`
    pub language: String,
    /// Source code to execute
    pub code: String,
    /// Data fed to the program on stdin
    #[serde(default)]
    pub input: String,
}

impl ExecutionRequest {
    pub fn new(
        language: impl Into<String>,
        code: impl Into<String>,
        input: impl Into<String>,
    ) -> Self {
        Self {
            language: language.into(),
            code: code.into(),
            input: input.into(),
        }
    }
}

/// Terminal status reported to the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExecutionStatus {
    Active,
    Timeout,
    Error,
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExecutionStatus::Active => "Active",
            ExecutionStatus::Timeout => "Timeout",
            ExecutionStatus::Error => "Error",
        };
        f.write_str(s)
    }
}

/// Execution result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub status: ExecutionStatus,
    /// Combined program output, or the failure message for `Error`
    pub output: String,
}

impl ExecutionResult {
    pub fn active(output: impl Into<String>) -> Self {
        Self {
            status: ExecutionStatus::Active,
            output: output.into(),
        }
    }

    pub fn timeout() -> Self {
        Self {
            status: ExecutionStatus::Timeout,
            output: String::new(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ExecutionStatus::Error,
            output: message.into(),
        }
    }
}

/// How a supervised execution unit finished
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// The program exited on its own before the deadline
    Completed { exit_code: i64, output: String },
    /// The deadline elapsed first and the unit was stopped
    TimedOut,
}
