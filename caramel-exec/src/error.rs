use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Language not supported: {0}")]
    UnknownLanguage(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Workspace error: {0}")]
    Workspace(String),

    #[error("Failed to provision execution unit: {0}")]
    Provision(String),

    #[error("Execution unit error: {0}")]
    Runtime(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the request was rejected before any resource was created.
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::UnknownLanguage(_) | Error::InvalidRequest(_))
    }
}
