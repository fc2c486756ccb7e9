use std::sync::Arc;

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum BrewtapError {
    #[error("I/O Error: {0}")]
    Io(#[from] Arc<std::io::Error>),

    #[error("HTTP Request Error: {0}")]
    Http(#[from] Arc<reqwest::Error>),

    #[error("JSON Parsing Error: {0}")]
    Json(#[from] Arc<serde_json::Error>),

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("Unresolved version: {0}")]
    UnresolvedVersion(String),

    #[error("FetchError: Failed to fetch '{0}' from '{1}': {2}")]
    FetchError(String, String, String),

    #[error("IntegrityError: {0}")]
    IntegrityError(String),

    #[error("DependencyResolutionError: {0}")]
    DependencyResolutionError(String),

    #[error("BuildError: '{command}' failed ({status}):\n{output}")]
    BuildError {
        command: String,
        status: String,
        output: String,
    },

    #[error("TestAssertionError: expected output to contain '{expected}', got:\n{output}")]
    TestAssertionError { expected: String, output: String },

    #[error("Validation Error: {0}")]
    ValidationError(String),

    #[error("Parsing Error in {0}: {1}")]
    ParseError(&'static str, String),

    #[error("Resource Not Found: {0}")]
    NotFound(String),

    #[error("Installation Error: {0}")]
    InstallError(String),

    #[error("Failed to execute command: {0}")]
    CommandExecError(String),

    #[error("Generic Error: {0}")]
    Generic(String),
}

impl BrewtapError {
    /// Builds a `BuildError` for a command that ran but did not produce what was asked of it.
    pub fn build(command: impl Into<String>, status: impl Into<String>, output: impl Into<String>) -> Self {
        BrewtapError::BuildError {
            command: command.into(),
            status: status.into(),
            output: output.into(),
        }
    }
}

impl From<std::io::Error> for BrewtapError {
    fn from(err: std::io::Error) -> Self {
        BrewtapError::Io(Arc::new(err))
    }
}

impl From<reqwest::Error> for BrewtapError {
    fn from(err: reqwest::Error) -> Self {
        BrewtapError::Http(Arc::new(err))
    }
}

impl From<serde_json::Error> for BrewtapError {
    fn from(err: serde_json::Error) -> Self {
        BrewtapError::Json(Arc::new(err))
    }
}

impl From<toml::de::Error> for BrewtapError {
    fn from(err: toml::de::Error) -> Self {
        BrewtapError::ParseError("TOML", err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, BrewtapError>;
