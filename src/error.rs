use std::time::Duration;

use thiserror::Error;

/// Failure reported by an analysis client while browsing a module.
///
/// Cloneable so one settled refresh outcome can be handed to every caller
/// waiting on it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnalysisError {
    #[error("Browsing {module} timed out after {after:?}")]
    Timeout { module: String, after: Duration },

    #[error("Analysis process exited: {0}")]
    ProcessExited(String),

    #[error("Malformed analysis output: {0}")]
    MalformedOutput(String),

    #[error("Module not found: {0}")]
    ModuleNotFound(String),

    #[error("Analysis client unavailable: {0}")]
    Unavailable(String),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Analysis error: {0}")]
    Analysis(#[from] AnalysisError),

    #[error("Invalid import: {0}")]
    InvalidImport(String),
}

pub type Result<T> = std::result::Result<T, Error>;
