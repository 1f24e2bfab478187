//! Error types for the completion source

use thiserror::Error;

/// Errors raised while configuring the completion source
///
/// Completion requests themselves never fail; they degrade to stale or
/// empty results.
#[derive(Error, Debug)]
pub enum CompletionError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

pub type CompletionResult<T> = Result<T, CompletionError>;
