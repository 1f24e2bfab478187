//! Cache-related error types

use thiserror::Error;

/// Cache operation errors
///
/// Only persistence can fail; a lookup miss is a normal `None`.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Entry for {key} has no completions to persist")]
    NothingToPersist { key: String },
}

/// Re-export commonly used Result type
pub type Result<T> = std::result::Result<T, CacheError>;
