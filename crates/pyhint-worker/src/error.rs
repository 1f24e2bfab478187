//! Worker and queue error types

use thiserror::Error;

/// Errors raised when handing work to the pool
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkerError {
    #[error("Work queue is full, dropping job for {key}")]
    QueueFull { key: String },

    #[error("Work queue is closed")]
    QueueClosed,

    #[error("No tokio runtime available to start workers")]
    NoRuntime,
}

pub type Result<T> = std::result::Result<T, WorkerError>;
