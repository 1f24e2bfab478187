//! # pyhint Worker
//!
//! Background side of the completion pipeline: a bounded job queue, a pool of
//! long-lived workers running the [`Analyzer`] off the async executor, and the
//! result queue whose contents are drained into a
//! [`CacheStore`](pyhint_cache::CacheStore).
//!
//! ```text
//! WorkQueue --> WorkerPool (N workers) --> ResultQueue --> CacheStore
//! ```
//!
//! Analyzer errors and panics never stop a worker; they turn into a
//! [`ResultRecord`](pyhint_cache::ResultRecord) with no completions.

pub mod analyzer;
pub mod display;
pub mod error;
pub mod pool;
pub mod queue;
pub mod results;

pub use analyzer::{Analysis, AnalysisRequest, Analyzer};
pub use display::DisplayOptions;
pub use error::{Result, WorkerError};
pub use pool::{WorkerOptions, WorkerPool};
pub use queue::{channels, WorkItem, WorkQueue};
pub use results::ResultQueue;
