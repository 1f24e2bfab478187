//! # pyhint Cache
//!
//! Completion result cache backing the pyhint completion source.
//!
//! ## Features
//!
//! - **Scope keys**: [`CacheKey`] identifies a completion scope, with a closed [`KeyTag`]
//!   for the category sentinels
//! - **Last-writer-wins**: [`CacheStore::store`] keeps the result with the newest timestamp,
//!   regardless of the order results arrive in
//! - **File change detection**: entries record dependency mtimes, checked by
//!   [`FileChangeStrategy`]
//! - **Idle reaping**: a background reaper evicts entries nobody has touched recently
//! - **Persistence**: module-scoped entries can be spilled to disk and restored on startup
//! - **Metrics**: hit, miss and eviction counters

pub mod cache;
pub mod error;
pub mod key;
pub mod metrics;
pub mod storage;
pub mod strategy;
pub mod types;

pub use cache::{CacheConfig, CacheStore};
pub use error::CacheError;
pub use key::{CacheKey, KeyTag};
pub use metrics::{CacheMetrics, CacheStats};
pub use storage::{CacheEntry, DiskStorage, PersistedEntry};
pub use strategy::{mtime_secs, FileChangeStrategy, ModuleMtimes, Validity};
pub use types::{Candidate, CandidateCategory, CandidateDisplay, ResultRecord};

/// Re-export commonly used types
pub type Result<T> = std::result::Result<T, CacheError>;
