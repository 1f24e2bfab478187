//! # pyhint Completion
//!
//! Python completion source with an asynchronous, cached analysis pipeline.
//!
//! A [`CompletionSource`] turns each request into a [`CacheKey`](pyhint_cache::CacheKey)
//! with [`CacheKeyBuilder`], serves the cached candidates for that key and
//! schedules a background refresh when the entry is missing or its module files
//! changed. Only a request with nothing cached waits for the analyzer, bounded
//! by `wait_timeout_ms`.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use pyhint_completion::{
//!     BufferSnapshot, CompletionRequest, CompletionSettings, CompletionSource,
//! };
//!
//! let source = CompletionSource::new(CompletionSettings::default(), Arc::new(my_analyzer))?;
//! let buffer = BufferSnapshot::from_text("main.py", "import os\nos.pa");
//! let request = CompletionRequest::new(buffer, 2, "os.pa");
//! let candidates = source.gather_candidates(&request).await;
//! ```

pub mod boilerplate;
pub mod config;
pub mod context;
pub mod error;
pub mod logging;
pub mod source;
pub mod trigger;

pub use boilerplate::mix_boilerplate;
pub use config::{CacheSettings, CompletionSettings, ConfigFormat, ConfigLoader};
pub use context::{CacheKeyBuilder, ModuleResolver};
pub use error::{CompletionError, CompletionResult};
pub use logging::init_logging;
pub use source::{BufferSnapshot, CompletionRequest, CompletionSource};
pub use trigger::{complete_position, import_filter, is_trigger_input};
