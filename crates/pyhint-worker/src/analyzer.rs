//! The analyzer contract workers call into

use std::path::PathBuf;

use pyhint_cache::{Candidate, CacheKey, ModuleMtimes};

use crate::queue::WorkItem;

/// Everything the analyzer needs to compute one completion set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    /// Scope being computed; the boilerplate sentinel asks for the global set
    pub key: CacheKey,
    pub source: String,
    /// 1-based line of the cursor
    pub line: usize,
    /// 0-based column where the completed word starts
    pub column: usize,
    /// Path of the buffer, empty for context-free jobs
    pub buffer_id: String,
    /// Extra module files the key depends on
    pub extra_modules: Vec<PathBuf>,
}

impl From<WorkItem> for AnalysisRequest {
    fn from(item: WorkItem) -> Self {
        Self {
            key: item.key,
            source: item.source,
            line: item.line,
            column: item.column,
            buffer_id: item.buffer_id,
            extra_modules: item.extra_modules,
        }
    }
}

/// Analyzer output
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Analysis {
    /// `None` when the analyzer could not produce a set at all
    pub candidates: Option<Vec<Candidate>>,
    /// Files the result depends on and their mtimes
    pub modules: ModuleMtimes,
}

impl Analysis {
    pub fn new(candidates: Vec<Candidate>) -> Self {
        Self {
            candidates: Some(candidates),
            modules: ModuleMtimes::new(),
        }
    }

    pub fn with_modules(mut self, modules: ModuleMtimes) -> Self {
        self.modules = modules;
        self
    }
}

/// Source code analyzer
///
/// Implementations are blocking and may be slow; workers always call them off
/// the async executor. Errors and panics are contained per job.
pub trait Analyzer: Send + Sync + 'static {
    fn analyze(&self, request: &AnalysisRequest) -> anyhow::Result<Analysis>;
}

impl<F> Analyzer for F
where
    F: Fn(&AnalysisRequest) -> anyhow::Result<Analysis> + Send + Sync + 'static,
{
    fn analyze(&self, request: &AnalysisRequest) -> anyhow::Result<Analysis> {
        self(request)
    }
}
