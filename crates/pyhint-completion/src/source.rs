//! The completion source: cache lookup, background refresh and bounded waiting

use std::{
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, OnceLock,
    },
    time::Instant,
};

use chrono::Utc;
use pyhint_cache::{
    CacheEntry, CacheKey, CacheStats, CacheStore, Candidate, FileChangeStrategy, KeyTag, Validity,
};
use pyhint_worker::{channels, Analyzer, ResultQueue, WorkItem, WorkQueue, WorkerPool};
use tokio::time;
use tracing::{debug, debug_span, info, warn, Instrument};

use crate::{
    boilerplate::mix_boilerplate,
    config::{CompletionSettings, ConfigLoader},
    context::CacheKeyBuilder,
    error::CompletionResult,
    trigger::{complete_position, import_filter, is_trigger_input},
};

/// Buffer contents supplied by the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferSnapshot {
    pub path: PathBuf,
    pub lines: Vec<String>,
}

impl BufferSnapshot {
    pub fn new(path: impl Into<PathBuf>, lines: Vec<String>) -> Self {
        Self {
            path: path.into(),
            lines,
        }
    }

    /// Split `text` into lines
    pub fn from_text(path: impl Into<PathBuf>, text: &str) -> Self {
        Self::new(path, text.lines().map(str::to_string).collect())
    }

    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

/// One completion request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    pub buffer: BufferSnapshot,
    /// 1-based cursor line
    pub line: usize,
    /// Text of the cursor line up to the cursor
    pub input: String,
}

impl CompletionRequest {
    pub fn new(buffer: BufferSnapshot, line: usize, input: impl Into<String>) -> Self {
        Self {
            buffer,
            line,
            input: input.into(),
        }
    }

    /// Column where the completed word starts
    pub fn column(&self) -> usize {
        complete_position(&self.input)
    }
}

/// Cached, asynchronously refreshed completion source
///
/// Every request drains finished background results into the cache, serves
/// what is cached and, when the entry is missing or stale, schedules a
/// recomputation. Only a request with nothing cached waits, and never longer
/// than the configured timeout.
pub struct CompletionSource {
    settings: CompletionSettings,
    analyzer: Arc<dyn Analyzer>,
    store: Arc<CacheStore>,
    keys: CacheKeyBuilder,
    strategy: FileChangeStrategy,
    jobs: WorkQueue,
    pool: WorkerPool,
    results: ResultQueue,
    boilerplate: OnceLock<Arc<Vec<Candidate>>>,
    boilerplate_pending: AtomicBool,
}

impl CompletionSource {
    /// Create a source; workers and the reaper start on the first request.
    pub fn new(
        settings: CompletionSettings,
        analyzer: Arc<dyn Analyzer>,
    ) -> CompletionResult<Self> {
        ConfigLoader::validate(&settings)?;

        let store = Arc::new(CacheStore::with_config(settings.cache_config()));
        let (jobs, pool, results) = channels(settings.work_queue_capacity);
        let keys = CacheKeyBuilder::new(settings.python_path.clone());

        Ok(Self {
            settings,
            analyzer,
            store,
            keys,
            strategy: FileChangeStrategy::new(),
            jobs,
            pool,
            results,
            boilerplate: OnceLock::new(),
            boilerplate_pending: AtomicBool::new(false),
        })
    }

    pub fn settings(&self) -> &CompletionSettings {
        &self.settings
    }

    pub fn store(&self) -> &Arc<CacheStore> {
        &self.store
    }

    pub fn stats(&self) -> CacheStats {
        self.store.stats()
    }

    /// Whether `input` warrants a completion request
    pub fn should_complete(&self, input: &str) -> bool {
        is_trigger_input(input, self.settings.min_length)
    }

    /// Start the reaper and the workers. Only the first call does anything.
    pub fn bootstrap(&self) -> bool {
        if self.pool.is_started() {
            return false;
        }

        self.store.start_reaper();
        match self.pool.start(
            self.settings.worker_count(),
            Arc::clone(&self.analyzer),
            self.settings.worker_options(),
        ) {
            Ok(started) => {
                if started {
                    info!(workers = self.settings.worker_count(), "completion source started");
                }
                started
            }
            Err(e) => {
                warn!(error = %e, "failed to start analysis workers");
                false
            }
        }
    }

    /// Candidates for `request`; empty when nothing is available in time.
    pub async fn gather_candidates(&self, request: &CompletionRequest) -> Vec<Candidate> {
        let span = debug_span!(
            "gather_candidates",
            buffer = %request.buffer.path.display(),
            line = request.line,
        );
        let started = Instant::now();
        let candidates = self.gather(request).instrument(span).await;
        debug!(
            count = candidates.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "gathered candidates"
        );
        candidates
    }

    async fn gather(&self, request: &CompletionRequest) -> Vec<Candidate> {
        self.bootstrap();
        self.request_boilerplate();
        self.results.drain_into(&self.store);

        let Some((key, extra_modules)) = self.keys.build(
            &request.buffer.path,
            request.line,
            &request.input,
            &request.buffer.lines,
        ) else {
            debug!(input = %request.input, "nothing to complete");
            return Vec::new();
        };

        let mut cached = self.store.retrieve(&key);
        let mut refresh = match &cached {
            Some(entry) => match self.strategy.check(&entry.modules, &extra_modules) {
                Validity::Fresh => false,
                stale => {
                    debug!(%key, ?stale, "cached entry is stale");
                    true
                }
            },
            None => true,
        };
        // scoped vars and imports are cheap and volatile, and an unscoped
        // entry without module files has nothing to be validated against
        let unscoped = cached
            .as_ref()
            .is_some_and(|entry| key.is_minimal() && entry.modules.is_empty());
        if key.tag().always_refresh() || unscoped {
            refresh = true;
        }

        let wait = cached.is_none();
        debug!(%key, refresh, wait, "cache lookup");

        if refresh {
            let dispatched_at = Utc::now();
            let job = WorkItem::new(
                key.clone(),
                extra_modules,
                request.buffer.text(),
                request.line,
                request.column(),
                request.buffer.path.to_string_lossy(),
            );
            if let Err(e) = self.jobs.enqueue(job) {
                debug!(%key, error = %e, "refresh not scheduled");
            }

            if wait {
                cached = self.wait_for_result(&key, dispatched_at).await;
            }
        }

        let Some(entry) = cached else {
            return Vec::new();
        };
        self.store.touch(&key);
        self.present(&key, entry, &request.input)
    }

    /// Wait for a result for `key` computed after `dispatched_at`.
    ///
    /// On timeout whatever is stored for the key is returned. The job itself
    /// keeps running and lands in the cache for later requests.
    async fn wait_for_result(
        &self,
        key: &CacheKey,
        dispatched_at: chrono::DateTime<Utc>,
    ) -> Option<CacheEntry> {
        let deadline = time::Instant::now() + self.settings.wait_timeout();
        match self.results.wait_for(&self.store, key, dispatched_at, deadline).await {
            Some(entry) => Some(entry),
            None => {
                debug!(%key, "gave up waiting for result");
                self.store.peek(key)
            }
        }
    }

    fn present(&self, key: &CacheKey, entry: CacheEntry, input: &str) -> Vec<Candidate> {
        let boilerplate = self.boilerplate().unwrap_or_default();

        let Some(completions) = entry.completions else {
            return mix_boilerplate(&boilerplate, &[]);
        };

        let out = if key.tag() == KeyTag::Vars {
            mix_boilerplate(&boilerplate, &completions)
        } else {
            completions.to_vec()
        };

        match import_filter(input) {
            Some(category) => out
                .into_iter()
                .filter(|c| c.category == category)
                .collect(),
            None => out,
        }
    }

    /// Schedule the boilerplate computation if it is neither held nor cached
    fn request_boilerplate(&self) {
        if self.boilerplate().is_some() {
            return;
        }
        if self.store.contains(&CacheKey::boilerplate()) {
            self.boilerplate_pending.store(false, Ordering::Release);
            return;
        }
        if self.boilerplate_pending.swap(true, Ordering::AcqRel) {
            return;
        }

        debug!("requesting boilerplate completions");
        if self.jobs.enqueue(WorkItem::boilerplate()).is_err() {
            self.boilerplate_pending.store(false, Ordering::Release);
        }
    }

    /// The boilerplate set, picked up from the cache the first time it is seen
    fn boilerplate(&self) -> Option<Arc<Vec<Candidate>>> {
        if let Some(held) = self.boilerplate.get() {
            return Some(Arc::clone(held));
        }
        let completions = self.store.peek(&CacheKey::boilerplate())?.completions?;
        Some(Arc::clone(self.boilerplate.get_or_init(|| completions)))
    }
}

#[cfg(test)]
mod tests {
    use pyhint_cache::{CandidateCategory, ModuleMtimes, ResultRecord};
    use pyhint_worker::{Analysis, AnalysisRequest};

    use super::*;

    fn empty_analyzer() -> Arc<dyn Analyzer> {
        Arc::new(|_: &AnalysisRequest| -> anyhow::Result<Analysis> { Ok(Analysis::default()) })
    }

    fn source() -> CompletionSource {
        let settings = CompletionSettings {
            wait_timeout_ms: 100,
            ..Default::default()
        };
        CompletionSource::new(settings, empty_analyzer()).unwrap()
    }

    #[test]
    fn test_invalid_settings_are_rejected() {
        let settings = CompletionSettings {
            work_queue_capacity: 0,
            ..Default::default()
        };
        assert!(CompletionSource::new(settings, empty_analyzer()).is_err());
    }

    #[test]
    fn test_request_column() {
        let buffer = BufferSnapshot::from_text("a.py", "os.pa");
        let request = CompletionRequest::new(buffer, 1, "os.pa");
        assert_eq!(request.column(), 3);
        assert_eq!(request.buffer.text(), "os.pa");
    }

    #[test]
    fn test_should_complete_uses_min_length() {
        let source = source();
        assert!(source.should_complete("os."));
        assert!(source.should_complete("ab"));
        assert!(!source.should_complete("a"));
    }

    #[tokio::test]
    async fn test_bootstrap_is_idempotent() {
        let source = source();
        assert!(source.bootstrap());
        assert!(!source.bootstrap());
        assert!(source.store().reaper_started());
    }

    #[tokio::test]
    async fn test_nothing_to_complete_returns_empty() {
        let source = source();
        let request = CompletionRequest::new(BufferSnapshot::from_text("a.py", "1."), 1, "1.");
        assert!(source.gather_candidates(&request).await.is_empty());
    }

    #[tokio::test]
    async fn test_boilerplate_seen_in_store_is_held() {
        let source = source();
        assert!(source.boilerplate().is_none());

        source.store().store(ResultRecord::new(
            CacheKey::boilerplate(),
            Some(vec![Candidate::new("abs", CandidateCategory::Function)]),
            ModuleMtimes::new(),
        ));
        let held = source.boilerplate().unwrap();
        assert_eq!(held[0].word, "abs");

        source.store().clear();
        assert!(source.boilerplate().is_some());
    }

    #[tokio::test]
    async fn test_boilerplate_requested_once() {
        let source = source();
        source.request_boilerplate();
        source.request_boilerplate();

        // no workers are running, so anything enqueued is still queued
        assert_eq!(source.jobs.remaining_capacity(), source.settings.work_queue_capacity - 1);
    }
}
