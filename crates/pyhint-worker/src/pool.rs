//! Long-lived analysis workers

use std::{
    sync::{Arc, OnceLock},
    time::Instant,
};

use pyhint_cache::{mtime_secs, ModuleMtimes, ResultRecord};
use tokio::{
    runtime::Handle,
    sync::{
        mpsc::{Receiver, UnboundedSender},
        Mutex,
    },
    task,
};
use tracing::{debug, error, info, warn};

use crate::{
    analyzer::{AnalysisRequest, Analyzer},
    display::DisplayOptions,
    error::{Result, WorkerError},
    queue::WorkItem,
};

/// Settings every worker runs with
#[derive(Debug, Clone, Default)]
pub struct WorkerOptions {
    pub display: DisplayOptions,
    /// Log every processed job
    pub debug: bool,
}

/// Pool of workers consuming the job queue
///
/// Workers share one receiver, so each job is processed by exactly one of
/// them. There is no ordering between workers.
#[derive(Debug)]
pub struct WorkerPool {
    jobs: Arc<Mutex<Receiver<WorkItem>>>,
    results: UnboundedSender<ResultRecord>,
    started: OnceLock<usize>,
}

impl WorkerPool {
    pub(crate) fn new(
        jobs: Arc<Mutex<Receiver<WorkItem>>>,
        results: UnboundedSender<ResultRecord>,
    ) -> Self {
        Self {
            jobs,
            results,
            started: OnceLock::new(),
        }
    }

    /// Spawn `count` workers (at least one) on the current runtime.
    ///
    /// Only the first call starts anything; later calls return `Ok(false)`.
    pub fn start(
        &self,
        count: usize,
        analyzer: Arc<dyn Analyzer>,
        options: WorkerOptions,
    ) -> Result<bool> {
        if self.started.get().is_some() {
            return Ok(false);
        }
        let handle = Handle::try_current().map_err(|_| WorkerError::NoRuntime)?;

        let count = count.max(1);
        let mut spawned = false;
        self.started.get_or_init(|| {
            for id in 0..count {
                handle.spawn(run_worker(
                    id,
                    Arc::clone(&self.jobs),
                    self.result_sender(),
                    Arc::clone(&analyzer),
                    options.clone(),
                ));
            }
            spawned = true;
            count
        });

        if spawned {
            info!(workers = count, "analysis workers started");
        }
        Ok(spawned)
    }

    pub fn is_started(&self) -> bool {
        self.started.get().is_some()
    }

    /// Number of running workers, 0 before [`WorkerPool::start`]
    pub fn worker_count(&self) -> usize {
        self.started.get().copied().unwrap_or(0)
    }

    pub(crate) fn result_sender(&self) -> UnboundedSender<ResultRecord> {
        self.results.clone()
    }
}

async fn run_worker(
    id: usize,
    jobs: Arc<Mutex<Receiver<WorkItem>>>,
    results: UnboundedSender<ResultRecord>,
    analyzer: Arc<dyn Analyzer>,
    options: WorkerOptions,
) {
    debug!(worker = id, "worker waiting for jobs");
    loop {
        let item = {
            let mut jobs = jobs.lock().await;
            jobs.recv().await
        };
        let Some(item) = item else {
            debug!(worker = id, "work queue closed, stopping worker");
            break;
        };

        let record = process(id, &analyzer, &options, item).await;
        if results.send(record).is_err() {
            debug!(worker = id, "result queue closed, stopping worker");
            break;
        }
    }
}

async fn process(
    id: usize,
    analyzer: &Arc<dyn Analyzer>,
    options: &WorkerOptions,
    item: WorkItem,
) -> ResultRecord {
    let started = Instant::now();
    let key = item.key.clone();
    let extra_modules = item.extra_modules.clone();
    let request = AnalysisRequest::from(item);

    let analyzer = Arc::clone(analyzer);
    let outcome = task::spawn_blocking(move || analyzer.analyze(&request)).await;

    let (completions, mut modules) = match outcome {
        Ok(Ok(analysis)) => (
            analysis.candidates.map(|candidates| options.display.format_all(candidates)),
            analysis.modules,
        ),
        Ok(Err(e)) => {
            warn!(worker = id, %key, error = %e, "analysis failed");
            (None, ModuleMtimes::new())
        }
        Err(e) => {
            error!(worker = id, %key, error = %e, "analyzer panicked");
            (None, ModuleMtimes::new())
        }
    };

    if completions.is_some() {
        for path in extra_modules {
            if modules.contains_key(&path) {
                continue;
            }
            if let Some(mtime) = mtime_secs(&path) {
                modules.insert(path, mtime);
            }
        }
    }

    if options.debug {
        debug!(
            worker = id,
            %key,
            candidates = completions.as_ref().map_or(0, Vec::len),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "processed job"
        );
    }
    ResultRecord::new(key, completions, modules)
}
