//! Work items and the bounded job queue feeding the workers

use std::{path::PathBuf, sync::Arc};

use pyhint_cache::CacheKey;
use serde::{Deserialize, Serialize};
use tokio::sync::{
    mpsc::{self, error::TrySendError},
    Mutex,
};
use tracing::{debug, warn};

use crate::{
    error::{Result, WorkerError},
    pool::WorkerPool,
    results::ResultQueue,
};

/// One self-contained analysis job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    pub key: CacheKey,
    /// Files the key depends on beyond what the analyzer reports
    pub extra_modules: Vec<PathBuf>,
    /// Full buffer text
    pub source: String,
    /// 1-based cursor line
    pub line: usize,
    /// 0-based column where the completed word starts
    pub column: usize,
    /// Buffer path
    pub buffer_id: String,
}

impl WorkItem {
    pub fn new(
        key: CacheKey,
        extra_modules: Vec<PathBuf>,
        source: impl Into<String>,
        line: usize,
        column: usize,
        buffer_id: impl Into<String>,
    ) -> Self {
        Self {
            key,
            extra_modules,
            source: source.into(),
            line,
            column,
            buffer_id: buffer_id.into(),
        }
    }

    /// Context-free job computing the global boilerplate set
    pub fn boilerplate() -> Self {
        Self::new(CacheKey::boilerplate(), Vec::new(), "", 1, 0, "")
    }
}

/// Producer side of the job queue
///
/// Enqueueing never waits: a full queue drops the job.
#[derive(Debug, Clone)]
pub struct WorkQueue {
    sender: mpsc::Sender<WorkItem>,
}

impl WorkQueue {
    pub fn enqueue(&self, item: WorkItem) -> Result<()> {
        match self.sender.try_send(item) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(item)) => {
                warn!(key = %item.key, "work queue full, dropping job");
                Err(WorkerError::QueueFull {
                    key: item.key.to_string(),
                })
            }
            Err(TrySendError::Closed(_)) => Err(WorkerError::QueueClosed),
        }
    }

    /// Jobs that can still be queued before the queue is full
    pub fn remaining_capacity(&self) -> usize {
        self.sender.capacity()
    }
}

/// Build the connected job queue, worker pool and result queue
///
/// `capacity` bounds the number of pending jobs and must be non-zero.
pub fn channels(capacity: usize) -> (WorkQueue, WorkerPool, ResultQueue) {
    let (job_tx, job_rx) = mpsc::channel(capacity.max(1));
    let (result_tx, result_rx) = mpsc::unbounded_channel();
    debug!(capacity, "created work and result queues");

    (
        WorkQueue { sender: job_tx },
        WorkerPool::new(Arc::new(Mutex::new(job_rx)), result_tx),
        ResultQueue::new(result_rx),
    )
}
