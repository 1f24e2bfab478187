//! Result queue and its drain into the cache

use chrono::{DateTime, Utc};
use pyhint_cache::{CacheEntry, CacheKey, CacheStore, ResultRecord};
use tokio::{
    sync::{
        mpsc::{error::TryRecvError, UnboundedReceiver},
        Mutex,
    },
    time::{self, Instant},
};
use tracing::debug;

/// Consumer side of the queue workers push finished results onto
///
/// Records are only committed while the receiver lock is held, so a task that
/// takes the lock sees every result received before it.
#[derive(Debug)]
pub struct ResultQueue {
    receiver: Mutex<UnboundedReceiver<ResultRecord>>,
}

impl ResultQueue {
    pub(crate) fn new(receiver: UnboundedReceiver<ResultRecord>) -> Self {
        Self {
            receiver: Mutex::new(receiver),
        }
    }

    /// Move every result that is ready right now into `store`.
    ///
    /// Never waits. Superseded results are discarded by the store's
    /// last-writer-wins rule. Returns the number of records received. If
    /// another task is already draining, this returns 0 immediately.
    pub fn drain_into(&self, store: &CacheStore) -> usize {
        let Ok(mut receiver) = self.receiver.try_lock() else {
            return 0;
        };
        drain_locked(&mut receiver, store)
    }

    /// Wait until `store` holds an entry for `key` computed at or after
    /// `since`, committing every result that arrives meanwhile.
    ///
    /// Returns `None` on timeout or when every worker is gone. Giving up does
    /// not cancel the job: its result is picked up by a later drain.
    pub async fn wait_for(
        &self,
        store: &CacheStore,
        key: &CacheKey,
        since: DateTime<Utc>,
        deadline: Instant,
    ) -> Option<CacheEntry> {
        let fresh = || store.peek(key).filter(|entry| entry.time >= since);

        let waited = time::timeout_at(deadline, async {
            loop {
                let mut receiver = self.receiver.lock().await;
                // another waiter may have committed this key while we queued
                drain_locked(&mut receiver, store);
                if let Some(entry) = fresh() {
                    return Some(entry);
                }

                let record = receiver.recv().await?;
                commit(store, record);
                if let Some(entry) = fresh() {
                    return Some(entry);
                }
            }
        })
        .await;

        match waited {
            Ok(Some(entry)) => Some(entry),
            Ok(None) => {
                debug!(%key, "result queue closed");
                None
            }
            Err(_) => None,
        }
    }
}

fn drain_locked(receiver: &mut UnboundedReceiver<ResultRecord>, store: &CacheStore) -> usize {
    let mut received = 0;
    loop {
        match receiver.try_recv() {
            Ok(record) => {
                received += 1;
                commit(store, record);
            }
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
        }
    }
    if received > 0 {
        debug!(received, "drained result queue");
    }
    received
}

fn commit(store: &CacheStore, record: ResultRecord) {
    let key = record.key.clone();
    if !store.store(record) {
        debug!(%key, "discarding superseded result");
    }
}
