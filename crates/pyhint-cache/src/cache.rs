//! Concurrent completion cache with last-writer-wins stores and an idle reaper

use std::{
    path::PathBuf,
    sync::{Arc, OnceLock, Weak},
    time::Duration,
};

use chrono::{DateTime, Utc};
use dashmap::{mapref::entry::Entry, DashMap};
use serde::{Deserialize, Serialize};
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::{
    error::Result,
    key::CacheKey,
    metrics::{CacheMetrics, CacheStats},
    storage::{CacheEntry, DiskStorage},
    types::ResultRecord,
};

/// Cache configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// How often the reaper scans the store
    pub reap_interval: Duration,
    /// Entries not served for this long are evicted
    pub idle_timeout: Duration,
    /// Directory for module-scoped entries that outlive the process
    pub persist_dir: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            reap_interval: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(300),
            persist_dir: None,
        }
    }
}

/// Completion cache shared by the orchestrator, the result drain and the reaper
///
/// Every mutation goes through a single shard lock of the underlying map, so a
/// reader never observes a half-written entry and the reaper cannot evict an
/// entry in the middle of a touch.
#[derive(Debug)]
pub struct CacheStore {
    entries: DashMap<CacheKey, CacheEntry>,
    config: CacheConfig,
    metrics: CacheMetrics,
    disk: Option<DiskStorage>,
    reaper: OnceLock<()>,
}

impl CacheStore {
    pub fn new() -> Self {
        Self::with_config(CacheConfig::default())
    }

    pub fn with_config(config: CacheConfig) -> Self {
        let disk = config.persist_dir.as_ref().map(DiskStorage::new);
        Self {
            entries: DashMap::new(),
            config,
            metrics: CacheMetrics::new(),
            disk,
            reaper: OnceLock::new(),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Look up an entry. A miss is `None`, never an error.
    pub fn retrieve(&self, key: &CacheKey) -> Option<CacheEntry> {
        match self.entries.get(key) {
            Some(entry) => {
                self.metrics.record_hit();
                debug!(%key, "cache hit");
                Some(entry.clone())
            }
            None => {
                self.metrics.record_miss();
                debug!(%key, "cache miss");
                None
            }
        }
    }

    /// Look up an entry without counting a hit or miss
    pub fn peek(&self, key: &CacheKey) -> Option<CacheEntry> {
        self.entries.get(key).map(|entry| entry.clone())
    }

    /// Insert a result unless a newer one is already stored.
    ///
    /// Returns `true` when the record was accepted. Ties go to the incoming
    /// record, so re-storing the same timestamp replaces the entry.
    pub fn store(&self, record: ResultRecord) -> bool {
        let (key, incoming) = CacheEntry::from_record(record);
        match self.entries.entry(key) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().time <= incoming.time {
                    occupied.insert(incoming);
                } else {
                    debug!(
                        key = %occupied.key(),
                        stored = %occupied.get().time,
                        incoming = %incoming.time,
                        "rejecting superseded result"
                    );
                    self.metrics.record_rejected_store();
                    return false;
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(incoming);
            }
        }
        self.metrics.record_store();
        true
    }

    /// Mark an entry as just served. Returns `false` if it is gone.
    pub fn touch(&self, key: &CacheKey) -> bool {
        match self.entries.get_mut(key) {
            Some(mut entry) => {
                entry.last_touched = Utc::now();
                true
            }
            None => false,
        }
    }

    pub fn remove(&self, key: &CacheKey) -> Option<CacheEntry> {
        self.entries.remove(key).map(|(_, entry)| entry)
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn stats(&self) -> CacheStats {
        self.metrics.snapshot(self.entries.len())
    }

    /// Evict every entry idle at `now`, returning what was removed
    pub fn reap_idle(&self, now: DateTime<Utc>) -> Vec<(CacheKey, CacheEntry)> {
        let idle = self.config.idle_timeout;
        let mut evicted = Vec::new();
        self.entries.retain(|key, entry| {
            if entry.is_idle(now, idle) {
                evicted.push((key.clone(), entry.clone()));
                false
            } else {
                true
            }
        });

        if !evicted.is_empty() {
            self.metrics.record_evictions(evicted.len());
            debug!(count = evicted.len(), "reaped idle entries");
        }
        evicted
    }

    /// Load persisted entries into the store.
    ///
    /// Loaded records go through [`CacheStore::store`], so anything already
    /// computed in this session wins. Returns the number accepted.
    pub async fn restore(&self) -> Result<usize> {
        let Some(disk) = &self.disk else {
            return Ok(0);
        };

        let mut restored = 0;
        for persisted in disk.load_all().await? {
            if self.store(persisted.into_record()) {
                restored += 1;
            }
        }
        info!(restored, path = %disk.base_path().display(), "restored persisted completions");
        Ok(restored)
    }

    async fn persist_evicted(&self, evicted: Vec<(CacheKey, CacheEntry)>) {
        let Some(disk) = &self.disk else {
            return;
        };

        for (key, entry) in &evicted {
            if !entry.is_persistable(key) {
                continue;
            }
            if let Err(e) = disk.save(key, entry).await {
                warn!(%key, error = %e, "failed to persist evicted entry");
            }
        }
    }

    /// Start the background reaper. Returns `false` if it was already started
    /// or there is no tokio runtime to run it on.
    ///
    /// The reaper holds a weak reference and stops once the store is dropped.
    pub fn start_reaper(self: &Arc<Self>) -> bool {
        if self.reaper.get().is_some() {
            return false;
        }
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!("cannot start cache reaper outside a tokio runtime");
            return false;
        };

        let mut started = false;
        self.reaper.get_or_init(|| {
            handle.spawn(reap_loop(Arc::downgrade(self), self.config.reap_interval));
            started = true;
        });
        if started {
            info!(
                interval_ms = self.config.reap_interval.as_millis() as u64,
                idle_ms = self.config.idle_timeout.as_millis() as u64,
                "cache reaper started"
            );
        }
        started
    }

    pub fn reaper_started(&self) -> bool {
        self.reaper.get().is_some()
    }
}

impl Default for CacheStore {
    fn default() -> Self {
        Self::new()
    }
}

async fn reap_loop(store: Weak<CacheStore>, period: Duration) {
    // `interval` panics on a zero period
    let mut interval = time::interval(period.max(Duration::from_millis(1)));
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut restored = false;

    loop {
        interval.tick().await;
        let Some(store) = store.upgrade() else {
            debug!("cache dropped, stopping reaper");
            break;
        };

        if !restored {
            restored = true;
            if let Err(e) = store.restore().await {
                warn!(error = %e, "failed to restore persisted completions");
            }
        }

        let evicted = store.reap_idle(Utc::now());
        store.persist_evicted(evicted).await;
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::{
        strategy::ModuleMtimes,
        types::{Candidate, CandidateCategory},
    };

    fn record_at(key: CacheKey, word: &str, secs: i64) -> ResultRecord {
        ResultRecord::at(
            key,
            Some(vec![Candidate::new(word, CandidateCategory::Vars)]),
            ModuleMtimes::new(),
            DateTime::from_timestamp(secs, 0).unwrap(),
        )
    }

    fn word_of(entry: &CacheEntry) -> &str {
        &entry.completions.as_ref().unwrap()[0].word
    }

    #[test]
    fn test_newer_record_replaces_older() {
        let cache = CacheStore::new();
        let key = CacheKey::vars("mod.py", ["foo"]);

        assert!(cache.store(record_at(key.clone(), "old", 1)));
        assert!(cache.store(record_at(key.clone(), "new", 2)));

        let entry = cache.retrieve(&key).unwrap();
        assert_eq!(word_of(&entry), "new");
        assert_eq!(entry.time.timestamp(), 2);
    }

    #[test]
    fn test_older_record_arriving_late_is_rejected() {
        let cache = CacheStore::new();
        let key = CacheKey::vars("mod.py", ["foo"]);

        assert!(cache.store(record_at(key.clone(), "new", 2)));
        assert!(!cache.store(record_at(key.clone(), "old", 1)));

        let entry = cache.retrieve(&key).unwrap();
        assert_eq!(word_of(&entry), "new");
        assert_eq!(entry.time.timestamp(), 2);

        let stats = cache.stats();
        assert_eq!(stats.stores, 1);
        assert_eq!(stats.rejected_stores, 1);
    }

    #[test]
    fn test_equal_timestamp_replaces() {
        let cache = CacheStore::new();
        let key = CacheKey::attribute(["os"]);

        cache.store(record_at(key.clone(), "first", 5));
        assert!(cache.store(record_at(key.clone(), "second", 5)));
        assert_eq!(word_of(&cache.retrieve(&key).unwrap()), "second");
    }

    #[test]
    fn test_miss_is_counted() {
        let cache = CacheStore::new();
        assert!(cache.retrieve(&CacheKey::boilerplate()).is_none());
        assert!(cache.peek(&CacheKey::boilerplate()).is_none());
        assert!(!cache.touch(&CacheKey::boilerplate()));

        let stats = cache.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 0);
    }

    #[test]
    fn test_touch_protects_from_reaping() {
        let cache = CacheStore::with_config(CacheConfig {
            idle_timeout: Duration::from_secs(60),
            ..Default::default()
        });
        let stale = CacheKey::vars("a.py", ["f"]);
        let fresh = CacheKey::vars("a.py", ["g"]);
        cache.store(record_at(stale.clone(), "x", 1));
        cache.store(record_at(fresh.clone(), "y", 1));

        let later = Utc::now() + chrono::Duration::seconds(120);
        cache.entries.get_mut(&fresh).unwrap().last_touched = later;

        let evicted = cache.reap_idle(later);
        assert_eq!(evicted.len(), 1);
        assert_eq!(evicted[0].0, stale);
        assert!(cache.contains(&fresh));
        assert!(!cache.contains(&stale));
        assert_eq!(cache.stats().evictions, 1);
    }

    #[tokio::test]
    async fn test_start_reaper_is_idempotent() {
        let cache = Arc::new(CacheStore::new());
        assert!(!cache.reaper_started());
        assert!(cache.start_reaper());
        assert!(!cache.start_reaper());
        assert!(cache.reaper_started());
    }

    #[test]
    fn test_start_reaper_without_runtime() {
        let cache = Arc::new(CacheStore::new());
        assert!(!cache.start_reaper());
        assert!(!cache.reaper_started());
    }

    #[tokio::test]
    async fn test_reaper_evicts_idle_entries() {
        let cache = Arc::new(CacheStore::with_config(CacheConfig {
            reap_interval: Duration::from_millis(20),
            idle_timeout: Duration::from_millis(50),
            persist_dir: None,
        }));
        cache.store(record_at(CacheKey::vars("a.py", ["f"]), "x", 1));
        cache.start_reaper();

        time::sleep(Duration::from_millis(400)).await;
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_evicted_module_entries_survive_restart() {
        let temp_dir = TempDir::new().unwrap();
        let key = CacheKey::attribute(["os"]);
        let mut modules = ModuleMtimes::new();
        modules.insert(PathBuf::from("/lib/os.py"), 100);
        let record = ResultRecord::new(
            key.clone(),
            Some(vec![Candidate::new("path", CandidateCategory::Module)]),
            modules,
        );

        let first = Arc::new(CacheStore::with_config(CacheConfig {
            reap_interval: Duration::from_millis(20),
            idle_timeout: Duration::ZERO,
            persist_dir: Some(temp_dir.path().to_path_buf()),
        }));
        first.store(record);
        first.store(record_at(CacheKey::vars("a.py", ["f"]), "local", 1));
        first.start_reaper();
        time::sleep(Duration::from_millis(300)).await;
        assert!(first.is_empty());

        let second = CacheStore::with_config(CacheConfig {
            persist_dir: Some(temp_dir.path().to_path_buf()),
            ..Default::default()
        });
        assert_eq!(second.restore().await.unwrap(), 1);
        let entry = second.retrieve(&key).unwrap();
        assert_eq!(word_of(&entry), "path");
        assert!(second.retrieve(&CacheKey::vars("a.py", ["f"])).is_none());
    }
}
