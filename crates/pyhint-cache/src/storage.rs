//! Cache entries and the on-disk spill storage

use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::warn;

use crate::{
    key::{CacheKey, KeyTag},
    strategy::ModuleMtimes,
    types::{Candidate, ResultRecord},
    CacheError, Result,
};

/// A cached completion result
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// `None` when the analysis that produced this entry failed
    pub completions: Option<Arc<Vec<Candidate>>>,
    /// Dependency files and their mtimes at analysis time
    pub modules: ModuleMtimes,
    /// Timestamp of the result this entry was built from
    pub time: DateTime<Utc>,
    /// Last time the entry was served
    pub last_touched: DateTime<Utc>,
}

impl CacheEntry {
    /// Split a result record into its key and a fresh entry
    pub fn from_record(record: ResultRecord) -> (CacheKey, Self) {
        let entry = Self {
            completions: record.completions.map(Arc::new),
            modules: record.modules,
            time: record.time,
            last_touched: Utc::now(),
        };
        (record.key, entry)
    }

    /// Check if the entry has not been served for longer than `idle`
    pub fn is_idle(&self, now: DateTime<Utc>, idle: Duration) -> bool {
        now.signed_duration_since(self.last_touched)
            .to_std()
            .map(|elapsed| elapsed > idle)
            .unwrap_or(false)
    }

    /// Whether the entry under `key` is worth keeping across sessions.
    ///
    /// Only module-derived results qualify: buffer-scoped keys describe
    /// unsaved text, and sentinels are recomputed on every use anyway.
    pub fn is_persistable(&self, key: &CacheKey) -> bool {
        matches!(key.tag(), KeyTag::Attribute | KeyTag::Module)
            && !key.is_buffer_scoped()
            && !self.modules.is_empty()
            && self.completions.is_some()
    }
}

/// JSON shape of an entry written to disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedEntry {
    pub key: CacheKey,
    pub completions: Vec<Candidate>,
    pub modules: ModuleMtimes,
    pub time: DateTime<Utc>,
}

impl PersistedEntry {
    pub fn into_record(self) -> ResultRecord {
        ResultRecord::at(self.key, Some(self.completions), self.modules, self.time)
    }
}

/// Disk-based spill storage for module-scoped entries
#[derive(Debug, Clone)]
pub struct DiskStorage {
    base_path: PathBuf,
}

impl DiskStorage {
    /// Create new disk storage with base path
    pub fn new<P: AsRef<Path>>(base_path: P) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Get file path for a key
    fn key_path(&self, key: &CacheKey) -> PathBuf {
        let digest = md5::compute(key.tokens().join("\u{1f}"));
        self.base_path.join(format!("{:x}.json", digest))
    }

    /// Ensure base directory exists
    async fn ensure_base_dir(&self) -> Result<()> {
        if !self.base_path.exists() {
            fs::create_dir_all(&self.base_path).await?;
        }
        Ok(())
    }

    /// Write one entry, replacing any previous file for the key
    pub async fn save(&self, key: &CacheKey, entry: &CacheEntry) -> Result<()> {
        let completions = entry
            .completions
            .as_ref()
            .ok_or_else(|| CacheError::NothingToPersist {
                key: key.to_string(),
            })?;

        self.ensure_base_dir().await?;

        let persisted = PersistedEntry {
            key: key.clone(),
            completions: completions.to_vec(),
            modules: entry.modules.clone(),
            time: entry.time,
        };
        let json_data = serde_json::to_string(&persisted)?;
        fs::write(self.key_path(key), json_data).await?;
        Ok(())
    }

    /// Load every readable entry; corrupt files are skipped
    pub async fn load_all(&self) -> Result<Vec<PersistedEntry>> {
        if !self.base_path.exists() {
            return Ok(Vec::new());
        }

        let mut loaded = Vec::new();
        let mut entries = fs::read_dir(&self.base_path).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().map_or(true, |ext| ext != "json") {
                continue;
            }

            let json_data = fs::read_to_string(&path).await?;
            match serde_json::from_str::<PersistedEntry>(&json_data) {
                Ok(persisted) => loaded.push(persisted),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping unreadable cache file")
                }
            }
        }
        Ok(loaded)
    }

    pub async fn remove(&self, key: &CacheKey) -> Result<bool> {
        let file_path = self.key_path(key);

        if file_path.exists() {
            fs::remove_file(&file_path).await?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Remove all persisted entries
    pub async fn clear(&self) -> Result<()> {
        if self.base_path.exists() {
            let mut entries = fs::read_dir(&self.base_path).await?;
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if path.extension().map_or(false, |ext| ext == "json") {
                    fs::remove_file(&path).await?;
                }
            }
        }
        Ok(())
    }
}
