/// Configuration loading and validation for the completion source
use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use pyhint_cache::CacheConfig;
use pyhint_worker::{DisplayOptions, WorkerOptions};
use serde::{Deserialize, Serialize};

use crate::error::{CompletionError, CompletionResult};

/// Host-supplied settings, read once at bootstrap
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionSettings {
    /// Number of background analysis workers
    pub worker_threads: usize,
    /// Maximum description length in characters, 0 for unlimited
    pub statement_length: usize,
    pub short_types: bool,
    pub show_docstring: bool,
    pub debug_enabled: bool,
    /// Minimum word length that triggers completion
    pub min_length: usize,
    /// How long a request may wait for a result that is not cached yet
    pub wait_timeout_ms: u64,
    pub work_queue_capacity: usize,
    /// Extra module search roots
    pub python_path: Vec<PathBuf>,
    pub cache: CacheSettings,
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            worker_threads: 2,
            statement_length: 50,
            short_types: false,
            show_docstring: false,
            debug_enabled: false,
            min_length: 2,
            wait_timeout_ms: 2000,
            work_queue_capacity: 64,
            python_path: Vec::new(),
            cache: CacheSettings::default(),
        }
    }
}

impl CompletionSettings {
    pub fn wait_timeout(&self) -> Duration {
        Duration::from_millis(self.wait_timeout_ms)
    }

    /// Worker count, never less than one
    pub fn worker_count(&self) -> usize {
        self.worker_threads.max(1)
    }

    pub fn worker_options(&self) -> WorkerOptions {
        WorkerOptions {
            display: DisplayOptions {
                statement_length: self.statement_length,
                short_types: self.short_types,
                show_docstring: self.show_docstring,
            },
            debug: self.debug_enabled,
        }
    }

    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            reap_interval: Duration::from_secs(self.cache.reap_interval_secs),
            idle_timeout: Duration::from_secs(self.cache.idle_timeout_secs),
            persist_dir: self.cache.persist_dir.clone(),
        }
    }
}

/// Cache lifetime settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub reap_interval_secs: u64,
    pub idle_timeout_secs: u64,
    /// Keep module completions on disk between sessions
    pub persist_dir: Option<PathBuf>,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            reap_interval_secs: 30,
            idle_timeout_secs: 300,
            persist_dir: None,
        }
    }
}

/// Completion settings loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load settings from a YAML file
    pub fn load_from_yaml(path: &Path) -> CompletionResult<CompletionSettings> {
        let content = std::fs::read_to_string(path)?;
        let settings: CompletionSettings = serde_yaml::from_str(&content)?;
        Self::validate(&settings)?;
        Ok(settings)
    }

    /// Load settings from a JSON file
    pub fn load_from_json(path: &Path) -> CompletionResult<CompletionSettings> {
        let content = std::fs::read_to_string(path)?;
        let settings: CompletionSettings = serde_json::from_str(&content)?;
        Self::validate(&settings)?;
        Ok(settings)
    }

    /// Load settings from a file, picking the format by extension
    pub fn load_from_file(path: &Path) -> CompletionResult<CompletionSettings> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => Self::load_from_yaml(path),
            Some("json") => Self::load_from_json(path),
            _ => Err(CompletionError::ConfigError(format!(
                "Unsupported configuration file: {}",
                path.display()
            ))),
        }
    }

    /// Load settings from a string
    pub fn load_from_string(
        content: &str,
        format: ConfigFormat,
    ) -> CompletionResult<CompletionSettings> {
        let settings = match format {
            ConfigFormat::Yaml => serde_yaml::from_str(content)?,
            ConfigFormat::Json => serde_json::from_str(content)?,
        };
        Self::validate(&settings)?;
        Ok(settings)
    }

    /// Validate completion settings
    pub fn validate(settings: &CompletionSettings) -> CompletionResult<()> {
        if settings.work_queue_capacity == 0 {
            return Err(CompletionError::ConfigError(
                "work_queue_capacity must be greater than zero".to_string(),
            ));
        }

        if settings.wait_timeout_ms == 0 {
            return Err(CompletionError::ConfigError(
                "wait_timeout_ms must be greater than zero".to_string(),
            ));
        }

        if settings.cache.reap_interval_secs == 0 {
            return Err(CompletionError::ConfigError(
                "cache.reap_interval_secs must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

/// Configuration format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Json,
}
