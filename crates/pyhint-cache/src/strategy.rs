//! Cache invalidation by dependency file modification times

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    time::UNIX_EPOCH,
};

/// Dependency file → modification time (whole seconds since the epoch)
pub type ModuleMtimes = BTreeMap<PathBuf, u64>;

/// Current modification time of `path`, or `None` if it cannot be read.
pub fn mtime_secs(path: &Path) -> Option<u64> {
    let modified = std::fs::metadata(path).ok()?.modified().ok()?;
    let since_epoch = modified.duration_since(UNIX_EPOCH).ok()?;
    Some(since_epoch.as_secs())
}

/// Outcome of checking an entry against its dependency files
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validity {
    Fresh,
    /// A currently relevant dependency is not recorded in the entry
    Untracked(PathBuf),
    /// A recorded file changed, was deleted, or cannot be read
    Changed(PathBuf),
}

impl Validity {
    pub fn is_fresh(&self) -> bool {
        matches!(self, Self::Fresh)
    }
}

/// File change detection strategy
///
/// An entry stays valid while every dependency of the current request is
/// present in its `modules` map and every recorded mtime still matches the
/// file on disk. Unreadable files count as changed.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileChangeStrategy;

impl FileChangeStrategy {
    pub fn new() -> Self {
        Self
    }

    /// Check recorded mtimes against the filesystem
    pub fn check<P: AsRef<Path>>(&self, modules: &ModuleMtimes, dependencies: &[P]) -> Validity {
        for dependency in dependencies {
            let dependency = dependency.as_ref();
            if !modules.contains_key(dependency) {
                return Validity::Untracked(dependency.to_path_buf());
            }
        }

        for (path, recorded) in modules {
            if mtime_secs(path) != Some(*recorded) {
                return Validity::Changed(path.clone());
            }
        }

        Validity::Fresh
    }

    /// Snapshot the current mtimes of the files that exist
    pub fn record<I, P>(&self, paths: I) -> ModuleMtimes
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        paths
            .into_iter()
            .filter_map(|path| {
                let path = path.as_ref();
                mtime_secs(path).map(|mtime| (path.to_path_buf(), mtime))
            })
            .collect()
    }
}
