// src/watch/tracker.rs

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::SystemTime;

use tracing::debug;

use crate::fs::{FileSystem, RealFileSystem};

/// Per-path modification-time baselines.
///
/// [`check`](Self::check) answers "has this path changed since I last
/// asked?" and records the answer as the new baseline. Cloning shares the
/// baseline map; use [`ModificationTracker::new`] for an isolated one.
#[derive(Clone)]
pub struct ModificationTracker {
    fs: Arc<dyn FileSystem>,
    baselines: Arc<Mutex<HashMap<PathBuf, SystemTime>>>,
}

impl fmt::Debug for ModificationTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModificationTracker")
            .field("tracked", &self.len())
            .finish_non_exhaustive()
    }
}

impl Default for ModificationTracker {
    fn default() -> Self {
        Self::new(Arc::new(RealFileSystem))
    }
}

impl ModificationTracker {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self {
            fs,
            baselines: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn baselines(&self) -> MutexGuard<'_, HashMap<PathBuf, SystemTime>> {
        self.baselines.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Report whether `path` was modified since the previous check, updating
    /// the baseline.
    ///
    /// - Missing path: baseline dropped, reports `true`.
    /// - First check: baseline recorded, reports `true`.
    /// - Same timestamp as the baseline: `false`.
    /// - Different timestamp: baseline updated, `true`.
    pub fn check(&self, path: &Path) -> bool {
        let mut baselines = self.baselines();

        let Some(current) = self.fs.modified(path) else {
            if baselines.remove(path).is_some() {
                debug!(?path, "path disappeared; dropped modification baseline");
            }
            return true;
        };

        match baselines.insert(path.to_path_buf(), current) {
            Some(previous) if previous == current => false,
            Some(_) => {
                debug!(?path, "modification time changed");
                true
            }
            None => {
                debug!(?path, "recorded first modification baseline");
                true
            }
        }
    }

    /// Drop the baseline for `path`; its next check reports `true`.
    pub fn forget(&self, path: &Path) {
        self.baselines().remove(path);
    }

    /// Drop every baseline.
    pub fn reset(&self) {
        self.baselines().clear();
    }

    /// Number of paths with a recorded baseline.
    pub fn len(&self) -> usize {
        self.baselines().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
