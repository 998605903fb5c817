// src/watch/backend/manual.rs

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::errors::Result;
use crate::watch::backend::{ChangeBackend, ChangeSink, Subscription};

type Sinks = HashMap<PathBuf, Vec<(u64, ChangeSink)>>;

#[derive(Debug, Default)]
struct ManualState {
    next_id: u64,
    sinks: Sinks,
}

/// Backend whose events are fired by hand with [`ManualBackend::fire`].
///
/// Lets tests drive the watcher deterministically, without touching the
/// filesystem or waiting on OS notifications.
#[derive(Debug, Clone, Default)]
pub struct ManualBackend {
    state: Arc<Mutex<ManualState>>,
}

/// Removes the sink registration when the subscription is dropped.
struct Registration {
    state: Arc<Mutex<ManualState>>,
    path: PathBuf,
    id: u64,
}

impl Drop for Registration {
    fn drop(&mut self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(sinks) = state.sinks.get_mut(&self.path) {
            sinks.retain(|(id, _)| *id != self.id);
            if sinks.is_empty() {
                state.sinks.remove(&self.path);
            }
        }
    }
}

impl ManualBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ManualState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Deliver a change notification for `path` to every live subscriber.
    /// Returns how many subscribers received it.
    pub fn fire(&self, path: impl AsRef<Path>) -> usize {
        let state = self.lock();
        let path = path.as_ref();
        state
            .sinks
            .get(path)
            .map(|sinks| {
                sinks
                    .iter()
                    .filter(|(_, sink)| sink.send(path.to_path_buf()).is_ok())
                    .count()
            })
            .unwrap_or(0)
    }

    /// Number of live subscriptions for `path`.
    pub fn subscriber_count(&self, path: impl AsRef<Path>) -> usize {
        self.lock()
            .sinks
            .get(path.as_ref())
            .map(Vec::len)
            .unwrap_or(0)
    }

    /// Every path with at least one live subscription, sorted.
    pub fn subscribed_paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self.lock().sinks.keys().cloned().collect();
        paths.sort();
        paths
    }
}

impl ChangeBackend for ManualBackend {
    fn subscribe(&self, path: &Path, sink: ChangeSink) -> Result<Subscription> {
        let mut state = self.lock();
        state.next_id += 1;
        let id = state.next_id;
        state
            .sinks
            .entry(path.to_path_buf())
            .or_default()
            .push((id, sink));

        let registration = Registration {
            state: Arc::clone(&self.state),
            path: path.to_path_buf(),
            id,
        };
        Ok(Subscription::new(path, registration))
    }
}
