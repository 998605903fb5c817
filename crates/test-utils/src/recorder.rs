use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use shellwatch::tasks::TaskRegistry;
use shellwatch::watch::Watcher;
use tokio::sync::mpsc;

/// Records the order in which registered tasks run.
#[derive(Clone, Default)]
pub struct CallRecorder {
    calls: Arc<Mutex<Vec<String>>>,
}

impl CallRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `name` on `registry` as a task that records itself.
    pub fn register(&self, registry: &TaskRegistry, name: &str) {
        let calls = Arc::clone(&self.calls);
        let label = name.to_string();
        registry.register(name, move || {
            calls.lock().unwrap().push(label.clone());
            Ok(())
        });
    }

    /// Register `name` as a task that records itself and then fails.
    pub fn register_failing(&self, registry: &TaskRegistry, name: &str) {
        let calls = Arc::clone(&self.calls);
        let label = name.to_string();
        registry.register(name, move || {
            calls.lock().unwrap().push(label.clone());
            Err(anyhow::anyhow!("task {label} failed on purpose"))
        });
    }

    /// Record a call made by a task registered some other way.
    pub fn record(&self, name: &str) {
        self.calls.lock().unwrap().push(name.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }
}

/// What a completion callback saw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    /// The modified-file log, drained inside the callback.
    pub modified: Vec<PathBuf>,
    /// A second drain immediately after the first.
    pub second_drain: Vec<PathBuf>,
}

/// A completion callback that drains the watcher's log and reports it on a
/// channel, so tests can `await` each dispatch.
pub fn completion_channel() -> (
    impl FnMut(&Watcher) + Send + 'static,
    mpsc::UnboundedReceiver<Completion>,
) {
    let (tx, rx) = mpsc::unbounded_channel();
    let callback = move |watcher: &Watcher| {
        let modified = watcher.take_modified_files();
        let second_drain = watcher.take_modified_files();
        let _ = tx.send(Completion {
            modified,
            second_drain,
        });
    };
    (callback, rx)
}
