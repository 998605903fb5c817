// src/watch/watcher.rs

use std::fmt;
use std::mem;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::{Duration, Instant};

use anyhow::anyhow;
use tokio::sync::{mpsc, Notify};
use tracing::{debug, error, info};

use crate::errors::{Result, ShellError};
use crate::tasks::TaskRegistry;
use crate::types::TaskName;
use crate::watch::backend::{ChangeBackend, Subscription};
use crate::watch::batch::{BatchCore, WatcherState};
use crate::watch::dispatch::run_chain;

/// Default quiet window.
pub const DEFAULT_QUIET_WINDOW: Duration = Duration::from_millis(200);

/// Invoked once after every successful dispatch, on a blocking thread.
pub type CompletionCallback = Box<dyn FnMut(&Watcher) + Send>;

/// Timing policy for a watcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchOptions {
    /// How long the watched files must stay quiet before a batch dispatches.
    pub quiet_window: Duration,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            quiet_window: DEFAULT_QUIET_WINDOW,
        }
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

struct WatcherInner {
    files: Vec<PathBuf>,
    tasks: Vec<TaskName>,
    core: Arc<Mutex<BatchCore>>,
    failures: Arc<Mutex<Vec<ShellError>>>,
    subscriptions: Mutex<Vec<Subscription>>,
    backend: Arc<dyn ChangeBackend>,
    closed: Arc<Notify>,
}

impl Drop for WatcherInner {
    fn drop(&mut self) {
        if lock(&self.core).close() {
            debug!(files = self.files.len(), "watcher dropped without close");
        }
        self.closed.notify_one();
    }
}

/// A watch registration: a fixed file set, an ordered task chain and a
/// completion callback.
///
/// Bursts of changes to any of the files are coalesced: once the files have
/// been quiet for the configured window, every task runs in order and then
/// the completion callback runs exactly once. Handles are cheap to clone;
/// dropping the last one releases the subscriptions like [`close`](Self::close).
#[derive(Clone)]
pub struct Watcher {
    inner: Arc<WatcherInner>,
}

impl fmt::Debug for Watcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Watcher")
            .field("files", &self.inner.files)
            .field("tasks", &self.inner.tasks)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl Watcher {
    /// Subscribe every file through `backend` and start the event loop.
    ///
    /// `files` are reported back verbatim in the modified-file log. Must be
    /// called from within a Tokio runtime. If any subscription fails, the
    /// ones already made are released and the error is returned.
    pub fn spawn<F>(
        files: Vec<PathBuf>,
        tasks: Vec<TaskName>,
        registry: TaskRegistry,
        backend: Arc<dyn ChangeBackend>,
        options: WatchOptions,
        on_complete: F,
    ) -> Result<Watcher>
    where
        F: FnMut(&Watcher) + Send + 'static,
    {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| anyhow!("watchers need a Tokio runtime: {e}"))?;

        let (event_tx, event_rx) = mpsc::unbounded_channel::<PathBuf>();
        let mut subscriptions = Vec::with_capacity(files.len());
        for file in &files {
            subscriptions.push(backend.subscribe(file, event_tx.clone())?);
        }
        // Only subscriptions hold senders, so releasing them ends the loop.
        drop(event_tx);

        let inner = Arc::new(WatcherInner {
            files,
            tasks,
            core: Arc::new(Mutex::new(BatchCore::new(options.quiet_window))),
            failures: Arc::new(Mutex::new(Vec::new())),
            subscriptions: Mutex::new(subscriptions),
            backend,
            closed: Arc::new(Notify::new()),
        });

        let event_loop = EventLoop {
            watcher: Arc::downgrade(&inner),
            core: Arc::clone(&inner.core),
            failures: Arc::clone(&inner.failures),
            closed: Arc::clone(&inner.closed),
            registry,
            on_complete: Arc::new(Mutex::new(Box::new(on_complete))),
        };
        runtime.spawn(event_loop.run(event_rx));

        info!(
            files = inner.files.len(),
            tasks = ?inner.tasks,
            quiet_ms = options.quiet_window.as_millis() as u64,
            "watcher started"
        );
        Ok(Watcher { inner })
    }

    /// The resolved file list, fixed at construction.
    pub fn files(&self) -> &[PathBuf] {
        &self.inner.files
    }

    /// Task names run on each dispatch, in order.
    pub fn tasks(&self) -> &[TaskName] {
        &self.inner.tasks
    }

    /// Return the paths changed since the previous call and clear the log.
    pub fn take_modified_files(&self) -> Vec<PathBuf> {
        lock(&self.inner.core).drain_log()
    }

    /// Return the errors of failed dispatches since the previous call.
    pub fn take_failures(&self) -> Vec<ShellError> {
        mem::take(&mut *lock(&self.inner.failures))
    }

    pub fn state(&self) -> WatcherState {
        lock(&self.inner.core).state()
    }

    /// Number of dispatches that have finished, successfully or not.
    pub fn dispatch_count(&self) -> u64 {
        lock(&self.inner.core).dispatches()
    }

    pub fn is_closed(&self) -> bool {
        lock(&self.inner.core).is_closed()
    }

    /// Release every subscription and stop future dispatches.
    ///
    /// A pending quiet window is cancelled; a dispatch already running
    /// finishes. Closing twice is a no-op.
    pub fn close(&self) {
        if !lock(&self.inner.core).close() {
            return;
        }

        let subscriptions = mem::take(&mut *lock(&self.inner.subscriptions));
        let released = subscriptions.len();
        for subscription in subscriptions {
            self.inner.backend.unsubscribe(subscription);
        }
        self.inner.closed.notify_one();
        info!(released, "watcher closed");
    }
}

/// State owned by the background task. It keeps only a weak reference to the
/// watcher so dropping every handle tears the subscriptions down.
struct EventLoop {
    watcher: Weak<WatcherInner>,
    core: Arc<Mutex<BatchCore>>,
    failures: Arc<Mutex<Vec<ShellError>>>,
    closed: Arc<Notify>,
    registry: TaskRegistry,
    on_complete: Arc<Mutex<CompletionCallback>>,
}

impl EventLoop {
    async fn run(self, mut events: mpsc::UnboundedReceiver<PathBuf>) {
        loop {
            let deadline = {
                let core = lock(&self.core);
                if core.is_closed() {
                    break;
                }
                core.deadline()
            };
            let sleep_target = tokio::time::Instant::from_std(deadline.unwrap_or_else(Instant::now));

            tokio::select! {
                biased;

                _ = self.closed.notified() => {}

                event = events.recv() => match event {
                    Some(path) => {
                        debug!(?path, "change notification");
                        lock(&self.core).on_change(path, Instant::now());
                    }
                    None => {
                        debug!("all subscriptions released");
                        break;
                    }
                },

                _ = tokio::time::sleep_until(sleep_target), if deadline.is_some() => {
                    let due = lock(&self.core).on_quiet_elapsed(Instant::now());
                    if due {
                        self.dispatch(&mut events).await;
                    }
                }
            }
        }
        debug!("watcher event loop finished");
    }

    async fn dispatch(&self, events: &mut mpsc::UnboundedReceiver<PathBuf>) {
        let Some(inner) = self.watcher.upgrade() else {
            lock(&self.core).on_dispatch_finished(Instant::now());
            return;
        };
        let watcher = Watcher { inner };
        let tasks = watcher.inner.tasks.clone();
        let registry = self.registry.clone();
        let on_complete = Arc::clone(&self.on_complete);

        info!(tasks = ?tasks, "dispatching task chain");
        let mut job = tokio::task::spawn_blocking(move || -> Result<()> {
            run_chain(&registry, &tasks)?;
            let mut guard = lock(&on_complete);
            let callback: &mut CompletionCallback = &mut guard;
            callback(&watcher);
            Ok(())
        });

        // Keep accepting notifications so they are deferred, not lost.
        let outcome = loop {
            tokio::select! {
                joined = &mut job => break joined,
                Some(path) = events.recv() => {
                    lock(&self.core).on_change(path, Instant::now());
                }
            }
        };

        match outcome {
            Ok(Ok(())) => debug!("dispatch complete"),
            Ok(Err(err)) => {
                error!(error = %err, "dispatch failed; watcher stays open");
                lock(&self.failures).push(err);
            }
            Err(join_err) => {
                error!(error = %join_err, "dispatch panicked; watcher stays open");
                lock(&self.failures).push(ShellError::Other(anyhow!("dispatch panicked: {join_err}")));
            }
        }

        lock(&self.core).on_dispatch_finished(Instant::now());
    }
}
