// src/watch/backend/poll.rs

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use crate::errors::Result;
use crate::fs::FileSystem;
use crate::watch::backend::{ChangeBackend, ChangeSink, Subscription};
use crate::watch::tracker::ModificationTracker;

/// Default interval between modification-time checks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Polling fallback: compares modification times on a fixed interval.
///
/// Each subscription runs a Tokio task with its own
/// [`ModificationTracker`]; the baseline is taken at subscribe time, so only
/// changes made afterwards are reported. A deletion is reported once, and a
/// later re-creation is reported again. Must be used from within a Tokio
/// runtime.
#[derive(Debug, Clone)]
pub struct PollBackend {
    fs: Arc<dyn FileSystem>,
    interval: Duration,
}

impl PollBackend {
    pub fn new(fs: Arc<dyn FileSystem>, interval: Duration) -> Self {
        Self { fs, interval }
    }
}

/// Aborts the polling task when the subscription is released.
struct AbortOnDrop(JoinHandle<()>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

impl ChangeBackend for PollBackend {
    fn subscribe(&self, path: &Path, sink: ChangeSink) -> Result<Subscription> {
        let tracker = ModificationTracker::new(Arc::clone(&self.fs));
        let fs = Arc::clone(&self.fs);
        let path_buf = path.to_path_buf();
        let interval = self.interval;

        tracker.check(&path_buf);
        let mut present = fs.exists(&path_buf);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick completes immediately; the baseline is already taken.
            ticker.tick().await;

            loop {
                ticker.tick().await;

                let exists = fs.exists(&path_buf);
                let changed = match (present, exists) {
                    (false, false) => false,
                    (true, false) => {
                        tracker.forget(&path_buf);
                        true
                    }
                    (_, true) => tracker.check(&path_buf),
                };
                present = exists;

                if changed {
                    debug!(path = ?path_buf, "poll detected change");
                    if sink.send(path_buf.clone()).is_err() {
                        break;
                    }
                }
            }
        });

        debug!(?path, ?interval, "poll subscription started");
        Ok(Subscription::new(path, AbortOnDrop(handle)))
    }
}
