// src/watch/batch.rs

//! Pure watcher state machine.
//!
//! [`BatchCore`] consumes change notifications, quiet-window expiry and
//! dispatch completion, and tells the async shell (`watch::watcher`) when to
//! run a batch. It has no channels, no Tokio types and performs no IO, so the
//! coalescing rules are unit tested with plain `Instant`s.

use std::collections::HashSet;
use std::mem;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use tracing::debug;

/// Lifecycle state of a watcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatcherState {
    /// Idle, waiting for the first change of a burst.
    Open,
    /// At least one change seen; the quiet-window timer is running.
    PendingBatch,
    /// The task chain is executing.
    Dispatching,
    /// Terminal.
    Closed,
}

#[derive(Debug)]
pub struct BatchCore {
    state: WatcherState,
    quiet_window: Duration,
    deadline: Option<Instant>,
    /// Drainable log of changed paths, in first-observed order.
    log: Vec<PathBuf>,
    /// Paths already logged during the current window.
    window: HashSet<PathBuf>,
    /// Changes observed while dispatching; they open the next window.
    deferred: Vec<PathBuf>,
    dispatches: u64,
}

impl BatchCore {
    pub fn new(quiet_window: Duration) -> Self {
        Self {
            state: WatcherState::Open,
            quiet_window,
            deadline: None,
            log: Vec::new(),
            window: HashSet::new(),
            deferred: Vec::new(),
            dispatches: 0,
        }
    }

    pub fn state(&self) -> WatcherState {
        self.state
    }

    /// When the pending batch becomes due, if one is pending.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Completed dispatches (successful or failed).
    pub fn dispatches(&self) -> u64 {
        self.dispatches
    }

    pub fn is_closed(&self) -> bool {
        self.state == WatcherState::Closed
    }

    /// Record a change notification observed at `now`.
    pub fn on_change(&mut self, path: PathBuf, now: Instant) {
        match self.state {
            WatcherState::Closed => {
                debug!(?path, "change after close ignored");
            }
            WatcherState::Dispatching => {
                if !self.deferred.contains(&path) {
                    debug!(?path, "change during dispatch deferred");
                    self.deferred.push(path);
                }
            }
            WatcherState::Open | WatcherState::PendingBatch => {
                if self.window.insert(path.clone()) {
                    self.log.push(path);
                }
                self.deadline = Some(now + self.quiet_window);
                self.state = WatcherState::PendingBatch;
            }
        }
    }

    /// Called when the timer fires. Returns true when the batch should be
    /// dispatched now; the core is then in `Dispatching`.
    pub fn on_quiet_elapsed(&mut self, now: Instant) -> bool {
        match (self.state, self.deadline) {
            (WatcherState::PendingBatch, Some(deadline)) if deadline <= now => {
                self.state = WatcherState::Dispatching;
                self.deadline = None;
                self.window.clear();
                true
            }
            _ => false,
        }
    }

    /// Called when the in-flight dispatch has finished. Deferred changes
    /// start a fresh window at `now`.
    pub fn on_dispatch_finished(&mut self, now: Instant) {
        self.dispatches += 1;
        if self.state != WatcherState::Dispatching {
            return;
        }
        self.state = WatcherState::Open;
        for path in mem::take(&mut self.deferred) {
            self.on_change(path, now);
        }
    }

    /// Enter `Closed`, cancelling any pending window. Returns false when the
    /// core was already closed.
    pub fn close(&mut self) -> bool {
        if self.state == WatcherState::Closed {
            return false;
        }
        self.state = WatcherState::Closed;
        self.deadline = None;
        self.deferred.clear();
        true
    }

    /// Return the modified-file log and empty it.
    pub fn drain_log(&mut self) -> Vec<PathBuf> {
        mem::take(&mut self.log)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUIET: Duration = Duration::from_millis(100);

    fn p(s: &str) -> PathBuf {
        PathBuf::from(s)
    }

    #[test]
    fn first_change_opens_a_window() {
        let t0 = Instant::now();
        let mut core = BatchCore::new(QUIET);
        assert_eq!(core.state(), WatcherState::Open);
        assert_eq!(core.deadline(), None);

        core.on_change(p("a"), t0);
        assert_eq!(core.state(), WatcherState::PendingBatch);
        assert_eq!(core.deadline(), Some(t0 + QUIET));
    }

    #[test]
    fn further_changes_restart_the_window_and_collapse_duplicates() {
        let t0 = Instant::now();
        let mut core = BatchCore::new(QUIET);

        core.on_change(p("a"), t0);
        core.on_change(p("b"), t0 + Duration::from_millis(50));
        core.on_change(p("a"), t0 + Duration::from_millis(80));
        assert_eq!(core.deadline(), Some(t0 + Duration::from_millis(180)));

        // The original deadline no longer dispatches.
        assert!(!core.on_quiet_elapsed(t0 + QUIET));
        assert!(core.on_quiet_elapsed(t0 + Duration::from_millis(180)));
        assert_eq!(core.state(), WatcherState::Dispatching);

        core.on_dispatch_finished(t0 + Duration::from_millis(200));
        assert_eq!(core.state(), WatcherState::Open);
        assert_eq!(core.drain_log(), vec![p("a"), p("b")]);
        assert!(core.drain_log().is_empty());
        assert_eq!(core.dispatches(), 1);
    }

    #[test]
    fn changes_during_dispatch_open_the_next_window_afterwards() {
        let t0 = Instant::now();
        let mut core = BatchCore::new(QUIET);

        core.on_change(p("a"), t0);
        assert!(core.on_quiet_elapsed(t0 + QUIET));

        core.on_change(p("a"), t0 + Duration::from_millis(110));
        core.on_change(p("a"), t0 + Duration::from_millis(120));
        assert_eq!(core.state(), WatcherState::Dispatching);
        assert_eq!(core.deadline(), None);

        let done = t0 + Duration::from_millis(300);
        core.on_dispatch_finished(done);
        assert_eq!(core.state(), WatcherState::PendingBatch);
        assert_eq!(core.deadline(), Some(done + QUIET));
        // Logged once per window: first window + the deferred one.
        assert_eq!(core.drain_log(), vec![p("a"), p("a")]);
    }

    #[test]
    fn close_cancels_pending_batch_and_is_idempotent() {
        let t0 = Instant::now();
        let mut core = BatchCore::new(QUIET);

        core.on_change(p("a"), t0);
        assert!(core.close());
        assert!(!core.close());
        assert_eq!(core.deadline(), None);
        assert!(!core.on_quiet_elapsed(t0 + QUIET * 10));

        core.on_change(p("b"), t0 + QUIET);
        assert_eq!(core.drain_log(), vec![p("a")]);
    }

    #[test]
    fn close_during_dispatch_stays_closed_after_it_finishes() {
        let t0 = Instant::now();
        let mut core = BatchCore::new(QUIET);

        core.on_change(p("a"), t0);
        assert!(core.on_quiet_elapsed(t0 + QUIET));
        core.on_change(p("b"), t0 + QUIET);
        core.close();
        core.on_dispatch_finished(t0 + QUIET * 2);

        assert!(core.is_closed());
        assert_eq!(core.deadline(), None);
        assert_eq!(core.dispatches(), 1);
    }
}
