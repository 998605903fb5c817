// src/watch/backend/mod.rs

//! Change-notification capability used by [`Watcher`](crate::watch::Watcher).
//!
//! A backend turns "this file's content changed" into a message on a
//! [`ChangeSink`]. The watcher state machine does not care where the message
//! came from:
//!
//! - [`NativeBackend`]: OS events through `notify`.
//! - [`PollBackend`]: periodic modification-time checks.
//! - [`ManualBackend`]: events injected by hand, for tests.

pub mod manual;
pub mod native;
pub mod poll;

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::errors::Result;
use crate::fs::RealFileSystem;
use crate::types::BackendMode;

pub use manual::ManualBackend;
pub use native::NativeBackend;
pub use poll::PollBackend;

/// Where backends deliver change notifications. Each message is the watched
/// path exactly as it was passed to [`ChangeBackend::subscribe`].
pub type ChangeSink = mpsc::UnboundedSender<PathBuf>;

/// A live subscription. Dropping it stops notifications for its path.
pub struct Subscription {
    path: PathBuf,
    _guard: Box<dyn Send>,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl Subscription {
    /// Wrap whatever keeps the notification source alive.
    pub fn new(path: impl Into<PathBuf>, guard: impl Send + 'static) -> Self {
        Self {
            path: path.into(),
            _guard: Box::new(guard),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

pub trait ChangeBackend: Send + Sync + fmt::Debug {
    /// Start delivering content-change notifications for `path` to `sink`.
    fn subscribe(&self, path: &Path, sink: ChangeSink) -> Result<Subscription>;

    /// Stop notifications for a subscription.
    fn unsubscribe(&self, subscription: Subscription) {
        drop(subscription);
    }
}

/// Build the backend selected by configuration.
pub fn backend_for(mode: BackendMode, poll_interval: Duration) -> Arc<dyn ChangeBackend> {
    match mode {
        BackendMode::Native => Arc::new(NativeBackend::new()),
        BackendMode::Poll => Arc::new(PollBackend::new(Arc::new(RealFileSystem), poll_interval)),
    }
}
