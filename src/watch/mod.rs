// src/watch/mod.rs

//! Change tracking and change-triggered task dispatch.
//!
//! This module is responsible for:
//! - Per-path modification baselines ([`tracker`]).
//! - The change-notification capability and its backends ([`backend`]).
//! - The watcher state machine ([`batch`]) and the async loop that drives it
//!   ([`watcher`]), which coalesces bursts of changes and runs task chains
//!   through the [`TaskRegistry`](crate::tasks::TaskRegistry).
//!
//! It does **not** resolve patterns; callers hand it a concrete file list
//! (see [`Shell::watch`](crate::shell::Shell::watch)).

pub mod backend;
pub mod batch;
pub mod dispatch;
pub mod tracker;
pub mod watcher;

pub use backend::{
    backend_for, ChangeBackend, ChangeSink, ManualBackend, NativeBackend, PollBackend,
    Subscription,
};
pub use batch::{BatchCore, WatcherState};
pub use tracker::ModificationTracker;
pub use watcher::{CompletionCallback, WatchOptions, Watcher, DEFAULT_QUIET_WINDOW};
