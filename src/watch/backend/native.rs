// src/watch/backend/native.rs

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use notify::event::ModifyKind;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, warn};

use crate::errors::Result;
use crate::watch::backend::{ChangeBackend, ChangeSink, Subscription};

/// Native OS notifications via `notify::RecommendedWatcher`.
///
/// All subscriptions share one lazily created watcher. Each subscribed file
/// is watched through its parent directory, so a file replaced by rename or
/// deleted is still reported, and writes to the replacement keep arriving.
/// Directory watches are reference counted and removed with their last
/// subscription.
#[derive(Clone, Default)]
pub struct NativeBackend {
    shared: Arc<Shared>,
}

#[derive(Default)]
struct Shared {
    next_id: AtomicU64,
    /// Never locked by the notify callback.
    watch: Mutex<WatchState>,
    routes: Arc<Mutex<Routes>>,
}

#[derive(Default)]
struct WatchState {
    watcher: Option<RecommendedWatcher>,
    dirs: HashMap<PathBuf, usize>,
}

/// Event path → subscribers interested in it.
type Routes = HashMap<PathBuf, Vec<Route>>;

struct Route {
    id: u64,
    reported: PathBuf,
    sink: ChangeSink,
}

impl fmt::Debug for NativeBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dirs = lock(&self.shared.watch).dirs.len();
        f.debug_struct("NativeBackend")
            .field("watched_dirs", &dirs)
            .finish_non_exhaustive()
    }
}

impl NativeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of directories currently watched by the shared OS watcher.
    pub fn watched_dirs(&self) -> usize {
        lock(&self.shared.watch).dirs.len()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// Events that mean the file at the event path (may have) changed.
///
/// Renames count in both directions: moved over the watched path is a new
/// file, moved away is a deletion.
fn is_content_change(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_)
            | EventKind::Remove(_)
            | EventKind::Modify(ModifyKind::Data(_))
            | EventKind::Modify(ModifyKind::Name(_))
            | EventKind::Modify(ModifyKind::Any)
            | EventKind::Modify(ModifyKind::Other)
    )
}

/// Directory to watch for `path`, and the path events will carry for it.
fn split_watch_path(path: &Path) -> (PathBuf, PathBuf) {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let key = match path.file_name() {
        Some(name) => dir.join(name),
        None => path.to_path_buf(),
    };
    (dir, key)
}

/// Forward one notify event to every subscriber of the paths it names.
fn route_event(routes: &Mutex<Routes>, event: Event) {
    if !is_content_change(&event.kind) {
        return;
    }
    let routes = lock(routes);
    for path in &event.paths {
        for route in routes.get(path).into_iter().flatten() {
            if route.sink.send(route.reported.clone()).is_err() {
                debug!(path = ?route.reported, "change sink closed; dropping event");
            }
        }
    }
}

impl ChangeBackend for NativeBackend {
    fn subscribe(&self, path: &Path, sink: ChangeSink) -> Result<Subscription> {
        let (dir, key) = split_watch_path(path);

        let mut state = lock(&self.shared.watch);
        if state.watcher.is_none() {
            let routes = Arc::clone(&self.shared.routes);
            // Called synchronously on notify's own thread.
            let watcher = RecommendedWatcher::new(
                move |res: notify::Result<Event>| match res {
                    Ok(event) => route_event(&routes, event),
                    Err(err) => warn!(error = %err, "file watch error"),
                },
                Config::default(),
            )?;
            state.watcher = Some(watcher);
            debug!("native watcher started");
        }

        let watched = state.dirs.get(&dir).copied().unwrap_or(0);
        if watched == 0 {
            if let Some(watcher) = state.watcher.as_mut() {
                watcher.watch(&dir, RecursiveMode::NonRecursive)?;
            }
            debug!(?dir, "directory watch added");
        }
        state.dirs.insert(dir.clone(), watched + 1);

        let id = self.shared.next_id.fetch_add(1, Ordering::Relaxed);
        lock(&self.shared.routes)
            .entry(key.clone())
            .or_default()
            .push(Route {
                id,
                reported: path.to_path_buf(),
                sink,
            });
        debug!(?path, "native subscription started");

        let guard = NativeGuard {
            shared: Arc::clone(&self.shared),
            dir,
            key,
            id,
        };
        Ok(Subscription::new(path, guard))
    }
}

/// Releases one route and, with the last route in its directory, the
/// directory watch.
struct NativeGuard {
    shared: Arc<Shared>,
    dir: PathBuf,
    key: PathBuf,
    id: u64,
}

impl Drop for NativeGuard {
    fn drop(&mut self) {
        {
            let mut routes = lock(&self.shared.routes);
            if let Some(list) = routes.get_mut(&self.key) {
                list.retain(|route| route.id != self.id);
                if list.is_empty() {
                    routes.remove(&self.key);
                }
            }
        }

        let mut state = lock(&self.shared.watch);
        let remaining = match state.dirs.get_mut(&self.dir) {
            Some(count) => {
                *count -= 1;
                *count
            }
            None => return,
        };
        if remaining == 0 {
            state.dirs.remove(&self.dir);
            if let Some(watcher) = state.watcher.as_mut() {
                if let Err(err) = watcher.unwatch(&self.dir) {
                    debug!(dir = ?self.dir, error = %err, "directory unwatch failed");
                }
            }
            debug!(dir = ?self.dir, "directory watch removed");
        }
    }
}
