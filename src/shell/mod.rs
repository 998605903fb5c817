// src/shell/mod.rs

//! The scripting context: environment, working directory, tasks, change
//! baselines and watchers, bundled so independent sessions never share state.
//!
//! File operations live in [`ops`]; this file holds the context itself,
//! directory navigation, listing and the task/watch surface.

pub mod ops;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::env::Environment;
use crate::errors::{Result, ShellError};
use crate::exec::shell_action;
use crate::fs::{FileSystem, RealFileSystem};
use crate::resolve::{contains_glob, PathPattern, PathResolver};
use crate::tasks::TaskRegistry;
use crate::types::TaskName;
use crate::watch::{ChangeBackend, ModificationTracker, NativeBackend, WatchOptions, Watcher};

/// A self-contained scripting session.
///
/// The shell keeps its own working directory rather than changing the
/// process's, so several shells can coexist in one process (and in one test
/// binary). Relative arguments are interpreted against [`Shell::cwd`];
/// resolved paths come back in the form they were written.
#[derive(Debug)]
pub struct Shell {
    env: Environment,
    cwd: PathBuf,
    dir_stack: Vec<PathBuf>,
    fs: Arc<dyn FileSystem>,
    tracker: ModificationTracker,
    tasks: TaskRegistry,
    backend: Arc<dyn ChangeBackend>,
    watch_options: WatchOptions,
}

impl Shell {
    /// Shell rooted at the process's current directory.
    pub fn new() -> Result<Self> {
        let cwd = std::env::current_dir().map_err(|e| ShellError::io("chdir", ".", e))?;
        Self::in_dir(cwd)
    }

    /// Shell rooted at `dir`, which must be an existing directory.
    pub fn in_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let cwd = fs::canonicalize(dir).map_err(|e| ShellError::io("chdir", dir, e))?;
        if !cwd.is_dir() {
            return Err(ShellError::io(
                "chdir",
                dir,
                std::io::Error::from(std::io::ErrorKind::NotADirectory),
            ));
        }

        let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
        Ok(Self {
            env: Environment::new(),
            cwd,
            dir_stack: Vec::new(),
            tracker: ModificationTracker::new(Arc::clone(&fs)),
            fs,
            tasks: TaskRegistry::new(),
            backend: Arc::new(NativeBackend::new()),
            watch_options: WatchOptions::default(),
        })
    }

    pub fn with_env(mut self, env: Environment) -> Self {
        self.env = env;
        self
    }

    /// Change-notification backend used by [`Shell::watch`].
    pub fn with_backend(mut self, backend: Arc<dyn ChangeBackend>) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_watch_options(mut self, options: WatchOptions) -> Self {
        self.watch_options = options;
        self
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    pub fn env_mut(&mut self) -> &mut Environment {
        &mut self.env
    }

    pub fn tasks(&self) -> &TaskRegistry {
        &self.tasks
    }

    pub fn tracker(&self) -> &ModificationTracker {
        &self.tracker
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// `path` interpreted against the shell's working directory.
    pub fn absolute(&self, path: impl AsRef<Path>) -> PathBuf {
        self.cwd.join(path)
    }

    pub(crate) fn resolver(&self) -> PathResolver<'_> {
        PathResolver::new(&self.env, self.fs.as_ref(), &self.cwd)
    }

    /// Resolve `pattern` to existing paths; see [`PathResolver::resolve`].
    pub fn resolve(&self, pattern: impl Into<PathPattern>, op: &'static str) -> Result<Vec<PathBuf>> {
        self.resolver().resolve(&pattern.into(), op)
    }

    /// Expand every token of `pattern` without requiring the paths to exist.
    pub(crate) fn expand_all(&self, pattern: &PathPattern, op: &'static str) -> Result<Vec<PathBuf>> {
        let tokens = pattern.tokens();
        if tokens.is_empty() {
            return Err(ShellError::InvalidPattern {
                op: crate::resolve::EXPAND,
                reason: "no paths given".to_string(),
            });
        }
        let resolver = self.resolver();
        tokens
            .iter()
            .map(|token| resolver.expand(token, op).map(PathBuf::from))
            .collect()
    }

    /// Expand a single destination argument.
    pub(crate) fn expand_one(&self, token: &str, op: &'static str) -> Result<PathBuf> {
        self.resolver().expand(token, op).map(PathBuf::from)
    }

    // ---------------------------------------------------------------------
    // Navigation
    // ---------------------------------------------------------------------

    /// Change the working directory. `~` and variables are expanded.
    pub fn chdir(&mut self, path: &str) -> Result<()> {
        let target = self.absolute(self.expand_one(path, "chdir")?);
        let target = fs::canonicalize(&target).map_err(|e| ShellError::io("chdir", &target, e))?;
        if !target.is_dir() {
            return Err(ShellError::io(
                "chdir",
                target,
                std::io::Error::from(std::io::ErrorKind::NotADirectory),
            ));
        }
        debug!(from = %self.cwd.display(), to = %target.display(), "chdir");
        self.cwd = target;
        Ok(())
    }

    /// Push the current directory and change to `path`.
    pub fn pushd(&mut self, path: &str) -> Result<()> {
        let previous = self.cwd.clone();
        self.chdir(path)?;
        self.dir_stack.push(previous);
        Ok(())
    }

    /// Return to the directory saved by the matching [`Shell::pushd`].
    pub fn popd(&mut self) -> Result<PathBuf> {
        let previous = self.dir_stack.pop().ok_or_else(|| ShellError::InvalidPattern {
            op: "popd",
            reason: "directory stack is empty".to_string(),
        })?;
        self.cwd = previous;
        Ok(self.cwd.clone())
    }

    // ---------------------------------------------------------------------
    // Listing
    // ---------------------------------------------------------------------

    /// Sorted entry names of the working directory.
    pub fn listdir(&self) -> Result<Vec<PathBuf>> {
        sorted_children(&self.cwd, Path::new(""), "listdir")
    }

    /// Resolve `pattern`, replacing every matched directory with its sorted
    /// children. Fails with `NoMatch` when nothing is left.
    pub fn ls(&self, pattern: impl Into<PathPattern>) -> Result<Vec<PathBuf>> {
        let pattern = pattern.into();
        let mut listed = Vec::new();
        for path in self.resolve(pattern.clone(), "listdir")? {
            let abs = self.absolute(&path);
            if abs.is_dir() {
                listed.extend(sorted_children(&abs, &path, "listdir")?);
            } else {
                listed.push(path);
            }
        }

        if listed.is_empty() {
            return Err(ShellError::NoMatch {
                op: "listdir",
                pattern: pattern.to_string(),
            });
        }
        Ok(listed)
    }

    /// Plain resolution; a wildcard that matches nothing gives an empty list.
    pub fn glob(&self, pattern: impl Into<PathPattern>) -> Result<Vec<PathBuf>> {
        self.resolve(pattern, "glob")
    }

    /// Whether every token of `pattern` resolves to at least one path.
    pub fn exists(&self, pattern: impl Into<PathPattern>) -> Result<bool> {
        let pattern = pattern.into();
        if pattern.tokens().is_empty() {
            return self.resolve(pattern, "exists").map(|_| false);
        }
        for token in pattern.tokens() {
            match self.resolve(token.as_str(), "exists") {
                Ok(paths) if !paths.is_empty() => {}
                Ok(_) | Err(ShellError::PathNotFound { .. }) => return Ok(false),
                Err(err) => return Err(err),
            }
        }
        Ok(true)
    }

    pub fn not_exists(&self, pattern: impl Into<PathPattern>) -> Result<bool> {
        self.exists(pattern).map(|found| !found)
    }

    // ---------------------------------------------------------------------
    // Change tracking
    // ---------------------------------------------------------------------

    /// Whether `pattern` changed since the last time it was asked about.
    ///
    /// Literal tokens need not exist (a missing path reports `true`). For a
    /// wildcard every match is checked, so all baselines stay current.
    pub fn modified(&self, pattern: impl Into<PathPattern>) -> Result<bool> {
        let pattern = pattern.into();
        let mut changed = false;
        for token in pattern.tokens() {
            let expanded = self.expand_one(token, "modified")?;
            let paths = if contains_glob(&expanded.to_string_lossy()) {
                self.resolve(token.as_str(), "modified")?
            } else {
                vec![expanded]
            };
            for path in paths {
                changed |= self.tracker.check(&self.absolute(path));
            }
        }
        Ok(changed)
    }

    // ---------------------------------------------------------------------
    // Tasks
    // ---------------------------------------------------------------------

    /// Register `action` under `name`, replacing any previous registration.
    pub fn task<F>(&self, name: impl Into<TaskName>, action: F)
    where
        F: Fn() -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.tasks.register(name, action);
    }

    /// Register a task that runs `cmd` through the platform shell in the
    /// current working directory.
    pub fn task_command(&self, name: impl Into<TaskName>, cmd: impl Into<String>) {
        let name = name.into();
        let action = shell_action(name.clone(), cmd, self.cwd.clone());
        self.tasks.register(name, move || action());
    }

    pub fn run_task(&self, name: &str) -> Result<()> {
        self.tasks.run(name)
    }

    /// Forget every task and every modification baseline.
    pub fn reset(&self) {
        self.tasks.reset();
        self.tracker.reset();
        info!("shell session reset");
    }

    // ---------------------------------------------------------------------
    // Watching
    // ---------------------------------------------------------------------

    /// Watch the files matched by `pattern` and run `tasks` in order after
    /// every burst of changes, then `on_complete`.
    ///
    /// The pattern is resolved once, here: resolution errors are returned
    /// before anything is subscribed, and files created later are not
    /// picked up. The watcher's file list holds absolute paths.
    pub fn watch<I, S, F>(&self, pattern: impl Into<PathPattern>, tasks: I, on_complete: F) -> Result<Watcher>
    where
        I: IntoIterator<Item = S>,
        S: Into<TaskName>,
        F: FnMut(&Watcher) + Send + 'static,
    {
        let pattern = pattern.into();
        let files: Vec<PathBuf> = self
            .resolve(pattern.clone(), "watch")?
            .into_iter()
            .map(|path| self.absolute(path))
            .collect();
        if files.is_empty() {
            warn!(%pattern, "watch pattern matched no files");
        }
        let tasks: Vec<TaskName> = tasks.into_iter().map(Into::into).collect();

        Watcher::spawn(
            files,
            tasks,
            self.tasks.clone(),
            Arc::clone(&self.backend),
            self.watch_options,
            on_complete,
        )
    }
}

/// Sorted entry names of `dir`, each joined onto `prefix`.
fn sorted_children(dir: &Path, prefix: &Path, op: &'static str) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|e| ShellError::io(op, dir, e))?;
    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| ShellError::io(op, dir, e))?;
        names.push(entry.file_name());
    }
    names.sort();
    Ok(names.into_iter().map(|name| prefix.join(name)).collect())
}
