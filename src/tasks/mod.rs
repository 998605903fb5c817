// src/tasks/mod.rs

//! Name-keyed store of zero-argument task actions.
//!
//! Watchers run their task chains through a [`TaskRegistry`]; the registry is
//! cheap to clone and all clones share the same entries.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info};

use crate::errors::{Result, ShellError};
use crate::types::TaskName;

/// A registered task body.
pub type TaskAction = Arc<dyn Fn() -> anyhow::Result<()> + Send + Sync>;

#[derive(Clone, Default)]
pub struct TaskRegistry {
    tasks: Arc<Mutex<BTreeMap<TaskName, TaskAction>>>,
}

impl fmt::Debug for TaskRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskRegistry")
            .field("tasks", &self.names())
            .finish()
    }
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn tasks(&self) -> MutexGuard<'_, BTreeMap<TaskName, TaskAction>> {
        self.tasks.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Register `action` under `name`, replacing any previous action.
    pub fn register<F>(&self, name: impl Into<TaskName>, action: F)
    where
        F: Fn() -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let name = name.into();
        let replaced = self.tasks().insert(name.clone(), Arc::new(action)).is_some();
        debug!(task = %name, replaced, "registered task");
    }

    /// Run the action registered under `name`.
    ///
    /// The registry lock is released before the action runs, so actions may
    /// themselves register or run tasks.
    pub fn run(&self, name: &str) -> Result<()> {
        let action = self
            .tasks()
            .get(name)
            .cloned()
            .ok_or_else(|| ShellError::TaskNotFound(name.to_string()))?;

        info!(task = %name, "running task");
        action().map_err(|source| ShellError::TaskFailed {
            task: name.to_string(),
            source,
        })?;
        debug!(task = %name, "task finished");
        Ok(())
    }

    /// Remove every registration.
    pub fn reset(&self) {
        let mut tasks = self.tasks();
        let removed = tasks.len();
        tasks.clear();
        debug!(removed, "task registry reset");
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tasks().contains_key(name)
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<TaskName> {
        self.tasks().keys().cloned().collect()
    }
}
