// src/config/model.rs

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

use crate::resolve::PathPattern;
use crate::types::{BackendMode, TaskName};
use crate::watch::backend::poll::DEFAULT_POLL_INTERVAL;
use crate::watch::DEFAULT_QUIET_WINDOW;

/// Configuration as read from a TOML file, before validation.
///
/// ```toml
/// [config]
/// quiet_window = "200ms"
/// backend = "poll"
/// poll_interval = "1s"
///
/// [env]
/// src = "lib"
///
/// [task.build]
/// cmd = "make"
///
/// [[watch]]
/// pattern = ["$src/*.c", "include/*.h"]
/// tasks = ["build"]
/// ```
///
/// All sections are optional at this stage; [`ConfigFile::try_from`] rejects
/// configs that cannot run.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: RawConfigSection,

    /// Variables added to the environment before any pattern is resolved.
    #[serde(default)]
    pub env: BTreeMap<String, String>,

    /// All tasks from `[task.<name>]`, keyed by task name.
    #[serde(default)]
    pub task: BTreeMap<TaskName, TaskConfig>,

    /// `[[watch]]` entries, in file order.
    #[serde(default)]
    pub watch: Vec<WatchConfig>,
}

/// `[config]` section with durations still in their string form.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct RawConfigSection {
    #[serde(default)]
    pub quiet_window: Option<String>,

    #[serde(default)]
    pub backend: BackendMode,

    /// Only meaningful with `backend = "poll"`.
    #[serde(default)]
    pub poll_interval: Option<String>,
}

/// `[task.<name>]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskConfig {
    /// The command to execute, through `sh -c` (`cmd /C` on Windows).
    pub cmd: String,
}

/// One `[[watch]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WatchConfig {
    /// A single pattern or a list of them.
    pub pattern: PathPattern,

    /// Task names run in this order after each burst of changes.
    pub tasks: Vec<TaskName>,
}

/// Validated `[config]` section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigSection {
    pub quiet_window: Duration,
    pub backend: BackendMode,
    pub poll_interval: Duration,
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            quiet_window: DEFAULT_QUIET_WINDOW,
            backend: BackendMode::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// A configuration that passed validation.
///
/// Only constructed through `TryFrom<RawConfigFile>` (see `validate.rs`), so
/// every watch entry names known tasks and every duration is positive.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub config: ConfigSection,
    pub env: BTreeMap<String, String>,
    pub task: BTreeMap<TaskName, TaskConfig>,
    pub watch: Vec<WatchConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        config: ConfigSection,
        env: BTreeMap<String, String>,
        task: BTreeMap<TaskName, TaskConfig>,
        watch: Vec<WatchConfig>,
    ) -> Self {
        Self {
            config,
            env,
            task,
            watch,
        }
    }
}
