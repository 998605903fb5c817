#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use shellwatch::config::{ConfigFile, RawConfigFile, TaskConfig, WatchConfig};
use shellwatch::env::Environment;
use shellwatch::errors::Result;
use shellwatch::resolve::PathPattern;
use shellwatch::shell::Shell;
use shellwatch::types::BackendMode;
use tempfile::TempDir;

/// A scratch directory laid out like a small project:
///
/// ```text
/// <root>
/// ├── TESTDATA.txt
/// ├── bin
/// │   └── app
/// └── lib
///     ├── linkmain -> main.txt   (unix only)
///     ├── main.txt
///     └── util.txt
/// ```
///
/// The directory is removed when the fixture is dropped.
pub struct FixtureTree {
    _dir: TempDir,
    root: PathBuf,
}

impl FixtureTree {
    pub fn new() -> Self {
        let tree = Self::empty();
        tree.write("TESTDATA.txt", "testdata");
        tree.write("bin/app", "app");
        tree.write("lib/main.txt", "main");
        tree.write("lib/util.txt", "util");
        #[cfg(unix)]
        std::os::unix::fs::symlink("main.txt", tree.join("lib/linkmain"))
            .expect("creating lib/linkmain");
        tree
    }

    pub fn empty() -> Self {
        let dir = tempfile::tempdir().expect("creating temp dir");
        // Canonical so it compares equal to paths a `Shell` reports.
        let root = fs::canonicalize(dir.path()).expect("canonicalizing temp dir");
        Self { _dir: dir, root }
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn join(&self, rel: impl AsRef<Path>) -> PathBuf {
        self.root.join(rel)
    }

    /// Write `contents` to `rel`, creating parent directories.
    pub fn write(&self, rel: impl AsRef<Path>, contents: impl AsRef<[u8]>) {
        let path = self.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("creating parent dirs");
        }
        fs::write(&path, contents).expect("writing fixture file");
    }

    pub fn read(&self, rel: impl AsRef<Path>) -> String {
        fs::read_to_string(self.join(rel)).expect("reading fixture file")
    }

    /// Environment with `HOME` at the fixture root plus `$main` / `$util`.
    pub fn env(&self) -> Environment {
        let mut env = Environment::with_home(self.path());
        env.set("main", "lib/main.txt");
        env.set("util", "lib/util.txt");
        env
    }

    /// A shell rooted at the fixture, using [`FixtureTree::env`].
    pub fn shell(&self) -> Shell {
        Shell::in_dir(self.path())
            .expect("fixture root is a directory")
            .with_env(self.env())
    }
}

impl Default for FixtureTree {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn with_task(mut self, name: &str, cmd: &str) -> Self {
        self.config.task.insert(
            name.to_string(),
            TaskConfig {
                cmd: cmd.to_string(),
            },
        );
        self
    }

    pub fn with_env(mut self, name: &str, value: &str) -> Self {
        self.config.env.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_watch(mut self, pattern: impl Into<PathPattern>, tasks: &[&str]) -> Self {
        self.config.watch.push(WatchConfig {
            pattern: pattern.into(),
            tasks: tasks.iter().map(|t| t.to_string()).collect(),
        });
        self
    }

    pub fn quiet_window(mut self, value: &str) -> Self {
        self.config.config.quiet_window = Some(value.to_string());
        self
    }

    pub fn poll_interval(mut self, value: &str) -> Self {
        self.config.config.poll_interval = Some(value.to_string());
        self
    }

    pub fn backend(mut self, mode: BackendMode) -> Self {
        self.config.config.backend = mode;
        self
    }

    pub fn try_build(self) -> Result<ConfigFile> {
        ConfigFile::try_from(self.config)
    }

    pub fn build(self) -> ConfigFile {
        self.try_build()
            .expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}
