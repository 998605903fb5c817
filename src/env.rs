// src/env.rs

//! Variable environment used for `$NAME` and `~` expansion.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Name of the built-in home directory entry.
pub const HOME: &str = "HOME";

/// Mutable name → path mapping consulted by the path resolver.
///
/// Always contains a [`HOME`] entry. Callers add their own entries before
/// resolving patterns that reference them:
///
/// ```
/// use shellwatch::env::Environment;
///
/// let mut env = Environment::with_home("/home/dev");
/// env.set("main", "lib/main.txt");
/// assert_eq!(env.get("main"), Some("lib/main.txt"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    vars: BTreeMap<String, String>,
}

impl Environment {
    /// Environment containing only `HOME`, taken from the process (`$HOME`),
    /// falling back to `/tmp` when unset.
    pub fn new() -> Self {
        let home = std::env::var(HOME).unwrap_or_else(|_| "/tmp".to_string());
        Self::with_home(home)
    }

    /// Environment containing only `HOME`, set to `home`.
    pub fn with_home(home: impl AsRef<Path>) -> Self {
        let mut vars = BTreeMap::new();
        vars.insert(HOME.to_string(), home.as_ref().to_string_lossy().into_owned());
        Self { vars }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl AsRef<Path>) {
        self.vars.insert(
            name.into(),
            value.as_ref().to_string_lossy().into_owned(),
        );
    }

    /// Remove an entry. The home entry cannot be removed, only overwritten.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        if name == HOME {
            return None;
        }
        self.vars.remove(name)
    }

    pub fn home(&self) -> PathBuf {
        PathBuf::from(self.get(HOME).unwrap_or("/tmp"))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}
