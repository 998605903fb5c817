// src/fs/mock.rs

use super::FileSystem;
use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, SystemTime};

#[derive(Debug, Clone)]
pub enum MockEntry {
    File {
        content: Vec<u8>,
        modified: SystemTime,
    },
    Dir(Vec<String>), // List of child names
}

#[derive(Debug, Default)]
struct MockState {
    entries: HashMap<PathBuf, MockEntry>,
    /// Logical clock: every write advances it by one second so modification
    /// times are distinct without sleeping.
    clock: u64,
}

/// In-memory filesystem for tests.
///
/// Paths are normalised by dropping `.` components, so `"./lib/a.txt"` and
/// `"lib/a.txt"` name the same entry. The root is `"."`.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    state: Arc<Mutex<MockState>>,
}

fn key(path: &Path) -> PathBuf {
    let normalised: PathBuf = path
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect();
    if normalised.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        normalised
    }
}

fn parent_key(path: &Path) -> Option<PathBuf> {
    if path == Path::new(".") {
        return None;
    }
    match path.parent() {
        Some(p) if p.as_os_str().is_empty() => Some(PathBuf::from(".")),
        Some(p) => Some(p.to_path_buf()),
        None => None,
    }
}

impl MockFileSystem {
    pub fn new() -> Self {
        let fs = Self::default();
        fs.lock()
            .entries
            .insert(PathBuf::from("."), MockEntry::Dir(Vec::new()));
        fs
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let path = key(path.as_ref());
        let mut state = self.lock();
        state.clock += 1;
        let modified = SystemTime::UNIX_EPOCH + Duration::from_secs(state.clock);
        state.entries.insert(
            path.clone(),
            MockEntry::File {
                content: content.into(),
                modified,
            },
        );
        if let Some(parent) = parent_key(&path) {
            Self::ensure_dir_entry(&mut state.entries, &parent);
            Self::link_child(&mut state.entries, &parent, &path);
        }
    }

    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let path = key(path.as_ref());
        let mut state = self.lock();
        Self::ensure_dir_entry(&mut state.entries, &path);
    }

    /// Remove a file or an (empty or not) directory entry.
    pub fn remove(&self, path: impl AsRef<Path>) {
        let path = key(path.as_ref());
        let mut state = self.lock();
        state.entries.retain(|p, _| !p.starts_with(&path));
        if let (Some(parent), Some(name)) = (parent_key(&path), path.file_name()) {
            if let Some(MockEntry::Dir(children)) = state.entries.get_mut(&parent) {
                let name = name.to_string_lossy();
                children.retain(|c| c.as_str() != name);
            }
        }
    }

    /// Overwrite the modification time of an existing file.
    pub fn set_modified(&self, path: impl AsRef<Path>, time: SystemTime) {
        let path = key(path.as_ref());
        let mut state = self.lock();
        if let Some(MockEntry::File { modified, .. }) = state.entries.get_mut(&path) {
            *modified = time;
        }
    }

    /// Content of a file entry, `None` for directories and missing paths.
    pub fn contents(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        match self.lock().entries.get(&key(path.as_ref())) {
            Some(MockEntry::File { content, .. }) => Some(content.clone()),
            _ => None,
        }
    }

    fn ensure_dir_entry(entries: &mut HashMap<PathBuf, MockEntry>, path: &Path) {
        if entries.contains_key(path) {
            return;
        }
        entries.insert(path.to_path_buf(), MockEntry::Dir(Vec::new()));
        if let Some(parent) = parent_key(path) {
            Self::ensure_dir_entry(entries, &parent);
            Self::link_child(entries, &parent, path);
        }
    }

    fn link_child(entries: &mut HashMap<PathBuf, MockEntry>, parent: &Path, child: &Path) {
        if let Some(MockEntry::Dir(children)) = entries.get_mut(parent) {
            if let Some(name) = child.file_name().and_then(|n| n.to_str()) {
                if !children.iter().any(|c| c == name) {
                    children.push(name.to_string());
                }
            }
        }
    }
}

impl FileSystem for MockFileSystem {
    fn exists(&self, path: &Path) -> bool {
        self.lock().entries.contains_key(&key(path))
    }

    fn is_dir(&self, path: &Path) -> bool {
        matches!(self.lock().entries.get(&key(path)), Some(MockEntry::Dir(_)))
    }

    fn is_symlink(&self, _path: &Path) -> bool {
        false
    }

    fn modified(&self, path: &Path) -> Option<SystemTime> {
        match self.lock().entries.get(&key(path)) {
            Some(MockEntry::File { modified, .. }) => Some(*modified),
            Some(MockEntry::Dir(_)) => Some(SystemTime::UNIX_EPOCH),
            None => None,
        }
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let state = self.lock();
        let dir = key(path);
        match state.entries.get(&dir) {
            Some(MockEntry::Dir(children)) => Ok(children
                .iter()
                .map(|name| {
                    if dir == Path::new(".") {
                        PathBuf::from(name)
                    } else {
                        dir.join(name)
                    }
                })
                .collect()),
            _ => Err(anyhow!("Not a directory or not found: {:?}", path)),
        }
    }
}
