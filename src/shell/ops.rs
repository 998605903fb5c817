// src/shell/ops.rs

//! File operations on a [`Shell`]: thin wrappers over `std::fs` whose path
//! arguments go through variable and glob resolution, and whose errors carry
//! the name of the operation.

use std::fs::{self, OpenOptions};
use std::io::{self, ErrorKind, Write};
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use regex::Regex;
use tracing::debug;

use crate::errors::{Result, ShellError};
use crate::resolve::PathPattern;
use crate::shell::Shell;

/// Separator used by [`Shell::concat`] when none is given.
pub const DEFAULT_SEPARATOR: &str = "\n";

static TEMPFILE_COUNTER: AtomicU64 = AtomicU64::new(0);

fn io_err(op: &'static str, path: &Path, kind: ErrorKind) -> ShellError {
    ShellError::io(op, path, io::Error::from(kind))
}

/// Lexically normalise an absolute path (`.` dropped, `..` popped).
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}

/// Copy `src` to exactly `dst`. Directories recurse; symbolic links are
/// recreated as links pointing at the same target.
fn copy_entry(src: &Path, dst: &Path, op: &'static str) -> Result<()> {
    let meta = fs::symlink_metadata(src).map_err(|e| ShellError::io(op, src, e))?;
    let existing = fs::symlink_metadata(dst).ok();

    if meta.file_type().is_symlink() {
        if let Some(existing) = existing {
            if existing.is_dir() {
                return Err(io_err(op, dst, ErrorKind::IsADirectory));
            }
            fs::remove_file(dst).map_err(|e| ShellError::io(op, dst, e))?;
        }
        return copy_link(src, dst, op);
    }

    if meta.is_dir() {
        match existing {
            Some(existing) if !existing.is_dir() => {
                return Err(io_err(op, dst, ErrorKind::NotADirectory));
            }
            Some(_) => {}
            None => fs::create_dir(dst).map_err(|e| ShellError::io(op, dst, e))?,
        }
        let entries = fs::read_dir(src).map_err(|e| ShellError::io(op, src, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| ShellError::io(op, src, e))?;
            copy_entry(&entry.path(), &dst.join(entry.file_name()), op)?;
        }
        return Ok(());
    }

    fs::copy(src, dst).map_err(|e| ShellError::io(op, dst, e))?;
    Ok(())
}

#[cfg(unix)]
fn copy_link(src: &Path, dst: &Path, op: &'static str) -> Result<()> {
    let target = fs::read_link(src).map_err(|e| ShellError::io(op, src, e))?;
    std::os::unix::fs::symlink(&target, dst).map_err(|e| ShellError::io(op, dst, e))
}

#[cfg(not(unix))]
fn copy_link(src: &Path, dst: &Path, op: &'static str) -> Result<()> {
    fs::copy(src, dst).map_err(|e| ShellError::io(op, dst, e))?;
    Ok(())
}

fn remove_tree(path: &Path, op: &'static str) -> Result<()> {
    let meta = fs::symlink_metadata(path).map_err(|e| ShellError::io(op, path, e))?;
    let removed = if meta.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    removed.map_err(|e| ShellError::io(op, path, e))
}

impl Shell {
    /// Resolve each token on its own, skipping literals that do not exist.
    fn resolve_present(&self, pattern: PathPattern, op: &'static str) -> Result<Vec<PathBuf>> {
        let mut present = Vec::new();
        for token in pattern.tokens() {
            match self.resolve(token.as_str(), op) {
                Ok(paths) => present.extend(paths),
                Err(ShellError::PathNotFound { path, .. }) => {
                    debug!(op, path = %path.display(), "nothing to remove");
                }
                Err(err) => return Err(err),
            }
        }
        Ok(present)
    }

    /// Resolve `pattern`, failing with `NoMatch` when nothing matches.
    fn resolve_some(&self, pattern: PathPattern, op: &'static str) -> Result<Vec<PathBuf>> {
        let paths = self.resolve(pattern.clone(), op)?;
        if paths.is_empty() {
            return Err(ShellError::NoMatch {
                op,
                pattern: pattern.to_string(),
            });
        }
        Ok(paths)
    }

    /// Resolve `pattern` to a single existing path (the first match).
    fn resolve_first(&self, pattern: PathPattern, op: &'static str) -> Result<PathBuf> {
        let mut paths = self.resolve_some(pattern, op)?;
        Ok(paths.swap_remove(0))
    }

    /// Where each of `sources` lands: inside `dest` when it is a directory,
    /// otherwise `dest` itself (only allowed for a single source).
    fn destinations(&self, sources: &[PathBuf], dest: &Path, op: &'static str) -> Result<Vec<(PathBuf, PathBuf)>> {
        let dest_abs = self.absolute(dest);
        let into_dir = dest_abs.is_dir();
        if !into_dir && sources.len() > 1 {
            return Err(io_err(op, dest, ErrorKind::NotADirectory));
        }

        sources
            .iter()
            .map(|src| {
                let src_abs = normalize(&self.absolute(src));
                let target = if into_dir {
                    let name = src_abs
                        .file_name()
                        .ok_or_else(|| io_err(op, src, ErrorKind::ResourceBusy))?;
                    dest_abs.join(name)
                } else {
                    dest_abs.clone()
                };
                Ok((src_abs, target))
            })
            .collect()
    }

    /// Create `path` and any missing parents. An existing directory is fine.
    pub fn mkdir(&self, path: impl Into<PathPattern>) -> Result<()> {
        for dir in self.expand_all(&path.into(), "mkdir")? {
            let abs = self.absolute(&dir);
            if let Ok(meta) = fs::metadata(&abs) {
                if meta.is_dir() {
                    continue;
                }
                return Err(io_err("mkdir", &dir, ErrorKind::AlreadyExists));
            }
            fs::create_dir_all(&abs).map_err(|e| ShellError::io("mkdir", &dir, e))?;
            debug!(path = %dir.display(), "created directory");
        }
        Ok(())
    }

    /// Copy files, directories and links to `dest`.
    pub fn copy(&self, sources: impl Into<PathPattern>, dest: &str) -> Result<()> {
        let sources = self.resolve_some(sources.into(), "copy")?;
        let dest = self.expand_one(dest, "copy")?;
        for (src, target) in self.destinations(&sources, &dest, "copy")? {
            debug!(from = %src.display(), to = %target.display(), "copy");
            copy_entry(&src, &target, "copy")?;
        }
        Ok(())
    }

    /// Rename `sources` to `dest`, or into it when it is a directory.
    pub fn move_path(&self, sources: impl Into<PathPattern>, dest: &str) -> Result<()> {
        let sources = self.resolve_some(sources.into(), "move")?;
        let dest = self.expand_one(dest, "move")?;
        for (src, target) in self.destinations(&sources, &dest, "move")? {
            if src == self.cwd || self.cwd.starts_with(&src) {
                return Err(io_err("move", &src, ErrorKind::ResourceBusy));
            }
            if normalize(&target).starts_with(&src) {
                return Err(io_err("move", &target, ErrorKind::InvalidInput));
            }

            debug!(from = %src.display(), to = %target.display(), "move");
            match fs::rename(&src, &target) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::CrossesDevices => {
                    copy_entry(&src, &target, "move")?;
                    remove_tree(&src, "move")?;
                }
                Err(e) => return Err(ShellError::io("move", &src, e)),
            }
        }
        Ok(())
    }

    /// Delete files and links. Missing paths are ignored; directories are an
    /// error.
    pub fn remove(&self, path: impl Into<PathPattern>) -> Result<()> {
        for target in self.resolve_present(path.into(), "remove")? {
            let abs = self.absolute(&target);
            let meta = fs::symlink_metadata(&abs).map_err(|e| ShellError::io("remove", &target, e))?;
            if meta.is_dir() {
                return Err(io_err("remove", &target, ErrorKind::IsADirectory));
            }
            fs::remove_file(&abs).map_err(|e| ShellError::io("remove", &target, e))?;
        }
        Ok(())
    }

    /// Delete files, links and whole directory trees. Missing paths are
    /// ignored.
    pub fn remove_recursive(&self, path: impl Into<PathPattern>) -> Result<()> {
        for target in self.resolve_present(path.into(), "remove")? {
            remove_tree(&self.absolute(target), "remove")?;
        }
        Ok(())
    }

    pub fn read_file(&self, path: impl Into<PathPattern>) -> Result<String> {
        let path = self.resolve_first(path.into(), "read")?;
        fs::read_to_string(self.absolute(&path)).map_err(|e| ShellError::io("read", path, e))
    }

    /// Replace the contents of `path`, creating it if needed.
    pub fn write_file(&self, path: &str, contents: impl AsRef<[u8]>) -> Result<()> {
        let path = self.expand_one(path, "write")?;
        fs::write(self.absolute(&path), contents).map_err(|e| ShellError::io("write", path, e))
    }

    pub fn append(&self, path: &str, contents: impl AsRef<[u8]>) -> Result<()> {
        let path = self.expand_one(path, "append")?;
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.absolute(&path))
            .and_then(|mut file| file.write_all(contents.as_ref()))
            .map_err(|e| ShellError::io("append", path, e))
    }

    pub fn prepend(&self, path: &str, contents: impl AsRef<[u8]>) -> Result<()> {
        let path = self.expand_one(path, "prepend")?;
        let abs = self.absolute(&path);
        let existing = match fs::read(&abs) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(ShellError::io("prepend", path, e)),
        };
        let mut combined = contents.as_ref().to_vec();
        combined.extend_from_slice(&existing);
        fs::write(&abs, combined).map_err(|e| ShellError::io("prepend", path, e))
    }

    /// Resolve `pattern`, read every file and join the texts with
    /// `separator` ([`DEFAULT_SEPARATOR`] when `None`).
    pub fn concat(&self, pattern: impl Into<PathPattern>, separator: Option<&str>) -> Result<String> {
        let parts = self.read_all(pattern.into())?;
        let texts = parts
            .into_iter()
            .map(|(path, bytes)| {
                String::from_utf8(bytes).map_err(|e| {
                    ShellError::io("concat", path, io::Error::new(ErrorKind::InvalidData, e))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(texts.join(separator.unwrap_or(DEFAULT_SEPARATOR)))
    }

    /// Like [`Shell::concat`] but raw bytes with no separator.
    pub fn concat_bytes(&self, pattern: impl Into<PathPattern>) -> Result<Vec<u8>> {
        Ok(self
            .read_all(pattern.into())?
            .into_iter()
            .flat_map(|(_, bytes)| bytes)
            .collect())
    }

    fn read_all(&self, pattern: PathPattern) -> Result<Vec<(PathBuf, Vec<u8>)>> {
        self.resolve_some(pattern, "concat")?
            .into_iter()
            .map(|path| {
                fs::read(self.absolute(&path))
                    .map(|bytes| (path.clone(), bytes))
                    .map_err(|e| ShellError::io("concat", path, e))
            })
            .collect()
    }

    /// Rewrite every match of `regex` in `path` with the value `f` returns
    /// for it. Returns the number of replacements.
    pub fn replace<F>(&self, path: impl Into<PathPattern>, regex: &Regex, mut f: F) -> Result<usize>
    where
        F: FnMut(&str) -> String,
    {
        let path = self.resolve_first(path.into(), "replace")?;
        let abs = self.absolute(&path);
        let text = fs::read_to_string(&abs).map_err(|e| ShellError::io("replace", &path, e))?;

        let mut count = 0;
        let replaced = regex.replace_all(&text, |caps: &regex::Captures<'_>| {
            count += 1;
            f(&caps[0])
        });
        if count > 0 {
            fs::write(&abs, replaced.as_bytes()).map_err(|e| ShellError::io("replace", &path, e))?;
        }
        Ok(count)
    }

    /// Write `contents` to a new file in the system temp directory and
    /// return its absolute path.
    ///
    /// The name is a blake3 digest of the process id, a per-process call
    /// counter and the contents, so every call gets its own file.
    pub fn tempfile(&self, contents: impl AsRef<[u8]>) -> Result<PathBuf> {
        let contents = contents.as_ref();
        let nonce = TEMPFILE_COUNTER.fetch_add(1, Ordering::Relaxed);
        let mut hasher = blake3::Hasher::new();
        hasher.update(&std::process::id().to_le_bytes());
        hasher.update(&nonce.to_le_bytes());
        hasher.update(contents);
        let digest = hasher.finalize().to_hex();
        let path = std::env::temp_dir().join(format!("shellwatch-{}", &digest[..16]));

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| ShellError::io("tempfile", &path, e))?;
        file.write_all(contents)
            .map_err(|e| ShellError::io("tempfile", &path, e))?;
        debug!(?path, "tempfile written");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::Environment;

    fn fixture() -> (tempfile::TempDir, Shell) {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("TESTDATA.txt"), "testdata").unwrap();
        fs::create_dir(dir.path().join("bin")).unwrap();
        fs::write(dir.path().join("bin/app"), "app").unwrap();
        fs::create_dir(dir.path().join("lib")).unwrap();
        fs::write(dir.path().join("lib/main.txt"), "main").unwrap();
        fs::write(dir.path().join("lib/util.txt"), "util").unwrap();

        let mut env = Environment::with_home(dir.path());
        env.set("main", "lib/main.txt");
        env.set("util", "lib/util.txt");
        let shell = Shell::in_dir(dir.path()).unwrap().with_env(env);
        (dir, shell)
    }

    #[test]
    fn normalize_drops_dot_components() {
        assert_eq!(normalize(Path::new("/a/./b/../c")), PathBuf::from("/a/c"));
    }

    #[test]
    fn mkdir_is_idempotent_but_refuses_files() {
        let (_dir, shell) = fixture();
        shell.mkdir("newdir/nested").unwrap();
        shell.mkdir("newdir/nested").unwrap();
        assert!(shell.absolute("newdir/nested").is_dir());

        let err = shell.mkdir("TESTDATA.txt").unwrap_err();
        assert_eq!(err.io_kind(), Some(ErrorKind::AlreadyExists));

        let err = shell.mkdir(Vec::<String>::new()).unwrap_err();
        assert_eq!(err.op(), Some("expand"));
    }

    #[test]
    fn move_renames_and_moves_into_directories() {
        let (_dir, shell) = fixture();
        shell.move_path("$main", "moved.txt").unwrap();
        assert_eq!(shell.read_file("moved.txt").unwrap(), "main");
        assert!(shell.not_exists("$main").unwrap());

        shell.move_path("moved.txt", "bin").unwrap();
        assert_eq!(shell.read_file("bin/moved.txt").unwrap(), "main");

        shell.move_path("bin", "lib").unwrap();
        assert_eq!(shell.read_file("lib/bin/moved.txt").unwrap(), "main");
        assert!(shell.not_exists("bin").unwrap());
    }

    #[test]
    fn move_failures_are_tagged() {
        let (_dir, shell) = fixture();
        let err = shell.move_path("not_exists_file", "foo").unwrap_err();
        assert_eq!(err.op(), Some("move"));

        let err = shell.move_path("./", "lib").unwrap_err();
        assert_eq!(err.io_kind(), Some(ErrorKind::ResourceBusy));

        let err = shell.move_path("lib", "lib").unwrap_err();
        assert_eq!(err.io_kind(), Some(ErrorKind::InvalidInput));
    }

    #[test]
    fn move_many_files_into_a_directory() {
        let (_dir, shell) = fixture();
        shell.move_path("lib/*.txt", "bin").unwrap();
        assert_eq!(
            shell.ls("bin").unwrap(),
            vec![
                PathBuf::from("bin/app"),
                PathBuf::from("bin/main.txt"),
                PathBuf::from("bin/util.txt"),
            ]
        );
    }

    #[test]
    fn copy_files_and_directories() {
        let (_dir, shell) = fixture();
        shell.copy("$main", "lib/copy.txt").unwrap();
        assert_eq!(shell.read_file("lib/copy.txt").unwrap(), "main");

        shell.copy("lib", "copylib").unwrap();
        assert_eq!(shell.read_file("copylib/main.txt").unwrap(), "main");
        shell.copy("lib", "copylib").unwrap();
        assert_eq!(shell.read_file("copylib/lib/main.txt").unwrap(), "main");

        shell.copy(["$main", "$util"], "bin").unwrap();
        assert_eq!(shell.read_file("bin/util.txt").unwrap(), "util");

        let err = shell.copy("lib", "TESTDATA.txt").unwrap_err();
        assert_eq!(err.io_kind(), Some(ErrorKind::NotADirectory));
    }

    #[cfg(unix)]
    #[test]
    fn copy_keeps_symbolic_links() {
        let (dir, shell) = fixture();
        std::os::unix::fs::symlink("main.txt", dir.path().join("lib/linkmain")).unwrap();
        std::os::unix::fs::symlink("lib", dir.path().join("linkdir")).unwrap();
        shell.mkdir("pack").unwrap();

        shell.copy(["bin", "lib", "linkdir"], "pack").unwrap();
        let link = shell.absolute("pack/lib/linkmain");
        assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
        assert_eq!(fs::read_to_string(&link).unwrap(), "main");
        assert!(fs::symlink_metadata(shell.absolute("pack/linkdir")).unwrap().file_type().is_symlink());
        assert_eq!(shell.read_file("pack/linkdir/main.txt").unwrap(), "main");

        shell.copy("linkdir", "lib/linkmain").unwrap();
        assert_eq!(fs::read_link(shell.absolute("lib/linkmain")).unwrap(), PathBuf::from("lib"));
    }

    #[test]
    fn remove_ignores_missing_and_refuses_directories() {
        let (_dir, shell) = fixture();
        shell.remove("lib/main.txt").unwrap();
        assert!(!shell.absolute("lib/main.txt").exists());
        shell.remove("not_exists_file").unwrap();

        let err = shell.remove("lib").unwrap_err();
        assert_eq!(err.io_kind(), Some(ErrorKind::IsADirectory));

        shell.remove_recursive("lib").unwrap();
        assert!(!shell.absolute("lib").exists());
        shell.remove_recursive("not_exists_dir").unwrap();
    }

    #[test]
    fn concat_joins_with_separator() {
        let (_dir, shell) = fixture();
        assert_eq!(shell.concat(["$main", "$util"], None).unwrap(), "main\nutil");
        assert_eq!(
            shell.concat(["$main", "$util"], Some("\n-----\n")).unwrap(),
            "main\n-----\nutil"
        );
        assert_eq!(shell.concat_bytes(["$main", "$util"]).unwrap(), b"mainutil");

        let err = shell.concat(["not_exists_file.*"], None).unwrap_err();
        assert_eq!(err.op(), Some("concat"));
        let err = shell.concat_bytes(["not_exists_file.*"]).unwrap_err();
        assert_eq!(err.op(), Some("concat"));
    }

    #[test]
    fn append_and_prepend() {
        let (_dir, shell) = fixture();
        shell.append("$main", "1").unwrap();
        shell.append("$main", "2").unwrap();
        assert_eq!(shell.read_file("$main").unwrap(), "main12");

        shell.prepend("$util", "2").unwrap();
        shell.prepend("$util", "1").unwrap();
        assert_eq!(shell.read_file("$util").unwrap(), "12util");
    }

    #[test]
    fn replace_passes_each_match() {
        let (_dir, shell) = fixture();
        let mut seen = Vec::new();
        let n = shell
            .replace("TESTDATA.txt", &Regex::new(".+").unwrap(), |m| {
                seen.push(m.to_string());
                "replaced".to_string()
            })
            .unwrap();
        assert_eq!(n, 1);
        shell
            .replace("TESTDATA.txt", &Regex::new("replaced").unwrap(), |m| {
                seen.push(m.to_string());
                "testdata".to_string()
            })
            .unwrap();
        assert_eq!(seen, vec!["testdata", "replaced"]);
        assert_eq!(shell.read_file("TESTDATA.txt").unwrap(), "testdata");
    }

    #[test]
    fn tempfile_round_trips_contents() {
        let (_dir, shell) = fixture();
        let path = shell.tempfile("temp").unwrap();
        assert!(path.is_absolute());
        assert_eq!(shell.read_file(path.to_string_lossy().as_ref()).unwrap(), "temp");
        fs::remove_file(path).unwrap();
    }

    #[test]
    fn tempfiles_with_equal_contents_are_distinct() {
        let (_dir, shell) = fixture();
        let first = shell.tempfile("same").unwrap();
        let second = shell.tempfile("same").unwrap();
        assert_ne!(first, second);

        fs::remove_file(&first).unwrap();
        assert_eq!(fs::read_to_string(&second).unwrap(), "same");
        fs::remove_file(second).unwrap();
    }
}
