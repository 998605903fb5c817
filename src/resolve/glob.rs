// src/resolve/glob.rs

//! Wildcard expansion by walking the directory tree.

use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobMatcher};
use tracing::{debug, warn};

use crate::errors::{Result, ShellError};
use crate::fs::FileSystem;
use crate::resolve::{contains_glob, EXPAND};

/// A wildcard token split into the literal directory prefix to start walking
/// from and the pattern to match below it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitGlob {
    pub base: PathBuf,
    pub rest: String,
}

/// Split `pattern` at its first component containing a metacharacter.
///
/// `"lib/**/*.rs"` → base `lib`, rest `**/*.rs`; `"/tmp/*"` → base `/tmp`.
pub fn split_glob(pattern: &str) -> SplitGlob {
    let components: Vec<&str> = pattern.split('/').collect();
    let first_glob = components
        .iter()
        .position(|c| contains_glob(c))
        .unwrap_or(components.len());

    let mut base = components[..first_glob].join("/");
    if base.is_empty() && pattern.starts_with('/') {
        base.push('/');
    }

    SplitGlob {
        base: PathBuf::from(base),
        rest: components[first_glob..].join("/"),
    }
}

struct Walk<'a> {
    fs: &'a dyn FileSystem,
    matcher: GlobMatcher,
    base: PathBuf,
    max_depth: usize,
    include_hidden: bool,
}

impl Walk<'_> {
    fn visit(&self, dir: &Path, rel: &Path, depth: usize, out: &mut Vec<PathBuf>) {
        let mut entries = match self.fs.read_dir(dir) {
            Ok(entries) => entries,
            Err(err) => {
                warn!(?dir, error = %err, "skipping unreadable directory during glob");
                return;
            }
        };
        entries.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

        for path in entries {
            let Some(name) = path.file_name() else {
                continue;
            };
            if !self.include_hidden && name.to_string_lossy().starts_with('.') {
                continue;
            }

            let rel_child = rel.join(name);
            let rel_str = rel_child.to_string_lossy().replace('\\', "/");
            if self.matcher.is_match(&rel_str) {
                out.push(self.base.join(&rel_child));
            }

            // Symlinked directories are listed but not descended into.
            if depth + 1 < self.max_depth && self.fs.is_dir(&path) && !self.fs.is_symlink(&path) {
                self.visit(&path, &rel_child, depth + 1, out);
            }
        }
    }
}

/// Expand a single (already variable-expanded) wildcard token.
///
/// Returns matches in pre-order: lexical within a directory, a directory's
/// matches before those of its subdirectories. Entries whose name starts
/// with `.` only match when the pattern itself names a dot-component.
pub fn expand_glob(fs: &dyn FileSystem, cwd: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let SplitGlob { base, rest } = split_glob(pattern);

    let matcher = GlobBuilder::new(&rest)
        .literal_separator(true)
        .build()
        .map_err(|e| ShellError::InvalidPattern {
            op: EXPAND,
            reason: format!("{pattern}: {e}"),
        })?
        .compile_matcher();

    let root = cwd.join(&base);
    if !fs.is_dir(&root) {
        debug!(?root, %pattern, "glob base is not a directory; no matches");
        return Ok(Vec::new());
    }

    let walk = Walk {
        fs,
        matcher,
        base,
        max_depth: if rest.contains("**") {
            usize::MAX
        } else {
            rest.split('/').count()
        },
        include_hidden: rest.split('/').any(|c| c.starts_with('.')),
    };

    let mut out = Vec::new();
    walk.visit(&root, Path::new(""), 0, &mut out);
    Ok(out)
}
