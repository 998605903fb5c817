// src/resolve/mod.rs

//! Expansion of variables and glob patterns into concrete path lists.
//!
//! Resolution is a pure read of the filesystem: it never creates, moves or
//! subscribes to anything, so callers can fail fast before any side effect.

pub mod glob;
pub mod pattern;

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::{Captures, Regex};
use tracing::debug;

use crate::env::Environment;
use crate::errors::{Result, ShellError};
use crate::fs::FileSystem;

pub use pattern::{contains_glob, PathPattern};

/// Operation tag used for malformed-pattern errors.
pub const EXPAND: &str = "expand";

static VARIABLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$(?:\{([A-Za-z_][A-Za-z0-9_]*)\}|([A-Za-z_][A-Za-z0-9_]*))")
        .expect("variable reference regex is valid")
});

/// Resolves path patterns against an [`Environment`] and a working directory.
///
/// Relative tokens are interpreted against `cwd`, but resolved paths are
/// returned in the same form the token was written in (relative tokens yield
/// relative paths).
#[derive(Debug, Clone, Copy)]
pub struct PathResolver<'a> {
    env: &'a Environment,
    fs: &'a dyn FileSystem,
    cwd: &'a Path,
}

impl<'a> PathResolver<'a> {
    pub fn new(env: &'a Environment, fs: &'a dyn FileSystem, cwd: &'a Path) -> Self {
        Self { env, fs, cwd }
    }

    /// Rewrite a leading `~` and every `$name` / `${name}` reference.
    ///
    /// Unknown variables fail with [`ShellError::UnknownVariable`] tagged
    /// with `op`; an empty token is a malformed argument tagged `"expand"`.
    pub fn expand(&self, token: &str, op: &'static str) -> Result<String> {
        if token.is_empty() {
            return Err(ShellError::InvalidPattern {
                op: EXPAND,
                reason: "empty path".to_string(),
            });
        }

        let token = match token.strip_prefix('~') {
            Some(rest) if rest.is_empty() || rest.starts_with('/') => {
                format!("{}{}", self.env.home().to_string_lossy(), rest)
            }
            _ => token.to_string(),
        };

        let mut missing = None;
        let expanded = VARIABLE.replace_all(&token, |caps: &Captures<'_>| {
            let name = caps
                .get(1)
                .or_else(|| caps.get(2))
                .map(|m| m.as_str())
                .unwrap_or_default();
            match self.env.get(name) {
                Some(value) => value.to_string(),
                None => {
                    missing.get_or_insert_with(|| name.to_string());
                    String::new()
                }
            }
        });

        if let Some(name) = missing {
            return Err(ShellError::UnknownVariable { op, name });
        }
        Ok(expanded.into_owned())
    }

    /// Expand every token of `pattern` and resolve it to concrete paths.
    ///
    /// - Literal tokens must exist, otherwise [`ShellError::PathNotFound`].
    /// - Wildcard tokens yield every matching entry (files and directories),
    ///   lexically within each directory, depth first; no match is not an
    ///   error.
    /// - Per-token results are concatenated in input order; a path produced
    ///   by an earlier token is not repeated.
    pub fn resolve(&self, pattern: &PathPattern, op: &'static str) -> Result<Vec<PathBuf>> {
        let tokens = pattern.tokens();
        if tokens.is_empty() {
            return Err(ShellError::InvalidPattern {
                op: EXPAND,
                reason: "no paths given".to_string(),
            });
        }

        let mut seen = HashSet::new();
        let mut resolved = Vec::new();

        for token in tokens {
            let expanded = self.expand(token, op)?;
            let matches = if contains_glob(&expanded) {
                glob::expand_glob(self.fs, self.cwd, &expanded)?
            } else {
                let path = PathBuf::from(&expanded);
                if !self.fs.exists(&self.cwd.join(&path)) {
                    return Err(ShellError::PathNotFound { op, path });
                }
                vec![path]
            };

            debug!(%token, matches = matches.len(), "resolved path token");
            for path in matches {
                if seen.insert(path.clone()) {
                    resolved.push(path);
                }
            }
        }

        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    fn fixture() -> (Environment, MockFileSystem) {
        let mut env = Environment::with_home("/home/dev");
        env.set("main", "lib/main.txt");
        env.set("lib", "lib");

        let fs = MockFileSystem::new();
        fs.add_file("TESTDATA.txt", "testdata");
        fs.add_file("bin/app", "app");
        fs.add_file("lib/main.txt", "main");
        fs.add_file("lib/util.txt", "util");
        (env, fs)
    }

    #[test]
    fn expands_home_and_variables() {
        let (env, fs) = fixture();
        let r = PathResolver::new(&env, &fs, Path::new("."));

        assert_eq!(r.expand("~", "test").unwrap(), "/home/dev");
        assert_eq!(r.expand("~/notes", "test").unwrap(), "/home/dev/notes");
        assert_eq!(r.expand("~user/x", "test").unwrap(), "~user/x");
        assert_eq!(r.expand("$HOME", "test").unwrap(), "/home/dev");
        assert_eq!(r.expand("${lib}/*.txt", "test").unwrap(), "lib/*.txt");
        assert_eq!(r.expand("$main", "test").unwrap(), "lib/main.txt");
    }

    #[test]
    fn unknown_variable_is_tagged_with_the_calling_operation() {
        let (env, fs) = fixture();
        let r = PathResolver::new(&env, &fs, Path::new("."));

        let err = r.expand("$missing/x", "move").unwrap_err();
        assert!(matches!(err, ShellError::UnknownVariable { ref name, .. } if name == "missing"));
        assert_eq!(err.op(), Some("move"));
    }

    #[test]
    fn malformed_arguments_are_tagged_expand() {
        let (env, fs) = fixture();
        let r = PathResolver::new(&env, &fs, Path::new("."));

        let err = r.resolve(&PathPattern::List(vec![]), "listdir").unwrap_err();
        assert_eq!(err.op(), Some("expand"));
        let err = r.resolve(&PathPattern::from(""), "listdir").unwrap_err();
        assert_eq!(err.op(), Some("expand"));
    }

    #[test]
    fn literal_tokens_must_exist() {
        let (env, fs) = fixture();
        let r = PathResolver::new(&env, &fs, Path::new("."));

        assert_eq!(
            r.resolve(&PathPattern::from("$main"), "test").unwrap(),
            vec![PathBuf::from("lib/main.txt")]
        );

        let err = r.resolve(&PathPattern::from("nope.txt"), "move").unwrap_err();
        assert!(matches!(err, ShellError::PathNotFound { .. }));
        assert_eq!(err.op(), Some("move"));
    }

    #[test]
    fn wildcards_resolve_depth_first_in_lexical_order() {
        let (env, fs) = fixture();
        let r = PathResolver::new(&env, &fs, Path::new("."));

        let paths = r.resolve(&PathPattern::from("**/*.txt"), "glob").unwrap();
        assert_eq!(
            paths,
            vec![
                PathBuf::from("TESTDATA.txt"),
                PathBuf::from("lib/main.txt"),
                PathBuf::from("lib/util.txt"),
            ]
        );

        let paths = r.resolve(&PathPattern::from(["bin/*", "TESTDATA.*"]), "glob").unwrap();
        assert_eq!(paths, vec![PathBuf::from("bin/app"), PathBuf::from("TESTDATA.txt")]);
    }

    #[test]
    fn wildcard_without_matches_is_empty() {
        let (env, fs) = fixture();
        let r = PathResolver::new(&env, &fs, Path::new("."));

        assert!(r.resolve(&PathPattern::from("**/cat.jpg"), "glob").unwrap().is_empty());
        assert!(r.resolve(&PathPattern::from("nodir/*"), "glob").unwrap().is_empty());
    }

    #[test]
    fn identical_paths_from_different_tokens_collapse() {
        let (env, fs) = fixture();
        let r = PathResolver::new(&env, &fs, Path::new("."));

        let paths = r
            .resolve(&PathPattern::from(["lib/*.txt", "$main"]), "glob")
            .unwrap();
        assert_eq!(
            paths,
            vec![PathBuf::from("lib/main.txt"), PathBuf::from("lib/util.txt")]
        );
    }
}
