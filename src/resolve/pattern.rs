// src/resolve/pattern.rs

use std::fmt;

use serde::Deserialize;

/// One path token or an ordered list of them.
///
/// Tokens may reference variables (`$name`, `${name}`), start with `~`, and
/// contain glob metacharacters (`*`, `**`, `?`, `[...]`, `{a,b}`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum PathPattern {
    Single(String),
    List(Vec<String>),
}

impl PathPattern {
    /// The tokens in input order.
    pub fn tokens(&self) -> &[String] {
        match self {
            PathPattern::Single(token) => std::slice::from_ref(token),
            PathPattern::List(tokens) => tokens,
        }
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathPattern::Single(token) => f.write_str(token),
            PathPattern::List(tokens) => write!(f, "[{}]", tokens.join(", ")),
        }
    }
}

impl From<&str> for PathPattern {
    fn from(token: &str) -> Self {
        PathPattern::Single(token.to_string())
    }
}

impl From<String> for PathPattern {
    fn from(token: String) -> Self {
        PathPattern::Single(token)
    }
}

impl From<&String> for PathPattern {
    fn from(token: &String) -> Self {
        PathPattern::Single(token.clone())
    }
}

impl From<Vec<String>> for PathPattern {
    fn from(tokens: Vec<String>) -> Self {
        PathPattern::List(tokens)
    }
}

impl From<Vec<&str>> for PathPattern {
    fn from(tokens: Vec<&str>) -> Self {
        PathPattern::List(tokens.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for PathPattern {
    fn from(tokens: &[&str]) -> Self {
        PathPattern::List(tokens.iter().map(|t| t.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for PathPattern {
    fn from(tokens: [&str; N]) -> Self {
        PathPattern::List(tokens.iter().map(|t| t.to_string()).collect())
    }
}

/// Whether `token` contains glob metacharacters.
pub fn contains_glob(token: &str) -> bool {
    token.contains(['*', '?', '[', '{'])
}
