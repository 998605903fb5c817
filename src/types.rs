use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

/// Canonical task name type.
pub type TaskName = String;

/// Which change-notification backend a watcher subscribes through.
///
/// - `Native`: OS file-system events via `notify` (inotify, FSEvents, ...).
/// - `Poll`: periodic modification-time checks; works on filesystems where
///   native events are unreliable (network mounts, some containers).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendMode {
    Native,
    Poll,
}

impl Default for BackendMode {
    fn default() -> Self {
        BackendMode::Native
    }
}

impl FromStr for BackendMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "native" => Ok(BackendMode::Native),
            "poll" => Ok(BackendMode::Poll),
            other => Err(format!(
                "invalid backend: {other} (expected \"native\" or \"poll\")"
            )),
        }
    }
}

/// Parse a duration string such as `"200ms"`, `"3s"`, `"1m"` or `"2h"`.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| "duration missing unit suffix".to_string())?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{}': {}", num_part, e))?;
    let unit = unit_part.trim().to_lowercase();

    match unit.as_str() {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        "m" => Ok(Duration::from_secs(value * 60)),
        "h" => Ok(Duration::from_secs(value * 60 * 60)),
        _ => Err(format!(
            "unsupported duration unit '{}'; expected ms, s, m, or h",
            unit
        )),
    }
}
