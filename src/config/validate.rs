// src/config/validate.rs

use std::time::Duration;

use crate::config::model::{ConfigFile, ConfigSection, RawConfigFile, RawConfigSection};
use crate::errors::{Result, ShellError};
use crate::types::parse_duration;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = ShellError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        ensure_has_tasks(&raw)?;
        let config = validate_global_config(&raw.config)?;
        validate_watch_entries(&raw)?;
        Ok(ConfigFile::new_unchecked(config, raw.env, raw.task, raw.watch))
    }
}

fn ensure_has_tasks(cfg: &RawConfigFile) -> Result<()> {
    if cfg.task.is_empty() {
        return Err(ShellError::ConfigError(
            "config must contain at least one [task.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn positive_duration(field: &str, value: Option<&str>, default: Duration) -> Result<Duration> {
    let Some(value) = value else {
        return Ok(default);
    };
    let duration = parse_duration(value)
        .map_err(|e| ShellError::ConfigError(format!("[config].{field}: {e}")))?;
    if duration.is_zero() {
        return Err(ShellError::ConfigError(format!(
            "[config].{field} must be greater than zero (got '{value}')"
        )));
    }
    Ok(duration)
}

fn validate_global_config(raw: &RawConfigSection) -> Result<ConfigSection> {
    let defaults = ConfigSection::default();
    Ok(ConfigSection {
        quiet_window: positive_duration(
            "quiet_window",
            raw.quiet_window.as_deref(),
            defaults.quiet_window,
        )?,
        backend: raw.backend,
        poll_interval: positive_duration(
            "poll_interval",
            raw.poll_interval.as_deref(),
            defaults.poll_interval,
        )?,
    })
}

fn validate_watch_entries(cfg: &RawConfigFile) -> Result<()> {
    for (idx, entry) in cfg.watch.iter().enumerate() {
        let tokens = entry.pattern.tokens();
        if tokens.is_empty() || tokens.iter().any(|t| t.trim().is_empty()) {
            return Err(ShellError::ConfigError(format!(
                "watch entry #{} has an empty pattern",
                idx + 1
            )));
        }
        if entry.tasks.is_empty() {
            return Err(ShellError::ConfigError(format!(
                "watch entry #{} ({}) has no tasks",
                idx + 1,
                entry.pattern
            )));
        }
        for name in &entry.tasks {
            if !cfg.task.contains_key(name) {
                return Err(ShellError::ConfigError(format!(
                    "watch entry #{} ({}) references unknown task '{}'",
                    idx + 1,
                    entry.pattern,
                    name
                )));
            }
        }
    }
    Ok(())
}
