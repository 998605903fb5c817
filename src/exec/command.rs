// src/exec/command.rs

//! Shell-command task actions.

use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::time::Instant;

use anyhow::{bail, Context, Result};
use tracing::{debug, info};

use crate::tasks::TaskAction;

/// Build the platform shell invocation for `cmd`.
fn shell_command(cmd: &str) -> Command {
    if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(cmd);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(cmd);
        c
    }
}

/// Run `cmd` through the platform shell in `cwd` and wait for it.
///
/// Output is captured; stdout is logged at debug and stderr is folded into
/// the error when the command exits unsuccessfully.
pub fn run_shell(name: &str, cmd: &str, cwd: &Path) -> Result<()> {
    info!(task = %name, %cmd, cwd = %cwd.display(), "starting task process");
    let started = Instant::now();

    let Output {
        status,
        stdout,
        stderr,
    } = shell_command(cmd)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .output()
        .with_context(|| format!("spawning process for task '{name}'"))?;

    for line in String::from_utf8_lossy(&stdout).lines() {
        debug!(task = %name, "stdout: {}", line);
    }

    let code = status.code().unwrap_or(-1);
    info!(
        task = %name,
        exit_code = code,
        success = status.success(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "task process exited"
    );

    if !status.success() {
        let stderr = String::from_utf8_lossy(&stderr);
        let stderr = stderr.trim();
        if stderr.is_empty() {
            bail!("command `{cmd}` exited with code {code}");
        }
        bail!("command `{cmd}` exited with code {code}: {stderr}");
    }
    Ok(())
}

/// A [`TaskAction`] that runs `cmd` in `cwd` every time the task fires.
pub fn shell_action(name: impl Into<String>, cmd: impl Into<String>, cwd: impl Into<PathBuf>) -> TaskAction {
    let name = name.into();
    let cmd = cmd.into();
    let cwd = cwd.into();
    std::sync::Arc::new(move || run_shell(&name, &cmd, &cwd))
}
