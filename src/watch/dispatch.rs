// src/watch/dispatch.rs

use std::time::Instant;

use tracing::{error, info};

use crate::errors::Result;
use crate::tasks::TaskRegistry;
use crate::types::TaskName;

/// Run `tasks` in order, each to completion before the next starts.
///
/// The first failing (or unknown) task aborts the chain and its error is
/// returned; later tasks do not run.
pub fn run_chain(registry: &TaskRegistry, tasks: &[TaskName]) -> Result<()> {
    let started = Instant::now();
    for (idx, name) in tasks.iter().enumerate() {
        if let Err(err) = registry.run(name) {
            error!(
                task = %name,
                skipped = tasks.len() - idx - 1,
                error = %err,
                "task chain aborted"
            );
            return Err(err);
        }
    }
    info!(
        tasks = tasks.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "task chain finished"
    );
    Ok(())
}
