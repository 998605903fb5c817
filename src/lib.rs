// src/lib.rs

pub mod cli;
pub mod config;
pub mod env;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod resolve;
pub mod shell;
pub mod tasks;
pub mod types;
pub mod watch;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, error, info};

use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::config::model::ConfigFile;
use crate::env::Environment;
use crate::shell::Shell;
use crate::watch::dispatch::run_chain;
use crate::watch::{backend_for, WatchOptions, Watcher};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - a [`Shell`] rooted at the config file's directory, with `[env]` applied
///   and every `[task.<name>]` registered as a shell command
/// - one watcher per `[[watch]]` entry (or a single pass with `--once`)
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)
        .with_context(|| format!("loading config {}", config_path.display()))?;

    let shell = shell_from_config(&cfg, &config_root_dir(&config_path))?;

    if args.dry_run {
        print_dry_run(&cfg, &shell);
        return Ok(());
    }

    if let Some(name) = args.task {
        let registry = shell.tasks().clone();
        tokio::task::spawn_blocking(move || registry.run(&name)).await??;
        return Ok(());
    }

    if args.once {
        for entry in &cfg.watch {
            let registry = shell.tasks().clone();
            let tasks = entry.tasks.clone();
            tokio::task::spawn_blocking(move || run_chain(&registry, &tasks)).await??;
        }
        return Ok(());
    }

    let mut watchers = Vec::with_capacity(cfg.watch.len());
    for entry in &cfg.watch {
        let watcher = shell
            .watch(entry.pattern.clone(), entry.tasks.clone(), report_batch)
            .with_context(|| format!("starting watch for {}", entry.pattern))?;
        watchers.push(watcher);
    }
    info!(watchers = watchers.len(), "watching; press Ctrl-C to stop");

    tokio::signal::ctrl_c()
        .await
        .context("listening for Ctrl-C")?;

    info!("shutdown requested");
    for watcher in &watchers {
        watcher.close();
        for failure in watcher.take_failures() {
            error!(error = %failure, "unreported task failure");
        }
    }
    Ok(())
}

/// Completion callback used by the binary: log what changed in the batch.
fn report_batch(watcher: &Watcher) {
    let modified = watcher.take_modified_files();
    info!(
        changed = modified.len(),
        files = ?modified,
        tasks = ?watcher.tasks(),
        "batch complete"
    );
}

/// Build the scripting context described by a validated config.
pub fn shell_from_config(cfg: &ConfigFile, root: &Path) -> Result<Shell> {
    let mut env = Environment::new();
    for (name, value) in &cfg.env {
        env.set(name.as_str(), value);
    }

    let shell = Shell::in_dir(root)?
        .with_env(env)
        .with_backend(backend_for(cfg.config.backend, cfg.config.poll_interval))
        .with_watch_options(WatchOptions {
            quiet_window: cfg.config.quiet_window,
        });

    for (name, task) in &cfg.task {
        shell.task_command(name.as_str(), task.cmd.as_str());
    }
    debug!(tasks = cfg.task.len(), root = %shell.cwd().display(), "shell configured");
    Ok(shell)
}

/// Figure out the directory patterns and commands are relative to.
///
/// - If the config path has a non-empty parent (e.g. "configs/Shellwatch.toml"),
///   we use that directory.
/// - If it's just a bare filename like "Shellwatch.toml" (parent = ""),
///   we fall back to the current working directory "."
fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

/// Simple dry-run output: print settings, tasks and what each watch entry
/// resolves to right now.
fn print_dry_run(cfg: &ConfigFile, shell: &Shell) {
    println!("shellwatch dry-run");
    println!("  root = {}", shell.cwd().display());
    println!("  config.quiet_window = {:?}", cfg.config.quiet_window);
    println!("  config.backend = {:?}", cfg.config.backend);
    println!("  config.poll_interval = {:?}", cfg.config.poll_interval);
    println!();

    if !cfg.env.is_empty() {
        println!("env ({}):", cfg.env.len());
        for (name, value) in &cfg.env {
            println!("  ${name} = {value}");
        }
        println!();
    }

    println!("tasks ({}):", cfg.task.len());
    for (name, task) in &cfg.task {
        println!("  - {name}");
        println!("      cmd: {}", task.cmd);
    }
    println!();

    println!("watch ({}):", cfg.watch.len());
    for entry in &cfg.watch {
        println!("  - {}", entry.pattern);
        println!("      tasks: {:?}", entry.tasks);
        match shell.glob(entry.pattern.clone()) {
            Ok(files) => {
                for file in files {
                    println!("      file: {}", file.display());
                }
            }
            Err(err) => println!("      error: {err}"),
        }
    }

    debug!("dry-run complete (no execution)");
}
