// src/exec/mod.rs

//! Process execution layer.
//!
//! Tasks declared in the config file are shell commands; [`command`] turns
//! each one into a [`TaskAction`](crate::tasks::TaskAction) that runs it via
//! `sh -c` (`cmd /C` on Windows) and fails on a non-zero exit status.

pub mod command;

pub use command::{run_shell, shell_action};
