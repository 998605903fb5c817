// src/config/mod.rs

//! Configuration loading and validation for the `shellwatch` binary.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate that watch entries only name known tasks and that timing
//!   values are usable (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path, DEFAULT_CONFIG_FILE};
pub use model::{ConfigFile, ConfigSection, RawConfigFile, RawConfigSection, TaskConfig, WatchConfig};
