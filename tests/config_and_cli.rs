// tests/config_and_cli.rs

use std::io::Write;
use std::time::Duration;

use tempfile::NamedTempFile;

use shellwatch::cli::CliArgs;
use shellwatch::config::load_and_validate;
use shellwatch::errors::ShellError;
use shellwatch::types::BackendMode;
use shellwatch_test_utils::builders::{ConfigFileBuilder, FixtureTree};

fn args(config: &std::path::Path) -> CliArgs {
    CliArgs {
        config: config.display().to_string(),
        once: false,
        task: None,
        log_level: None,
        dry_run: false,
    }
}

#[test]
fn unknown_task_in_watch_returns_config_error() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[task.A]
cmd = "echo A"

[[watch]]
pattern = "src/*.rs"
tasks = ["A", "NonExistent"]
"#
    )
    .unwrap();

    match load_and_validate(file.path()) {
        Err(ShellError::ConfigError(msg)) => {
            assert!(msg.contains("NonExistent"), "{msg}");
        }
        Err(e) => panic!("Expected ConfigError, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn unknown_fields_are_rejected_by_the_parser() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[task.A]
cmd = "echo A"
after = ["B"]
"#
    )
    .unwrap();

    assert!(matches!(load_and_validate(file.path()), Err(ShellError::TomlError(_))));
}

#[test]
fn missing_config_file_is_an_io_error() {
    let tree = FixtureTree::empty();
    let err = load_and_validate(tree.join("Shellwatch.toml")).unwrap_err();
    assert_eq!(err.op(), Some("config"));
    assert_eq!(err.io_kind(), Some(std::io::ErrorKind::NotFound));
}

#[test]
fn builder_applies_defaults_and_overrides() {
    let cfg = ConfigFileBuilder::new()
        .with_task("build", "make")
        .with_env("src", "lib")
        .with_watch(["$src/*.txt", "TESTDATA.txt"], &["build"])
        .backend(BackendMode::Poll)
        .poll_interval("250ms")
        .build();

    assert_eq!(cfg.config.quiet_window, Duration::from_millis(200));
    assert_eq!(cfg.config.poll_interval, Duration::from_millis(250));
    assert_eq!(cfg.config.backend, BackendMode::Poll);

    let err = ConfigFileBuilder::new()
        .with_task("build", "make")
        .quiet_window("0s")
        .try_build()
        .unwrap_err();
    assert!(matches!(err, ShellError::ConfigError(_)));
}

#[test]
fn shell_from_config_applies_env_and_tasks() {
    let tree = FixtureTree::new();
    let cfg = ConfigFileBuilder::new()
        .with_task("noop", "true")
        .with_env("src", "lib")
        .with_watch("$src/*.txt", &["noop"])
        .build();

    let shell = shellwatch::shell_from_config(&cfg, tree.path()).unwrap();
    assert_eq!(shell.cwd(), tree.path());
    assert!(shell.tasks().contains("noop"));
    assert_eq!(
        shell.glob(cfg.watch[0].pattern.clone()).unwrap(),
        vec![std::path::PathBuf::from("lib/main.txt"), std::path::PathBuf::from("lib/util.txt")]
    );
}

#[cfg(unix)]
mod run {
    use super::*;

    fn write_config(tree: &FixtureTree) -> std::path::PathBuf {
        tree.write(
            "Shellwatch.toml",
            r#"
[env]
src = "lib"

[task.first]
cmd = "echo first >> out.log"

[task.second]
cmd = "echo second >> out.log"

[task.broken]
cmd = "exit 7"

[[watch]]
pattern = "$src/*.txt"
tasks = ["first", "second"]

[[watch]]
pattern = "TESTDATA.txt"
tasks = ["second"]
"#,
        );
        tree.join("Shellwatch.toml")
    }

    #[tokio::test]
    async fn once_runs_every_chain_in_file_order() {
        let tree = FixtureTree::new();
        let config = write_config(&tree);

        let mut a = args(&config);
        a.once = true;
        shellwatch::run(a).await.unwrap();

        assert_eq!(tree.read("out.log"), "first\nsecond\nsecond\n");
    }

    #[tokio::test]
    async fn single_task_runs_alone() {
        let tree = FixtureTree::new();
        let config = write_config(&tree);

        let mut a = args(&config);
        a.task = Some("second".to_string());
        shellwatch::run(a).await.unwrap();
        assert_eq!(tree.read("out.log"), "second\n");

        let mut a = args(&config);
        a.task = Some("broken".to_string());
        let err = shellwatch::run(a).await.unwrap_err();
        assert!(format!("{err:#}").contains("code 7"), "{err:#}");
    }

    #[tokio::test]
    async fn dry_run_executes_nothing() {
        let tree = FixtureTree::new();
        let config = write_config(&tree);

        let mut a = args(&config);
        a.dry_run = true;
        shellwatch::run(a).await.unwrap();
        assert!(!tree.join("out.log").exists());
    }
}
