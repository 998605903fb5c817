// tests/shell_session.rs

use std::io::ErrorKind;

use shellwatch::errors::ShellError;
use shellwatch_test_utils::builders::FixtureTree;
use shellwatch_test_utils::recorder::CallRecorder;

#[test]
fn shells_do_not_share_tasks_or_baselines() {
    let tree = FixtureTree::new();
    let first = tree.shell();
    let second = tree.shell();

    let recorder = CallRecorder::new();
    recorder.register(first.tasks(), "A");

    first.run_task("A").unwrap();
    assert!(matches!(second.run_task("A"), Err(ShellError::TaskNotFound(_))));

    assert!(first.modified("$main").unwrap());
    assert!(!first.modified("$main").unwrap());
    assert!(second.modified("$main").unwrap());
    assert_eq!(recorder.calls(), vec!["A"]);
}

#[test]
fn reset_isolates_sessions() {
    let tree = FixtureTree::new();
    let shell = tree.shell();
    let recorder = CallRecorder::new();
    recorder.register(shell.tasks(), "A");

    shell.reset();
    let err = shell.run_task("A").unwrap_err();
    assert!(matches!(err, ShellError::TaskNotFound(ref name) if name == "A"));
}

#[test]
fn modified_sees_writes_and_recreation() {
    let tree = FixtureTree::new();
    let shell = tree.shell();

    assert!(shell.modified("$main").unwrap());
    assert!(!shell.modified("$main").unwrap());

    let file = std::fs::File::options()
        .append(true)
        .open(tree.join("lib/main.txt"))
        .unwrap();
    file.set_modified(std::time::SystemTime::now() + std::time::Duration::from_secs(60))
        .unwrap();
    assert!(shell.modified("$main").unwrap());
    assert!(!shell.modified("$main").unwrap());

    shell.remove("$main").unwrap();
    assert!(shell.modified("$main").unwrap());
    shell.write_file("$main", "again").unwrap();
    assert!(shell.modified("$main").unwrap());
}

#[test]
fn navigation_changes_how_relative_paths_resolve() {
    let tree = FixtureTree::new();
    let mut shell = tree.shell();

    shell.pushd("lib").unwrap();
    assert_eq!(shell.read_file("util.txt").unwrap(), "util");
    shell.popd().unwrap();

    shell.chdir("~").unwrap();
    assert_eq!(shell.cwd(), tree.path());
    assert_eq!(shell.read_file("lib/util.txt").unwrap(), "util");
}

#[test]
fn file_operations_keep_their_error_kinds() {
    let tree = FixtureTree::new();
    let shell = tree.shell();

    let err = shell.remove("lib").unwrap_err();
    assert_eq!(err.op(), Some("remove"));
    assert_eq!(err.io_kind(), Some(ErrorKind::IsADirectory));

    let err = shell.mkdir("TESTDATA.txt").unwrap_err();
    assert_eq!(err.io_kind(), Some(ErrorKind::AlreadyExists));

    let err = shell.copy("lib", "TESTDATA.txt").unwrap_err();
    assert_eq!(err.op(), Some("copy"));
    assert_eq!(err.io_kind(), Some(ErrorKind::NotADirectory));

    let err = shell.concat("*.nothing", None).unwrap_err();
    assert!(matches!(err, ShellError::NoMatch { op: "concat", .. }));
}

#[test]
fn build_style_script() {
    let tree = FixtureTree::new();
    let shell = tree.shell();

    shell.mkdir("dist").unwrap();
    let bundle = shell.concat("lib/*.txt", Some("\n--\n")).unwrap();
    shell.write_file("dist/bundle.txt", &bundle).unwrap();
    shell.prepend("dist/bundle.txt", "// header\n").unwrap();
    shell.append("dist/bundle.txt", "\n// footer").unwrap();

    assert_eq!(
        tree.read("dist/bundle.txt"),
        "// header\nmain\n--\nutil\n// footer"
    );

    shell.copy("dist", "release").unwrap();
    shell.remove_recursive("dist").unwrap();
    assert!(shell.not_exists("dist").unwrap());
    assert!(shell.exists("release/bundle.txt").unwrap());
}
