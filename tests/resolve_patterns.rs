// tests/resolve_patterns.rs

use std::path::PathBuf;

use shellwatch::errors::ShellError;
use shellwatch::fs::RealFileSystem;
use shellwatch::resolve::{PathPattern, PathResolver};
use shellwatch_test_utils::builders::FixtureTree;

fn paths(items: &[&str]) -> Vec<PathBuf> {
    items.iter().map(PathBuf::from).collect()
}

#[test]
fn recursive_glob_is_lexical_and_depth_first() {
    let tree = FixtureTree::new();
    let shell = tree.shell();

    assert_eq!(
        shell.glob("**/*.txt").unwrap(),
        paths(&["TESTDATA.txt", "lib/main.txt", "lib/util.txt"])
    );
    assert!(shell.glob("**/cat.jpg").unwrap().is_empty());
}

#[test]
fn token_order_is_preserved_across_a_list() {
    let tree = FixtureTree::new();
    let shell = tree.shell();

    assert_eq!(
        shell.glob(["bin/*", "TESTDATA.*"]).unwrap(),
        paths(&["bin/app", "TESTDATA.txt"])
    );
}

#[test]
fn the_same_path_from_two_tokens_is_listed_once() {
    let tree = FixtureTree::new();
    let shell = tree.shell();

    assert_eq!(
        shell.glob(["$main", "lib/*.txt", "lib/main.txt"]).unwrap(),
        paths(&["lib/main.txt", "lib/util.txt"])
    );
}

#[test]
fn ls_replaces_directories_with_their_children() {
    let tree = FixtureTree::new();
    let shell = tree.shell();

    let mut expected = vec!["TESTDATA.txt", "bin/app"];
    if cfg!(unix) {
        expected.push("lib/linkmain");
    }
    expected.extend(["lib/main.txt", "lib/util.txt"]);
    assert_eq!(shell.ls("*").unwrap(), paths(&expected));

    assert!(!shell.ls("~").unwrap().is_empty());
    assert_eq!(shell.ls("~").unwrap(), shell.ls("$HOME").unwrap());

    let err = shell.ls(["*.foo", "*.bar"]).unwrap_err();
    assert_eq!(err.op(), Some("listdir"));
}

#[test]
fn missing_literals_fail_with_the_calling_operation() {
    let tree = FixtureTree::new();
    let env = tree.env();
    let resolver = PathResolver::new(&env, &RealFileSystem, tree.path());

    let err = resolver
        .resolve(&PathPattern::from("lib/nope.txt"), "listdir")
        .unwrap_err();
    assert!(matches!(err, ShellError::PathNotFound { .. }));
    assert_eq!(err.op(), Some("listdir"));

    // A wildcard that matches nothing is not an error.
    assert!(
        resolver
            .resolve(&PathPattern::from("lib/*.nope"), "listdir")
            .unwrap()
            .is_empty()
    );
}

#[test]
fn unknown_variables_are_resolution_errors() {
    let tree = FixtureTree::new();
    let shell = tree.shell();

    let err = shell.glob("$nothing/*.txt").unwrap_err();
    assert!(matches!(err, ShellError::UnknownVariable { ref name, .. } if name == "nothing"));
    assert_eq!(err.op(), Some("glob"));
}

#[test]
fn absolute_patterns_resolve_to_absolute_paths() {
    let tree = FixtureTree::new();
    let shell = tree.shell();

    let pattern = format!("{}/lib/*.txt", tree.path().display());
    assert_eq!(
        shell.glob(pattern.as_str()).unwrap(),
        vec![tree.join("lib/main.txt"), tree.join("lib/util.txt")]
    );
    assert_eq!(shell.glob("~/bin/*").unwrap(), vec![tree.join("bin/app")]);
}
