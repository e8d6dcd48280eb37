//! Golden tests: every `tests/fixtures/<name>.ego` must transpile to
//! `tests/fixtures/<name>_expected.go` byte for byte.

use std::path::{Path, PathBuf};

use pretty_assertions::assert_eq;

fn fixtures_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn check_fixture(name: &str) {
    let dir = fixtures_dir();
    let source = std::fs::read_to_string(dir.join(format!("{name}.ego"))).unwrap();
    let expected = std::fs::read_to_string(dir.join(format!("{name}_expected.go"))).unwrap();
    let actual = ego::transpile(&source).unwrap_or_else(|e| panic!("{name}: {}", e.located(&source, name)));
    assert_eq!(actual, expected, "fixture {name}");
}

#[test]
fn simple() {
    check_fixture("simple");
}

#[test]
fn multiple_questions() {
    check_fixture("multiple_questions");
}

#[test]
fn return_types() {
    check_fixture("return_types");
}

#[test]
fn conditional() {
    check_fixture("conditional");
}

#[test]
fn closure() {
    check_fixture("closure");
}

#[test]
fn comments() {
    check_fixture("comments");
}

/// Picks up fixtures added without a dedicated test above.
#[test]
fn every_fixture_has_a_matching_expectation() {
    let mut seen = 0;
    let mut entries: Vec<_> = std::fs::read_dir(fixtures_dir())
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "ego"))
        .collect();
    entries.sort();
    for path in entries {
        let name = path.file_stem().unwrap().to_string_lossy().to_string();
        check_fixture(&name);
        seen += 1;
    }
    assert!(seen >= 6, "expected at least six fixtures, found {seen}");
}

#[test]
fn expected_outputs_are_printer_fixed_points() {
    let dir = fixtures_dir();
    for name in ["simple", "multiple_questions", "return_types", "conditional", "closure", "comments"] {
        let expected = std::fs::read_to_string(dir.join(format!("{name}_expected.go"))).unwrap();
        let reprinted = ego::transpile(&expected).unwrap();
        assert_eq!(reprinted, expected, "fixture {name}");
    }
}
