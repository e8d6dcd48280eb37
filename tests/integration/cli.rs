//! Drives the `ego` binary end to end: discovery, output modes, config.

mod common;

use common::{assert_failure, assert_success, stderr, stdout, Project};
use pretty_assertions::assert_eq;

const SIMPLE: &str = include_str!("../fixtures/simple.ego");
const SIMPLE_EXPECTED: &str = include_str!("../fixtures/simple_expected.go");

const BAD_RESULT: &str = "package main\n\nfunc f() (map[string]int, error) {\n\tv := g()?\n\treturn v, nil\n}\n";

#[test]
fn writes_output_next_to_input() {
    let project = Project::new();
    project.file("main.ego", SIMPLE);

    let output = project.run(&["main.ego"]);
    assert_success(&output);
    assert_eq!(stdout(&output), "Transpiled: main.ego -> main.go\n");
    assert_eq!(project.read("main.go"), SIMPLE_EXPECTED);
}

#[test]
fn several_files_in_argument_order() {
    let project = Project::new();
    project.file("b.ego", SIMPLE).file("a.ego", SIMPLE);

    let output = project.run(&["b.ego", "a.ego"]);
    assert_success(&output);
    assert_eq!(stdout(&output), "Transpiled: b.ego -> b.go\nTranspiled: a.ego -> a.go\n");
    assert!(project.exists("a.go") && project.exists("b.go"));
}

#[test]
fn directory_argument_is_not_recursive() {
    let project = Project::new();
    project
        .file("pkg/one.ego", SIMPLE)
        .file("pkg/readme.txt", "not go")
        .file("pkg/nested/two.ego", SIMPLE);

    let output = project.run(&["pkg"]);
    assert_success(&output);
    assert!(project.exists("pkg/one.go"));
    assert!(!project.exists("pkg/nested/two.go"));
    assert!(!project.exists("pkg/readme.go"));
}

#[test]
fn recursive_pattern_walks_subdirectories() {
    let project = Project::new();
    project
        .file("pkg/one.ego", SIMPLE)
        .file("pkg/nested/two.ego", SIMPLE)
        .file("pkg/nested/deeper/three.ego", SIMPLE);

    let output = project.run(&["pkg/..."]);
    assert_success(&output);
    for rel in ["pkg/one.go", "pkg/nested/two.go", "pkg/nested/deeper/three.go"] {
        assert_eq!(project.read(rel), SIMPLE_EXPECTED, "{rel}");
    }
}

#[test]
fn non_source_file_is_rejected() {
    let project = Project::new();
    project.file("main.go", "package main\n");

    let output = project.run(&["main.go"]);
    assert_failure(&output);
    assert!(stderr(&output).contains("file must have .ego extension"), "{}", stderr(&output));
}

#[test]
fn missing_path_is_reported() {
    let project = Project::new();
    let output = project.run(&["nope.ego"]);
    assert_failure(&output);
    assert!(stderr(&output).contains("could not access"), "{}", stderr(&output));
}

#[test]
fn failure_leaves_no_output_file() {
    let project = Project::new();
    project.file("bad.ego", BAD_RESULT);

    let output = project.run(&["bad.ego"]);
    assert_failure(&output);
    assert!(stderr(&output).contains("unhandled result type: map[string]int"), "{}", stderr(&output));
    assert!(!project.exists("bad.go"));
}

#[test]
fn processing_stops_at_first_failure() {
    let project = Project::new();
    project.file("a.ego", BAD_RESULT).file("b.ego", SIMPLE);

    let output = project.run(&["a.ego", "b.ego"]);
    assert_failure(&output);
    assert!(!project.exists("b.go"));
}

#[test]
fn check_mode_writes_nothing() {
    let project = Project::new();
    project.file("main.ego", SIMPLE);

    let output = project.run(&["--check", "main.ego"]);
    assert_success(&output);
    assert_eq!(stdout(&output), "");
    assert!(!project.exists("main.go"));

    project.file("bad.ego", BAD_RESULT);
    assert_failure(&project.run(&["--check", "bad.ego"]));
}

#[test]
fn stdout_mode_prints_instead_of_writing() {
    let project = Project::new();
    project.file("main.ego", SIMPLE);

    let output = project.run(&["--stdout", "main.ego"]);
    assert_success(&output);
    assert_eq!(stdout(&output), SIMPLE_EXPECTED);
    assert!(!project.exists("main.go"));
}

#[test]
fn check_and_stdout_conflict() {
    let project = Project::new();
    project.file("main.ego", SIMPLE);
    let output = project.run(&["--check", "--stdout", "main.ego"]);
    assert!(!output.status.success());
}

#[test]
fn stdin_is_transpiled_to_stdout() {
    let project = Project::new();
    let output = project.run_stdin(&[], SIMPLE);
    assert_success(&output);
    assert_eq!(stdout(&output), SIMPLE_EXPECTED);
}

#[test]
fn stdin_failure_prints_nothing() {
    let project = Project::new();
    let output = project.run_stdin(&[], BAD_RESULT);
    assert_failure(&output);
    assert_eq!(stdout(&output), "");
    assert!(stderr(&output).contains("unhandled result type"), "{}", stderr(&output));
}

#[test]
fn manifest_in_working_directory_is_used() {
    let project = Project::new();
    project
        .file("ego.toml", "[transpile]\nerror_ident = \"e\"\n")
        .file("main.ego", SIMPLE);

    let output = project.run(&["main.ego"]);
    assert_success(&output);
    let written = project.read("main.go");
    assert!(written.contains("result, e := someFunc()\n\tif e != nil {\n\t\treturn e\n\t}"), "{written}");
}

#[test]
fn manifest_changes_extensions() {
    let project = Project::new();
    project
        .file("ego.toml", "[files]\nsource_extension = \"goq\"\noutput_extension = \".gen.go\"\n")
        .file("src/main.goq", SIMPLE)
        .file("src/skip.ego", SIMPLE);

    let output = project.run(&["src"]);
    // `.gen.go` contains a dot after normalization, which is rejected.
    assert_failure(&output);
    assert!(stderr(&output).contains("output_extension"), "{}", stderr(&output));

    project.file("ego.toml", "[files]\nsource_extension = \"goq\"\noutput_extension = \"gen\"\n");
    let output = project.run(&["src"]);
    assert_success(&output);
    assert_eq!(project.read("src/main.gen"), SIMPLE_EXPECTED);
    assert!(!project.exists("src/skip.go"));
}

#[test]
fn explicit_config_flag() {
    let project = Project::new();
    project
        .file("conf/custom.toml", "[transpile]\nerror_ident = \"failure\"\n")
        .file("main.ego", SIMPLE);

    let output = project.run(&["--config", "conf/custom.toml", "--stdout", "main.ego"]);
    assert_success(&output);
    assert!(stdout(&output).contains("if failure != nil"), "{}", stdout(&output));

    let output = project.run(&["--config", "conf/missing.toml", "main.ego"]);
    assert_failure(&output);
    assert!(stderr(&output).contains("could not read file"), "{}", stderr(&output));
}

#[test]
fn invalid_manifest_aborts_before_any_work() {
    let project = Project::new();
    project.file("ego.toml", "[transpile]\nerror_ident = \"func\"\n").file("main.ego", SIMPLE);

    let output = project.run(&["main.ego"]);
    assert_failure(&output);
    assert!(stderr(&output).contains("error_ident"), "{}", stderr(&output));
    assert!(!project.exists("main.go"));
}
