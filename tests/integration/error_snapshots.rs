//! Snapshot tests for error message formatting.
//!
//! Uses insta inline snapshots of the plain `file:line:col: message` form.
//! Run `cargo insta review` to review changes.

use insta::assert_snapshot;

fn located_error(source: &str) -> String {
    let err = ego::transpile(source).unwrap_err();
    err.located(source, "main.ego")
}

#[test]
fn missing_expression() {
    let source = "package main\n\nfunc f() {\n\tx := \n}\n";
    assert_snapshot!(located_error(source), @"main.ego:5:1: syntax error: expected expression, found '}'");
}

#[test]
fn unexpected_character() {
    let source = "package main\n\nfunc f() {\n\tx := 1 @ 2\n}\n";
    assert_snapshot!(located_error(source), @"main.ego:4:9: syntax error: unexpected character '@'");
}

#[test]
fn no_error_result() {
    let source = "package main\n\nfunc f() int {\n\tv := g()?\n\treturn v\n}\n";
    assert_snapshot!(
        located_error(source),
        @"main.ego:4:2: try expression used in function that does not return an error"
    );
}

#[test]
fn unhandled_result_type() {
    let source = "package main\n\nfunc f() (map[string]int, error) {\n\tv := g()?\n\treturn v, nil\n}\n";
    assert_snapshot!(located_error(source), @"main.ego:4:2: unhandled result type: map[string]int");
}

#[test]
fn try_in_loop_header() {
    let source = "package main\n\nfunc f() error {\n\tfor x := next()?; x > 0; {\n\t}\n\treturn nil\n}\n";
    assert_snapshot!(
        located_error(source),
        @"main.ego:4:6: try expression is not allowed here: a try assignment must be a statement of its own, not part of an if, for or switch header"
    );
}

#[test]
fn try_at_package_level() {
    let source = "package main\n\nvar y = z()?\n";
    assert_snapshot!(located_error(source), @"main.ego:3:9: try expression used outside of a function");
}

#[test]
fn try_inside_return_values() {
    let source = "package main\n\nfunc f() (int, error) {\n\treturn g()?, nil\n}\n";
    assert_snapshot!(
        located_error(source),
        @"main.ego:4:9: try expression is not allowed here: it must be a whole statement, the value of := or =, or part of an if condition"
    );
}

#[test]
fn try_in_compound_assignment() {
    let source = "package main\n\nfunc f() error {\n\tn := 0\n\tn += count()?\n\treturn nil\n}\n";
    assert_snapshot!(
        located_error(source),
        @"main.ego:5:2: try expression is not allowed here: a try assignment must use := or =, not +="
    );
}

#[test]
fn config_errors_have_no_location() {
    let err = ego::manifest::parse_manifest("[files]\nsource_extension = \"\"\n", std::path::Path::new("ego.toml"))
        .unwrap_err();
    assert_snapshot!(
        err.located("", "ego.toml"),
        @"ego.toml: config error: 'source_extension' must be a plain file extension, got ''"
    );
}
