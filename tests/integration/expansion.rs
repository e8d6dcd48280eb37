//! End-to-end expansion behavior through the public `transpile` API.

use ego::{CompileError, TranspileOptions};
use pretty_assertions::assert_eq;

fn func(sig: &str, body: &str) -> String {
    format!("package main\n\nfunc f(){sig} {{\n{body}}}\n")
}

fn transpile(src: &str) -> String {
    ego::transpile(src).unwrap_or_else(|e| panic!("{}", e.located(src, "test.ego")))
}

#[test]
fn source_without_try_is_only_reformatted() {
    let src = "package main\nimport \"fmt\"\nfunc main() {\n    fmt.Println(1+2)\n}\n";
    assert_eq!(transpile(src), "package main\n\nimport \"fmt\"\n\nfunc main() {\n\tfmt.Println(1 + 2)\n}\n");
}

#[test]
fn multi_value_assignment() {
    let src = func(" (int, string, error)", "\ta, b := pair()?\n\treturn a, b, nil\n");
    assert_eq!(
        transpile(&src),
        func(
            " (int, string, error)",
            "\ta, b, err := pair()\n\tif err != nil {\n\t\treturn 0, \"\", err\n\t}\n\treturn a, b, nil\n"
        )
    );
}

#[test]
fn plain_assignment_keeps_operator() {
    let src = func(" error", "\tvar x int\n\tx = g()?\n\treturn nil\n");
    assert_eq!(
        transpile(&src),
        func(" error", "\tvar x int\n\tx, err = g()\n\tif err != nil {\n\t\treturn err\n\t}\n\treturn nil\n")
    );
}

#[test]
fn named_results_use_their_types() {
    let src = func(" (n int, ok bool, err error)", "\tg()?\n\treturn\n");
    assert_eq!(
        transpile(&src),
        func(
            " (n int, ok bool, err error)",
            "\tif err := g(); err != nil {\n\t\treturn 0, false, err\n\t}\n\treturn\n"
        )
    );
}

#[test]
fn only_left_try_in_condition_is_extracted() {
    let src = func(" error", "\tif a()? > b()? {\n\t\tc()\n\t}\n\treturn nil\n");
    assert_eq!(
        transpile(&src),
        func(
            " error",
            "\tif tmp, err := a(); err != nil {\n\t\treturn err\n\t} else if tmp > b()? {\n\t\tc()\n\t}\n\treturn nil\n"
        )
    );
}

#[test]
fn temporaries_avoid_existing_names() {
    let src = func(" error", "\ttmp := 1\n\tif ok()? {\n\t\tuse(tmp)\n\t}\n\treturn nil\n");
    let out = transpile(&src);
    assert!(out.contains("if tmp1, err := ok(); err != nil {"), "{out}");
    assert!(out.contains("} else if tmp1 {"), "{out}");
}

#[test]
fn try_in_else_if_condition() {
    let src = func(" error", "\tif x {\n\t\ta()\n\t} else if b()? {\n\t\tc()\n\t}\n\treturn nil\n");
    assert_eq!(
        transpile(&src),
        func(
            " error",
            "\tif x {\n\t\ta()\n\t} else if tmp, err := b(); err != nil {\n\t\treturn err\n\t} else if tmp {\n\t\tc()\n\t}\n\treturn nil\n"
        )
    );
}

#[test]
fn tries_in_nested_bodies() {
    let src = func(
        " error",
        "\tfor _, name := range names {\n\t\tload(name)?\n\t}\n\tswitch mode {\n\tcase 1:\n\t\tx := run()?\n\t\tuse(x)\n\t}\n\treturn nil\n",
    );
    assert_eq!(
        transpile(&src),
        func(
            " error",
            "\tfor _, name := range names {\n\t\tif err := load(name); err != nil {\n\t\t\treturn err\n\t\t}\n\t}\n\tswitch mode {\n\tcase 1:\n\t\tx, err := run()\n\t\tif err != nil {\n\t\t\treturn err\n\t\t}\n\t\tuse(x)\n\t}\n\treturn nil\n"
        )
    );
}

#[test]
fn closure_uses_its_own_signature() {
    let src = func(
        "",
        "\tgo func() error {\n\t\twork()?\n\t\treturn nil\n\t}()\n",
    );
    assert_eq!(
        transpile(&src),
        func(
            "",
            "\tgo func() error {\n\t\tif err := work(); err != nil {\n\t\t\treturn err\n\t\t}\n\t\treturn nil\n\t}()\n"
        )
    );
}

#[test]
fn package_level_closure_is_expanded() {
    let src = "package main\n\nvar handler = func() error {\n\tstep()?\n\treturn nil\n}\n";
    assert_eq!(
        transpile(src),
        "package main\n\nvar handler = func() error {\n\tif err := step(); err != nil {\n\t\treturn err\n\t}\n\treturn nil\n}\n"
    );
}

#[test]
fn custom_identifiers() {
    let options = TranspileOptions { error_ident: "e".into(), temp_prefix: "v".into() };
    let src = func(" error", "\tif ok()? {\n\t}\n\treturn nil\n");
    let out = ego::transpile_with(&src, &options).unwrap();
    assert_eq!(
        out,
        func(" error", "\tif v, e := ok(); e != nil {\n\t\treturn e\n\t} else if v {\n\t}\n\treturn nil\n")
    );
}

// ── Failures ────────────────────────────────────────────────────────

#[test]
fn function_without_error_result() {
    let src = func(" int", "\tx := g()?\n\treturn x\n");
    let err = ego::transpile(&src).unwrap_err();
    assert!(matches!(err, CompileError::UnsupportedResultShape { .. }));
    assert_eq!(err.to_string(), "try expression used in function that does not return an error");
}

#[test]
fn function_with_two_error_results() {
    let src = func(" (error, error)", "\tg()?\n\treturn nil, nil\n");
    let err = ego::transpile(&src).unwrap_err();
    assert_eq!(err.to_string(), "try expression used in function that returns more than one error");
}

#[test]
fn unhandled_result_shape_points_at_statement() {
    let src = func(" ([]int, error)", "\tx := g()?\n\treturn x, nil\n");
    let err = ego::transpile(&src).unwrap_err();
    assert_eq!(err.to_string(), "unhandled result type: []int");
    let span = err.span().unwrap();
    assert_eq!(&src[span.start..span.end], "x := g()?");
}

#[test]
fn try_in_for_header_is_rejected() {
    let src = func(" error", "\tfor i := start()?; i < 3; i++ {\n\t}\n\treturn nil\n");
    let err = ego::transpile(&src).unwrap_err();
    assert!(matches!(err, CompileError::UnsupportedTryPosition { .. }), "{err}");
}

#[test]
fn first_failure_stops_the_pass() {
    let src = "package main\n\nfunc a() int {\n\tg()?\n\treturn 0\n}\n\nfunc b() ([]int, error) {\n\tx := g()?\n\treturn x, nil\n}\n";
    let err = ego::transpile(src).unwrap_err();
    assert!(matches!(err, CompileError::UnsupportedResultShape { .. }));
}

#[test]
fn package_level_try_has_no_enclosing_function() {
    let src = "package main\n\nvar y = z()?\n";
    let err = ego::transpile(src).unwrap_err();
    assert!(matches!(err, CompileError::NoEnclosingFunction { .. }), "{err}");

    let mut out = Vec::new();
    let err = ego::transpile_io(src.as_bytes(), &mut out).unwrap_err();
    assert!(matches!(err, CompileError::NoEnclosingFunction { .. }), "{err}");
    assert!(out.is_empty());
}

#[test]
fn tries_that_cannot_be_rewritten_are_rejected() {
    for (sig, body) in [
        (" (int, error)", "\treturn g()?, nil\n"),
        (" error", "\tx := h(g()?)\n\tuse(x)\n\treturn nil\n"),
        (" error", "\tfor g()? {\n\t}\n\treturn nil\n"),
        (" error", "\tswitch g()? {\n\t}\n\treturn nil\n"),
        (" error", "\tgo g()?\n\treturn nil\n"),
    ] {
        let src = func(sig, body);
        let err = ego::transpile(&src).unwrap_err();
        assert!(matches!(err, CompileError::UnsupportedTryPosition { .. }), "{body}: {err}");
        let span = err.span().unwrap();
        assert_eq!(&src[span.start..span.end], "g()?", "{body}");
    }
}

#[test]
fn try_inside_closure_in_return_is_expanded() {
    let src = func(" func() error", "\treturn func() error {\n\t\tstep()?\n\t\treturn nil\n\t}\n");
    let out = transpile(&src);
    assert!(out.contains("\t\tif err := step(); err != nil {\n\t\t\treturn err\n\t\t}\n"), "{out}");
}

#[test]
fn compound_assignment_is_rejected() {
    let src = func(" error", "\ttotal := 0\n\ttotal += g()?\n\treturn nil\n");
    let err = ego::transpile(&src).unwrap_err();
    assert!(matches!(err, CompileError::UnsupportedTryPosition { .. }), "{err}");
    assert_eq!(
        err.to_string(),
        "try expression is not allowed here: a try assignment must use := or =, not +="
    );
}

#[test]
fn trailing_comment_moves_to_generated_header() {
    let src = func(" error", "\tg()? // may fail\n\treturn nil\n");
    let out = transpile(&src);
    assert_eq!(
        out,
        func(" error", "\tif err := g(); err != nil { // may fail\n\t\treturn err\n\t}\n\treturn nil\n")
    );
    assert_eq!(transpile(&out), out);
}

#[test]
fn else_if_chain_temporaries_in_source_order() {
    let src = func(" error", "\tif a()? {\n\t\tx()\n\t} else if b()? {\n\t\ty()\n\t}\n\treturn nil\n");
    assert_eq!(
        transpile(&src),
        func(
            " error",
            "\tif tmp, err := a(); err != nil {\n\t\treturn err\n\t} else if tmp {\n\t\tx()\n\t} else if tmp1, err := b(); err != nil {\n\t\treturn err\n\t} else if tmp1 {\n\t\ty()\n\t}\n\treturn nil\n"
        )
    );
}
