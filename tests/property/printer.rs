// Property tests for expansion and printing:
// 1. Expanded output contains no try operators and one error check per try
// 2. Printing is idempotent: transpiling the output again changes nothing
// 3. Whitespace in the input never changes the output

use ego::lexer::is_keyword;
use proptest::prelude::*;

fn arb_name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9]{0,5}".prop_filter("reserved", |s| {
        !is_keyword(s) && s != "err" && !s.starts_with("tmp")
    })
}

/// A statement template and the number of try expressions it contains.
fn arb_stmt() -> impl Strategy<Value = (String, usize)> {
    prop_oneof![
        (arb_name(), arb_name()).prop_map(|(v, f)| (format!("{v} := {f}()?\nuse({v})"), 1)),
        arb_name().prop_map(|f| (format!("{f}()?"), 1)),
        (arb_name(), arb_name(), 0..10u32)
            .prop_map(|(v, f, n)| (format!("{v} := {f}({n}) + {n}*2"), 0)),
        (arb_name(), arb_name())
            .prop_map(|(f, g)| (format!("if {f}()? {{\n{g}()\n}}"), 1)),
        (arb_name(), 1..9u32).prop_map(|(f, n)| {
            (format!("for i := 0; i < {n}; i++ {{\n{f}(i)?\n}}"), 1)
        }),
        (arb_name(), arb_name()).prop_map(|(x, f)| {
            (format!("switch {x} {{\ncase 1:\n{f}()?\ndefault:\n{f}()\n}}"), 1)
        }),
        arb_name().prop_map(|f| {
            (format!("go func() error {{\n{f}()?\nreturn nil\n}}()"), 1)
        }),
    ]
}

fn arb_program() -> impl Strategy<Value = (String, usize)> {
    prop::collection::vec(arb_stmt(), 1..6).prop_map(|stmts| {
        let tries = stmts.iter().map(|(_, n)| n).sum();
        let body: Vec<String> = stmts.into_iter().map(|(s, _)| s).collect();
        let source = format!(
            "package main\n\nfunc run() (int, string, error) {{\n{}\nreturn 0, \"\", nil\n}}\n",
            body.join("\n")
        );
        (source, tries)
    })
}

#[test]
fn prop_every_try_becomes_one_check() {
    proptest!(|((source, tries) in arb_program())| {
        let out = ego::transpile(&source)
            .map_err(|e| TestCaseError::fail(e.located(&source, "gen.ego")))?;
        prop_assert!(!out.contains('?'), "try left in output:\n{}", out);
        prop_assert_eq!(out.matches("err != nil").count(), tries, "{}", out);
    });
}

#[test]
fn prop_output_is_a_fixed_point() {
    proptest!(|((source, _) in arb_program())| {
        let once = ego::transpile(&source)
            .map_err(|e| TestCaseError::fail(e.located(&source, "gen.ego")))?;
        let twice = ego::transpile(&once)
            .map_err(|e| TestCaseError::fail(e.located(&once, "once.go")))?;
        prop_assert_eq!(once, twice);
    });
}

#[test]
fn prop_indentation_is_normalized() {
    proptest!(|((source, _) in arb_program(), indent in "[ \t]{0,4}")| {
        let indented: String = source
            .lines()
            .map(|line| format!("{indent}{line}\n"))
            .collect();
        prop_assert_eq!(ego::transpile(&source).ok(), ego::transpile(&indented).ok());
    });
}
