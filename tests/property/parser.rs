// Property tests for the front end:
// 1. No panics: lexing and parsing arbitrary text returns Ok or Err
// 2. Determinism: the same source always yields the same result
// 3. Spans: every token span lies inside the source on char boundaries

use ego::lexer::{is_keyword, lex};
use proptest::prelude::*;

fn arb_ident() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9]{0,6}".prop_filter("keywords are not identifiers", |s| !is_keyword(s))
}

fn arb_operand() -> impl Strategy<Value = String> {
    prop_oneof![
        arb_ident(),
        (0..1000u32).prop_map(|n| n.to_string()),
        arb_ident().prop_map(|f| format!("{f}()")),
        "[a-z ]{0,8}".prop_map(|s| format!("{s:?}")),
    ]
}

fn arb_expr() -> impl Strategy<Value = String> {
    let op = prop_oneof![Just("+"), Just("-"), Just("*"), Just("=="), Just("&&"), Just("<<")];
    (arb_operand(), op, arb_operand()).prop_map(|(a, op, b)| format!("{a} {op} {b}"))
}

fn arb_stmt() -> impl Strategy<Value = String> {
    prop_oneof![
        (arb_ident(), arb_expr()).prop_map(|(v, e)| format!("{v} := {e}")),
        (arb_ident(), arb_operand()).prop_map(|(v, e)| format!("{v} = {e}?")),
        arb_ident().prop_map(|f| format!("{f}()?")),
        (arb_expr(), arb_ident()).prop_map(|(c, f)| format!("if {c} {{\n{f}()\n}}")),
        (arb_ident(), arb_expr()).prop_map(|(v, e)| format!("for {v} := range {e} {{\n}}")),
        arb_expr().prop_map(|e| format!("return {e}")),
    ]
}

fn arb_file() -> impl Strategy<Value = String> {
    (arb_ident(), prop::collection::vec(arb_stmt(), 0..8)).prop_map(|(name, stmts)| {
        format!("package main\n\nfunc {name}() error {{\n{}\n}}\n", stmts.join("\n"))
    })
}

#[test]
fn prop_lexer_never_panics() {
    proptest!(|(source in "\\PC{0,500}")| {
        let _ = lex(&source);
    });
}

#[test]
fn prop_parser_never_panics() {
    proptest!(|(source in "\\PC{0,500}")| {
        let _ = ego::parse(&source);
    });
}

#[test]
fn prop_parser_never_panics_on_near_go() {
    // Go-shaped text with random deletions hits far more parser paths than
    // uniformly random characters.
    proptest!(|(source in arb_file(), cut in 0usize..400, len in 0usize..20)| {
        let mut chars: Vec<char> = source.chars().collect();
        let start = cut.min(chars.len());
        let end = (start + len).min(chars.len());
        chars.drain(start..end);
        let mangled: String = chars.into_iter().collect();
        let _ = ego::parse(&mangled);
        let _ = ego::transpile(&mangled);
    });
}

#[test]
fn prop_generated_files_parse() {
    proptest!(|(source in arb_file())| {
        prop_assert!(ego::parse(&source).is_ok(), "failed to parse:\n{}", source);
    });
}

#[test]
fn prop_parsing_is_deterministic() {
    proptest!(|(source in arb_file())| {
        let first = ego::parse(&source);
        let second = ego::parse(&source);
        prop_assert_eq!(format!("{first:?}"), format!("{second:?}"));
    });
}

#[test]
fn prop_token_spans_lie_inside_source() {
    proptest!(|(source in "\\PC{0,300}")| {
        if let Ok(lexed) = lex(&source) {
            let mut last_end = 0;
            for token in &lexed.tokens {
                prop_assert!(token.span.start <= token.span.end);
                prop_assert!(token.span.end <= source.len());
                prop_assert!(source.is_char_boundary(token.span.start));
                prop_assert!(source.is_char_boundary(token.span.end));
                prop_assert!(token.span.start >= last_end, "tokens overlap");
                last_end = token.span.end;
            }
        }
    });
}
