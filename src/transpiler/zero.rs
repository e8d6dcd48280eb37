//! Zero values for result types, used to fill the non-error slots of the
//! early `return` a try expansion generates.

use crate::diagnostics::CompileError;
use crate::parser::ast::{Expr, LitKind, TypeExpr, UnaryOp};
use crate::pretty::print_type;
use crate::span::Spanned;

const NUMERIC_TYPES: &[&str] = &[
    "int", "int8", "int16", "int32", "int64", "uint", "uint8", "uint16", "uint32", "uint64",
    "uintptr", "float32", "float64", "complex64", "complex128", "byte", "rune",
];

/// `error` is recognized by name only; a shadowing declaration is not
/// considered.
pub fn is_error_type(ty: &TypeExpr) -> bool {
    matches!(ty, TypeExpr::Named(name) if name == "error")
}

/// The expression Go evaluates to the zero value of `ty`.
///
/// Pointers are `nil`, predeclared scalars get their literal, and any other
/// named or qualified type becomes `*new(T)`. Composite type shapes have no
/// spelling here and fail with `UnhandledTypeShape`.
pub fn zero_value(ty: &Spanned<TypeExpr>) -> Result<Spanned<Expr>, CompileError> {
    let expr = match &ty.node {
        TypeExpr::Named(name) => match name.as_str() {
            "error" => Expr::ident("nil"),
            "bool" => Expr::ident("false"),
            "string" => Expr::BasicLit { kind: LitKind::String, value: "\"\"".to_string() },
            n if NUMERIC_TYPES.contains(&n) => {
                Expr::BasicLit { kind: LitKind::Int, value: "0".to_string() }
            }
            _ => new_deref(&ty.node),
        },
        TypeExpr::Qualified { .. } => new_deref(&ty.node),
        TypeExpr::Pointer(_) => Expr::ident("nil"),
        other => return Err(CompileError::unhandled_type_shape(print_type(other), ty.span)),
    };
    Ok(Spanned::dummy(expr))
}

/// `*new(T)`
fn new_deref(ty: &TypeExpr) -> Expr {
    let call = Expr::Call {
        func: Box::new(Spanned::dummy(Expr::ident("new"))),
        args: vec![Spanned::dummy(Expr::Type(ty.clone()))],
        ellipsis: false,
    };
    Expr::Unary { op: UnaryOp::Deref, operand: Box::new(Spanned::dummy(call)) }
}
