//! Try-expression expansion.
//!
//! Rewrites every recognized use of postfix `?` into explicit Go error
//! handling. Three statement shapes are handled, each in the post-visit step
//! of its statement so nested rewrites finish first:
//!
//! - `x, y := f()?` becomes `x, y, err := f()` followed by an
//!   `if err != nil { return ... }` check.
//! - `f()?` on its own becomes `if err := f(); err != nil { return ... }`.
//! - `if f()? > 0 { ... }` binds the first try in the condition to a fresh
//!   temporary in a new outer `if` whose `else` branch is the original.
//!
//! The early return carries the zero value of every result of the innermost
//! enclosing function or closure, with `err` in the one `error` slot.

pub mod zero;

use std::collections::HashSet;

use crate::diagnostics::CompileError;
use crate::parser::ast::*;
use crate::span::{Span, Spanned};
use crate::visit::scope_tracker::ScopeTracker;
use crate::visit::{
    walk_expr, walk_expr_mut, walk_func_decl_mut, walk_stmt_mut, walk_type_expr, Cursor, VisitMut,
    Visitor,
};

pub use zero::{is_error_type, zero_value};

/// Knobs for the expansion, normally loaded from `ego.toml`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranspileOptions {
    /// Name bound to the error value in generated code.
    pub error_ident: String,
    /// Base name for temporaries introduced by conditional expansion.
    pub temp_prefix: String,
}

impl Default for TranspileOptions {
    fn default() -> Self {
        Self { error_ident: "err".to_string(), temp_prefix: "tmp".to_string() }
    }
}

/// Expand every try expression in `file` in place.
///
/// Stops at the first failure; rewrites applied before it are kept.
pub fn expand(file: &mut File, options: &TranspileOptions) -> Result<(), CompileError> {
    let mut expander = Expander::new(file, options);
    expander.visit_file_mut(file)?;
    tracing::debug!(rewrites = expander.rewrites, "expansion complete");
    Ok(())
}

// ── Fresh names ─────────────────────────────────────────────────────────

/// Gathers every identifier spelled anywhere in the file.
#[derive(Default)]
struct IdentCollector {
    names: HashSet<String>,
}

impl Visitor for IdentCollector {
    fn visit_expr(&mut self, expr: &Spanned<Expr>) {
        if let Expr::Ident(name) = &expr.node {
            self.names.insert(name.clone());
        }
        walk_expr(self, expr);
    }

    fn visit_type_expr(&mut self, te: &Spanned<TypeExpr>) {
        match &te.node {
            TypeExpr::Named(name) => {
                self.names.insert(name.clone());
            }
            TypeExpr::Qualified { package, name } => {
                self.names.insert(package.clone());
                self.names.insert(name.clone());
            }
            _ => {}
        }
        walk_type_expr(self, te);
    }

    fn visit_name(&mut self, name: &Spanned<String>) {
        self.names.insert(name.node.clone());
    }
}

/// Hands out `tmp`, `tmp1`, `tmp2`, ... skipping names already taken.
struct FreshNames {
    prefix: String,
    used: HashSet<String>,
    next: usize,
}

impl FreshNames {
    fn new(prefix: &str, used: HashSet<String>) -> Self {
        Self { prefix: prefix.to_string(), used, next: 0 }
    }

    fn fresh(&mut self) -> String {
        loop {
            let candidate = match self.next {
                0 => self.prefix.clone(),
                n => format!("{}{n}", self.prefix),
            };
            self.next += 1;
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
        }
    }
}

// ── Expander ────────────────────────────────────────────────────────────

struct Expander<'o> {
    options: &'o TranspileOptions,
    scopes: ScopeTracker<Signature>,
    names: FreshNames,
    rewrites: usize,
}

impl<'o> Expander<'o> {
    fn new(file: &File, options: &'o TranspileOptions) -> Self {
        let mut collector = IdentCollector::default();
        collector.visit_file(file);
        Self {
            options,
            scopes: ScopeTracker::new(),
            names: FreshNames::new(&options.temp_prefix, collector.names),
            rewrites: 0,
        }
    }

    fn err_ident(&self) -> Spanned<Expr> {
        Spanned::dummy(Expr::ident(self.options.error_ident.as_str()))
    }

    /// `err != nil`
    fn err_check(&self) -> Spanned<Expr> {
        Spanned::dummy(Expr::Binary {
            op: BinOp::Neq,
            lhs: Box::new(self.err_ident()),
            rhs: Box::new(Spanned::dummy(Expr::ident("nil"))),
        })
    }

    /// The values returned on error from the innermost enclosing function:
    /// zero values in declared order with `err` in the error slot.
    fn return_values(&self, span: Span) -> Result<Vec<Spanned<Expr>>, CompileError> {
        let sig = self.scopes.current().ok_or_else(|| CompileError::no_enclosing_function(span))?;
        let fields = sig.result_fields();
        match fields.iter().filter(|ty| is_error_type(&ty.node)).count() {
            1 => {}
            0 => {
                return Err(CompileError::unsupported_result_shape(
                    "try expression used in function that does not return an error",
                    span,
                ))
            }
            _ => {
                return Err(CompileError::unsupported_result_shape(
                    "try expression used in function that returns more than one error",
                    span,
                ))
            }
        }
        fields
            .into_iter()
            .map(|ty| {
                if is_error_type(&ty.node) {
                    Ok(self.err_ident())
                } else {
                    zero_value(ty).map_err(|e| e.at(span))
                }
            })
            .collect()
    }

    /// `if <init>; err != nil { return ... }`
    fn check_stmt(
        &self,
        init: Option<Spanned<Stmt>>,
        values: Vec<Spanned<Expr>>,
        span: Span,
    ) -> Spanned<Stmt> {
        let ret = Spanned::dummy(Stmt::Return(values));
        Spanned::new(
            Stmt::If(IfStmt {
                init: init.map(Box::new),
                condition: self.err_check(),
                then_block: Spanned::dummy(Block { stmts: vec![ret] }),
                else_branch: None,
            }),
            span,
        )
    }

    fn require_list(&self, cursor: &Cursor<'_>, what: &str) -> Result<(), CompileError> {
        if cursor.can_insert() {
            Ok(())
        } else {
            Err(CompileError::unsupported_try_position(
                format!("{what} must be a statement of its own, not part of an if, for or switch header"),
                cursor.node().span,
            ))
        }
    }

    /// `lhs... := E?` / `lhs... = E?`
    fn expand_assign(&mut self, cursor: &mut Cursor<'_>) -> Result<(), CompileError> {
        let span = cursor.node().span;
        let values = self.return_values(span)?;
        self.require_list(cursor, "a try assignment")?;

        let err = self.err_ident();
        if let Stmt::Assign { lhs, rhs, .. } = &mut cursor.node_mut().node {
            if let Some(first) = rhs.first_mut() {
                strip_try(first);
            }
            lhs.push(err);
        }
        let check = self.check_stmt(None, values, Span::dummy());
        cursor.insert_after(check).map_err(|_| {
            CompileError::unsupported_try_position("a try assignment must be a statement of its own", span)
        })?;
        tracing::debug!(start = span.start, "expanded try assignment");
        Ok(())
    }

    /// `E?` as a statement.
    fn expand_expr_stmt(&mut self, cursor: &mut Cursor<'_>) -> Result<(), CompileError> {
        let span = cursor.node().span;
        let values = self.return_values(span)?;
        self.require_list(cursor, "a try statement")?;

        let original = cursor.replace(Spanned::dummy(Stmt::Break));
        let mut call = match original.node {
            Stmt::Expr(expr) => expr,
            other => {
                cursor.replace(Spanned::new(other, original.span));
                return Ok(());
            }
        };
        strip_try(&mut call);
        let init = Spanned::dummy(Stmt::Assign {
            lhs: vec![self.err_ident()],
            op: AssignOp::Define,
            rhs: vec![call],
        });
        cursor.replace(self.check_stmt(Some(init), values, span));
        tracing::debug!(start = span.start, "expanded try statement");
        Ok(())
    }

    /// `if ... E? ... { }`: hoist the first try of the condition into `tmp`.
    fn expand_if(&mut self, cursor: &mut Cursor<'_>, tmp: String) -> Result<(), CompileError> {
        let span = cursor.node().span;
        let values = self.return_values(span)?;

        let (extracted, init) = match &mut cursor.node_mut().node {
            Stmt::If(if_stmt) => match extract_first_try(&mut if_stmt.condition, &tmp) {
                Some(extracted) => (extracted, if_stmt.init.take()),
                None => return Ok(()),
            },
            _ => return Ok(()),
        };
        let original = cursor.replace(Spanned::dummy(Stmt::Break));

        let bind = Spanned::dummy(Stmt::Assign {
            lhs: vec![Spanned::dummy(Expr::ident(tmp.as_str())), self.err_ident()],
            op: AssignOp::Define,
            rhs: vec![extracted],
        });
        let mut outer = self.check_stmt(Some(bind), values, span);
        if let Stmt::If(outer_if) = &mut outer.node {
            outer_if.else_branch = Some(Box::new(original));
        }

        let replacement = match init {
            // The original init keeps its scope by moving into a block that
            // also holds the new outer if.
            Some(init) => {
                let block = Spanned::new(Block { stmts: vec![*init, outer] }, span);
                Spanned::new(Stmt::Block(block), span)
            }
            None => outer,
        };
        cursor.replace(replacement);
        tracing::debug!(start = span.start, tmp = %tmp, "expanded try in condition");
        Ok(())
    }

    /// Rejects tries that none of the rewrites would remove. Tries left in an
    /// `if` condition after the first are allowed through.
    fn check_positions(&self, stmt: &Spanned<Stmt>) -> Result<(), CompileError> {
        if let Stmt::Assign { op, rhs, .. } = &stmt.node {
            if !matches!(op, AssignOp::Define | AssignOp::Assign) && rhs.first().is_some_and(is_try) {
                return Err(CompileError::unsupported_try_position(
                    format!("a try assignment must use := or =, not {}", op.as_str()),
                    stmt.span,
                ));
            }
        }
        match stray_try(&stmt.node) {
            Some(span) => Err(CompileError::unsupported_try_position(
                "it must be a whole statement, the value of := or =, or part of an if condition",
                span,
            )),
            None => Ok(()),
        }
    }
}

impl VisitMut for Expander<'_> {
    type Error = CompileError;

    fn visit_func_decl_mut(&mut self, func: &mut FuncDecl) -> Result<(), CompileError> {
        self.scopes.push(func.sig.clone());
        let result = walk_func_decl_mut(self, func);
        self.scopes.pop();
        result
    }

    fn visit_expr_mut(&mut self, expr: &mut Spanned<Expr>) -> Result<(), CompileError> {
        if let Expr::FuncLit { sig, body } = &mut expr.node {
            self.scopes.push(sig.clone());
            let result = self.visit_block_mut(body);
            self.scopes.pop();
            return result;
        }
        if is_try(expr) && self.scopes.is_empty() {
            return Err(CompileError::no_enclosing_function(expr.span));
        }
        walk_expr_mut(self, expr)
    }

    fn visit_stmt_mut(&mut self, cursor: &mut Cursor<'_>) -> Result<(), CompileError> {
        // Taken before the children so temporaries number in source order.
        let tmp = match &cursor.node().node {
            Stmt::If(if_stmt) if find_first_try(&if_stmt.condition).is_some() => {
                Some(self.names.fresh())
            }
            _ => None,
        };

        walk_stmt_mut(self, cursor.node_mut())?;
        self.check_positions(cursor.node())?;

        let shape = match (&cursor.node().node, tmp) {
            (Stmt::Assign { op: AssignOp::Define | AssignOp::Assign, rhs, .. }, _)
                if rhs.first().is_some_and(is_try) =>
            {
                Shape::Assign
            }
            (Stmt::Expr(expr), _) if is_try(expr) => Shape::ExprStmt,
            (Stmt::If(_), Some(tmp)) => Shape::Condition(tmp),
            _ => return Ok(()),
        };
        match shape {
            Shape::Assign => self.expand_assign(cursor)?,
            Shape::ExprStmt => self.expand_expr_stmt(cursor)?,
            Shape::Condition(tmp) => self.expand_if(cursor, tmp)?,
        }
        self.rewrites += 1;
        Ok(())
    }
}

enum Shape {
    Assign,
    ExprStmt,
    Condition(String),
}

fn is_try(expr: &Spanned<Expr>) -> bool {
    matches!(expr.node, Expr::Try(_))
}

/// Replace `E?` with `E`.
fn strip_try(expr: &mut Spanned<Expr>) {
    if let Expr::Try(inner) = &mut expr.node {
        let inner = std::mem::replace(&mut **inner, Spanned::dummy(Expr::ident("_")));
        *expr = inner;
    }
}

/// First try expression in search order: the node itself, binary left then
/// right, unary and paren operands, call callee then arguments. Function
/// literals are opaque.
fn find_first_try(expr: &Spanned<Expr>) -> Option<&Spanned<Expr>> {
    match &expr.node {
        Expr::Try(_) => Some(expr),
        Expr::Binary { lhs, rhs, .. } => find_first_try(lhs).or_else(|| find_first_try(rhs)),
        Expr::Unary { operand, .. } | Expr::Paren(operand) => find_first_try(operand),
        Expr::Call { func, args, .. } => {
            find_first_try(func).or_else(|| args.iter().find_map(find_first_try))
        }
        _ => None,
    }
}

/// Finds a try expression outside function literals.
#[derive(Default)]
struct TryFinder {
    found: Option<Span>,
}

impl Visitor for TryFinder {
    fn visit_expr(&mut self, expr: &Spanned<Expr>) {
        if self.found.is_some() {
            return;
        }
        match expr.node {
            Expr::Try(_) => self.found = Some(expr.span),
            Expr::FuncLit { .. } => {}
            _ => walk_expr(self, expr),
        }
    }
}

/// The operand of a top-level try, which the assignment and statement
/// rewrites strip; anything else as is.
fn try_operand(expr: &Spanned<Expr>) -> &Spanned<Expr> {
    match &expr.node {
        Expr::Try(inner) => &**inner,
        _ => expr,
    }
}

/// A try in one of the statement's own expressions (not those of nested
/// statements, which are checked on their own) that no rewrite will remove.
/// `if` conditions are exempt.
fn stray_try(stmt: &Stmt) -> Option<Span> {
    let own: Vec<&Spanned<Expr>> = match stmt {
        Stmt::Expr(expr) => vec![try_operand(expr)],
        Stmt::Assign { lhs, op, rhs } => {
            let rewritten = matches!(op, AssignOp::Define | AssignOp::Assign);
            lhs.iter()
                .chain(rhs.iter().enumerate().map(|(i, expr)| {
                    if i == 0 && rewritten { try_operand(expr) } else { expr }
                }))
                .collect()
        }
        Stmt::IncDec { target, .. } => vec![target],
        Stmt::Send { channel, value } => vec![channel, value],
        Stmt::Var(spec) | Stmt::Const(spec) => spec.values.iter().collect(),
        Stmt::Return(values) => values.iter().collect(),
        Stmt::For { condition, .. } => condition.iter().collect(),
        Stmt::Range { key, value, iterable, .. } => {
            key.iter().chain(value.iter()).chain(std::iter::once(iterable)).collect()
        }
        Stmt::Switch { tag, clauses, .. } => tag
            .iter()
            .chain(clauses.iter().flat_map(|clause| clause.node.values.iter()))
            .collect(),
        Stmt::Go(expr) | Stmt::Defer(expr) => vec![expr],
        Stmt::If(_) | Stmt::Block(_) | Stmt::Break | Stmt::Continue | Stmt::Fallthrough => {
            Vec::new()
        }
    };
    let mut finder = TryFinder::default();
    for expr in own {
        finder.visit_expr(expr);
    }
    finder.found
}

/// Same search as [`find_first_try`]; replaces the try with `tmp` and
/// returns its operand.
fn extract_first_try(expr: &mut Spanned<Expr>, tmp: &str) -> Option<Spanned<Expr>> {
    if is_try(expr) {
        let placeholder = Spanned::new(Expr::ident(tmp), expr.span);
        let taken = std::mem::replace(expr, placeholder);
        return match taken.node {
            Expr::Try(inner) => Some(*inner),
            _ => None,
        };
    }
    match &mut expr.node {
        Expr::Binary { lhs, rhs, .. } => {
            extract_first_try(lhs, tmp).or_else(|| extract_first_try(rhs, tmp))
        }
        Expr::Unary { operand, .. } | Expr::Paren(operand) => extract_first_try(operand, tmp),
        Expr::Call { func, args, .. } => extract_first_try(func, tmp)
            .or_else(|| args.iter_mut().find_map(|arg| extract_first_try(arg, tmp))),
        _ => None,
    }
}
