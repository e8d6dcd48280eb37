//! AST visitor infrastructure
//!
//! Two visitor traits and their walk functions:
//!
//! - `Visitor`: immutable traversal for analysis and collection passes
//! - `VisitMut`: fallible mutable traversal for in-place rewriting passes
//!
//! ## Usage
//!
//! Implement the trait for your pass, overriding only the methods you need.
//! Call the corresponding `walk_*` function inside your override to get the
//! default recursion.
//!
//! ```rust
//! use ego::visit::{Visitor, walk_expr};
//! use ego::parser::ast::Expr;
//! use ego::span::Spanned;
//! use std::collections::HashSet;
//!
//! struct IdentCollector {
//!     names: HashSet<String>,
//! }
//!
//! impl Visitor for IdentCollector {
//!     fn visit_expr(&mut self, expr: &Spanned<Expr>) {
//!         if let Expr::Ident(name) = &expr.node {
//!             self.names.insert(name.clone());
//!         }
//!         walk_expr(self, expr); // Continue recursion
//!     }
//! }
//! ```
//!
//! ## Statement cursors
//!
//! `VisitMut::visit_stmt_mut` receives a [`Cursor`] instead of the bare
//! statement. The cursor can swap the statement for another one and, when the
//! statement sits in a statement list, queue new statements right after it.
//! Queued statements are spliced in once the visit returns and are not
//! visited themselves.

pub mod scope_tracker;

use crate::parser::ast::*;
use crate::span::Spanned;
use thiserror::Error;

// ============================================================================
// Visitor Trait (Read-Only)
// ============================================================================

/// Read-only AST visitor. Default implementations recurse into all children.
///
/// Omit the walk call in an override to prune traversal at that node.
pub trait Visitor: Sized {
    fn visit_file(&mut self, file: &File) {
        walk_file(self, file);
    }

    fn visit_decl(&mut self, decl: &Spanned<Decl>) {
        walk_decl(self, decl);
    }

    fn visit_block(&mut self, block: &Spanned<Block>) {
        walk_block(self, block);
    }

    fn visit_stmt(&mut self, stmt: &Spanned<Stmt>) {
        walk_stmt(self, stmt);
    }

    fn visit_expr(&mut self, expr: &Spanned<Expr>) {
        walk_expr(self, expr);
    }

    fn visit_type_expr(&mut self, te: &Spanned<TypeExpr>) {
        walk_type_expr(self, te);
    }

    /// Declared names: packages, functions, parameters, types, fields,
    /// selectors and import aliases.
    fn visit_name(&mut self, _name: &Spanned<String>) {}
}

// ============================================================================
// Walk Functions (Read-Only)
// ============================================================================

pub fn walk_file<V: Visitor>(v: &mut V, file: &File) {
    v.visit_name(&file.package);
    for import in &file.imports {
        for spec in &import.node.specs {
            if let Some(alias) = &spec.alias {
                v.visit_name(alias);
            }
        }
    }
    for decl in &file.decls {
        v.visit_decl(decl);
    }
}

pub fn walk_decl<V: Visitor>(v: &mut V, decl: &Spanned<Decl>) {
    match &decl.node {
        Decl::Func(func) => {
            if let Some(recv) = &func.recv {
                walk_param(v, recv);
            }
            v.visit_name(&func.name);
            walk_signature(v, &func.sig);
            if let Some(body) = &func.body {
                v.visit_block(body);
            }
        }
        Decl::Type { specs, .. } => {
            for spec in specs {
                v.visit_name(&spec.name);
                v.visit_type_expr(&spec.ty);
            }
        }
        Decl::Var { specs, .. } | Decl::Const { specs, .. } => {
            for spec in specs {
                walk_value_spec(v, spec);
            }
        }
    }
}

pub fn walk_signature<V: Visitor>(v: &mut V, sig: &Signature) {
    for param in sig.params.iter().chain(&sig.results) {
        walk_param(v, param);
    }
}

fn walk_param<V: Visitor>(v: &mut V, param: &Param) {
    for name in &param.names {
        v.visit_name(name);
    }
    v.visit_type_expr(&param.ty);
}

fn walk_value_spec<V: Visitor>(v: &mut V, spec: &ValueSpec) {
    for name in &spec.names {
        v.visit_name(name);
    }
    if let Some(ty) = &spec.ty {
        v.visit_type_expr(ty);
    }
    for value in &spec.values {
        v.visit_expr(value);
    }
}

pub fn walk_block<V: Visitor>(v: &mut V, block: &Spanned<Block>) {
    for stmt in &block.node.stmts {
        v.visit_stmt(stmt);
    }
}

pub fn walk_stmt<V: Visitor>(v: &mut V, stmt: &Spanned<Stmt>) {
    match &stmt.node {
        Stmt::Expr(expr) | Stmt::Go(expr) | Stmt::Defer(expr) => v.visit_expr(expr),
        Stmt::Assign { lhs, rhs, .. } => {
            for expr in lhs.iter().chain(rhs) {
                v.visit_expr(expr);
            }
        }
        Stmt::IncDec { target, .. } => v.visit_expr(target),
        Stmt::Send { channel, value } => {
            v.visit_expr(channel);
            v.visit_expr(value);
        }
        Stmt::Var(spec) | Stmt::Const(spec) => walk_value_spec(v, spec),
        Stmt::Return(values) => {
            for value in values {
                v.visit_expr(value);
            }
        }
        Stmt::If(if_stmt) => {
            if let Some(init) = &if_stmt.init {
                v.visit_stmt(init);
            }
            v.visit_expr(&if_stmt.condition);
            v.visit_block(&if_stmt.then_block);
            if let Some(else_branch) = &if_stmt.else_branch {
                v.visit_stmt(else_branch);
            }
        }
        Stmt::For { init, condition, post, body } => {
            if let Some(init) = init {
                v.visit_stmt(init);
            }
            if let Some(condition) = condition {
                v.visit_expr(condition);
            }
            if let Some(post) = post {
                v.visit_stmt(post);
            }
            v.visit_block(body);
        }
        Stmt::Range { key, value, iterable, body, .. } => {
            for var in key.iter().chain(value) {
                v.visit_expr(var);
            }
            v.visit_expr(iterable);
            v.visit_block(body);
        }
        Stmt::Switch { init, tag, clauses } => {
            if let Some(init) = init {
                v.visit_stmt(init);
            }
            if let Some(tag) = tag {
                v.visit_expr(tag);
            }
            for clause in clauses {
                for value in &clause.node.values {
                    v.visit_expr(value);
                }
                for stmt in &clause.node.body {
                    v.visit_stmt(stmt);
                }
            }
        }
        Stmt::Block(block) => v.visit_block(block),
        Stmt::Break | Stmt::Continue | Stmt::Fallthrough => {}
    }
}

pub fn walk_expr<V: Visitor>(v: &mut V, expr: &Spanned<Expr>) {
    match &expr.node {
        Expr::Ident(_) | Expr::BasicLit { .. } => {}
        Expr::Composite { ty, elements, .. } => {
            if let Some(ty) = ty {
                v.visit_type_expr(ty);
            }
            for element in elements {
                if let Some(key) = &element.key {
                    v.visit_expr(key);
                }
                v.visit_expr(&element.value);
            }
        }
        Expr::FuncLit { sig, body } => {
            walk_signature(v, sig);
            v.visit_block(body);
        }
        Expr::Paren(inner) | Expr::Try(inner) => v.visit_expr(inner),
        Expr::Selector { object, field } => {
            v.visit_expr(object);
            v.visit_name(field);
        }
        Expr::Index { object, index } => {
            v.visit_expr(object);
            v.visit_expr(index);
        }
        Expr::Slice { object, low, high } => {
            v.visit_expr(object);
            for bound in low.iter().chain(high) {
                v.visit_expr(bound);
            }
        }
        Expr::TypeAssert { object, ty } => {
            v.visit_expr(object);
            v.visit_type_expr(ty);
        }
        Expr::Call { func, args, .. } => {
            v.visit_expr(func);
            for arg in args {
                v.visit_expr(arg);
            }
        }
        Expr::Unary { operand, .. } => v.visit_expr(operand),
        Expr::Binary { lhs, rhs, .. } => {
            v.visit_expr(lhs);
            v.visit_expr(rhs);
        }
        Expr::Type(ty) => v.visit_type_expr(&Spanned::new(ty.clone(), expr.span)),
    }
}

pub fn walk_type_expr<V: Visitor>(v: &mut V, te: &Spanned<TypeExpr>) {
    match &te.node {
        TypeExpr::Named(_) | TypeExpr::Qualified { .. } => {}
        TypeExpr::Pointer(inner) | TypeExpr::Slice(inner) | TypeExpr::Variadic(inner) => {
            v.visit_type_expr(inner);
        }
        TypeExpr::Array { len, elem } => {
            if let Some(len) = len {
                v.visit_expr(len);
            }
            v.visit_type_expr(elem);
        }
        TypeExpr::Map { key, value } => {
            v.visit_type_expr(key);
            v.visit_type_expr(value);
        }
        TypeExpr::Chan { elem, .. } => v.visit_type_expr(elem),
        TypeExpr::Func(sig) => walk_signature(v, sig),
        TypeExpr::Struct(fields) => {
            for field in fields {
                for name in &field.names {
                    v.visit_name(name);
                }
                v.visit_type_expr(&field.ty);
            }
        }
        TypeExpr::Interface(elems) => {
            for elem in elems {
                match elem {
                    InterfaceElem::Method { name, sig } => {
                        v.visit_name(name);
                        walk_signature(v, sig);
                    }
                    InterfaceElem::Embedded(ty) => v.visit_type_expr(ty),
                }
            }
        }
    }
}

// ============================================================================
// Statement Cursor
// ============================================================================

/// Returned by [`Cursor::insert_after`] when the statement occupies a
/// single-statement slot such as an `if` or `for` init clause.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("statement is not part of a statement list")]
pub struct NotInList;

/// A handle on the statement being visited.
pub struct Cursor<'a> {
    stmt: &'a mut Spanned<Stmt>,
    in_list: bool,
    inserted: Vec<Spanned<Stmt>>,
}

impl<'a> Cursor<'a> {
    fn in_list(stmt: &'a mut Spanned<Stmt>) -> Self {
        Self { stmt, in_list: true, inserted: Vec::new() }
    }

    fn single(stmt: &'a mut Spanned<Stmt>) -> Self {
        Self { stmt, in_list: false, inserted: Vec::new() }
    }

    pub fn node(&self) -> &Spanned<Stmt> {
        self.stmt
    }

    pub fn node_mut(&mut self) -> &mut Spanned<Stmt> {
        self.stmt
    }

    /// Swap in `new`, returning the statement it replaced.
    pub fn replace(&mut self, new: Spanned<Stmt>) -> Spanned<Stmt> {
        std::mem::replace(self.stmt, new)
    }

    /// Queue `stmt` to follow the current statement (and any statements
    /// queued before it).
    pub fn insert_after(&mut self, stmt: Spanned<Stmt>) -> Result<(), NotInList> {
        if !self.in_list {
            return Err(NotInList);
        }
        self.inserted.push(stmt);
        Ok(())
    }

    pub fn can_insert(&self) -> bool {
        self.in_list
    }

    fn into_inserted(self) -> Vec<Spanned<Stmt>> {
        self.inserted
    }
}

// ============================================================================
// VisitMut Trait (Mutable, Fallible)
// ============================================================================

/// Mutable AST visitor for rewriting passes. Every method may fail with the
/// pass's own error type, which aborts the traversal.
pub trait VisitMut: Sized {
    type Error;

    fn visit_file_mut(&mut self, file: &mut File) -> Result<(), Self::Error> {
        walk_file_mut(self, file)
    }

    fn visit_func_decl_mut(&mut self, func: &mut FuncDecl) -> Result<(), Self::Error> {
        walk_func_decl_mut(self, func)
    }

    fn visit_block_mut(&mut self, block: &mut Spanned<Block>) -> Result<(), Self::Error> {
        walk_block_mut(self, block)
    }

    fn visit_stmt_mut(&mut self, cursor: &mut Cursor<'_>) -> Result<(), Self::Error> {
        walk_stmt_mut(self, cursor.node_mut())
    }

    fn visit_expr_mut(&mut self, expr: &mut Spanned<Expr>) -> Result<(), Self::Error> {
        walk_expr_mut(self, expr)
    }
}

// ============================================================================
// Walk Functions (Mutable)
// ============================================================================

pub fn walk_file_mut<V: VisitMut>(v: &mut V, file: &mut File) -> Result<(), V::Error> {
    for decl in &mut file.decls {
        match &mut decl.node {
            Decl::Func(func) => v.visit_func_decl_mut(func)?,
            Decl::Var { specs, .. } | Decl::Const { specs, .. } => {
                for spec in specs {
                    for value in &mut spec.values {
                        v.visit_expr_mut(value)?;
                    }
                }
            }
            Decl::Type { .. } => {}
        }
    }
    Ok(())
}

pub fn walk_func_decl_mut<V: VisitMut>(v: &mut V, func: &mut FuncDecl) -> Result<(), V::Error> {
    match &mut func.body {
        Some(body) => v.visit_block_mut(body),
        None => Ok(()),
    }
}

pub fn walk_block_mut<V: VisitMut>(v: &mut V, block: &mut Spanned<Block>) -> Result<(), V::Error> {
    walk_stmt_list_mut(v, &mut block.node.stmts)
}

/// Visits each statement through a list cursor and splices in whatever the
/// visitor queued, skipping over the new statements.
pub fn walk_stmt_list_mut<V: VisitMut>(
    v: &mut V,
    stmts: &mut Vec<Spanned<Stmt>>,
) -> Result<(), V::Error> {
    let mut i = 0;
    while i < stmts.len() {
        let mut cursor = Cursor::in_list(&mut stmts[i]);
        v.visit_stmt_mut(&mut cursor)?;
        let inserted = cursor.into_inserted();
        let count = inserted.len();
        stmts.splice(i + 1..i + 1, inserted);
        i += 1 + count;
    }
    Ok(())
}

fn walk_slot_mut<V: VisitMut>(v: &mut V, stmt: &mut Spanned<Stmt>) -> Result<(), V::Error> {
    v.visit_stmt_mut(&mut Cursor::single(stmt))
}

pub fn walk_stmt_mut<V: VisitMut>(v: &mut V, stmt: &mut Spanned<Stmt>) -> Result<(), V::Error> {
    match &mut stmt.node {
        Stmt::Expr(expr) | Stmt::Go(expr) | Stmt::Defer(expr) => v.visit_expr_mut(expr)?,
        Stmt::Assign { lhs, rhs, .. } => {
            for expr in lhs.iter_mut().chain(rhs.iter_mut()) {
                v.visit_expr_mut(expr)?;
            }
        }
        Stmt::IncDec { target, .. } => v.visit_expr_mut(target)?,
        Stmt::Send { channel, value } => {
            v.visit_expr_mut(channel)?;
            v.visit_expr_mut(value)?;
        }
        Stmt::Var(spec) | Stmt::Const(spec) => {
            for value in &mut spec.values {
                v.visit_expr_mut(value)?;
            }
        }
        Stmt::Return(values) => {
            for value in values {
                v.visit_expr_mut(value)?;
            }
        }
        Stmt::If(if_stmt) => {
            if let Some(init) = &mut if_stmt.init {
                walk_slot_mut(v, init)?;
            }
            v.visit_expr_mut(&mut if_stmt.condition)?;
            v.visit_block_mut(&mut if_stmt.then_block)?;
            if let Some(else_branch) = &mut if_stmt.else_branch {
                walk_slot_mut(v, else_branch)?;
            }
        }
        Stmt::For { init, condition, post, body } => {
            if let Some(init) = init {
                walk_slot_mut(v, init)?;
            }
            if let Some(condition) = condition {
                v.visit_expr_mut(condition)?;
            }
            if let Some(post) = post {
                walk_slot_mut(v, post)?;
            }
            v.visit_block_mut(body)?;
        }
        Stmt::Range { key, value, iterable, body, .. } => {
            for var in key.iter_mut().chain(value.iter_mut()) {
                v.visit_expr_mut(var)?;
            }
            v.visit_expr_mut(iterable)?;
            v.visit_block_mut(body)?;
        }
        Stmt::Switch { init, tag, clauses } => {
            if let Some(init) = init {
                walk_slot_mut(v, init)?;
            }
            if let Some(tag) = tag {
                v.visit_expr_mut(tag)?;
            }
            for clause in clauses {
                for value in &mut clause.node.values {
                    v.visit_expr_mut(value)?;
                }
                walk_stmt_list_mut(v, &mut clause.node.body)?;
            }
        }
        Stmt::Block(block) => v.visit_block_mut(block)?,
        Stmt::Break | Stmt::Continue | Stmt::Fallthrough => {}
    }
    Ok(())
}

pub fn walk_expr_mut<V: VisitMut>(v: &mut V, expr: &mut Spanned<Expr>) -> Result<(), V::Error> {
    match &mut expr.node {
        Expr::Ident(_) | Expr::BasicLit { .. } | Expr::Type(_) => {}
        Expr::Composite { elements, .. } => {
            for element in elements {
                if let Some(key) = &mut element.key {
                    v.visit_expr_mut(key)?;
                }
                v.visit_expr_mut(&mut element.value)?;
            }
        }
        Expr::FuncLit { body, .. } => v.visit_block_mut(body)?,
        Expr::Paren(inner) | Expr::Try(inner) => v.visit_expr_mut(inner)?,
        Expr::Selector { object, .. } | Expr::TypeAssert { object, .. } => {
            v.visit_expr_mut(object)?;
        }
        Expr::Index { object, index } => {
            v.visit_expr_mut(object)?;
            v.visit_expr_mut(index)?;
        }
        Expr::Slice { object, low, high } => {
            v.visit_expr_mut(object)?;
            for bound in low.iter_mut().chain(high.iter_mut()) {
                v.visit_expr_mut(bound)?;
            }
        }
        Expr::Call { func, args, .. } => {
            v.visit_expr_mut(func)?;
            for arg in args {
                v.visit_expr_mut(arg)?;
            }
        }
        Expr::Unary { operand, .. } => v.visit_expr_mut(operand)?,
        Expr::Binary { lhs, rhs, .. } => {
            v.visit_expr_mut(lhs)?;
            v.visit_expr_mut(rhs)?;
        }
    }
    Ok(())
}
