use crate::lexer::Comment;
use crate::parser::ast::*;
use crate::span::{Span, Spanned};

/// Pretty-print a `File` as canonical Go source.
///
/// `source` is the text the file was parsed from; it is consulted for blank
/// lines and comment placement only, so rewritten nodes with dummy spans
/// print the same as parsed ones.
pub fn pretty_print(file: &File, source: &str) -> String {
    let mut pp = PrettyPrinter::new(source, &file.comments);
    pp.emit_file(file);
    pp.buf
}

/// A type as Go spells it, e.g. `map[string][]int`.
pub fn print_type(ty: &TypeExpr) -> String {
    let mut pp = PrettyPrinter::new("", &[]);
    pp.emit_type(ty, Span::dummy());
    pp.buf
}

/// A single expression, without source context.
pub fn print_expr(expr: &Spanned<Expr>) -> String {
    let mut pp = PrettyPrinter::new("", &[]);
    pp.emit_expr(expr);
    pp.buf
}

/// Longest header plus body that still prints a function body on one line.
const MAX_ONE_LINE: usize = 100;
/// Precedence of unary operators; binary levels run 1..=5.
const UNARY_PREC: u8 = 6;
const HIGHEST_PREC: u8 = 7;

/// Blank-line policy in front of a node.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Gap {
    /// First item after an opening brace: never blank.
    Start,
    /// Keep one blank line if the source had at least one.
    Keep,
    /// Always one blank line.
    Force,
}

/// One printed line of a column-aligned group: struct fields, grouped
/// specs, key-value elements.
struct Row {
    /// Buffer offset just past each non-final cell, with that cell's width.
    cells: Vec<(usize, usize)>,
    /// A blank or comment line sits between this row and the previous one.
    breaks_before: bool,
    /// The row spans several lines; alignment restarts after it.
    multiline: bool,
}

struct PrettyPrinter<'a> {
    buf: String,
    indent: usize,
    source: &'a str,
    comments: &'a [Comment],
    next_comment: usize,
    /// End of the last source-positioned thing printed.
    last_real_end: usize,
}

impl<'a> PrettyPrinter<'a> {
    fn new(source: &'a str, comments: &'a [Comment]) -> Self {
        Self { buf: String::new(), indent: 0, source, comments, next_comment: 0, last_real_end: 0 }
    }

    fn write(&mut self, s: &str) {
        self.buf.push_str(s);
    }

    fn newline(&mut self) {
        self.buf.push('\n');
    }

    fn write_indent(&mut self) {
        for _ in 0..self.indent {
            self.buf.push('\t');
        }
    }

    fn indent(&mut self) {
        self.indent += 1;
    }

    fn dedent(&mut self) {
        self.indent = self.indent.saturating_sub(1);
    }

    // ── Trivia ───────────────────────────────────────────────────────

    fn has_blank_line(&self, from: usize, to: usize) -> bool {
        if from == 0 || from >= to {
            return false;
        }
        self.source
            .get(from..to)
            .is_some_and(|between| between.matches('\n').count() >= 2)
    }

    fn separate(&mut self, next_start: usize, gap: Gap) {
        let blank = match gap {
            Gap::Start => false,
            Gap::Force => true,
            Gap::Keep => self.has_blank_line(self.last_real_end, next_start),
        };
        if blank {
            self.newline();
        }
    }

    /// Emit every pending comment that starts before `start`, each on its
    /// own line, then the blank line (if any) owed to the node at `start`.
    fn emit_leading(&mut self, start: usize, gap: Gap, node_follows: bool) {
        let mut first = true;
        while let Some(comment) = self.comments.get(self.next_comment) {
            if comment.span.start >= start {
                break;
            }
            self.separate(comment.span.start, if first { gap } else { Gap::Keep });
            self.write_indent();
            self.write(&comment.text);
            self.newline();
            self.last_real_end = comment.span.end;
            self.next_comment += 1;
            first = false;
        }
        if node_follows {
            self.separate(start, if first { gap } else { Gap::Keep });
        }
    }

    /// A comment on the same source line right after `span` stays there.
    fn emit_trailing(&mut self, span: Span) {
        if span.is_dummy() {
            return;
        }
        if let Some(comment) = self.comments.get(self.next_comment) {
            let same_line = comment.span.start >= span.end
                && self
                    .source
                    .get(span.end..comment.span.start)
                    .is_some_and(|between| !between.contains('\n'));
            if comment.trailing && same_line {
                self.write(" ");
                self.write(&comment.text);
                self.next_comment += 1;
                self.last_real_end = self.last_real_end.max(comment.span.end);
            }
        }
        self.last_real_end = self.last_real_end.max(span.end);
    }

    fn has_comment_within(&self, span: Span) -> bool {
        self.comments[self.next_comment..]
            .iter()
            .any(|c| c.span.start >= span.start && c.span.start < span.end)
    }

    // ── Alignment ────────────────────────────────────────────────────

    /// Close the current cell: record where it ends and how wide it is.
    fn end_cell(&self, cells: &mut Vec<(usize, usize)>, cell_start: usize) -> usize {
        let end = self.buf.len();
        cells.push((end, self.buf[cell_start..end].chars().count()));
        end
    }

    /// Pad non-final cells so each column lines up within runs of
    /// consecutive rows, the way gofmt's tabwriter does.
    fn align(&mut self, rows: &[Row]) {
        let columns = rows.iter().map(|r| r.cells.len()).max().unwrap_or(0);
        let mut inserts: Vec<(usize, usize)> = Vec::new();
        for col in 0..columns {
            let mut run: Vec<(usize, usize)> = Vec::new();
            let mut prev_multiline = false;
            for row in rows {
                let cell = row.cells.get(col).copied();
                if row.breaks_before || prev_multiline || cell.is_none() {
                    flush_run(&mut run, &mut inserts);
                }
                if let Some(cell) = cell {
                    run.push(cell);
                }
                prev_multiline = row.multiline;
            }
            flush_run(&mut run, &mut inserts);
        }
        inserts.sort_by(|a, b| b.0.cmp(&a.0));
        for (pos, pad) in inserts {
            self.buf.insert_str(pos, &" ".repeat(pad));
        }
    }

    // ── File ─────────────────────────────────────────────────────────

    fn emit_file(&mut self, file: &File) {
        self.emit_leading(file.package.span.start, Gap::Start, true);
        self.write("package ");
        self.write(&file.package.node);
        self.emit_trailing(file.package.span);
        self.newline();

        for (i, import) in file.imports.iter().enumerate() {
            let gap = if i == 0 { Gap::Force } else { Gap::Keep };
            self.emit_leading(import.span.start, gap, true);
            self.emit_import(&import.node);
            self.emit_trailing(import.span);
            self.newline();
        }

        for decl in &file.decls {
            self.emit_leading(decl.span.start, Gap::Force, true);
            self.emit_decl(decl);
            self.emit_trailing(decl.span);
            self.newline();
        }

        self.emit_leading(usize::MAX, Gap::Keep, false);
    }

    // ── Imports ──────────────────────────────────────────────────────

    fn emit_import(&mut self, import: &ImportDecl) {
        if !import.grouped {
            self.write("import ");
            if let Some(spec) = import.specs.first() {
                self.emit_import_spec(spec);
            }
            return;
        }

        self.write("import (");
        self.newline();
        self.indent();
        // Runs separated by blank lines are sorted independently.
        let mut runs: Vec<Vec<&ImportSpec>> = Vec::new();
        let mut prev_end = 0;
        for spec in &import.specs {
            let start = spec.alias.as_ref().map_or(spec.path.span.start, |a| a.span.start);
            match runs.last_mut() {
                Some(run) if !self.has_blank_line(prev_end, start) => run.push(spec),
                _ => runs.push(vec![spec]),
            }
            prev_end = spec.path.span.end;
        }
        for (i, run) in runs.iter_mut().enumerate() {
            if i > 0 {
                self.newline();
            }
            run.sort_by(|a, b| a.path.node.cmp(&b.path.node));
            for spec in run.iter() {
                self.write_indent();
                self.emit_import_spec(spec);
                self.emit_trailing(spec.path.span);
                self.newline();
            }
        }
        self.dedent();
        self.write_indent();
        self.write(")");
    }

    fn emit_import_spec(&mut self, spec: &ImportSpec) {
        if let Some(alias) = &spec.alias {
            self.write(&alias.node);
            self.write(" ");
        }
        self.write(&spec.path.node);
    }

    // ── Declarations ─────────────────────────────────────────────────

    fn emit_decl(&mut self, decl: &Spanned<Decl>) {
        match &decl.node {
            Decl::Func(func) => self.emit_func_decl(func),
            Decl::Type { specs, grouped } => {
                self.emit_group("type", specs, *grouped, type_spec_span, Self::emit_type_spec)
            }
            Decl::Var { specs, grouped } => {
                self.emit_group("var", specs, *grouped, value_spec_span, Self::emit_value_spec)
            }
            Decl::Const { specs, grouped } => {
                self.emit_group("const", specs, *grouped, value_spec_span, Self::emit_value_spec)
            }
        }
    }

    /// `keyword spec` or `keyword ( spec... )` with aligned columns.
    fn emit_group<T>(
        &mut self,
        keyword: &str,
        specs: &[T],
        grouped: bool,
        span_of: impl Fn(&T) -> Span,
        mut emit_spec: impl FnMut(&mut Self, &T, usize) -> Vec<(usize, usize)>,
    ) {
        self.write(keyword);
        if !grouped {
            self.write(" ");
            if let Some(spec) = specs.first() {
                let line_start = self.buf.len();
                let cells = emit_spec(self, spec, line_start);
                self.align(&[Row { cells, breaks_before: false, multiline: false }]);
            }
            return;
        }

        self.write(" (");
        self.newline();
        self.indent();
        let mut rows = Vec::new();
        let mut prev_end = None;
        for (i, spec) in specs.iter().enumerate() {
            let span = span_of(spec);
            if !span.is_dummy() {
                self.emit_leading(span.start, if i == 0 { Gap::Start } else { Gap::Keep }, true);
            }
            let row_start = self.buf.len();
            self.write_indent();
            let line_start = self.buf.len();
            let cells = emit_spec(self, spec, line_start);
            let multiline = self.buf[line_start..].contains('\n');
            rows.push(Row { cells, breaks_before: prev_end != Some(row_start) && i > 0, multiline });
            self.emit_trailing(span);
            self.newline();
            prev_end = Some(self.buf.len());
        }
        self.align(&rows);
        self.dedent();
        self.write_indent();
        self.write(")");
    }

    fn emit_type_spec(&mut self, spec: &TypeSpec, line_start: usize) -> Vec<(usize, usize)> {
        let mut cells = Vec::new();
        self.write(&spec.name.node);
        self.end_cell(&mut cells, line_start);
        if spec.alias {
            self.write("= ");
        }
        self.emit_type(&spec.ty.node, spec.ty.span);
        cells
    }

    fn emit_value_spec(&mut self, spec: &ValueSpec, line_start: usize) -> Vec<(usize, usize)> {
        let mut cells = Vec::new();
        self.write(&join_names(&spec.names));
        if spec.ty.is_none() && spec.values.is_empty() {
            return cells;
        }
        let cell_start = self.end_cell(&mut cells, line_start);
        if let Some(ty) = &spec.ty {
            self.emit_type(&ty.node, ty.span);
            if !spec.values.is_empty() {
                self.end_cell(&mut cells, cell_start);
            }
        }
        if !spec.values.is_empty() {
            self.write("= ");
            self.emit_expr_list(&spec.values, 1);
        }
        cells
    }

    fn emit_func_decl(&mut self, func: &FuncDecl) {
        let header_start = self.buf.len();
        self.write("func ");
        if let Some(recv) = &func.recv {
            self.write("(");
            self.emit_param(recv);
            self.write(") ");
        }
        self.write(&func.name.node);
        self.emit_signature(&func.sig);
        if let Some(body) = &func.body {
            self.write(" ");
            self.emit_func_body(body, header_start);
        }
    }

    fn emit_signature(&mut self, sig: &Signature) {
        self.write("(");
        self.emit_params(&sig.params);
        self.write(")");
        match sig.results.as_slice() {
            [] => {}
            [single] if single.names.is_empty() => {
                self.write(" ");
                self.emit_type(&single.ty.node, single.ty.span);
            }
            results => {
                self.write(" (");
                self.emit_params(results);
                self.write(")");
            }
        }
    }

    fn emit_params(&mut self, params: &[Param]) {
        for (i, param) in params.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            self.emit_param(param);
        }
    }

    fn emit_param(&mut self, param: &Param) {
        if !param.names.is_empty() {
            self.write(&join_names(&param.names));
            self.write(" ");
        }
        self.emit_type(&param.ty.node, param.ty.span);
    }

    // ── Type expressions ─────────────────────────────────────────────

    fn emit_type(&mut self, ty: &TypeExpr, span: Span) {
        match ty {
            TypeExpr::Named(name) => self.write(name),
            TypeExpr::Qualified { package, name } => {
                self.write(package);
                self.write(".");
                self.write(name);
            }
            TypeExpr::Pointer(inner) => {
                self.write("*");
                self.emit_type(&inner.node, inner.span);
            }
            TypeExpr::Slice(elem) => {
                self.write("[]");
                self.emit_type(&elem.node, elem.span);
            }
            TypeExpr::Array { len, elem } => {
                self.write("[");
                match len {
                    Some(len) => self.emit_expr(len),
                    None => self.write("..."),
                }
                self.write("]");
                self.emit_type(&elem.node, elem.span);
            }
            TypeExpr::Map { key, value } => {
                self.write("map[");
                self.emit_type(&key.node, key.span);
                self.write("]");
                self.emit_type(&value.node, value.span);
            }
            TypeExpr::Chan { dir, elem } => {
                self.write(match dir {
                    ChanDir::Both => "chan ",
                    ChanDir::Send => "chan<- ",
                    ChanDir::Recv => "<-chan ",
                });
                self.emit_type(&elem.node, elem.span);
            }
            TypeExpr::Func(sig) => {
                self.write("func");
                self.emit_signature(sig);
            }
            TypeExpr::Struct(fields) => self.emit_struct(fields, span),
            TypeExpr::Interface(elems) => self.emit_interface(elems, span),
            TypeExpr::Variadic(elem) => {
                self.write("...");
                self.emit_type(&elem.node, elem.span);
            }
        }
    }

    fn emit_struct(&mut self, fields: &[StructField], span: Span) {
        if fields.is_empty() && !self.has_comment_within(span) {
            self.write("struct{}");
            return;
        }
        self.write("struct {");
        self.newline();
        self.indent();
        let mut rows = Vec::new();
        let mut prev_end = None;
        for (i, field) in fields.iter().enumerate() {
            let start = field.names.first().map_or(field.ty.span.start, |n| n.span.start);
            if !field.ty.span.is_dummy() {
                self.emit_leading(start, if i == 0 { Gap::Start } else { Gap::Keep }, true);
            }
            let row_start = self.buf.len();
            self.write_indent();
            let line_start = self.buf.len();
            let mut cells = Vec::new();
            let mut cell_start = line_start;
            if !field.names.is_empty() {
                self.write(&join_names(&field.names));
                cell_start = self.end_cell(&mut cells, cell_start);
            }
            self.emit_type(&field.ty.node, field.ty.span);
            if let Some(tag) = &field.tag {
                self.end_cell(&mut cells, cell_start);
                self.write(tag);
            }
            let multiline = self.buf[line_start..].contains('\n');
            rows.push(Row { cells, breaks_before: prev_end != Some(row_start) && i > 0, multiline });
            self.emit_trailing(field.ty.span);
            self.newline();
            prev_end = Some(self.buf.len());
        }
        self.align(&rows);
        if !span.is_dummy() {
            self.emit_leading(span.end, Gap::Keep, false);
        }
        self.dedent();
        self.write_indent();
        self.write("}");
    }

    fn emit_interface(&mut self, elems: &[InterfaceElem], span: Span) {
        if elems.is_empty() && !self.has_comment_within(span) {
            self.write("interface{}");
            return;
        }
        self.write("interface {");
        self.newline();
        self.indent();
        for (i, elem) in elems.iter().enumerate() {
            let elem_span = match elem {
                InterfaceElem::Method { name, .. } => name.span,
                InterfaceElem::Embedded(ty) => ty.span,
            };
            if !elem_span.is_dummy() {
                self.emit_leading(elem_span.start, if i == 0 { Gap::Start } else { Gap::Keep }, true);
            }
            self.write_indent();
            match elem {
                InterfaceElem::Method { name, sig } => {
                    self.write(&name.node);
                    self.emit_signature(sig);
                }
                InterfaceElem::Embedded(ty) => self.emit_type(&ty.node, ty.span),
            }
            self.emit_trailing(elem_span);
            self.newline();
        }
        if !span.is_dummy() {
            self.emit_leading(span.end, Gap::Keep, false);
        }
        self.dedent();
        self.write_indent();
        self.write("}");
    }

    // ── Blocks ───────────────────────────────────────────────────────

    fn emit_block(&mut self, block: &Spanned<Block>) {
        self.emit_block_owned(block, None);
    }

    /// `owner` is the source statement a synthesized block stands in for;
    /// a comment trailing that statement goes after the opening brace.
    fn emit_block_owned(&mut self, block: &Spanned<Block>, owner: Option<Span>) {
        self.write("{");
        match owner {
            Some(owner) => self.emit_trailing(owner),
            None if !block.span.is_dummy() => {
                self.emit_trailing(Span::new(block.span.start, block.span.start + 1));
            }
            None => {}
        }
        self.newline();
        self.indent();
        self.emit_stmt_list(&block.node.stmts);
        if !block.span.is_dummy() {
            self.emit_leading(block.span.end, Gap::Keep, false);
        }
        self.dedent();
        self.write_indent();
        self.write("}");
    }

    /// Function bodies that were on one line and stay short keep that form:
    /// `func() int { return 1 }`.
    fn emit_func_body(&mut self, body: &Spanned<Block>, header_start: usize) {
        if self.try_one_line_body(body, header_start) {
            return;
        }
        self.emit_block(body);
    }

    fn try_one_line_body(&mut self, body: &Spanned<Block>, header_start: usize) -> bool {
        let on_one_line = self
            .source
            .get(body.span.start..body.span.end)
            .is_some_and(|text| !text.contains('\n'));
        if body.span.is_dummy()
            || !on_one_line
            || body.node.stmts.len() > 5
            || self.has_comment_within(body.span)
        {
            return false;
        }

        let mark = self.buf.len();
        let saved = (self.next_comment, self.last_real_end);
        self.write("{");
        if !body.node.stmts.is_empty() {
            self.write(" ");
            for (i, stmt) in body.node.stmts.iter().enumerate() {
                if i > 0 {
                    self.write("; ");
                }
                self.emit_stmt(stmt);
            }
            self.write(" ");
        }
        self.write("}");

        let width = self.buf[header_start..].chars().count();
        if self.buf[mark..].contains('\n') || width > MAX_ONE_LINE {
            self.buf.truncate(mark);
            (self.next_comment, self.last_real_end) = saved;
            return false;
        }
        self.last_real_end = self.last_real_end.max(body.span.end);
        true
    }

    fn emit_stmt_list(&mut self, stmts: &[Spanned<Stmt>]) {
        for (i, stmt) in stmts.iter().enumerate() {
            if !stmt.span.is_dummy() {
                self.emit_leading(stmt.span.start, if i == 0 { Gap::Start } else { Gap::Keep }, true);
            }
            self.write_indent();
            self.emit_stmt(stmt);
            self.emit_trailing(stmt.span);
            self.newline();
        }
    }

    // ── Statements ───────────────────────────────────────────────────

    fn emit_stmt(&mut self, stmt: &Spanned<Stmt>) {
        match &stmt.node {
            Stmt::Expr(expr) => self.emit_expr_depth(expr, 1),
            Stmt::Assign { lhs, op, rhs } => {
                let depth = if lhs.len() > 1 && rhs.len() > 1 { 2 } else { 1 };
                self.emit_expr_list(lhs, depth);
                self.write(" ");
                self.write(op.as_str());
                self.write(" ");
                self.emit_expr_list(rhs, depth);
            }
            Stmt::IncDec { target, inc } => {
                self.emit_expr_depth(target, 2);
                self.write(if *inc { "++" } else { "--" });
            }
            Stmt::Send { channel, value } => {
                self.emit_expr_depth(channel, 1);
                self.write(" <- ");
                self.emit_expr_depth(value, 1);
            }
            Stmt::Var(spec) | Stmt::Const(spec) => {
                self.write(if matches!(stmt.node, Stmt::Var(_)) { "var " } else { "const " });
                let line_start = self.buf.len();
                let cells = self.emit_value_spec(spec, line_start);
                self.align(&[Row { cells, breaks_before: false, multiline: false }]);
            }
            Stmt::Return(values) => {
                self.write("return");
                if !values.is_empty() {
                    self.write(" ");
                    self.emit_expr_list(values, 1);
                }
            }
            Stmt::If(if_stmt) => self.emit_if(if_stmt, stmt.span),
            Stmt::For { init, condition, post, body } => {
                self.write("for");
                self.emit_control_clause(true, init.as_deref(), condition.as_ref(), post.as_deref());
                self.emit_block(body);
            }
            Stmt::Range { key, value, define, iterable, body } => {
                self.write("for ");
                if let Some(key) = key {
                    self.emit_expr(key);
                    if let Some(value) = value {
                        self.write(", ");
                        self.emit_expr(value);
                    }
                    self.write(if *define { " := " } else { " = " });
                }
                self.write("range ");
                self.emit_expr(strip_parens(iterable));
                self.write(" ");
                self.emit_block(body);
            }
            Stmt::Switch { init, tag, clauses } => {
                self.write("switch");
                self.emit_control_clause(false, init.as_deref(), tag.as_ref(), None);
                self.write("{");
                self.newline();
                for (i, clause) in clauses.iter().enumerate() {
                    if !clause.span.is_dummy() {
                        let gap = if i == 0 { Gap::Start } else { Gap::Keep };
                        self.emit_leading(clause.span.start, gap, true);
                    }
                    self.write_indent();
                    if clause.node.is_default {
                        self.write("default:");
                    } else {
                        self.write("case ");
                        self.emit_expr_list(&clause.node.values, 1);
                        self.write(":");
                    }
                    self.newline();
                    self.indent();
                    self.emit_stmt_list(&clause.node.body);
                    self.dedent();
                    self.last_real_end = self.last_real_end.max(clause.span.end);
                }
                if !stmt.span.is_dummy() {
                    self.emit_leading(stmt.span.end, Gap::Keep, false);
                }
                self.write_indent();
                self.write("}");
            }
            Stmt::Block(block) => self.emit_block(block),
            Stmt::Go(call) => {
                self.write("go ");
                self.emit_expr(call);
            }
            Stmt::Defer(call) => {
                self.write("defer ");
                self.emit_expr(call);
            }
            Stmt::Break => self.write("break"),
            Stmt::Continue => self.write("continue"),
            Stmt::Fallthrough => self.write("fallthrough"),
        }
    }

    fn emit_if(&mut self, if_stmt: &IfStmt, span: Span) {
        self.write("if");
        self.emit_control_clause(false, if_stmt.init.as_deref(), Some(&if_stmt.condition), None);
        // An error check standing in for a one-line statement.
        let owner = (if_stmt.then_block.span.is_dummy() && if_stmt.else_branch.is_none()).then_some(span);
        self.emit_block_owned(&if_stmt.then_block, owner);
        if let Some(else_branch) = &if_stmt.else_branch {
            self.write(" else ");
            match &else_branch.node {
                Stmt::If(nested) => self.emit_if(nested, else_branch.span),
                Stmt::Block(block) => self.emit_block(block),
                other => {
                    // Not produced by the parser; print it braced.
                    let block = Block { stmts: vec![Spanned::new(other.clone(), else_branch.span)] };
                    self.emit_block(&Spanned::dummy(block));
                }
            }
        }
    }

    /// Header of `if`, `for` and `switch`, including the blank before `{`.
    fn emit_control_clause(
        &mut self,
        is_for: bool,
        init: Option<&Spanned<Stmt>>,
        condition: Option<&Spanned<Expr>>,
        post: Option<&Spanned<Stmt>>,
    ) {
        self.write(" ");
        let mut needs_blank = false;
        if init.is_none() && post.is_none() {
            if let Some(condition) = condition {
                self.emit_expr(strip_parens(condition));
                needs_blank = true;
            }
        } else {
            if let Some(init) = init {
                self.emit_stmt(init);
            }
            self.write("; ");
            if let Some(condition) = condition {
                self.emit_expr(strip_parens(condition));
                needs_blank = true;
            }
            if is_for {
                self.write("; ");
                needs_blank = false;
                if let Some(post) = post {
                    self.emit_stmt(post);
                    needs_blank = true;
                }
            }
        }
        if needs_blank {
            self.write(" ");
        }
    }

    // ── Expressions ──────────────────────────────────────────────────

    fn emit_expr(&mut self, expr: &Spanned<Expr>) {
        self.emit_expr1(expr, 0, 1);
    }

    fn emit_expr_depth(&mut self, expr: &Spanned<Expr>, depth: usize) {
        self.emit_expr1(expr, 0, depth);
    }

    fn emit_expr_list(&mut self, exprs: &[Spanned<Expr>], depth: usize) {
        for (i, expr) in exprs.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            self.emit_expr_depth(expr, depth);
        }
    }

    /// `prec1` is the weakest precedence that may print without parens;
    /// `depth` drives the operator spacing rule for binary expressions.
    fn emit_expr1(&mut self, expr: &Spanned<Expr>, prec1: u8, depth: usize) {
        match &expr.node {
            Expr::Ident(name) => self.write(name),
            Expr::BasicLit { value, .. } => self.write(value),
            Expr::Binary { .. } => {
                let cutoff = cutoff(expr, depth.max(1));
                self.emit_binary(expr, prec1, cutoff, depth.max(1));
            }
            Expr::Unary { op, operand } => {
                if UNARY_PREC < prec1 {
                    self.write("(");
                    self.emit_expr(expr);
                    self.write(")");
                    return;
                }
                self.write(op.as_str());
                if merges_with(*op, operand) {
                    self.write(" ");
                }
                if *op == UnaryOp::Deref {
                    self.emit_expr(operand);
                } else {
                    self.emit_expr1(operand, UNARY_PREC, depth);
                }
            }
            Expr::Paren(inner) => {
                if matches!(inner.node, Expr::Paren(_)) {
                    self.emit_expr_depth(inner, depth);
                } else {
                    self.write("(");
                    self.emit_expr_depth(inner, reduce_depth(depth));
                    self.write(")");
                }
            }
            Expr::Call { func, args, ellipsis } => {
                let depth = if args.len() > 1 { depth + 1 } else { depth };
                let paren = matches!(
                    func.node,
                    Expr::Type(TypeExpr::Func(_)) | Expr::Type(TypeExpr::Chan { dir: ChanDir::Recv, .. })
                );
                if paren {
                    self.write("(");
                }
                self.emit_expr1(func, HIGHEST_PREC, depth);
                if paren {
                    self.write(")");
                }
                self.write("(");
                self.emit_expr_list(args, depth);
                if *ellipsis {
                    self.write("...");
                }
                self.write(")");
            }
            Expr::Index { object, index } => {
                self.emit_expr1(object, HIGHEST_PREC, 1);
                self.write("[");
                self.emit_expr_depth(index, depth + 1);
                self.write("]");
            }
            Expr::Slice { object, low, high } => {
                self.emit_expr1(object, HIGHEST_PREC, 1);
                self.write("[");
                let indices = [low.as_deref(), high.as_deref()];
                let count = indices.iter().flatten().count();
                let has_binary = indices.iter().flatten().any(|e| matches!(e.node, Expr::Binary { .. }));
                let blanks = depth <= 1 && count > 1 && has_binary;
                if let Some(low) = low {
                    self.emit_expr_depth(low, depth + 1);
                    if blanks {
                        self.write(" ");
                    }
                }
                self.write(":");
                if let Some(high) = high {
                    if blanks {
                        self.write(" ");
                    }
                    self.emit_expr_depth(high, depth + 1);
                }
                self.write("]");
            }
            Expr::Selector { object, field } => {
                self.emit_expr1(object, HIGHEST_PREC, depth);
                self.write(".");
                self.write(&field.node);
            }
            Expr::TypeAssert { object, ty } => {
                self.emit_expr1(object, HIGHEST_PREC, depth);
                self.write(".(");
                self.emit_type(&ty.node, ty.span);
                self.write(")");
            }
            Expr::Composite { ty, elements, multiline } => {
                if let Some(ty) = ty {
                    self.emit_type(&ty.node, ty.span);
                }
                self.emit_composite_body(expr.span, elements, *multiline);
            }
            Expr::FuncLit { sig, body } => {
                let header_start = self.buf.len();
                self.write("func");
                self.emit_signature(sig);
                self.write(" ");
                self.emit_func_body(body, header_start);
            }
            Expr::Type(ty) => self.emit_type(ty, expr.span),
            Expr::Try(inner) => {
                self.emit_expr1(inner, HIGHEST_PREC, depth);
                self.write("?");
            }
        }
    }

    fn emit_binary(&mut self, expr: &Spanned<Expr>, prec1: u8, cutoff: u8, depth: usize) {
        let Expr::Binary { op, lhs, rhs } = &expr.node else {
            self.emit_expr1(expr, prec1, depth);
            return;
        };
        let prec = op.precedence();
        if prec < prec1 {
            self.write("(");
            self.emit_expr_depth(expr, reduce_depth(depth));
            self.write(")");
            return;
        }
        let blank = prec < cutoff;
        self.emit_expr1(lhs, prec, depth + diff_prec(lhs, prec));
        if blank {
            self.write(" ");
        }
        self.write(op.as_str());
        if blank {
            self.write(" ");
        }
        self.emit_expr1(rhs, prec + 1, depth + 1);
    }

    fn emit_composite_body(&mut self, span: Span, elements: &[Element], multiline: bool) {
        if !multiline {
            self.write("{");
            for (i, element) in elements.iter().enumerate() {
                if i > 0 {
                    self.write(", ");
                }
                if let Some(key) = &element.key {
                    self.emit_expr(key);
                    self.write(": ");
                }
                self.emit_expr(&element.value);
            }
            self.write("}");
            return;
        }

        self.write("{");
        self.newline();
        self.indent();
        let mut rows = Vec::new();
        let mut prev_end = None;
        for (i, element) in elements.iter().enumerate() {
            let start = element.key.as_ref().map_or(element.value.span.start, |k| k.span.start);
            if !element.value.span.is_dummy() {
                self.emit_leading(start, if i == 0 { Gap::Start } else { Gap::Keep }, true);
            }
            let row_start = self.buf.len();
            self.write_indent();
            let line_start = self.buf.len();
            let mut cells = Vec::new();
            if let Some(key) = &element.key {
                self.emit_expr(key);
                self.write(":");
                self.end_cell(&mut cells, line_start);
            }
            self.emit_expr(&element.value);
            self.write(",");
            let multiline = self.buf[line_start..].contains('\n');
            rows.push(Row { cells, breaks_before: prev_end != Some(row_start) && i > 0, multiline });
            self.emit_trailing(element.value.span);
            self.newline();
            prev_end = Some(self.buf.len());
        }
        self.align(&rows);
        if !span.is_dummy() {
            self.emit_leading(span.end, Gap::Keep, false);
        }
        self.dedent();
        self.write_indent();
        self.write("}");
    }
}

// ── Helpers ──────────────────────────────────────────────────────────

fn flush_run(run: &mut Vec<(usize, usize)>, inserts: &mut Vec<(usize, usize)>) {
    let width = run.iter().map(|&(_, w)| w).max().unwrap_or(0);
    for (pos, w) in run.drain(..) {
        inserts.push((pos, width - w + 1));
    }
}

fn type_spec_span(spec: &TypeSpec) -> Span {
    spec.name.span.to(spec.ty.span)
}

fn value_spec_span(spec: &ValueSpec) -> Span {
    let (Some(first), Some(last_name)) = (spec.names.first(), spec.names.last()) else {
        return Span::dummy();
    };
    let end = spec
        .values
        .last()
        .map(|v| v.span)
        .or(spec.ty.as_ref().map(|t| t.span))
        .unwrap_or(last_name.span);
    first.span.to(end)
}

fn join_names(names: &[Spanned<String>]) -> String {
    names.iter().map(|n| n.node.as_str()).collect::<Vec<_>>().join(", ")
}

fn reduce_depth(depth: usize) -> usize {
    depth.saturating_sub(1).max(1)
}

fn diff_prec(expr: &Spanned<Expr>, prec: u8) -> usize {
    match &expr.node {
        Expr::Binary { op, .. } if op.precedence() == prec => 0,
        _ => 1,
    }
}

/// gofmt's spacing cutoff: binary operators with precedence below it get
/// blanks around them.
fn cutoff(expr: &Spanned<Expr>, depth: usize) -> u8 {
    let (has4, has5, max_problem) = walk_binary(expr);
    if max_problem > 0 {
        return max_problem + 1;
    }
    if has4 && has5 {
        return if depth == 1 { 5 } else { 4 };
    }
    if depth == 1 {
        6
    } else {
        4
    }
}

fn walk_binary(expr: &Spanned<Expr>) -> (bool, bool, u8) {
    let Expr::Binary { op, lhs, rhs } = &expr.node else {
        return (false, false, 0);
    };
    let prec = op.precedence();
    let mut has4 = prec == 4;
    let mut has5 = prec == 5;
    let mut max_problem = 0;

    if let Expr::Binary { op: l, .. } = &lhs.node {
        if l.precedence() >= prec {
            let (h4, h5, mp) = walk_binary(lhs);
            has4 |= h4;
            has5 |= h5;
            max_problem = max_problem.max(mp);
        }
    }

    match &rhs.node {
        Expr::Binary { op: r, .. } if r.precedence() > prec => {
            let (h4, h5, mp) = walk_binary(rhs);
            has4 |= h4;
            has5 |= h5;
            max_problem = max_problem.max(mp);
        }
        Expr::Unary { op: u, .. } => match (op, u) {
            (BinOp::Div, UnaryOp::Deref)
            | (BinOp::BitAnd, UnaryOp::Addr)
            | (BinOp::BitAnd, UnaryOp::BitNot) => max_problem = 5,
            (BinOp::Add, UnaryOp::Pos) | (BinOp::Sub, UnaryOp::Neg) => {
                max_problem = max_problem.max(4)
            }
            _ => {}
        },
        _ => {}
    }
    (has4, has5, max_problem)
}

/// Whether printing `op` directly before `operand` would fuse into another
/// token, as `-` followed by `-x` would.
fn merges_with(op: UnaryOp, operand: &Spanned<Expr>) -> bool {
    match &operand.node {
        Expr::Unary { op: inner, .. } => matches!(
            (op, inner),
            (UnaryOp::Neg, UnaryOp::Neg)
                | (UnaryOp::Pos, UnaryOp::Pos)
                | (UnaryOp::Addr, UnaryOp::Addr)
                | (UnaryOp::Addr, UnaryOp::BitNot)
        ),
        _ => false,
    }
}

/// Drop redundant parens around a control-clause expression unless they
/// protect a composite literal whose type is a bare name.
fn strip_parens(expr: &Spanned<Expr>) -> &Spanned<Expr> {
    match &expr.node {
        Expr::Paren(inner) if !has_named_composite(inner) => strip_parens(inner),
        _ => expr,
    }
}

fn has_named_composite(expr: &Spanned<Expr>) -> bool {
    match &expr.node {
        Expr::Composite { ty, .. } => matches!(
            ty.as_deref().map(|t| &t.node),
            Some(TypeExpr::Named(_) | TypeExpr::Qualified { .. })
        ),
        Expr::Paren(_) | Expr::FuncLit { .. } => false,
        Expr::Selector { object, .. } | Expr::TypeAssert { object, .. } => has_named_composite(object),
        Expr::Index { object, index } => has_named_composite(object) || has_named_composite(index),
        Expr::Slice { object, low, high } => {
            has_named_composite(object)
                || low.as_deref().is_some_and(has_named_composite)
                || high.as_deref().is_some_and(has_named_composite)
        }
        Expr::Call { func, args, .. } => {
            has_named_composite(func) || args.iter().any(has_named_composite)
        }
        Expr::Unary { operand, .. } | Expr::Try(operand) => has_named_composite(operand),
        Expr::Binary { lhs, rhs, .. } => has_named_composite(lhs) || has_named_composite(rhs),
        Expr::Ident(_) | Expr::BasicLit { .. } | Expr::Type(_) => false,
    }
}
