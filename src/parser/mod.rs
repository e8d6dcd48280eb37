pub mod ast;

use crate::diagnostics::CompileError;
use crate::lexer::token::Token;
use crate::lexer::Comment;
use crate::span::{Span, Spanned};
use ast::*;

pub struct Parser<'a> {
    tokens: &'a [Spanned<Token>],
    source: &'a str,
    pos: usize,
    /// Set while parsing `if`/`for`/`switch` headers, where `T {` opens the
    /// body rather than a composite literal.
    restrict_composite: bool,
    depth: usize,
}

/// Deepest nesting of expressions, types and blocks the parser accepts.
const MAX_NESTING: usize = 100;

/// Header of a `for` statement, parsed before its body.
enum ForHeader {
    Clauses {
        init: Option<Box<Spanned<Stmt>>>,
        condition: Option<Spanned<Expr>>,
        post: Option<Box<Spanned<Stmt>>>,
    },
    Range {
        key: Option<Spanned<Expr>>,
        value: Option<Spanned<Expr>>,
        define: bool,
        iterable: Spanned<Expr>,
    },
}

/// One comma-separated entry of a parameter list before grouping is known.
enum ParamEntry {
    Bare(Spanned<String>),
    Named(Spanned<String>, Spanned<TypeExpr>),
    Type(Spanned<TypeExpr>),
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [Spanned<Token>], source: &'a str) -> Self {
        Self { tokens, source, pos: 0, restrict_composite: false, depth: 0 }
    }

    fn peek(&self) -> Option<&Spanned<Token>> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self) -> Option<Token> {
        self.peek().map(|t| t.node)
    }

    fn peek_nth(&self, n: usize) -> Option<Token> {
        self.tokens.get(self.pos + n).map(|t| t.node)
    }

    fn check(&self, tok: Token) -> bool {
        self.peek_kind() == Some(tok)
    }

    fn advance(&mut self) -> Option<&Spanned<Token>> {
        if self.pos < self.tokens.len() {
            let tok = &self.tokens[self.pos];
            self.pos += 1;
            Some(tok)
        } else {
            None
        }
    }

    fn eat(&mut self, tok: Token) -> bool {
        if self.check(tok) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: Token) -> Result<Span, CompileError> {
        match self.tokens.get(self.pos) {
            Some(tok) if tok.node == expected => {
                self.pos += 1;
                Ok(tok.span)
            }
            Some(tok) => Err(CompileError::syntax(
                format!("expected {expected}, found {}", self.describe(tok)),
                tok.span,
            )),
            None => Err(CompileError::syntax(
                format!("expected {expected}, found end of file"),
                self.eof_span(),
            )),
        }
    }

    fn expect_ident(&mut self) -> Result<Spanned<String>, CompileError> {
        match self.tokens.get(self.pos) {
            Some(tok) if tok.node == Token::Ident => {
                self.pos += 1;
                Ok(Spanned::new(self.text(tok.span).to_string(), tok.span))
            }
            Some(tok) => Err(CompileError::syntax(
                format!("expected identifier, found {}", self.describe(tok)),
                tok.span,
            )),
            None => Err(CompileError::syntax(
                "expected identifier, found end of file",
                self.eof_span(),
            )),
        }
    }

    /// A statement ends at `;`, at an inserted newline semicolon, or right
    /// before a closing `)` or `}`.
    fn expect_stmt_end(&mut self) -> Result<(), CompileError> {
        match self.peek() {
            None => Ok(()),
            Some(tok) if tok.node == Token::Semi => {
                self.pos += 1;
                Ok(())
            }
            Some(tok) if matches!(tok.node, Token::RParen | Token::RBrace) => Ok(()),
            Some(tok) => Err(CompileError::syntax(
                format!("unexpected {} at end of statement", self.describe(tok)),
                tok.span,
            )),
        }
    }

    fn skip_semis(&mut self) {
        while self.check(Token::Semi) {
            self.pos += 1;
        }
    }

    fn text(&self, span: Span) -> &'a str {
        &self.source[span.start..span.end]
    }

    fn describe(&self, tok: &Spanned<Token>) -> String {
        match tok.node {
            Token::Semi if tok.span.start >= self.source.len() => "end of file".to_string(),
            Token::Semi if self.text(tok.span) != ";" => "newline".to_string(),
            Token::Ident => format!("name {}", self.text(tok.span)),
            Token::Int | Token::Float | Token::Imag | Token::Char | Token::String | Token::RawString => {
                format!("literal {}", self.text(tok.span))
            }
            other => format!("'{other}'"),
        }
    }

    fn eof_span(&self) -> Span {
        Span::new(self.source.len(), self.source.len())
    }

    fn current_span(&self) -> Span {
        self.peek().map(|t| t.span).unwrap_or_else(|| self.eof_span())
    }

    fn prev_end(&self) -> usize {
        if self.pos == 0 {
            0
        } else {
            self.tokens[self.pos - 1].span.end
        }
    }

    fn span_from(&self, start: usize) -> Span {
        Span::new(start, self.prev_end().max(start))
    }

    fn error_here(&self, what: &str) -> CompileError {
        match self.peek() {
            Some(tok) => CompileError::syntax(
                format!("expected {what}, found {}", self.describe(tok)),
                tok.span,
            ),
            None => CompileError::syntax(format!("expected {what}, found end of file"), self.eof_span()),
        }
    }

    /// Run `f` with composite literals allowed again, as inside any bracket pair.
    fn unrestricted<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, CompileError>,
    ) -> Result<T, CompileError> {
        let old = self.restrict_composite;
        self.restrict_composite = false;
        let result = f(self);
        self.restrict_composite = old;
        result
    }

    fn restricted<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, CompileError>,
    ) -> Result<T, CompileError> {
        let old = self.restrict_composite;
        self.restrict_composite = true;
        let result = f(self);
        self.restrict_composite = old;
        result
    }

    /// Run `f` one nesting level deeper, failing past `MAX_NESTING`.
    fn nested<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, CompileError>,
    ) -> Result<T, CompileError> {
        if self.depth >= MAX_NESTING {
            return Err(CompileError::syntax("nested too deeply", self.current_span()));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    // ── File level ──────────────────────────────────────────────────────

    pub fn parse_file(&mut self, comments: Vec<Comment>) -> Result<File, CompileError> {
        self.skip_semis();
        self.expect(Token::Package)?;
        let package = self.expect_ident()?;
        self.expect_stmt_end()?;

        let mut imports = Vec::new();
        self.skip_semis();
        while self.check(Token::Import) {
            imports.push(self.parse_import()?);
            self.skip_semis();
        }

        let mut decls = Vec::new();
        while self.peek().is_some() {
            decls.push(self.parse_top_decl()?);
            self.skip_semis();
        }

        Ok(File { package, imports, decls, comments })
    }

    fn parse_import(&mut self) -> Result<Spanned<ImportDecl>, CompileError> {
        let start = self.expect(Token::Import)?.start;
        let mut specs = Vec::new();
        let grouped = self.eat(Token::LParen);
        if grouped {
            loop {
                self.skip_semis();
                if self.check(Token::RParen) {
                    break;
                }
                specs.push(self.parse_import_spec()?);
                self.expect_stmt_end()?;
            }
            self.expect(Token::RParen)?;
        } else {
            specs.push(self.parse_import_spec()?);
        }
        let span = self.span_from(start);
        self.expect_stmt_end()?;
        Ok(Spanned::new(ImportDecl { specs, grouped }, span))
    }

    fn parse_import_spec(&mut self) -> Result<ImportSpec, CompileError> {
        let alias = match self.peek() {
            Some(tok) if matches!(tok.node, Token::Ident | Token::Dot) => {
                let span = tok.span;
                self.pos += 1;
                Some(Spanned::new(self.text(span).to_string(), span))
            }
            _ => None,
        };
        match self.peek() {
            Some(tok) if matches!(tok.node, Token::String | Token::RawString) => {
                let span = tok.span;
                self.pos += 1;
                Ok(ImportSpec { alias, path: Spanned::new(self.text(span).to_string(), span) })
            }
            _ => Err(self.error_here("import path")),
        }
    }

    fn parse_top_decl(&mut self) -> Result<Spanned<Decl>, CompileError> {
        let start = self.current_span().start;
        let decl = match self.peek_kind() {
            Some(Token::Func) => Decl::Func(self.parse_func_decl()?),
            Some(Token::Type) => {
                self.advance();
                let (specs, grouped) = self.parse_group(Self::parse_type_spec)?;
                Decl::Type { specs, grouped }
            }
            Some(Token::Var) => {
                self.advance();
                let (specs, grouped) = self.parse_group(Self::parse_value_spec)?;
                Decl::Var { specs, grouped }
            }
            Some(Token::Const) => {
                self.advance();
                let (specs, grouped) = self.parse_group(Self::parse_value_spec)?;
                Decl::Const { specs, grouped }
            }
            Some(Token::Import) => {
                return Err(CompileError::syntax(
                    "imports must appear before other declarations",
                    self.current_span(),
                ))
            }
            _ => return Err(self.error_here("declaration")),
        };
        let span = self.span_from(start);
        self.expect_stmt_end()?;
        Ok(Spanned::new(decl, span))
    }

    /// `spec` or `( spec; spec; ... )`, shared by `type`, `var` and `const`.
    fn parse_group<T>(
        &mut self,
        mut spec: impl FnMut(&mut Self) -> Result<T, CompileError>,
    ) -> Result<(Vec<T>, bool), CompileError> {
        if !self.eat(Token::LParen) {
            return Ok((vec![spec(self)?], false));
        }
        let mut specs = Vec::new();
        loop {
            self.skip_semis();
            if self.check(Token::RParen) {
                break;
            }
            specs.push(spec(self)?);
            self.expect_stmt_end()?;
        }
        self.expect(Token::RParen)?;
        Ok((specs, true))
    }

    fn parse_type_spec(&mut self) -> Result<TypeSpec, CompileError> {
        let name = self.expect_ident()?;
        let alias = self.eat(Token::Eq);
        let ty = self.parse_type()?;
        Ok(TypeSpec { name, alias, ty })
    }

    fn parse_value_spec(&mut self) -> Result<ValueSpec, CompileError> {
        let mut names = vec![self.expect_ident()?];
        while self.eat(Token::Comma) {
            names.push(self.expect_ident()?);
        }
        let ty = if !self.check(Token::Eq) && self.can_start_type() {
            Some(self.parse_type()?)
        } else {
            None
        };
        let values = if self.eat(Token::Eq) { self.parse_expr_list()? } else { Vec::new() };
        Ok(ValueSpec { names, ty, values })
    }

    fn parse_func_decl(&mut self) -> Result<FuncDecl, CompileError> {
        self.expect(Token::Func)?;
        let recv = if self.check(Token::LParen) {
            let open = self.current_span();
            let mut params = self.parse_params()?;
            if params.len() != 1 || params[0].names.len() > 1 {
                return Err(CompileError::syntax("method has multiple receivers", open));
            }
            params.pop()
        } else {
            None
        };
        let name = self.expect_ident()?;
        let sig = self.parse_signature()?;
        let body = if self.check(Token::LBrace) { Some(self.parse_block()?) } else { None };
        Ok(FuncDecl { recv, name, sig, body })
    }

    // ── Signatures ──────────────────────────────────────────────────────

    fn parse_signature(&mut self) -> Result<Signature, CompileError> {
        let params = self.parse_params()?;
        let results = if self.check(Token::LParen) {
            self.parse_params()?
        } else if self.can_start_type() {
            vec![Param { names: Vec::new(), ty: self.parse_type()? }]
        } else {
            Vec::new()
        };
        Ok(Signature { params, results })
    }

    /// Parses `( ... )` and resolves Go's grouping rule: either every entry
    /// is named (`a, b int, c string`) or none is (`int, string`).
    fn parse_params(&mut self) -> Result<Vec<Param>, CompileError> {
        let open = self.expect(Token::LParen)?;
        let mut entries = Vec::new();
        while !self.check(Token::RParen) {
            entries.push(self.parse_param_entry()?);
            if !self.eat(Token::Comma) {
                break;
            }
        }
        self.expect(Token::RParen)?;

        let named = entries.iter().any(|e| matches!(e, ParamEntry::Named(..)));
        let mut params = Vec::new();
        if !named {
            for entry in entries {
                let ty = match entry {
                    ParamEntry::Bare(name) => Spanned::new(TypeExpr::Named(name.node), name.span),
                    ParamEntry::Type(ty) | ParamEntry::Named(_, ty) => ty,
                };
                params.push(Param { names: Vec::new(), ty });
            }
            return Ok(params);
        }

        let mut pending = Vec::new();
        for entry in entries {
            match entry {
                ParamEntry::Bare(name) => pending.push(name),
                ParamEntry::Named(name, ty) => {
                    pending.push(name);
                    params.push(Param { names: std::mem::take(&mut pending), ty });
                }
                ParamEntry::Type(ty) => {
                    return Err(CompileError::syntax("mixed named and unnamed parameters", ty.span))
                }
            }
        }
        if let Some(last) = pending.last() {
            return Err(CompileError::syntax("missing parameter type", last.span.to(open)));
        }
        Ok(params)
    }

    fn parse_param_entry(&mut self) -> Result<ParamEntry, CompileError> {
        if self.check(Token::Ident) {
            match self.peek_nth(1) {
                Some(Token::Dot) => {}
                Some(Token::Comma) | Some(Token::RParen) => {
                    return Ok(ParamEntry::Bare(self.expect_ident()?));
                }
                _ => {
                    let name = self.expect_ident()?;
                    let ty = self.parse_param_type()?;
                    return Ok(ParamEntry::Named(name, ty));
                }
            }
        }
        Ok(ParamEntry::Type(self.parse_param_type()?))
    }

    fn parse_param_type(&mut self) -> Result<Spanned<TypeExpr>, CompileError> {
        if self.check(Token::Ellipsis) {
            let start = self.expect(Token::Ellipsis)?.start;
            let elem = self.parse_type()?;
            return Ok(Spanned::new(TypeExpr::Variadic(Box::new(elem)), self.span_from(start)));
        }
        self.parse_type()
    }

    // ── Types ───────────────────────────────────────────────────────────

    fn can_start_type(&self) -> bool {
        matches!(
            self.peek_kind(),
            Some(
                Token::Ident
                    | Token::Star
                    | Token::LBracket
                    | Token::Map
                    | Token::Chan
                    | Token::Arrow
                    | Token::Func
                    | Token::Struct
                    | Token::Interface
                    | Token::LParen
            )
        )
    }

    pub fn parse_type(&mut self) -> Result<Spanned<TypeExpr>, CompileError> {
        self.nested(Self::parse_type_inner)
    }

    fn parse_type_inner(&mut self) -> Result<Spanned<TypeExpr>, CompileError> {
        let start = self.current_span().start;
        let ty = match self.peek_kind() {
            Some(Token::Ident) => {
                let first = self.expect_ident()?;
                if self.check(Token::Dot) && self.peek_nth(1) == Some(Token::Ident) {
                    self.advance();
                    let name = self.expect_ident()?;
                    TypeExpr::Qualified { package: first.node, name: name.node }
                } else {
                    TypeExpr::Named(first.node)
                }
            }
            Some(Token::Star) => {
                self.advance();
                TypeExpr::Pointer(Box::new(self.parse_type()?))
            }
            Some(Token::LBracket) => {
                self.advance();
                if self.eat(Token::RBracket) {
                    TypeExpr::Slice(Box::new(self.parse_type()?))
                } else {
                    let len = if self.eat(Token::Ellipsis) {
                        None
                    } else {
                        Some(Box::new(self.unrestricted(Self::parse_expr)?))
                    };
                    self.expect(Token::RBracket)?;
                    TypeExpr::Array { len, elem: Box::new(self.parse_type()?) }
                }
            }
            Some(Token::Map) => {
                self.advance();
                self.expect(Token::LBracket)?;
                let key = self.parse_type()?;
                self.expect(Token::RBracket)?;
                let value = self.parse_type()?;
                TypeExpr::Map { key: Box::new(key), value: Box::new(value) }
            }
            Some(Token::Chan) => {
                self.advance();
                let dir = if self.eat(Token::Arrow) { ChanDir::Send } else { ChanDir::Both };
                TypeExpr::Chan { dir, elem: Box::new(self.parse_type()?) }
            }
            Some(Token::Arrow) => {
                self.advance();
                self.expect(Token::Chan)?;
                TypeExpr::Chan { dir: ChanDir::Recv, elem: Box::new(self.parse_type()?) }
            }
            Some(Token::Func) => {
                self.advance();
                TypeExpr::Func(Box::new(self.parse_signature()?))
            }
            Some(Token::Struct) => self.parse_struct_type()?,
            Some(Token::Interface) => self.parse_interface_type()?,
            Some(Token::LParen) => {
                self.advance();
                let inner = self.parse_type()?;
                self.expect(Token::RParen)?;
                return Ok(inner);
            }
            _ => return Err(self.error_here("type")),
        };
        Ok(Spanned::new(ty, self.span_from(start)))
    }

    fn parse_struct_type(&mut self) -> Result<TypeExpr, CompileError> {
        self.expect(Token::Struct)?;
        self.expect(Token::LBrace)?;
        let mut fields = Vec::new();
        loop {
            self.skip_semis();
            if self.check(Token::RBrace) {
                break;
            }
            let named = self.check(Token::Ident)
                && !matches!(
                    self.peek_nth(1),
                    Some(Token::Dot | Token::Semi | Token::RBrace | Token::String | Token::RawString)
                );
            let (names, ty) = if named {
                let mut names = vec![self.expect_ident()?];
                while self.eat(Token::Comma) {
                    names.push(self.expect_ident()?);
                }
                (names, self.parse_type()?)
            } else {
                (Vec::new(), self.parse_type()?)
            };
            let tag = match self.peek() {
                Some(tok) if matches!(tok.node, Token::String | Token::RawString) => {
                    let span = tok.span;
                    self.pos += 1;
                    Some(self.text(span).to_string())
                }
                _ => None,
            };
            fields.push(StructField { names, ty, tag });
            self.expect_stmt_end()?;
        }
        self.expect(Token::RBrace)?;
        Ok(TypeExpr::Struct(fields))
    }

    fn parse_interface_type(&mut self) -> Result<TypeExpr, CompileError> {
        self.expect(Token::Interface)?;
        self.expect(Token::LBrace)?;
        let mut elems = Vec::new();
        loop {
            self.skip_semis();
            if self.check(Token::RBrace) {
                break;
            }
            if self.check(Token::Ident) && self.peek_nth(1) == Some(Token::LParen) {
                let name = self.expect_ident()?;
                let sig = self.parse_signature()?;
                elems.push(InterfaceElem::Method { name, sig });
            } else {
                elems.push(InterfaceElem::Embedded(self.parse_type()?));
            }
            self.expect_stmt_end()?;
        }
        self.expect(Token::RBrace)?;
        Ok(TypeExpr::Interface(elems))
    }

    // ── Statements ──────────────────────────────────────────────────────

    fn parse_block(&mut self) -> Result<Spanned<Block>, CompileError> {
        let start = self.expect(Token::LBrace)?.start;
        let stmts = self.nested(|p| p.unrestricted(Self::parse_stmt_list))?;
        self.expect(Token::RBrace)?;
        Ok(Spanned::new(Block { stmts }, self.span_from(start)))
    }

    /// Statements up to the closing `}` of a block or the next `case`/`default`.
    fn parse_stmt_list(&mut self) -> Result<Vec<Spanned<Stmt>>, CompileError> {
        let mut stmts = Vec::new();
        loop {
            self.skip_semis();
            match self.peek_kind() {
                None | Some(Token::RBrace | Token::Case | Token::Default) => break,
                _ => {}
            }
            let stmt = self.parse_stmt()?;
            self.expect_stmt_end()?;
            stmts.push(stmt);
        }
        Ok(stmts)
    }

    fn parse_stmt(&mut self) -> Result<Spanned<Stmt>, CompileError> {
        let start = self.current_span().start;
        let stmt = match self.peek_kind() {
            Some(Token::Var) => {
                self.advance();
                Stmt::Var(self.parse_local_spec("var")?)
            }
            Some(Token::Const) => {
                self.advance();
                Stmt::Const(self.parse_local_spec("const")?)
            }
            Some(Token::Return) => {
                self.advance();
                let values = match self.peek_kind() {
                    None | Some(Token::Semi | Token::RBrace) => Vec::new(),
                    _ => self.parse_expr_list()?,
                };
                Stmt::Return(values)
            }
            Some(Token::If) => return self.parse_if(),
            Some(Token::For) => return self.parse_for(),
            Some(Token::Switch) => return self.parse_switch(),
            Some(Token::LBrace) => Stmt::Block(self.parse_block()?),
            Some(Token::Go) => {
                self.advance();
                Stmt::Go(self.parse_expr()?)
            }
            Some(Token::Defer) => {
                self.advance();
                Stmt::Defer(self.parse_expr()?)
            }
            Some(Token::Break) => {
                self.advance();
                Stmt::Break
            }
            Some(Token::Continue) => {
                self.advance();
                Stmt::Continue
            }
            Some(Token::Fallthrough) => {
                self.advance();
                Stmt::Fallthrough
            }
            Some(tok @ (Token::Goto | Token::Select | Token::Type)) => {
                return Err(CompileError::syntax(
                    format!("'{tok}' statements are not supported"),
                    self.current_span(),
                ))
            }
            _ => return self.parse_simple_stmt(false),
        };
        Ok(Spanned::new(stmt, self.span_from(start)))
    }

    fn parse_local_spec(&mut self, keyword: &str) -> Result<ValueSpec, CompileError> {
        if self.check(Token::LParen) {
            return Err(CompileError::syntax(
                format!("grouped local {keyword} declarations are not supported"),
                self.current_span(),
            ));
        }
        self.parse_value_spec()
    }

    /// Expression statements, assignments, `++`/`--` and sends. With
    /// `allow_range`, `k, v := range x` yields a `Stmt::Range` whose body the
    /// caller fills in.
    fn parse_simple_stmt(&mut self, allow_range: bool) -> Result<Spanned<Stmt>, CompileError> {
        let start = self.current_span().start;
        let lhs = self.parse_expr_list()?;

        let op = match self.peek_kind() {
            Some(Token::ColonEq) => Some(AssignOp::Define),
            Some(Token::Eq) => Some(AssignOp::Assign),
            Some(Token::PlusEq) => Some(AssignOp::Add),
            Some(Token::MinusEq) => Some(AssignOp::Sub),
            Some(Token::StarEq) => Some(AssignOp::Mul),
            Some(Token::SlashEq) => Some(AssignOp::Div),
            Some(Token::PercentEq) => Some(AssignOp::Mod),
            Some(Token::AmpEq) => Some(AssignOp::BitAnd),
            Some(Token::PipeEq) => Some(AssignOp::BitOr),
            Some(Token::CaretEq) => Some(AssignOp::BitXor),
            Some(Token::ShlEq) => Some(AssignOp::Shl),
            Some(Token::ShrEq) => Some(AssignOp::Shr),
            Some(Token::AmpCaretEq) => Some(AssignOp::AndNot),
            _ => None,
        };

        let stmt = if let Some(op) = op {
            self.advance();
            if allow_range
                && matches!(op, AssignOp::Define | AssignOp::Assign)
                && self.eat(Token::Range)
            {
                if lhs.len() > 2 {
                    return Err(CompileError::syntax(
                        "range permits at most two iteration variables",
                        lhs[2].span,
                    ));
                }
                let mut vars = lhs.into_iter();
                let key = vars.next();
                let value = vars.next();
                let iterable = self.parse_expr()?;
                Stmt::Range {
                    key,
                    value,
                    define: op == AssignOp::Define,
                    iterable,
                    body: Spanned::new(Block::default(), Span::dummy()),
                }
            } else {
                let rhs = self.parse_expr_list()?;
                Stmt::Assign { lhs, op, rhs }
            }
        } else {
            let mut lhs = lhs;
            if lhs.len() > 1 {
                return Err(self.error_here(":= or = or comma"));
            }
            let Some(first) = lhs.pop() else {
                return Err(self.error_here("expression"));
            };
            match self.peek_kind() {
                Some(Token::PlusPlus) => {
                    self.advance();
                    Stmt::IncDec { target: first, inc: true }
                }
                Some(Token::MinusMinus) => {
                    self.advance();
                    Stmt::IncDec { target: first, inc: false }
                }
                Some(Token::Arrow) => {
                    self.advance();
                    let value = self.parse_expr()?;
                    Stmt::Send { channel: first, value }
                }
                _ => Stmt::Expr(first),
            }
        };
        Ok(Spanned::new(stmt, self.span_from(start)))
    }

    fn header_condition(&self, stmt: Spanned<Stmt>, keyword: &str) -> Result<Spanned<Expr>, CompileError> {
        match stmt.node {
            Stmt::Expr(expr) => Ok(expr),
            _ => Err(CompileError::syntax(
                format!("cannot use assignment as value in {keyword} header"),
                stmt.span,
            )),
        }
    }

    fn parse_if(&mut self) -> Result<Spanned<Stmt>, CompileError> {
        let start = self.expect(Token::If)?.start;
        let (init, condition) = self.restricted(|p| {
            if p.check(Token::LBrace) {
                return Err(p.error_here("condition"));
            }
            let first = p.parse_simple_stmt(false)?;
            if p.eat(Token::Semi) {
                let condition = p.parse_expr()?;
                Ok((Some(Box::new(first)), condition))
            } else {
                Ok((None, p.header_condition(first, "if")?))
            }
        })?;
        let then_block = self.parse_block()?;
        let else_branch = if self.eat(Token::Else) {
            match self.peek_kind() {
                Some(Token::If) => Some(Box::new(self.parse_if()?)),
                Some(Token::LBrace) => {
                    let block = self.parse_block()?;
                    let span = block.span;
                    Some(Box::new(Spanned::new(Stmt::Block(block), span)))
                }
                _ => return Err(self.error_here("if statement or block after else")),
            }
        } else {
            None
        };
        let stmt = Stmt::If(IfStmt { init, condition, then_block, else_branch });
        Ok(Spanned::new(stmt, self.span_from(start)))
    }

    fn parse_for(&mut self) -> Result<Spanned<Stmt>, CompileError> {
        let start = self.expect(Token::For)?.start;

        if self.check(Token::LBrace) {
            let body = self.parse_block()?;
            let stmt = Stmt::For { init: None, condition: None, post: None, body };
            return Ok(Spanned::new(stmt, self.span_from(start)));
        }

        if self.eat(Token::Range) {
            let iterable = self.restricted(Self::parse_expr)?;
            let body = self.parse_block()?;
            let stmt = Stmt::Range { key: None, value: None, define: false, iterable, body };
            return Ok(Spanned::new(stmt, self.span_from(start)));
        }

        let header = self.restricted(|p| {
            let first = if p.check(Token::Semi) { None } else { Some(p.parse_simple_stmt(true)?) };
            if let Some(Spanned { node: Stmt::Range { key, value, define, iterable, .. }, .. }) = first {
                return Ok(ForHeader::Range { key, value, define, iterable });
            }
            if p.eat(Token::Semi) {
                let condition = if p.check(Token::Semi) { None } else { Some(p.parse_expr()?) };
                p.expect(Token::Semi)?;
                let post = if p.check(Token::LBrace) {
                    None
                } else {
                    Some(Box::new(p.parse_simple_stmt(false)?))
                };
                Ok(ForHeader::Clauses { init: first.map(Box::new), condition, post })
            } else {
                let condition = match first {
                    Some(stmt) => Some(p.header_condition(stmt, "for")?),
                    None => None,
                };
                Ok(ForHeader::Clauses { init: None, condition, post: None })
            }
        })?;

        let body = self.parse_block()?;
        let stmt = match header {
            ForHeader::Range { key, value, define, iterable } => {
                Stmt::Range { key, value, define, iterable, body }
            }
            ForHeader::Clauses { init, condition, post } => Stmt::For { init, condition, post, body },
        };
        Ok(Spanned::new(stmt, self.span_from(start)))
    }

    fn parse_switch(&mut self) -> Result<Spanned<Stmt>, CompileError> {
        let start = self.expect(Token::Switch)?.start;
        let (init, tag) = self.restricted(|p| {
            if p.check(Token::LBrace) {
                return Ok((None, None));
            }
            let first = if p.check(Token::Semi) { None } else { Some(p.parse_simple_stmt(false)?) };
            if p.eat(Token::Semi) {
                let tag = if p.check(Token::LBrace) { None } else { Some(p.parse_expr()?) };
                Ok((first.map(Box::new), tag))
            } else {
                match first {
                    Some(stmt) => Ok((None, Some(p.header_condition(stmt, "switch")?))),
                    None => Ok((None, None)),
                }
            }
        })?;

        self.expect(Token::LBrace)?;
        let mut clauses = Vec::new();
        loop {
            self.skip_semis();
            if self.check(Token::RBrace) {
                break;
            }
            let clause_start = self.current_span().start;
            let (values, is_default) = if self.eat(Token::Case) {
                (self.unrestricted(Self::parse_expr_list)?, false)
            } else if self.eat(Token::Default) {
                (Vec::new(), true)
            } else {
                return Err(self.error_here("case or default"));
            };
            self.expect(Token::Colon)?;
            let body = self.unrestricted(Self::parse_stmt_list)?;
            let clause = CaseClause { values, is_default, body };
            clauses.push(Spanned::new(clause, self.span_from(clause_start)));
        }
        self.expect(Token::RBrace)?;

        Ok(Spanned::new(Stmt::Switch { init, tag, clauses }, self.span_from(start)))
    }

    // ── Expressions ─────────────────────────────────────────────────────

    fn parse_expr_list(&mut self) -> Result<Vec<Spanned<Expr>>, CompileError> {
        let mut exprs = vec![self.parse_expr()?];
        while self.eat(Token::Comma) {
            exprs.push(self.parse_expr()?);
        }
        Ok(exprs)
    }

    pub fn parse_expr(&mut self) -> Result<Spanned<Expr>, CompileError> {
        self.parse_binary(1)
    }

    fn peek_binop(&self) -> Option<BinOp> {
        let op = match self.peek_kind()? {
            Token::PipePipe => BinOp::Or,
            Token::AmpAmp => BinOp::And,
            Token::EqEq => BinOp::Eq,
            Token::BangEq => BinOp::Neq,
            Token::Lt => BinOp::Lt,
            Token::LtEq => BinOp::LtEq,
            Token::Gt => BinOp::Gt,
            Token::GtEq => BinOp::GtEq,
            Token::Plus => BinOp::Add,
            Token::Minus => BinOp::Sub,
            Token::Pipe => BinOp::BitOr,
            Token::Caret => BinOp::BitXor,
            Token::Star => BinOp::Mul,
            Token::Slash => BinOp::Div,
            Token::Percent => BinOp::Mod,
            Token::Shl => BinOp::Shl,
            Token::Shr => BinOp::Shr,
            Token::Amp => BinOp::BitAnd,
            Token::AmpCaret => BinOp::AndNot,
            _ => return None,
        };
        Some(op)
    }

    fn parse_binary(&mut self, min_prec: u8) -> Result<Spanned<Expr>, CompileError> {
        let mut lhs = self.parse_unary()?;
        while let Some(op) = self.peek_binop() {
            let prec = op.precedence();
            if prec < min_prec {
                break;
            }
            self.advance();
            let rhs = self.parse_binary(prec + 1)?;
            let span = lhs.span.to(rhs.span);
            lhs = Spanned::new(Expr::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs) }, span);
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Spanned<Expr>, CompileError> {
        self.nested(Self::parse_unary_op)
    }

    fn parse_unary_op(&mut self) -> Result<Spanned<Expr>, CompileError> {
        let op = match self.peek_kind() {
            Some(Token::Plus) => UnaryOp::Pos,
            Some(Token::Minus) => UnaryOp::Neg,
            Some(Token::Bang) => UnaryOp::Not,
            Some(Token::Caret) => UnaryOp::BitNot,
            Some(Token::Star) => UnaryOp::Deref,
            Some(Token::Amp) => UnaryOp::Addr,
            Some(Token::Arrow) if self.peek_nth(1) != Some(Token::Chan) => UnaryOp::Recv,
            _ => return self.parse_postfix(),
        };
        let start = self.current_span().start;
        self.advance();
        let operand = self.parse_unary()?;
        let span = Span::new(start, operand.span.end);
        Ok(Spanned::new(Expr::Unary { op, operand: Box::new(operand) }, span))
    }

    fn parse_postfix(&mut self) -> Result<Spanned<Expr>, CompileError> {
        let mut expr = self.parse_operand()?;
        let start = expr.span.start;

        loop {
            match self.peek_kind() {
                Some(Token::Dot) => {
                    self.advance();
                    if self.check(Token::Ident) {
                        let field = self.expect_ident()?;
                        expr = Spanned::new(
                            Expr::Selector { object: Box::new(expr), field },
                            self.span_from(start),
                        );
                    } else if self.eat(Token::LParen) {
                        if self.check(Token::Type) {
                            return Err(CompileError::syntax(
                                "type switches are not supported",
                                self.current_span(),
                            ));
                        }
                        let ty = self.unrestricted(Self::parse_type)?;
                        self.expect(Token::RParen)?;
                        expr = Spanned::new(
                            Expr::TypeAssert { object: Box::new(expr), ty: Box::new(ty) },
                            self.span_from(start),
                        );
                    } else {
                        return Err(self.error_here("name or ( after ."));
                    }
                }
                Some(Token::LParen) => {
                    self.advance();
                    let (args, ellipsis) = self.unrestricted(Self::parse_call_args)?;
                    self.expect(Token::RParen)?;
                    expr = Spanned::new(
                        Expr::Call { func: Box::new(expr), args, ellipsis },
                        self.span_from(start),
                    );
                }
                Some(Token::LBracket) => {
                    self.advance();
                    expr = self.unrestricted(|p| p.parse_index_or_slice(expr, start))?;
                }
                Some(Token::LBrace) if self.composite_allowed(&expr) => {
                    let ty = composite_type(&expr);
                    expr = self.parse_composite(ty, start)?;
                }
                Some(Token::Question) => {
                    self.advance();
                    expr = Spanned::new(Expr::Try(Box::new(expr)), self.span_from(start));
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_call_args(&mut self) -> Result<(Vec<Spanned<Expr>>, bool), CompileError> {
        let mut args = Vec::new();
        let mut ellipsis = false;
        while !self.check(Token::RParen) {
            args.push(self.parse_expr_or_type()?);
            if self.eat(Token::Ellipsis) {
                ellipsis = true;
            }
            if !self.eat(Token::Comma) {
                break;
            }
        }
        Ok((args, ellipsis))
    }

    /// Call arguments may be types, as in `make(map[string]int)` or `new(T)`.
    fn parse_expr_or_type(&mut self) -> Result<Spanned<Expr>, CompileError> {
        if self.check(Token::Arrow) && self.peek_nth(1) == Some(Token::Chan) {
            let ty = self.parse_type()?;
            let span = ty.span;
            return Ok(Spanned::new(Expr::Type(ty.node), span));
        }
        self.parse_expr()
    }

    /// Called after `[`: `a[i]`, `a[lo:hi]`, `a[:hi]`, `a[lo:]`.
    fn parse_index_or_slice(
        &mut self,
        object: Spanned<Expr>,
        start: usize,
    ) -> Result<Spanned<Expr>, CompileError> {
        let low = if self.check(Token::Colon) { None } else { Some(Box::new(self.parse_expr()?)) };
        if self.eat(Token::Colon) {
            let high = if self.check(Token::RBracket) { None } else { Some(Box::new(self.parse_expr()?)) };
            self.expect(Token::RBracket)?;
            return Ok(Spanned::new(
                Expr::Slice { object: Box::new(object), low, high },
                self.span_from(start),
            ));
        }
        self.expect(Token::RBracket)?;
        match low {
            Some(index) => Ok(Spanned::new(
                Expr::Index { object: Box::new(object), index },
                self.span_from(start),
            )),
            None => Err(self.error_here("index expression")),
        }
    }

    fn composite_allowed(&self, expr: &Spanned<Expr>) -> bool {
        match &expr.node {
            Expr::Type(_) => true,
            Expr::Ident(_) => !self.restrict_composite,
            Expr::Selector { object, .. } => {
                matches!(object.node, Expr::Ident(_)) && !self.restrict_composite
            }
            _ => false,
        }
    }

    fn parse_composite(
        &mut self,
        ty: Option<Spanned<TypeExpr>>,
        start: usize,
    ) -> Result<Spanned<Expr>, CompileError> {
        self.expect(Token::LBrace)?;
        let elements = self.unrestricted(|p| {
            let mut elements = Vec::new();
            loop {
                p.skip_semis();
                if p.check(Token::RBrace) {
                    break;
                }
                let first = p.parse_element_value()?;
                let element = if p.eat(Token::Colon) {
                    Element { key: Some(first), value: p.parse_element_value()? }
                } else {
                    Element { key: None, value: first }
                };
                elements.push(element);
                if !p.eat(Token::Comma) {
                    p.skip_semis();
                    break;
                }
            }
            Ok(elements)
        })?;
        let close = self.expect(Token::RBrace)?;
        let inner_start = elements.last().map(|e| e.value.span.end).unwrap_or(start);
        let multiline = !elements.is_empty()
            && self.source[inner_start.min(close.start)..close.start].contains('\n');
        let expr = Expr::Composite { ty: ty.map(Box::new), elements, multiline };
        Ok(Spanned::new(expr, self.span_from(start)))
    }

    /// Element values may omit their type: `[]Point{{1, 2}, {3, 4}}`.
    fn parse_element_value(&mut self) -> Result<Spanned<Expr>, CompileError> {
        if self.check(Token::LBrace) {
            let start = self.current_span().start;
            return self.parse_composite(None, start);
        }
        self.parse_expr()
    }

    fn parse_operand(&mut self) -> Result<Spanned<Expr>, CompileError> {
        let Some(tok) = self.peek() else {
            return Err(self.error_here("expression"));
        };
        let span = tok.span;
        let node = tok.node;
        let kind = match node {
            Token::Ident => {
                self.advance();
                return Ok(Spanned::new(Expr::Ident(self.text(span).to_string()), span));
            }
            Token::Int => LitKind::Int,
            Token::Float => LitKind::Float,
            Token::Imag => LitKind::Imag,
            Token::Char => LitKind::Char,
            Token::String | Token::RawString => LitKind::String,
            Token::LParen => {
                self.advance();
                let inner = self.unrestricted(Self::parse_expr_or_type)?;
                self.expect(Token::RParen)?;
                return Ok(Spanned::new(Expr::Paren(Box::new(inner)), self.span_from(span.start)));
            }
            Token::Func => {
                self.advance();
                let sig = self.parse_signature()?;
                if self.check(Token::LBrace) {
                    let body = self.unrestricted(Self::parse_block)?;
                    return Ok(Spanned::new(Expr::FuncLit { sig, body }, self.span_from(span.start)));
                }
                let ty = TypeExpr::Func(Box::new(sig));
                return Ok(Spanned::new(Expr::Type(ty), self.span_from(span.start)));
            }
            Token::LBracket | Token::Map | Token::Chan | Token::Struct | Token::Interface => {
                let ty = self.parse_type()?;
                return Ok(Spanned::new(Expr::Type(ty.node), ty.span));
            }
            _ => return Err(self.error_here("expression")),
        };
        self.advance();
        let value = self.text(span).to_string();
        Ok(Spanned::new(Expr::BasicLit { kind, value }, span))
    }
}

/// The type named by the expression in front of a composite literal's `{`.
fn composite_type(expr: &Spanned<Expr>) -> Option<Spanned<TypeExpr>> {
    let ty = match &expr.node {
        Expr::Type(ty) => ty.clone(),
        Expr::Ident(name) => TypeExpr::Named(name.clone()),
        Expr::Selector { object, field } => match &object.node {
            Expr::Ident(package) => {
                TypeExpr::Qualified { package: package.clone(), name: field.node.clone() }
            }
            _ => return None,
        },
        _ => return None,
    };
    Some(Spanned::new(ty, expr.span))
}
