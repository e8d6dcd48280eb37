use crate::lexer::Comment;
use crate::span::Spanned;

#[derive(Debug, Clone)]
pub struct File {
    pub package: Spanned<String>,
    pub imports: Vec<Spanned<ImportDecl>>,
    pub decls: Vec<Spanned<Decl>>,
    pub comments: Vec<Comment>,
}

#[derive(Debug, Clone)]
pub struct ImportDecl {
    pub specs: Vec<ImportSpec>,
    pub grouped: bool,
}

#[derive(Debug, Clone)]
pub struct ImportSpec {
    pub alias: Option<Spanned<String>>,
    /// Quoted path exactly as written.
    pub path: Spanned<String>,
}

#[derive(Debug, Clone)]
pub enum Decl {
    Func(FuncDecl),
    Type { specs: Vec<TypeSpec>, grouped: bool },
    Var { specs: Vec<ValueSpec>, grouped: bool },
    Const { specs: Vec<ValueSpec>, grouped: bool },
}

#[derive(Debug, Clone)]
pub struct FuncDecl {
    pub recv: Option<Param>,
    pub name: Spanned<String>,
    pub sig: Signature,
    pub body: Option<Spanned<Block>>,
}

/// Parameter and result lists of a function, method, closure or func type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Signature {
    pub params: Vec<Param>,
    pub results: Vec<Param>,
}

impl Signature {
    /// One entry per declared result. `(a, b int, err error)` yields three
    /// types even though it is written as two groups.
    pub fn result_fields(&self) -> Vec<&Spanned<TypeExpr>> {
        self.results
            .iter()
            .flat_map(|r| std::iter::repeat(&r.ty).take(r.names.len().max(1)))
            .collect()
    }
}

/// A parameter group: `a, b int`, a bare type `int`, or a variadic `xs ...T`.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub names: Vec<Spanned<String>>,
    pub ty: Spanned<TypeExpr>,
}

#[derive(Debug, Clone)]
pub struct TypeSpec {
    pub name: Spanned<String>,
    /// `type A = B`
    pub alias: bool,
    pub ty: Spanned<TypeExpr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValueSpec {
    pub names: Vec<Spanned<String>>,
    pub ty: Option<Spanned<TypeExpr>>,
    pub values: Vec<Spanned<Expr>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeExpr {
    Named(String),
    Qualified { package: String, name: String },
    Pointer(Box<Spanned<TypeExpr>>),
    Slice(Box<Spanned<TypeExpr>>),
    /// `len` is `None` for `[...]T`.
    Array {
        len: Option<Box<Spanned<Expr>>>,
        elem: Box<Spanned<TypeExpr>>,
    },
    Map {
        key: Box<Spanned<TypeExpr>>,
        value: Box<Spanned<TypeExpr>>,
    },
    Chan {
        dir: ChanDir,
        elem: Box<Spanned<TypeExpr>>,
    },
    Func(Box<Signature>),
    Struct(Vec<StructField>),
    Interface(Vec<InterfaceElem>),
    Variadic(Box<Spanned<TypeExpr>>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChanDir {
    Both,
    Send,
    Recv,
}

/// Struct field group. Embedded fields have no names.
#[derive(Debug, Clone, PartialEq)]
pub struct StructField {
    pub names: Vec<Spanned<String>>,
    pub ty: Spanned<TypeExpr>,
    pub tag: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InterfaceElem {
    Method { name: Spanned<String>, sig: Signature },
    Embedded(Spanned<TypeExpr>),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Block {
    pub stmts: Vec<Spanned<Stmt>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Expr(Spanned<Expr>),
    Assign {
        lhs: Vec<Spanned<Expr>>,
        op: AssignOp,
        rhs: Vec<Spanned<Expr>>,
    },
    IncDec {
        target: Spanned<Expr>,
        inc: bool,
    },
    Send {
        channel: Spanned<Expr>,
        value: Spanned<Expr>,
    },
    Var(ValueSpec),
    Const(ValueSpec),
    Return(Vec<Spanned<Expr>>),
    If(IfStmt),
    For {
        init: Option<Box<Spanned<Stmt>>>,
        condition: Option<Spanned<Expr>>,
        post: Option<Box<Spanned<Stmt>>>,
        body: Spanned<Block>,
    },
    Range {
        key: Option<Spanned<Expr>>,
        value: Option<Spanned<Expr>>,
        define: bool,
        iterable: Spanned<Expr>,
        body: Spanned<Block>,
    },
    Switch {
        init: Option<Box<Spanned<Stmt>>>,
        tag: Option<Spanned<Expr>>,
        clauses: Vec<Spanned<CaseClause>>,
    },
    Block(Spanned<Block>),
    Go(Spanned<Expr>),
    Defer(Spanned<Expr>),
    Break,
    Continue,
    Fallthrough,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfStmt {
    pub init: Option<Box<Spanned<Stmt>>>,
    pub condition: Spanned<Expr>,
    pub then_block: Spanned<Block>,
    /// Either another `Stmt::If` (else-if) or a `Stmt::Block`.
    pub else_branch: Option<Box<Spanned<Stmt>>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaseClause {
    /// Empty for `default`.
    pub values: Vec<Spanned<Expr>>,
    pub is_default: bool,
    pub body: Vec<Spanned<Stmt>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Define,
    Assign,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    AndNot,
}

impl AssignOp {
    pub fn as_str(self) -> &'static str {
        match self {
            AssignOp::Define => ":=",
            AssignOp::Assign => "=",
            AssignOp::Add => "+=",
            AssignOp::Sub => "-=",
            AssignOp::Mul => "*=",
            AssignOp::Div => "/=",
            AssignOp::Mod => "%=",
            AssignOp::BitAnd => "&=",
            AssignOp::BitOr => "|=",
            AssignOp::BitXor => "^=",
            AssignOp::Shl => "<<=",
            AssignOp::Shr => ">>=",
            AssignOp::AndNot => "&^=",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Ident(String),
    BasicLit {
        kind: LitKind,
        /// Literal text exactly as written (quotes included for strings).
        value: String,
    },
    Composite {
        ty: Option<Box<Spanned<TypeExpr>>>,
        elements: Vec<Element>,
        /// The closing brace sat on its own line in the source.
        multiline: bool,
    },
    FuncLit {
        sig: Signature,
        body: Spanned<Block>,
    },
    Paren(Box<Spanned<Expr>>),
    Selector {
        object: Box<Spanned<Expr>>,
        field: Spanned<String>,
    },
    Index {
        object: Box<Spanned<Expr>>,
        index: Box<Spanned<Expr>>,
    },
    Slice {
        object: Box<Spanned<Expr>>,
        low: Option<Box<Spanned<Expr>>>,
        high: Option<Box<Spanned<Expr>>>,
    },
    TypeAssert {
        object: Box<Spanned<Expr>>,
        ty: Box<Spanned<TypeExpr>>,
    },
    Call {
        func: Box<Spanned<Expr>>,
        args: Vec<Spanned<Expr>>,
        ellipsis: bool,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Spanned<Expr>>,
    },
    Binary {
        op: BinOp,
        lhs: Box<Spanned<Expr>>,
        rhs: Box<Spanned<Expr>>,
    },
    /// A type in expression position, e.g. the first argument of `make`.
    Type(TypeExpr),
    /// Postfix `expr?`.
    Try(Box<Spanned<Expr>>),
}

impl Expr {
    pub fn ident(name: impl Into<String>) -> Self {
        Expr::Ident(name.into())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub key: Option<Spanned<Expr>>,
    pub value: Spanned<Expr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LitKind {
    Int,
    Float,
    Imag,
    Char,
    String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Pos,
    Neg,
    Not,
    BitNot,
    Deref,
    Addr,
    Recv,
}

impl UnaryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            UnaryOp::Pos => "+",
            UnaryOp::Neg => "-",
            UnaryOp::Not => "!",
            UnaryOp::BitNot => "^",
            UnaryOp::Deref => "*",
            UnaryOp::Addr => "&",
            UnaryOp::Recv => "<-",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Or,
    And,
    Eq,
    Neq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Add,
    Sub,
    BitOr,
    BitXor,
    Mul,
    Div,
    Mod,
    Shl,
    Shr,
    BitAnd,
    AndNot,
}

impl BinOp {
    /// Go operator precedence, 1 (`||`) through 5 (multiplicative).
    pub fn precedence(self) -> u8 {
        match self {
            BinOp::Or => 1,
            BinOp::And => 2,
            BinOp::Eq | BinOp::Neq | BinOp::Lt | BinOp::LtEq | BinOp::Gt | BinOp::GtEq => 3,
            BinOp::Add | BinOp::Sub | BinOp::BitOr | BinOp::BitXor => 4,
            BinOp::Mul
            | BinOp::Div
            | BinOp::Mod
            | BinOp::Shl
            | BinOp::Shr
            | BinOp::BitAnd
            | BinOp::AndNot => 5,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BinOp::Or => "||",
            BinOp::And => "&&",
            BinOp::Eq => "==",
            BinOp::Neq => "!=",
            BinOp::Lt => "<",
            BinOp::LtEq => "<=",
            BinOp::Gt => ">",
            BinOp::GtEq => ">=",
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::BitOr => "|",
            BinOp::BitXor => "^",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
            BinOp::Shl => "<<",
            BinOp::Shr => ">>",
            BinOp::BitAnd => "&",
            BinOp::AndNot => "&^",
        }
    }
}
