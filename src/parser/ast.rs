//! AST node types (spec.md §3 "AST Node").
//!
//! The spec's C ancestor represents every node as one sum-type record with a
//! `next` sibling link so a single allocator type serves the whole tree.
//! Design notes (spec.md §9) explicitly permit owned `Vec`s of children in a
//! language that has them, since there is no semantic requirement for
//! singly-linked layout — only the arena/bump-allocation story matters. This
//! implementation uses a conventional Rust enum tree instead.

#[derive(Debug, Clone, PartialEq)]
pub enum UnOp {
    Plus,
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Neq,
    Lt,
    Gt,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    IntLit(i64),
    FloatLit(f64),
    /// Raw bytes, not necessarily valid UTF-8 (a `\xHH` escape can produce a
    /// lone non-UTF-8 byte; spec.md §8).
    StrLit(Vec<u8>),
    NoneLit,
    TrueLit,
    FalseLit,
    Var(String),
    /// `$name` — a host-supplied system variable (spec.md: `SYSVAR`).
    SysVar(String),
    Unary(UnOp, Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    Assign(Box<Expr>, Box<Expr>),
    /// `name(args...)` — calls a declared function. Still unresolved when
    /// the global scope pops is an `UndefinedFunction` error (spec.md §4.4);
    /// there is no source syntax that reaches `SYSCALL` (see DESIGN.md).
    Call(String, Vec<Expr>),
    /// `target[index]` — the `SELECT` opcode's array/map indexing form.
    Index(Box<Expr>, Box<Expr>),
    /// `target.name` — sugar for `target["name"]`.
    Field(Box<Expr>, String),
    Array(Vec<Expr>),
    Map(Vec<(Expr, Expr)>),
    Html(Box<HtmlElement>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct HtmlAttr {
    pub name: String,
    pub value: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum HtmlChild {
    Text(String),
    /// `\<stmt>` — an embedded statement parsed with `IGNORE_LSS` so nested
    /// HTML can appear as a value (spec.md §4.2).
    Embedded(Stmt),
    Element(HtmlElement),
}

#[derive(Debug, Clone, PartialEq)]
pub struct HtmlElement {
    pub tag: String,
    pub attrs: Vec<HtmlAttr>,
    pub children: Vec<HtmlChild>,
    pub self_closing: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunDecl {
    pub name: String,
    pub params: Vec<String>,
    pub body: Box<Stmt>,
    /// `procedure` bodies discard their implicit expression-statement value;
    /// `fun` bodies return it. Both compile the same way once lowered.
    pub is_procedure: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Expr(Expr),
    Print(Expr),
    Let(String, Option<Expr>),
    If(Expr, Box<Stmt>, Option<Box<Stmt>>),
    While(Expr, Box<Stmt>),
    For(String, Option<String>, Expr, Box<Stmt>),
    FunDecl(FunDecl),
    Include(String),
    Block(Vec<Stmt>),
}

/// A parsed compilation unit: its statement list plus every `include` path
/// it references, in source order (spec.md §4.3).
#[derive(Debug, Clone, PartialEq)]
pub struct Unit {
    pub body: Vec<Stmt>,
    pub includes: Vec<String>,
}
