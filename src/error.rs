//! Error taxonomy for the WL pipeline: lex -> parse -> assemble -> link -> run.
//!
//! Mirrors the flat `enum ...Error` + `Display` shape `datex-core` uses in
//! `compiler/error.rs`, but derives `Display` via `thiserror` instead of
//! hand-writing the match.

use thiserror::Error;

/// Syntax errors raised while tokenizing source text.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum LexError {
    #[error("line {line}: unexpected character {ch:?}")]
    UnexpectedChar { line: u32, ch: char },
    #[error("line {line}: unclosed string literal")]
    UnclosedString { line: u32 },
    #[error("line {line}: non-printable byte 0x{byte:02x} in string literal")]
    NonPrintableByte { line: u32, byte: u8 },
    #[error("line {line}: invalid escape sequence \\{ch}")]
    InvalidEscape { line: u32, ch: char },
    #[error("line {line}: integer literal out of range")]
    IntegerOverflow { line: u32 },
    #[error("line {line}: malformed float literal")]
    MalformedFloat { line: u32 },
    #[error("line {line}: unterminated block comment")]
    UnclosedComment { line: u32 },
}

impl LexError {
    pub fn line(&self) -> u32 {
        match self {
            LexError::UnexpectedChar { line, .. }
            | LexError::UnclosedString { line }
            | LexError::NonPrintableByte { line, .. }
            | LexError::InvalidEscape { line, .. }
            | LexError::IntegerOverflow { line }
            | LexError::MalformedFloat { line }
            | LexError::UnclosedComment { line } => *line,
        }
    }
}

/// Parser-level syntax errors, including the lexer errors it propagates.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ParseError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error("line {line}: unexpected token {found}, expected {expected}")]
    UnexpectedToken {
        line: u32,
        found: String,
        expected: String,
    },
    #[error("line {line}: unexpected end of input, expected {expected}")]
    UnexpectedEof { line: u32, expected: String },
    #[error("line {line}: unclosed HTML element <{tag}>")]
    UnclosedHtmlElement { line: u32, tag: String },
    #[error("line {line}: closing tag </{found}> does not match opening tag <{expected}>")]
    MismatchedHtmlTag {
        line: u32,
        expected: String,
        found: String,
    },
    #[error("line {line}: invalid assignment target")]
    InvalidAssignmentTarget { line: u32 },
}

/// Errors raised by the assembler while lowering an AST to bytecode.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum AssembleError {
    #[error("undeclared variable: {0}")]
    UndeclaredVariable(String),
    #[error("undefined function: {0}")]
    UndefinedFunction(String),
    #[error("symbol table exhausted")]
    SymbolTableExhausted,
    #[error("scope stack exhausted")]
    ScopeStackExhausted,
    #[error("arena out of memory")]
    OutOfMemory,
    #[error("duplicate declaration: {0}")]
    DuplicateDeclaration(String),
    #[error("'{0}' cannot be used outside of a loop")]
    NotInLoop(String),
}

/// Driver-level error, covering every phase of `Compiler::add`/`Compiler::link`.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CompileError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Assemble(#[from] AssembleError),
    #[error("missing include file: {0}")]
    MissingInclude(String),
    #[error("too many files included (cap reached)")]
    TooManyFiles,
    #[error("program header or bytecode is malformed: {0}")]
    MalformedProgram(String),
}

/// Runtime (VM) errors. Once raised, a `Runtime` latches into this error for
/// every subsequent `eval()` call (see spec.md §4.6/§7: first cause wins).
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RuntimeError {
    #[error("type mismatch in {op}")]
    TypeMismatch { op: &'static str },
    #[error("division by zero")]
    DivideByZero,
    #[error("index {index} out of range (length {length})")]
    IndexOutOfRange { index: i64, length: usize },
    #[error("key not found in map")]
    KeyNotFound,
    #[error("invalid boolean condition")]
    InvalidCondition,
    #[error("frame stack overflow")]
    FrameStackOverflow,
    #[error("evaluation stack overflow")]
    EvalStackOverflow,
    #[error("group stack overflow")]
    GroupStackOverflow,
    #[error("arena allocation failed")]
    AllocationFailure,
    #[error("malformed program header: {0}")]
    MalformedProgram(String),
    #[error("invalid opcode 0x{0:02x}")]
    InvalidOpcode(u8),
    #[error("code offset {0} out of bounds")]
    InvalidCodeOffset(u32),
    #[error("host API misuse: {0}")]
    HostProtocol(String),
    #[error("{0}")]
    Other(String),
}

impl From<crate::arena::ArenaError> for RuntimeError {
    fn from(_: crate::arena::ArenaError) -> Self {
        RuntimeError::AllocationFailure
    }
}

impl From<crate::arena::ArenaError> for AssembleError {
    fn from(_: crate::arena::ArenaError) -> Self {
        AssembleError::OutOfMemory
    }
}
