//! Recursive-descent, precedence-climbing parser (spec.md §4.2).
//!
//! Three flag bits travel down into expression parsing to resolve the
//! grammar ambiguities HTML literals introduce: `IGNORE_GRT` and
//! `IGNORE_DIV` stop `>` and `/` from being read as operators while closing
//! an HTML tag (`<br/>`, `<a href="x">`), and `IGNORE_LSS` stops `<` from
//! being read as "less than" while parsing an embedded statement's trailing
//! expression, so a following nested element start isn't swallowed as a
//! bogus comparison.

pub mod ast;

use std::collections::VecDeque;

use ast::*;

use crate::error::ParseError;
use crate::lexer::{Lexer, Token};

#[derive(Debug, Clone, Copy, Default)]
pub struct ParseFlags {
    pub ignore_grt: bool,
    pub ignore_lss: bool,
    pub ignore_div: bool,
}

struct BufTok {
    tok: Token,
    line: u32,
    newline_before: bool,
    /// Lexer `(pos, line)` snapshot from just before this token (and any
    /// whitespace preceding it) was lexed — lets [`TokenStream::resync_raw`]
    /// un-read merely-peeked tokens when switching back into raw HTML mode.
    pre_pos: usize,
    pre_line: u32,
}

/// Buffers tokens ahead of the lexer with unlimited lookahead, tracking
/// whether a newline was skipped immediately before each token — the one bit
/// of newline-sensitivity the grammar needs (operator continuation must not
/// cross a line break; spec.md §4.1/§4.2).
struct TokenStream<'s> {
    lexer: Lexer<'s>,
    buf: VecDeque<BufTok>,
}

impl<'s> TokenStream<'s> {
    fn new(src: &'s str) -> Self {
        TokenStream {
            lexer: Lexer::new(src),
            buf: VecDeque::new(),
        }
    }

    fn fill(&mut self, n: usize) -> Result<(), ParseError> {
        while self.buf.len() <= n {
            let pre_pos = self.lexer.pos();
            let pre_line = self.lexer.line();
            let mut newline_before = false;
            loop {
                let (tok, line) = self.lexer.next_token()?;
                if tok == Token::Newline {
                    newline_before = true;
                    continue;
                }
                self.buf.push_back(BufTok {
                    tok,
                    line,
                    newline_before,
                    pre_pos,
                    pre_line,
                });
                break;
            }
        }
        Ok(())
    }

    /// Un-reads any buffered-but-not-yet-consumed (merely peeked) tokens,
    /// rewinding the lexer to just before the first of them. Called before
    /// any raw HTML byte access so speculative lookahead never eats bytes
    /// raw reading still needs to see.
    fn resync_raw(&mut self) {
        if let Some(front) = self.buf.front() {
            self.lexer.seek(front.pre_pos, front.pre_line);
            self.buf.clear();
        }
    }

    fn peek(&mut self) -> Result<&Token, ParseError> {
        self.fill(0)?;
        Ok(&self.buf[0].tok)
    }

    fn line(&mut self) -> Result<u32, ParseError> {
        self.fill(0)?;
        Ok(self.buf[0].line)
    }

    /// True if a newline separates the current position from the *next*
    /// token (i.e. from `peek_n(1)`). Used only in infix-continuation checks.
    fn newline_before_next(&mut self) -> Result<bool, ParseError> {
        self.fill(1)?;
        Ok(self.buf[1].newline_before)
    }

    fn bump(&mut self) -> Result<Token, ParseError> {
        self.fill(0)?;
        Ok(self.buf.pop_front().unwrap().tok)
    }

    /// Consumes the current token if it equals `want`.
    fn eat(&mut self, want: &Token) -> Result<bool, ParseError> {
        if self.peek()? == want {
            self.bump()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn expect(&mut self, want: &Token) -> Result<(), ParseError> {
        if self.eat(want)? {
            Ok(())
        } else {
            let line = self.line()?;
            Err(ParseError::UnexpectedToken {
                line,
                found: self.peek()?.describe(),
                expected: want.describe(),
            })
        }
    }

    // ---- raw HTML text/byte access ---------------------------------
    //
    // Valid only when `buf` is empty, i.e. right after the token stream
    // last yielded whatever raw reading should continue from (the `>`
    // closing an opening tag, or the end of a previous text/embedded run).

    fn peek_raw_byte(&mut self) -> Result<Option<u8>, ParseError> {
        self.resync_raw();
        Ok(self.lexer.peek_raw())
    }

    fn consume_raw_byte(&mut self) {
        self.resync_raw();
        self.lexer.bump_raw();
    }

    fn raw_starts_with(&mut self, s: &str) -> bool {
        self.resync_raw();
        self.lexer.starts_with(s)
    }

    fn consume_raw_bytes(&mut self, n: usize) {
        self.resync_raw();
        self.lexer.consume_raw(n);
    }

    fn skip_raw_ws(&mut self) {
        self.resync_raw();
        self.lexer.skip_ws_no_newline();
    }

    fn eat_raw_byte(&mut self, b: u8) -> bool {
        self.resync_raw();
        self.lexer.eat_raw(b)
    }

    fn read_raw_html_name(&mut self) -> String {
        self.resync_raw();
        self.lexer.read_html_name()
    }

    fn read_raw_html_text(&mut self) -> String {
        self.resync_raw();
        self.lexer.read_html_text()
    }
}

pub struct Parser<'s> {
    ts: TokenStream<'s>,
}

impl<'s> Parser<'s> {
    pub fn new(src: &'s str) -> Self {
        Parser {
            ts: TokenStream::new(src),
        }
    }

    pub fn parse_unit(&mut self) -> Result<Unit, ParseError> {
        let mut body = Vec::new();
        let mut includes = Vec::new();
        while *self.ts.peek()? != Token::Eof {
            let stmt = self.parse_stmt()?;
            if let Stmt::Include(path) = &stmt {
                includes.push(path.clone());
            }
            body.push(stmt);
        }
        Ok(Unit { body, includes })
    }

    // ---- statements --------------------------------------------------

    fn parse_stmt(&mut self) -> Result<Stmt, ParseError> {
        match self.ts.peek()?.clone() {
            Token::Let => self.parse_let_stmt(),
            Token::Print => self.parse_print_stmt(),
            Token::If => self.parse_if_stmt(),
            Token::While => self.parse_while_stmt(),
            Token::For => self.parse_for_stmt(),
            Token::Fun => self.parse_fun_decl(false),
            Token::Procedure => self.parse_fun_decl(true),
            Token::Include => self.parse_include_stmt(),
            Token::LBrace => self.parse_block_stmt(),
            _ => Ok(Stmt::Expr(self.parse_expr(ParseFlags::default())?)),
        }
    }

    fn parse_block_stmt(&mut self) -> Result<Stmt, ParseError> {
        self.ts.expect(&Token::LBrace)?;
        let mut stmts = Vec::new();
        while *self.ts.peek()? != Token::RBrace {
            if *self.ts.peek()? == Token::Eof {
                let line = self.ts.line()?;
                return Err(ParseError::UnexpectedEof {
                    line,
                    expected: "`}`".into(),
                });
            }
            stmts.push(self.parse_stmt()?);
        }
        self.ts.expect(&Token::RBrace)?;
        Ok(Stmt::Block(stmts))
    }

    fn parse_let_stmt(&mut self) -> Result<Stmt, ParseError> {
        self.ts.expect(&Token::Let)?;
        let name = self.parse_ident()?;
        let init = if self.ts.eat(&Token::Eq)? {
            Some(self.parse_expr(ParseFlags::default())?)
        } else {
            None
        };
        Ok(Stmt::Let(name, init))
    }

    fn parse_print_stmt(&mut self) -> Result<Stmt, ParseError> {
        self.ts.expect(&Token::Print)?;
        Ok(Stmt::Print(self.parse_expr(ParseFlags::default())?))
    }

    fn parse_include_stmt(&mut self) -> Result<Stmt, ParseError> {
        self.ts.expect(&Token::Include)?;
        let line = self.ts.line()?;
        let path = match self.ts.bump()? {
            // Include paths are always plain text; a lossy decode is fine
            // since an escape-produced non-UTF-8 byte in a filename has no
            // sensible meaning here anyway.
            Token::Str(s) => String::from_utf8_lossy(&s).into_owned(),
            other => {
                return Err(ParseError::UnexpectedToken {
                    line,
                    found: other.describe(),
                    expected: "string literal".into(),
                })
            }
        };
        Ok(Stmt::Include(path))
    }

    fn parse_if_stmt(&mut self) -> Result<Stmt, ParseError> {
        self.ts.expect(&Token::If)?;
        let cond = self.parse_expr(ParseFlags::default())?;
        self.ts.expect(&Token::Colon)?;
        let then_branch = Box::new(self.parse_stmt()?);
        // An `else` only binds if it appears right after the `then` branch;
        // peeking (never bumping until we're sure) makes this a plain
        // lookahead decision with nothing to roll back.
        if *self.ts.peek()? == Token::Else {
            self.ts.bump()?;
            let else_branch = Box::new(self.parse_stmt()?);
            Ok(Stmt::If(cond, then_branch, Some(else_branch)))
        } else {
            Ok(Stmt::If(cond, then_branch, None))
        }
    }

    fn parse_while_stmt(&mut self) -> Result<Stmt, ParseError> {
        self.ts.expect(&Token::While)?;
        let cond = self.parse_expr(ParseFlags::default())?;
        self.ts.expect(&Token::Colon)?;
        let body = Box::new(self.parse_stmt()?);
        Ok(Stmt::While(cond, body))
    }

    fn parse_for_stmt(&mut self) -> Result<Stmt, ParseError> {
        self.ts.expect(&Token::For)?;
        let var = self.parse_ident()?;
        let idx_var = if self.ts.eat(&Token::Comma)? {
            Some(self.parse_ident()?)
        } else {
            None
        };
        self.ts.expect(&Token::In)?;
        let iter = self.parse_expr(ParseFlags::default())?;
        self.ts.expect(&Token::Colon)?;
        let body = Box::new(self.parse_stmt()?);
        Ok(Stmt::For(var, idx_var, iter, body))
    }

    fn parse_fun_decl(&mut self, is_procedure: bool) -> Result<Stmt, ParseError> {
        self.ts.bump()?; // `fun` or `procedure`
        let name = self.parse_ident()?;
        self.ts.expect(&Token::LParen)?;
        let mut params = Vec::new();
        if *self.ts.peek()? != Token::RParen {
            loop {
                params.push(self.parse_ident()?);
                if !self.ts.eat(&Token::Comma)? {
                    break;
                }
            }
        }
        self.ts.expect(&Token::RParen)?;
        let body = Box::new(self.parse_stmt()?);
        Ok(Stmt::FunDecl(FunDecl {
            name,
            params,
            body,
            is_procedure,
        }))
    }

    fn parse_ident(&mut self) -> Result<String, ParseError> {
        let line = self.ts.line()?;
        match self.ts.bump()? {
            Token::Ident(s) => Ok(s),
            other => Err(ParseError::UnexpectedToken {
                line,
                found: other.describe(),
                expected: "identifier".into(),
            }),
        }
    }

    // ---- expressions ---------------------------------------------------
    //
    // Precedence low to high: assignment, equality/relational, additive,
    // multiplicative, unary, postfix, primary (spec.md §4.2).

    fn parse_expr(&mut self, flags: ParseFlags) -> Result<Expr, ParseError> {
        self.parse_assign(flags)
    }

    fn parse_assign(&mut self, flags: ParseFlags) -> Result<Expr, ParseError> {
        let lhs = self.parse_equality(flags)?;
        if *self.ts.peek()? == Token::Eq {
            self.ts.bump()?;
            if !matches!(lhs, Expr::Var(_) | Expr::Index(_, _) | Expr::Field(_, _)) {
                let line = self.ts.line()?;
                return Err(ParseError::InvalidAssignmentTarget { line });
            }
            let rhs = self.parse_assign(flags)?;
            return Ok(Expr::Assign(Box::new(lhs), Box::new(rhs)));
        }
        Ok(lhs)
    }

    fn parse_equality(&mut self, flags: ParseFlags) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_additive(flags)?;
        loop {
            if self.ts.newline_before_next()? {
                break;
            }
            let op = match self.ts.peek()? {
                Token::EqEq => BinOp::Eq,
                Token::Neq => BinOp::Neq,
                Token::Lt if !flags.ignore_lss => BinOp::Lt,
                Token::Gt if !flags.ignore_grt => BinOp::Gt,
                _ => break,
            };
            self.ts.bump()?;
            let rhs = self.parse_additive(flags)?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_additive(&mut self, flags: ParseFlags) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_mul(flags)?;
        loop {
            if self.ts.newline_before_next()? {
                break;
            }
            let op = match self.ts.peek()? {
                Token::Plus => BinOp::Add,
                Token::Minus => BinOp::Sub,
                _ => break,
            };
            self.ts.bump()?;
            let rhs = self.parse_mul(flags)?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_mul(&mut self, flags: ParseFlags) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_unary(flags)?;
        loop {
            if self.ts.newline_before_next()? {
                break;
            }
            let op = match self.ts.peek()? {
                Token::Star => BinOp::Mul,
                Token::Slash if !flags.ignore_div => BinOp::Div,
                Token::Percent => BinOp::Mod,
                _ => break,
            };
            self.ts.bump()?;
            let rhs = self.parse_unary(flags)?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self, flags: ParseFlags) -> Result<Expr, ParseError> {
        match self.ts.peek()? {
            Token::Plus => {
                self.ts.bump()?;
                Ok(Expr::Unary(UnOp::Plus, Box::new(self.parse_unary(flags)?)))
            }
            Token::Minus => {
                self.ts.bump()?;
                Ok(Expr::Unary(UnOp::Neg, Box::new(self.parse_unary(flags)?)))
            }
            _ => self.parse_postfix(flags),
        }
    }

    fn parse_postfix(&mut self, flags: ParseFlags) -> Result<Expr, ParseError> {
        let mut expr = self.parse_primary(flags)?;
        loop {
            match self.ts.peek()? {
                Token::LBracket => {
                    self.ts.bump()?;
                    let index = self.parse_expr(ParseFlags::default())?;
                    self.ts.expect(&Token::RBracket)?;
                    expr = Expr::Index(Box::new(expr), Box::new(index));
                }
                Token::Dot => {
                    self.ts.bump()?;
                    let name = self.parse_ident()?;
                    expr = Expr::Field(Box::new(expr), name);
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_primary(&mut self, flags: ParseFlags) -> Result<Expr, ParseError> {
        let line = self.ts.line()?;
        match self.ts.peek()?.clone() {
            Token::Int(i) => {
                self.ts.bump()?;
                Ok(Expr::IntLit(i))
            }
            Token::Float(f) => {
                self.ts.bump()?;
                Ok(Expr::FloatLit(f))
            }
            Token::Str(s) => {
                self.ts.bump()?;
                Ok(Expr::StrLit(s))
            }
            Token::None => {
                self.ts.bump()?;
                Ok(Expr::NoneLit)
            }
            Token::True => {
                self.ts.bump()?;
                Ok(Expr::TrueLit)
            }
            Token::False => {
                self.ts.bump()?;
                Ok(Expr::FalseLit)
            }
            Token::Dollar => {
                self.ts.bump()?;
                let name = self.parse_ident()?;
                Ok(Expr::SysVar(name))
            }
            Token::Ident(name) => {
                self.ts.bump()?;
                if *self.ts.peek()? == Token::LParen {
                    self.ts.bump()?;
                    let mut args = Vec::new();
                    if *self.ts.peek()? != Token::RParen {
                        loop {
                            args.push(self.parse_expr(ParseFlags::default())?);
                            if !self.ts.eat(&Token::Comma)? {
                                break;
                            }
                        }
                    }
                    self.ts.expect(&Token::RParen)?;
                    Ok(Expr::Call(name, args))
                } else {
                    Ok(Expr::Var(name))
                }
            }
            Token::LParen => {
                self.ts.bump()?;
                let inner = self.parse_expr(ParseFlags::default())?;
                self.ts.expect(&Token::RParen)?;
                Ok(inner)
            }
            Token::LBracket => self.parse_array_lit(),
            Token::LBrace => self.parse_map_lit(),
            Token::Lt => self.parse_html_element().map(|e| Expr::Html(Box::new(e))),
            other => Err(ParseError::UnexpectedToken {
                line,
                found: other.describe(),
                expected: "expression".into(),
            }),
        }
    }

    fn parse_array_lit(&mut self) -> Result<Expr, ParseError> {
        self.ts.expect(&Token::LBracket)?;
        let mut items = Vec::new();
        if *self.ts.peek()? != Token::RBracket {
            loop {
                items.push(self.parse_expr(ParseFlags::default())?);
                if !self.ts.eat(&Token::Comma)? {
                    break;
                }
            }
        }
        self.ts.expect(&Token::RBracket)?;
        Ok(Expr::Array(items))
    }

    fn parse_map_lit(&mut self) -> Result<Expr, ParseError> {
        self.ts.expect(&Token::LBrace)?;
        let mut pairs = Vec::new();
        if *self.ts.peek()? != Token::RBrace {
            loop {
                let key = self.parse_expr(ParseFlags::default())?;
                self.ts.expect(&Token::Colon)?;
                let val = self.parse_expr(ParseFlags::default())?;
                pairs.push((key, val));
                if !self.ts.eat(&Token::Comma)? {
                    break;
                }
            }
        }
        self.ts.expect(&Token::RBrace)?;
        Ok(Expr::Map(pairs))
    }

    // ---- HTML literals ---------------------------------------------------

    fn parse_html_element(&mut self) -> Result<HtmlElement, ParseError> {
        let open_line = self.ts.line()?;
        self.ts.expect(&Token::Lt)?;
        let tag = self.parse_ident()?;

        let attr_flags = ParseFlags {
            ignore_grt: true,
            ignore_div: true,
            ..Default::default()
        };
        let mut attrs = Vec::new();
        loop {
            match self.ts.peek()? {
                Token::Ident(_) => {
                    let name = self.parse_ident()?;
                    let value = if self.ts.eat(&Token::Eq)? {
                        Some(self.parse_expr(attr_flags)?)
                    } else {
                        None
                    };
                    attrs.push(HtmlAttr { name, value });
                }
                _ => break,
            }
        }

        // Self-closing `<br/>`.
        if *self.ts.peek()? == Token::Slash {
            self.ts.bump()?;
            self.ts.expect(&Token::Gt)?;
            return Ok(HtmlElement {
                tag,
                attrs,
                children: Vec::new(),
                self_closing: true,
            });
        }
        self.ts.expect(&Token::Gt)?;

        let children = self.parse_html_children(&tag, open_line)?;
        Ok(HtmlElement {
            tag,
            attrs,
            children,
            self_closing: false,
        })
    }

    fn parse_html_children(
        &mut self,
        tag: &str,
        open_line: u32,
    ) -> Result<Vec<HtmlChild>, ParseError> {
        let mut children = Vec::new();
        loop {
            match self.ts.peek_raw_byte()? {
                None => {
                    return Err(ParseError::UnclosedHtmlElement {
                        line: open_line,
                        tag: tag.to_owned(),
                    })
                }
                Some(b'\\') => {
                    self.ts.consume_raw_byte();
                    let flags = ParseFlags {
                        ignore_lss: true,
                        ..Default::default()
                    };
                    let stmt = self.parse_embedded_stmt(flags)?;
                    children.push(HtmlChild::Embedded(stmt));
                }
                Some(b'<') => {
                    // Either a closing tag or a nested element.
                    if self.ts.raw_starts_with("</") {
                        self.ts.consume_raw_bytes(2);
                        let close_name = self.ts.read_raw_html_name();
                        self.ts.skip_raw_ws();
                        if !self.ts.eat_raw_byte(b'>') {
                            return Err(ParseError::UnclosedHtmlElement {
                                line: open_line,
                                tag: tag.to_owned(),
                            });
                        }
                        if !close_name.eq_ignore_ascii_case(tag) {
                            return Err(ParseError::MismatchedHtmlTag {
                                line: open_line,
                                expected: tag.to_owned(),
                                found: close_name,
                            });
                        }
                        break;
                    }
                    let nested = self.parse_html_element()?;
                    children.push(HtmlChild::Element(nested));
                }
                Some(_) => {
                    let text = self.ts.read_raw_html_text();
                    if !text.is_empty() {
                        children.push(HtmlChild::Text(text));
                    }
                }
            }
        }
        Ok(children)
    }

    /// An embedded `\<stmt>` value inside HTML text: a single statement
    /// whose trailing expression value is what's spliced in, parsed with
    /// `flags` so a nested element start isn't misread as `<`-comparison.
    fn parse_embedded_stmt(&mut self, flags: ParseFlags) -> Result<Stmt, ParseError> {
        match self.ts.peek()? {
            Token::If | Token::While | Token::For | Token::Let | Token::Print | Token::LBrace => {
                self.parse_stmt()
            }
            _ => Ok(Stmt::Expr(self.parse_expr(flags)?)),
        }
    }
}
