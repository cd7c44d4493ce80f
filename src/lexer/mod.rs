//! Lazy tokenizer over a byte source (spec.md §4.1).
//!
//! The lexer only knows how to produce ordinary tokens and raw HTML text; it
//! has no notion of the parser's `IGNORE_GRT`/`IGNORE_LSS`/`IGNORE_DIV` flags
//! (spec.md §4.2) — those live entirely in the parser, which decides whether
//! a `Lt`/`Gt`/`Slash` token is an operator or HTML structure at a given
//! point. This keeps the lexer context-free and the parser in charge of
//! disambiguation, the same split of responsibilities as a hand-written
//! recursive-descent front end.

pub mod token;

pub use token::Token;

use crate::error::LexError;

pub struct Lexer<'s> {
    src: &'s [u8],
    pos: usize,
    line: u32,
}

impl<'s> Lexer<'s> {
    pub fn new(src: &'s str) -> Self {
        Lexer {
            src: src.as_bytes(),
            pos: 0,
            line: 1,
        }
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    fn peek_byte(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.src.get(self.pos + offset).copied()
    }

    fn bump_byte(&mut self) -> Option<u8> {
        let b = self.peek_byte()?;
        self.pos += 1;
        if b == b'\n' {
            self.line += 1;
        }
        Some(b)
    }

    /// Skips spaces, tabs, carriage returns and `<!-- ... -->` block
    /// comments. Leaves `pos` positioned at the next newline or real token.
    fn skip_inline_whitespace_and_comments(&mut self) -> Result<(), LexError> {
        loop {
            match self.peek_byte() {
                Some(b' ') | Some(b'\t') | Some(b'\r') => {
                    self.bump_byte();
                }
                Some(b'<') if self.src[self.pos..].starts_with(b"<!--") => {
                    let start_line = self.line;
                    self.pos += 4;
                    loop {
                        if self.pos >= self.src.len() {
                            return Err(LexError::UnclosedComment { line: start_line });
                        }
                        if self.src[self.pos..].starts_with(b"-->") {
                            self.pos += 3;
                            break;
                        }
                        self.bump_byte();
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    /// Produces exactly one token, including `Newline` (collapsing runs of
    /// blank lines into a single token) and `Eof`. Callers that want
    /// newlines treated as whitespace filter them out themselves — that is
    /// the "token-or-newline" distinction from spec.md §4.1.
    pub fn next_token(&mut self) -> Result<(Token, u32), LexError> {
        self.skip_inline_whitespace_and_comments()?;
        let line = self.line;
        let Some(b) = self.peek_byte() else {
            return Ok((Token::Eof, line));
        };

        if b == b'\n' {
            while self.peek_byte() == Some(b'\n') {
                self.bump_byte();
                self.skip_inline_whitespace_and_comments()?;
            }
            return Ok((Token::Newline, line));
        }

        if b.is_ascii_digit() || (b == b'.' && self.peek_at(1).is_some_and(|c| c.is_ascii_digit())) {
            return self.lex_number(line);
        }

        if b.is_ascii_alphabetic() || b == b'_' {
            return Ok((self.lex_ident(), line));
        }

        if b == b'\'' || b == b'"' {
            return self.lex_string(b, line);
        }

        self.bump_byte();
        let tok = match b {
            b'=' => {
                if self.peek_byte() == Some(b'=') {
                    self.bump_byte();
                    Token::EqEq
                } else {
                    Token::Eq
                }
            }
            b'!' if self.peek_byte() == Some(b'=') => {
                self.bump_byte();
                Token::Neq
            }
            b'<' => Token::Lt,
            b'>' => Token::Gt,
            b'+' => Token::Plus,
            b'-' => Token::Minus,
            b'*' => Token::Star,
            b'/' => Token::Slash,
            b'%' => Token::Percent,
            b'(' => Token::LParen,
            b')' => Token::RParen,
            b'[' => Token::LBracket,
            b']' => Token::RBracket,
            b'{' => Token::LBrace,
            b'}' => Token::RBrace,
            b'.' => Token::Dot,
            b',' => Token::Comma,
            b':' => Token::Colon,
            b'$' => Token::Dollar,
            other => {
                return Err(LexError::UnexpectedChar {
                    line,
                    ch: other as char,
                })
            }
        };
        Ok((tok, line))
    }

    fn lex_ident(&mut self) -> Token {
        let start = self.pos;
        while let Some(b) = self.peek_byte() {
            if b.is_ascii_alphanumeric() || b == b'_' {
                self.bump_byte();
            } else {
                break;
            }
        }
        let s = std::str::from_utf8(&self.src[start..self.pos]).unwrap();
        token::keyword(s).unwrap_or_else(|| Token::Ident(s.to_owned()))
    }

    fn lex_number(&mut self, line: u32) -> Result<(Token, u32), LexError> {
        let start = self.pos;
        while self.peek_byte().is_some_and(|b| b.is_ascii_digit()) {
            self.bump_byte();
        }
        let mut is_float = false;
        if self.peek_byte() == Some(b'.') && self.peek_at(1).is_some_and(|b| b.is_ascii_digit()) {
            is_float = true;
            self.bump_byte();
            while self.peek_byte().is_some_and(|b| b.is_ascii_digit()) {
                self.bump_byte();
            }
        } else if self.peek_byte() == Some(b'.') {
            // A bare trailing dot with no following digit is not part of the
            // literal (e.g. `1.method()` or `1 . 2` is never valid anyway) —
            // spec.md §4.1 requires at least one digit after the dot.
        }
        let text = std::str::from_utf8(&self.src[start..self.pos]).unwrap();
        if is_float {
            text.parse::<f64>()
                .map(|f| (Token::Float(f), line))
                .map_err(|_| LexError::MalformedFloat { line })
        } else {
            text.parse::<i64>()
                .map(|i| (Token::Int(i), line))
                .map_err(|_| LexError::IntegerOverflow { line })
        }
    }

    /// Produces the literal's raw bytes, not a `String` — a `\xHH` escape
    /// must store exactly the byte `HH`, which `value_to_bytes` later emits
    /// untouched even when it isn't valid UTF-8 on its own (spec.md §8).
    fn lex_string(&mut self, quote: u8, line: u32) -> Result<(Token, u32), LexError> {
        self.bump_byte(); // opening quote
        let mut out = Vec::new();
        loop {
            let Some(b) = self.peek_byte() else {
                return Err(LexError::UnclosedString { line });
            };
            if b == quote {
                self.bump_byte();
                break;
            }
            if b == b'\\' {
                self.bump_byte();
                let Some(esc) = self.peek_byte() else {
                    return Err(LexError::UnclosedString { line });
                };
                match esc {
                    b'n' => {
                        out.push(b'\n');
                        self.bump_byte();
                    }
                    b't' => {
                        out.push(b'\t');
                        self.bump_byte();
                    }
                    b'r' => {
                        out.push(b'\r');
                        self.bump_byte();
                    }
                    b'"' => {
                        out.push(b'"');
                        self.bump_byte();
                    }
                    b'\'' => {
                        out.push(b'\'');
                        self.bump_byte();
                    }
                    b'\\' => {
                        out.push(b'\\');
                        self.bump_byte();
                    }
                    b'x' => {
                        self.bump_byte();
                        let hi = self.peek_byte().ok_or(LexError::UnclosedString { line })?;
                        self.bump_byte();
                        let lo = self.peek_byte().ok_or(LexError::UnclosedString { line })?;
                        self.bump_byte();
                        let hex = [hi, lo];
                        let hex_str = std::str::from_utf8(&hex).map_err(|_| LexError::InvalidEscape {
                            line,
                            ch: 'x',
                        })?;
                        let byte = u8::from_str_radix(hex_str, 16)
                            .map_err(|_| LexError::InvalidEscape { line, ch: 'x' })?;
                        out.push(byte);
                    }
                    other => {
                        return Err(LexError::InvalidEscape {
                            line,
                            ch: other as char,
                        })
                    }
                }
            } else if b < 0x20 {
                return Err(LexError::NonPrintableByte { line, byte: b });
            } else {
                // Copy the byte as-is; a multi-byte UTF-8 sequence's
                // continuation bytes are >= 0x80 so they fall through here
                // too, one byte per loop iteration, with no decoding needed.
                self.bump_byte();
                out.push(b);
            }
        }
        Ok((Token::Str(out), line))
    }

    /// Reads raw HTML body text verbatim, stopping at `\` (embedded
    /// statement marker), `<` (child/closing tag) or end of input. Used only
    /// while the parser is inside an HTML element body (spec.md §4.2).
    pub fn read_html_text(&mut self) -> String {
        let start = self.pos;
        while let Some(b) = self.peek_byte() {
            if b == b'\\' || b == b'<' {
                break;
            }
            self.bump_byte();
        }
        String::from_utf8_lossy(&self.src[start..self.pos]).into_owned()
    }

    /// Reads a bare HTML tag/attribute name: letters, digits, `-`, `_`.
    pub fn read_html_name(&mut self) -> String {
        let start = self.pos;
        while let Some(b) = self.peek_byte() {
            if b.is_ascii_alphanumeric() || b == b'-' || b == b'_' {
                self.bump_byte();
            } else {
                break;
            }
        }
        std::str::from_utf8(&self.src[start..self.pos]).unwrap().to_owned()
    }

    pub fn skip_ws_no_newline(&mut self) {
        while matches!(self.peek_byte(), Some(b' ') | Some(b'\t') | Some(b'\r')) {
            self.bump_byte();
        }
    }

    pub fn peek_raw(&self) -> Option<u8> {
        self.peek_byte()
    }

    /// Consumes and returns the next raw byte, for HTML structural
    /// characters (`\`, `<`, `/`, `>`) the tokenizer never needs to see.
    pub fn bump_raw(&mut self) -> Option<u8> {
        self.bump_byte()
    }

    pub fn starts_with(&self, s: &str) -> bool {
        self.src[self.pos..].starts_with(s.as_bytes())
    }

    /// Consumes `n` raw bytes unconditionally (caller must have checked
    /// they're present, e.g. via [`Self::starts_with`]).
    pub fn consume_raw(&mut self, n: usize) {
        for _ in 0..n {
            self.bump_byte();
        }
    }

    pub fn eat_raw(&mut self, b: u8) -> bool {
        if self.peek_byte() == Some(b) {
            self.bump_byte();
            true
        } else {
            false
        }
    }

    /// Rewinds to a `(pos, line)` snapshot previously read via
    /// [`Self::pos`]/[`Self::line`]. Used by the parser's token-stream to
    /// un-read speculative lookahead before resuming raw HTML reads.
    pub fn seek(&mut self, pos: usize, line: u32) {
        self.pos = pos;
        self.line = line;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(src: &str) -> Vec<Token> {
        let mut lx = Lexer::new(src);
        let mut out = Vec::new();
        loop {
            let (t, _) = lx.next_token().unwrap();
            let done = t == Token::Eof;
            out.push(t);
            if done {
                break;
            }
        }
        out
    }

    #[test]
    fn lexes_arithmetic() {
        let toks = tokens("1+2*3");
        assert_eq!(
            toks,
            vec![
                Token::Int(1),
                Token::Plus,
                Token::Int(2),
                Token::Star,
                Token::Int(3),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn newline_collapses_runs() {
        let toks = tokens("a\n\n\nb");
        assert_eq!(
            toks,
            vec![
                Token::Ident("a".into()),
                Token::Newline,
                Token::Ident("b".into()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn string_escape_hex_byte() {
        let mut lx = Lexer::new("\"\\xFF\"");
        let (tok, _) = lx.next_token().unwrap();
        match tok {
            Token::Str(s) => assert_eq!(s, vec![0xFFu8]),
            other => panic!("expected string, got {other:?}"),
        }
    }

    #[test]
    fn unclosed_string_is_an_error() {
        let mut lx = Lexer::new("\"abc");
        assert!(lx.next_token().is_err());
    }

    #[test]
    fn block_comment_is_whitespace() {
        let toks = tokens("1 <!-- comment --> + 2");
        assert_eq!(toks, vec![Token::Int(1), Token::Plus, Token::Int(2), Token::Eof]);
    }

    #[test]
    fn float_requires_trailing_digit() {
        let toks = tokens("1.add(2)");
        // `1.` is not a float (no digit follows the dot); `.` is its own token.
        assert_eq!(
            toks,
            vec![
                Token::Int(1),
                Token::Dot,
                Token::Ident("add".into()),
                Token::LParen,
                Token::Int(2),
                Token::RParen,
                Token::Eof,
            ]
        );
    }
}
