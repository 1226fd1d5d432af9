//! Module `scanner` implements a one‑pass, streaming lexer for the pseudocode
//! language.
//!
//! It transforms a source string into a sequence of [`Token`]s, skipping
//! whitespace and comments, and emitting exactly one `EOF` token at the end.
//! Designed as a `FusedIterator`, it can be chained safely with other
//! iterator adapters.
//!
//! # Public API
//!
//! - `Scanner::new(src: &'a str, path: &str) -> Scanner<'a>`
//!   Create a new lexer over the input buffer; `path` is stamped on every token.
//!
//! - `impl Iterator for Scanner<'a>`
//!   Yields `Result<Token, PseudoError>` on each `.next()`.  An error does not
//!   end the stream: the next call resumes with the following character.
//!
//! - `Scanner::scan_tokens(self) -> (Vec<Token>, Vec<PseudoError>)`
//!   Drain the iterator, separating tokens from accumulated diagnostics.
//!
//! # Token Recognition
//!
//! - Single‑character tokens: `(`, `)`, `[`, `]`, `{`, `}`, `,`, `.`, `-`,
//!   `+`, `*`, `=`.
//! - `<` family: `<-` (assignment), `<=`, `<>` (not equal), `<`.
//! - `>` family: `>=`, `>`.
//! - `//` comments run to end of line (skipped via `memchr`).
//! - `;` is tolerated and discarded.
//! - String literals: `"` … `"`, allowing multi‑line and reporting
//!   unterminated errors.
//! - Numeric literals: integer and optional fractional part, no sign.
//! - Identifiers/keywords: resolved via a perfect‑hash `KEYWORDS` map.
//!
//! # Example
//!
//! ```rust
//! use pseudo::scanner::Scanner;
//!
//! let (tokens, errors) = Scanner::new("OUTPUT 123 // example", "demo.pseudo").scan_tokens();
//! assert!(errors.is_empty());
//! assert_eq!(tokens.len(), 3);
//! ```

use crate::error::{PseudoError, Result};
use crate::token::{Literal, Token, TokenType};
use log::{debug, info};
use memchr::memchr;
use phf::phf_map;
use std::iter::FusedIterator;
use std::rc::Rc;

// ─────────────────────────────────────────────────────────────────────────────
// Static keyword map (compile‑time perfect hash)
// ─────────────────────────────────────────────────────────────────────────────

static KEYWORDS: phf::Map<&'static [u8], TokenType> = phf_map! {
    b"IMPORT"      => TokenType::IMPORT,
    b"AND"         => TokenType::AND,
    b"OR"          => TokenType::OR,
    b"NOT"         => TokenType::NOT,
    b"CLASS"       => TokenType::CLASS,
    b"FUNCTION"    => TokenType::FUNCTION,
    b"SUPER"       => TokenType::SUPER,
    b"THIS"        => TokenType::THIS,
    b"INHERITS"    => TokenType::INHERITS,
    b"OUTPUT"      => TokenType::OUTPUT,
    b"RETURN"      => TokenType::RETURN,
    b"IF"          => TokenType::IF,
    b"THEN"        => TokenType::THEN,
    b"ELSE"        => TokenType::ELSE,
    b"TRUE"        => TokenType::TRUE,
    b"FALSE"       => TokenType::FALSE,
    b"NULL"        => TokenType::NULL,
    b"VAR"         => TokenType::VAR,
    b"FOR"         => TokenType::FOR,
    b"TO"          => TokenType::TO,
    b"WHILE"       => TokenType::WHILE,
    b"DO"          => TokenType::DO,
    b"ENDFUNCTION" => TokenType::ENDFUNCTION,
    b"ENDCLASS"    => TokenType::ENDCLASS,
    b"ENDIF"       => TokenType::ENDIF,
    b"ENDFOR"      => TokenType::ENDFOR,
    b"ENDWHILE"    => TokenType::ENDWHILE,
};

/// A single pass **scanner / lexer** that converts source text into a
/// sequence of [`Token`]s.
pub struct Scanner<'a> {
    src: &'a str,                                 // entire source text
    path: Rc<str>,                                // shared by every emitted token
    start: usize,                                 // index of the *first* byte of the current lexeme
    curr: usize,                                  // index *one past* the last byte examined
    line: usize,                                  // 1‑based line counter (\n increments)
    pending: Option<(TokenType, Option<Literal>)>, // recognised token waiting to be emitted
}

impl<'a> Scanner<'a> {
    /// Create a new lexer over `src`.
    #[inline]
    pub fn new(src: &'a str, path: &str) -> Self {
        info!("Scanner created over {} bytes of {}", src.len(), path);

        Self {
            src,
            path: Rc::from(path),
            start: 0,
            curr: 0,
            line: 1,
            pending: None,
        }
    }

    /// Scan the whole input, keeping every token and every lexical error.
    pub fn scan_tokens(self) -> (Vec<Token>, Vec<PseudoError>) {
        let mut tokens: Vec<Token> = Vec::new();
        let mut errors: Vec<PseudoError> = Vec::new();

        for item in self {
            match item {
                Ok(token) => tokens.push(token),
                Err(e) => errors.push(e),
            }
        }

        info!(
            "Scanned {} token(s) with {} error(s)",
            tokens.len(),
            errors.len()
        );

        (tokens, errors)
    }

    // ───────────────────────────── primitive helpers ────────────────────────

    #[inline(always)]
    fn bytes(&self) -> &'a [u8] {
        self.src.as_bytes()
    }

    /// Are we at (or past) the end of input?
    #[inline(always)]
    fn is_at_end(&self) -> bool {
        self.curr >= self.src.len()
    }

    /// Advance one byte and return it.  Callers guard with [`is_at_end`].
    #[inline(always)]
    fn advance(&mut self) -> u8 {
        let b = self.bytes()[self.curr];
        self.curr += 1;
        b
    }

    /// Peek at the current byte without consuming it.  Returns `0` past EOF.
    #[inline(always)]
    fn peek(&self) -> u8 {
        if self.is_at_end() {
            0
        } else {
            self.bytes()[self.curr]
        }
    }

    /// Peek one byte beyond [`peek`].  Safe at EOF.
    #[inline(always)]
    fn peek_next(&self) -> u8 {
        if self.curr + 1 >= self.src.len() {
            0
        } else {
            self.bytes()[self.curr + 1]
        }
    }

    /// Conditionally consume a byte **iff** it matches `expected`.
    #[inline(always)]
    fn match_byte(&mut self, expected: u8) -> bool {
        if !self.is_at_end() && self.peek() == expected {
            self.advance();
            true
        } else {
            false
        }
    }

    #[inline(always)]
    fn emit(&mut self, token_type: TokenType) {
        self.pending = Some((token_type, None));
    }

    fn error(&self, message: String) -> PseudoError {
        PseudoError::scan(self.path.as_ref(), self.line, message)
    }

    // ───────────────────────────── core lexing ─────────────────────────────

    /// Scan a *single* token starting at `self.curr`.  Whitespace, comments
    /// and semicolons leave `pending` empty.
    fn scan_token(&mut self) -> Result<()> {
        let b = self.advance();

        match b {
            // ── single‑character punctuators ──────────────────────────────
            b'(' => self.emit(TokenType::LEFT_PAREN),
            b')' => self.emit(TokenType::RIGHT_PAREN),
            b'[' => self.emit(TokenType::LEFT_SQUARE),
            b']' => self.emit(TokenType::RIGHT_SQUARE),
            b'{' => self.emit(TokenType::LEFT_BRACE),
            b'}' => self.emit(TokenType::RIGHT_BRACE),
            b',' => self.emit(TokenType::COMMA),
            b'.' => self.emit(TokenType::DOT),
            b'-' => self.emit(TokenType::MINUS),
            b'+' => self.emit(TokenType::PLUS),
            b'*' => self.emit(TokenType::STAR),
            b'=' => self.emit(TokenType::EQUAL),
            b';' => {}

            // ── '<' family (<-, <=, <>, <) ───────────────────────────────
            b'<' => {
                let tt = if self.match_byte(b'-') {
                    TokenType::LEFT_ARROW
                } else if self.match_byte(b'=') {
                    TokenType::LESS_EQUAL
                } else if self.match_byte(b'>') {
                    TokenType::NOT_EQUAL
                } else {
                    TokenType::LESS
                };

                self.emit(tt);
            }

            b'>' => {
                let tt = if self.match_byte(b'=') {
                    TokenType::GREATER_EQUAL
                } else {
                    TokenType::GREATER
                };

                self.emit(tt);
            }

            // ── whitespace / newline ─────────────────────────────────────
            b' ' | b'\r' | b'\t' => {}

            b'\n' => {
                self.line += 1;
            }

            // ── comments (// … until newline) ────────────────────────────
            b'/' => {
                if self.match_byte(b'/') {
                    if let Some(pos) = memchr(b'\n', &self.bytes()[self.curr..]) {
                        self.curr += pos;
                    } else {
                        self.curr = self.src.len();
                    }

                    return Ok(());
                }

                self.emit(TokenType::SLASH);
            }

            b'"' => {
                return self.parse_string();
            }

            b'0'..=b'9' => {
                self.parse_number();
            }

            b'a'..=b'z' | b'A'..=b'Z' | b'_' => {
                self.parse_identifier();
            }

            // ── unexpected character ─────────────────────────────────────
            _ => {
                // Report a multi‑byte character once, then skip its tail.
                let ch: char = self.src[self.start..].chars().next().unwrap_or('\u{FFFD}');
                self.curr = self.start + ch.len_utf8();

                return Err(self.error(format!("Unexpected character '{}'", ch)));
            }
        }

        Ok(())
    }

    /// Parse a double‑quoted string literal.
    ///
    /// * `self.start` still points to the opening `"`.
    /// * When we return, `self.curr` points **past** the closing `"`.
    fn parse_string(&mut self) -> Result<()> {
        while !self.is_at_end() && self.peek() != b'"' {
            if self.advance() == b'\n' {
                self.line += 1;
            }
        }

        if self.is_at_end() {
            return Err(self.error("Unterminated string".to_string()));
        }

        self.advance(); // closing quote

        let s: &str = &self.src[self.start + 1..self.curr - 1];

        self.pending = Some((TokenType::STRING, Some(Literal::Str(s.to_owned()))));

        Ok(())
    }

    /// Parse a numeric literal (`123`, `3.14`).  Fractions are optional.
    fn parse_number(&mut self) {
        while self.peek().is_ascii_digit() {
            self.advance();
        }

        if self.peek() == b'.' && self.peek_next().is_ascii_digit() {
            self.advance(); // "."

            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }

        let s: &str = &self.src[self.start..self.curr];
        let n: f64 = s.parse::<f64>().unwrap_or(0.0); // digits only, cannot fail
        self.pending = Some((TokenType::NUMBER, Some(Literal::Number(n))));
    }

    /// Parse an identifier and decide if it is a **keyword** or a generic
    /// `IDENTIFIER` token.
    fn parse_identifier(&mut self) {
        while {
            let c: u8 = self.peek();
            c.is_ascii_alphanumeric() || c == b'_'
        } {
            self.advance();
        }

        let slice: &[u8] = &self.bytes()[self.start..self.curr];

        let tt: TokenType = KEYWORDS
            .get(slice)
            .copied()
            .unwrap_or(TokenType::IDENTIFIER);

        self.emit(tt);
    }
}

// ───────────────────────── Iterator implementation ─────────────────────────

impl<'a> Iterator for Scanner<'a> {
    type Item = Result<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.curr <= self.src.len() {
            // EOF guard: emit exactly one EOF then terminate.
            if self.curr == self.src.len() {
                self.curr += 1;
                return Some(Ok(Token::new(
                    TokenType::EOF,
                    "",
                    None,
                    self.path.clone(),
                    self.line,
                )));
            }

            self.start = self.curr;
            self.pending = None;

            if let Err(e) = self.scan_token() {
                return Some(Err(e));
            }

            if let Some((tt, literal)) = self.pending.take() {
                let lexeme: &str = &self.src[self.start..self.curr];
                debug!("Scanned token ({:?}) on line {}", tt, self.line);

                return Some(Ok(Token::new(
                    tt,
                    lexeme,
                    literal,
                    self.path.clone(),
                    self.line,
                )));
            }
            // Otherwise it was whitespace / comment → continue loop.
        }

        None // already yielded EOF
    }
}

impl<'a> FusedIterator for Scanner<'a> {}
