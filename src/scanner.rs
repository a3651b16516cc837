//! Lexer: turns Lox source text into [`Token`]s on demand.
//!
//! [`Scanner`] is a fused iterator of `Result<Token>`.  A lexical error is
//! yielded where it occurs and scanning resumes with the next character, so
//! a single pass reports every bad character and unterminated string.  The
//! last item is always one `EOF` token.  [`scan_tokens`] drains a scanner
//! into a token list and an error list for the later pipeline stages.
//!
//! ```rust
//! use lox_walk::scanner::scan_tokens;
//!
//! let (tokens, errors) = scan_tokens("var answer = 42; // comment");
//! assert!(errors.is_empty());
//! assert_eq!(tokens.len(), 6);
//! ```

use std::iter::FusedIterator;

use log::{debug, info};
use memchr::memchr;
use phf::phf_map;

use crate::error::{LoxError, Result};
use crate::token::{Token, TokenType};

/// Reserved words, looked up by the raw bytes of an identifier.
static RESERVED: phf::Map<&'static [u8], TokenType> = phf_map! {
    b"and" => TokenType::AND,
    b"class" => TokenType::CLASS,
    b"else" => TokenType::ELSE,
    b"false" => TokenType::FALSE,
    b"for" => TokenType::FOR,
    b"fun" => TokenType::FUN,
    b"if" => TokenType::IF,
    b"nil" => TokenType::NIL,
    b"or" => TokenType::OR,
    b"print" => TokenType::PRINT,
    b"return" => TokenType::RETURN,
    b"super" => TokenType::SUPER,
    b"this" => TokenType::THIS,
    b"true" => TokenType::TRUE,
    b"var" => TokenType::VAR,
    b"while" => TokenType::WHILE,
};

pub struct Scanner<'a> {
    source: &'a str,
    bytes: &'a [u8],
    /// First byte of the lexeme being scanned.
    start: usize,
    /// Next byte to read.
    pos: usize,
    line: usize,
    finished: bool,
}

impl<'a> Scanner<'a> {
    pub fn new(source: &'a str) -> Self {
        info!("Scanner created over {} bytes", source.len());

        Self {
            source,
            bytes: source.as_bytes(),
            start: 0,
            pos: 0,
            line: 1,
            finished: false,
        }
    }

    #[inline]
    fn exhausted(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    /// Byte `offset` positions ahead of the cursor, `0` past the end.
    #[inline]
    fn look(&self, offset: usize) -> u8 {
        self.bytes.get(self.pos + offset).copied().unwrap_or(0)
    }

    #[inline]
    fn bump(&mut self) -> u8 {
        let byte = self.bytes[self.pos];
        self.pos += 1;
        byte
    }

    /// `then` if the next byte is `=` (consuming it), otherwise `otherwise`.
    fn with_equals(&mut self, then: TokenType, otherwise: TokenType) -> TokenType {
        if self.look(0) == b'=' {
            self.pos += 1;
            then
        } else {
            otherwise
        }
    }

    fn lexeme(&self) -> &'a str {
        &self.source[self.start..self.pos]
    }

    /// Scan one lexeme starting at `self.start`.  `Ok(None)` means it was
    /// whitespace or a comment.
    fn scan_token(&mut self) -> Result<Option<TokenType>> {
        let kind = match self.bump() {
            b'(' => TokenType::LEFT_PAREN,
            b')' => TokenType::RIGHT_PAREN,
            b'{' => TokenType::LEFT_BRACE,
            b'}' => TokenType::RIGHT_BRACE,
            b',' => TokenType::COMMA,
            b'.' => TokenType::DOT,
            b'-' => TokenType::MINUS,
            b'+' => TokenType::PLUS,
            b';' => TokenType::SEMICOLON,
            b'*' => TokenType::STAR,

            b'!' => self.with_equals(TokenType::BANG_EQUAL, TokenType::BANG),
            b'=' => self.with_equals(TokenType::EQUAL_EQUAL, TokenType::EQUAL),
            b'<' => self.with_equals(TokenType::LESS_EQUAL, TokenType::LESS),
            b'>' => self.with_equals(TokenType::GREATER_EQUAL, TokenType::GREATER),

            b'/' if self.look(0) == b'/' => {
                // Leave the cursor on the newline so it is counted below.
                let rest: &[u8] = &self.bytes[self.pos..];
                self.pos += memchr(b'\n', rest).unwrap_or(rest.len());
                return Ok(None);
            }
            b'/' => TokenType::SLASH,

            b' ' | b'\r' | b'\t' => return Ok(None),
            b'\n' => {
                self.line += 1;
                return Ok(None);
            }

            b'"' => self.string()?,
            b'0'..=b'9' => self.number(),
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => self.identifier(),

            _ => {
                let c: char = self.source[self.start..]
                    .chars()
                    .next()
                    .unwrap_or(char::REPLACEMENT_CHARACTER);
                self.pos = self.start + c.len_utf8();

                return Err(LoxError::lex(
                    self.line,
                    format!("Unexpected character: {}", c),
                ));
            }
        };

        Ok(Some(kind))
    }

    /// Body of a string literal; the opening quote is already consumed.
    /// Newlines inside the literal still advance the line counter.
    fn string(&mut self) -> Result<TokenType> {
        loop {
            if self.exhausted() {
                return Err(LoxError::lex(self.line, "Unterminated string."));
            }

            match self.bump() {
                b'"' => break,
                b'\n' => self.line += 1,
                _ => {}
            }
        }

        let contents: &str = &self.source[self.start + 1..self.pos - 1];
        Ok(TokenType::STRING(contents.to_string()))
    }

    /// Digits with an optional fraction.  A `.` not followed by a digit ends
    /// the number and is scanned as its own token.
    fn number(&mut self) -> TokenType {
        self.skip_digits();

        if self.look(0) == b'.' && self.look(1).is_ascii_digit() {
            self.pos += 1;
            self.skip_digits();
        }

        // The lexeme is digits with at most one interior '.', always valid.
        TokenType::NUMBER(self.lexeme().parse().unwrap_or(0.0))
    }

    fn skip_digits(&mut self) {
        while self.look(0).is_ascii_digit() {
            self.pos += 1;
        }
    }

    fn identifier(&mut self) -> TokenType {
        while matches!(self.look(0), b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'_') {
            self.pos += 1;
        }

        RESERVED
            .get(&self.bytes[self.start..self.pos])
            .cloned()
            .unwrap_or(TokenType::IDENTIFIER)
    }
}

impl<'a> Iterator for Scanner<'a> {
    type Item = Result<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        while !self.exhausted() {
            self.start = self.pos;

            match self.scan_token() {
                Ok(Some(kind)) => {
                    debug!("Scanned {:?} on line {}", kind, self.line);
                    return Some(Ok(Token::new(kind, self.lexeme(), self.line)));
                }
                Ok(None) => {}
                Err(e) => return Some(Err(e)),
            }
        }

        self.finished = true;
        Some(Ok(Token::new(TokenType::EOF, "", self.line)))
    }
}

impl<'a> FusedIterator for Scanner<'a> {}

/// Scan all of `source`, separating tokens from lexical errors.  The token
/// list always ends with `EOF`.
pub fn scan_tokens(source: &str) -> (Vec<Token>, Vec<LoxError>) {
    let mut tokens: Vec<Token> = Vec::new();
    let mut errors: Vec<LoxError> = Vec::new();

    for item in Scanner::new(source) {
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
