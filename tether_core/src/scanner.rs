//=============================================
// tether_core/scanner.rs
//=============================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Lazy token source for Tether programs
// Objective: Turn source text into typed lexemes with line numbers and apply
//            the installed token rewrite table
//=============================================

use std::borrow::Cow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Separators.
    Newline,
    Divider,
    // Single-character tokens.
    Minus,
    Plus,
    Slash,
    Star,
    Dot,
    LeftParen,
    RightParen,
    LeftCurly,
    RightCurly,
    Pipe,
    Quote,
    // One, two or three character tokens.
    Bang,
    BangEqual,
    Equal,
    EqualEqual,
    EqualGreater,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
    LessEqualGreater,
    Dots3,
    // Literals.
    Identifier,
    Number,
    Str,
    // Keywords.
    True,
    False,
    Print,
    Pr,
    Error,
    Eof,
}

impl TokenKind {
    /// Tokens that end a statement.
    pub fn is_terminator(self) -> bool {
        matches!(self, TokenKind::Newline | TokenKind::Divider | TokenKind::Eof)
    }
}

/// A lexeme with its kind and line. Error tokens carry the message as lexeme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'src> {
    pub kind: TokenKind,
    pub lexeme: Cow<'src, str>,
    pub line: usize,
}

impl<'src> Token<'src> {
    fn synthetic(kind: TokenKind, lexeme: &'src str, line: usize) -> Self {
        Self {
            kind,
            lexeme: Cow::Borrowed(lexeme),
            line,
        }
    }
}

/// One entry of the rewrite table: tokens equal to `what` are handed to the
/// parser as `with`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewrite {
    what: (TokenKind, String),
    with: (TokenKind, String),
}

impl Rewrite {
    /// Build a rewrite from two snippets of source text; the first token of
    /// each is used. Returns `None` if either snippet holds no valid token.
    pub fn new(what: &str, with: &str) -> Option<Self> {
        Some(Self {
            what: first_token(what)?,
            with: first_token(with)?,
        })
    }

    fn matches(&self, token: &Token<'_>) -> bool {
        self.what.0 == token.kind && self.what.1 == token.lexeme
    }
}

fn first_token(text: &str) -> Option<(TokenKind, String)> {
    let token = Scanner::new(text).scan_raw();
    match token.kind {
        TokenKind::Error | TokenKind::Eof => None,
        kind => Some((kind, token.lexeme.into_owned())),
    }
}

pub struct Scanner<'src> {
    source: &'src str,
    start: usize,
    current: usize,
    line: usize,
    finished: bool,
    rewrites: Vec<Rewrite>,
}

impl<'src> Scanner<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            source,
            start: 0,
            current: 0,
            line: 1,
            finished: false,
            rewrites: Vec::new(),
        }
    }

    /// Install a rewrite table, replacing any previous one.
    pub fn with_rewrites(mut self, rewrites: Vec<Rewrite>) -> Self {
        self.rewrites = rewrites;
        self
    }

    pub fn is_at_end(&self) -> bool {
        self.current >= self.source.len()
    }

    /// Scan the next token and pass it through the rewrite table.
    pub fn next_token(&mut self) -> Token<'src> {
        let token = self.scan_raw();
        match self.rewrites.iter().find(|rewrite| rewrite.matches(&token)) {
            Some(rewrite) => Token {
                kind: rewrite.with.0,
                lexeme: Cow::Owned(rewrite.with.1.clone()),
                line: token.line,
            },
            None => token,
        }
    }

    fn scan_raw(&mut self) -> Token<'src> {
        self.skip_whitespace();
        self.start = self.current;
        let Some(c) = self.advance() else {
            return self.make_token(TokenKind::Eof);
        };

        if c.is_ascii_digit() {
            return self.number();
        }
        if is_alpha(c) {
            return self.identifier();
        }

        match c {
            '\n' => {
                let token = self.make_token(TokenKind::Newline);
                self.line += 1;
                token
            }
            ';' | ',' => self.make_token(TokenKind::Divider),
            '-' => self.make_token(TokenKind::Minus),
            '+' => self.make_token(TokenKind::Plus),
            '*' => self.make_token(TokenKind::Star),
            '/' => self.make_token(TokenKind::Slash),
            '(' => self.make_token(TokenKind::LeftParen),
            ')' => self.make_token(TokenKind::RightParen),
            '{' => self.make_token(TokenKind::LeftCurly),
            '}' => self.make_token(TokenKind::RightCurly),
            '|' => self.make_token(TokenKind::Pipe),
            '\'' => self.make_token(TokenKind::Quote),
            '.' => {
                if self.source[self.current..].starts_with("..") {
                    self.current += 2;
                    self.make_token(TokenKind::Dots3)
                } else {
                    self.make_token(TokenKind::Dot)
                }
            }
            '!' => {
                let kind = if self.matches('=') {
                    TokenKind::BangEqual
                } else {
                    TokenKind::Bang
                };
                self.make_token(kind)
            }
            '=' => {
                let kind = if self.matches('=') {
                    TokenKind::EqualEqual
                } else if self.matches('>') {
                    TokenKind::EqualGreater
                } else {
                    TokenKind::Equal
                };
                self.make_token(kind)
            }
            '<' => {
                let kind = if self.matches('=') {
                    if self.matches('>') {
                        TokenKind::LessEqualGreater
                    } else {
                        TokenKind::LessEqual
                    }
                } else {
                    TokenKind::Less
                };
                self.make_token(kind)
            }
            '>' => {
                let kind = if self.matches('=') {
                    TokenKind::GreaterEqual
                } else {
                    TokenKind::Greater
                };
                self.make_token(kind)
            }
            '"' => self.string(),
            _ => self.error_token("Unexpected character."),
        }
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.source[self.current..].chars().next()?;
        self.current += c.len_utf8();
        Some(c)
    }

    fn peek(&self) -> Option<char> {
        self.source[self.current..].chars().next()
    }

    fn peek_next(&self) -> Option<char> {
        let mut chars = self.source[self.current..].chars();
        chars.next()?;
        chars.next()
    }

    fn matches(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.current += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            match c {
                ' ' | '\t' | '\r' => {
                    self.current += 1;
                }
                '/' if self.peek_next() == Some('/') => {
                    while self.peek().is_some_and(|c| c != '\n') {
                        self.advance();
                    }
                }
                _ => return,
            }
        }
    }

    fn number(&mut self) -> Token<'src> {
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.current += 1;
        }
        if self.peek() == Some('.') && self.peek_next().is_some_and(|c| c.is_ascii_digit()) {
            self.current += 1;
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.current += 1;
            }
        }
        self.make_token(TokenKind::Number)
    }

    fn identifier(&mut self) -> Token<'src> {
        while self.peek().is_some_and(|c| is_alpha(c) || c.is_ascii_digit()) {
            self.current += 1;
        }
        let kind = match &self.source[self.start..self.current] {
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "print" => TokenKind::Print,
            "pr" => TokenKind::Pr,
            _ => TokenKind::Identifier,
        };
        self.make_token(kind)
    }

    fn string(&mut self) -> Token<'src> {
        while let Some(c) = self.peek() {
            if c == '"' {
                self.current += 1;
                return self.make_token(TokenKind::Str);
            }
            if c == '\n' {
                break;
            }
            self.advance();
        }
        self.error_token("Unterminated string.")
    }

    fn make_token(&self, kind: TokenKind) -> Token<'src> {
        Token::synthetic(kind, &self.source[self.start..self.current], self.line)
    }

    fn error_token(&self, message: &'static str) -> Token<'src> {
        Token::synthetic(TokenKind::Error, message, self.line)
    }
}

impl<'src> Iterator for Scanner<'src> {
    type Item = Token<'src>;

    /// Yields every token up to and including `Eof`.
    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let token = self.next_token();
        self.finished = token.kind == TokenKind::Eof;
        Some(token)
    }
}

fn is_alpha(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}
