//! Token window, diagnostics and panic-mode recovery for the compiler.

use std::borrow::Cow;
use std::mem;

use tracing::debug;

use crate::error::{Diagnostic, Location};
use crate::scanner::{Scanner, Token, TokenKind};

/// Three-token window over the scanner plus error state.
pub(crate) struct Parser<'src> {
    scanner: Scanner<'src>,
    pub previous: Token<'src>,
    pub current: Token<'src>,
    pub next: Token<'src>,
    diagnostics: Vec<Diagnostic>,
    panic_mode: bool,
}

fn placeholder<'src>() -> Token<'src> {
    Token {
        kind: TokenKind::Eof,
        lexeme: Cow::Borrowed(""),
        line: 1,
    }
}

impl<'src> Parser<'src> {
    pub fn new(mut scanner: Scanner<'src>) -> Self {
        let next = scanner.next_token();
        let mut parser = Self {
            scanner,
            previous: placeholder(),
            current: placeholder(),
            next,
            diagnostics: Vec::new(),
            panic_mode: false,
        };
        parser.advance();
        parser
    }

    /// Shift the window by one token, reporting error tokens as they arrive.
    pub fn advance(&mut self) {
        self.previous = mem::replace(&mut self.current, placeholder());
        loop {
            let incoming = self.scanner.next_token();
            self.current = mem::replace(&mut self.next, incoming);
            if self.current.kind != TokenKind::Error {
                break;
            }
            let message = self.current.lexeme.to_string();
            self.error_at_current(&message);
        }
    }

    pub fn check(&self, kind: TokenKind) -> bool {
        self.current.kind == kind
    }

    pub fn check_next(&self, kind: TokenKind) -> bool {
        self.next.kind == kind
    }

    pub fn matches(&mut self, kind: TokenKind) -> bool {
        if !self.check(kind) {
            return false;
        }
        self.advance();
        true
    }

    pub fn consume(&mut self, kind: TokenKind, message: &str) {
        if self.check(kind) {
            self.advance();
        } else {
            self.error_at_current(message);
        }
    }

    pub fn error_at_current(&mut self, message: &str) {
        let token = self.current.clone();
        self.error_at(&token, message);
    }

    pub fn error(&mut self, message: &str) {
        let token = self.previous.clone();
        self.error_at(&token, message);
    }

    fn error_at(&mut self, token: &Token<'_>, message: &str) {
        if self.panic_mode {
            return;
        }
        self.panic_mode = true;
        let location = match token.kind {
            TokenKind::Eof => Location::End,
            TokenKind::Error => Location::None,
            _ => Location::Token(token.lexeme.to_string()),
        };
        self.report(token.line, location, message);
    }

    /// Record a diagnostic that is not tied to panic mode.
    pub fn report(&mut self, line: usize, location: Location, message: &str) {
        let diagnostic = Diagnostic {
            line,
            location,
            message: message.to_string(),
        };
        debug!(%diagnostic, "compile error");
        self.diagnostics.push(diagnostic);
    }

    pub fn panic_mode(&self) -> bool {
        self.panic_mode
    }

    pub fn had_error(&self) -> bool {
        !self.diagnostics.is_empty()
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    /// Leave panic mode and skip ahead to the next statement boundary.
    pub fn synchronize(&mut self) {
        self.panic_mode = false;
        while self.current.kind != TokenKind::Eof {
            if matches!(self.previous.kind, TokenKind::Newline | TokenKind::Divider) {
                return;
            }
            if matches!(
                self.current.kind,
                TokenKind::Print | TokenKind::Pr | TokenKind::LeftCurly
            ) {
                return;
            }
            self.advance();
        }
    }
}
