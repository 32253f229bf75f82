//! Error types shared by the Tether compiler and virtual machine.

use std::fmt;

use thiserror::Error;

use crate::memory::ArenaFull;

/// Failures raised while building a code buffer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChunkError {
    #[error("Too many constants in one chunk.")]
    TooManyConstants,
    #[error("Too much code to jump over ({0} bytes).")]
    JumpTooLarge(usize),
    #[error("Label '{0}' is already defined.")]
    DuplicateLabel(String),
    #[error("Invalid opcode 0x{0:02X}.")]
    InvalidOpcode(u8),
    #[error("Instruction at offset {0} is missing its operand.")]
    TruncatedInstruction(usize),
    #[error("Constant index {0} is outside the pool.")]
    MissingConstant(usize),
}

/// One compile-time diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub line: usize,
    pub location: Location,
    pub message: String,
}

/// Where in the token stream a diagnostic points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    /// At a token, carrying its lexeme.
    Token(String),
    /// At the end of the input.
    End,
    /// Lexical errors carry no lexeme.
    None,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[line {}] Error", self.line)?;
        match &self.location {
            Location::Token(lexeme) => write!(f, " at '{}'", lexeme.escape_debug())?,
            Location::End => f.write_str(" at end")?,
            Location::None => {}
        }
        write!(f, ": {}", self.message)
    }
}

impl std::error::Error for Diagnostic {}

/// Every diagnostic reported by one compile pass.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("compilation failed with {} error(s)", .diagnostics.len())]
pub struct CompileError {
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeErrorKind {
    #[error("Operands must be numbers.")]
    NumberOperands,
    #[error("Operand must be a number.")]
    NumberOperand,
    #[error("Expected pointers only of string or number, found {0}.")]
    InvalidPointer(&'static str),
    #[error("Undefined variable '{0}'.")]
    UndefinedVariable(String),
    #[error("Exchange requires two pointers, found {0} and {1}.")]
    ExchangeOperands(&'static str, &'static str),
    #[error("Undefined label '{0}'.")]
    UndefinedLabel(String),
    #[error("Invalid jump target {0}.")]
    InvalidJumpTarget(String),
    #[error("Binding '{0}' would create an alias cycle.")]
    AliasCycle(String),
    #[error("Dangling pointer to cell {0}.")]
    DanglingPointer(usize),
    #[error("Stack overflow.")]
    StackOverflow,
    #[error("Stack underflow.")]
    StackUnderflow,
    #[error("Arena exhausted ({0} cells).")]
    ArenaExhausted(usize),
    #[error("Invalid opcode 0x{0:02X}.")]
    InvalidOpcode(u8),
    #[error("Invalid constant index {0}.")]
    InvalidConstant(usize),
    #[error("No return statement.")]
    MissingReturn,
    #[error("Failed to write output: {0}")]
    Output(String),
}

impl From<ArenaFull> for RuntimeErrorKind {
    fn from(full: ArenaFull) -> Self {
        RuntimeErrorKind::ArenaExhausted(full.capacity)
    }
}

/// A fatal runtime failure, tagged with the source line of the faulting
/// instruction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}\n[line {line}] in script")]
pub struct RuntimeError {
    pub kind: RuntimeErrorKind,
    pub line: usize,
}

#[derive(Debug, Error)]
pub enum TetherError {
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

pub type TetherResult<T> = Result<T, TetherError>;
