//=============================================
// tether_core/compiler/mod.rs
//=============================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Single-pass translation of Tether source into a code buffer
// Objective: Drive the parser over statements, backpatch conditionals and
//            hand loops to the loop desugarer
//=============================================

mod loops;
mod parser;
mod rules;

use std::mem;

use tracing::debug;

use crate::error::{ChunkError, CompileError};
use crate::scanner::{Rewrite, Scanner, TokenKind};
use crate::value::Value;
use crate::vm::bytecode::Chunk;
use crate::vm::instruction::Opcode;
use parser::Parser;

/// Reusable compiler. Keeps the token rewrite table and the loop counter, so
/// synthetic loop labels stay unique across every unit it compiles.
#[derive(Debug, Default)]
pub struct Compiler {
    rewrites: Vec<Rewrite>,
    loop_counter: usize,
}

impl Compiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rewrites(rewrites: Vec<Rewrite>) -> Self {
        Self {
            rewrites,
            loop_counter: 0,
        }
    }

    pub fn set_rewrites(&mut self, rewrites: Vec<Rewrite>) {
        self.rewrites = rewrites;
    }

    /// Compile a whole program. On failure every diagnostic gathered in the
    /// pass is returned.
    pub fn compile(&mut self, source: &str) -> Result<Chunk, CompileError> {
        let scanner = Scanner::new(source).with_rewrites(self.rewrites.clone());
        let unit = CompileUnit {
            parser: Parser::new(scanner),
            chunk: Chunk::new(),
            loops: &mut self.loop_counter,
        };
        unit.program()
    }
}

/// State for one compile pass.
pub(crate) struct CompileUnit<'src, 'c> {
    parser: Parser<'src>,
    chunk: Chunk,
    loops: &'c mut usize,
}

impl<'src, 'c> CompileUnit<'src, 'c> {
    fn program(mut self) -> Result<Chunk, CompileError> {
        while !self.parser.matches(TokenKind::Eof) {
            self.declaration();
        }
        self.emit_op(Opcode::Return);
        self.finish()
    }

    fn finish(self) -> Result<Chunk, CompileError> {
        let Self {
            parser, mut chunk, ..
        } = self;
        if parser.had_error() {
            return Err(CompileError {
                diagnostics: parser.into_diagnostics(),
            });
        }
        chunk.finalize();
        debug!(
            bytes = chunk.len(),
            constants = chunk.constants().len(),
            labels = chunk.labels().count(),
            "compiled unit"
        );
        Ok(chunk)
    }

    pub(crate) fn declaration(&mut self) {
        if self.parser.matches(TokenKind::Newline) || self.parser.matches(TokenKind::Divider) {
            return;
        }
        self.statement();
        if self.parser.panic_mode() {
            self.parser.synchronize();
        }
    }

    fn statement(&mut self) {
        if self.parser.check(TokenKind::Identifier) && self.parser.check_next(TokenKind::Dots3) {
            self.label_declaration();
        } else if self.parser.matches(TokenKind::LeftCurly) {
            self.brace_statement();
        } else {
            self.simple_statement();
            self.end_statement();
        }
    }

    /// `name...` binds `name` to the offset of the statement that follows.
    fn label_declaration(&mut self) {
        self.parser.advance();
        let name = self.parser.previous.lexeme.to_string();
        self.parser.advance();
        self.define_label(&name);
        if self.parser.current.kind.is_terminator() {
            self.end_statement();
        } else {
            self.statement();
        }
    }

    /// After `{`: either a loop header or a conditional.
    fn brace_statement(&mut self) {
        let head = self.isolated(Self::expression);
        if self.parser.check(TokenKind::LeftParen) {
            self.loop_statement(head);
            return;
        }
        self.parser
            .consume(TokenKind::RightCurly, "Expected '}' after condition.");
        self.conditional(head);
        self.end_statement();
    }

    /// A statement that may appear as a conditional branch.
    fn simple_statement(&mut self) {
        if self.parser.matches(TokenKind::Print) || self.parser.matches(TokenKind::Pr) {
            self.expression();
            self.emit_op(Opcode::Print);
        } else if self.parser.check(TokenKind::Bang)
            && (self.parser.next.kind.is_terminator() || self.parser.check_next(TokenKind::Pipe))
        {
            self.parser.advance();
            self.emit_op(Opcode::Return);
        } else if self.parser.matches(TokenKind::LeftCurly) {
            let predicate = self.isolated(Self::expression);
            if self.parser.check(TokenKind::LeftParen) {
                self.parser
                    .error_at_current("Loops cannot appear inside a conditional branch.");
                return;
            }
            self.parser
                .consume(TokenKind::RightCurly, "Expected '}' after condition.");
            self.conditional(predicate);
        } else {
            self.expression();
            self.emit_op(Opcode::Pop);
        }
    }

    /// `{ pred } then | else` with the predicate already compiled.
    fn conditional(&mut self, predicate: Chunk) {
        self.splice(&predicate);
        let else_jump = self.emit_jump(Opcode::JumpIfFalse);
        self.simple_statement();
        let end_jump = self.emit_jump(Opcode::Jump);
        self.patch_jump(else_jump);
        if self.parser.matches(TokenKind::Pipe) {
            self.simple_statement();
        }
        self.patch_jump(end_jump);
    }

    fn end_statement(&mut self) {
        if self.parser.check(TokenKind::Eof)
            || self.parser.matches(TokenKind::Newline)
            || self.parser.matches(TokenKind::Divider)
        {
            return;
        }
        self.parser.error_at_current("Expected end of statement.");
    }

    /// Compile into a fresh chunk and hand it back without touching the
    /// current one.
    pub(crate) fn isolated(&mut self, compile: impl FnOnce(&mut Self)) -> Chunk {
        let outer = mem::take(&mut self.chunk);
        compile(self);
        mem::replace(&mut self.chunk, outer)
    }

    fn line(&self) -> usize {
        self.parser.previous.line
    }

    fn chunk_error(&mut self, error: ChunkError) {
        self.parser.error(&error.to_string());
    }

    pub(crate) fn emit_op(&mut self, op: Opcode) {
        let line = self.line();
        self.chunk.emit_op(op, line);
    }

    pub(crate) fn emit_ops(&mut self, first: Opcode, second: Opcode) {
        self.emit_op(first);
        self.emit_op(second);
    }

    pub(crate) fn emit_constant(&mut self, value: Value) {
        let line = self.line();
        match self.chunk.add_constant(value) {
            Ok(index) => {
                self.chunk.emit_pair(Opcode::Constant, index, line);
            }
            Err(error) => self.chunk_error(error),
        }
    }

    /// Unconditional transfer to `label`, resolved when it executes.
    pub(crate) fn emit_goto(&mut self, label: &str) {
        self.emit_constant(Value::string(label));
        self.emit_op(Opcode::Pop);
    }

    fn emit_jump(&mut self, op: Opcode) -> usize {
        let line = self.line();
        self.chunk.emit_jump(op, line)
    }

    fn patch_jump(&mut self, offset: usize) {
        if let Err(error) = self.chunk.patch_jump(offset) {
            self.chunk_error(error);
        }
    }

    pub(crate) fn splice(&mut self, other: &Chunk) {
        if let Err(error) = self.chunk.splice(other) {
            self.chunk_error(error);
        }
    }

    pub(crate) fn define_label(&mut self, name: &str) {
        if let Err(error) = self.chunk.define_label(name) {
            self.chunk_error(error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Location;

    fn ops(chunk: &Chunk) -> Vec<Opcode> {
        let mut out = Vec::new();
        let mut offset = 0;
        while offset < chunk.len() {
            let op = Opcode::try_from(chunk.code()[offset]).expect("valid opcode");
            out.push(op);
            offset += 1 + op.operand_len();
        }
        out
    }

    fn compile(source: &str) -> Chunk {
        Compiler::new().compile(source).expect("compiles")
    }

    fn messages(source: &str) -> Vec<String> {
        Compiler::new()
            .compile(source)
            .expect_err("fails to compile")
            .diagnostics
            .into_iter()
            .map(|diagnostic| diagnostic.message)
            .collect()
    }

    #[test]
    fn expression_statement_pops_and_program_returns() {
        use Opcode::*;
        assert_eq!(
            ops(&compile("1 + 2 * 3")),
            vec![Constant, Constant, Constant, Multiply, Add, Pop, Return]
        );
    }

    #[test]
    fn negated_comparisons_expand() {
        use Opcode::*;
        assert_eq!(ops(&compile("pr 1 != 2")), vec![Constant, Constant, Equal, Not, Print, Return]);
        assert_eq!(ops(&compile("pr 1 >= 2")), vec![Constant, Constant, Less, Not, Print, Return]);
        assert_eq!(ops(&compile("pr 1 <= 2")), vec![Constant, Constant, Greater, Not, Print, Return]);
    }

    #[test]
    fn pointer_forms() {
        use Opcode::*;
        assert_eq!(ops(&compile("'x = 1")), vec![Constant, Constant, SetPointer, Pop, Return]);
        assert_eq!(ops(&compile("print 'x")), vec![Constant, GetPointer, Print, Return]);
        assert_eq!(ops(&compile("a => b")), vec![Constant, Constant, SetPointerInverse, Pop, Return]);
        assert_eq!(ops(&compile("a <=> b")), vec![Constant, Constant, Exchange, Pop, Return]);
        assert_eq!(
            ops(&compile("''p = 3")),
            vec![Constant, GetPointer, Constant, SetPointer, Pop, Return]
        );
    }

    #[test]
    fn conditional_branches_over_both_arms() {
        let chunk = compile("{ 1 } print 42 | print 99");
        let code = chunk.code();
        // pred(2) jif(2) const(2) print(1) jump(2) const(2) print(1) return
        assert_eq!(code[2], Opcode::JumpIfFalse as u8);
        assert_eq!(code[3], 5);
        assert_eq!(code[7], Opcode::Jump as u8);
        assert_eq!(code[8], 3);
        assert_eq!(code[12], Opcode::Return as u8);
    }

    #[test]
    fn bare_bang_returns() {
        use Opcode::*;
        assert_eq!(ops(&compile("!\nprint 1")), vec![Return, Constant, Print, Return]);
        assert_eq!(
            ops(&compile("{ 0 } ! | print 1")),
            vec![Constant, JumpIfFalse, Return, Jump, Constant, Print, Return]
        );
    }

    #[test]
    fn labels_bind_to_the_following_statement() {
        let chunk = compile("print 1\ntop... print 2\nend...");
        assert_eq!(chunk.label("top"), Some(3));
        assert_eq!(chunk.label("end"), Some(6));
    }

    #[test]
    fn duplicate_labels_are_reported() {
        assert_eq!(messages("a...\na..."), vec!["Label 'a' is already defined."]);
    }

    #[test]
    fn reports_independent_errors_in_one_pass() {
        let diagnostics = Compiler::new()
            .compile("print (1 + 2\nprint 3\nprint )\n")
            .expect_err("two syntax errors")
            .diagnostics;
        assert_eq!(diagnostics.len(), 2);
        assert_eq!(diagnostics[0].line, 1);
        assert_eq!(diagnostics[0].message, "Expected ')' after expression.");
        assert_eq!(diagnostics[1].line, 3);
        assert_eq!(diagnostics[1].location, Location::Token(")".into()));
        assert_eq!(diagnostics[1].message, "Expect expression.");
    }

    #[test]
    fn reference_operators_do_not_chain() {
        assert_eq!(messages("a => b => c"), vec!["Reference operators cannot be chained."]);
        assert_eq!(messages("a <=> b => c"), vec!["Reference operators cannot be chained."]);
    }

    #[test]
    fn lexical_errors_become_diagnostics() {
        assert_eq!(messages("print @"), vec!["Unexpected character."]);
    }

    #[test]
    fn rewrites_apply_before_parsing() {
        let rewrite = Rewrite::new("show", "print").expect("valid tokens");
        let chunk = Compiler::with_rewrites(vec![rewrite])
            .compile("show 1")
            .expect("compiles");
        assert_eq!(ops(&chunk), vec![Opcode::Constant, Opcode::Print, Opcode::Return]);
    }
}
