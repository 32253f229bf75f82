//! Multi-part loop desugaring.
//!
//! A loop header `{ part (, part)* } l1, l2` never becomes a native loop. Each
//! part's init, step and end condition is compiled into its own chunk and then
//! laid out as labelled blocks threaded together by run-time gotos:
//!
//! ```text
//! _init_n_i_j ...      every part and link, in order
//! goto l1
//! _incr_n_i_j ...      every part and link, in order
//! _cond_n_i_j ...      each exits to l2 when its condition fails
//! goto l1
//! l1: body
//!     goto _incr_n_0_0
//! l2:
//! ```

use super::CompileUnit;
use crate::scanner::TokenKind;
use crate::value::Value;
use crate::vm::bytecode::Chunk;
use crate::vm::instruction::Opcode;

/// How a loop part decides whether to run again.
pub(crate) enum EndCondition {
    /// Continue while the parameter differs from this value.
    Target(Chunk),
    /// Continue while this predicate is truthy.
    Predicate(Chunk),
}

/// One coupled counter: `init (step) end . => 'p (=> 'q)*`.
pub(crate) struct LoopPart {
    init: Chunk,
    step: Chunk,
    end: EndCondition,
    /// Address expressions of the chained parameters, at least one.
    params: Vec<Chunk>,
}

#[derive(Clone, Copy)]
enum Block {
    Init,
    Incr,
    Cond,
}

fn block_label(block: Block, number: usize, part: usize, link: usize) -> String {
    let kind = match block {
        Block::Init => "init",
        Block::Incr => "incr",
        Block::Cond => "cond",
    };
    format!("_{kind}_{number}_{part}_{link}")
}

impl<'src, 'c> CompileUnit<'src, 'c> {
    /// Called with the first part's init already compiled and `(` current.
    pub(crate) fn loop_statement(&mut self, first_init: Chunk) {
        let mut parts = vec![self.loop_part(first_init)];
        while self.parser.matches(TokenKind::Divider) {
            let init = self.isolated(Self::expression);
            parts.push(self.loop_part(init));
        }
        self.parser
            .consume(TokenKind::RightCurly, "Expected '}' after loop parts.");

        self.parser
            .consume(TokenKind::Identifier, "Expected loop body label.");
        let start = self.parser.previous.lexeme.to_string();
        self.parser
            .consume(TokenKind::Divider, "Expected ',' between loop labels.");
        self.parser
            .consume(TokenKind::Identifier, "Expected loop exit label.");
        let exit = self.parser.previous.lexeme.to_string();
        if self.parser.panic_mode() {
            return;
        }
        if start == exit {
            self.parser
                .error("Loop body and exit labels must differ.");
            return;
        }
        self.end_statement();

        let number = *self.loops;
        *self.loops += 1;
        self.emit_loop(number, &parts, &start, &exit);
        self.loop_body(number, &exit);
    }

    fn loop_part(&mut self, init: Chunk) -> LoopPart {
        self.parser
            .consume(TokenKind::LeftParen, "Expected '(' before loop step.");
        let step = self.isolated(Self::expression);
        self.parser
            .consume(TokenKind::RightParen, "Expected ')' after loop step.");

        let end = if self.parser.matches(TokenKind::LeftCurly) {
            let predicate = self.isolated(Self::expression);
            self.parser
                .consume(TokenKind::RightCurly, "Expected '}' after loop predicate.");
            EndCondition::Predicate(predicate)
        } else {
            EndCondition::Target(self.isolated(Self::expression))
        };
        self.parser
            .consume(TokenKind::Dot, "Expected '.' after loop end condition.");

        let mut params = Vec::new();
        self.parser
            .consume(TokenKind::EqualGreater, "Expected '=>' before loop parameter.");
        params.push(self.loop_parameter());
        while self.parser.matches(TokenKind::EqualGreater) {
            params.push(self.loop_parameter());
        }

        LoopPart {
            init,
            step,
            end,
            params,
        }
    }

    /// `'name` or `'(expr)`: the address the loop drives.
    fn loop_parameter(&mut self) -> Chunk {
        self.parser
            .consume(TokenKind::Quote, "Expected a pointer as loop parameter.");
        self.isolated(Self::address)
    }

    fn emit_loop(&mut self, number: usize, parts: &[LoopPart], start: &str, exit: &str) {
        let links = || {
            parts.iter().enumerate().flat_map(|(part_index, part)| {
                part.params
                    .iter()
                    .enumerate()
                    .map(move |(link, param)| (part_index, link, part, param))
            })
        };

        for (part_index, link, part, param) in links() {
            self.define_label(&block_label(Block::Init, number, part_index, link));
            self.splice(&part.init);
            self.splice(param);
            self.emit_ops(Opcode::SetPointerInverse, Opcode::Pop);
        }
        self.emit_goto(start);

        for (part_index, link, part, param) in links() {
            self.define_label(&block_label(Block::Incr, number, part_index, link));
            self.splice(param);
            self.splice(param);
            self.emit_op(Opcode::GetPointer);
            self.splice(&part.step);
            self.emit_ops(Opcode::Add, Opcode::SetPointerNoPush);
        }

        for (part_index, link, part, param) in links() {
            self.define_label(&block_label(Block::Cond, number, part_index, link));
            match &part.end {
                EndCondition::Target(target) => {
                    self.splice(param);
                    self.emit_op(Opcode::GetPointer);
                    self.splice(target);
                    self.emit_ops(Opcode::Equal, Opcode::Not);
                }
                EndCondition::Predicate(predicate) => self.splice(predicate),
            }
            self.emit_constant(Value::string(exit));
            self.emit_op(Opcode::JumpIfFalseToLabel);
        }
        self.emit_goto(start);
        self.define_label(start);
    }

    /// Statements up to `exit...`, then the jump back to the increments.
    fn loop_body(&mut self, number: usize, exit: &str) {
        loop {
            if self.parser.check(TokenKind::Identifier)
                && self.parser.check_next(TokenKind::Dots3)
                && self.parser.current.lexeme == exit
            {
                break;
            }
            if self.parser.check(TokenKind::Eof) {
                let message = format!("Expected '{exit}...' to close the loop body.");
                self.parser.error_at_current(&message);
                return;
            }
            self.declaration();
        }
        self.emit_goto(&block_label(Block::Incr, number, 0, 0));
    }
}
