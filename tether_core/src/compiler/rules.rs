//! Precedence climbing: the parse-rule table and the expression actions it
//! dispatches to.

use super::CompileUnit;
use crate::scanner::TokenKind;
use crate::value::Value;
use crate::vm::instruction::Opcode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum Precedence {
    None,
    Assignment,
    Or,
    And,
    Equality,
    Comparison,
    Term,
    Factor,
    Unary,
    Primary,
}

impl Precedence {
    /// One level tighter, used to make binary operators left-associative.
    pub fn next(self) -> Self {
        match self {
            Precedence::None => Precedence::Assignment,
            Precedence::Assignment => Precedence::Or,
            Precedence::Or => Precedence::And,
            Precedence::And => Precedence::Equality,
            Precedence::Equality => Precedence::Comparison,
            Precedence::Comparison => Precedence::Term,
            Precedence::Term => Precedence::Factor,
            Precedence::Factor => Precedence::Unary,
            Precedence::Unary | Precedence::Primary => Precedence::Primary,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Prefix {
    Grouping,
    Unary,
    Number,
    Str,
    Name,
    Literal,
    Pointer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Infix {
    Binary,
    Refer,
    Exchange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ParseRule {
    pub prefix: Option<Prefix>,
    pub infix: Option<Infix>,
    pub precedence: Precedence,
}

const fn rule_of(
    prefix: Option<Prefix>,
    infix: Option<Infix>,
    precedence: Precedence,
) -> ParseRule {
    ParseRule {
        prefix,
        infix,
        precedence,
    }
}

pub(crate) fn rule(kind: TokenKind) -> ParseRule {
    use Precedence as P;
    use TokenKind as T;
    match kind {
        T::LeftParen => rule_of(Some(Prefix::Grouping), None, P::None),
        T::Minus => rule_of(Some(Prefix::Unary), Some(Infix::Binary), P::Term),
        T::Plus => rule_of(None, Some(Infix::Binary), P::Term),
        T::Slash | T::Star => rule_of(None, Some(Infix::Binary), P::Factor),
        T::Bang => rule_of(Some(Prefix::Unary), None, P::None),
        T::BangEqual | T::EqualEqual => rule_of(None, Some(Infix::Binary), P::Equality),
        T::Greater | T::GreaterEqual | T::Less | T::LessEqual => {
            rule_of(None, Some(Infix::Binary), P::Comparison)
        }
        T::EqualGreater => rule_of(None, Some(Infix::Refer), P::Assignment),
        T::LessEqualGreater => rule_of(None, Some(Infix::Exchange), P::Assignment),
        T::Quote => rule_of(Some(Prefix::Pointer), None, P::None),
        T::Identifier => rule_of(Some(Prefix::Name), None, P::None),
        T::Number => rule_of(Some(Prefix::Number), None, P::None),
        T::Str => rule_of(Some(Prefix::Str), None, P::None),
        T::True | T::False => rule_of(Some(Prefix::Literal), None, P::None),
        _ => rule_of(None, None, P::None),
    }
}

impl<'src, 'c> CompileUnit<'src, 'c> {
    pub(crate) fn expression(&mut self) {
        self.parse_precedence(Precedence::Assignment);
    }

    pub(crate) fn parse_precedence(&mut self, precedence: Precedence) {
        self.parser.advance();
        let Some(prefix) = rule(self.parser.previous.kind).prefix else {
            self.parser.error("Expect expression.");
            return;
        };
        let can_assign = precedence <= Precedence::Assignment;
        self.prefix(prefix, can_assign);

        while precedence <= rule(self.parser.current.kind).precedence {
            self.parser.advance();
            if let Some(infix) = rule(self.parser.previous.kind).infix {
                self.infix(infix);
            }
        }

        if can_assign && self.parser.matches(TokenKind::Equal) {
            self.parser.error("Invalid assignment target.");
        }
    }

    fn prefix(&mut self, prefix: Prefix, can_assign: bool) {
        match prefix {
            Prefix::Grouping => self.grouping(),
            Prefix::Unary => self.unary(),
            Prefix::Number => self.number(),
            Prefix::Str => self.string(),
            Prefix::Name => self.name(),
            Prefix::Literal => self.literal(),
            Prefix::Pointer => self.pointer(can_assign),
        }
    }

    fn infix(&mut self, infix: Infix) {
        match infix {
            Infix::Binary => self.binary(),
            Infix::Refer => self.reference(Opcode::SetPointerInverse),
            Infix::Exchange => self.reference(Opcode::Exchange),
        }
    }

    fn grouping(&mut self) {
        self.expression();
        self.parser
            .consume(TokenKind::RightParen, "Expected ')' after expression.");
    }

    fn unary(&mut self) {
        let operator = self.parser.previous.kind;
        self.parse_precedence(Precedence::Unary);
        match operator {
            TokenKind::Minus => self.emit_op(Opcode::Negate),
            TokenKind::Bang => self.emit_op(Opcode::Not),
            _ => {}
        }
    }

    fn binary(&mut self) {
        let operator = self.parser.previous.kind;
        self.parse_precedence(rule(operator).precedence.next());
        match operator {
            TokenKind::Plus => self.emit_op(Opcode::Add),
            TokenKind::Minus => self.emit_op(Opcode::Subtract),
            TokenKind::Star => self.emit_op(Opcode::Multiply),
            TokenKind::Slash => self.emit_op(Opcode::Divide),
            TokenKind::EqualEqual => self.emit_op(Opcode::Equal),
            TokenKind::BangEqual => self.emit_ops(Opcode::Equal, Opcode::Not),
            TokenKind::Greater => self.emit_op(Opcode::Greater),
            TokenKind::GreaterEqual => self.emit_ops(Opcode::Less, Opcode::Not),
            TokenKind::Less => self.emit_op(Opcode::Less),
            TokenKind::LessEqual => self.emit_ops(Opcode::Greater, Opcode::Not),
            _ => {}
        }
    }

    /// `=>` and `<=>`: one right operand, no chaining.
    fn reference(&mut self, op: Opcode) {
        self.parse_precedence(Precedence::Assignment.next());
        self.emit_op(op);
        if self.parser.check(TokenKind::EqualGreater)
            || self.parser.check(TokenKind::LessEqualGreater)
        {
            self.parser
                .error_at_current("Reference operators cannot be chained.");
        }
    }

    fn number(&mut self) {
        match self.parser.previous.lexeme.parse::<f64>() {
            Ok(number) => self.emit_constant(Value::Number(number)),
            Err(_) => self.parser.error("Invalid number literal."),
        }
    }

    fn string(&mut self) {
        let lexeme = self.parser.previous.lexeme.clone();
        let text = lexeme
            .strip_prefix('"')
            .and_then(|rest| rest.strip_suffix('"'))
            .unwrap_or(&lexeme);
        self.emit_constant(Value::string(text));
    }

    /// A bare identifier evaluates to its own name.
    fn name(&mut self) {
        let lexeme = self.parser.previous.lexeme.clone();
        self.emit_constant(Value::string(&lexeme));
    }

    fn literal(&mut self) {
        match self.parser.previous.kind {
            TokenKind::True => self.emit_op(Opcode::True),
            TokenKind::False => self.emit_op(Opcode::False),
            _ => {}
        }
    }

    /// `'operand` reads through a pointer, `'operand = value` writes through it.
    fn pointer(&mut self, can_assign: bool) {
        self.address();
        if can_assign && self.parser.matches(TokenKind::Equal) {
            self.expression();
            self.emit_op(Opcode::SetPointer);
        } else {
            self.emit_op(Opcode::GetPointer);
        }
    }

    /// The operand after a quote: a name, a parenthesised expression or
    /// another pointer read.
    pub(crate) fn address(&mut self) {
        self.parse_precedence(Precedence::Unary);
    }
}
