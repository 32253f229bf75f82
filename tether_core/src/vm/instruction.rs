use crate::error::ChunkError;

/// One-byte opcodes. Instructions are either a bare opcode or an opcode
/// followed by one operand byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    Return = 0,
    Constant,
    True,
    False,
    Negate,
    Not,
    Add,
    Subtract,
    Multiply,
    Divide,
    Less,
    Greater,
    Equal,
    Print,
    /// Pops the top value; transfers control when it names a label.
    Pop,
    SetPointer,
    SetPointerNoPush,
    SetPointerInverse,
    GetPointer,
    Exchange,
    /// Pops a label then a predicate; jumps to the label when falsey.
    JumpIfFalseToLabel,
    Jump,
    JumpIfFalse,
}

impl Opcode {
    const ALL: [Opcode; 23] = [
        Opcode::Return,
        Opcode::Constant,
        Opcode::True,
        Opcode::False,
        Opcode::Negate,
        Opcode::Not,
        Opcode::Add,
        Opcode::Subtract,
        Opcode::Multiply,
        Opcode::Divide,
        Opcode::Less,
        Opcode::Greater,
        Opcode::Equal,
        Opcode::Print,
        Opcode::Pop,
        Opcode::SetPointer,
        Opcode::SetPointerNoPush,
        Opcode::SetPointerInverse,
        Opcode::GetPointer,
        Opcode::Exchange,
        Opcode::JumpIfFalseToLabel,
        Opcode::Jump,
        Opcode::JumpIfFalse,
    ];

    /// Number of operand bytes following the opcode.
    pub fn operand_len(self) -> usize {
        match self {
            Opcode::Constant | Opcode::Jump | Opcode::JumpIfFalse => 1,
            _ => 0,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Opcode::Return => "OP_RETURN",
            Opcode::Constant => "OP_CONSTANT",
            Opcode::True => "OP_TRUE",
            Opcode::False => "OP_FALSE",
            Opcode::Negate => "OP_NEGATE",
            Opcode::Not => "OP_NOT",
            Opcode::Add => "OP_ADD",
            Opcode::Subtract => "OP_SUBTRACT",
            Opcode::Multiply => "OP_MULTIPLY",
            Opcode::Divide => "OP_DIVIDE",
            Opcode::Less => "OP_LESS",
            Opcode::Greater => "OP_GREATER",
            Opcode::Equal => "OP_EQUAL",
            Opcode::Print => "OP_PRINT",
            Opcode::Pop => "OP_POP",
            Opcode::SetPointer => "OP_SET_POINTER",
            Opcode::SetPointerNoPush => "OP_SET_POINTER_NO_PUSH",
            Opcode::SetPointerInverse => "OP_SET_POINTER_INVERSE",
            Opcode::GetPointer => "OP_GET_POINTER",
            Opcode::Exchange => "OP_EXCHANGE",
            Opcode::JumpIfFalseToLabel => "OP_JUMP_IF_FALSE_TO_LABEL",
            Opcode::Jump => "OP_JUMP",
            Opcode::JumpIfFalse => "OP_JUMP_IF_FALSE",
        }
    }
}

impl TryFrom<u8> for Opcode {
    type Error = ChunkError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        Opcode::ALL
            .get(byte as usize)
            .copied()
            .ok_or(ChunkError::InvalidOpcode(byte))
    }
}

impl From<Opcode> for u8 {
    fn from(op: Opcode) -> Self {
        op as u8
    }
}
