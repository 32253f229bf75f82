use std::collections::HashMap;

use super::instruction::Opcode;
use crate::error::ChunkError;
use crate::symbol::{intern, Symbol};
use crate::value::Value;

/// Placeholder written where a forward jump distance is not yet known.
const JUMP_PLACEHOLDER: u8 = 0xFF;

/// Largest constant pool addressable by a one-byte operand.
pub const MAX_CONSTANTS: usize = u8::MAX as usize + 1;

/// Flat instruction stream with its line table, constant pool and labels.
#[derive(Debug, Clone, Default)]
pub struct Chunk {
    code: Vec<u8>,
    lines: Vec<usize>,
    constants: Vec<Value>,
    labels: HashMap<String, usize>,
    jump_table: HashMap<Symbol, usize>,
}

impl Chunk {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one byte, returning its offset.
    pub fn emit(&mut self, byte: u8, line: usize) -> usize {
        self.code.push(byte);
        self.lines.push(line);
        self.code.len() - 1
    }

    pub fn emit_op(&mut self, op: Opcode, line: usize) -> usize {
        self.emit(op.into(), line)
    }

    /// Append an opcode and its operand, returning the opcode's offset.
    pub fn emit_pair(&mut self, op: Opcode, operand: u8, line: usize) -> usize {
        let offset = self.emit_op(op, line);
        self.emit(operand, line);
        offset
    }

    /// Emit a forward jump with a placeholder distance and return the
    /// placeholder's offset for [`Chunk::patch_jump`].
    pub fn emit_jump(&mut self, op: Opcode, line: usize) -> usize {
        self.emit_op(op, line);
        self.emit(JUMP_PLACEHOLDER, line)
    }

    pub fn add_constant(&mut self, value: Value) -> Result<u8, ChunkError> {
        if let Some(index) = self
            .constants
            .iter()
            .position(|existing| same_constant(existing, &value))
        {
            return Ok(index as u8);
        }
        if self.constants.len() >= MAX_CONSTANTS {
            return Err(ChunkError::TooManyConstants);
        }
        self.constants.push(value);
        Ok((self.constants.len() - 1) as u8)
    }

    /// Overwrite a previously emitted byte.
    pub fn patch(&mut self, offset: usize, value: u8) {
        if let Some(slot) = self.code.get_mut(offset) {
            *slot = value;
        }
    }

    /// Point the jump whose operand lives at `offset` at the current end.
    pub fn patch_jump(&mut self, offset: usize) -> Result<(), ChunkError> {
        let distance = self.code.len() - offset - 1;
        let operand = u8::try_from(distance).map_err(|_| ChunkError::JumpTooLarge(distance))?;
        self.patch(offset, operand);
        Ok(())
    }

    /// Bind `name` to the current end offset.
    pub fn define_label(&mut self, name: &str) -> Result<usize, ChunkError> {
        let offset = self.code.len();
        self.insert_label(name, offset)?;
        Ok(offset)
    }

    fn insert_label(&mut self, name: &str, offset: usize) -> Result<(), ChunkError> {
        if self.labels.contains_key(name) {
            return Err(ChunkError::DuplicateLabel(name.to_string()));
        }
        self.labels.insert(name.to_string(), offset);
        Ok(())
    }

    pub fn label(&self, name: &str) -> Option<usize> {
        self.labels.get(name).copied()
    }

    /// Copy `other`'s instructions onto the end of this chunk.
    ///
    /// Constant operands are re-homed into this chunk's pool and label
    /// offsets are rebased, so independently compiled chunks can be combined
    /// any number of times.
    pub fn splice(&mut self, other: &Chunk) -> Result<(), ChunkError> {
        let base = self.code.len();
        let mut offset = 0;
        while offset < other.code.len() {
            let op = Opcode::try_from(other.code[offset])?;
            let line = other.lines[offset];
            let operand_len = op.operand_len();
            if operand_len > 0 && offset + operand_len >= other.code.len() {
                return Err(ChunkError::TruncatedInstruction(offset));
            }
            match op {
                Opcode::Constant => {
                    let index = other.code[offset + 1] as usize;
                    let value = other
                        .constants
                        .get(index)
                        .cloned()
                        .ok_or(ChunkError::MissingConstant(index))?;
                    let renumbered = self.add_constant(value)?;
                    self.emit_pair(op, renumbered, line);
                }
                _ => {
                    for byte in offset..=offset + operand_len {
                        self.emit(other.code[byte], other.lines[byte]);
                    }
                }
            }
            offset += 1 + operand_len;
        }
        for (name, label_offset) in &other.labels {
            self.insert_label(name, base + label_offset)?;
        }
        Ok(())
    }

    /// Build the interned jump table used for run-time label lookups.
    pub fn finalize(&mut self) {
        self.jump_table = self
            .labels
            .iter()
            .map(|(name, offset)| (intern(name), *offset))
            .collect();
    }

    pub fn resolve_label(&self, name: &Symbol) -> Option<usize> {
        self.jump_table.get(name).copied()
    }

    pub fn code(&self) -> &[u8] {
        &self.code
    }

    pub fn constants(&self) -> &[Value] {
        &self.constants
    }

    pub fn labels(&self) -> impl Iterator<Item = (&str, usize)> {
        self.labels.iter().map(|(name, offset)| (name.as_str(), *offset))
    }

    /// Source line of the byte at `offset`, or 0 when out of range.
    pub fn line_at(&self, offset: usize) -> usize {
        self.lines.get(offset).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }
}

/// Pool entries that can be shared. Numbers compare by bits so `-0` and
/// `0` keep separate slots.
fn same_constant(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(a), Value::Number(b)) => a.to_bits() == b.to_bits(),
        (Value::String(a), Value::String(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constant_chunk(value: f64, line: usize) -> Chunk {
        let mut chunk = Chunk::new();
        let index = chunk.add_constant(Value::Number(value)).expect("room");
        chunk.emit_pair(Opcode::Constant, index, line);
        chunk
    }

    #[test]
    fn splice_renumbers_constants() {
        let mut parent = constant_chunk(1.0, 1);
        let child = constant_chunk(2.0, 2);
        parent.splice(&child).expect("splice");
        parent.splice(&child).expect("splice twice");

        assert_eq!(parent.constants().len(), 2);
        assert_eq!(
            parent.code(),
            &[Opcode::Constant as u8, 0, Opcode::Constant as u8, 1, Opcode::Constant as u8, 1]
        );
        assert_eq!(parent.constants()[1], Value::Number(2.0));
        assert_eq!(parent.line_at(2), 2);
    }

    #[test]
    fn splice_rebases_labels() {
        let mut parent = constant_chunk(1.0, 1);
        let mut child = Chunk::new();
        child.emit_op(Opcode::Add, 1);
        child.define_label("inner").expect("fresh label");
        child.emit_op(Opcode::Print, 1);
        parent.splice(&child).expect("splice");
        assert_eq!(parent.label("inner"), Some(3));
    }

    #[test]
    fn backpatch_writes_forward_distance() {
        let mut chunk = Chunk::new();
        let placeholder = chunk.emit_jump(Opcode::Jump, 1);
        chunk.emit_op(Opcode::True, 1);
        chunk.emit_op(Opcode::Print, 1);
        chunk.patch_jump(placeholder).expect("short jump");
        assert_eq!(chunk.code()[placeholder], 2);
    }

    #[test]
    fn oversized_jump_is_rejected() {
        let mut chunk = Chunk::new();
        let placeholder = chunk.emit_jump(Opcode::Jump, 1);
        for _ in 0..300 {
            chunk.emit_op(Opcode::True, 1);
        }
        assert_eq!(chunk.patch_jump(placeholder), Err(ChunkError::JumpTooLarge(300)));
    }

    #[test]
    fn constant_pool_is_bounded() {
        let mut chunk = Chunk::new();
        for n in 0..MAX_CONSTANTS {
            chunk.add_constant(Value::Number(n as f64)).expect("room");
        }
        assert_eq!(chunk.add_constant(Value::Number(7.0)), Ok(7));
        assert_eq!(
            chunk.add_constant(Value::Number(MAX_CONSTANTS as f64)),
            Err(ChunkError::TooManyConstants)
        );
    }

    #[test]
    fn equal_constants_share_a_slot() {
        let mut chunk = Chunk::new();
        let name = chunk.add_constant(Value::string("i")).expect("room");
        assert_eq!(chunk.add_constant(Value::string("i")), Ok(name));
        let zero = chunk.add_constant(Value::Number(0.0)).expect("room");
        let negative_zero = chunk.add_constant(Value::Number(-0.0)).expect("room");
        assert_ne!(zero, negative_zero);
        assert_eq!(chunk.add_constant(Value::Bool(true)), Ok(3));
        assert_eq!(chunk.add_constant(Value::Bool(true)), Ok(4));
        assert_eq!(chunk.constants().len(), 5);
    }

    #[test]
    fn labels_are_unique_and_finalize_into_jump_table() {
        let mut chunk = Chunk::new();
        chunk.emit_op(Opcode::True, 1);
        chunk.define_label("top").expect("fresh label");
        assert_eq!(
            chunk.define_label("top"),
            Err(ChunkError::DuplicateLabel("top".into()))
        );
        chunk.finalize();
        assert_eq!(chunk.resolve_label(&intern("top")), Some(1));
        assert_eq!(chunk.resolve_label(&intern("bottom")), None);
    }
}
