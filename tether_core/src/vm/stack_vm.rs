//=============================================
// tether_core/vm/stack_vm.rs
//=============================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Execute compiled Tether chunks
// Objective: Fetch-decode-execute loop over a bounded operand stack and a
//            name-addressed arena of cells with pointer and label semantics
//=============================================

use std::collections::HashMap;
use std::io::{self, Write};

use tracing::{debug, trace};

use super::bytecode::Chunk;
use super::disasm;
use super::instruction::Opcode;
use crate::compiler::Compiler;
use crate::config::VmConfig;
use crate::error::{CompileError, RuntimeError, RuntimeErrorKind, TetherError, TetherResult};
use crate::memory::Arena;
use crate::scanner::Rewrite;
use crate::symbol::{lookup, Symbol};
use crate::value::{CellRef, Value};

/// Outcome of [`Vm::interpret`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterpretResult {
    Ok,
    CompileError,
    RuntimeError,
}

impl InterpretResult {
    /// Conventional interpreter exit status.
    pub fn exit_code(self) -> u8 {
        match self {
            InterpretResult::Ok => 0,
            InterpretResult::CompileError => 65,
            InterpretResult::RuntimeError => 70,
        }
    }
}

type Step<T> = Result<T, RuntimeErrorKind>;

pub struct Vm {
    config: VmConfig,
    stack: Vec<Value>,
    arena: Arena<Value>,
    symbols: HashMap<Symbol, CellRef>,
    compiler: Compiler,
    out: Box<dyn Write + Send>,
}

impl Vm {
    pub fn new(config: VmConfig) -> Self {
        Self {
            stack: Vec::with_capacity(config.stack_max),
            arena: Arena::with_capacity(config.arena_capacity),
            symbols: HashMap::new(),
            compiler: Compiler::new(),
            out: Box::new(io::stdout()),
            config,
        }
    }

    /// Send `print` output to `out` instead of stdout.
    pub fn with_output(mut self, out: impl Write + Send + 'static) -> Self {
        self.out = Box::new(out);
        self
    }

    pub fn set_rewrites(&mut self, rewrites: Vec<Rewrite>) {
        self.compiler.set_rewrites(rewrites);
    }

    pub fn config(&self) -> &VmConfig {
        &self.config
    }

    /// Compile without running, using this VM's rewrite table and loop
    /// numbering.
    pub fn compile(&mut self, source: &str) -> Result<Chunk, CompileError> {
        self.compiler.compile(source)
    }

    /// Compile and run, keeping the arena and symbols from earlier calls.
    pub fn execute(&mut self, source: &str) -> TetherResult<()> {
        let chunk = self.compile(source)?;
        self.run(&chunk).map_err(TetherError::from)
    }

    /// Compile and run, reporting failures on stderr.
    pub fn interpret(&mut self, source: &str) -> InterpretResult {
        match self.execute(source) {
            Ok(()) => InterpretResult::Ok,
            Err(TetherError::Compile(error)) => {
                for diagnostic in &error.diagnostics {
                    eprintln!("{diagnostic}");
                }
                InterpretResult::CompileError
            }
            Err(TetherError::Runtime(error)) => {
                eprintln!("{error}");
                InterpretResult::RuntimeError
            }
        }
    }

    /// Forget every binding and cell.
    pub fn reset(&mut self) {
        self.stack.clear();
        self.arena.clear();
        self.symbols.clear();
    }

    /// Current value of `name`, following aliases.
    pub fn value_of(&self, name: &str) -> Option<&Value> {
        let cell = *self.symbols.get(&lookup(name)?)?;
        self.arena.get(self.deref(cell))
    }

    pub fn stack(&self) -> &[Value] {
        &self.stack
    }

    /// Execute `chunk` until it returns. A failure clears the stack.
    pub fn run(&mut self, chunk: &Chunk) -> Result<(), RuntimeError> {
        debug!(bytes = chunk.len(), cells = self.arena.len(), "run start");
        let mut ip = 0;
        let outcome = loop {
            let start = ip;
            match self.step(chunk, &mut ip) {
                Ok(true) => continue,
                Ok(false) => break Ok(()),
                Err(kind) => {
                    break Err(RuntimeError {
                        kind,
                        line: chunk.line_at(start),
                    })
                }
            }
        };
        if outcome.is_err() {
            self.stack.clear();
        }
        debug!(ok = outcome.is_ok(), cells = self.arena.len(), "run end");
        outcome
    }

    /// Execute one instruction. Returns `false` once the chunk returns.
    fn step(&mut self, chunk: &Chunk, ip: &mut usize) -> Step<bool> {
        if self.config.trace && *ip < chunk.len() {
            let (text, _) = disasm::instruction_at(chunk, *ip);
            trace!(depth = self.stack.len(), "{text}");
        }
        let byte = read_byte(chunk, ip)?;
        let op = Opcode::try_from(byte).map_err(|_| RuntimeErrorKind::InvalidOpcode(byte))?;
        match op {
            Opcode::Return => return Ok(false),
            Opcode::Constant => {
                let index = read_byte(chunk, ip)? as usize;
                let value = chunk
                    .constants()
                    .get(index)
                    .cloned()
                    .ok_or(RuntimeErrorKind::InvalidConstant(index))?;
                self.push(value)?;
            }
            Opcode::True => self.push(Value::Bool(true))?,
            Opcode::False => self.push(Value::Bool(false))?,
            Opcode::Negate => {
                let number = self
                    .pop()?
                    .as_number()
                    .ok_or(RuntimeErrorKind::NumberOperand)?;
                self.push(Value::Number(-number))?;
            }
            Opcode::Not => {
                let value = self.pop()?;
                self.push(Value::Bool(value.is_falsey()))?;
            }
            Opcode::Add
            | Opcode::Subtract
            | Opcode::Multiply
            | Opcode::Divide
            | Opcode::Less
            | Opcode::Greater => {
                let (a, b) = self.pop_numbers()?;
                let result = match op {
                    Opcode::Add => Value::Number(a + b),
                    Opcode::Subtract => Value::Number(a - b),
                    Opcode::Multiply => Value::Number(a * b),
                    Opcode::Divide => Value::Number(a / b),
                    Opcode::Less => Value::Bool(a < b),
                    _ => Value::Bool(a > b),
                };
                self.push(result)?;
            }
            Opcode::Equal => {
                let b = self.pop()?;
                let a = self.pop()?;
                self.push(Value::Bool(a == b))?;
            }
            Opcode::Print => {
                let value = self.pop()?;
                let shown = self.resolve_name(&value).unwrap_or(value);
                writeln!(self.out, "{shown}")
                    .map_err(|error| RuntimeErrorKind::Output(error.to_string()))?;
            }
            Opcode::Pop => {
                let value = self.pop()?;
                if let Some(target) = self.goto_target(chunk, &value)? {
                    *ip = target;
                }
            }
            Opcode::SetPointer => {
                let pointee = self.pop()?;
                let pointer = self.pop()?;
                let cell = self.set_pointer(pointer, pointee)?;
                self.push(Value::Pointer(cell))?;
            }
            Opcode::SetPointerNoPush => {
                let pointee = self.pop()?;
                let pointer = self.pop()?;
                self.set_pointer(pointer, pointee)?;
            }
            Opcode::SetPointerInverse => {
                let pointer = self.pop()?;
                let pointee = self.pop()?;
                let cell = self.set_pointer(pointer, pointee)?;
                self.push(Value::Pointer(cell))?;
            }
            Opcode::GetPointer => {
                let value = self.pop()?;
                let contents = self.get_pointer(value)?;
                self.push(contents)?;
            }
            Opcode::Exchange => {
                let right = self.pop()?;
                let left = self.pop()?;
                let cell = self.exchange(left, right)?;
                self.push(Value::Pointer(cell))?;
            }
            Opcode::JumpIfFalseToLabel => {
                let label = self.pop()?;
                let predicate = self.pop()?;
                if predicate.is_falsey() {
                    *ip = resolve_label(chunk, &label)?;
                }
            }
            Opcode::Jump => {
                let distance = read_byte(chunk, ip)? as usize;
                *ip += distance;
            }
            Opcode::JumpIfFalse => {
                let distance = read_byte(chunk, ip)? as usize;
                if self.pop()?.is_falsey() {
                    *ip += distance;
                }
            }
        }
        Ok(true)
    }

    fn push(&mut self, value: Value) -> Step<()> {
        if self.stack.len() >= self.config.stack_max {
            return Err(RuntimeErrorKind::StackOverflow);
        }
        self.stack.push(value);
        Ok(())
    }

    fn pop(&mut self) -> Step<Value> {
        self.stack.pop().ok_or(RuntimeErrorKind::StackUnderflow)
    }

    fn pop_numbers(&mut self) -> Step<(f64, f64)> {
        let b = self.pop()?;
        let a = self.pop()?;
        match (a.as_number(), b.as_number()) {
            (Some(a), Some(b)) => Ok((a, b)),
            _ => Err(RuntimeErrorKind::NumberOperands),
        }
    }

    fn cell(&self, cell: CellRef) -> Step<&Value> {
        self.arena
            .get(cell)
            .ok_or(RuntimeErrorKind::DanglingPointer(cell.index()))
    }

    /// Follow alias links to the cell that actually holds a value.
    fn deref(&self, mut cell: CellRef) -> CellRef {
        for _ in 0..=self.arena.len() {
            match self.arena.get(cell) {
                Some(Value::Pointer(next)) => cell = *next,
                _ => break,
            }
        }
        cell
    }

    fn bound(&self, name: &Symbol) -> Option<CellRef> {
        self.symbols.get(name).copied()
    }

    /// The value a bound String name currently denotes.
    fn resolve_name(&self, value: &Value) -> Option<Value> {
        let Value::String(name) = value else {
            return None;
        };
        let cell = self.deref(self.bound(name)?);
        self.arena.get(cell).cloned()
    }

    /// The cell an assignment through `pointer` lands in, binding a fresh
    /// cell for unknown names.
    fn assignment_target(&mut self, pointer: &Value) -> Step<CellRef> {
        match pointer {
            Value::Pointer(cell) | Value::Boxed(cell) => Ok(*cell),
            Value::Number(_) | Value::String(_) => {
                let name = pointer
                    .as_name()
                    .ok_or(RuntimeErrorKind::InvalidPointer(pointer.type_name()))?;
                if let Some(cell) = self.bound(&name) {
                    return Ok(cell);
                }
                let cell = self.arena.allocate(Value::Number(0.0))?;
                self.symbols.insert(name, cell);
                Ok(cell)
            }
            other => Err(RuntimeErrorKind::InvalidPointer(other.type_name())),
        }
    }

    fn set_pointer(&mut self, pointer: Value, pointee: Value) -> Step<CellRef> {
        let target = self.assignment_target(&pointer)?;

        if let Value::String(name) = &pointee {
            if let Some(source) = self.bound(name) {
                if self.reaches(source, target) {
                    return Err(RuntimeErrorKind::AliasCycle(name.to_string()));
                }
                *self.cell_mut(target)? = Value::Pointer(source);
                return Ok(target);
            }
        }

        let destination = match pointer {
            Value::Boxed(cell) => cell,
            _ => self.deref(target),
        };
        let stored = match pointee {
            Value::Pointer(cell) => Value::Boxed(cell),
            other => other,
        };
        *self.cell_mut(destination)? = stored;
        Ok(target)
    }

    /// Whether the alias chain starting at `from` passes through `to`.
    fn reaches(&self, from: CellRef, to: CellRef) -> bool {
        let mut cell = from;
        for _ in 0..=self.arena.len() {
            if cell == to {
                return true;
            }
            match self.arena.get(cell) {
                Some(Value::Pointer(next)) => cell = *next,
                _ => return false,
            }
        }
        false
    }

    fn cell_mut(&mut self, cell: CellRef) -> Step<&mut Value> {
        self.arena
            .get_mut(cell)
            .ok_or(RuntimeErrorKind::DanglingPointer(cell.index()))
    }

    fn get_pointer(&self, value: Value) -> Step<Value> {
        match value {
            Value::Pointer(cell) | Value::Boxed(cell) => self.cell(cell).cloned(),
            Value::Number(_) | Value::String(_) => {
                let cell = value
                    .known_name()
                    .and_then(|name| self.bound(&name))
                    .ok_or_else(|| RuntimeErrorKind::UndefinedVariable(value.to_string()))?;
                self.cell(self.deref(cell)).cloned()
            }
            other => Err(RuntimeErrorKind::InvalidPointer(other.type_name())),
        }
    }

    fn exchange(&mut self, left: Value, right: Value) -> Step<CellRef> {
        let operands = (
            self.exchange_operand(&left)?,
            self.exchange_operand(&right)?,
        );
        let (Some(left_cell), Some(right_cell)) = operands else {
            return Err(RuntimeErrorKind::ExchangeOperands(
                left.type_name(),
                right.type_name(),
            ));
        };
        let a = self.deref(left_cell);
        let b = self.deref(right_cell);
        if !self.arena.swap(a, b) {
            return Err(RuntimeErrorKind::DanglingPointer(a.index().max(b.index())));
        }
        Ok(left_cell)
    }

    /// The cell an exchange operand refers to, or `None` when the operand
    /// cannot take part in a swap.
    fn exchange_operand(&self, value: &Value) -> Step<Option<CellRef>> {
        match value {
            Value::Pointer(cell) => Ok(Some(*cell)),
            Value::Number(_) | Value::String(_) => value
                .known_name()
                .and_then(|name| self.bound(&name))
                .map(Some)
                .ok_or_else(|| RuntimeErrorKind::UndefinedVariable(value.to_string())),
            _ => Ok(None),
        }
    }

    /// Where a popped value sends control: a label, or the number held by
    /// a bound name. `None` falls through.
    fn goto_target(&self, chunk: &Chunk, value: &Value) -> Step<Option<usize>> {
        let Some(name) = value.known_name() else {
            return Ok(None);
        };
        if let Some(offset) = chunk.resolve_label(&name) {
            return Ok(Some(offset));
        }
        let Some(cell) = self.bound(&name) else {
            return Ok(None);
        };
        match self.cell(self.deref(cell))? {
            Value::Number(offset) => {
                let valid = *offset >= 0.0
                    && offset.fract() == 0.0
                    && (*offset as usize) < chunk.len();
                if valid {
                    Ok(Some(*offset as usize))
                } else {
                    Err(RuntimeErrorKind::InvalidJumpTarget(offset.to_string()))
                }
            }
            _ => Ok(None),
        }
    }
}

impl Default for Vm {
    fn default() -> Self {
        Self::new(VmConfig::default())
    }
}

fn read_byte(chunk: &Chunk, ip: &mut usize) -> Step<u8> {
    let byte = *chunk
        .code()
        .get(*ip)
        .ok_or(RuntimeErrorKind::MissingReturn)?;
    *ip += 1;
    Ok(byte)
}

fn resolve_label(chunk: &Chunk, label: &Value) -> Step<usize> {
    label
        .known_name()
        .and_then(|name| chunk.resolve_label(&name))
        .ok_or_else(|| RuntimeErrorKind::UndefinedLabel(label.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::{intern, lookup};

    fn run_chunk(vm: &mut Vm, build: impl FnOnce(&mut Chunk)) -> Result<(), RuntimeError> {
        let mut chunk = Chunk::new();
        build(&mut chunk);
        chunk.finalize();
        vm.run(&chunk)
    }

    fn constant(chunk: &mut Chunk, value: Value) {
        let index = chunk.add_constant(value).expect("room");
        chunk.emit_pair(Opcode::Constant, index, 1);
    }

    #[test]
    fn exit_codes_follow_interpreter_convention() {
        assert_eq!(InterpretResult::Ok.exit_code(), 0);
        assert_eq!(InterpretResult::CompileError.exit_code(), 65);
        assert_eq!(InterpretResult::RuntimeError.exit_code(), 70);
    }

    #[test]
    fn running_off_the_end_is_an_error() {
        let mut vm = Vm::default();
        let error = run_chunk(&mut vm, |chunk| {
            chunk.emit_op(Opcode::True, 3);
        })
        .expect_err("no return");
        assert_eq!(error.kind, RuntimeErrorKind::MissingReturn);
        assert!(vm.stack().is_empty());
    }

    #[test]
    fn tracing_stops_at_the_end_of_the_chunk() {
        let mut vm = Vm::new(VmConfig {
            trace: true,
            ..VmConfig::default()
        });
        let error = run_chunk(&mut vm, |chunk| {
            chunk.emit_op(Opcode::True, 1);
        })
        .expect_err("no return");
        assert_eq!(error.kind, RuntimeErrorKind::MissingReturn);

        let mut vm = Vm::new(VmConfig {
            trace: true,
            ..VmConfig::default()
        });
        vm.execute("'x = 2\n{ 'x < 3 } 'x = 'x + 1").expect("runs traced");
        assert_eq!(vm.value_of("x"), Some(&Value::Number(3.0)));
    }

    #[test]
    fn number_lookups_leave_the_symbol_pool_alone() {
        let mut vm = Vm::default();
        vm.execute("{0 (1) 40 . => 'k} top, out\n'k + 0.375\nout...")
            .expect("runs");
        vm.execute("731.0625").expect("falls through");
        for text in ["0.375", "12.375", "39.375", "731.0625"] {
            assert_eq!(lookup(text), None, "{text} was interned");
        }
        let error = vm.execute("print '918.5").expect_err("unbound number");
        assert!(matches!(
            error,
            TetherError::Runtime(RuntimeError {
                kind: RuntimeErrorKind::UndefinedVariable(ref name),
                ..
            }) if name == "918.5"
        ));
        assert_eq!(lookup("918.5"), None);
    }

    #[test]
    fn stack_limit_is_enforced() {
        let mut vm = Vm::new(VmConfig {
            stack_max: 2,
            ..VmConfig::default()
        });
        let error = run_chunk(&mut vm, |chunk| {
            for _ in 0..3 {
                chunk.emit_op(Opcode::True, 1);
            }
            chunk.emit_op(Opcode::Return, 1);
        })
        .expect_err("overflow");
        assert_eq!(error.kind, RuntimeErrorKind::StackOverflow);
    }

    #[test]
    fn pop_on_empty_stack_underflows() {
        let mut vm = Vm::default();
        let error = run_chunk(&mut vm, |chunk| {
            chunk.emit_op(Opcode::Add, 2);
        })
        .expect_err("underflow");
        assert_eq!(error.kind, RuntimeErrorKind::StackUnderflow);
        assert_eq!(error.line, 2);
    }

    #[test]
    fn unknown_opcode_is_rejected() {
        let mut vm = Vm::default();
        let error = run_chunk(&mut vm, |chunk| {
            chunk.emit(0xEE, 1);
        })
        .expect_err("bad byte");
        assert_eq!(error.kind, RuntimeErrorKind::InvalidOpcode(0xEE));
    }

    #[test]
    fn conditional_goto_needs_a_known_label() {
        let mut vm = Vm::default();
        let error = run_chunk(&mut vm, |chunk| {
            chunk.emit_op(Opcode::False, 1);
            constant(chunk, Value::string("nowhere"));
            chunk.emit_op(Opcode::JumpIfFalseToLabel, 1);
            chunk.emit_op(Opcode::Return, 1);
        })
        .expect_err("unresolved");
        assert_eq!(error.kind, RuntimeErrorKind::UndefinedLabel("nowhere".into()));
    }

    #[test]
    fn bound_number_acts_as_raw_offset() {
        let mut vm = Vm::default();
        run_chunk(&mut vm, |chunk| {
            // 'target = 9 ; target  (jumps over the False at 8)
            constant(chunk, Value::string("target"));
            constant(chunk, Value::Number(9.0));
            chunk.emit_op(Opcode::SetPointerNoPush, 1);
            constant(chunk, Value::string("target"));
            chunk.emit_op(Opcode::Pop, 1);
            chunk.emit_op(Opcode::False, 1);
            chunk.emit_op(Opcode::True, 1);
            chunk.emit_op(Opcode::Return, 1);
        })
        .expect("runs");
        assert_eq!(vm.stack(), &[Value::Bool(true)]);
    }

    #[test]
    fn alias_cycles_are_refused() {
        let mut vm = Vm::default();
        let error = run_chunk(&mut vm, |chunk| {
            constant(chunk, Value::string("a"));
            constant(chunk, Value::Number(1.0));
            chunk.emit_op(Opcode::SetPointerNoPush, 1);
            constant(chunk, Value::string("a"));
            constant(chunk, Value::string("a"));
            chunk.emit_op(Opcode::SetPointerNoPush, 1);
            chunk.emit_op(Opcode::Return, 1);
        })
        .expect_err("self alias");
        assert_eq!(error.kind, RuntimeErrorKind::AliasCycle("a".into()));
    }

    #[test]
    fn stored_pointers_become_boxed() {
        let mut vm = Vm::default();
        vm.execute("'b = 1\n'a = ('b = 2)\n''a = 5").expect("runs");
        assert_eq!(vm.value_of("b"), Some(&Value::Number(5.0)));
        assert!(matches!(vm.value_of("a"), Some(Value::Boxed(_))));
        assert!(vm.symbols.contains_key(&intern("a")));
    }

    #[test]
    fn reset_forgets_bindings() {
        let mut vm = Vm::default();
        vm.execute("'x = 3").expect("runs");
        assert_eq!(vm.value_of("x"), Some(&Value::Number(3.0)));
        vm.reset();
        assert_eq!(vm.value_of("x"), None);
    }
}
