pub mod bytecode;
pub mod disasm;
pub mod instruction;
pub mod stack_vm;

pub use bytecode::Chunk;
pub use instruction::Opcode;
pub use stack_vm::{InterpretResult, Vm};
