//=====================================================
// File: lib.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Tether core library interface
// Objective: Export the scanner, compiler, code buffer and virtual machine
//            that make up the Tether toolchain
//=====================================================

pub mod compiler;
pub mod config;
pub mod error;
pub mod memory;
pub mod scanner;
pub mod symbol;
pub mod value;
pub mod vm;

pub use compiler::Compiler;
pub use config::VmConfig;
pub use error::{
    ChunkError, CompileError, Diagnostic, Location, RuntimeError, RuntimeErrorKind, TetherError,
    TetherResult,
};
pub use scanner::{Rewrite, Scanner, Token, TokenKind};
pub use symbol::{intern, Symbol};
pub use value::{CellRef, Value};
pub use vm::{Chunk, InterpretResult, Opcode, Vm};

//=====================================================
// End of file
//=====================================================
