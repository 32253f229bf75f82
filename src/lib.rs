//=====================================================
// File: lib.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Tether driver library interface
// Objective: Export configuration loading, logging setup, the REPL and the
//            script runner used by the tether binary
//=====================================================

pub mod config;
pub mod logging;
pub mod repl;

use std::fs;
use std::io;
use std::path::Path;

use tether_core::{CompileError, InterpretResult, Vm};
use tracing::info;

pub use config::{Config, RewriteRule};

/// Exit status when the script cannot be read.
pub const EXIT_IO: u8 = 74;

/// Build a VM from the loaded configuration. `trace` forces instruction
/// tracing on regardless of the file.
pub fn build_vm(config: &Config, trace: bool) -> anyhow::Result<Vm> {
    let mut vm_config = config.vm.clone();
    vm_config.trace |= trace;
    let mut vm = Vm::new(vm_config);
    vm.set_rewrites(config.rewrites()?);
    Ok(vm)
}

/// Read and interpret one script file.
pub fn run_file(vm: &mut Vm, path: &Path) -> io::Result<InterpretResult> {
    let source = fs::read_to_string(path)?;
    info!(path = %path.display(), bytes = source.len(), "running script");
    Ok(vm.interpret(&source))
}

/// Compile `source` and render its listing.
pub fn disassemble(vm: &mut Vm, source: &str) -> Result<String, CompileError> {
    let chunk = vm.compile(source)?;
    Ok(tether_core::vm::disasm::disassemble(&chunk))
}

//=====================================================
// End of file
//=====================================================
