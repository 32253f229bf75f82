//! Interactive prompt backed by rustyline.

use anyhow::Context;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tether_core::{InterpretResult, Vm};
use tracing::debug;

pub const PROMPT: &str = "> ";

/// Read lines until end of input, running each as its own program against
/// one persistent VM.
pub fn run(vm: &mut Vm) -> anyhow::Result<()> {
    let mut editor = DefaultEditor::new().context("starting line editor")?;
    loop {
        match editor.readline(PROMPT) {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                let _ = editor.add_history_entry(line.as_str());
                let outcome = vm.interpret(&line);
                if outcome != InterpretResult::Ok {
                    debug!(?outcome, "line failed");
                }
            }
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(error) => return Err(error).context("reading input"),
        }
    }
    Ok(())
}
