//! Human-readable listings of compiled chunks.

use std::fmt::Write as _;

use super::bytecode::Chunk;
use super::instruction::Opcode;

/// Render every instruction in `chunk`, one per line, with labels interleaved.
pub fn disassemble(chunk: &Chunk) -> String {
    let mut labels: Vec<(&str, usize)> = chunk.labels().collect();
    labels.sort_by(|a, b| a.1.cmp(&b.1).then(a.0.cmp(b.0)));

    let mut out = String::new();
    let mut next_label = labels.iter().peekable();
    let mut offset = 0;
    while offset < chunk.len() {
        while let Some((name, _)) = next_label.next_if(|(_, at)| *at <= offset) {
            let _ = writeln!(out, "{name}:");
        }
        let (text, width) = instruction_at(chunk, offset);
        out.push_str(&text);
        out.push('\n');
        offset += width;
    }
    for (name, _) in next_label {
        let _ = writeln!(out, "{name}:");
    }
    out
}

/// Render the instruction at `offset` and return its width in bytes.
pub fn instruction_at(chunk: &Chunk, offset: usize) -> (String, usize) {
    let code = chunk.code();
    let line = chunk.line_at(offset);
    let prefix = if offset > 0 && chunk.line_at(offset - 1) == line {
        format!("{offset:04}    | ")
    } else {
        format!("{offset:04} {line:4} ")
    };

    let Some(&byte) = code.get(offset) else {
        return (format!("{prefix}<end of chunk>"), 1);
    };
    let Ok(op) = Opcode::try_from(byte) else {
        return (format!("{prefix}Unknown OP {byte}"), 1);
    };
    let Some(&operand) = code.get(offset + 1).filter(|_| op.operand_len() == 1) else {
        return (format!("{prefix}{}", op.name()), 1 + op.operand_len());
    };
    let text = match op {
        Opcode::Constant => {
            let rendered = chunk
                .constants()
                .get(operand as usize)
                .map(|value| format!("{value:?}"))
                .unwrap_or_else(|| "<missing>".to_string());
            format!("{prefix}{:<26} {operand:3} {rendered}", op.name())
        }
        _ => {
            let target = offset + 2 + operand as usize;
            format!("{prefix}{:<26} {operand:3} -> {target:04}", op.name())
        }
    };
    (text, 2)
}
