//! Human-readable listings of chunks and token streams.
//!
//! Output format is fixed so it can be compared against golden text:
//!
//! ```text
//! == code ==
//! 0000    1 OP_CONSTANT         0 '1.2'
//! 0002    | OP_NEGATE
//! 0003    2 OP_RETURN
//! ```

use crate::chunk::{Chunk, DecodeError, Instruction};
use crate::lexer::{Lexer, TokenKind};
use crate::value::{Printed, Value};

/// Render every instruction in `chunk` under a `== name ==` header.
pub fn disassemble_chunk(chunk: &Chunk, name: &str) -> String {
    let mut out = format!("== {name} ==\n");
    let mut offset = 0;
    while offset < chunk.len() {
        offset = disassemble_instruction(chunk, offset, &mut out);
    }
    out
}

/// Render the single instruction at `offset` into `out` and return the
/// offset of the next instruction.
///
/// Malformed bytes are rendered, never trusted: an unknown opcode advances by
/// one byte and a truncated instruction jumps to the end of the chunk.
pub fn disassemble_instruction(chunk: &Chunk, offset: usize, out: &mut String) -> usize {
    if offset >= chunk.len() {
        return offset;
    }

    out.push_str(&format!("{offset:04} "));
    match (chunk.line(offset), offset.checked_sub(1).and_then(|prev| chunk.line(prev))) {
        (Some(line), Some(prev)) if line == prev => out.push_str("   | "),
        (Some(line), _) => out.push_str(&format!("{line:4} ")),
        (None, _) => out.push_str("   ? "),
    }

    match chunk.decode(offset) {
        Ok(Instruction::Constant(idx)) => {
            let name = Instruction::Constant(idx).opcode().mnemonic();
            match chunk.constants.get(idx as usize) {
                Some(value) => out.push_str(&format!("{name:<16} {idx:4} '{}'\n", Printed(value))),
                None => out.push_str(&format!("{name:<16} {idx:4} <no such constant>\n")),
            }
            offset + 2
        }
        Ok(inst) => {
            out.push_str(inst.opcode().mnemonic());
            out.push('\n');
            offset + inst.encoded_len()
        }
        Err(DecodeError::UnknownOpcode { byte, .. }) => {
            out.push_str(&format!("Unknown opcode {byte}\n"));
            offset + 1
        }
        Err(DecodeError::MissingOperand { op, .. }) => {
            out.push_str(&format!("{:<16} <missing operand>\n", op.mnemonic()));
            chunk.len()
        }
        Err(DecodeError::OutOfBounds { .. }) => chunk.len(),
    }
}

/// Render the operand stack as `[ a ][ b ]`, bottom first.
pub fn format_stack(stack: &[Value]) -> String {
    let mut out = String::from("          ");
    for value in stack {
        out.push_str(&format!("[ {} ]", Printed(*value)));
    }
    out
}

/// List every token in `source`, printing the line number once per line.
pub fn dump_tokens(source: &str) -> String {
    let mut out = String::new();
    let mut line = None;
    for token in Lexer::new(source) {
        if line == Some(token.line) {
            out.push_str("   | ");
        } else {
            out.push_str(&format!("{:4} ", token.line));
            line = Some(token.line);
        }
        out.push_str(&format!("{:<13} '{}'\n", token.kind.name(), token.lexeme));
        if token.kind == TokenKind::Eof {
            break;
        }
    }
    out
}
