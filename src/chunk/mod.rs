//! Bytecode container.
//!
//! A [`Chunk`] stores instructions as raw bytes (`code`), a parallel table of
//! source lines (`lines[i]` is the line that produced `code[i]`), and a
//! constant pool. Storage stays byte-oriented; dispatch and disassembly go
//! through [`Chunk::decode`], which turns the bytes at an offset into a tagged
//! [`Instruction`].
//!
//! # Encoding
//!
//! - Every instruction starts with one [`OpCode`] byte.
//! - `OP_CONSTANT` is followed by one byte: the constant-pool index.
//! - All other opcodes take no operands.
//!
//! The one-byte index caps a chunk at [`MAX_CONSTANTS`] constants.

use crate::value::{Value, ValueArray};

/// Largest constant pool a chunk can address with a one-byte operand.
pub const MAX_CONSTANTS: usize = u8::MAX as usize + 1;

/// Every instruction the VM understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OpCode {
    /// Push a constant. Operand: u8 constant-pool index.
    Constant = 0,
    Add = 1,
    Subtract = 2,
    Multiply = 3,
    Divide = 4,
    Negate = 5,
    /// Stop execution successfully.
    Return = 6,
}

impl OpCode {
    pub fn mnemonic(self) -> &'static str {
        match self {
            OpCode::Constant => "OP_CONSTANT",
            OpCode::Add => "OP_ADD",
            OpCode::Subtract => "OP_SUBTRACT",
            OpCode::Multiply => "OP_MULTIPLY",
            OpCode::Divide => "OP_DIVIDE",
            OpCode::Negate => "OP_NEGATE",
            OpCode::Return => "OP_RETURN",
        }
    }

    /// Number of operand bytes following the opcode byte.
    pub fn operand_width(self) -> usize {
        match self {
            OpCode::Constant => 1,
            _ => 0,
        }
    }
}

impl TryFrom<u8> for OpCode {
    type Error = u8;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        match byte {
            0 => Ok(OpCode::Constant),
            1 => Ok(OpCode::Add),
            2 => Ok(OpCode::Subtract),
            3 => Ok(OpCode::Multiply),
            4 => Ok(OpCode::Divide),
            5 => Ok(OpCode::Negate),
            6 => Ok(OpCode::Return),
            other => Err(other),
        }
    }
}

impl From<OpCode> for u8 {
    fn from(op: OpCode) -> u8 {
        op as u8
    }
}

/// Decoded view of one instruction, operands included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    Constant(u8),
    Add,
    Subtract,
    Multiply,
    Divide,
    Negate,
    Return,
}

impl Instruction {
    pub fn opcode(self) -> OpCode {
        match self {
            Instruction::Constant(_) => OpCode::Constant,
            Instruction::Add => OpCode::Add,
            Instruction::Subtract => OpCode::Subtract,
            Instruction::Multiply => OpCode::Multiply,
            Instruction::Divide => OpCode::Divide,
            Instruction::Negate => OpCode::Negate,
            Instruction::Return => OpCode::Return,
        }
    }

    /// Encoded size in bytes.
    pub fn encoded_len(self) -> usize {
        1 + self.opcode().operand_width()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChunkError {
    #[error("too many constants in one chunk (limit 256)")]
    TooManyConstants,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("unknown opcode {byte} at offset {offset}")]
    UnknownOpcode { byte: u8, offset: usize },
    #[error("{} at offset {offset} is missing its operand", .op.mnemonic())]
    MissingOperand { op: OpCode, offset: usize },
    #[error("offset {offset} is past the end of the chunk")]
    OutOfBounds { offset: usize },
}

/// A unit of compiled bytecode.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Chunk {
    pub code: Vec<u8>,
    pub lines: Vec<usize>,
    pub constants: ValueArray,
}

impl Chunk {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one raw byte produced by source line `line`.
    #[inline]
    pub fn write(&mut self, byte: u8, line: usize) {
        self.code.push(byte);
        self.lines.push(line);
    }

    #[inline]
    pub fn write_op(&mut self, op: OpCode, line: usize) {
        self.write(op.into(), line);
    }

    /// Add `value` to the constant pool and return its index.
    ///
    /// The pool never wraps: once [`MAX_CONSTANTS`] values are stored, further
    /// calls fail and leave the pool untouched.
    pub fn add_constant(&mut self, value: Value) -> Result<u8, ChunkError> {
        if self.constants.len() >= MAX_CONSTANTS {
            return Err(ChunkError::TooManyConstants);
        }
        let idx = self.constants.write(value);
        u8::try_from(idx).map_err(|_| ChunkError::TooManyConstants)
    }

    /// Add `value` to the pool and emit `OP_CONSTANT <index>` for it.
    pub fn write_constant(&mut self, value: Value, line: usize) -> Result<u8, ChunkError> {
        let idx = self.add_constant(value)?;
        self.write_op(OpCode::Constant, line);
        self.write(idx, line);
        Ok(idx)
    }

    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    /// Source line of the byte at `offset`.
    pub fn line(&self, offset: usize) -> Option<usize> {
        self.lines.get(offset).copied()
    }

    /// Decode the instruction starting at `offset`.
    pub fn decode(&self, offset: usize) -> Result<Instruction, DecodeError> {
        let byte = *self
            .code
            .get(offset)
            .ok_or(DecodeError::OutOfBounds { offset })?;
        let op = OpCode::try_from(byte).map_err(|byte| DecodeError::UnknownOpcode { byte, offset })?;
        Ok(match op {
            OpCode::Constant => {
                let idx = *self
                    .code
                    .get(offset + 1)
                    .ok_or(DecodeError::MissingOperand { op, offset })?;
                Instruction::Constant(idx)
            }
            OpCode::Add => Instruction::Add,
            OpCode::Subtract => Instruction::Subtract,
            OpCode::Multiply => Instruction::Multiply,
            OpCode::Divide => Instruction::Divide,
            OpCode::Negate => Instruction::Negate,
            OpCode::Return => Instruction::Return,
        })
    }

    /// Walk the chunk instruction by instruction.
    ///
    /// An undecodable byte is reported once and skipped; a truncated trailing
    /// instruction ends the walk.
    pub fn instructions(&self) -> Instructions<'_> {
        Instructions { chunk: self, offset: 0 }
    }
}

pub struct Instructions<'a> {
    chunk: &'a Chunk,
    offset: usize,
}

impl Iterator for Instructions<'_> {
    type Item = (usize, Result<Instruction, DecodeError>);

    fn next(&mut self) -> Option<Self::Item> {
        if self.offset >= self.chunk.len() {
            return None;
        }
        let offset = self.offset;
        let decoded = self.chunk.decode(offset);
        self.offset = match &decoded {
            Ok(inst) => offset + inst.encoded_len(),
            Err(DecodeError::UnknownOpcode { .. }) => offset + 1,
            Err(_) => self.chunk.len(),
        };
        Some((offset, decoded))
    }
}
