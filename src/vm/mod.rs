use tracing::{debug, trace};

use crate::chunk::{Chunk, DecodeError, Instruction};
use crate::debug::{disassemble_instruction, format_stack};
use crate::value::Value;

/// Operand stack capacity.
pub const STACK_MAX: usize = 256;

/// Terminal outcome of one `interpret` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterpretResult {
    Ok,
    CompileError,
    RuntimeError,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VmError {
    #[error("stack underflow")]
    StackUnderflow,
    #[error("stack overflow (more than {} values)", STACK_MAX)]
    StackOverflow,
    #[error("unknown opcode: {op}")]
    UnknownOpcode { op: u8 },
    #[error("{op} is missing its operand")]
    MissingOperand { op: &'static str },
    #[error("constant index {index} out of range")]
    BadConstant { index: u8 },
    #[error("reached end of code without OP_RETURN")]
    MissingReturn,
}

impl VmError {
    /// Stable diagnostic code, see `diagnostic::registry`.
    pub fn code(&self) -> &'static str {
        match self {
            VmError::StackUnderflow => "LOX-R001",
            VmError::StackOverflow => "LOX-R002",
            VmError::UnknownOpcode { .. } => "LOX-R003",
            VmError::MissingOperand { .. } | VmError::BadConstant { .. } | VmError::MissingReturn => {
                "LOX-R004"
            }
        }
    }
}

impl From<DecodeError> for VmError {
    fn from(e: DecodeError) -> Self {
        match e {
            DecodeError::UnknownOpcode { byte, .. } => VmError::UnknownOpcode { op: byte },
            DecodeError::MissingOperand { op, .. } => VmError::MissingOperand { op: op.mnemonic() },
            DecodeError::OutOfBounds { .. } => VmError::MissingReturn,
        }
    }
}

/// A fault that aborted execution, located in the chunk.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{error}\n[line {line}] in script")]
pub struct RuntimeError {
    pub error: VmError,
    /// Offset of the instruction that faulted.
    pub offset: usize,
    pub line: usize,
}

type VmResult<T> = Result<T, VmError>;

/// Stack machine executing one [`Chunk`] at a time.
///
/// The chunk is borrowed only for the duration of a run; the stack is owned
/// and reset at the start of every run.
#[derive(Debug)]
pub struct Vm {
    stack: Vec<Value>,
    ip: usize,
    trace: bool,
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}

impl Vm {
    pub fn new() -> Self {
        Vm { stack: Vec::with_capacity(STACK_MAX), ip: 0, trace: false }
    }

    /// Emit a `trace`-level event with the stack and the instruction before
    /// every dispatch.
    pub fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }

    /// Run `chunk` to completion and classify the outcome.
    pub fn interpret(&mut self, chunk: &Chunk) -> InterpretResult {
        match self.execute(chunk) {
            Ok(_) => InterpretResult::Ok,
            Err(_) => InterpretResult::RuntimeError,
        }
    }

    /// Run `chunk` until `OP_RETURN`, returning the value on top of the stack
    /// at that point (if any).
    pub fn execute(&mut self, chunk: &Chunk) -> Result<Option<Value>, RuntimeError> {
        self.reset_stack();
        self.ip = 0;
        debug!(bytes = chunk.len(), constants = chunk.constants.len(), "executing chunk");

        loop {
            let offset = self.ip;
            if self.trace {
                self.trace_instruction(chunk, offset);
            }
            let inst = chunk
                .decode(offset)
                .map_err(|e| self.fault(chunk, offset, e.into()))?;
            self.ip = offset + inst.encoded_len();

            let step = match inst {
                Instruction::Constant(index) => chunk
                    .constants
                    .get(index as usize)
                    .ok_or(VmError::BadConstant { index })
                    .and_then(|value| self.push(value)),
                Instruction::Add => self.binary_op(|a, b| a + b),
                Instruction::Subtract => self.binary_op(|a, b| a - b),
                Instruction::Multiply => self.binary_op(|a, b| a * b),
                // IEEE-754: x/0 is ±inf, 0/0 is NaN. Not a fault.
                Instruction::Divide => self.binary_op(|a, b| a / b),
                Instruction::Negate => self.pop().and_then(|a| self.push(-a)),
                Instruction::Return => {
                    let result = self.peek();
                    debug!(depth = self.stack.len(), "return");
                    return Ok(result);
                }
            };
            step.map_err(|e| self.fault(chunk, offset, e))?;
        }
    }

    pub fn push(&mut self, value: Value) -> VmResult<()> {
        if self.stack.len() >= STACK_MAX {
            return Err(VmError::StackOverflow);
        }
        self.stack.push(value);
        Ok(())
    }

    pub fn pop(&mut self) -> VmResult<Value> {
        self.stack.pop().ok_or(VmError::StackUnderflow)
    }

    /// Top of the stack without removing it.
    pub fn peek(&self) -> Option<Value> {
        self.stack.last().copied()
    }

    /// Stack contents, bottom first.
    pub fn stack(&self) -> &[Value] {
        &self.stack
    }

    /// Offset of the next instruction to execute.
    pub fn ip(&self) -> usize {
        self.ip
    }

    fn reset_stack(&mut self) {
        self.stack.clear();
    }

    /// Pops the right operand first: the left one was pushed earlier.
    fn binary_op(&mut self, op: impl Fn(Value, Value) -> Value) -> VmResult<()> {
        let b = self.pop()?;
        let a = self.pop()?;
        self.push(op(a, b))
    }

    fn fault(&self, chunk: &Chunk, offset: usize, error: VmError) -> RuntimeError {
        let line = chunk.line(offset).unwrap_or(0);
        debug!(%error, offset, line, "runtime error");
        RuntimeError { error, offset, line }
    }

    fn trace_instruction(&self, chunk: &Chunk, offset: usize) {
        let mut inst = String::new();
        disassemble_instruction(chunk, offset, &mut inst);
        trace!("{}", format_stack(&self.stack));
        trace!("{}", inst.trim_end());
    }
}
