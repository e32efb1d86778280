//! loxvm: a bytecode virtual machine for a small Lox-family language.
//!
//! The pipeline is `source -> lexer -> compiler -> Chunk -> Vm`. Each stage is
//! usable on its own; [`Session`] wires them together for the binary.

pub mod chunk;
pub mod compiler;
pub mod debug;
pub mod diagnostic;
pub mod lexer;
pub mod value;
pub mod vm;

use std::io::Write;

use tracing::debug;

pub use chunk::{Chunk, Instruction, OpCode};
pub use compiler::{CompileError, compile};
pub use value::{Printed, Value};
pub use vm::{InterpretResult, RuntimeError, Vm};

use diagnostic::Diagnostic;

/// Process exit codes (sysexits.h).
pub mod exit {
    pub const OK: i32 = 0;
    pub const USAGE: i32 = 64;
    pub const DATA_ERR: i32 = 65;
    pub const SOFTWARE: i32 = 70;
    pub const IO_ERR: i32 = 74;
}

/// Switches collected from the command line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Options {
    /// Log every instruction with the stack before it runs.
    pub trace: bool,
    /// Write the compiled chunk listing before running it.
    pub disassemble: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum LoxError {
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type LoxResult<T> = Result<T, LoxError>;

impl LoxError {
    pub fn exit_code(&self) -> i32 {
        match self {
            LoxError::Compile(_) => exit::DATA_ERR,
            LoxError::Runtime(_) => exit::SOFTWARE,
            LoxError::Io(_) => exit::IO_ERR,
        }
    }

    /// `None` for I/O failures, which are not interpreter outcomes.
    pub fn outcome(&self) -> Option<InterpretResult> {
        match self {
            LoxError::Compile(_) => Some(InterpretResult::CompileError),
            LoxError::Runtime(_) => Some(InterpretResult::RuntimeError),
            LoxError::Io(_) => None,
        }
    }

    pub fn to_diagnostic(&self, source: &str) -> Diagnostic {
        match self {
            LoxError::Compile(e) => Diagnostic::from(e).with_source(source),
            LoxError::Runtime(e) => Diagnostic::from(e).with_source(source),
            LoxError::Io(e) => Diagnostic::error(e.to_string()),
        }
    }
}

/// One VM plus the options it runs under. The REPL keeps a single session
/// alive across lines.
#[derive(Debug, Default)]
pub struct Session {
    vm: Vm,
    options: Options,
}

impl Session {
    pub fn new(options: Options) -> Self {
        Session { vm: Vm::new().with_trace(options.trace), options }
    }

    pub fn vm(&self) -> &Vm {
        &self.vm
    }

    /// Compile and run `source`. The disassembly, when requested, goes to
    /// `listing`; the value left by `OP_RETURN` is returned.
    pub fn run(&mut self, source: &str, listing: &mut dyn Write) -> LoxResult<Option<Value>> {
        let chunk = compile(source)?;
        if self.options.disassemble {
            listing.write_all(debug::disassemble_chunk(&chunk, "code").as_bytes())?;
        }
        let value = self.vm.execute(&chunk)?;
        debug!(?value, "interpreted");
        Ok(value)
    }
}

/// Compile and run `source` in a fresh VM, reporting only the outcome.
pub fn interpret(source: &str) -> InterpretResult {
    match Session::default().run(source, &mut std::io::sink()) {
        Ok(_) => InterpretResult::Ok,
        Err(e) => e.outcome().unwrap_or(InterpretResult::RuntimeError),
    }
}
