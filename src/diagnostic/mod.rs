pub mod ansi;
pub mod json;
pub mod registry;
pub mod source_map;

pub use source_map::SourceMap;

use crate::compiler::{CompileError, Location};
use crate::lexer::Span;
use crate::vm::RuntimeError;

#[derive(Debug, Clone)]
pub struct Label {
    pub span: Span,
    pub message: String,
}

/// A user-facing error report, independent of how it is rendered.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub code: Option<&'static str>,
    pub message: String,
    /// 1-based source line, when known.
    pub line: Option<usize>,
    pub label: Option<Label>,
    pub notes: Vec<String>,
    pub suggestion: Option<String>,
    pub source: Option<String>,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>) -> Self {
        Diagnostic {
            code: None,
            message: message.into(),
            line: None,
            label: None,
            notes: Vec::new(),
            suggestion: None,
            source: None,
        }
    }

    pub fn with_code(mut self, code: &'static str) -> Self {
        self.code = Some(code);
        self
    }

    pub fn with_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    pub fn with_span(mut self, span: Span, label: impl Into<String>) -> Self {
        self.label = Some(Label { span, message: label.into() });
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl From<&CompileError> for Diagnostic {
    fn from(e: &CompileError) -> Self {
        let label = match &e.location {
            Location::End => "input ends here".to_string(),
            Location::Lexeme(text) => format!("found '{text}'"),
            Location::Unlocated => "here".to_string(),
        };
        let mut d = Diagnostic::error(&e.message)
            .with_code(e.code)
            .with_line(e.line)
            .with_span(e.span, label);
        match e.code {
            "LOX-L002" => d = d.with_suggestion("add the closing '\"'"),
            "LOX-C002" => d = d.with_suggestion("add ')' to close the group"),
            "LOX-C004" => d = d.with_note("a chunk holds at most 256 constants"),
            _ => {}
        }
        d
    }
}

impl From<&RuntimeError> for Diagnostic {
    fn from(e: &RuntimeError) -> Self {
        Diagnostic::error(e.error.to_string())
            .with_code(e.error.code())
            .with_line(e.line)
            .with_note(format!("while executing the instruction at offset {:04}", e.offset))
    }
}
