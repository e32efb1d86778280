//! Single-pass compiler from arithmetic expressions to a [`Chunk`].
//!
//! Grammar, lowest precedence first:
//!
//! ```text
//! expression := term
//! term       := factor ( ("+" | "-") factor )*
//! factor     := unary  ( ("*" | "/") unary )*
//! unary      := "-" unary | primary
//! primary    := NUMBER | "(" expression ")"
//! ```
//!
//! A source unit is one expression followed by end of input. Code is emitted
//! while parsing (Pratt style); the first error aborts compilation and no
//! chunk is returned.

use std::fmt;

use tracing::debug;

use crate::chunk::{Chunk, OpCode};
use crate::lexer::{LexErrorKind, Lexer, Span, Token, TokenKind};

/// Deepest allowed recursion of `parse_precedence`.
const MAX_DEPTH: usize = 200;

/// Where a compile error points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    /// At a token, quoting its text.
    Lexeme(String),
    /// At end of input.
    End,
    /// Lex errors carry their own position.
    Unlocated,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Lexeme(text) => write!(f, " at '{text}'"),
            Location::End => f.write_str(" at end"),
            Location::Unlocated => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("[line {line}] Error{location}: {message}")]
pub struct CompileError {
    pub code: &'static str,
    pub message: String,
    pub line: usize,
    pub span: Span,
    pub location: Location,
}

type Result<T> = std::result::Result<T, CompileError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Precedence {
    None,
    Term,
    Factor,
    Unary,
}

impl Precedence {
    fn next(self) -> Precedence {
        match self {
            Precedence::None => Precedence::Term,
            Precedence::Term => Precedence::Factor,
            Precedence::Factor | Precedence::Unary => Precedence::Unary,
        }
    }

    fn of_infix(kind: TokenKind) -> Precedence {
        match kind {
            TokenKind::Plus | TokenKind::Minus => Precedence::Term,
            TokenKind::Star | TokenKind::Slash => Precedence::Factor,
            _ => Precedence::None,
        }
    }
}

struct Parser<'src> {
    lexer: Lexer<'src>,
    current: Token<'src>,
    previous: Token<'src>,
    chunk: Chunk,
    depth: usize,
}

/// Compile `source` into a chunk ending in `OP_RETURN`.
pub fn compile(source: &str) -> Result<Chunk> {
    let mut lexer = Lexer::new(source);
    let first = lexer.scan_token();
    let mut parser = Parser { lexer, current: first, previous: first, chunk: Chunk::new(), depth: 0 };
    parser.check_lex_error()?;

    parser.expression()?;
    parser.consume(TokenKind::Eof, "LOX-C003", "Expect end of expression.")?;
    parser.emit_op(OpCode::Return, parser.previous.line);

    debug!(bytes = parser.chunk.len(), constants = parser.chunk.constants.len(), "compiled");
    Ok(parser.chunk)
}

impl<'src> Parser<'src> {
    fn advance(&mut self) -> Result<()> {
        self.previous = self.current;
        self.current = self.lexer.scan_token();
        self.check_lex_error()
    }

    fn check_lex_error(&self) -> Result<()> {
        match self.current.error_kind() {
            None if !self.current.is_error() => Ok(()),
            kind => {
                let code = match kind {
                    Some(LexErrorKind::UnterminatedString) => "LOX-L002",
                    _ => "LOX-L001",
                };
                Err(CompileError {
                    code,
                    message: self.current.lexeme.to_string(),
                    line: self.current.line,
                    span: self.current.span,
                    location: Location::Unlocated,
                })
            }
        }
    }

    fn consume(&mut self, kind: TokenKind, code: &'static str, message: &str) -> Result<()> {
        if self.current.kind == kind {
            // Never advance past Eof: the lexer would just hand it back again.
            if kind == TokenKind::Eof {
                self.previous = self.current;
                return Ok(());
            }
            return self.advance();
        }
        Err(error_at(&self.current, code, message))
    }

    fn expression(&mut self) -> Result<()> {
        self.parse_precedence(Precedence::Term)
    }

    fn parse_precedence(&mut self, precedence: Precedence) -> Result<()> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(error_at(&self.current, "LOX-C005", "Expression nests too deeply."));
        }

        self.advance()?;
        match self.previous.kind {
            TokenKind::Number => self.number()?,
            TokenKind::LeftParen => self.grouping()?,
            TokenKind::Minus => self.unary()?,
            _ => return Err(error_at(&self.previous, "LOX-C001", "Expect expression.")),
        }

        while precedence <= Precedence::of_infix(self.current.kind) {
            self.advance()?;
            self.binary()?;
        }

        self.depth -= 1;
        Ok(())
    }

    fn number(&mut self) -> Result<()> {
        let token = self.previous;
        let value: f64 = token
            .lexeme
            .parse()
            .map_err(|_| error_at(&token, "LOX-C001", "Invalid number literal."))?;
        self.chunk
            .write_constant(value, token.line)
            .map_err(|_| error_at(&token, "LOX-C004", "Too many constants in one chunk."))?;
        Ok(())
    }

    fn grouping(&mut self) -> Result<()> {
        self.expression()?;
        self.consume(TokenKind::RightParen, "LOX-C002", "Expect ')' after expression.")
    }

    fn unary(&mut self) -> Result<()> {
        let line = self.previous.line;
        self.parse_precedence(Precedence::Unary)?;
        self.emit_op(OpCode::Negate, line);
        Ok(())
    }

    fn binary(&mut self) -> Result<()> {
        let operator = self.previous;
        // Left-associative: the right operand binds one level tighter.
        self.parse_precedence(Precedence::of_infix(operator.kind).next())?;
        let op = match operator.kind {
            TokenKind::Plus => OpCode::Add,
            TokenKind::Minus => OpCode::Subtract,
            TokenKind::Star => OpCode::Multiply,
            TokenKind::Slash => OpCode::Divide,
            _ => return Err(error_at(&operator, "LOX-C001", "Expect expression.")),
        };
        self.emit_op(op, operator.line);
        Ok(())
    }

    fn emit_op(&mut self, op: OpCode, line: usize) {
        self.chunk.write_op(op, line);
    }
}

fn error_at(token: &Token<'_>, code: &'static str, message: &str) -> CompileError {
    let location = match token.kind {
        TokenKind::Eof => Location::End,
        TokenKind::Error => Location::Unlocated,
        _ => Location::Lexeme(token.lexeme.to_string()),
    };
    CompileError {
        code,
        message: message.to_string(),
        line: token.line,
        span: token.span,
        location,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::Instruction;
    use crate::vm::Vm;

    fn run(source: &str) -> f64 {
        let chunk = compile(source).unwrap();
        Vm::new().execute(&chunk).unwrap().unwrap()
    }

    fn ops(source: &str) -> Vec<Instruction> {
        let chunk = compile(source).unwrap();
        chunk.instructions().map(|(_, i)| i.unwrap()).collect()
    }

    #[test]
    fn compile_single_number() {
        assert_eq!(ops("42"), vec![Instruction::Constant(0), Instruction::Return]);
        assert_eq!(run("42"), 42.0);
    }

    #[test]
    fn factor_binds_tighter_than_term() {
        assert_eq!(
            ops("1 + 2 * 3"),
            vec![
                Instruction::Constant(0),
                Instruction::Constant(1),
                Instruction::Constant(2),
                Instruction::Multiply,
                Instruction::Add,
                Instruction::Return,
            ]
        );
        assert_eq!(run("1 + 2 * 3"), 7.0);
    }

    #[test]
    fn operators_are_left_associative() {
        assert_eq!(run("10 - 4 - 3"), 3.0);
        assert_eq!(run("64 / 4 / 2"), 8.0);
    }

    #[test]
    fn grouping_and_negation() {
        assert_eq!(run("(1 + 2) * 3"), 9.0);
        assert_eq!(run("--5"), 5.0);
        assert_eq!(run("-(1.2 + 3.4) / 5.6"), -(1.2 + 3.4) / 5.6);
    }

    #[test]
    fn division_by_zero_compiles_and_runs() {
        assert_eq!(run("1 / 0"), f64::INFINITY);
    }

    #[test]
    fn lines_follow_the_source() {
        let chunk = compile("1 +\n2").unwrap();
        // OP_CONSTANT 0 on line 1, OP_CONSTANT 1 on line 2, OP_ADD from the
        // operator on line 1, OP_RETURN at end of input on line 2.
        assert_eq!(chunk.lines, vec![1, 1, 2, 2, 1, 2]);
    }

    #[test]
    fn comments_are_ignored() {
        assert_eq!(run("2 * 3 // six\n"), 6.0);
    }

    #[test]
    fn missing_operand_is_reported_at_end() {
        let err = compile("1 +").unwrap_err();
        assert_eq!(err.code, "LOX-C001");
        assert_eq!(err.location, Location::End);
        assert_eq!(err.to_string(), "[line 1] Error at end: Expect expression.");
    }

    #[test]
    fn unclosed_group() {
        let err = compile("(1 + 2").unwrap_err();
        assert_eq!(err.code, "LOX-C002");
        assert_eq!(err.message, "Expect ')' after expression.");
    }

    #[test]
    fn trailing_input() {
        let err = compile("1 2").unwrap_err();
        assert_eq!(err.code, "LOX-C003");
        assert_eq!(err.to_string(), "[line 1] Error at '2': Expect end of expression.");
    }

    #[test]
    fn unsupported_tokens_are_errors() {
        let err = compile("print 1").unwrap_err();
        assert_eq!(err.location, Location::Lexeme("print".to_string()));
        assert!(compile("1 == 1").is_err());
        assert!(compile("\"str\"").is_err());
        assert!(compile("").is_err());
    }

    #[test]
    fn lex_errors_become_compile_errors() {
        let err = compile("1 + @").unwrap_err();
        assert_eq!(err.code, "LOX-L001");
        assert_eq!(err.to_string(), "[line 1] Error: Unexpected character.");

        let err = compile("\"abc").unwrap_err();
        assert_eq!(err.code, "LOX-L002");
        assert_eq!(err.message, "Unterminated string.");
    }

    #[test]
    fn too_many_constants() {
        let source = vec!["1"; 256].join(" + ");
        assert!(compile(&source).is_ok());

        let source = vec!["1"; 257].join(" + ");
        let err = compile(&source).unwrap_err();
        assert_eq!(err.code, "LOX-C004");
        assert_eq!(err.message, "Too many constants in one chunk.");
    }

    #[test]
    fn deep_nesting_is_rejected() {
        let source = format!("{}1{}", "(".repeat(2000), ")".repeat(2000));
        let err = compile(&source).unwrap_err();
        assert_eq!(err.code, "LOX-C005");
    }
}
