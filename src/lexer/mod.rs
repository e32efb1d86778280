use logos::Logos;
use serde::Serialize;

/// Why a lexeme could not be classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum LexErrorKind {
    #[default]
    UnexpectedCharacter,
    UnterminatedString,
}

impl LexErrorKind {
    pub fn message(self) -> &'static str {
        match self {
            LexErrorKind::UnexpectedCharacter => "Unexpected character.",
            LexErrorKind::UnterminatedString => "Unterminated string.",
        }
    }
}

fn unterminated(_: &mut logos::Lexer<'_, TokenKind>) -> Result<(), LexErrorKind> {
    Err(LexErrorKind::UnterminatedString)
}

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[logos(error = LexErrorKind)]
#[logos(skip r"[ \t\r\n]+")]
#[logos(skip(r"//[^\n]*", allow_greedy = true))]
pub enum TokenKind {
    // Punctuation
    #[token("(")]
    LeftParen,
    #[token(")")]
    RightParen,
    #[token("{")]
    LeftBrace,
    #[token("}")]
    RightBrace,
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,
    #[token("-")]
    Minus,
    #[token("+")]
    Plus,
    #[token(";")]
    Semicolon,
    #[token("/")]
    Slash,
    #[token("*")]
    Star,

    // One or two character operators
    #[token("!")]
    Bang,
    #[token("!=")]
    BangEqual,
    #[token("=")]
    Equal,
    #[token("==")]
    EqualEqual,
    #[token("<")]
    Less,
    #[token("<=")]
    LessEqual,
    #[token(">")]
    Greater,
    #[token(">=")]
    GreaterEqual,

    // Literals. Strings may span lines; a string missing its closing quote
    // runs to end of input and becomes an error token.
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Identifier,
    #[regex(r#""[^"]*""#)]
    #[regex(r#""[^"]*"#, unterminated)]
    String,
    #[regex(r"[0-9]+(\.[0-9]+)?")]
    Number,

    // Keywords
    #[token("and")]
    And,
    #[token("class")]
    Class,
    #[token("else")]
    Else,
    #[token("false")]
    False,
    #[token("for")]
    For,
    #[token("fun")]
    Fun,
    #[token("if")]
    If,
    #[token("nil")]
    Nil,
    #[token("or")]
    Or,
    #[token("print")]
    Print,
    #[token("return")]
    Return,
    #[token("super")]
    Super,
    #[token("this")]
    This,
    #[token("true")]
    True,
    #[token("var")]
    Var,
    #[token("while")]
    While,

    // Produced by `Lexer`, never by the pattern set.
    Error,
    Eof,
}

impl TokenKind {
    pub fn name(self) -> &'static str {
        match self {
            TokenKind::LeftParen => "LEFT_PAREN",
            TokenKind::RightParen => "RIGHT_PAREN",
            TokenKind::LeftBrace => "LEFT_BRACE",
            TokenKind::RightBrace => "RIGHT_BRACE",
            TokenKind::Comma => "COMMA",
            TokenKind::Dot => "DOT",
            TokenKind::Minus => "MINUS",
            TokenKind::Plus => "PLUS",
            TokenKind::Semicolon => "SEMICOLON",
            TokenKind::Slash => "SLASH",
            TokenKind::Star => "STAR",
            TokenKind::Bang => "BANG",
            TokenKind::BangEqual => "BANG_EQUAL",
            TokenKind::Equal => "EQUAL",
            TokenKind::EqualEqual => "EQUAL_EQUAL",
            TokenKind::Less => "LESS",
            TokenKind::LessEqual => "LESS_EQUAL",
            TokenKind::Greater => "GREATER",
            TokenKind::GreaterEqual => "GREATER_EQUAL",
            TokenKind::Identifier => "IDENTIFIER",
            TokenKind::String => "STRING",
            TokenKind::Number => "NUMBER",
            TokenKind::And => "AND",
            TokenKind::Class => "CLASS",
            TokenKind::Else => "ELSE",
            TokenKind::False => "FALSE",
            TokenKind::For => "FOR",
            TokenKind::Fun => "FUN",
            TokenKind::If => "IF",
            TokenKind::Nil => "NIL",
            TokenKind::Or => "OR",
            TokenKind::Print => "PRINT",
            TokenKind::Return => "RETURN",
            TokenKind::Super => "SUPER",
            TokenKind::This => "THIS",
            TokenKind::True => "TRUE",
            TokenKind::Var => "VAR",
            TokenKind::While => "WHILE",
            TokenKind::Error => "ERROR",
            TokenKind::Eof => "EOF",
        }
    }
}

/// Byte range within source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl From<std::ops::Range<usize>> for Span {
    fn from(r: std::ops::Range<usize>) -> Self {
        Span { start: r.start, end: r.end }
    }
}

/// A classified slice of source text.
///
/// `lexeme` borrows from the source for every kind except [`TokenKind::Error`],
/// where it holds the diagnostic message and `span` still points at the
/// offending text.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Token<'src> {
    pub kind: TokenKind,
    pub lexeme: &'src str,
    pub span: Span,
    /// 1-based line on which the token begins.
    pub line: usize,
}

impl<'src> Token<'src> {
    pub fn is_error(&self) -> bool {
        self.kind == TokenKind::Error
    }

    /// Message carried by an error token.
    pub fn message(&self) -> Option<&'src str> {
        self.is_error().then_some(self.lexeme)
    }

    pub fn error_kind(&self) -> Option<LexErrorKind> {
        let message = self.message()?;
        [LexErrorKind::UnexpectedCharacter, LexErrorKind::UnterminatedString]
            .into_iter()
            .find(|kind| kind.message() == message)
    }
}

/// On-demand tokenizer over one source buffer.
///
/// Each call to [`Lexer::scan_token`] consumes exactly one token. Once input
/// is exhausted every further call returns an `Eof` token.
pub struct Lexer<'src> {
    source: &'src str,
    inner: logos::Lexer<'src, TokenKind>,
    line: usize,
    /// Newlines before this byte offset are already counted in `line`.
    counted: usize,
    done: bool,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str) -> Self {
        Lexer {
            source,
            inner: TokenKind::lexer(source),
            line: 1,
            counted: 0,
            done: false,
        }
    }

    pub fn scan_token(&mut self) -> Token<'src> {
        let Some(result) = self.inner.next() else {
            let end = self.source.len();
            self.count_lines_to(end);
            return Token {
                kind: TokenKind::Eof,
                lexeme: "",
                span: Span { start: end, end },
                line: self.line,
            };
        };

        let span = Span::from(self.inner.span());
        self.count_lines_to(span.start);
        let line = self.line;
        // Strings may contain newlines; later tokens must see them counted.
        self.count_lines_to(span.end);

        match result {
            Ok(kind) => Token { kind, lexeme: self.inner.slice(), span, line },
            Err(err) => Token { kind: TokenKind::Error, lexeme: err.message(), span, line },
        }
    }

    fn count_lines_to(&mut self, offset: usize) {
        if offset <= self.counted {
            return;
        }
        let newlines = self.source.as_bytes()[self.counted..offset]
            .iter()
            .filter(|&&b| b == b'\n')
            .count();
        self.line += newlines;
        self.counted = offset;
    }
}

/// Yields every token up to and including the first `Eof`.
impl<'src> Iterator for Lexer<'src> {
    type Item = Token<'src>;

    fn next(&mut self) -> Option<Token<'src>> {
        if self.done {
            return None;
        }
        let token = self.scan_token();
        self.done = token.kind == TokenKind::Eof;
        Some(token)
    }
}

/// Tokenize a whole buffer eagerly. Handy for tests and `--tokens`.
pub fn lex(source: &str) -> Vec<Token<'_>> {
    Lexer::new(source).collect()
}
