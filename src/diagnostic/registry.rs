/// An entry in the error code registry.
pub struct ErrorEntry {
    pub code: &'static str,
    pub short: &'static str,  // one line, for listings
    pub long: &'static str,   // full explanation for --explain
}

/// All stable error codes.
pub static REGISTRY: &[ErrorEntry] = &[
    // ── Lexer ────────────────────────────────────────────────────────────────
    ErrorEntry {
        code: "LOX-L001",
        short: "unexpected character",
        long: r#"## LOX-L001: unexpected character

A character was found that starts no token.

**Example:**

    1 + @

Only digits, letters, `_`, `"` and the operators
`( ) { } , . - + ; / * ! != = == < <= > >=` can start a token.
"#,
    },
    ErrorEntry {
        code: "LOX-L002",
        short: "unterminated string",
        long: r#"## LOX-L002: unterminated string

A string literal was opened with `"` but input ended before the closing
quote. Strings may span lines, so a missing quote swallows everything after
it. The error is reported on the line where the string starts.

**Example:**

    "abc
"#,
    },

    // ── Compiler ─────────────────────────────────────────────────────────────
    ErrorEntry {
        code: "LOX-C001",
        short: "expected an expression",
        long: r#"## LOX-C001: expected an expression

An operand was required but the next token cannot start an expression.
Expressions are numbers, `-` followed by an expression, or a parenthesized
expression.

**Example:**

    1 +
"#,
    },
    ErrorEntry {
        code: "LOX-C002",
        short: "unclosed parenthesis",
        long: r#"## LOX-C002: unclosed parenthesis

A `(` was not matched by a `)` before the expression ended.

**Example:**

    (1 + 2
"#,
    },
    ErrorEntry {
        code: "LOX-C003",
        short: "trailing input after expression",
        long: r#"## LOX-C003: trailing input after expression

A source unit is exactly one expression. Anything after it is rejected.

**Example:**

    1 2
"#,
    },
    ErrorEntry {
        code: "LOX-C004",
        short: "too many constants in one chunk",
        long: r#"## LOX-C004: too many constants in one chunk

`OP_CONSTANT` addresses the constant pool with a single byte, so one chunk
holds at most 256 constants. Every number literal takes a slot; the 257th
literal is rejected rather than wrapping around to index 0.
"#,
    },
    ErrorEntry {
        code: "LOX-C005",
        short: "expression nests too deeply",
        long: r#"## LOX-C005: expression nests too deeply

Parentheses, operators and unary minus together may nest at most 200
levels deep.
"#,
    },

    // ── Runtime ──────────────────────────────────────────────────────────────
    ErrorEntry {
        code: "LOX-R001",
        short: "stack underflow",
        long: r#"## LOX-R001: stack underflow

An instruction popped more operands than were on the stack. Compiled
expressions never do this; hand-built chunks can.
"#,
    },
    ErrorEntry {
        code: "LOX-R002",
        short: "stack overflow",
        long: r#"## LOX-R002: stack overflow

The operand stack holds 256 values. Pushing a 257th aborts execution.
Compiled expressions stay within the limit because every pushed value
comes from its own constant; hand-built chunks can exceed it.
"#,
    },
    ErrorEntry {
        code: "LOX-R003",
        short: "unknown opcode",
        long: r#"## LOX-R003: unknown opcode

The VM fetched a byte that is not a valid opcode. The chunk is corrupt or
was produced by an incompatible compiler.
"#,
    },
    ErrorEntry {
        code: "LOX-R004",
        short: "malformed instruction",
        long: r#"## LOX-R004: malformed instruction

An instruction referenced data that is not there: an `OP_CONSTANT` missing
its operand byte, a constant index past the end of the pool, or code that
ends without `OP_RETURN`.
"#,
    },
];

pub fn lookup(code: &str) -> Option<&'static ErrorEntry> {
    REGISTRY.iter().find(|e| e.code.eq_ignore_ascii_case(code))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_known_code() {
        let e = lookup("LOX-C004").expect("LOX-C004 should be in registry");
        assert_eq!(e.code, "LOX-C004");
        assert!(!e.short.is_empty());
        assert!(e.long.contains("LOX-C004"));
    }

    #[test]
    fn lookup_is_case_insensitive() {
        assert_eq!(lookup("lox-r002").map(|e| e.code), Some("LOX-R002"));
    }

    #[test]
    fn lookup_unknown_returns_none() {
        assert!(lookup("LOX-XXXX").is_none());
        assert!(lookup("").is_none());
    }

    #[test]
    fn all_codes_unique() {
        let mut codes: Vec<&str> = REGISTRY.iter().map(|e| e.code).collect();
        codes.sort_unstable();
        let len_before = codes.len();
        codes.dedup();
        assert_eq!(codes.len(), len_before, "duplicate codes in registry");
    }

    #[test]
    fn long_text_names_its_code() {
        for entry in REGISTRY {
            assert!(entry.long.contains(entry.code), "{} long text missing its code", entry.code);
        }
    }
}
