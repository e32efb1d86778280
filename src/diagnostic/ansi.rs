use super::{Diagnostic, SourceMap};

pub struct AnsiRenderer {
    pub use_color: bool,
}

impl AnsiRenderer {
    fn paint(&self, code: &str, s: &str) -> String {
        if self.use_color { format!("\x1b[{code}m{s}\x1b[0m") } else { s.to_string() }
    }

    fn bold(&self, s: &str) -> String {
        self.paint("1", s)
    }

    fn bold_red(&self, s: &str) -> String {
        self.paint("1;31", s)
    }

    fn cyan(&self, s: &str) -> String {
        self.paint("36", s)
    }

    fn dim(&self, s: &str) -> String {
        self.paint("2", s)
    }

    pub fn render(&self, d: &Diagnostic) -> String {
        let mut out = String::new();

        // "error[LOX-C001]: message"
        let head = match d.code {
            Some(code) => format!("error[{code}]"),
            None => "error".to_string(),
        };
        out.push_str(&format!("{}: {}\n", self.bold_red(&head), self.bold(&d.message)));

        if let Some(source) = &d.source {
            let map = SourceMap::new(source);
            match &d.label {
                Some(label) => {
                    let (line, col) = map.lookup(label.span.start);
                    out.push_str(&format!("  {} {}:{}\n", self.cyan("-->"), line, col));
                    let text = map.line_text(source, line);
                    // Spans are in bytes; the marker is measured in chars and
                    // stops at the end of the shown line.
                    let line_start = map.line_start(line).unwrap_or(0);
                    let start = label.span.start.saturating_sub(line_start).min(text.len());
                    let end = label.span.end.saturating_sub(line_start).clamp(start, text.len());
                    let indent = " ".repeat(text.get(..start).map_or(start, |s| s.chars().count()));
                    let width = text.get(start..end).map_or(1, |s| s.chars().count()).max(1);
                    let carets = self.bold_red(&"^".repeat(width));
                    let marker = if label.message.is_empty() {
                        format!("{indent}{carets}")
                    } else {
                        format!("{indent}{carets} {}", self.bold_red(&label.message))
                    };
                    self.snippet(&mut out, text, line, Some(&marker));
                }
                None => {
                    if let Some(line) = d.line {
                        out.push_str(&format!("  {} line {}\n", self.cyan("-->"), line));
                        self.snippet(&mut out, map.line_text(source, line), line, None);
                    }
                }
            }
        } else if let Some(line) = d.line {
            out.push_str(&format!("  {} line {}\n", self.cyan("-->"), line));
        }

        for note in &d.notes {
            out.push_str(&format!("  {} note: {}\n", self.dim("="), note));
        }
        if let Some(suggestion) = &d.suggestion {
            out.push_str(&format!("  {} suggestion: {}\n", self.dim("="), suggestion));
        }

        out
    }

    fn snippet(&self, out: &mut String, text: &str, line: usize, marker: Option<&str>) {
        // Gutter width follows the line number's digit count.
        let gutter = line.to_string().len();
        let pipe = self.cyan("|");
        let pad = " ".repeat(gutter);
        let line_num = self.cyan(&format!("{line:>gutter$}"));

        out.push_str(&format!("{pad} {pipe}\n"));
        out.push_str(&format!("{line_num} {pipe} {text}\n"));
        if let Some(marker) = marker {
            out.push_str(&format!("{pad} {pipe} {marker}\n"));
        }
        out.push_str(&format!("{pad} {pipe}\n"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Span;

    fn make_diag(source: &str, start: usize, end: usize) -> Diagnostic {
        Diagnostic::error("Expect expression.")
            .with_code("LOX-C001")
            .with_span(Span { start, end }, "here")
            .with_source(source.to_string())
            .with_note("operands are numbers or groups")
            .with_suggestion("remove the trailing operator")
    }

    #[test]
    fn render_header_with_code() {
        let r = AnsiRenderer { use_color: false };
        let out = r.render(&make_diag("1 + *", 4, 5));
        assert!(out.starts_with("error[LOX-C001]: Expect expression.\n"), "got:\n{out}");
    }

    #[test]
    fn render_snippet_and_carets() {
        let r = AnsiRenderer { use_color: false };
        let out = r.render(&make_diag("1 + *", 4, 5));
        assert!(out.contains("--> 1:5"), "missing location in:\n{out}");
        assert!(out.contains("1 | 1 + *"), "missing source line in:\n{out}");
        assert!(out.contains("  |     ^ here"), "missing caret in:\n{out}");
    }

    #[test]
    fn render_note_and_suggestion() {
        let r = AnsiRenderer { use_color: false };
        let out = r.render(&make_diag("1 + *", 4, 5));
        assert!(out.contains("note: operands are numbers or groups"), "got:\n{out}");
        assert!(out.contains("suggestion: remove the trailing operator"), "got:\n{out}");
    }

    #[test]
    fn render_line_only_diagnostic() {
        let r = AnsiRenderer { use_color: false };
        let d = Diagnostic::error("stack underflow")
            .with_line(2)
            .with_source("1\n2 + 3".to_string());
        let out = r.render(&d);
        assert!(out.contains("--> line 2"), "got:\n{out}");
        assert!(out.contains("2 | 2 + 3"), "got:\n{out}");
        assert!(!out.contains('^'), "no carets without a span:\n{out}");
    }

    #[test]
    fn render_without_source() {
        let r = AnsiRenderer { use_color: false };
        let out = r.render(&Diagnostic::error("something bad"));
        assert_eq!(out, "error: something bad\n");
    }

    #[test]
    fn caret_length_matches_span() {
        let r = AnsiRenderer { use_color: false };
        let d = Diagnostic::error("bad")
            .with_span(Span { start: 2, end: 5 }, "")
            .with_source("1 abc".to_string());
        let out = r.render(&d);
        assert!(out.contains("^^^"), "expected 3 carets in:\n{out}");
    }

    #[test]
    fn carets_count_chars_not_bytes() {
        let r = AnsiRenderer { use_color: false };
        let d = Diagnostic::error("Unexpected character.")
            .with_span(Span { start: 7, end: 9 }, "")
            .with_source("\"é\" + é".to_string());
        let out = r.render(&d);
        assert!(out.contains("1 | \"é\" + é"), "got:\n{out}");
        assert!(out.contains("  |       ^\n"), "expected one caret under the second é in:\n{out}");
    }

    #[test]
    fn carets_stop_at_end_of_shown_line() {
        let r = AnsiRenderer { use_color: false };
        let source = "\"abc\ndef ghi";
        let d = Diagnostic::error("Unterminated string.")
            .with_span(Span { start: 0, end: source.len() }, "")
            .with_source(source.to_string());
        let out = r.render(&d);
        assert!(out.contains("1 | \"abc\n"), "got:\n{out}");
        assert!(out.contains("  | ^^^^\n"), "expected four carets in:\n{out}");
        assert!(!out.contains("^^^^^"), "caret run longer than the line in:\n{out}");
    }

    #[test]
    fn color_toggle() {
        let d = make_diag("1 + *", 4, 5);
        assert!(AnsiRenderer { use_color: true }.render(&d).contains("\x1b["));
        assert!(!AnsiRenderer { use_color: false }.render(&d).contains("\x1b["));
    }
}
