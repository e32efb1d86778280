use super::{Diagnostic, SourceMap};

/// Render one diagnostic as a single-line JSON object.
pub fn render(d: &Diagnostic) -> String {
    let mut obj = serde_json::json!({
        "severity": "error",
        "message": d.message,
        "notes": d.notes,
    });

    if let Some(code) = d.code {
        obj["code"] = serde_json::Value::String(code.to_string());
    }
    if let Some(line) = d.line {
        obj["line"] = serde_json::Value::from(line);
    }

    if let Some(label) = &d.label {
        let mut l = serde_json::json!({
            "start": label.span.start,
            "end": label.span.end,
            "message": label.message,
        });
        if let Some(source) = &d.source {
            let (line, col) = SourceMap::new(source).lookup(label.span.start);
            l["line"] = serde_json::Value::from(line);
            l["col"] = serde_json::Value::from(col);
        }
        obj["label"] = l;
    }

    if let Some(s) = &d.suggestion {
        obj["suggestion"] = serde_json::Value::String(s.clone());
    }

    serde_json::to_string(&obj).unwrap_or_else(|_| r#"{"severity":"error","message":"internal error serializing diagnostic"}"#.to_string())
}
