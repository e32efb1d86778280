use std::io::Write;
use std::process::{Command, Output, Stdio};

fn loxvm() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_loxvm"));
    cmd.env_remove("RUST_LOG").env("NO_COLOR", "1");
    cmd
}

fn script(source: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("create temp file");
    file.write_all(source.as_bytes()).expect("write temp file");
    file
}

fn run_script(source: &str, flags: &[&str]) -> Output {
    let file = script(source);
    loxvm()
        .args(flags)
        .arg(file.path())
        .output()
        .expect("failed to run loxvm")
}

fn run_repl(input: &str) -> Output {
    let mut child = loxvm()
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn loxvm");
    child
        .stdin
        .take()
        .expect("stdin piped")
        .write_all(input.as_bytes())
        .expect("write stdin");
    child.wait_with_output().expect("wait for loxvm")
}

fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).into_owned()
}

fn stderr(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).into_owned()
}

// --- File mode ---

#[test]
fn file_prints_result() {
    let out = run_script("-(1.2 + 3.4) / 5.6", &[]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert_eq!(stdout(&out).trim(), "-0.821429");
}

#[test]
fn file_precedence_and_grouping() {
    let out = run_script("1 + 2 * 3 - (4 - 1)\n", &[]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert_eq!(stdout(&out).trim(), "4");
}

#[test]
fn file_division_by_zero_is_infinite() {
    let out = run_script("1 / 0", &[]);
    assert!(out.status.success());
    assert_eq!(stdout(&out).trim(), "inf");
}

#[test]
fn file_compile_error_exits_65() {
    let out = run_script("1 +\n", &[]);
    assert_eq!(out.status.code(), Some(65));
    assert!(stdout(&out).is_empty());
    let err = stderr(&out);
    assert!(err.contains("error[LOX-C001]: Expect expression."), "got: {err}");
}

#[test]
fn file_lex_error_exits_65() {
    let out = run_script("1 + @", &[]);
    assert_eq!(out.status.code(), Some(65));
    assert!(stderr(&out).contains("LOX-L001"));
}

#[test]
fn missing_file_exits_74() {
    let out = loxvm()
        .arg("/definitely/not/here.lox")
        .output()
        .expect("failed to run loxvm");
    assert_eq!(out.status.code(), Some(74));
    assert!(stderr(&out).contains("Could not open file"), "got: {}", stderr(&out));
}

// --- Usage ---

#[test]
fn unknown_flag_exits_64() {
    let out = loxvm().arg("--bogus").output().expect("failed to run loxvm");
    assert_eq!(out.status.code(), Some(64));
}

#[test]
fn too_many_files_exits_64() {
    let out = loxvm().args(["a.lox", "b.lox"]).output().expect("failed to run loxvm");
    assert_eq!(out.status.code(), Some(64));
}

#[test]
fn help_exits_0() {
    let out = loxvm().arg("--help").output().expect("failed to run loxvm");
    assert!(out.status.success());
    assert!(stdout(&out).contains("--disassemble"));
}

// --- Diagnostics ---

#[test]
fn json_diagnostics() {
    let out = run_script("(1 + 2", &["--json"]);
    assert_eq!(out.status.code(), Some(65));
    let err = stderr(&out);
    let line = err.lines().last().expect("a diagnostic line");
    let v: serde_json::Value = serde_json::from_str(line).expect("valid JSON");
    assert_eq!(v["severity"], "error");
    assert_eq!(v["code"], "LOX-C002");
    assert_eq!(v["message"], "Expect ')' after expression.");
    assert_eq!(v["line"], 1);
}

#[test]
fn explain_known_code() {
    let out = loxvm().args(["--explain", "LOX-C004"]).output().expect("failed to run loxvm");
    assert!(out.status.success());
    assert!(stdout(&out).contains("## LOX-C004"));
}

#[test]
fn explain_unknown_code_exits_64() {
    let out = loxvm().args(["--explain", "LOX-Z999"]).output().expect("failed to run loxvm");
    assert_eq!(out.status.code(), Some(64));
    let err = stderr(&out);
    assert!(err.contains("unknown error code: LOX-Z999"), "got: {err}");
    assert!(err.contains("  LOX-C004  too many constants in one chunk"), "got: {err}");
    assert!(err.contains("  LOX-R002  stack overflow"), "got: {err}");
}

// --- Listings ---

#[test]
fn disassemble_goes_to_stderr() {
    let out = run_script("1 + 2", &["--disassemble"]);
    assert!(out.status.success());
    assert_eq!(stdout(&out).trim(), "3");
    let err = stderr(&out);
    assert!(err.contains("== code =="), "got: {err}");
    assert!(err.contains("0000    1 OP_CONSTANT         0 '1'"), "got: {err}");
    assert!(err.contains("OP_RETURN"), "got: {err}");
}

#[test]
fn trace_logs_each_instruction() {
    let out = run_script("1 + 2", &["--trace"]);
    assert!(out.status.success());
    let err = stderr(&out);
    assert!(err.contains("OP_ADD"), "got: {err}");
    assert!(err.contains("[ 1 ][ 2 ]"), "got: {err}");
}

#[test]
fn tokens_dump() {
    let out = run_script("print 1;\n\"hi\"", &["--tokens"]);
    assert!(out.status.success());
    let dump = stdout(&out);
    assert!(dump.starts_with("   1 PRINT         'print'\n"), "got: {dump}");
    assert!(dump.contains("   | NUMBER        '1'\n"), "got: {dump}");
    assert!(dump.contains("   2 STRING        '\"hi\"'\n"), "got: {dump}");
    assert!(dump.trim_end().ends_with("EOF           ''"), "got: {dump}");
}

#[test]
fn tokens_json() {
    let out = run_script("(1)", &["--tokens", "--json"]);
    assert!(out.status.success());
    let v: serde_json::Value = serde_json::from_str(stdout(&out).trim()).expect("valid JSON");
    let kinds: Vec<&str> = v
        .as_array()
        .expect("array")
        .iter()
        .map(|t| t["kind"].as_str().unwrap())
        .collect();
    assert_eq!(kinds, ["LEFT_PAREN", "NUMBER", "RIGHT_PAREN", "EOF"]);
    assert_eq!(v[1]["lexeme"], "1");
    assert_eq!(v[1]["line"], 1);
}

// --- REPL ---

#[test]
fn repl_evaluates_lines() {
    let out = run_repl("1 + 2\n\n3 * 4\n");
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let text = stdout(&out);
    assert!(text.starts_with("> "), "got: {text}");
    let values: Vec<&str> = text
        .split("> ")
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    assert_eq!(values, ["3", "12"]);
}

#[test]
fn repl_continues_after_errors() {
    let out = run_repl("(1\n2 - 5\n");
    assert!(out.status.success());
    assert!(stderr(&out).contains("LOX-C002"));
    assert!(stdout(&out).contains("-3"));
}
