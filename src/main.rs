use std::io::{self, BufRead, IsTerminal, Read, Write};
use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use clap::error::ErrorKind;
use tracing_subscriber::{EnvFilter, fmt};

use loxvm::diagnostic::{Diagnostic, ansi::AnsiRenderer, json, registry};
use loxvm::{LoxError, Options, Printed, Session, debug, exit, lexer};

#[derive(Parser, Debug)]
#[command(name = "loxvm", version)]
#[command(about = "Compile and run expressions on the loxvm bytecode VM")]
struct Args {
    /// Script to run. Starts a REPL when omitted
    file: Option<PathBuf>,

    /// Print the compiled chunk to stderr before running it
    #[arg(long)]
    disassemble: bool,

    /// Log every instruction with the stack contents
    #[arg(long)]
    trace: bool,

    /// Print the token stream and exit
    #[arg(long)]
    tokens: bool,

    /// Emit diagnostics (and --tokens output) as JSON
    #[arg(long)]
    json: bool,

    /// Explain an error code, e.g. LOX-C001
    #[arg(long, value_name = "CODE")]
    explain: Option<String>,
}

fn main() {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            let code = match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => exit::OK,
                _ => exit::USAGE,
            };
            process::exit(code);
        }
    };

    init_logging(args.trace);
    process::exit(run(args));
}

fn init_logging(trace: bool) {
    let filter = if trace {
        EnvFilter::new("loxvm=trace")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn run(args: Args) -> i32 {
    let reporter = Reporter::new(args.json);

    if let Some(code) = &args.explain {
        return match registry::lookup(code) {
            Some(entry) => {
                print!("{}", entry.long);
                exit::OK
            }
            None => {
                eprintln!("unknown error code: {code}\n\nknown codes:");
                for entry in registry::REGISTRY {
                    eprintln!("  {:<10}{}", entry.code, entry.short);
                }
                exit::USAGE
            }
        };
    }

    let options = Options { trace: args.trace, disassemble: args.disassemble };
    let mut session = Session::new(options);

    match (&args.file, args.tokens) {
        (Some(path), tokens) => {
            let source = match std::fs::read_to_string(path) {
                Ok(s) => s,
                Err(e) => {
                    reporter.emit(&open_failed(path, &e));
                    return exit::IO_ERR;
                }
            };
            if tokens {
                return print_tokens(&source, args.json);
            }
            run_file(&mut session, &source, &reporter)
        }
        (None, true) => {
            let mut source = String::new();
            if let Err(e) = io::stdin().read_to_string(&mut source) {
                reporter.emit(&Diagnostic::error(e.to_string()));
                return exit::IO_ERR;
            }
            print_tokens(&source, args.json)
        }
        (None, false) => repl(&mut session, &reporter),
    }
}

fn run_file(session: &mut Session, source: &str, reporter: &Reporter) -> i32 {
    match session.run(source, &mut io::stderr()) {
        Ok(value) => {
            if let Some(value) = value {
                println!("{}", Printed(value));
            }
            exit::OK
        }
        Err(e) => {
            reporter.report(&e, source);
            e.exit_code()
        }
    }
}

fn repl(session: &mut Session, reporter: &Reporter) -> i32 {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut line = String::new();

    loop {
        print!("> ");
        let _ = stdout.flush();

        line.clear();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => {
                println!();
                return exit::OK;
            }
            Ok(_) => {}
            Err(e) => {
                reporter.emit(&Diagnostic::error(e.to_string()));
                return exit::IO_ERR;
            }
        }

        if line.trim().is_empty() {
            continue;
        }

        // Errors are reported and the loop goes on.
        match session.run(&line, &mut io::stderr()) {
            Ok(Some(value)) => println!("{}", Printed(value)),
            Ok(None) => {}
            Err(e) => reporter.report(&e, &line),
        }
    }
}

fn print_tokens(source: &str, as_json: bool) -> i32 {
    if as_json {
        match serde_json::to_string(&lexer::lex(source)) {
            Ok(s) => println!("{s}"),
            Err(e) => {
                eprintln!("failed to serialize tokens: {e}");
                return exit::SOFTWARE;
            }
        }
    } else {
        print!("{}", debug::dump_tokens(source));
    }
    exit::OK
}

fn open_failed(path: &Path, e: &io::Error) -> Diagnostic {
    Diagnostic::error(format!("Could not open file \"{}\".", path.display()))
        .with_note(e.to_string())
}

/// Writes diagnostics to stderr, as ANSI text or JSON lines.
struct Reporter {
    json: bool,
    ansi: AnsiRenderer,
}

impl Reporter {
    fn new(json: bool) -> Self {
        let use_color = std::env::var_os("NO_COLOR").is_none() && io::stderr().is_terminal();
        Reporter { json, ansi: AnsiRenderer { use_color } }
    }

    fn report(&self, e: &LoxError, source: &str) {
        self.emit(&e.to_diagnostic(source));
    }

    fn emit(&self, d: &Diagnostic) {
        if self.json {
            eprintln!("{}", json::render(d));
        } else {
            eprint!("{}", self.ansi.render(d));
        }
    }
}
