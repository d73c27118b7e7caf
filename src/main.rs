use cellisp::{Cell, Error, Interpreter};
use rustyline::error::ReadlineError;
use rustyline::highlight::MatchingBracketHighlighter;
use rustyline::validate::MatchingBracketValidator;
use rustyline::{Completer, Helper, Highlighter, Hinter, Validator};
use std::process;

#[derive(Completer, Helper, Highlighter, Hinter, Validator)]
struct InputValidator {
    #[rustyline(Validator)]
    brackets: MatchingBracketValidator,
    #[rustyline(Highlighter)]
    highlighter: MatchingBracketHighlighter,
}

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.len() {
        0 => {
            if let Err(e) = repl() {
                eprintln!("Readline Error: {:?}", e);
                process::exit(1);
            }
        }
        1 => run_file(&args[0], false),
        2 => {
            let print_res = matches!(args[1].as_str(), "-p" | "-print");
            run_file(&args[0], print_res);
        }
        _ => {
            eprintln!("too many arguments");
            process::exit(1);
        }
    }
}

/// Evaluates `path` to EOF; results are printed only when `print_res` is
/// set. The first error aborts.
fn run_file(path: &str, print_res: bool) {
    let mut interp = Interpreter::new();
    if let Err(e) = interp.push_source_file(path) {
        eprintln!("Cannot open '{}': {}", path, e);
        process::exit(1);
    }
    let result = interp.run(0, |cell| {
        if print_res && cell != &Cell::End {
            println!("{}", cell);
        }
    });
    if let Err(e) = result {
        eprintln!("Bad expression: {}", e);
        process::exit(1);
    }
}

/// The interactive loop: each submitted line becomes an input source and
/// is drained expression by expression. Brackets are matched before a
/// line is submitted, so expressions may span lines.
fn repl() -> rustyline::Result<()> {
    let mut interp = Interpreter::new();
    let h = InputValidator {
        brackets: MatchingBracketValidator::new(),
        highlighter: MatchingBracketHighlighter::new(),
    };
    let mut rl = rustyline::Editor::new()?;
    rl.set_helper(Some(h));
    // first session has no history yet
    let _ = rl.load_history("cellisp_history.txt");

    loop {
        match rl.readline("> ") {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                rl.add_history_entry(line.as_str())?;
                interp.push_source_str(&line);
                let outcome = interp.run(0, |cell| {
                    if cell != &Cell::End {
                        println!("{}", cell);
                    }
                });
                if let Err(e) = outcome {
                    match e {
                        Error::Parse(parse_err) => parse_err.pretty_print(&line),
                        Error::Eval(eval_err) => eval_err.pretty_print(&line),
                    }
                    // abandon whatever was left of this line (and any
                    // sources an include stacked above it)
                    interp.pop_all_sources();
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("Interrupted. Press Ctrl-D to quit.");
            }
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("Readline Error: {:?}", err);
                break;
            }
        }
    }
    rl.save_history("cellisp_history.txt")
}
