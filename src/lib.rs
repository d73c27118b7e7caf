// Declare modules publicly so they are part of the library interface
pub mod environment;
pub mod evaluator;
pub mod lexer;
pub mod parser;
pub mod pretty_print;
pub mod primitives;
pub mod source;
pub mod stream;
pub mod types;

// Re-export the types consumers actually touch
pub use environment::{EnvArena, EnvError, EnvId};
pub use evaluator::{Error, EvalError, EvalResult, Interpreter};
pub use lexer::Lexer;
pub use parser::{ParseError, Parser};
pub use source::Span;
pub use stream::CellStream;
pub use types::{Cell, List, Proc, ProcId};

use std::sync::{Mutex, OnceLock};

/// The embedded entry point: evaluates exactly one top-level expression
/// from `input` against a process-global interpreter (created empty on
/// first use) and returns its printed form, or a `Bad expression` message.
///
/// Definitions persist between calls; only the first expression on a line
/// is read, so feed one expression per call.
pub fn expr_str(input: &str) -> String {
    static INTERP: OnceLock<Mutex<Interpreter>> = OnceLock::new();
    let mut interp = INTERP
        .get_or_init(|| Mutex::new(Interpreter::new()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());

    interp.push_source_str(input);
    let result = match interp.read_expr() {
        Ok(expr) => {
            let env = interp.global();
            interp.eval(&expr, env).map_err(Error::Eval)
        }
        Err(e) => Err(Error::Parse(e)),
    };
    // drop this call's source, and anything an include stacked on top of
    // it; a pushed file is only ever read by the driver loop, not here
    interp.pop_all_sources();

    match result {
        Ok(cell) => cell.to_string(),
        Err(e) => format!("Bad expression: {}", e),
    }
}
