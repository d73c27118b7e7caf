use crate::evaluator::EvalError;
use crate::parser::ParseError;
use ariadne::{Label, Report, ReportKind, Source};

impl ParseError {
    /// Renders the error against the offending input line; used by the
    /// interactive REPL. Non-interactive modes print the plain message.
    pub fn pretty_print(&self, input: &str) {
        let report = match self {
            ParseError::RpExpected(span) => {
                Report::build(ReportKind::Error, ("repl", span.to_range()))
                    .with_message("')' expected")
                    .with_label(
                        Label::new(("repl", span.to_range()))
                            .with_message("This expression is missing its closing parenthesis"),
                    )
            }
        };
        report
            .finish()
            .print(("repl", Source::from(input)))
            .unwrap();
    }
}

impl EvalError {
    /// Evaluation errors arise from runtime values, which carry no source
    /// positions; the report labels the whole line.
    pub fn pretty_print(&self, input: &str) {
        let all = 0..input.len();
        Report::build(ReportKind::Error, ("repl", all.clone()))
            .with_message("Bad expression")
            .with_label(Label::new(("repl", all)).with_message(self.to_string()))
            .finish()
            .print(("repl", Source::from(input)))
            .unwrap();
    }
}
