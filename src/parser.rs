use crate::lexer::Lexer;
use crate::source::Span;
use crate::types::{Cell, List};
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    /// A nested expression ended without its closing parenthesis.
    RpExpected(Span),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::RpExpected(_) => write!(f, "')' expected"),
        }
    }
}

impl std::error::Error for ParseError {}

pub type ParseResult<T> = Result<T, ParseError>;

/// Reads one parenthesized expression from the lexer and returns its
/// contents as a flat cell sequence; nested expressions become `Expr`
/// cells. The parser borrows the lexer because the evaluator may switch
/// the underlying source between two parses.
pub struct Parser<'a> {
    lexer: &'a mut Lexer,
}

impl<'a> Parser<'a> {
    pub fn new(lexer: &'a mut Lexer) -> Self {
        Parser { lexer }
    }

    /// With `eat_leading`, first consumes tokens up to and including the
    /// opening `(` of the expression (skipping commented lines); at end of
    /// input that token is `End` and the result is empty. The caller can
    /// inspect `lexer.current()` to tell `()` from an exhausted source.
    pub fn parse_expr(&mut self, eat_leading: bool) -> ParseResult<List> {
        if eat_leading {
            while self.lexer.get() == Cell::Comment {
                self.lexer.skip_line();
            }
        }
        let mut res = List::new();
        loop {
            match self.lexer.get() {
                Cell::Lp => {
                    let nested = self.parse_expr(false)?;
                    // the nested call stops on Rp or End; only Rp is legal
                    if self.lexer.current() != &Cell::Rp {
                        return Err(ParseError::RpExpected(self.lexer.span()));
                    }
                    res.push(Cell::Expr(nested));
                }
                Cell::Rp | Cell::End => return Ok(res),
                Cell::Comment => self.lexer.skip_line(),
                cell => res.push(cell),
            }
        }
    }
}
