use crate::source::Span;
use crate::stream::CellStream;
use crate::types::Cell;
use std::io::{self, BufRead};

/// Word-shaped tokens with a reserved meaning. Anything else that starts
/// with a letter is an ordinary `Name`.
fn keyword(token: &str) -> Option<Cell> {
    let cell = match token {
        "define" => Cell::Define,
        "lambda" => Cell::Lambda,
        "cond" => Cell::Cond,
        "cons" => Cell::Cons,
        "car" => Cell::Car,
        "cdr" => Cell::Cdr,
        "list" => Cell::List,
        "else" => Cell::Else,
        "empty?" => Cell::Empty,
        "and" => Cell::And,
        "or" => Cell::Or,
        "not" => Cell::Not,
        "cat" => Cell::Cat,
        "include" => Cell::Include,
        "begin" => Cell::Begin,
        "let" => Cell::Let,
        _ => return None,
    };
    Some(cell)
}

/// Produces one `Cell` per `get` call from the active input source.
///
/// The lexer owns the source stack because `include` switches it from
/// inside an evaluation, between two of the parser's `get` calls.
pub struct Lexer {
    stream: CellStream,
    current: Cell,
    span: Span,
}

impl Lexer {
    pub fn new(stream: CellStream) -> Self {
        Lexer {
            stream,
            current: Cell::End,
            span: Span::default(),
        }
    }

    /// The most recently read token.
    pub fn current(&self) -> &Cell {
        &self.current
    }

    /// Byte range of the most recently read token in the active source.
    pub fn span(&self) -> Span {
        self.span
    }

    pub fn depth(&self) -> usize {
        self.stream.depth()
    }

    pub fn at_eof(&self) -> bool {
        self.stream.eof()
    }

    pub fn push_str(&mut self, text: &str) {
        self.stream.push_str(text);
    }

    pub fn push_reader(&mut self, reader: Box<dyn BufRead + Send>) {
        self.stream.push_reader(reader);
    }

    pub fn push_file(&mut self, path: &str) -> io::Result<()> {
        self.stream.push_file(path)
    }

    pub fn pop_source(&mut self) -> bool {
        self.stream.pop()
    }

    /// Discards the rest of the current line (after a `;` comment token).
    pub fn skip_line(&mut self) {
        self.stream.skip_line();
    }

    /// Reads the next token. At end of the active source this returns
    /// `End`; the driver decides whether to pop to the previous source.
    pub fn get(&mut self) -> Cell {
        let c = loop {
            match self.stream.getc() {
                Some(c) if c.is_whitespace() => continue,
                Some(c) => break c,
                None => {
                    self.current = Cell::End;
                    self.span = Span::new(self.stream.pos(), self.stream.pos());
                    return self.current.clone();
                }
            }
        };

        let start = self.stream.pos() - c.len_utf8();
        let cell = match c {
            '!' => Cell::Not,
            '&' => Cell::And,
            '\'' => Cell::Quote,
            '(' => Cell::Lp,
            ')' => Cell::Rp,
            '*' => Cell::Mul,
            '+' => Cell::Add,
            '-' => Cell::Sub,
            ';' => Cell::Comment,
            '/' => Cell::Div,
            '<' => Cell::Less,
            '=' => Cell::Equal,
            '>' => Cell::Greater,
            '|' => Cell::Or,
            '0'..='9' => {
                self.stream.putback(c);
                Cell::Number(self.read_number())
            }
            '"' => Cell::Name(self.read_string()),
            _ => {
                self.stream.putback(c);
                let token = self.read_token();
                if c.is_alphabetic() {
                    keyword(&token).unwrap_or(Cell::Name(token))
                } else {
                    Cell::Name(token)
                }
            }
        };
        self.span = Span::new(start, self.stream.pos());
        self.current = cell;
        self.current.clone()
    }

    /// Reads a whitespace-delimited token, then puts back any trailing `)`
    /// characters so adjacent parens close properly (`foo))` is `foo` and
    /// two `Rp` tokens).
    fn read_token(&mut self) -> String {
        let mut token = String::new();
        while let Some(c) = self.stream.getc() {
            if c.is_whitespace() {
                break;
            }
            token.push(c);
        }
        while token.ends_with(')') {
            token.pop();
            self.stream.putback(')');
        }
        token
    }

    /// Reads a float literal: digits, an optional fraction, an optional
    /// exponent. The grammar only consumes what `f64` can parse.
    fn read_number(&mut self) -> f64 {
        let mut literal = String::new();
        self.read_digits(&mut literal);
        if let Some(c) = self.stream.getc() {
            if c == '.' {
                literal.push(c);
                self.read_digits(&mut literal);
            } else {
                self.stream.putback(c);
            }
        }
        if let Some(e) = self.stream.getc() {
            if e == 'e' || e == 'E' {
                match self.stream.getc() {
                    Some(next) if next.is_ascii_digit() => {
                        literal.push(e);
                        literal.push(next);
                        self.read_digits(&mut literal);
                    }
                    Some(sign) if sign == '+' || sign == '-' => match self.stream.getc() {
                        Some(digit) if digit.is_ascii_digit() => {
                            literal.push(e);
                            literal.push(sign);
                            literal.push(digit);
                            self.read_digits(&mut literal);
                        }
                        other => {
                            if let Some(o) = other {
                                self.stream.putback(o);
                            }
                            self.stream.putback(sign);
                            self.stream.putback(e);
                        }
                    },
                    other => {
                        if let Some(o) = other {
                            self.stream.putback(o);
                        }
                        self.stream.putback(e);
                    }
                }
            } else {
                self.stream.putback(e);
            }
        }
        literal.parse().expect("digit-led literal is a valid float")
    }

    fn read_digits(&mut self, into: &mut String) {
        while let Some(c) = self.stream.getc() {
            if c.is_ascii_digit() {
                into.push(c);
            } else {
                self.stream.putback(c);
                break;
            }
        }
    }

    /// Reads a double-quoted literal; the quotes are not part of the
    /// payload. An unterminated literal ends at EOF.
    fn read_string(&mut self) -> String {
        let mut contents = String::new();
        while let Some(c) = self.stream.getc() {
            if c == '"' {
                break;
            }
            contents.push(c);
        }
        contents
    }
}
