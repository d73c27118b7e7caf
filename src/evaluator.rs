use crate::environment::{EnvArena, EnvError, EnvId};
use crate::lexer::Lexer;
use crate::parser::{ParseError, ParseResult, Parser};
use crate::primitives::apply_prim;
use crate::stream::CellStream;
use crate::types::{Cell, List, Proc, ProcId};
use std::fmt;
use std::io::BufRead;
use std::slice;

#[derive(Debug, Clone, PartialEq)]
pub enum EvalError {
    Env(EnvError),
    QuoteArity,
    MalformedLambda,
    MalformedDefine,
    UnfamiliarDefine,
    MalformedLet,
    MalformedCond,
    ElseNotLast,
    MalformedInclude,
    IncludeFailed { path: String, reason: String },
    NoArguments,
    PrimArity { op: &'static str, expected: usize },
    TypeMismatch { op: &'static str, expected: &'static str, found: &'static str },
    UnmatchedEval,
    UnmatchedEvlist,
    PrimMismatch,
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalError::Env(err) => write!(f, "{}", err),
            EvalError::QuoteArity => write!(f, "Quote expects 1 arg"),
            EvalError::MalformedLambda => write!(f, "Malformed lambda expression"),
            EvalError::MalformedDefine => write!(f, "Malformed define expression"),
            EvalError::UnfamiliarDefine => write!(f, "Unfamiliar form to define"),
            EvalError::MalformedLet => {
                write!(f, "Let expects a list of definitions and a body")
            }
            EvalError::MalformedCond => write!(f, "Malformed cond clause"),
            EvalError::ElseNotLast => write!(f, "Else clause not at end of condition"),
            EvalError::MalformedInclude => write!(f, "Include expects a file path"),
            EvalError::IncludeFailed { path, reason } => {
                write!(f, "Include failed for '{}': {}", path, reason)
            }
            EvalError::NoArguments => write!(f, "Primitives take at least one argument"),
            EvalError::PrimArity { op, expected } => {
                write!(f, "Primitive '{}' expects {} arguments", op, expected)
            }
            EvalError::TypeMismatch { op, expected, found } => {
                write!(f, "Primitive '{}' expects {}, got {}", op, expected, found)
            }
            EvalError::UnmatchedEval => write!(f, "Unmatched cell in eval"),
            EvalError::UnmatchedEvlist => write!(f, "Unmatched cell in evlist"),
            EvalError::PrimMismatch => write!(f, "Mismatch in apply_prim"),
        }
    }
}

impl std::error::Error for EvalError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EvalError::Env(err) => Some(err),
            _ => None,
        }
    }
}

impl From<EnvError> for EvalError {
    fn from(err: EnvError) -> Self {
        EvalError::Env(err)
    }
}

pub type EvalResult<T = Cell> = Result<T, EvalError>;

/// A parse or evaluation failure; the REPL reports either kind and moves
/// on, the non-interactive modes abort on the first one.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    Parse(ParseError),
    Eval(EvalError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Parse(err) => write!(f, "{}", err),
            Error::Eval(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for Error {}

impl From<ParseError> for Error {
    fn from(err: ParseError) -> Self {
        Error::Parse(err)
    }
}

impl From<EvalError> for Error {
    fn from(err: EvalError) -> Self {
        Error::Eval(err)
    }
}

/// The interpreter: the source stack (via its lexer), the frame arena and
/// the procedure arena. Everything a program allocates stays alive until
/// the interpreter is dropped, so `ProcId`/`EnvId` handles never dangle.
pub struct Interpreter {
    lexer: Lexer,
    envs: EnvArena,
    procs: Vec<Proc>,
}

impl Interpreter {
    /// An interpreter with no input source; push one before reading.
    pub fn new() -> Self {
        Interpreter {
            lexer: Lexer::new(CellStream::new()),
            envs: EnvArena::new(),
            procs: Vec::new(),
        }
    }

    pub fn global(&self) -> EnvId {
        EnvArena::GLOBAL
    }

    pub fn push_source_str(&mut self, text: &str) {
        self.lexer.push_str(text);
    }

    pub fn push_source_reader(&mut self, reader: Box<dyn BufRead + Send>) {
        self.lexer.push_reader(reader);
    }

    pub fn push_source_file(&mut self, path: &str) -> std::io::Result<()> {
        self.lexer.push_file(path)
    }

    pub fn pop_source(&mut self) -> bool {
        self.lexer.pop_source()
    }

    pub fn pop_all_sources(&mut self) {
        while self.lexer.pop_source() {}
    }

    pub fn source_depth(&self) -> usize {
        self.lexer.depth()
    }

    /// Reads one top-level expression from the active source.
    pub fn read_expr(&mut self) -> ParseResult<List> {
        Parser::new(&mut self.lexer).parse_expr(true)
    }

    /// True when the last `read_expr` found nothing because the active
    /// source is exhausted (as opposed to parsing a literal `()`).
    pub fn at_source_end(&self) -> bool {
        self.lexer.current() == &Cell::End
    }

    /// Reads and evaluates expressions until the source stack drains down
    /// to `floor`, handing each result to `on_result`. Errors abort with
    /// the stack left as-is so the caller can decide how to recover.
    pub fn run<F: FnMut(&Cell)>(&mut self, floor: usize, mut on_result: F) -> Result<(), Error> {
        while self.source_depth() > floor {
            let expr = self.read_expr()?;
            if expr.is_empty() && self.at_source_end() {
                self.pop_source();
                continue;
            }
            let res = self.eval(&expr, EnvArena::GLOBAL)?;
            on_result(&res);
        }
        Ok(())
    }

    /// Evaluates one expression sequence to a single value.
    pub fn eval(&mut self, expr: &[Cell], env: EnvId) -> EvalResult {
        let head = match expr.first() {
            Some(head) => head,
            None => return Ok(Cell::End), // unit
        };
        match head {
            Cell::Number(_) => Ok(head.clone()),
            // ' x yields x unevaluated
            Cell::Quote => expr.get(1).cloned().ok_or(EvalError::QuoteArity),
            Cell::Include => {
                self.include(expr.get(1))?;
                Ok(Cell::Include)
            }
            // (begin a b ... z) evaluates everything, yields z
            Cell::Begin => {
                if expr.len() < 2 {
                    return Ok(Cell::End);
                }
                self.evlist(&expr[1..expr.len() - 1], env)?;
                self.eval(&expr[expr.len() - 1..], env)
            }
            Cell::Lambda => {
                let (params, body) = lambda_parts(expr)?;
                Ok(self.make_proc(params, body, env))
            }
            Cell::Define => self.eval_define(expr, env),
            Cell::Let => self.eval_let(expr, env),
            Cell::Cond => self.eval_cond(&expr[1..], env),
            Cell::Expr(inner) => {
                let value = self.eval_nested(inner, env)?;
                // a parenthesized operator position: apply the procedure
                // to whatever follows, e.g. ((lambda (x) x) 5)
                if let Cell::Proc(id) = value {
                    if expr.len() > 1 {
                        let args = self.collect_args(&expr[1..], env)?;
                        return self.apply(id, args);
                    }
                }
                Ok(value)
            }
            prim if prim.is_primitive() => {
                if expr.len() < 2 {
                    return Err(EvalError::NoArguments);
                }
                let args = self.evlist(&expr[1..], env)?;
                apply_prim(prim, args)
            }
            Cell::Name(name) => {
                // the lexer cannot tell a variable from a procedure name;
                // only the looked-up value decides
                let x = self.envs.lookup(env, name)?;
                match x {
                    Cell::Proc(id) => {
                        let args = self.collect_args(&expr[1..], env)?;
                        self.apply(id, args)
                    }
                    value => Ok(value),
                }
            }
            _ => Err(EvalError::UnmatchedEval),
        }
    }

    /// Evaluates each element of a sequence, yielding the list of values;
    /// used for argument lists and other list-returning positions.
    pub fn evlist(&mut self, expr: &[Cell], env: EnvId) -> EvalResult<List> {
        let mut res = List::new();
        let mut i = 0;
        while i < expr.len() {
            match &expr[i] {
                Cell::Number(_) => res.push(expr[i].clone()),
                Cell::Quote => {
                    i += 1;
                    let quoted = expr.get(i).cloned().ok_or(EvalError::QuoteArity)?;
                    res.push(quoted);
                }
                Cell::Include => {
                    self.include(expr.get(i + 1))?;
                    return Ok(List::new());
                }
                Cell::Begin => {
                    if i + 1 >= expr.len() {
                        res.push(Cell::End);
                        return Ok(res);
                    }
                    self.evlist(&expr[i + 1..expr.len() - 1], env)?;
                    let last = self.eval(&expr[expr.len() - 1..], env)?;
                    res.push(last);
                    return Ok(res);
                }
                Cell::Lambda => {
                    let (params, body) = lambda_parts(&expr[i..])?;
                    let proc = self.make_proc(params, body, env);
                    res.push(proc);
                    i += 2;
                }
                Cell::Define => {
                    res.push(self.eval_define(&expr[i..], env)?);
                    return Ok(res);
                }
                Cell::Expr(inner) => {
                    let value = self.eval_nested(inner, env)?;
                    if let Cell::Proc(id) = value {
                        if i + 1 < expr.len() {
                            let args = self.collect_args(&expr[i + 1..], env)?;
                            res.push(self.apply(id, args)?);
                            return Ok(res);
                        }
                    }
                    res.push(value);
                }
                Cell::Let => {
                    res.push(self.eval_let(&expr[i..], env)?);
                    return Ok(res);
                }
                Cell::Cond => {
                    // a matched clause contributes its value; no match
                    // contributes nothing
                    match self.eval_cond(&expr[i + 1..], env)? {
                        Cell::End => {}
                        value => res.push(value),
                    }
                    return Ok(res);
                }
                prim if prim.is_primitive() => {
                    if i + 1 >= expr.len() {
                        return Err(EvalError::NoArguments);
                    }
                    let args = self.evlist(&expr[i + 1..], env)?;
                    res.push(apply_prim(prim, args)?);
                    return Ok(res);
                }
                Cell::Name(name) => {
                    let x = self.envs.lookup(env, name)?;
                    match x {
                        Cell::Proc(id) => {
                            let args = self.collect_args(&expr[i + 1..], env)?;
                            res.push(self.apply(id, args)?);
                            return Ok(res);
                        }
                        value => res.push(value),
                    }
                }
                _ => return Err(EvalError::UnmatchedEvlist),
            }
            i += 1;
        }
        Ok(res)
    }

    /// Evaluates the payload of an `Expr` cell. A single-element result is
    /// unwrapped so `(5)` is `5` and nested groupings stay transparent.
    fn eval_nested(&mut self, inner: &[Cell], env: EnvId) -> EvalResult {
        let mut res = self.evlist(inner, env)?;
        Ok(if res.len() == 1 {
            res.swap_remove(0)
        } else {
            Cell::Expr(res)
        })
    }

    /// (define name expr) binds the evaluated rest of the sequence;
    /// (define (name params...) (body)) is sugar for a lambda binding.
    /// Either way the bound value is returned.
    fn eval_define(&mut self, expr: &[Cell], env: EnvId) -> EvalResult {
        if expr.len() < 3 {
            return Err(EvalError::MalformedDefine);
        }
        match &expr[1] {
            Cell::Name(name) => {
                let value = self.eval(&expr[2..], env)?;
                self.envs.define(env, name.clone(), value.clone());
                Ok(value)
            }
            Cell::Expr(declaration) => {
                let name = match declaration.first() {
                    Some(Cell::Name(name)) => name.clone(),
                    _ => return Err(EvalError::UnfamiliarDefine),
                };
                let params = declaration[1..].to_vec();
                let body = expr[2]
                    .as_expr()
                    .ok_or(EvalError::MalformedDefine)?
                    .clone();
                let proc = self.make_proc(params, body, env);
                self.envs.define(env, name, proc.clone());
                Ok(proc)
            }
            _ => Err(EvalError::UnfamiliarDefine),
        }
    }

    /// (let ((n1 v1) ... (nk vk)) body): each vi is evaluated in the outer
    /// environment, the ni go into one fresh frame, body runs inside it.
    fn eval_let(&mut self, expr: &[Cell], env: EnvId) -> EvalResult {
        if expr.len() < 3 {
            return Err(EvalError::MalformedLet);
        }
        let bindings = expr[1].as_expr().ok_or(EvalError::MalformedLet)?;
        let local = self.envs.new_frame(env);
        for pair_cell in bindings {
            let pair = pair_cell.as_expr().ok_or(EvalError::MalformedLet)?;
            let name = match pair.first() {
                Some(Cell::Name(name)) => name.clone(),
                _ => return Err(EvalError::MalformedLet),
            };
            let value_expr = pair.get(1).ok_or(EvalError::MalformedLet)?;
            let value = self.eval(slice::from_ref(value_expr), env)?;
            self.envs.define(local, name, value);
        }
        match &expr[2] {
            Cell::Expr(body) => self.eval(body, local),
            other => self.eval(slice::from_ref(other), local),
        }
    }

    /// (cond (p1 e1) ... (else e)): first truthy predicate wins; `else` is
    /// only legal as the last clause; no match yields the unit cell.
    fn eval_cond(&mut self, clauses: &[Cell], env: EnvId) -> EvalResult {
        for (i, clause_cell) in clauses.iter().enumerate() {
            let clause = clause_cell.as_expr().ok_or(EvalError::MalformedCond)?;
            if clause.first() == Some(&Cell::Else) {
                if i + 1 != clauses.len() {
                    return Err(EvalError::ElseNotLast);
                }
                let body = clause.get(1).ok_or(EvalError::MalformedCond)?;
                return self.eval(slice::from_ref(body), env);
            }
            let predicate = clause.first().ok_or(EvalError::MalformedCond)?;
            if self.eval(slice::from_ref(predicate), env)?.is_truthy() {
                let body = clause.get(1).ok_or(EvalError::MalformedCond)?;
                return self.eval(slice::from_ref(body), env);
            }
        }
        Ok(Cell::End)
    }

    /// Argument collection for procedure application: literals, quoted
    /// cells and plain variables are taken directly; the first anything
    /// else hands the whole remainder to `evlist`.
    fn collect_args(&mut self, rest: &[Cell], env: EnvId) -> EvalResult<List> {
        let mut args = List::new();
        let mut i = 0;
        while i < rest.len() {
            match &rest[i] {
                Cell::Number(_) => args.push(rest[i].clone()),
                Cell::Quote => {
                    i += 1;
                    let quoted = rest.get(i).cloned().ok_or(EvalError::QuoteArity)?;
                    args.push(quoted);
                }
                Cell::Name(name) => args.push(self.envs.lookup(env, name)?),
                _ => {
                    let mut remaining = self.evlist(&rest[i..], env)?;
                    args.append(&mut remaining);
                    break;
                }
            }
            i += 1;
        }
        Ok(args)
    }

    /// Applies a procedure to fully evaluated arguments: bind the params
    /// in a frame under the closure environment, evaluate the body there.
    fn apply(&mut self, id: ProcId, args: List) -> EvalResult {
        let (params, body, closure) = {
            let proc = &self.procs[id.0];
            (proc.params.clone(), proc.body.clone(), proc.env)
        };
        let frame = self.envs.extend(closure, &params, args)?;
        self.eval(&body, frame)
    }

    fn make_proc(&mut self, params: List, body: List, env: EnvId) -> Cell {
        let id = ProcId(self.procs.len());
        self.procs.push(Proc { params, body, env });
        Cell::Proc(id)
    }

    fn include(&mut self, path: Option<&Cell>) -> EvalResult<()> {
        let path = match path {
            Some(Cell::Name(path)) => path.clone(),
            _ => return Err(EvalError::MalformedInclude),
        };
        self.lexer
            .push_file(&path)
            .map_err(|err| EvalError::IncludeFailed {
                path,
                reason: err.to_string(),
            })
    }
}

/// (lambda (params) (body)) starting at the `lambda` cell.
fn lambda_parts(expr: &[Cell]) -> EvalResult<(List, List)> {
    let params = expr
        .get(1)
        .and_then(Cell::as_expr)
        .ok_or(EvalError::MalformedLambda)?
        .clone();
    let body = expr
        .get(2)
        .and_then(Cell::as_expr)
        .ok_or(EvalError::MalformedLambda)?
        .clone();
    Ok((params, body))
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}
