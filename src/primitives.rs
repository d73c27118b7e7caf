use crate::evaluator::{EvalError, EvalResult};
use crate::types::{Cell, List};

/// Dispatches a primitive operator over a fully evaluated argument list.
/// Primitives never touch the environment or the arenas.
pub fn apply_prim(prim: &Cell, args: List) -> EvalResult {
    match prim {
        Cell::Add => fold_numbers(args, "+", |acc, n| acc + n),
        Cell::Sub => fold_numbers(args, "-", |acc, n| acc - n),
        Cell::Mul => fold_numbers(args, "*", |acc, n| acc * n),
        // unchecked division, IEEE semantics
        Cell::Div => fold_numbers(args, "/", |acc, n| acc / n),
        Cell::Cat => fold_strings(args),
        Cell::Less => {
            let (a, b) = two_args(args, "<")?;
            Ok(Cell::from(less(&a, &b, "<")?))
        }
        Cell::Greater => {
            // a > b is b < a
            let (a, b) = two_args(args, ">")?;
            Ok(Cell::from(less(&b, &a, ">")?))
        }
        Cell::Equal => {
            let (a, b) = two_args(args, "=")?;
            Ok(Cell::from(cells_equal(&a, &b)))
        }
        // the first literal False wins, not mere falsiness of the rest
        Cell::And => Ok(args
            .into_iter()
            .find(|arg| arg == &Cell::False)
            .unwrap_or(Cell::True)),
        Cell::Or => Ok(args
            .into_iter()
            .find(|arg| arg == &Cell::True)
            .unwrap_or(Cell::False)),
        Cell::Not => {
            let arg = args.first().ok_or(EvalError::NoArguments)?;
            Ok(Cell::from(arg == &Cell::False))
        }
        // cons is list by another name here; it conventionally takes 2 args
        Cell::Cons | Cell::List => Ok(Cell::Expr(args)),
        Cell::Car => {
            let arg = args.into_iter().next().ok_or(EvalError::NoArguments)?;
            Ok(match arg {
                Cell::Expr(list) => list.into_iter().next().unwrap_or(Cell::Expr(vec![])),
                other => other,
            })
        }
        Cell::Cdr => {
            let arg = args.into_iter().next().ok_or(EvalError::NoArguments)?;
            let mut list = match arg {
                Cell::Expr(list) => list,
                _ => return Ok(Cell::Expr(vec![])),
            };
            Ok(match list.len() {
                0 | 1 => Cell::Expr(vec![]),
                // a two-element list's tail is the element itself
                2 => list.swap_remove(1),
                _ => Cell::Expr(list.split_off(1)),
            })
        }
        Cell::Empty => {
            let arg = args.first().ok_or(EvalError::NoArguments)?;
            Ok(Cell::from(matches!(arg, Cell::Expr(list) if list.is_empty())))
        }
        _ => Err(EvalError::PrimMismatch),
    }
}

/// Structural equality for the `=` primitive: numbers and strings by
/// value, procedures by identity, lists elementwise, markers by kind.
pub fn cells_equal(a: &Cell, b: &Cell) -> bool {
    match (a, b) {
        (Cell::Number(x), Cell::Number(y)) => x == y,
        (Cell::Name(x), Cell::Name(y)) => x == y,
        (Cell::Proc(x), Cell::Proc(y)) => x == y,
        (Cell::Expr(xs), Cell::Expr(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| cells_equal(x, y))
        }
        _ => std::mem::discriminant(a) == std::mem::discriminant(b),
    }
}

/// Numeric order when the first operand is a number, string order when it
/// is a string; anything else is a type error.
fn less(a: &Cell, b: &Cell, op: &'static str) -> EvalResult<bool> {
    match (a, b) {
        (Cell::Number(x), Cell::Number(y)) => Ok(x < y),
        (Cell::Name(x), Cell::Name(y)) => Ok(x < y),
        (Cell::Number(_), other) => Err(EvalError::TypeMismatch {
            op,
            expected: "number",
            found: other.type_name(),
        }),
        (other, _) => Err(EvalError::TypeMismatch {
            op,
            expected: "string",
            found: other.type_name(),
        }),
    }
}

fn two_args(args: List, op: &'static str) -> EvalResult<(Cell, Cell)> {
    let mut args = args.into_iter();
    match (args.next(), args.next()) {
        (Some(a), Some(b)) => Ok((a, b)),
        _ => Err(EvalError::PrimArity { op, expected: 2 }),
    }
}

/// Left fold over floats; a single argument folds to itself.
fn fold_numbers<F: Fn(f64, f64) -> f64>(args: List, op: &'static str, func: F) -> EvalResult {
    let mut args = args.into_iter();
    let mut acc = number_from(args.next().ok_or(EvalError::NoArguments)?, op)?;
    for arg in args {
        acc = func(acc, number_from(arg, op)?);
    }
    Ok(Cell::Number(acc))
}

/// Left fold of string concatenation over `Name` payloads.
fn fold_strings(args: List) -> EvalResult {
    let mut args = args.into_iter();
    let mut acc = string_from(args.next().ok_or(EvalError::NoArguments)?)?;
    for arg in args {
        acc.push_str(&string_from(arg)?);
    }
    Ok(Cell::Name(acc))
}

fn number_from(arg: Cell, op: &'static str) -> EvalResult<f64> {
    match arg {
        Cell::Number(n) => Ok(n),
        other => Err(EvalError::TypeMismatch {
            op,
            expected: "number",
            found: other.type_name(),
        }),
    }
}

fn string_from(arg: Cell) -> EvalResult<String> {
    match arg {
        Cell::Name(s) => Ok(s),
        other => Err(EvalError::TypeMismatch {
            op: "cat",
            expected: "string",
            found: other.type_name(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ProcId;

    fn num(n: f64) -> Cell {
        Cell::Number(n)
    }

    fn name(s: &str) -> Cell {
        Cell::Name(s.to_string())
    }

    fn prim(op: Cell, args: List) -> Cell {
        apply_prim(&op, args).unwrap_or_else(|e| panic!("primitive failed: {}", e))
    }

    #[test]
    fn test_arithmetic_folds() {
        assert_eq!(prim(Cell::Add, vec![num(1.0), num(2.0), num(3.0)]), num(6.0));
        assert_eq!(prim(Cell::Sub, vec![num(10.0), num(3.0), num(2.0)]), num(5.0));
        assert_eq!(prim(Cell::Mul, vec![num(2.0), num(3.0), num(4.0)]), num(24.0));
        assert_eq!(prim(Cell::Div, vec![num(10.0), num(4.0)]), num(2.5));
    }

    #[test]
    fn test_single_argument_folds_to_itself() {
        assert_eq!(prim(Cell::Add, vec![num(5.0)]), num(5.0));
        assert_eq!(prim(Cell::Sub, vec![num(5.0)]), num(5.0));
    }

    #[test]
    fn test_division_by_zero_is_ieee() {
        assert_eq!(
            prim(Cell::Div, vec![num(1.0), num(0.0)]),
            num(f64::INFINITY)
        );
    }

    #[test]
    fn test_arithmetic_type_mismatch() {
        let err = apply_prim(&Cell::Add, vec![num(1.0), name("x")]).unwrap_err();
        assert!(matches!(err, EvalError::TypeMismatch { op: "+", .. }));
    }

    #[test]
    fn test_cat() {
        assert_eq!(
            prim(Cell::Cat, vec![name("foo"), name("bar")]),
            name("foobar")
        );
        assert_eq!(prim(Cell::Cat, vec![name("one")]), name("one"));
        assert!(apply_prim(&Cell::Cat, vec![name("a"), num(1.0)]).is_err());
    }

    #[test]
    fn test_comparisons() {
        assert_eq!(prim(Cell::Less, vec![num(1.0), num(2.0)]), Cell::True);
        assert_eq!(prim(Cell::Less, vec![num(2.0), num(2.0)]), Cell::False);
        assert_eq!(prim(Cell::Greater, vec![num(3.0), num(2.0)]), Cell::True);
        assert_eq!(prim(Cell::Less, vec![name("abc"), name("abd")]), Cell::True);
        assert_eq!(
            prim(Cell::Greater, vec![name("b"), name("a")]),
            Cell::True
        );
        assert!(apply_prim(&Cell::Less, vec![num(1.0), name("x")]).is_err());
        assert!(apply_prim(&Cell::Less, vec![num(1.0)]).is_err());
    }

    #[test]
    fn test_equality() {
        assert_eq!(prim(Cell::Equal, vec![num(1.0), num(1.0)]), Cell::True);
        assert_eq!(prim(Cell::Equal, vec![num(1.0), num(2.0)]), Cell::False);
        assert_eq!(
            prim(Cell::Equal, vec![name("a"), name("a")]),
            Cell::True
        );
        assert_eq!(prim(Cell::Equal, vec![Cell::True, Cell::True]), Cell::True);
        assert_eq!(
            prim(Cell::Equal, vec![Cell::True, Cell::False]),
            Cell::False
        );
        // mixed kinds compare unequal rather than erroring
        assert_eq!(prim(Cell::Equal, vec![num(1.0), name("1")]), Cell::False);
    }

    #[test]
    fn test_equality_lists_elementwise() {
        let l1 = Cell::Expr(vec![num(1.0), name("a")]);
        let l2 = Cell::Expr(vec![num(1.0), name("a")]);
        let l3 = Cell::Expr(vec![num(1.0)]);
        assert_eq!(prim(Cell::Equal, vec![l1.clone(), l2]), Cell::True);
        assert_eq!(prim(Cell::Equal, vec![l1, l3]), Cell::False);
    }

    #[test]
    fn test_equality_procs_by_identity() {
        let p0 = Cell::Proc(ProcId(0));
        let p1 = Cell::Proc(ProcId(1));
        assert_eq!(prim(Cell::Equal, vec![p0.clone(), p0.clone()]), Cell::True);
        assert_eq!(prim(Cell::Equal, vec![p0, p1]), Cell::False);
    }

    #[test]
    fn test_and_or_not() {
        assert_eq!(prim(Cell::And, vec![Cell::True, Cell::True]), Cell::True);
        assert_eq!(
            prim(Cell::And, vec![Cell::True, Cell::False]),
            Cell::False
        );
        // no literal False among truthy non-booleans
        assert_eq!(prim(Cell::And, vec![num(1.0), num(2.0)]), Cell::True);
        assert_eq!(prim(Cell::Or, vec![Cell::False, Cell::True]), Cell::True);
        // or looks for a literal True, so plain numbers do not count
        assert_eq!(prim(Cell::Or, vec![num(1.0), num(2.0)]), Cell::False);
        assert_eq!(prim(Cell::Not, vec![Cell::False]), Cell::True);
        assert_eq!(prim(Cell::Not, vec![num(0.0)]), Cell::False);
    }

    #[test]
    fn test_cons_and_list_collect_args() {
        assert_eq!(
            prim(Cell::Cons, vec![num(1.0), num(2.0)]),
            Cell::Expr(vec![num(1.0), num(2.0)])
        );
        assert_eq!(
            prim(Cell::List, vec![num(1.0), num(2.0), num(3.0)]),
            Cell::Expr(vec![num(1.0), num(2.0), num(3.0)])
        );
        assert_eq!(prim(Cell::List, vec![]), Cell::Expr(vec![]));
    }

    #[test]
    fn test_car() {
        let list = Cell::Expr(vec![num(1.0), num(2.0), num(3.0)]);
        assert_eq!(prim(Cell::Car, vec![list]), num(1.0));
        // a non-list passes through unchanged
        assert_eq!(prim(Cell::Car, vec![num(7.0)]), num(7.0));
        assert_eq!(
            prim(Cell::Car, vec![Cell::Expr(vec![])]),
            Cell::Expr(vec![])
        );
    }

    #[test]
    fn test_cdr() {
        let list = |cells: List| Cell::Expr(cells);
        assert_eq!(
            prim(Cell::Cdr, vec![list(vec![num(1.0), num(2.0), num(3.0)])]),
            list(vec![num(2.0), num(3.0)])
        );
        // the two-element tail unwraps
        assert_eq!(
            prim(Cell::Cdr, vec![list(vec![num(1.0), num(2.0)])]),
            num(2.0)
        );
        assert_eq!(prim(Cell::Cdr, vec![list(vec![num(1.0)])]), list(vec![]));
        assert_eq!(prim(Cell::Cdr, vec![list(vec![])]), list(vec![]));
        assert_eq!(prim(Cell::Cdr, vec![num(5.0)]), list(vec![]));
    }

    #[test]
    fn test_car_cdr_duality() {
        // (cons (car l) (cdr l)) rebuilds any list of length >= 2... almost:
        // a two-element cdr unwraps, so rebuild through the 3+ case
        let l = Cell::Expr(vec![num(1.0), num(2.0), num(3.0)]);
        let car = prim(Cell::Car, vec![l.clone()]);
        let cdr = prim(Cell::Cdr, vec![l.clone()]);
        let Cell::Expr(tail) = cdr else { panic!("cdr of 3-list is a list") };
        let mut rebuilt = vec![car];
        rebuilt.extend(tail);
        assert!(cells_equal(&Cell::Expr(rebuilt), &l));
    }

    #[test]
    fn test_empty_predicate() {
        assert_eq!(prim(Cell::Empty, vec![Cell::Expr(vec![])]), Cell::True);
        assert_eq!(
            prim(Cell::Empty, vec![Cell::Expr(vec![num(1.0)])]),
            Cell::False
        );
        assert_eq!(prim(Cell::Empty, vec![num(1.0)]), Cell::False);
    }

    #[test]
    fn test_unknown_primitive() {
        assert_eq!(
            apply_prim(&Cell::Quote, vec![num(1.0)]),
            Err(EvalError::PrimMismatch)
        );
    }
}
