use crate::types::{Cell, List};
use std::collections::HashMap;
use std::fmt;

/// Handle to a frame in the arena. Frames are appended and never removed,
/// so an id stays valid for the whole run; closures rely on this.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvId(pub usize);

#[derive(Debug, Clone, PartialEq)]
pub enum EnvError {
    UnboundVariable(String),
    ArityMismatch { expected: usize, got: usize },
    InvalidParameter(String),
}

impl fmt::Display for EnvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnvError::UnboundVariable(name) => write!(f, "Unbound variable: '{}'", name),
            EnvError::ArityMismatch { expected, got } => write!(
                f,
                "# of args provided and expected mismatch: expected {}, got {}",
                expected, got
            ),
            EnvError::InvalidParameter(param) => {
                write!(f, "Invalid parameter name: '{}'", param)
            }
        }
    }
}

impl std::error::Error for EnvError {}

#[derive(Debug, Clone)]
struct Frame {
    bindings: HashMap<String, Cell>,
    outer: Option<EnvId>,
}

/// The arena of lexical frames. Lookup walks the outer links; definition
/// touches only the named frame. The global frame is `EnvId(0)` and starts
/// empty (primitive operators are token kinds, not bindings).
#[derive(Debug, Clone)]
pub struct EnvArena {
    frames: Vec<Frame>,
}

impl EnvArena {
    pub const GLOBAL: EnvId = EnvId(0);

    pub fn new() -> Self {
        EnvArena {
            frames: vec![Frame {
                bindings: HashMap::new(),
                outer: None,
            }],
        }
    }

    /// A fresh empty frame whose lookups continue in `outer`; used by `let`.
    pub fn new_frame(&mut self, outer: EnvId) -> EnvId {
        let id = EnvId(self.frames.len());
        self.frames.push(Frame {
            bindings: HashMap::new(),
            outer: Some(outer),
        });
        id
    }

    /// Inserts or overwrites `name` in frame `env` only.
    pub fn define(&mut self, env: EnvId, name: String, value: Cell) {
        self.frames[env.0].bindings.insert(name, value);
    }

    /// Walks outward from `env` to the first frame that binds `name`.
    pub fn lookup(&self, env: EnvId, name: &str) -> Result<Cell, EnvError> {
        let mut current = Some(env);
        while let Some(id) = current {
            let frame = &self.frames[id.0];
            if let Some(cell) = frame.bindings.get(name) {
                return Ok(cell.clone());
            }
            current = frame.outer;
        }
        Err(EnvError::UnboundVariable(name.to_string()))
    }

    /// A new frame under `outer` binding `params` to `args` pairwise; this
    /// is `bind` during procedure application.
    pub fn extend(&mut self, outer: EnvId, params: &[Cell], args: List) -> Result<EnvId, EnvError> {
        if params.len() != args.len() {
            return Err(EnvError::ArityMismatch {
                expected: params.len(),
                got: args.len(),
            });
        }
        let mut bindings = HashMap::new();
        for (param, arg) in params.iter().zip(args) {
            match param {
                Cell::Name(name) => {
                    bindings.insert(name.clone(), arg);
                }
                other => return Err(EnvError::InvalidParameter(other.to_string())),
            }
        }
        let id = EnvId(self.frames.len());
        self.frames.push(Frame {
            bindings,
            outer: Some(outer),
        });
        Ok(id)
    }
}

impl Default for EnvArena {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(n: f64) -> Cell {
        Cell::Number(n)
    }

    fn name(s: &str) -> Cell {
        Cell::Name(s.to_string())
    }

    #[test]
    fn test_define_and_lookup_global() {
        let mut envs = EnvArena::new();
        envs.define(EnvArena::GLOBAL, "x".to_string(), num(10.0));
        assert_eq!(envs.lookup(EnvArena::GLOBAL, "x"), Ok(num(10.0)));
    }

    #[test]
    fn test_lookup_unbound() {
        let envs = EnvArena::new();
        assert_eq!(
            envs.lookup(EnvArena::GLOBAL, "y"),
            Err(EnvError::UnboundVariable("y".to_string()))
        );
    }

    #[test]
    fn test_lookup_walks_outer_chain() {
        let mut envs = EnvArena::new();
        envs.define(EnvArena::GLOBAL, "x".to_string(), num(10.0));
        let local = envs.new_frame(EnvArena::GLOBAL);
        envs.define(local, "y".to_string(), num(20.0));

        assert_eq!(envs.lookup(local, "y"), Ok(num(20.0)));
        assert_eq!(envs.lookup(local, "x"), Ok(num(10.0)));
        // the outer frame does not see inner bindings
        assert!(envs.lookup(EnvArena::GLOBAL, "y").is_err());
    }

    #[test]
    fn test_shadowing() {
        let mut envs = EnvArena::new();
        envs.define(EnvArena::GLOBAL, "x".to_string(), num(10.0));
        let local = envs.new_frame(EnvArena::GLOBAL);
        envs.define(local, "x".to_string(), num(50.0));

        assert_eq!(envs.lookup(local, "x"), Ok(num(50.0)));
        assert_eq!(envs.lookup(EnvArena::GLOBAL, "x"), Ok(num(10.0)));
    }

    #[test]
    fn test_extend_binds_pairwise() {
        let mut envs = EnvArena::new();
        let frame = envs
            .extend(EnvArena::GLOBAL, &[name("a"), name("b")], vec![num(1.0), num(2.0)])
            .unwrap();
        assert_eq!(envs.lookup(frame, "a"), Ok(num(1.0)));
        assert_eq!(envs.lookup(frame, "b"), Ok(num(2.0)));
    }

    #[test]
    fn test_extend_arity_mismatch() {
        let mut envs = EnvArena::new();
        let err = envs
            .extend(EnvArena::GLOBAL, &[name("a"), name("b")], vec![num(1.0)])
            .unwrap_err();
        assert_eq!(err, EnvError::ArityMismatch { expected: 2, got: 1 });
    }

    #[test]
    fn test_extend_rejects_non_name_params() {
        let mut envs = EnvArena::new();
        let err = envs
            .extend(EnvArena::GLOBAL, &[num(1.0)], vec![num(2.0)])
            .unwrap_err();
        assert!(matches!(err, EnvError::InvalidParameter(_)));
    }
}
