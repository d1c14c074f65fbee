//! Unification of variable domains.
//!
//! Two restrictions that are not structurally equal may still be compatible
//! when one provably implies the other. Deciding that requires evaluating a
//! formula, which is delegated to a [`TruthOracle`].

use std::fmt::{self, Display, Formatter};

use log::debug;

use crate::error::{Error, Result};
use crate::ir::{call, not, or, Node, Type};

/// Name of the variable used in implication queries.
const PROBE_VAR: &str = "__v";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TruthValue {
    True,
    False,
    Sometimes,
}

impl Display for TruthValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            TruthValue::True => write!(f, "true"),
            TruthValue::False => write!(f, "false"),
            TruthValue::Sometimes => write!(f, "sometimes"),
        }
    }
}

/// Classifies formulas: empty means false, complement-empty means true.
pub trait TruthOracle {
    fn truth_value(&mut self, formula: &Node) -> Result<TruthValue>;
}

fn probe(ty: &Type) -> Option<Node> {
    ty.instantiate(PROBE_VAR).map(|c| call(c.name, c.args))
}

fn is_tautology(ty: &Type, oracle: &mut dyn TruthOracle) -> Result<bool> {
    match probe(ty) {
        Some(f) => Ok(oracle.truth_value(&f)? == TruthValue::True),
        None => Ok(true),
    }
}

/// Whether every value of `a` is a value of `b`.
fn implies(a: &Type, b: &Type, oracle: &mut dyn TruthOracle) -> Result<bool> {
    match (probe(a), probe(b)) {
        (_, None) => Ok(true),
        (None, Some(fb)) => Ok(oracle.truth_value(&fb)? == TruthValue::True),
        (Some(fa), Some(fb)) => Ok(oracle.truth_value(&or(not(fa), fb))? == TruthValue::True),
    }
}

pub fn unify(a: &Type, b: &Type, oracle: &mut dyn TruthOracle) -> Result<Type> {
    let mismatch = || Error::Unification {
        left: a.to_string(),
        right: b.to_string(),
    };

    match (a, b) {
        (Type::Inferred, t) | (t, Type::Inferred) => Ok(t.clone()),
        (Type::Any, Type::Any) => Ok(Type::Any),
        (Type::Any, r @ Type::Restriction(_)) | (r @ Type::Restriction(_), Type::Any) => {
            if is_tautology(r, oracle)? {
                Ok(r.clone())
            } else {
                Err(mismatch())
            }
        }
        (Type::Restriction(x), Type::Restriction(y)) => {
            if x == y {
                return Ok(a.clone());
            }
            let a_in_b = implies(a, b, oracle)?;
            let b_in_a = implies(b, a, oracle)?;
            debug!("unify {} with {}: {} / {}", a, b, a_in_b, b_in_a);
            match (a_in_b, b_in_a) {
                (true, _) => Ok(a.clone()),
                (false, true) => Ok(b.clone()),
                (false, false) => Err(mismatch()),
            }
        }
    }
}
