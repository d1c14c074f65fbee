//! Type-directed resolution of predicate calls.
//!
//! A structural type declaration pairs a restriction pattern such as
//! `Mod(x, n)` with a method table. A call `name(a, b, ...)` is resolved by
//! computing a [`MatchPattern`] for every argument from its type, unifying
//! the patterns left to right, and filling the open slots of the result with
//! the actual arguments.

use std::collections::{BTreeMap, HashMap};

use log::debug;

use crate::error::{Error, Result};
use crate::ir::{Call, Node, NodeKind, Type, SELF_VAR};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchPattern {
    Wildcard,
    /// Target predicate; `None` slots take the actual arguments in order.
    Concrete { name: String, args: Vec<Option<Node>> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDecl {
    /// Restriction pattern; the first argument is the constrained variable,
    /// the remaining variables are parameters bound by matching.
    pub pattern: Call,
    /// Method name to target call; target arguments that name a parameter are
    /// bound from the match, all others are slots for the actual arguments.
    pub methods: BTreeMap<String, Call>,
}

impl TypeDecl {
    pub fn new(pattern: Call) -> Self {
        Self {
            pattern,
            methods: BTreeMap::new(),
        }
    }

    pub fn with_method(mut self, name: impl Into<String>, target: Call) -> Self {
        self.methods.insert(name.into(), target);
        self
    }

    /// Parameter bindings if `restriction` (a canonical restriction call) has this shape.
    fn bind(&self, restriction: &Call) -> Option<HashMap<String, Node>> {
        let var = match self.pattern.args.first().map(|a| &a.kind) {
            Some(NodeKind::Var(v)) => v,
            _ => return None,
        };
        let pattern = match Type::restriction(var, &self.pattern) {
            Ok(Type::Restriction(call)) => call,
            _ => return None,
        };
        if pattern.name != restriction.name || pattern.args.len() != restriction.args.len() {
            return None;
        }

        let mut bindings = HashMap::new();
        for (p, r) in pattern.args.iter().zip(restriction.args.iter()).skip(1) {
            match &p.kind {
                NodeKind::Var(name) if name != SELF_VAR => match bindings.get(name) {
                    Some(bound) if bound != r => return None,
                    Some(_) => {}
                    None => {
                        bindings.insert(name.clone(), r.clone());
                    }
                },
                _ if p.kind == r.kind => {}
                _ => return None,
            }
        }
        Some(bindings)
    }
}

/// Pattern contributed by one argument of type `ty` to a call of `name`.
pub fn pattern_for(name: &str, ty: &Type, decls: &[TypeDecl]) -> MatchPattern {
    let Type::Restriction(restriction) = ty else {
        return MatchPattern::Wildcard;
    };
    for decl in decls {
        let Some(method) = decl.methods.get(name) else {
            continue;
        };
        if let Some(bindings) = decl.bind(restriction) {
            let args = method
                .args
                .iter()
                .map(|a| match &a.kind {
                    NodeKind::Var(v) => bindings.get(v).cloned(),
                    _ => Some(a.clone()),
                })
                .collect();
            return MatchPattern::Concrete {
                name: method.name.clone(),
                args,
            };
        }
    }
    MatchPattern::Wildcard
}

/// Unify two patterns, or explain why they disagree.
pub fn unify_patterns(a: MatchPattern, b: MatchPattern) -> std::result::Result<MatchPattern, String> {
    match (a, b) {
        (MatchPattern::Wildcard, p) | (p, MatchPattern::Wildcard) => Ok(p),
        (
            MatchPattern::Concrete { name: n1, args: a1 },
            MatchPattern::Concrete { name: n2, args: a2 },
        ) => {
            if n1 != n2 {
                return Err(format!("arguments select both `{}` and `{}`", n1, n2));
            }
            if a1.len() != a2.len() {
                return Err(format!("`{}` is declared with different arities", n1));
            }
            let mut args = Vec::with_capacity(a1.len());
            for (x, y) in a1.into_iter().zip(a2) {
                match (x, y) {
                    (None, v) | (v, None) => args.push(v),
                    (Some(x), Some(y)) if x == y => args.push(Some(x)),
                    (Some(x), Some(y)) => {
                        return Err(format!("`{}` is bound to both `{}` and `{}`", n1, x, y));
                    }
                }
            }
            Ok(MatchPattern::Concrete { name: n1, args })
        }
    }
}

/// Resolve `name(args)` given the argument types.
///
/// `is_callable` tells whether `name` can be called directly (a predicate or an alias).
pub fn resolve(
    name: &str,
    args: &[Node],
    types: &[Type],
    decls: &[TypeDecl],
    is_callable: impl Fn(&str) -> bool,
) -> Result<Call> {
    let display = || Call {
        name: name.to_string(),
        args: args.to_vec(),
    };

    let mut unified = MatchPattern::Wildcard;
    for ty in types {
        let pattern = pattern_for(name, ty, decls);
        unified = unify_patterns(unified, pattern).map_err(|reason| Error::no_match(display(), reason))?;
    }

    match unified {
        MatchPattern::Wildcard => {
            if !is_callable(name) && decls.iter().any(|d| d.methods.contains_key(name)) {
                return Err(Error::no_match(
                    display(),
                    "the argument types match no declaration defining it",
                ));
            }
            Ok(display())
        }
        MatchPattern::Concrete { name: target, args: slots } => {
            let open = slots.iter().filter(|s| s.is_none()).count();
            if open != args.len() {
                return Err(Error::no_match(
                    display(),
                    format!("`{}` has {} open slot(s) for {} argument(s)", target, open, args.len()),
                ));
            }
            let mut actual = args.iter().cloned();
            let args = slots
                .into_iter()
                .map(|slot| slot.or_else(|| actual.next()))
                .collect::<Option<Vec<_>>>()
                .ok_or_else(|| Error::no_match(display(), "too few arguments"))?;
            let call = Call { name: target, args };
            debug!("dispatch {} -> {}", display(), call);
            Ok(call)
        }
    }
}
