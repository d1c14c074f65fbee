//! Scoped restriction environment.
//!
//! A stack of local scopes plus one global scope, each mapping a variable name
//! to the restriction calls constraining it.

use std::collections::HashMap;

use log::debug;

use crate::error::{Error, Result};
use crate::ir::{Call, Node, NodeKind};

pub type Scope = HashMap<String, Vec<Call>>;

#[derive(Debug, Default, Clone)]
pub struct RestrictionEnv {
    global: Scope,
    stack: Vec<Scope>,
}

fn check(var: &str, predicate: &Call) -> Result<()> {
    match predicate.args.first() {
        Some(Node {
            kind: NodeKind::Var(first),
            ..
        }) if first == var => Ok(()),
        _ => Err(Error::MalformedRestriction {
            var: var.to_string(),
            predicate: predicate.to_string(),
        }),
    }
}

fn push_unique(list: &mut Vec<Call>, predicate: Call) {
    if !list.contains(&predicate) {
        list.push(predicate);
    }
}

impl RestrictionEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn enter_scope(&mut self, initial: Scope) {
        self.stack.push(initial);
    }

    /// # Panics
    ///
    /// Panics if there is no scope to exit: enter and exit must be paired.
    pub fn exit_scope(&mut self) {
        assert!(self.stack.pop().is_some(), "exit_scope on an empty restriction stack");
    }

    /// Restrict `var` in the innermost scope (globally if no scope is open).
    pub fn restrict(&mut self, var: &str, predicate: Call) -> Result<()> {
        check(var, &predicate)?;
        let scope = match self.stack.last_mut() {
            Some(scope) => scope,
            None => &mut self.global,
        };
        push_unique(scope.entry(var.to_string()).or_default(), predicate);
        Ok(())
    }

    pub fn global_restrict(&mut self, var: &str, predicate: Call) -> Result<()> {
        check(var, &predicate)?;
        debug!("global restriction {}: {}", var, predicate);
        push_unique(self.global.entry(var.to_string()).or_default(), predicate);
        Ok(())
    }

    /// Drop every restriction on `var`, global and local.
    pub fn forget(&mut self, var: &str) {
        self.global.remove(var);
        for scope in self.stack.iter_mut() {
            scope.remove(var);
        }
    }

    /// Visible restrictions of `var`: global ones first, then outer to inner scopes.
    pub fn get(&self, var: &str) -> Vec<Call> {
        let mut result = Vec::new();
        for scope in std::iter::once(&self.global).chain(self.stack.iter()) {
            if let Some(list) = scope.get(var) {
                for p in list {
                    push_unique(&mut result, p.clone());
                }
            }
        }
        result
    }

    /// Every visible restriction, merged into a single scope.
    pub fn snapshot(&self) -> Scope {
        let mut result = Scope::new();
        for scope in std::iter::once(&self.global).chain(self.stack.iter()) {
            for (var, list) in scope {
                let entry = result.entry(var.clone()).or_default();
                for p in list {
                    push_unique(entry, p.clone());
                }
            }
        }
        result
    }

    /// Drop all local scopes and global restrictions.
    pub fn clear(&mut self) {
        self.global.clear();
        self.stack.clear();
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::ir::{call_of, int, var};

    fn nat(v: &str) -> Call {
        call_of("Nat", vec![var(v)])
    }

    #[test]
    fn test_scopes_nest() {
        let mut env = RestrictionEnv::new();
        env.global_restrict("x", nat("x")).unwrap();
        env.enter_scope(Scope::new());
        env.restrict("x", call_of("Even", vec![var("x")])).unwrap();
        env.restrict("x", nat("x")).unwrap();

        let names: Vec<String> = env.get("x").iter().map(|c| c.name.clone()).collect();
        assert_eq!(names, ["Nat", "Even"]);

        env.exit_scope();
        assert_eq!(env.get("x"), vec![nat("x")]);
        assert!(env.get("y").is_empty());
    }

    #[test]
    fn test_malformed_restriction() {
        let mut env = RestrictionEnv::new();
        let err = env.restrict("x", nat("y")).unwrap_err();
        assert!(matches!(err, Error::MalformedRestriction { .. }));
        let err = env
            .global_restrict("x", call_of("Mod", vec![int(2), var("x")]))
            .unwrap_err();
        assert!(matches!(err, Error::MalformedRestriction { .. }));
    }

    #[test]
    fn test_forget_and_snapshot() {
        let mut env = RestrictionEnv::new();
        env.global_restrict("x", nat("x")).unwrap();
        env.global_restrict("y", nat("y")).unwrap();
        env.enter_scope(Scope::from([("z".to_string(), vec![nat("z")])]));

        let snap = env.snapshot();
        assert_eq!(snap.len(), 3);

        env.forget("x");
        env.forget("z");
        assert!(env.get("x").is_empty());
        assert!(env.get("z").is_empty());
        assert_eq!(env.get("y").len(), 1);
        env.exit_scope();
        assert_eq!(env.depth(), 0);
    }

    #[test]
    #[should_panic(expected = "exit_scope on an empty restriction stack")]
    fn test_unbalanced_exit_panics() {
        let mut env = RestrictionEnv::new();
        env.exit_scope();
    }
}
