//! Formula evaluation: IR trees to automata.

use std::collections::{BTreeSet, HashMap};

use log::debug;

use crate::automaton::Automaton;
use crate::dispatch;
use crate::error::{Error, Result};
use crate::ir::{
    add, and, call, eq, exists, forall, implies, index, lt, sub, var, AutomatonLiteral, Call, CompareOp, Node,
    NodeKind, Range, Type,
};
use crate::program::{temps_of, Program, ScopeKind, VarScope};
use crate::restriction::Scope;

impl Program {
    /// Automaton accepting the encodings of the satisfying assignments of `node`.
    ///
    /// Free variables are resolved in the current variable scopes.
    pub(crate) fn eval(&mut self, node: &Node) -> Result<Automaton> {
        match &node.kind {
            NodeKind::Bool(true) => Ok(Automaton::universal(self.alphabet.clone())),
            NodeKind::Bool(false) => Ok(Automaton::empty(self.alphabet.clone())),
            NodeKind::And(a, b) => {
                let x = self.eval(a)?;
                if x.is_empty() {
                    return Ok(x);
                }
                let y = self.eval(b)?;
                x.intersect(&y)
            }
            NodeKind::Or(a, b) => {
                let x = self.eval(a)?;
                let y = self.eval(b)?;
                x.union(&y)
            }
            NodeKind::Not(a) => Ok(self.eval(a)?.complement()),
            NodeKind::Exists { var, guard, body } => self.eval_exists(var, guard.as_ref(), body),
            NodeKind::Call(c) => self.eval_call(c),
            NodeKind::Automaton(lit) => self.eval_literal(lit),
            NodeKind::Index { word, index } => self.eval_call(&Call {
                name: word.clone(),
                args: vec![(**index).clone()],
            }),
            NodeKind::RangeEq { left, right } => {
                let expanded = self.expand_range_eq(left, right);
                self.eval(&expanded)
            }
            NodeKind::Compare(op, a, b) => match (a.is_formula(), b.is_formula()) {
                (false, false) => self.eval_compare(*op, a, b),
                (true, true) if *op == CompareOp::Eq => {
                    let x = self.eval(a)?;
                    let y = self.eval(b)?;
                    let both = x.intersect(&y)?;
                    let neither = x.complement().intersect(&y.complement())?;
                    both.union(&neither)
                }
                _ => Err(Error::arithmetic(node, "comparison mixes formulas and integers")),
            },
            NodeKind::Var(_) | NodeKind::Int(_) | NodeKind::Arith(..) => {
                Err(Error::arithmetic(node, "integer expression used as a formula"))
            }
        }
    }

    fn eval_exists(&mut self, v: &str, guard: Option<&Call>, body: &Node) -> Result<Automaton> {
        let mut full = body.clone();
        for r in self.restrictions.get(v).into_iter().rev() {
            full = and(call(r.name, r.args), full);
        }
        if let Some(g) = guard {
            full = and(call(g.name.clone(), g.args.clone()), full);
        }

        let mut scope = self.restriction_scope(Scope::new());
        if let Some(g) = guard {
            scope.restrictions.restrict(v, g.clone())?;
        }
        let prop = scope.alphabet.fresh(v);
        let mut inner = scope.var_scope(VarScope::new(
            ScopeKind::Transparent,
            v,
            [(v.to_string(), prop)],
        ));
        let aut = inner.eval(&full)?;
        aut.project(&BTreeSet::from([prop]))
    }

    /// Resolve the call by argument types, then apply it.
    pub(crate) fn eval_call(&mut self, c: &Call) -> Result<Automaton> {
        let types: Vec<Type> = c.args.iter().map(|a| self.type_of(a)).collect();
        let resolved = self.resolve_call(&c.name, &c.args, &types)?;
        self.apply_call(&resolved)
    }

    pub(crate) fn resolve_call(&self, name: &str, args: &[Node], types: &[Type]) -> Result<Call> {
        let is_callable = |n: &str| self.is_callable(n);
        match dispatch::resolve(name, args, types, &self.types, is_callable) {
            Ok(c) => Ok(c),
            Err(err) => match self.context.get(name) {
                Some(alias) => dispatch::resolve(alias, args, types, &self.types, is_callable),
                None => Err(err),
            },
        }
    }

    /// Apply a resolved call; arguments that are not variables go through temporaries.
    pub(crate) fn apply_call(&mut self, c: &Call) -> Result<Automaton> {
        let mut names = Vec::with_capacity(c.args.len());
        let mut values = Vec::new();
        for arg in &c.args {
            match &arg.kind {
                NodeKind::Var(v) => names.push(v.clone()),
                _ if !arg.is_formula() => {
                    let value = self.eval_int(arg)?;
                    names.push(value.var.clone());
                    values.push(value);
                }
                _ => return Err(Error::arithmetic(arg, "formula passed as a predicate argument")),
            }
        }

        let mut result = self.call_predicate(&c.name, Some(&names))?;
        for value in &values {
            result = result.intersect(&value.aut)?;
        }
        result.project(&temps_of(&values))
    }

    fn eval_literal(&mut self, lit: &AutomatonLiteral) -> Result<Automaton> {
        let mut map = HashMap::new();
        for (name, prop) in &lit.vars {
            map.insert(*prop, self.resolve_var(name)?);
        }
        let mut aut = lit.aut.rename(&map);
        aut.add_props(map.values().copied());
        Ok(aut)
    }

    fn eval_compare(&mut self, op: CompareOp, a: &Node, b: &Node) -> Result<Automaton> {
        let x = self.eval_int(a)?;
        let y = self.eval_int(b)?;
        let relation = match op {
            CompareOp::Eq => "equal",
            CompareOp::Less => "less",
        };
        let types = [self.type_of(a), self.type_of(b)];
        let rel = self.relation(relation, &[&x.var, &y.var], &types)?;
        self.combine(rel, &[x, y])
    }

    /// `left = right` as a formula over indices.
    fn expand_range_eq(&mut self, left: &Range, right: &Range) -> Node {
        let len = self.temp_name("len");
        let n = self.temp_name("n");
        let same_length = and(
            eq(var(&len), sub((*left.end).clone(), (*left.start).clone())),
            eq(var(&len), sub((*right.end).clone(), (*right.start).clone())),
        );
        let pointwise = forall(
            &n,
            implies(
                lt(var(&n), var(&len)),
                eq(
                    index(&left.word, add((*left.start).clone(), var(&n))),
                    index(&right.word, add((*right.start).clone(), var(&n))),
                ),
            ),
        );
        let expanded = exists(&len, and(same_length, pointwise));
        debug!("range equality {} = {} expands to {}", left, right, expanded);
        expanded
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use num_bigint::BigUint;
    use test_log::test;

    use super::*;
    use crate::config::EvalConfig;
    use crate::ir::{boolean, int, not, or, range, range_eq};
    use crate::unify::TruthValue;

    fn program() -> Program {
        let mut program = Program::new(EvalConfig::default());
        crate::prelude::install(&mut program).unwrap();
        program
    }

    #[test]
    fn test_constants_and_connectives() {
        let mut program = program();
        assert_eq!(program.truth_value(&boolean(true)).unwrap(), TruthValue::True);
        assert_eq!(program.truth_value(&boolean(false)).unwrap(), TruthValue::False);
        let f = or(eq(var("x"), int(1)), not(eq(var("x"), int(1))));
        assert_eq!(program.truth_value(&f).unwrap(), TruthValue::True);
        let f = and(eq(var("x"), int(1)), eq(var("x"), int(2)));
        assert_eq!(program.truth_value(&f).unwrap(), TruthValue::False);
    }

    #[test]
    fn test_formula_equivalence() {
        let mut program = program();
        let a = eq(var("x"), int(3));
        let f = eq(a.clone(), not(not(a)));
        assert_eq!(program.truth_value(&f).unwrap(), TruthValue::True);
    }

    #[test]
    fn test_integer_as_formula() {
        let mut program = program();
        let err = program.truth_value(&var("x")).unwrap_err();
        assert!(matches!(err, Error::ArithmeticType { .. }));
        let err = program.truth_value(&lt(eq(var("x"), int(1)), boolean(true))).unwrap_err();
        assert!(matches!(err, Error::ArithmeticType { .. }));
    }

    #[test]
    fn test_witness() {
        let mut program = program();
        let f = and(eq(add(var("x"), var("y")), int(7)), lt(var("y"), var("x")));
        let w: BTreeMap<String, BigUint> = program.witness(&f).unwrap().unwrap();
        let (x, y) = (&w["x"], &w["y"]);
        assert_eq!(x + y, BigUint::from(7u8));
        assert!(y < x);
        assert_eq!(program.witness(&and(eq(var("x"), int(1)), eq(var("x"), int(2)))).unwrap(), None);
    }

    #[test]
    fn test_index_and_range_equality() {
        let mut program = program();
        // Words as predicates on positions: w holds at 1 and 3, v at 0 and 2.
        let w = or(eq(var("i"), int(1)), eq(var("i"), int(3)));
        let v = or(eq(var("i"), int(0)), eq(var("i"), int(2)));
        program
            .define(crate::program::NamedPredicate::new("w", &["i"], w))
            .unwrap();
        program
            .define(crate::program::NamedPredicate::new("v", &["i"], v))
            .unwrap();

        assert_eq!(program.truth_value(&index("w", int(3))).unwrap(), TruthValue::True);
        assert_eq!(program.truth_value(&index("w", int(2))).unwrap(), TruthValue::False);

        let shifted = range_eq(range("w", int(1), int(4)), range("v", int(0), int(3)));
        assert_eq!(program.truth_value(&shifted).unwrap(), TruthValue::True);
        let unshifted = range_eq(range("w", int(0), int(3)), range("v", int(0), int(3)));
        assert_eq!(program.truth_value(&unshifted).unwrap(), TruthValue::False);
    }
}
