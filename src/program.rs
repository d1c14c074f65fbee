//! Evaluation state: named predicates, scopes and memo tables.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt::Debug;
use std::ops::{Deref, DerefMut};
use std::rc::Rc;

use log::{debug, info};
use num_bigint::BigUint;

use crate::alphabet::Alphabet;
use crate::automaton::Automaton;
use crate::config::EvalConfig;
use crate::dispatch::TypeDecl;
use crate::error::{Error, Result};
use crate::ir::{and, call, Call, Node, Type};
use crate::optimize::{Optimizer, Simplifier};
use crate::restriction::{RestrictionEnv, Scope};
use crate::types::Prop;
use crate::unify::{TruthOracle, TruthValue};

/// Longest chain of context aliases followed before giving up.
const MAX_ALIAS_DEPTH: usize = 16;

/// Memoized body of a predicate: its automaton and the propositions of its formals.
#[derive(Debug, Clone)]
pub struct Memo {
    pub aut: Automaton,
    pub formals: Vec<Prop>,
}

#[derive(Debug, Clone)]
pub struct NamedPredicate {
    pub name: String,
    pub args: Vec<String>,
    pub guards: Vec<(String, Call)>,
    pub body: Node,
    closure: Option<Scope>,
    memo: Option<Memo>,
}

impl NamedPredicate {
    pub fn new(name: impl Into<String>, args: &[&str], body: Node) -> Self {
        Self {
            name: name.into(),
            args: args.iter().map(|a| a.to_string()).collect(),
            guards: Vec::new(),
            body,
            closure: None,
            memo: None,
        }
    }

    /// Restrict a formal argument, e.g. `P(x: Nat(x)) := ...`.
    pub fn with_guard(mut self, var: impl Into<String>, restriction: Call) -> Self {
        self.guards.push((var.into(), restriction));
        self
    }

    pub fn memo(&self) -> Option<&Memo> {
        self.memo.as_ref()
    }

    /// Restrictions captured at first evaluation.
    pub fn closure(&self) -> Option<&Scope> {
        self.closure.as_ref()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ScopeKind {
    /// Variables not found here are looked up in the enclosing scopes.
    Transparent,
    /// Unknown variables are free and get a fresh proposition here.
    Open,
    /// Unknown variables are an error (predicate bodies).
    Sealed,
}

#[derive(Debug, Clone)]
pub(crate) struct VarScope {
    pub kind: ScopeKind,
    pub owner: String,
    pub vars: HashMap<String, Prop>,
}

impl VarScope {
    pub fn new(kind: ScopeKind, owner: impl Into<String>, vars: impl IntoIterator<Item = (String, Prop)>) -> Self {
        Self {
            kind,
            owner: owner.into(),
            vars: vars.into_iter().collect(),
        }
    }
}

/// Result of evaluating an integer expression: the automaton relates `var` to
/// the value of the expression.
#[derive(Debug, Clone)]
pub(crate) struct IntValue {
    pub aut: Automaton,
    pub var: String,
    pub prop: Prop,
    /// Introduced by the evaluator, to be projected away once consumed.
    pub temp: bool,
}

pub struct Program {
    pub(crate) alphabet: Rc<Alphabet>,
    pub(crate) config: EvalConfig,
    pub(crate) predicates: BTreeMap<String, NamedPredicate>,
    pub(crate) types: Vec<TypeDecl>,
    pub(crate) context: HashMap<String, String>,
    pub(crate) restrictions: RestrictionEnv,
    pub(crate) var_scopes: Vec<VarScope>,
    pub(crate) constants: HashMap<(u64, Type), IntValue>,
    in_progress: Vec<String>,
    next_temp: usize,
}

impl Debug for Program {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Program")
            .field("predicates", &self.predicates.keys().collect::<Vec<_>>())
            .field("types", &self.types.len())
            .field("context", &self.context)
            .field("constants", &self.constants.len())
            .field("alphabet", &self.alphabet)
            .finish()
    }
}

/// Restriction scope, exited when dropped.
pub struct RestrictionScope<'a> {
    program: &'a mut Program,
}

impl Deref for RestrictionScope<'_> {
    type Target = Program;

    fn deref(&self) -> &Self::Target {
        self.program
    }
}

impl DerefMut for RestrictionScope<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.program
    }
}

impl Drop for RestrictionScope<'_> {
    fn drop(&mut self) {
        self.program.restrictions.exit_scope();
    }
}

/// Variable scope, popped when dropped.
pub(crate) struct VarScopeGuard<'a> {
    program: &'a mut Program,
}

impl Deref for VarScopeGuard<'_> {
    type Target = Program;

    fn deref(&self) -> &Self::Target {
        self.program
    }
}

impl DerefMut for VarScopeGuard<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.program
    }
}

impl Drop for VarScopeGuard<'_> {
    fn drop(&mut self) {
        assert!(self.program.var_scopes.pop().is_some(), "unbalanced variable scope");
    }
}

impl Program {
    pub fn new(config: EvalConfig) -> Self {
        let alphabet = Rc::new(Alphabet::new(config.storage_bits));
        Self::with_alphabet(alphabet, config)
    }

    /// Program sharing the propositions (and automata) of another one.
    pub fn with_alphabet(alphabet: Rc<Alphabet>, config: EvalConfig) -> Self {
        alphabet.set_max_states(config.max_states);
        Self {
            alphabet,
            config,
            predicates: BTreeMap::new(),
            types: Vec::new(),
            context: HashMap::new(),
            restrictions: RestrictionEnv::new(),
            var_scopes: vec![VarScope::new(ScopeKind::Open, "top level", [])],
            constants: HashMap::new(),
            in_progress: Vec::new(),
            next_temp: 0,
        }
    }

    pub fn alphabet(&self) -> &Rc<Alphabet> {
        &self.alphabet
    }

    pub fn config(&self) -> &EvalConfig {
        &self.config
    }

    pub fn predicate(&self, name: &str) -> Option<&NamedPredicate> {
        self.predicates.get(name)
    }

    pub fn predicates(&self) -> impl Iterator<Item = &NamedPredicate> {
        self.predicates.values()
    }

    pub fn type_decls(&self) -> &[TypeDecl] {
        &self.types
    }

    pub fn add_type(&mut self, decl: TypeDecl) {
        debug!("type {}", decl.pattern);
        match self.types.iter_mut().find(|d| d.pattern.name == decl.pattern.name) {
            Some(existing) => *existing = decl,
            None => self.types.push(decl),
        }
    }

    pub fn context(&self) -> &HashMap<String, String> {
        &self.context
    }

    /// Calls to `alias` that cannot be resolved otherwise go to `target`.
    pub fn set_alias(&mut self, alias: impl Into<String>, target: impl Into<String>) {
        self.context.insert(alias.into(), target.into());
    }

    pub fn restrictions(&self) -> &RestrictionEnv {
        &self.restrictions
    }

    pub fn restrictions_mut(&mut self) -> &mut RestrictionEnv {
        &mut self.restrictions
    }

    pub fn restriction_scope(&mut self, initial: Scope) -> RestrictionScope<'_> {
        self.restrictions.enter_scope(initial);
        RestrictionScope { program: self }
    }

    pub(crate) fn var_scope(&mut self, scope: VarScope) -> VarScopeGuard<'_> {
        self.var_scopes.push(scope);
        VarScopeGuard { program: self }
    }

    pub(crate) fn is_callable(&self, name: &str) -> bool {
        self.predicates.contains_key(name) || self.context.contains_key(name)
    }

    /// Type of a variable: its first visible restriction.
    pub(crate) fn var_type(&self, var: &str) -> Result<Type> {
        match self.restrictions.get(var).first() {
            Some(r) => Type::restriction(var, r),
            None => Ok(Type::Any),
        }
    }

    /// Type of an argument, falling back to the restrictions of plain variables.
    pub(crate) fn type_of(&self, node: &Node) -> Type {
        match &node.ty {
            Some(Type::Inferred) | None => match &node.kind {
                crate::ir::NodeKind::Var(v) => self.var_type(v).unwrap_or(Type::Any),
                _ => Type::Any,
            },
            Some(ty) => ty.clone(),
        }
    }

    pub(crate) fn temp_name(&mut self, hint: &str) -> String {
        self.next_temp += 1;
        format!("__{}{}", hint, self.next_temp)
    }

    /// Fresh temporary variable, bound in the innermost scope.
    pub(crate) fn bind_temp(&mut self, hint: &str) -> (String, Prop) {
        let name = self.temp_name(hint);
        let prop = self.alphabet.fresh(&name);
        if let Some(scope) = self.var_scopes.last_mut() {
            scope.vars.insert(name.clone(), prop);
        }
        (name, prop)
    }

    /// Proposition of a variable in the current scopes.
    pub(crate) fn resolve_var(&mut self, name: &str) -> Result<Prop> {
        for i in (0..self.var_scopes.len()).rev() {
            let scope = &self.var_scopes[i];
            if let Some(&p) = scope.vars.get(name) {
                return Ok(p);
            }
            match scope.kind {
                ScopeKind::Transparent => continue,
                ScopeKind::Sealed => {
                    return Err(Error::UnboundVariable {
                        var: name.to_string(),
                        context: scope.owner.clone(),
                    })
                }
                ScopeKind::Open => {
                    let p = self.alphabet.fresh(name);
                    self.var_scopes[i].vars.insert(name.to_string(), p);
                    return Ok(p);
                }
            }
        }
        Err(Error::UnboundVariable {
            var: name.to_string(),
            context: "top level".to_string(),
        })
    }

    /// Register a predicate: infer, optionally simplify, and evaluate its body once.
    pub fn define(&mut self, mut pred: NamedPredicate) -> Result<()> {
        let mut guards = Scope::new();
        for (var, g) in &pred.guards {
            Type::restriction(var, g)?;
            guards.entry(var.clone()).or_default().push(g.clone());
        }

        let body = {
            let mut scope = self.restriction_scope(guards);
            scope.infer(&pred.body)?
        };
        pred.body = if self.config.optimize {
            Simplifier::default().optimize(body)
        } else {
            body
        };
        pred.closure = None;
        pred.memo = None;

        let name = pred.name.clone();
        info!("define {}({}) := {}", name, pred.args.join(", "), pred.body);
        self.predicates.insert(name.clone(), pred);
        let result = self.ensure_evaluated(&name);
        if result.is_err() {
            self.predicates.remove(&name);
        }
        result
    }

    /// Register an already evaluated predicate (e.g. from another program).
    pub(crate) fn adopt(&mut self, pred: NamedPredicate) {
        self.predicates.insert(pred.name.clone(), pred);
    }

    pub(crate) fn resolve_alias(&self, name: &str) -> Result<String> {
        let mut current = name;
        for _ in 0..MAX_ALIAS_DEPTH {
            if self.predicates.contains_key(current) {
                return Ok(current.to_string());
            }
            match self.context.get(current) {
                Some(target) => current = target,
                None => break,
            }
        }
        Err(Error::UnboundPredicate(name.to_string()))
    }

    pub(crate) fn ensure_evaluated(&mut self, name: &str) -> Result<()> {
        let pred = self
            .predicates
            .get(name)
            .ok_or_else(|| Error::UnboundPredicate(name.to_string()))?;
        if pred.memo.is_some() {
            return Ok(());
        }
        if self.config.detect_cycles && self.in_progress.iter().any(|n| n == name) {
            return Err(Error::CyclicPredicate(name.to_string()));
        }

        self.in_progress.push(name.to_string());
        let result = self.evaluate_body(name);
        self.in_progress.pop();
        let memo = result?;

        debug!(
            "memo {}: {} states, {} edges",
            name,
            memo.aut.num_states(),
            memo.aut.num_edges()
        );
        if let Some(pred) = self.predicates.get_mut(name) {
            pred.memo = Some(memo);
        }
        Ok(())
    }

    fn evaluate_body(&mut self, name: &str) -> Result<Memo> {
        let pred = self
            .predicates
            .get_mut(name)
            .ok_or_else(|| Error::UnboundPredicate(name.to_string()))?;
        let closure = match &pred.closure {
            Some(c) => c.clone(),
            None => {
                let snapshot = self.restrictions.snapshot();
                pred.closure = Some(snapshot.clone());
                snapshot
            }
        };
        let args = pred.args.clone();
        let guards = pred.guards.clone();
        let body = pred.body.clone();

        let mut initial = closure;
        for (var, g) in guards {
            let list = initial.entry(var).or_default();
            if !list.contains(&g) {
                list.push(g);
            }
        }

        let mut scope = self.restriction_scope(initial);
        let formals: Vec<Prop> = args.iter().map(|a| scope.alphabet.fresh(a)).collect();
        let vars = VarScope::new(
            ScopeKind::Sealed,
            name,
            args.iter().cloned().zip(formals.iter().copied()),
        );
        let mut inner = scope.var_scope(vars);

        let mut full = body;
        for a in args.iter().rev() {
            for r in inner.restrictions.get(a).into_iter().rev() {
                full = and(call(r.name, r.args), full);
            }
        }

        let mut aut = inner.eval(&full)?;
        aut.add_props(formals.iter().copied());
        Ok(Memo { aut, formals })
    }

    /// Automaton of `name` applied to `actuals`, or on its own formals when `None`.
    pub fn call_predicate(&mut self, name: &str, actuals: Option<&[String]>) -> Result<Automaton> {
        let target = self.resolve_alias(name)?;
        self.ensure_evaluated(&target)?;
        let memo = self
            .predicates
            .get(&target)
            .and_then(|p| p.memo.clone())
            .ok_or_else(|| Error::UnboundPredicate(target.clone()))?;

        let Some(actuals) = actuals else {
            return Ok(memo.aut);
        };
        if actuals.len() != memo.formals.len() {
            return Err(Error::Arity {
                name: target,
                expected: memo.formals.len(),
                actual: actuals.len(),
            });
        }

        let mut map = HashMap::new();
        for (formal, actual) in memo.formals.iter().zip(actuals) {
            map.insert(*formal, self.resolve_var(actual)?);
        }
        let mut aut = memo.aut.rename(&map);
        aut.add_props(map.values().copied());
        Ok(aut)
    }

    /// Truth value of a named predicate over its formals.
    pub fn predicate_truth(&mut self, name: &str) -> Result<TruthValue> {
        let aut = self.call_predicate(name, None)?;
        Ok(classify(&aut))
    }

    /// Whether `formula` holds always, never, or for some values of its free variables.
    pub fn truth_value(&mut self, formula: &Node) -> Result<TruthValue> {
        let mut scope = self.var_scope(VarScope::new(ScopeKind::Open, "query", []));
        let typed = scope.infer(formula)?;
        let aut = scope.eval(&typed)?;
        Ok(classify(&aut))
    }

    /// Smallest satisfying assignment of the free variables of `formula`.
    pub fn witness(&mut self, formula: &Node) -> Result<Option<BTreeMap<String, BigUint>>> {
        let mut scope = self.var_scope(VarScope::new(ScopeKind::Open, "query", []));
        let typed = scope.infer(formula)?;
        let aut = scope.eval(&typed)?;
        let free: Vec<(String, Prop)> = scope
            .var_scopes
            .last()
            .map(|s| {
                s.vars
                    .iter()
                    .filter(|(name, _)| !name.starts_with(crate::ir::TEMP_PREFIX))
                    .map(|(name, &p)| (name.clone(), p))
                    .collect()
            })
            .unwrap_or_default();

        let Some(word) = aut.accepting_word() else {
            return Ok(None);
        };
        let mut values = BTreeMap::new();
        for (name, p) in free {
            let mut value = BigUint::from(0u8);
            for (i, letter) in word.iter().enumerate() {
                if letter.contains(&p) {
                    value += BigUint::from(1u8) << i;
                }
            }
            values.insert(name, value);
        }
        Ok(Some(values))
    }

    /// Drop every restriction; called at the end of a successful run.
    pub fn clear_restrictions(&mut self) {
        self.restrictions.clear();
    }
}

pub fn classify(aut: &Automaton) -> TruthValue {
    if aut.is_empty() {
        TruthValue::False
    } else if aut.is_universal() {
        TruthValue::True
    } else {
        TruthValue::Sometimes
    }
}

impl TruthOracle for Program {
    fn truth_value(&mut self, formula: &Node) -> Result<TruthValue> {
        Program::truth_value(self, formula)
    }
}

/// Propositions of the temporaries among `values`.
pub(crate) fn temps_of<'a>(values: impl IntoIterator<Item = &'a IntValue>) -> BTreeSet<Prop> {
    values.into_iter().filter(|v| v.temp).map(|v| v.prop).collect()
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::ir::{call_of, exists, var};

    fn program() -> Program {
        let mut program = Program::new(EvalConfig::default());
        crate::prelude::install(&mut program).unwrap();
        program
    }

    #[test]
    fn test_restriction_scope_unwinds() {
        let mut program = program();
        {
            let mut scope = program.restriction_scope(Scope::new());
            scope
                .restrictions_mut()
                .restrict("x", call_of("bin_zero", vec![var("x")]))
                .unwrap();
            assert_eq!(scope.restrictions().depth(), 1);
        }
        assert_eq!(program.restrictions().depth(), 0);
        assert!(program.restrictions().get("x").is_empty());
    }

    #[test]
    fn test_scope_unwinds_on_error() {
        let mut program = program();
        let bad = exists("x", call("nope", vec![var("x")]));
        assert!(matches!(program.truth_value(&bad), Err(Error::UnboundPredicate(_))));
        assert_eq!(program.restrictions().depth(), 0);
        assert_eq!(program.var_scopes.len(), 1);
    }

    #[test]
    fn test_unbound_variable_in_body() {
        let mut program = program();
        let pred = NamedPredicate::new("P", &["x"], call("bin_equal", vec![var("x"), var("z")]));
        let err = program.define(pred).unwrap_err();
        assert!(matches!(err, Error::UnboundVariable { ref var, .. } if var == "z"));
    }

    #[test]
    fn test_arity() {
        let mut program = program();
        let err = program.call_predicate("bin_add", Some(&["a".to_string()])).unwrap_err();
        assert!(matches!(err, Error::Arity { expected: 3, actual: 1, .. }));
    }

    #[test]
    fn test_cycle_is_detected() {
        let mut program = program();
        program.set_alias("loop_alias", "Loop");
        let pred = NamedPredicate::new("Loop", &["x"], call("loop_alias", vec![var("x")]));
        let err = program.define(pred).unwrap_err();
        assert!(matches!(err, Error::CyclicPredicate(ref n) if n == "Loop"));
    }

    #[test]
    fn test_closure_is_captured_once() {
        let mut program = program();
        let pred = NamedPredicate::new("Z", &["x"], call("bin_zero", vec![var("x")]));
        program.define(pred).unwrap();
        assert!(program.predicate("Z").unwrap().closure().unwrap().is_empty());

        program
            .restrictions_mut()
            .global_restrict("x", call_of("bin_zero", vec![var("x")]))
            .unwrap();
        program.call_predicate("Z", None).unwrap();
        assert!(program.predicate("Z").unwrap().closure().unwrap().is_empty());
    }
}
