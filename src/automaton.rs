//! Deterministic finite automata with BDD-labelled edges.
//!
//! A letter assigns a boolean to every proposition of the [`Alphabet`]; an edge
//! is taken when its condition holds for the letter. Automata are deterministic
//! but may be partial: the conditions leaving a state are pairwise disjoint, and
//! a letter matching none of them rejects the word.
//!
//! Numbers are read least significant digit first, so the languages built by the
//! evaluator are closed under appending and removing all-zero letters. The
//! constructive operations keep that closure; [`Automaton::project`] restores it
//! after quantification by saturating acceptance along all-zero edges.
//!
//! State `0` is always the initial state.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::fmt::Debug;
use std::rc::Rc;

use log::debug;

use crate::alphabet::Alphabet;
use crate::bdd::Bdd;
use crate::error::Result;
use crate::reference::Ref;
use crate::types::Prop;

pub type StateId = usize;

/// Propositions set to true in one letter. All others are false.
pub type Letter = BTreeSet<Prop>;

#[derive(Clone)]
pub struct Automaton {
    alphabet: Rc<Alphabet>,
    accepting: Vec<bool>,
    edges: Vec<Vec<(StateId, Ref)>>,
    props: BTreeSet<Prop>,
}

impl Debug for Automaton {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Automaton")
            .field("states", &self.num_states())
            .field("edges", &self.num_edges())
            .field("props", &self.props)
            .finish()
    }
}

impl Automaton {
    /// A single non-accepting state, ready to be extended with the builder methods.
    pub fn new(alphabet: Rc<Alphabet>) -> Self {
        Self {
            alphabet,
            accepting: vec![false],
            edges: vec![Vec::new()],
            props: BTreeSet::new(),
        }
    }

    /// Automaton accepting nothing.
    pub fn empty(alphabet: Rc<Alphabet>) -> Self {
        Self::new(alphabet)
    }

    /// Automaton accepting every word.
    pub fn universal(alphabet: Rc<Alphabet>) -> Self {
        let one = alphabet.bdd().one();
        let mut aut = Self::new(alphabet);
        aut.set_accepting(0, true);
        aut.add_edge(0, 0, one);
        aut
    }

    pub fn add_state(&mut self) -> StateId {
        self.accepting.push(false);
        self.edges.push(Vec::new());
        self.accepting.len() - 1
    }

    pub fn set_accepting(&mut self, state: StateId, accepting: bool) {
        self.accepting[state] = accepting;
    }

    /// Add an edge, merging it with an existing edge to the same target.
    pub fn add_edge(&mut self, from: StateId, to: StateId, cond: Ref) {
        let bdd = self.alphabet.bdd();
        if bdd.is_zero(cond) {
            return;
        }
        for edge in self.edges[from].iter_mut() {
            if edge.0 == to {
                edge.1 = bdd.apply_or(edge.1, cond);
                return;
            }
        }
        self.edges[from].push((to, cond));
    }

    /// Declare propositions the automaton talks about, even if no edge tests them.
    pub fn add_props(&mut self, props: impl IntoIterator<Item = Prop>) {
        self.props.extend(props);
    }

    /// Determinize and minimize a freshly built automaton.
    pub fn finish(self) -> Result<Automaton> {
        Ok(self.determinize()?.reduce())
    }
}

impl Automaton {
    pub fn alphabet(&self) -> &Rc<Alphabet> {
        &self.alphabet
    }

    fn bdd(&self) -> &Bdd {
        self.alphabet.bdd()
    }

    pub fn props(&self) -> &BTreeSet<Prop> {
        &self.props
    }

    pub fn initial(&self) -> StateId {
        0
    }

    pub fn num_states(&self) -> usize {
        self.accepting.len()
    }

    pub fn num_edges(&self) -> usize {
        self.edges.iter().map(|e| e.len()).sum()
    }

    pub fn states(&self) -> impl Iterator<Item = StateId> {
        0..self.num_states()
    }

    pub fn is_accepting(&self, state: StateId) -> bool {
        self.accepting[state]
    }

    pub fn edges(&self, state: StateId) -> &[(StateId, Ref)] {
        &self.edges[state]
    }

    pub fn is_deterministic(&self) -> bool {
        let bdd = self.bdd();
        self.edges.iter().all(|edges| {
            edges.iter().enumerate().all(|(i, &(_, c1))| {
                edges[i + 1..]
                    .iter()
                    .all(|&(_, c2)| bdd.is_zero(bdd.apply_and(c1, c2)))
            })
        })
    }
}

impl Automaton {
    /// Subset construction over BDD labels.
    ///
    /// The conditions leaving a subset are split into disjoint regions, each
    /// leading to the set of states whose edges it satisfies.
    pub fn determinize(&self) -> Result<Automaton> {
        if self.is_deterministic() {
            return Ok(self.clone());
        }

        let bdd = self.bdd();
        let mut result = Automaton::new(Rc::clone(&self.alphabet));
        result.props = self.props.clone();

        let start = BTreeSet::from([0]);
        result.accepting[0] = self.accepting[0];
        let mut index = HashMap::from([(start.clone(), 0)]);
        let mut subsets = vec![start];
        let mut queue = VecDeque::from([0]);

        while let Some(id) = queue.pop_front() {
            let mut parts: Vec<(Ref, BTreeSet<StateId>)> = vec![(bdd.one(), BTreeSet::new())];
            for &s in &subsets[id] {
                for &(t, c) in &self.edges[s] {
                    let mut next = Vec::with_capacity(parts.len() * 2);
                    for (p, targets) in parts {
                        let inside = bdd.apply_and(p, c);
                        if !bdd.is_zero(inside) {
                            let mut with_t = targets.clone();
                            with_t.insert(t);
                            next.push((inside, with_t));
                        }
                        let outside = bdd.apply_and(p, -c);
                        if !bdd.is_zero(outside) {
                            next.push((outside, targets));
                        }
                    }
                    parts = next;
                }
            }

            let mut merged: BTreeMap<BTreeSet<StateId>, Ref> = BTreeMap::new();
            for (p, targets) in parts {
                if targets.is_empty() {
                    continue;
                }
                let cond = merged.entry(targets).or_insert(bdd.zero());
                *cond = bdd.apply_or(*cond, p);
            }

            for (targets, cond) in merged {
                let target = match index.get(&targets) {
                    Some(&t) => t,
                    None => {
                        let t = result.add_state();
                        self.alphabet.check_budget(result.num_states())?;
                        result.accepting[t] = targets.iter().any(|&s| self.accepting[s]);
                        index.insert(targets.clone(), t);
                        subsets.push(targets);
                        queue.push_back(t);
                        t
                    }
                };
                result.edges[id].push((target, cond));
            }
        }

        debug!(
            "determinize: {} -> {} states",
            self.num_states(),
            result.num_states()
        );
        Ok(result)
    }

    /// Total version of the automaton: missing letters lead to a rejecting sink.
    pub fn complete(&self) -> Automaton {
        let bdd = self.bdd();
        let mut result = self.clone();
        let mut sink = None;
        for s in self.states() {
            let covered = bdd.apply_or_many(self.edges[s].iter().map(|&(_, c)| c));
            if !bdd.is_one(covered) {
                let sink = *sink.get_or_insert_with(|| {
                    let t = result.add_state();
                    result.edges[t].push((t, bdd.one()));
                    t
                });
                result.edges[s].push((sink, -covered));
            }
        }
        result
    }

    /// Drop unreachable states and states from which no accepting state is reachable.
    pub fn trim(&self) -> Automaton {
        let n = self.num_states();

        let mut reachable = vec![false; n];
        let mut order = Vec::new();
        let mut queue = VecDeque::from([0]);
        reachable[0] = true;
        while let Some(s) = queue.pop_front() {
            order.push(s);
            for &(t, _) in &self.edges[s] {
                if !reachable[t] {
                    reachable[t] = true;
                    queue.push_back(t);
                }
            }
        }

        let mut reverse = vec![Vec::new(); n];
        for s in self.states() {
            for &(t, _) in &self.edges[s] {
                reverse[t].push(s);
            }
        }
        let mut useful = self.accepting.clone();
        let mut queue: VecDeque<StateId> = self.states().filter(|&s| self.accepting[s]).collect();
        while let Some(t) = queue.pop_front() {
            for &s in &reverse[t] {
                if !useful[s] {
                    useful[s] = true;
                    queue.push_back(s);
                }
            }
        }

        let mut result = Automaton::new(Rc::clone(&self.alphabet));
        result.props = self.props.clone();
        if !useful[0] {
            return result;
        }

        let mut renumber = HashMap::new();
        for s in order {
            if useful[s] {
                let id = if s == 0 { 0 } else { result.add_state() };
                renumber.insert(s, id);
                result.accepting[id] = self.accepting[s];
            }
        }
        for (&s, &id) in &renumber {
            for &(t, c) in &self.edges[s] {
                if let Some(&target) = renumber.get(&t) {
                    result.edges[id].push((target, c));
                }
            }
        }
        for edges in result.edges.iter_mut() {
            edges.sort_by_key(|&(t, _)| t);
        }
        result
    }

    /// Signature-based partition refinement.
    ///
    /// Requires a deterministic, trimmed automaton. Two states stay in the same
    /// block while they agree on acceptance and, for every target block, on the
    /// set of letters leading into it.
    pub fn minimize(&self) -> Automaton {
        let bdd = self.bdd();
        let n = self.num_states();

        let mut block: Vec<usize> = self.accepting.iter().map(|&a| a as usize).collect();
        let mut count = block.iter().copied().collect::<BTreeSet<_>>().len();

        loop {
            let mut signatures: HashMap<(usize, Vec<(usize, Ref)>), usize> = HashMap::new();
            let mut next = vec![0; n];
            for s in 0..n {
                let mut by_block: BTreeMap<usize, Ref> = BTreeMap::new();
                for &(t, c) in &self.edges[s] {
                    let cond = by_block.entry(block[t]).or_insert(bdd.zero());
                    *cond = bdd.apply_or(*cond, c);
                }
                let signature = (block[s], by_block.into_iter().collect::<Vec<_>>());
                let fresh = signatures.len();
                next[s] = *signatures.entry(signature).or_insert(fresh);
            }
            block = next;
            if signatures.len() == count {
                break;
            }
            count = signatures.len();
        }

        // Number the blocks in BFS order from the initial state.
        let mut representative = vec![None; count];
        for s in 0..n {
            representative[block[s]].get_or_insert(s);
        }
        let mut number = vec![None; count];
        let mut order = Vec::new();
        let mut queue = VecDeque::from([block[0]]);
        number[block[0]] = Some(0);
        while let Some(b) = queue.pop_front() {
            order.push(b);
            let Some(s) = representative[b] else { continue };
            for &(t, _) in &self.edges[s] {
                if number[block[t]].is_none() {
                    number[block[t]] = Some(order.len() + queue.len());
                    queue.push_back(block[t]);
                }
            }
        }

        let mut result = Automaton::new(Rc::clone(&self.alphabet));
        result.props = self.props.clone();
        for _ in 1..order.len() {
            result.add_state();
        }
        for &b in &order {
            let (Some(id), Some(s)) = (number[b], representative[b]) else {
                continue;
            };
            result.accepting[id] = self.accepting[s];
            for &(t, c) in &self.edges[s] {
                if let Some(target) = number[block[t]] {
                    result.add_edge(id, target, c);
                }
            }
        }
        result
    }

    /// Trim, then minimize.
    pub fn reduce(&self) -> Automaton {
        self.trim().minimize()
    }

    /// Mark as accepting every state from which all-zero letters lead to acceptance.
    pub fn saturate(&self) -> Automaton {
        let bdd = self.bdd();
        let zero_successor: Vec<Option<StateId>> = self
            .edges
            .iter()
            .map(|edges| edges.iter().find(|&&(_, c)| bdd.eval_all_false(c)).map(|&(t, _)| t))
            .collect();

        let mut result = self.clone();
        loop {
            let mut changed = false;
            for s in self.states() {
                if let Some(t) = zero_successor[s] {
                    if !result.accepting[s] && result.accepting[t] {
                        result.accepting[s] = true;
                        changed = true;
                    }
                }
            }
            if !changed {
                break;
            }
        }
        result
    }

    /// Finite-word reading of a Büchi automaton whose words end in `0^ω`.
    ///
    /// A state accepts when all-zero letters can lead it into a cycle through an
    /// accepting state. The input may be nondeterministic.
    pub fn from_buchi(mut self) -> Result<Automaton> {
        let bdd = self.bdd();
        let zero: Vec<Vec<StateId>> = self
            .edges
            .iter()
            .map(|edges| {
                edges
                    .iter()
                    .filter(|&&(_, c)| bdd.eval_all_false(c))
                    .map(|&(t, _)| t)
                    .collect()
            })
            .collect();

        // Accepting states on an all-zero cycle.
        let mut accepting: Vec<bool> = self
            .states()
            .map(|q| self.accepting[q] && zero_reachable(&zero, &zero[q])[q])
            .collect();
        loop {
            let mut changed = false;
            for s in 0..accepting.len() {
                if !accepting[s] && zero[s].iter().any(|&t| accepting[t]) {
                    accepting[s] = true;
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }

        self.accepting = accepting;
        Ok(self.finish()?.saturate().reduce())
    }

    fn product(&self, other: &Automaton, accept: impl Fn(bool, bool) -> bool) -> Result<Automaton> {
        assert!(
            Rc::ptr_eq(&self.alphabet, &other.alphabet),
            "Automata must share the alphabet"
        );
        let bdd = self.bdd();

        let mut result = Automaton::new(Rc::clone(&self.alphabet));
        result.props = self.props.union(&other.props).copied().collect();
        result.accepting[0] = accept(self.accepting[0], other.accepting[0]);

        let mut index = HashMap::from([((0, 0), 0)]);
        let mut pairs = vec![(0, 0)];
        let mut queue = VecDeque::from([0]);
        while let Some(id) = queue.pop_front() {
            let (p, q) = pairs[id];
            for &(tp, cp) in &self.edges[p] {
                for &(tq, cq) in &other.edges[q] {
                    let cond = bdd.apply_and(cp, cq);
                    if bdd.is_zero(cond) {
                        continue;
                    }
                    let target = match index.get(&(tp, tq)) {
                        Some(&t) => t,
                        None => {
                            let t = result.add_state();
                            self.alphabet.check_budget(result.num_states())?;
                            result.accepting[t] = accept(self.accepting[tp], other.accepting[tq]);
                            index.insert((tp, tq), t);
                            pairs.push((tp, tq));
                            queue.push_back(t);
                            t
                        }
                    };
                    result.edges[id].push((target, cond));
                }
            }
        }

        Ok(result.reduce())
    }

    pub fn intersect(&self, other: &Automaton) -> Result<Automaton> {
        let result = self.product(other, |a, b| a && b)?;
        debug!(
            "intersect: {} x {} -> {} states",
            self.num_states(),
            other.num_states(),
            result.num_states()
        );
        Ok(result)
    }

    pub fn union(&self, other: &Automaton) -> Result<Automaton> {
        let result = self.complete().product(&other.complete(), |a, b| a || b)?;
        debug!(
            "union: {} + {} -> {} states",
            self.num_states(),
            other.num_states(),
            result.num_states()
        );
        Ok(result)
    }

    pub fn complement(&self) -> Automaton {
        let mut result = self.complete();
        for accepting in result.accepting.iter_mut() {
            *accepting = !*accepting;
        }
        result.reduce()
    }

    pub fn is_empty(&self) -> bool {
        let mut visited = vec![false; self.num_states()];
        let mut queue = VecDeque::from([0]);
        visited[0] = true;
        while let Some(s) = queue.pop_front() {
            if self.accepting[s] {
                return false;
            }
            for &(t, _) in &self.edges[s] {
                if !visited[t] {
                    visited[t] = true;
                    queue.push_back(t);
                }
            }
        }
        true
    }

    pub fn is_universal(&self) -> bool {
        self.complement().is_empty()
    }

    /// Whether both automata accept the same language.
    pub fn equivalent(&self, other: &Automaton) -> Result<bool> {
        Ok(self.intersect(&other.complement())?.is_empty() && other.intersect(&self.complement())?.is_empty())
    }

    /// Replace propositions on every edge, simultaneously.
    pub fn rename(&self, map: &HashMap<Prop, Prop>) -> Automaton {
        let bdd = self.bdd();
        let vars: HashMap<u32, u32> = map.iter().map(|(k, v)| (k.id(), v.id())).collect();

        let mut result = self.clone();
        for edges in result.edges.iter_mut() {
            for edge in edges.iter_mut() {
                edge.1 = bdd.rename_vars(edge.1, &vars);
            }
            edges.retain(|&(_, c)| !bdd.is_zero(c));
        }
        result.props = self.props.iter().map(|p| map.get(p).copied().unwrap_or(*p)).collect();
        result.reduce()
    }

    /// Rewrite every edge condition with `f`.
    ///
    /// The rewritten automaton may be nondeterministic, so it is determinized again.
    pub fn rewrite_edges(&self, f: impl Fn(&Bdd, Ref) -> Ref) -> Result<Automaton> {
        let bdd = self.bdd();
        let mut result = Automaton::new(Rc::clone(&self.alphabet));
        result.props = self.props.clone();
        for _ in 1..self.num_states() {
            result.add_state();
        }
        for s in self.states() {
            result.accepting[s] = self.accepting[s];
            for &(t, c) in &self.edges[s] {
                result.add_edge(s, t, f(bdd, c));
            }
        }
        result.finish()
    }

    /// Existential quantification over `props`.
    pub fn project(&self, props: &BTreeSet<Prop>) -> Result<Automaton> {
        if props.is_empty() {
            return Ok(self.clone());
        }
        let vars: Vec<u32> = props.iter().map(|p| p.id()).collect();
        let rewritten = self.rewrite_edges(|bdd, c| bdd.exists(c, vars.iter().copied()))?;
        let mut result = rewritten.saturate().reduce();
        result.props.retain(|p| !props.contains(p));
        debug!(
            "project {:?}: {} -> {} states",
            props,
            self.num_states(),
            result.num_states()
        );
        Ok(result)
    }

    /// Shortest accepted word, preferring false for every unconstrained proposition.
    pub fn accepting_word(&self) -> Option<Vec<Letter>> {
        let n = self.num_states();
        let mut parent: Vec<Option<(StateId, Ref)>> = vec![None; n];
        let mut visited = vec![false; n];
        let mut queue = VecDeque::from([0]);
        visited[0] = true;

        let mut found = None;
        while let Some(s) = queue.pop_front() {
            if self.accepting[s] {
                found = Some(s);
                break;
            }
            for &(t, c) in &self.edges[s] {
                if !visited[t] {
                    visited[t] = true;
                    parent[t] = Some((s, c));
                    queue.push_back(t);
                }
            }
        }

        let mut state = found?;
        let mut word = Vec::new();
        while let Some((prev, cond)) = parent[state] {
            let cube = self.bdd().one_sat(cond)?;
            let letter = cube
                .into_iter()
                .filter(|&lit| lit > 0)
                .map(|lit| Prop::new(lit as u32))
                .collect();
            word.push(letter);
            state = prev;
        }
        word.reverse();
        Some(word)
    }

    pub fn accepts(&self, word: &[Letter]) -> bool {
        let bdd = self.bdd();
        let mut state = 0;
        for letter in word {
            let next = self.edges[state]
                .iter()
                .find(|&&(_, c)| bdd.evaluate(c, |v| letter.contains(&Prop::new(v))));
            match next {
                Some(&(t, _)) => state = t,
                None => return false,
            }
        }
        self.accepting[state]
    }
}

/// States reachable from `from` along all-zero edges, in one or more steps.
fn zero_reachable(zero: &[Vec<StateId>], from: &[StateId]) -> Vec<bool> {
    let mut seen = vec![false; zero.len()];
    let mut stack: Vec<StateId> = from.to_vec();
    while let Some(s) = stack.pop() {
        if !seen[s] {
            seen[s] = true;
            stack.extend(zero[s].iter().copied());
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    fn letter(props: &[Prop]) -> Letter {
        props.iter().copied().collect()
    }

    /// Words whose first letter sets `p`.
    fn starts_with(alphabet: &Rc<Alphabet>, p: Prop) -> Automaton {
        let mut aut = Automaton::new(Rc::clone(alphabet));
        let s = aut.add_state();
        aut.add_edge(0, s, alphabet.var(p));
        aut.add_edge(s, s, alphabet.bdd().one());
        aut.set_accepting(s, true);
        aut.add_props([p]);
        aut
    }

    #[test]
    fn test_universal_and_empty() {
        let alphabet = Rc::new(Alphabet::default());
        let u = Automaton::universal(Rc::clone(&alphabet));
        let e = Automaton::empty(Rc::clone(&alphabet));
        assert!(!u.is_empty());
        assert!(u.is_universal());
        assert!(e.is_empty());
        assert!(e.complement().is_universal());
        assert!(u.accepts(&[]));
        assert!(!e.accepts(&[]));
    }

    #[test]
    fn test_intersect_union_complement() {
        let alphabet = Rc::new(Alphabet::default());
        let x = alphabet.register("x");
        let y = alphabet.register("y");
        let a = starts_with(&alphabet, x);
        let b = starts_with(&alphabet, y);

        let both = a.intersect(&b).unwrap();
        assert!(both.accepts(&[letter(&[x, y])]));
        assert!(!both.accepts(&[letter(&[x])]));
        assert_eq!(both.props(), &BTreeSet::from([x, y]));

        let either = a.union(&b).unwrap();
        assert!(either.accepts(&[letter(&[y]), letter(&[])]));
        assert!(!either.accepts(&[letter(&[])]));

        let not_a = a.complement();
        assert!(not_a.accepts(&[]));
        assert!(not_a.accepts(&[letter(&[y])]));
        assert!(!not_a.accepts(&[letter(&[x])]));
        assert!(not_a.intersect(&a).unwrap().is_empty());
    }

    #[test]
    fn test_de_morgan_on_automata() {
        let alphabet = Rc::new(Alphabet::default());
        let a = starts_with(&alphabet, alphabet.register("x"));
        let b = starts_with(&alphabet, alphabet.register("y"));

        let lhs = a.intersect(&b).unwrap().complement();
        let rhs = a.complement().union(&b.complement()).unwrap();
        assert!(lhs.equivalent(&rhs).unwrap());
    }

    #[test]
    fn test_minimize_merges_equivalent_states() {
        let alphabet = Rc::new(Alphabet::default());
        let x = alphabet.register("x");
        let bdd = alphabet.bdd();

        // Two copies of the same accepting loop.
        let mut aut = Automaton::new(Rc::clone(&alphabet));
        let s1 = aut.add_state();
        let s2 = aut.add_state();
        aut.add_edge(0, s1, alphabet.var(x));
        aut.add_edge(0, s2, -alphabet.var(x));
        aut.add_edge(s1, s1, bdd.one());
        aut.add_edge(s2, s2, bdd.one());
        aut.set_accepting(s1, true);
        aut.set_accepting(s2, true);

        let min = aut.finish().unwrap();
        assert_eq!(min.num_states(), 2);
        assert!(min.accepts(&[letter(&[])]));
        assert!(!min.accepts(&[]));
    }

    #[test]
    fn test_determinize() {
        let alphabet = Rc::new(Alphabet::default());
        let x = alphabet.register("x");
        let bdd = alphabet.bdd();

        // Nondeterministic: "some letter sets x".
        let mut aut = Automaton::new(Rc::clone(&alphabet));
        let s = aut.add_state();
        aut.add_edge(0, 0, bdd.one());
        aut.add_edge(0, s, alphabet.var(x));
        aut.add_edge(s, s, bdd.one());
        aut.set_accepting(s, true);
        assert!(!aut.is_deterministic());

        let det = aut.determinize().unwrap();
        assert!(det.is_deterministic());
        assert!(det.accepts(&[letter(&[]), letter(&[x])]));
        assert!(!det.accepts(&[letter(&[]), letter(&[])]));
    }

    #[test]
    fn test_rename_swaps_props() {
        let alphabet = Rc::new(Alphabet::default());
        let x = alphabet.register("x");
        let y = alphabet.register("y");
        let a = starts_with(&alphabet, x);

        let b = a.rename(&HashMap::from([(x, y)]));
        assert_eq!(b.props(), &BTreeSet::from([y]));
        assert!(b.accepts(&[letter(&[y])]));
        assert!(!b.accepts(&[letter(&[x])]));
    }

    #[test]
    fn test_project_saturates_trailing_zeros() {
        let alphabet = Rc::new(Alphabet::default());
        let x = alphabet.register("x");
        let y = alphabet.register("y");
        let bdd = alphabet.bdd();

        // x is zero and y is one somewhere: after projecting y every all-zero word is accepted,
        // including the empty one.
        let mut aut = Automaton::new(Rc::clone(&alphabet));
        let s = aut.add_state();
        aut.add_edge(0, 0, -alphabet.var(x));
        aut.add_edge(0, s, bdd.apply_and(-alphabet.var(x), alphabet.var(y)));
        aut.add_edge(s, s, -alphabet.var(x));
        aut.set_accepting(s, true);
        aut.add_props([x, y]);
        let aut = aut.finish().unwrap();
        assert!(!aut.accepts(&[]));

        let projected = aut.project(&BTreeSet::from([y])).unwrap();
        assert_eq!(projected.props(), &BTreeSet::from([x]));
        assert!(projected.accepts(&[]));
        assert!(projected.accepts(&[letter(&[]), letter(&[])]));
        assert!(!projected.accepts(&[letter(&[x])]));
    }

    #[test]
    fn test_accepting_word_is_shortest() {
        let alphabet = Rc::new(Alphabet::default());
        let x = alphabet.register("x");
        let y = alphabet.register("y");
        let a = starts_with(&alphabet, x).intersect(&starts_with(&alphabet, y)).unwrap();

        let word = a.accepting_word().unwrap();
        assert_eq!(word, vec![letter(&[x, y])]);
        assert!(a.accepts(&word));
        assert_eq!(Automaton::empty(Rc::clone(&alphabet)).accepting_word(), None);
    }

    #[test]
    fn test_budget_stops_products() {
        let alphabet = Rc::new(Alphabet::default());
        let a = starts_with(&alphabet, alphabet.register("x"));
        let b = starts_with(&alphabet, alphabet.register("y"));
        alphabet.set_max_states(Some(1));
        assert!(a.intersect(&b).is_err());
    }
}
