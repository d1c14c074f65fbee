//! The BDD manager.
//!
//! Edge conditions of automata are reduced ordered BDDs with complement edges.
//! Variables are ordered by their index (smaller index is closer to the root),
//! index 0 is reserved for the terminal.

use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::fmt::Debug;

use log::debug;

use crate::cache::Cache;
use crate::reference::Ref;
use crate::table::Table;
use crate::utils::{pairing3, MyHash};

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
struct Node {
    variable: u32,
    low: Ref,
    high: Ref,
}

impl Default for Node {
    fn default() -> Self {
        Self {
            variable: 0,
            low: Ref::positive(0),
            high: Ref::positive(0),
        }
    }
}

impl MyHash for Node {
    fn hash(&self) -> u64 {
        pairing3(self.variable as u64, self.low.as_lit(), self.high.as_lit())
    }
}

type IteKey = (Ref, Ref, Ref);

impl MyHash for IteKey {
    fn hash(&self) -> u64 {
        pairing3(self.0.as_lit(), self.1.as_lit(), self.2.as_lit())
    }
}

pub struct Bdd {
    storage: RefCell<Table<Node>>,
    cache: RefCell<Cache<IteKey, Ref>>,
    zero: Ref,
    one: Ref,
}

impl Bdd {
    pub fn new(storage_bits: usize) -> Self {
        assert!(
            storage_bits <= 31,
            "Storage bits should be in the range 0..=31"
        );

        let cache_bits = storage_bits.min(16);

        let mut storage = Table::new(storage_bits);

        // Allocate the terminal node:
        let one = storage.add(Node::default());
        assert_eq!(one, 1); // Make sure the terminal node is (1).
        let one = Ref::positive(one as u32);
        let zero = -one;

        Self {
            storage: RefCell::new(storage),
            cache: RefCell::new(Cache::new(cache_bits)),
            zero,
            one,
        }
    }
}

impl Default for Bdd {
    fn default() -> Self {
        Bdd::new(20)
    }
}

impl Debug for Bdd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let storage = self.storage.borrow();
        let cache = self.cache.borrow();
        f.debug_struct("Bdd")
            .field("size", &storage.size())
            .field("cache_hits", &cache.hits())
            .field("cache_misses", &cache.misses())
            .finish()
    }
}

impl Bdd {
    pub fn zero(&self) -> Ref {
        self.zero
    }
    pub fn one(&self) -> Ref {
        self.one
    }

    /// Number of allocated nodes.
    pub fn num_nodes(&self) -> usize {
        self.storage.borrow().size()
    }

    pub fn variable(&self, index: usize) -> u32 {
        self.storage.borrow().value(index).variable
    }
    pub fn low(&self, index: usize) -> Ref {
        self.storage.borrow().value(index).low
    }
    pub fn high(&self, index: usize) -> Ref {
        self.storage.borrow().value(index).high
    }

    pub fn low_node(&self, node: Ref) -> Ref {
        let low = self.low(node.index());
        if node.is_negated() {
            -low
        } else {
            low
        }
    }
    pub fn high_node(&self, node: Ref) -> Ref {
        let high = self.high(node.index());
        if node.is_negated() {
            -high
        } else {
            high
        }
    }

    pub fn is_zero(&self, node: Ref) -> bool {
        node == self.zero
    }
    pub fn is_one(&self, node: Ref) -> bool {
        node == self.one
    }
    pub fn is_terminal(&self, node: Ref) -> bool {
        self.is_zero(node) || self.is_one(node)
    }

    pub fn mk_node(&self, v: u32, low: Ref, high: Ref) -> Ref {
        assert_ne!(v, 0, "Variable index should not be zero");

        // Handle canonicity
        if high.is_negated() {
            return -self.mk_node(v, -low, -high);
        }

        // Handle duplicates
        if low == high {
            return low;
        }

        let i = self.storage.borrow_mut().put(Node {
            variable: v,
            low,
            high,
        });
        Ref::positive(i as u32)
    }

    pub fn mk_var(&self, v: u32) -> Ref {
        assert_ne!(v, 0, "Variable index should not be zero");
        self.mk_node(v, self.zero, self.one)
    }

    /// Conjunction of literals, given in DIMACS-like signed form.
    pub fn cube(&self, literals: impl IntoIterator<Item = i32>) -> Ref {
        let mut literals = literals.into_iter().collect::<Vec<_>>();
        literals.sort_by_key(|&v| v.abs());
        literals.reverse();
        let mut current = self.one;
        for lit in literals {
            assert_ne!(lit, 0, "Variable index should not be zero");
            current = if lit < 0 {
                self.mk_node(lit.unsigned_abs(), current, self.zero)
            } else {
                self.mk_node(lit as u32, self.zero, current)
            };
        }
        current
    }

    pub fn top_cofactors(&self, node: Ref, v: u32) -> (Ref, Ref) {
        assert_ne!(v, 0, "Variable index should not be zero");

        let i = node.index();
        if self.is_terminal(node) || v < self.variable(i) {
            return (node, node);
        }
        assert_eq!(v, self.variable(i));
        if node.is_negated() {
            (-self.low(i), -self.high(i))
        } else {
            (self.low(i), self.high(i))
        }
    }

    /// Apply the ITE operation to the arguments.
    ///
    /// ```text
    /// ITE(x, y, z) = (x ∧ y) ∨ (¬x ∧ z)
    /// ```
    pub fn apply_ite(&self, f: Ref, g: Ref, h: Ref) -> Ref {
        // Base cases:
        //   ite(1,G,H) => G
        //   ite(0,G,H) => H
        if self.is_one(f) {
            return g;
        }
        if self.is_zero(f) {
            return h;
        }

        // More base cases:
        //   ite(F,G,G) => G
        //   ite(F,1,0) => F
        //   ite(F,0,1) => ~F
        //   ite(F,1,~F) => 1
        //   ite(F,F,1) => 1
        //   ite(F,~F,0) => 0
        //   ite(F,0,F) => 0
        if g == h {
            return g;
        }
        if self.is_one(g) && self.is_zero(h) {
            return f;
        }
        if self.is_zero(g) && self.is_one(h) {
            return -f;
        }
        if self.is_one(g) && h == -f {
            return self.one;
        }
        if g == f && self.is_one(h) {
            return self.one;
        }
        if g == -f && self.is_zero(h) {
            return self.zero;
        }
        if self.is_zero(g) && h == f {
            return self.zero;
        }

        // Standard triples:
        //   ite(F,F,H) => ite(F,1,H)
        //   ite(F,G,F) => ite(F,G,0)
        //   ite(F,~F,H) => ite(F,0,H)
        //   ite(F,G,~F) => ite(F,G,1)
        if g == f {
            return self.apply_ite(f, self.one, h);
        }
        if h == f {
            return self.apply_ite(f, g, self.zero);
        }
        if g == -f {
            return self.apply_ite(f, self.zero, h);
        }
        if h == -f {
            return self.apply_ite(f, g, self.one);
        }

        let i = self.variable(f.index());
        let j = self.variable(g.index());
        let k = self.variable(h.index());
        assert_ne!(i, 0);

        // Equivalent pairs (choose the one with the lowest variable):
        //   ite(F,1,H) == ite(H,1,F) == F ∨ H
        //   ite(F,G,0) == ite(G,F,0) == F ∧ G
        //   ite(F,G,1) == ite(~G,~F,1) == F -> G
        //   ite(F,0,H) == ite(~H,0,~F) == ~F ∧ H
        //   ite(F,G,~G) == ite(G,F,~F)
        if self.is_one(g) && k < i {
            return self.apply_ite(h, self.one, f);
        }
        if self.is_zero(h) && j < i {
            return self.apply_ite(g, f, self.zero);
        }
        if self.is_one(h) && j < i {
            return self.apply_ite(-g, -f, self.one);
        }
        if self.is_zero(g) && k < i {
            return self.apply_ite(-h, self.zero, -f);
        }
        if g == -h && j < i {
            return self.apply_ite(g, f, -f);
        }

        // Make sure the first two pointers (f and g) are regular (not negated)
        let (mut f, mut g, mut h) = (f, g, h);

        // ite(~F,G,H) => ite(F,H,G)
        if f.is_negated() {
            f = -f;
            std::mem::swap(&mut g, &mut h);
        }

        // ite(F,~G,H) => ~ite(F,G,~H)
        let mut n = false;
        if g.is_negated() {
            n = true;
            g = -g;
            h = -h;
        }

        let key = (f, g, h);
        if let Some(&res) = self.cache.borrow().get(&key) {
            return if n { -res } else { res };
        }

        // Determine the top variable:
        let mut m = self.variable(f.index());
        let j = self.variable(g.index());
        let k = self.variable(h.index());
        if j != 0 {
            m = m.min(j);
        }
        if k != 0 {
            m = m.min(k);
        }
        assert_ne!(m, 0);

        let (f0, f1) = self.top_cofactors(f, m);
        let (g0, g1) = self.top_cofactors(g, m);
        let (h0, h1) = self.top_cofactors(h, m);

        let e = self.apply_ite(f0, g0, h0);
        let t = self.apply_ite(f1, g1, h1);

        let res = self.mk_node(m, e, t);
        self.cache.borrow_mut().insert(key, res);

        if n {
            -res
        } else {
            res
        }
    }

    pub fn apply_not(&self, f: Ref) -> Ref {
        -f
    }

    pub fn apply_and(&self, u: Ref, v: Ref) -> Ref {
        self.apply_ite(u, v, self.zero)
    }

    pub fn apply_or(&self, u: Ref, v: Ref) -> Ref {
        self.apply_ite(u, self.one, v)
    }

    pub fn apply_xor(&self, u: Ref, v: Ref) -> Ref {
        self.apply_ite(u, -v, v)
    }

    pub fn apply_eq(&self, u: Ref, v: Ref) -> Ref {
        self.apply_ite(u, v, -v)
    }

    pub fn apply_imply(&self, u: Ref, v: Ref) -> Ref {
        self.apply_ite(u, v, self.one)
    }

    pub fn apply_and_many(&self, nodes: impl IntoIterator<Item = Ref>) -> Ref {
        let mut res = self.one;
        for node in nodes {
            res = self.apply_and(res, node);
        }
        res
    }

    pub fn apply_or_many(&self, nodes: impl IntoIterator<Item = Ref>) -> Ref {
        let mut res = self.zero;
        for node in nodes {
            res = self.apply_or(res, node);
        }
        res
    }

    // f|v<-b
    pub fn substitute(&self, f: Ref, v: u32, b: bool) -> Ref {
        let mut cache = HashMap::new();
        self.substitute_(f, v, b, &mut cache)
    }

    fn substitute_(&self, f: Ref, v: u32, b: bool, cache: &mut HashMap<Ref, Ref>) -> Ref {
        assert_ne!(v, 0, "Variable index should not be zero");

        if self.is_terminal(f) {
            return f;
        }

        let i = self.variable(f.index());

        if v < i {
            // 'f' does not depend on 'v'
            return f;
        }

        if v == i {
            return if b {
                self.high_node(f)
            } else {
                self.low_node(f)
            };
        }

        if let Some(&res) = cache.get(&f) {
            return res;
        }

        let low = self.substitute_(self.low_node(f), v, b, cache);
        let high = self.substitute_(self.high_node(f), v, b, cache);
        let res = self.mk_node(i, low, high);
        cache.insert(f, res);
        res
    }

    /// Existential quantification: `∃v. f = f|v<-0 ∨ f|v<-1` for every `v` in `vars`.
    pub fn exists(&self, f: Ref, vars: impl IntoIterator<Item = u32>) -> Ref {
        let mut res = f;
        for v in vars {
            if self.is_terminal(res) {
                break;
            }
            let low = self.substitute(res, v, false);
            let high = self.substitute(res, v, true);
            res = self.apply_or(low, high);
        }
        res
    }

    /// Simultaneously replace every variable `v` in `f` with `map[v]` (when present).
    ///
    /// The map need not be injective: renaming two variables to the same one
    /// substitutes both by it.
    pub fn rename_vars(&self, f: Ref, map: &HashMap<u32, u32>) -> Ref {
        let mut cache = HashMap::new();
        self.rename_vars_(f, map, &mut cache)
    }

    fn rename_vars_(&self, f: Ref, map: &HashMap<u32, u32>, cache: &mut HashMap<Ref, Ref>) -> Ref {
        if self.is_terminal(f) {
            return f;
        }
        if let Some(&res) = cache.get(&f) {
            return res;
        }

        let v = self.variable(f.index());
        let low = self.rename_vars_(self.low_node(f), map, cache);
        let high = self.rename_vars_(self.high_node(f), map, cache);
        let target = map.get(&v).copied().unwrap_or(v);
        let res = self.apply_ite(self.mk_var(target), high, low);
        cache.insert(f, res);
        res
    }

    /// Variables `f` depends on.
    pub fn support(&self, f: Ref) -> BTreeSet<u32> {
        let mut vars = BTreeSet::new();
        for i in self.descendants([f]) {
            let v = self.variable(i);
            if v != 0 {
                vars.insert(v);
            }
        }
        vars
    }

    /// Evaluate `f` under the given assignment.
    pub fn evaluate(&self, f: Ref, assignment: impl Fn(u32) -> bool) -> bool {
        let mut current = f;
        while !self.is_terminal(current) {
            let v = self.variable(current.index());
            current = if assignment(v) {
                self.high_node(current)
            } else {
                self.low_node(current)
            };
        }
        self.is_one(current)
    }

    /// Value of `f` when every variable is false.
    pub fn eval_all_false(&self, f: Ref) -> bool {
        self.evaluate(f, |_| false)
    }

    /// One satisfying cube of `f`, preferring negative literals.
    ///
    /// Variables not mentioned in the cube are free.
    pub fn one_sat(&self, f: Ref) -> Option<Vec<i32>> {
        if self.is_zero(f) {
            return None;
        }

        let mut path = Vec::new();
        let mut current = f;
        while !self.is_one(current) {
            let v = self.variable(current.index()) as i32;
            let low = self.low_node(current);
            if !self.is_zero(low) {
                path.push(-v);
                current = low;
            } else {
                path.push(v);
                current = self.high_node(current);
            }
        }
        Some(path)
    }

    /// All paths to the true terminal, as disjoint cubes of signed literals.
    pub fn paths(&self, f: Ref) -> Vec<Vec<i32>> {
        let mut result = Vec::new();
        let mut path = Vec::new();
        self.paths_(f, &mut path, &mut result);
        result
    }

    fn paths_(&self, f: Ref, path: &mut Vec<i32>, result: &mut Vec<Vec<i32>>) {
        if self.is_zero(f) {
            return;
        }
        if self.is_one(f) {
            result.push(path.clone());
            return;
        }
        let v = self.variable(f.index()) as i32;
        path.push(v);
        self.paths_(self.high_node(f), path, result);
        path.pop();
        path.push(-v);
        self.paths_(self.low_node(f), path, result);
        path.pop();
    }

    pub fn descendants(&self, nodes: impl IntoIterator<Item = Ref>) -> HashSet<usize> {
        let mut visited = HashSet::new();
        let mut queue = VecDeque::from_iter(nodes);

        while let Some(node) = queue.pop_front() {
            let i = node.index();
            if visited.insert(i) && !self.is_terminal(node) {
                queue.push_back(self.low(i));
                queue.push_back(self.high(i));
            }
        }

        visited
    }

    pub fn size(&self, f: Ref) -> u64 {
        let size = self.descendants([f]).len() as u64;
        debug!("size({}) = {}", f, size);
        size
    }

    pub fn to_bracket_string(&self, node: Ref) -> String {
        if self.is_zero(node) {
            return "(0)".to_string();
        } else if self.is_one(node) {
            return "(1)".to_string();
        }

        let v = self.variable(node.index());
        let low = self.low_node(node);
        let high = self.high_node(node);

        format!(
            "{}:(x{}, {}, {})",
            node,
            v,
            self.to_bracket_string(high),
            self.to_bracket_string(low)
        )
    }

    /// Render `f` as a disjunction of its paths.
    ///
    /// `literal(v, positive)` renders a single literal; constants render as `t` and `f`.
    pub fn to_dnf_string(&self, f: Ref, literal: impl Fn(u32, bool) -> String, and: &str, or: &str) -> String {
        if self.is_zero(f) {
            return "f".to_string();
        }
        let cubes = self.paths(f);
        if cubes.iter().any(|c| c.is_empty()) {
            return "t".to_string();
        }
        let terms: Vec<String> = cubes
            .iter()
            .map(|cube| {
                cube.iter()
                    .map(|&lit| literal(lit.unsigned_abs(), lit > 0))
                    .collect::<Vec<_>>()
                    .join(and)
            })
            .collect();
        if terms.len() == 1 {
            terms.into_iter().next().unwrap_or_default()
        } else {
            terms.iter().map(|t| format!("({})", t)).collect::<Vec<_>>().join(or)
        }
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_var() {
        let bdd = Bdd::default();

        let x = bdd.mk_var(1);

        assert_eq!(bdd.variable(x.index()), 1);
        assert_eq!(bdd.high_node(x), bdd.one());
        assert_eq!(bdd.low_node(x), bdd.zero());
    }

    #[test]
    fn test_not_var() {
        let bdd = Bdd::default();

        let x = bdd.mk_var(1);
        let not_x = -x;

        assert_eq!(bdd.variable(not_x.index()), 1);
        assert_eq!(bdd.high_node(not_x), bdd.zero());
        assert_eq!(bdd.low_node(not_x), bdd.one());
    }

    #[test]
    fn test_terminal() {
        let bdd = Bdd::default();

        assert!(bdd.is_terminal(bdd.zero()));
        assert!(bdd.is_zero(bdd.zero()));
        assert!(!bdd.is_one(bdd.zero()));
        assert!(bdd.is_one(bdd.one()));
        assert_eq!(bdd.variable(bdd.one().index()), 0);
    }

    #[test]
    fn test_cube() {
        let bdd = Bdd::default();

        let x1 = bdd.mk_var(1);
        let x2 = bdd.mk_var(2);
        let x3 = bdd.mk_var(3);

        let f = bdd.apply_and(bdd.apply_and(x1, x2), x3);
        assert_eq!(f, bdd.cube([1, 2, 3]));

        let f = bdd.apply_and(bdd.apply_and(x1, -x2), -x3);
        assert_eq!(f, bdd.cube([1, -2, -3]));
    }

    #[test]
    fn test_de_morgan() {
        let bdd = Bdd::default();

        let x = bdd.mk_var(1);
        let y = bdd.mk_var(2);

        assert_eq!(-bdd.apply_and(x, y), bdd.apply_or(-x, -y));
        assert_eq!(-bdd.apply_or(x, y), bdd.apply_and(-x, -y));
    }

    #[test]
    fn test_xor() {
        let bdd = Bdd::default();

        let x = bdd.mk_var(1);
        let y = bdd.mk_var(2);
        let f = bdd.apply_and(x, y);

        assert_eq!(bdd.apply_xor(f, f), bdd.zero());
        assert_eq!(bdd.apply_xor(f, -f), bdd.one());
    }

    #[test]
    fn test_apply_ite() {
        let bdd = Bdd::default();

        let g = bdd.mk_var(2);
        let h = bdd.mk_var(3);
        assert_eq!(bdd.apply_ite(bdd.one(), g, h), g);
        assert_eq!(bdd.apply_ite(bdd.zero(), g, h), h);

        let f = bdd.mk_node(1, bdd.one(), h);
        assert_eq!(bdd.apply_ite(f, f, h), bdd.apply_or(f, h));
        assert_eq!(bdd.apply_ite(f, g, f), bdd.apply_and(f, g));
        assert_eq!(bdd.apply_ite(f, -g, bdd.one()), -bdd.apply_and(f, g));
        assert_eq!(bdd.apply_ite(f, bdd.zero(), f), bdd.zero());

        let f = bdd.mk_var(6);
        let g = bdd.mk_var(7);
        let h = bdd.mk_var(8);
        let result = bdd.mk_node(bdd.variable(f.index()), -g, -h);
        assert_eq!(bdd.apply_ite(-f, -g, -h), result);
    }

    #[test]
    fn test_substitute() {
        let bdd = Bdd::default();

        let x1 = bdd.mk_var(1);
        let x2 = bdd.mk_var(2);
        let x3 = bdd.mk_var(3);

        let f = bdd.apply_or(bdd.apply_eq(x1, x2), x3);
        let f_x2_zero = bdd.substitute(f, 2, false);
        assert_eq!(f_x2_zero, bdd.apply_or(-x1, x3));
    }

    #[test]
    fn test_exists() {
        let bdd = Bdd::default();

        let x1 = bdd.mk_var(1);
        let x2 = bdd.mk_var(2);
        let x3 = bdd.mk_var(3);

        // ∃x2. (x1 ∧ x2) ∨ (x3 ∧ ¬x2) = x1 ∨ x3
        let f = bdd.apply_or(bdd.apply_and(x1, x2), bdd.apply_and(x3, -x2));
        assert_eq!(bdd.exists(f, [2]), bdd.apply_or(x1, x3));

        // ∃x1 x2. x1 ∧ ¬x2 = 1
        let g = bdd.apply_and(x1, -x2);
        assert_eq!(bdd.exists(g, [1, 2]), bdd.one());
        assert_eq!(bdd.exists(bdd.zero(), [1]), bdd.zero());
    }

    #[test]
    fn test_rename_vars() {
        let bdd = Bdd::default();

        let x1 = bdd.mk_var(1);
        let x2 = bdd.mk_var(2);
        let x3 = bdd.mk_var(3);

        // Swap x1 and x3 in (x1 ∧ ¬x3).
        let f = bdd.apply_and(x1, -x3);
        let map = HashMap::from([(1, 3), (3, 1)]);
        assert_eq!(bdd.rename_vars(f, &map), bdd.apply_and(x3, -x1));

        // Merging x1 and x2 into x2 turns (x1 xor x2) into false.
        let g = bdd.apply_xor(x1, x2);
        let merge = HashMap::from([(1, 2)]);
        assert_eq!(bdd.rename_vars(g, &merge), bdd.zero());
    }

    #[test]
    fn test_support_and_evaluate() {
        let bdd = Bdd::default();

        let x1 = bdd.mk_var(1);
        let x4 = bdd.mk_var(4);
        let f = bdd.apply_imply(x1, x4);

        assert_eq!(bdd.support(f), BTreeSet::from([1, 4]));
        assert!(bdd.eval_all_false(f));
        assert!(!bdd.evaluate(f, |v| v == 1));
        assert!(bdd.evaluate(f, |_| true));
    }

    #[test]
    fn test_one_sat_prefers_low() {
        let bdd = Bdd::default();

        let x1 = bdd.mk_var(1);
        let x2 = bdd.mk_var(2);
        let f = bdd.apply_or(x1, x2);

        assert_eq!(bdd.one_sat(f), Some(vec![-1, 2]));
        assert_eq!(bdd.one_sat(bdd.zero()), None);
        assert_eq!(bdd.one_sat(bdd.one()), Some(vec![]));
    }

    #[test]
    fn test_to_dnf_string() {
        let bdd = Bdd::default();

        let x1 = bdd.mk_var(1);
        let x2 = bdd.mk_var(2);
        let name = |v: u32, pos: bool| format!("{}x{}", if pos { "" } else { "!" }, v);

        assert_eq!(bdd.to_dnf_string(bdd.one(), name, "&", "|"), "t");
        assert_eq!(bdd.to_dnf_string(bdd.zero(), name, "&", "|"), "f");
        assert_eq!(bdd.to_dnf_string(bdd.apply_and(x1, -x2), name, "&", "|"), "x1&!x2");
        assert_eq!(bdd.to_dnf_string(bdd.apply_or(x1, x2), name, "&", "|"), "(x1)|(!x1&x2)");
    }

    #[test]
    fn test_paths_are_disjoint_cover() {
        let bdd = Bdd::default();

        let x1 = bdd.mk_var(1);
        let x2 = bdd.mk_var(2);
        let f = bdd.apply_xor(x1, x2);

        let paths = bdd.paths(f);
        assert_eq!(paths.len(), 2);
        let rebuilt = bdd.apply_or_many(paths.iter().map(|c| bdd.cube(c.iter().copied())));
        assert_eq!(rebuilt, f);
    }

    #[test]
    fn test_many_and_hash_consing() {
        // Tiny initial storage: the table has to grow.
        let bdd = Bdd::new(2);

        let vars: Vec<Ref> = (1..=12).map(|v| bdd.mk_var(v)).collect();
        let all = bdd.apply_and_many(vars.iter().copied());
        assert_eq!(all, bdd.cube(1..=12));
        assert_eq!(bdd.apply_and_many([]), bdd.one());

        let parity = vars.iter().fold(bdd.zero(), |acc, &x| bdd.apply_xor(acc, x));
        let before = bdd.num_nodes();
        assert!(before > 12);
        let again = vars.iter().fold(bdd.zero(), |acc, &x| bdd.apply_xor(acc, x));
        assert_eq!(parity, again);
        assert_eq!(bdd.num_nodes(), before);
    }
}
