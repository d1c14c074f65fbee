//! Typed intermediate representation of formulas and integer expressions.
//!
//! Trees are immutable and own their children, so structural equality and
//! hashing are well defined; both are used as cache keys.

use std::fmt::{self, Display, Formatter};
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use crate::automaton::Automaton;
use crate::error::{Error, Result};
use crate::types::Prop;

/// Canonical name of the constrained variable inside a [`Type::Restriction`].
pub const SELF_VAR: &str = "__self";

/// Prefix reserved for variables introduced by the evaluator itself.
pub const TEMP_PREFIX: &str = "__";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Eq,
    Less,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Call {
    pub name: String,
    pub args: Vec<Node>,
}

/// Half-open range `word[start..end]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Range {
    pub word: String,
    pub start: Box<Node>,
    pub end: Box<Node>,
}

/// A pre-built automaton, with the propositions standing for each variable.
#[derive(Clone)]
pub struct AutomatonLiteral {
    pub name: String,
    pub aut: Rc<Automaton>,
    pub vars: Vec<(String, Prop)>,
}

impl PartialEq for AutomatonLiteral {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && Rc::ptr_eq(&self.aut, &other.aut) && self.vars == other.vars
    }
}

impl Eq for AutomatonLiteral {}

impl Hash for AutomatonLiteral {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        std::ptr::hash(Rc::as_ptr(&self.aut), state);
        self.vars.hash(state);
    }
}

impl fmt::Debug for AutomatonLiteral {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("AutomatonLiteral")
            .field("name", &self.name)
            .field("states", &self.aut.num_states())
            .field("vars", &self.vars)
            .finish()
    }
}

/// The domain of a variable or an integer expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    /// No constraint.
    Any,
    /// Placeholder during inference.
    Inferred,
    /// Constrained by a call whose first argument is [`SELF_VAR`].
    Restriction(Call),
}

impl Type {
    /// Type of `var` as constrained by `call`, which must be `name(var, ...)`.
    pub fn restriction(var: &str, call: &Call) -> Result<Type> {
        match call.args.first() {
            Some(Node {
                kind: NodeKind::Var(first),
                ..
            }) if first == var => {
                let args = call.args.iter().map(|a| a.substitute(var, SELF_VAR)).collect();
                Ok(Type::Restriction(Call {
                    name: call.name.clone(),
                    args,
                }))
            }
            _ => Err(Error::MalformedRestriction {
                var: var.to_string(),
                predicate: call.to_string(),
            }),
        }
    }

    /// The restricting call applied to `var`.
    pub fn instantiate(&self, var: &str) -> Option<Call> {
        match self {
            Type::Restriction(call) => Some(Call {
                name: call.name.clone(),
                args: call.args.iter().map(|a| a.substitute(SELF_VAR, var)).collect(),
            }),
            _ => None,
        }
    }
}

impl Display for Type {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Type::Any => write!(f, "any"),
            Type::Inferred => write!(f, "?"),
            Type::Restriction(call) => write!(f, "{}", call),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Var(String),
    Int(u64),
    Bool(bool),
    Arith(ArithOp, Box<Node>, Box<Node>),
    Compare(CompareOp, Box<Node>, Box<Node>),
    And(Box<Node>, Box<Node>),
    Or(Box<Node>, Box<Node>),
    Not(Box<Node>),
    Exists {
        var: String,
        guard: Option<Call>,
        body: Box<Node>,
    },
    Call(Call),
    Automaton(AutomatonLiteral),
    /// `word[index]`
    Index {
        word: String,
        index: Box<Node>,
    },
    /// `left = right` over two word ranges.
    RangeEq {
        left: Range,
        right: Range,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Node {
    pub kind: NodeKind,
    pub ty: Option<Type>,
}

impl From<NodeKind> for Node {
    fn from(kind: NodeKind) -> Self {
        Node { kind, ty: None }
    }
}

impl Node {
    pub fn with_type(mut self, ty: Type) -> Self {
        self.ty = Some(ty);
        self
    }

    /// Whether the node denotes a formula (as opposed to an integer).
    pub fn is_formula(&self) -> bool {
        !matches!(self.kind, NodeKind::Var(_) | NodeKind::Int(_) | NodeKind::Arith(..))
    }

    /// Value of a closed arithmetic expression over literals.
    pub fn const_value(&self) -> Option<u64> {
        match &self.kind {
            NodeKind::Int(n) => Some(*n),
            NodeKind::Arith(op, a, b) => {
                let (a, b) = (a.const_value()?, b.const_value()?);
                match op {
                    ArithOp::Add => a.checked_add(b),
                    ArithOp::Sub => a.checked_sub(b),
                    ArithOp::Mul => a.checked_mul(b),
                    ArithOp::Div => (b != 0 && a % b == 0).then(|| a / b),
                }
            }
            _ => None,
        }
    }

    /// Replace free occurrences of the variable `from` with `to`.
    pub fn substitute(&self, from: &str, to: &str) -> Node {
        let sub = |n: &Node| Box::new(n.substitute(from, to));
        let sub_call = |c: &Call| Call {
            name: c.name.clone(),
            args: c.args.iter().map(|a| a.substitute(from, to)).collect(),
        };
        let sub_name = |w: &String| if w == from { to.to_string() } else { w.clone() };
        let kind = match &self.kind {
            NodeKind::Var(v) => NodeKind::Var(sub_name(v)),
            NodeKind::Int(_) | NodeKind::Bool(_) | NodeKind::Automaton(_) => self.kind.clone(),
            NodeKind::Arith(op, a, b) => NodeKind::Arith(*op, sub(a), sub(b)),
            NodeKind::Compare(op, a, b) => NodeKind::Compare(*op, sub(a), sub(b)),
            NodeKind::And(a, b) => NodeKind::And(sub(a), sub(b)),
            NodeKind::Or(a, b) => NodeKind::Or(sub(a), sub(b)),
            NodeKind::Not(a) => NodeKind::Not(sub(a)),
            NodeKind::Exists { var, guard, body } => {
                if var == from {
                    self.kind.clone()
                } else {
                    NodeKind::Exists {
                        var: var.clone(),
                        guard: guard.as_ref().map(sub_call),
                        body: sub(body),
                    }
                }
            }
            NodeKind::Call(c) => NodeKind::Call(sub_call(c)),
            NodeKind::Index { word, index } => NodeKind::Index {
                word: sub_name(word),
                index: sub(index),
            },
            NodeKind::RangeEq { left, right } => {
                let sub_range = |r: &Range| Range {
                    word: sub_name(&r.word),
                    start: sub(&r.start),
                    end: sub(&r.end),
                };
                NodeKind::RangeEq {
                    left: sub_range(left),
                    right: sub_range(right),
                }
            }
        };
        Node { kind, ty: self.ty.clone() }
    }
}

impl Display for Call {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, a) in self.args.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", a)?;
        }
        write!(f, ")")
    }
}

impl Display for Range {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}..{}]", self.word, self.start, self.end)
    }
}

impl Display for Node {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.kind {
            NodeKind::Var(v) => write!(f, "{}", v),
            NodeKind::Int(n) => write!(f, "{}", n),
            NodeKind::Bool(b) => write!(f, "{}", b),
            NodeKind::Arith(op, a, b) => {
                let op = match op {
                    ArithOp::Add => "+",
                    ArithOp::Sub => "-",
                    ArithOp::Mul => "*",
                    ArithOp::Div => "/",
                };
                write!(f, "({} {} {})", a, op, b)
            }
            NodeKind::Compare(CompareOp::Eq, a, b) => write!(f, "{} = {}", a, b),
            NodeKind::Compare(CompareOp::Less, a, b) => write!(f, "{} < {}", a, b),
            NodeKind::And(a, b) => write!(f, "({} & {})", a, b),
            NodeKind::Or(a, b) => write!(f, "({} | {})", a, b),
            NodeKind::Not(a) => write!(f, "!{}", a),
            NodeKind::Exists { var, guard, body } => match guard {
                Some(g) => write!(f, "(exists {}: {}. {})", var, g, body),
                None => write!(f, "(exists {}. {})", var, body),
            },
            NodeKind::Call(c) => write!(f, "{}", c),
            NodeKind::Automaton(lit) => write!(f, "<automaton {}>", lit.name),
            NodeKind::Index { word, index } => write!(f, "{}[{}]", word, index),
            NodeKind::RangeEq { left, right } => write!(f, "{} = {}", left, right),
        }
    }
}

// Builders.

pub fn var(name: impl Into<String>) -> Node {
    NodeKind::Var(name.into()).into()
}

pub fn int(n: u64) -> Node {
    NodeKind::Int(n).into()
}

pub fn boolean(b: bool) -> Node {
    NodeKind::Bool(b).into()
}

pub fn arith(op: ArithOp, a: Node, b: Node) -> Node {
    NodeKind::Arith(op, Box::new(a), Box::new(b)).into()
}

pub fn add(a: Node, b: Node) -> Node {
    arith(ArithOp::Add, a, b)
}

pub fn sub(a: Node, b: Node) -> Node {
    arith(ArithOp::Sub, a, b)
}

pub fn mul(a: Node, b: Node) -> Node {
    arith(ArithOp::Mul, a, b)
}

pub fn div(a: Node, b: Node) -> Node {
    arith(ArithOp::Div, a, b)
}

pub fn eq(a: Node, b: Node) -> Node {
    NodeKind::Compare(CompareOp::Eq, Box::new(a), Box::new(b)).into()
}

pub fn lt(a: Node, b: Node) -> Node {
    NodeKind::Compare(CompareOp::Less, Box::new(a), Box::new(b)).into()
}

pub fn le(a: Node, b: Node) -> Node {
    or(lt(a.clone(), b.clone()), eq(a, b))
}

pub fn gt(a: Node, b: Node) -> Node {
    lt(b, a)
}

pub fn ge(a: Node, b: Node) -> Node {
    le(b, a)
}

pub fn ne(a: Node, b: Node) -> Node {
    not(eq(a, b))
}

pub fn and(a: Node, b: Node) -> Node {
    NodeKind::And(Box::new(a), Box::new(b)).into()
}

pub fn or(a: Node, b: Node) -> Node {
    NodeKind::Or(Box::new(a), Box::new(b)).into()
}

pub fn not(a: Node) -> Node {
    NodeKind::Not(Box::new(a)).into()
}

pub fn implies(a: Node, b: Node) -> Node {
    or(not(a), b)
}

/// Equivalence of two formulas.
pub fn iff(a: Node, b: Node) -> Node {
    eq(a, b)
}

pub fn exists(v: impl Into<String>, body: Node) -> Node {
    NodeKind::Exists {
        var: v.into(),
        guard: None,
        body: Box::new(body),
    }
    .into()
}

/// `exists v: guard. body`, where `guard` is a call with `v` as its first argument.
pub fn exists_in(v: impl Into<String>, guard: Call, body: Node) -> Node {
    NodeKind::Exists {
        var: v.into(),
        guard: Some(guard),
        body: Box::new(body),
    }
    .into()
}

pub fn forall(v: impl Into<String>, body: Node) -> Node {
    not(exists(v, not(body)))
}

pub fn forall_in(v: impl Into<String>, guard: Call, body: Node) -> Node {
    not(exists_in(v, guard, not(body)))
}

pub fn call_of(name: impl Into<String>, args: Vec<Node>) -> Call {
    Call {
        name: name.into(),
        args,
    }
}

pub fn call(name: impl Into<String>, args: Vec<Node>) -> Node {
    NodeKind::Call(call_of(name, args)).into()
}

pub fn index(word: impl Into<String>, i: Node) -> Node {
    NodeKind::Index {
        word: word.into(),
        index: Box::new(i),
    }
    .into()
}

pub fn range(word: impl Into<String>, start: Node, end: Node) -> Range {
    Range {
        word: word.into(),
        start: Box::new(start),
        end: Box::new(end),
    }
}

pub fn range_eq(left: Range, right: Range) -> Node {
    NodeKind::RangeEq { left, right }.into()
}

pub fn automaton(name: impl Into<String>, aut: Automaton, vars: Vec<(String, Prop)>) -> Node {
    NodeKind::Automaton(AutomatonLiteral {
        name: name.into(),
        aut: Rc::new(aut),
        vars,
    })
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let f = exists("y", eq(var("x"), add(var("y"), var("y"))));
        assert_eq!(f.to_string(), "(exists y. x = (y + y))");
        assert_eq!(forall("x", call("P", vec![var("x")])).to_string(), "!(exists x. !P(x))");
        let r = range_eq(range("w", int(0), var("n")), range("v", int(1), var("m")));
        assert_eq!(r.to_string(), "w[0..n] = v[1..m]");
    }

    #[test]
    fn test_substitute_respects_binders() {
        let f = and(
            call("P", vec![var("x")]),
            exists("x", call("Q", vec![var("x"), var("z")])),
        );
        let g = f.substitute("x", "a");
        assert_eq!(g.to_string(), "(P(a) & (exists x. Q(x, z)))");
        let h = f.substitute("z", "b");
        assert_eq!(h.to_string(), "(P(x) & (exists x. Q(x, b)))");
    }

    #[test]
    fn test_restriction_type_is_canonical() {
        let rx = Type::restriction("x", &call_of("Mod", vec![var("x"), int(3)])).unwrap();
        let ry = Type::restriction("y", &call_of("Mod", vec![var("y"), int(3)])).unwrap();
        assert_eq!(rx, ry);
        assert_eq!(rx.instantiate("z").unwrap().to_string(), "Mod(z, 3)");
        assert_eq!(Type::Any.instantiate("z"), None);
    }

    #[test]
    fn test_malformed_restriction() {
        let err = Type::restriction("x", &call_of("Nat", vec![var("y")])).unwrap_err();
        assert!(matches!(err, Error::MalformedRestriction { .. }));
        let err = Type::restriction("x", &call_of("Nat", vec![])).unwrap_err();
        assert!(matches!(err, Error::MalformedRestriction { .. }));
    }

    #[test]
    fn test_const_value() {
        assert_eq!(add(int(2), mul(int(3), int(4))).const_value(), Some(14));
        assert_eq!(sub(int(2), int(3)).const_value(), None);
        assert_eq!(div(int(7), int(2)).const_value(), None);
        assert_eq!(div(int(8), int(2)).const_value(), Some(4));
        assert_eq!(add(var("x"), int(1)).const_value(), None);
    }

    #[test]
    fn test_is_formula() {
        assert!(!var("x").is_formula());
        assert!(!add(int(1), var("x")).is_formula());
        assert!(eq(var("x"), int(1)).is_formula());
        assert!(index("w", var("i")).is_formula());
        assert!(boolean(true).is_formula());
    }
}
