//! Rewrites applied to predicate bodies before evaluation.

use log::debug;

use crate::ir::{Call, Node, NodeKind, Range};

pub trait Optimizer {
    fn optimize(&mut self, node: Node) -> Node;
}

/// Constant folding and boolean simplification.
#[derive(Debug, Default)]
pub struct Simplifier {
    pub rewrites: usize,
}

impl Simplifier {
    fn boxed(&mut self, node: Box<Node>) -> Box<Node> {
        Box::new(self.simplify(*node))
    }

    fn simplify(&mut self, node: Node) -> Node {
        let ty = node.ty;
        let kind = match node.kind {
            NodeKind::Arith(op, a, b) => NodeKind::Arith(op, self.boxed(a), self.boxed(b)),
            NodeKind::Compare(op, a, b) => NodeKind::Compare(op, self.boxed(a), self.boxed(b)),
            NodeKind::And(a, b) => NodeKind::And(self.boxed(a), self.boxed(b)),
            NodeKind::Or(a, b) => NodeKind::Or(self.boxed(a), self.boxed(b)),
            NodeKind::Not(a) => NodeKind::Not(self.boxed(a)),
            NodeKind::Exists { var, guard, body } => NodeKind::Exists {
                var,
                guard,
                body: self.boxed(body),
            },
            NodeKind::Call(c) => NodeKind::Call(Call {
                name: c.name,
                args: c.args.into_iter().map(|a| self.simplify(a)).collect(),
            }),
            NodeKind::Index { word, index } => NodeKind::Index {
                word,
                index: self.boxed(index),
            },
            NodeKind::RangeEq { left, right } => {
                let mut range = |r: Range| Range {
                    word: r.word,
                    start: self.boxed(r.start),
                    end: self.boxed(r.end),
                };
                let left = range(left);
                NodeKind::RangeEq {
                    left,
                    right: range(right),
                }
            }
            kind => kind,
        };
        self.rewrite(Node { kind, ty })
    }

    /// One rewrite at the root, children already simplified.
    fn rewrite(&mut self, node: Node) -> Node {
        let result = match &node.kind {
            NodeKind::Arith(..) => match node.const_value() {
                Some(n) => Some(Node {
                    kind: NodeKind::Int(n),
                    ty: node.ty.clone(),
                }),
                None => None,
            },
            NodeKind::Not(a) => match &a.kind {
                NodeKind::Not(inner) => Some((**inner).clone()),
                NodeKind::Bool(b) => Some(NodeKind::Bool(!b).into()),
                _ => None,
            },
            NodeKind::And(a, b) => match (&a.kind, &b.kind) {
                (NodeKind::Bool(false), _) | (_, NodeKind::Bool(false)) => Some(NodeKind::Bool(false).into()),
                (NodeKind::Bool(true), _) => Some((**b).clone()),
                (_, NodeKind::Bool(true)) => Some((**a).clone()),
                _ if a == b => Some((**a).clone()),
                _ => None,
            },
            NodeKind::Or(a, b) => match (&a.kind, &b.kind) {
                (NodeKind::Bool(true), _) | (_, NodeKind::Bool(true)) => Some(NodeKind::Bool(true).into()),
                (NodeKind::Bool(false), _) => Some((**b).clone()),
                (_, NodeKind::Bool(false)) => Some((**a).clone()),
                _ if a == b => Some((**a).clone()),
                _ => None,
            },
            _ => None,
        };
        match result {
            Some(simpler) => {
                self.rewrites += 1;
                debug!("simplify {} => {}", node, simpler);
                simpler
            }
            None => node,
        }
    }
}

impl Optimizer for Simplifier {
    fn optimize(&mut self, node: Node) -> Node {
        self.simplify(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{add, and, boolean, call, int, mul, not, or, var, Type};

    #[test]
    fn test_folds_constants_keeping_types() {
        let mut s = Simplifier::default();
        let e = add(int(2), mul(int(3), int(4))).with_type(Type::Any);
        let folded = s.optimize(e);
        assert_eq!(folded, int(14).with_type(Type::Any));
        assert_eq!(s.rewrites, 2);
    }

    #[test]
    fn test_boolean_identities() {
        let mut s = Simplifier::default();
        let p = call("P", vec![var("x")]);
        assert_eq!(s.optimize(not(not(p.clone()))), p);
        assert_eq!(s.optimize(and(boolean(true), p.clone())), p);
        assert_eq!(s.optimize(or(p.clone(), boolean(true))), boolean(true));
        assert_eq!(s.optimize(and(p.clone(), not(boolean(true)))), boolean(false));
        assert_eq!(s.optimize(or(p.clone(), p.clone())), p);
    }

    #[test]
    fn test_leaves_open_terms() {
        let mut s = Simplifier::default();
        let e = add(var("x"), int(1));
        assert_eq!(s.optimize(e.clone()), e);
        assert_eq!(s.rewrites, 0);
    }
}
