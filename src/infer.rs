//! Type inference over IR trees.
//!
//! Variables take the type of their first visible restriction, literals start
//! out as [`Type::Inferred`], and the operands of arithmetic and comparisons are
//! unified. Whatever is still undetermined at the end becomes [`Type::Any`].

use log::trace;

use crate::error::Result;
use crate::ir::{Call, Node, NodeKind, Range, Type};
use crate::program::Program;
use crate::restriction::Scope;
use crate::unify::unify;

fn type_or_inferred(node: &Node) -> Type {
    node.ty.clone().unwrap_or(Type::Inferred)
}

/// Give `ty` to every still undetermined node of an integer expression.
fn settle(mut node: Node, ty: &Type) -> Node {
    if !matches!(node.ty, None | Some(Type::Inferred)) {
        return node;
    }
    node.ty = Some(ty.clone());
    if let NodeKind::Arith(op, a, b) = node.kind {
        node.kind = NodeKind::Arith(op, Box::new(settle(*a, ty)), Box::new(settle(*b, ty)));
    }
    node
}

/// Replace every remaining [`Type::Inferred`] with [`Type::Any`].
fn default_types(node: Node) -> Node {
    let ty = match node.ty {
        Some(Type::Inferred) => Some(Type::Any),
        other => other,
    };
    let d = |n: Box<Node>| Box::new(default_types(*n));
    let kind = match node.kind {
        NodeKind::Arith(op, a, b) => NodeKind::Arith(op, d(a), d(b)),
        NodeKind::Compare(op, a, b) => NodeKind::Compare(op, d(a), d(b)),
        NodeKind::And(a, b) => NodeKind::And(d(a), d(b)),
        NodeKind::Or(a, b) => NodeKind::Or(d(a), d(b)),
        NodeKind::Not(a) => NodeKind::Not(d(a)),
        NodeKind::Exists { var, guard, body } => NodeKind::Exists { var, guard, body: d(body) },
        NodeKind::Call(c) => NodeKind::Call(Call {
            name: c.name,
            args: c.args.into_iter().map(default_types).collect(),
        }),
        NodeKind::Index { word, index } => NodeKind::Index { word, index: d(index) },
        NodeKind::RangeEq { left, right } => {
            let r = |r: Range| Range {
                word: r.word,
                start: d(r.start),
                end: d(r.end),
            };
            NodeKind::RangeEq {
                left: r(left),
                right: r(right),
            }
        }
        kind => kind,
    };
    Node { kind, ty }
}

impl Program {
    /// Annotate `node` with types under the current restrictions.
    pub fn infer(&mut self, node: &Node) -> Result<Node> {
        let typed = self.infer_node(node)?;
        Ok(default_types(typed))
    }

    fn infer_node(&mut self, node: &Node) -> Result<Node> {
        let kind = match &node.kind {
            NodeKind::Var(v) => {
                let ty = match &node.ty {
                    Some(ty) if *ty != Type::Inferred => ty.clone(),
                    _ => self.var_type(v)?,
                };
                return Ok(node.clone().with_type(ty));
            }
            NodeKind::Int(_) => return Ok(node.clone().with_type(type_or_inferred(node))),
            NodeKind::Bool(_) | NodeKind::Automaton(_) => return Ok(node.clone()),
            NodeKind::Arith(op, a, b) => {
                let (a, b, ty) = self.infer_operands(a, b)?;
                let ty = match &node.ty {
                    Some(t) if *t != Type::Inferred => unify(t, &ty, self)?,
                    _ => ty,
                };
                let a = settle(a, &ty);
                let b = settle(b, &ty);
                return Ok(Node {
                    kind: NodeKind::Arith(*op, Box::new(a), Box::new(b)),
                    ty: Some(ty),
                });
            }
            NodeKind::Compare(op, a, b) => {
                if a.is_formula() || b.is_formula() {
                    NodeKind::Compare(*op, Box::new(self.infer_node(a)?), Box::new(self.infer_node(b)?))
                } else {
                    let (a, b, ty) = self.infer_operands(a, b)?;
                    NodeKind::Compare(*op, Box::new(settle(a, &ty)), Box::new(settle(b, &ty)))
                }
            }
            NodeKind::And(a, b) => NodeKind::And(Box::new(self.infer_node(a)?), Box::new(self.infer_node(b)?)),
            NodeKind::Or(a, b) => NodeKind::Or(Box::new(self.infer_node(a)?), Box::new(self.infer_node(b)?)),
            NodeKind::Not(a) => NodeKind::Not(Box::new(self.infer_node(a)?)),
            NodeKind::Exists { var, guard, body } => {
                let mut scope = self.restriction_scope(Scope::new());
                if let Some(g) = guard {
                    scope.restrictions.restrict(var, g.clone())?;
                }
                NodeKind::Exists {
                    var: var.clone(),
                    guard: guard.clone(),
                    body: Box::new(scope.infer_node(body)?),
                }
            }
            NodeKind::Call(c) => {
                let args = c.args.iter().map(|a| self.infer_node(a)).collect::<Result<Vec<_>>>()?;
                NodeKind::Call(Call {
                    name: c.name.clone(),
                    args,
                })
            }
            NodeKind::Index { word, index } => NodeKind::Index {
                word: word.clone(),
                index: Box::new(self.infer_node(index)?),
            },
            NodeKind::RangeEq { left, right } => NodeKind::RangeEq {
                left: self.infer_range(left)?,
                right: self.infer_range(right)?,
            },
        };
        let result = Node {
            kind,
            ty: node.ty.clone(),
        };
        trace!("infer {}", result);
        Ok(result)
    }

    fn infer_operands(&mut self, a: &Node, b: &Node) -> Result<(Node, Node, Type)> {
        let a = self.infer_node(a)?;
        let b = self.infer_node(b)?;
        let ty = unify(&type_or_inferred(&a), &type_or_inferred(&b), self)?;
        Ok((a, b, ty))
    }

    fn infer_range(&mut self, r: &Range) -> Result<Range> {
        Ok(Range {
            word: r.word.clone(),
            start: Box::new(self.infer_node(&r.start)?),
            end: Box::new(self.infer_node(&r.end)?),
        })
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::config::EvalConfig;
    use crate::error::Error;
    use crate::ir::{add, call, call_of, eq, exists_in, int, var};
    use crate::program::NamedPredicate;

    fn program() -> Program {
        let mut program = Program::new(EvalConfig::default());
        crate::prelude::install(&mut program).unwrap();
        program
    }

    fn even(v: &str) -> Call {
        call_of("Even", vec![var(v)])
    }

    fn define_even(program: &mut Program) {
        let body = crate::ir::exists("y", eq(var("x"), add(var("y"), var("y"))));
        program.define(NamedPredicate::new("Even", &["x"], body)).unwrap();
    }

    #[test]
    fn test_literals_default_to_any() {
        let mut program = program();
        let typed = program.infer(&eq(add(int(1), int(2)), var("x"))).unwrap();
        let NodeKind::Compare(_, lhs, rhs) = &typed.kind else {
            panic!("expected a comparison");
        };
        assert_eq!(lhs.ty, Some(Type::Any));
        assert_eq!(rhs.ty, Some(Type::Any));
        let NodeKind::Arith(_, a, _) = &lhs.kind else {
            panic!("expected a sum");
        };
        assert_eq!(a.ty, Some(Type::Any));
    }

    #[test]
    fn test_literals_take_the_variable_type() {
        let mut program = program();
        define_even(&mut program);
        program.restrictions_mut().global_restrict("e", even("e")).unwrap();

        let typed = program.infer(&eq(var("e"), add(int(1), var("e")))).unwrap();
        let expected = Type::restriction("e", &even("e")).unwrap();
        let NodeKind::Compare(_, lhs, rhs) = &typed.kind else {
            panic!("expected a comparison");
        };
        assert_eq!(lhs.ty.as_ref(), Some(&expected));
        assert_eq!(rhs.ty.as_ref(), Some(&expected));
    }

    #[test]
    fn test_guard_types_the_bound_variable() {
        let mut program = program();
        define_even(&mut program);
        let f = exists_in("e", even("e"), eq(var("e"), int(4)));
        let typed = program.infer(&f).unwrap();
        let NodeKind::Exists { body, .. } = &typed.kind else {
            panic!("expected a quantifier");
        };
        let NodeKind::Compare(_, lhs, _) = &body.kind else {
            panic!("expected a comparison");
        };
        assert_eq!(lhs.ty, Some(Type::restriction("e", &even("e")).unwrap()));
        assert_eq!(program.restrictions().depth(), 0);
    }

    #[test]
    fn test_incompatible_operands() {
        let mut program = program();
        define_even(&mut program);
        program.restrictions_mut().global_restrict("e", even("e")).unwrap();
        // `Even` is not a tautology, so it does not unify with an unrestricted variable.
        let err = program.infer(&eq(var("e"), var("z"))).unwrap_err();
        assert!(matches!(err, Error::Unification { .. }));
        // Call arguments are typed but not unified.
        assert!(program.infer(&call("bin_equal", vec![var("e"), var("z")])).is_ok());
    }
}
