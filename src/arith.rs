//! Integer expressions as automata over a result variable.
//!
//! Every value is a relation between its operands and a result variable; the
//! relations come from the context predicates `adder`, `equal` and `less`.

use std::collections::HashMap;

use log::debug;

use crate::automaton::Automaton;
use crate::error::{Error, Result};
use crate::ir::{and, call, eq, exists, exists_in, int, lt, not, var, ArithOp, Node, NodeKind, Type};
use crate::program::{temps_of, IntValue, Program};
use crate::types::Prop;

impl Program {
    fn node_type(node: &Node) -> Type {
        match &node.ty {
            Some(Type::Inferred) | None => Type::Any,
            Some(ty) => ty.clone(),
        }
    }

    pub(crate) fn eval_int(&mut self, node: &Node) -> Result<IntValue> {
        if let Some(n) = node.const_value() {
            return self.constant(n, &Self::node_type(node));
        }
        match &node.kind {
            NodeKind::Var(v) => {
                let prop = self.resolve_var(v)?;
                let mut aut = Automaton::universal(self.alphabet.clone());
                aut.add_props([prop]);
                Ok(IntValue {
                    aut,
                    var: v.clone(),
                    prop,
                    temp: false,
                })
            }
            NodeKind::Arith(op, a, b) => {
                let ty = Self::node_type(node);
                match op {
                    ArithOp::Add => {
                        let x = self.eval_int(a)?;
                        let y = self.eval_int(b)?;
                        self.add_values(x, y, &ty)
                    }
                    ArithOp::Sub => {
                        let x = self.eval_int(a)?;
                        let y = self.eval_int(b)?;
                        self.sub_values(x, y, &ty)
                    }
                    ArithOp::Mul => match (a.const_value(), b.const_value()) {
                        (Some(n), _) => self.mul_const(b, n, &ty),
                        (_, Some(n)) => self.mul_const(a, n, &ty),
                        _ => Err(Error::arithmetic(node, "multiplication needs a constant operand")),
                    },
                    // Closed divisions were folded above.
                    ArithOp::Div => Err(Error::arithmetic(
                        node,
                        "division needs constant operands with an exact quotient",
                    )),
                }
            }
            NodeKind::Int(_) => Err(Error::arithmetic(node, "literal out of range")),
            _ => Err(Error::arithmetic(node, "formula used as an integer")),
        }
    }

    /// Apply a context relation to variables already bound in scope.
    pub(crate) fn relation(&mut self, name: &str, vars: &[&str], types: &[Type]) -> Result<Automaton> {
        let args: Vec<Node> = vars
            .iter()
            .zip(types)
            .map(|(v, ty)| var(*v).with_type(ty.clone()))
            .collect();
        let resolved = self.resolve_call(name, &args, types)?;
        self.apply_call(&resolved)
    }

    /// Conjoin a relation with its operands and project the temporaries away.
    pub(crate) fn combine(&mut self, rel: Automaton, operands: &[IntValue]) -> Result<Automaton> {
        let mut result = rel;
        for value in operands {
            result = result.intersect(&value.aut)?;
        }
        result.project(&temps_of(operands))
    }

    fn result_value(&mut self, rel: Automaton, operands: &[IntValue], var: String, prop: Prop) -> Result<IntValue> {
        let mut aut = self.combine(rel, operands)?;
        aut.add_props([prop]);
        Ok(IntValue {
            aut,
            var,
            prop,
            temp: true,
        })
    }

    /// Temporaries carry the expression type, variables their own.
    fn operand_type(&self, value: &IntValue, ty: &Type) -> Type {
        if value.temp {
            ty.clone()
        } else {
            self.var_type(&value.var).unwrap_or(Type::Any)
        }
    }

    pub(crate) fn add_values(&mut self, x: IntValue, y: IntValue, ty: &Type) -> Result<IntValue> {
        let (name, prop) = self.bind_temp("t");
        let types = [self.operand_type(&x, ty), self.operand_type(&y, ty), ty.clone()];
        let rel = self.relation("adder", &[&x.var, &y.var, &name], &types)?;
        self.result_value(rel, &[x, y], name, prop)
    }

    /// `x - y` as the `c` with `y + c = x`; undefined (empty) when `y > x`.
    pub(crate) fn sub_values(&mut self, x: IntValue, y: IntValue, ty: &Type) -> Result<IntValue> {
        let (name, prop) = self.bind_temp("t");
        let types = [self.operand_type(&y, ty), ty.clone(), self.operand_type(&x, ty)];
        let rel = self.relation("adder", &[&y.var, &name, &x.var], &types)?;
        self.result_value(rel, &[x, y], name, prop)
    }

    /// `n * e` by binary doubling.
    fn mul_const(&mut self, e: &Node, n: u64, ty: &Type) -> Result<IntValue> {
        if n == 0 {
            return self.constant(0, ty);
        }
        let mut pow = self.eval_int(e)?;
        let mut acc: Option<IntValue> = None;
        let mut k = n;
        loop {
            if k & 1 == 1 {
                acc = Some(match acc {
                    None => pow.clone(),
                    Some(a) => self.add_values(a, pow.clone(), ty)?,
                });
            }
            k >>= 1;
            if k == 0 {
                break;
            }
            pow = self.add_values(pow.clone(), pow, ty)?;
        }
        acc.ok_or_else(|| Error::arithmetic(e, "empty product"))
    }

    /// Automaton of the constant `n` of type `ty`, memoized per `(n, ty)`.
    pub(crate) fn constant(&mut self, n: u64, ty: &Type) -> Result<IntValue> {
        let key = (n, ty.clone());
        if let Some(memo) = self.constants.get(&key).cloned() {
            return Ok(self.rebind(memo));
        }

        let value = match n {
            0 => self.zero(ty)?,
            1 => self.one(ty)?,
            n if n.is_power_of_two() => {
                let half = self.constant(n / 2, ty)?;
                self.add_values(half.clone(), half, ty)?
            }
            n => {
                let high = 1u64 << (63 - n.leading_zeros());
                let a = self.constant(high, ty)?;
                let b = self.constant(n - high, ty)?;
                self.add_values(a, b, ty)?
            }
        };
        debug!("constant {} : {} has {} states", n, ty, value.aut.num_states());
        self.constants.insert(key, value.clone());
        Ok(value)
    }

    /// Automaton of the constant `n` over a single fresh proposition.
    pub fn constant_automaton(&mut self, n: u64, ty: &Type) -> Result<(Automaton, Prop)> {
        let value = self.constant(n, ty)?;
        Ok((value.aut, value.prop))
    }

    /// Same value, bound to a fresh temporary of the current scope.
    fn rebind(&mut self, value: IntValue) -> IntValue {
        let (name, prop) = self.bind_temp("c");
        let mut aut = value.aut.rename(&HashMap::from([(value.prop, prop)]));
        aut.add_props([prop]);
        IntValue {
            aut,
            var: name,
            prop,
            temp: true,
        }
    }

    fn typed(&mut self, name: &str, ty: &Type, aut: Automaton) -> Result<Automaton> {
        match ty.instantiate(name) {
            Some(r) => {
                let restriction = self.eval_call(&r)?;
                aut.intersect(&restriction)
            }
            None => Ok(aut),
        }
    }

    /// Zero is the word of all-zero digits.
    fn zero(&mut self, ty: &Type) -> Result<IntValue> {
        let (name, prop) = self.bind_temp("c");
        let bdd = self.alphabet.bdd();
        let mut aut = Automaton::new(self.alphabet.clone());
        aut.set_accepting(0, true);
        aut.add_edge(0, 0, bdd.apply_not(self.alphabet.var(prop)));
        aut.add_props([prop]);
        let aut = self.typed(&name, ty, aut)?;
        Ok(IntValue {
            aut,
            var: name,
            prop,
            temp: true,
        })
    }

    /// One is the smallest non-zero value of its type.
    fn one(&mut self, ty: &Type) -> Result<IntValue> {
        let (name, prop) = self.bind_temp("c");
        let y = self.temp_name("y");
        let x_node = var(&name).with_type(ty.clone());
        let y_node = var(&y).with_type(ty.clone());
        let zero = int(0).with_type(ty.clone());

        let smaller_nonzero = and(not(eq(y_node.clone(), zero.clone())), lt(y_node, x_node.clone()));
        let none_smaller = not(match ty.instantiate(&y) {
            Some(guard) => exists_in(&y, guard, smaller_nonzero),
            None => exists(&y, smaller_nonzero),
        });
        let mut formula = and(not(eq(x_node, zero)), none_smaller);
        if let Some(r) = ty.instantiate(&name) {
            formula = and(call(r.name, r.args), formula);
        }

        let mut aut = self.eval(&formula)?;
        aut.add_props([prop]);
        Ok(IntValue {
            aut,
            var: name,
            prop,
            temp: true,
        })
    }
}
