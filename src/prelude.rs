//! Built-in relations over base-2 numbers, read least significant bit first.
//!
//! | name        | relation        |
//! |-------------|-----------------|
//! | `bin_add`   | `a + b = c`     |
//! | `bin_equal` | `a = b`         |
//! | `bin_less`  | `a < b`         |
//! | `bin_zero`  | `a = 0`         |
//!
//! [`install`] registers them and routes the evaluator's `adder`, `equal` and
//! `less` relations to them.

use std::rc::Rc;

use crate::alphabet::Alphabet;
use crate::automaton::Automaton;
use crate::error::Result;
use crate::ir::automaton;
use crate::program::{NamedPredicate, Program};
use crate::types::Prop;

/// `(automaton, propositions of its arguments)`
pub type Relation = (Automaton, Vec<Prop>);

fn literal(lit: Prop, value: bool) -> i32 {
    let v = lit.id() as i32;
    if value {
        v
    } else {
        -v
    }
}

/// Two states for the carry; the carry must be clear at the end.
pub fn bin_add(alphabet: &Rc<Alphabet>) -> Result<Relation> {
    let (a, b, c) = (alphabet.fresh("a"), alphabet.fresh("b"), alphabet.fresh("c"));
    let bdd = alphabet.bdd();
    let mut aut = Automaton::new(Rc::clone(alphabet));
    let carry = aut.add_state();
    aut.set_accepting(0, true);

    for from in [0, carry] {
        let carry_in = u8::from(from == carry);
        for x in 0..2u8 {
            for y in 0..2u8 {
                let sum = x + y + carry_in;
                let to = if sum >= 2 { carry } else { 0 };
                let cond = bdd.cube([literal(a, x == 1), literal(b, y == 1), literal(c, sum % 2 == 1)]);
                aut.add_edge(from, to, cond);
            }
        }
    }
    aut.add_props([a, b, c]);
    Ok((aut.finish()?, vec![a, b, c]))
}

pub fn bin_equal(alphabet: &Rc<Alphabet>) -> Result<Relation> {
    let (a, b) = (alphabet.fresh("a"), alphabet.fresh("b"));
    let bdd = alphabet.bdd();
    let mut aut = Automaton::new(Rc::clone(alphabet));
    aut.set_accepting(0, true);
    aut.add_edge(0, 0, bdd.apply_eq(alphabet.var(a), alphabet.var(b)));
    aut.add_props([a, b]);
    Ok((aut.finish()?, vec![a, b]))
}

/// The most significant differing bit decides, and it is read last.
pub fn bin_less(alphabet: &Rc<Alphabet>) -> Result<Relation> {
    let (a, b) = (alphabet.fresh("a"), alphabet.fresh("b"));
    let bdd = alphabet.bdd();
    let (va, vb) = (alphabet.var(a), alphabet.var(b));
    let mut aut = Automaton::new(Rc::clone(alphabet));
    let less = aut.add_state();
    aut.set_accepting(less, true);

    let same = bdd.apply_eq(va, vb);
    let a_below = bdd.apply_and(-va, vb);
    let a_above = bdd.apply_and(va, -vb);
    for (from, stay) in [(0, same), (less, same)] {
        aut.add_edge(from, from, stay);
        aut.add_edge(from, less, a_below);
        aut.add_edge(from, 0, a_above);
    }
    aut.add_props([a, b]);
    Ok((aut.finish()?, vec![a, b]))
}

pub fn bin_zero(alphabet: &Rc<Alphabet>) -> Result<Relation> {
    let a = alphabet.fresh("a");
    let mut aut = Automaton::new(Rc::clone(alphabet));
    aut.set_accepting(0, true);
    aut.add_edge(0, 0, -alphabet.var(a));
    aut.add_props([a]);
    Ok((aut.finish()?, vec![a]))
}

fn predicate(name: &str, args: &[&str], (aut, props): Relation) -> NamedPredicate {
    let vars = args.iter().map(|a| a.to_string()).zip(props).collect();
    NamedPredicate::new(name, args, automaton(name, aut, vars))
}

pub fn install(program: &mut Program) -> Result<()> {
    let alphabet = Rc::clone(program.alphabet());
    program.define(predicate("bin_add", &["a", "b", "c"], bin_add(&alphabet)?))?;
    program.define(predicate("bin_equal", &["a", "b"], bin_equal(&alphabet)?))?;
    program.define(predicate("bin_less", &["a", "b"], bin_less(&alphabet)?))?;
    program.define(predicate("bin_zero", &["a"], bin_zero(&alphabet)?))?;

    program.set_alias("adder", "bin_add");
    program.set_alias("equal", "bin_equal");
    program.set_alias("less", "bin_less");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use test_log::test;

    use super::*;
    use crate::automaton::Letter;

    /// LSB-first encoding of several numbers, padded to the same length.
    fn encode(values: &[(Prop, u64)]) -> Vec<Letter> {
        let width = values.iter().map(|&(_, v)| 64 - v.leading_zeros()).max().unwrap_or(0);
        (0..width)
            .map(|i| {
                values
                    .iter()
                    .filter(|&&(_, v)| (v >> i) & 1 == 1)
                    .map(|&(p, _)| p)
                    .collect::<BTreeSet<_>>()
            })
            .collect()
    }

    #[test]
    fn test_bin_add() {
        let alphabet = Rc::new(Alphabet::default());
        let (aut, props) = bin_add(&alphabet).unwrap();
        let (a, b, c) = (props[0], props[1], props[2]);
        for x in 0..8 {
            for y in 0..8 {
                for z in 0..16 {
                    let word = encode(&[(a, x), (b, y), (c, z)]);
                    assert_eq!(aut.accepts(&word), x + y == z, "{} + {} = {}", x, y, z);
                }
            }
        }
    }

    #[test]
    fn test_bin_less_and_equal() {
        let alphabet = Rc::new(Alphabet::default());
        let (less, lp) = bin_less(&alphabet).unwrap();
        let (equal, ep) = bin_equal(&alphabet).unwrap();
        for x in 0..10 {
            for y in 0..10 {
                assert_eq!(less.accepts(&encode(&[(lp[0], x), (lp[1], y)])), x < y);
                assert_eq!(equal.accepts(&encode(&[(ep[0], x), (ep[1], y)])), x == y);
            }
        }
    }

    #[test]
    fn test_padding_is_harmless() {
        let alphabet = Rc::new(Alphabet::default());
        let (aut, props) = bin_add(&alphabet).unwrap();
        let mut word = encode(&[(props[0], 3), (props[1], 1), (props[2], 4)]);
        assert!(aut.accepts(&word));
        word.push(Letter::new());
        word.push(Letter::new());
        assert!(aut.accepts(&word));
    }

    #[test]
    fn test_install_defines_aliases() {
        let mut program = Program::new(crate::config::EvalConfig::default());
        install(&mut program).unwrap();
        for name in ["bin_add", "bin_equal", "bin_less", "bin_zero"] {
            assert!(program.predicate(name).unwrap().memo().is_some(), "{}", name);
        }
        assert_eq!(program.context()["adder"], "bin_add");
    }
}
