//! # autologic: first-order logic over automatic structures
//!
//! **`autologic`** decides first-order formulas about natural numbers (and anything
//! else encodable as a regular language) by compiling them into finite automata.
//! Numbers are written in base 2, least significant bit first, and a tuple of
//! numbers is read in lockstep: one letter per bit position, one proposition per
//! variable. Every formula denotes the set of tuples satisfying it, so it is
//! represented by the automaton recognizing their encodings.
//!
//! ## How it works
//!
//! - Connectives map to automaton operations: `&` is a product, `|` a union of
//!   completed automata, `!` a complement.
//! - `exists x` projects the proposition of `x` away, then determinizes.
//! - Arithmetic goes through the `adder` relation, and comparisons through
//!   `equal` and `less`. Constants are built from `0` and `1` by doubling.
//! - Named predicates are evaluated once, then renamed at every call site.
//!
//! Edge conditions are Binary Decision Diagrams over the propositions, managed
//! by a shared [`Bdd`][crate::bdd::Bdd] inside the [`Alphabet`][crate::alphabet::Alphabet].
//!
//! ## Basic Usage
//!
//! ```rust
//! use autologic::config::EvalConfig;
//! use autologic::driver::{Definition, Session};
//! use autologic::ir::{add, call, eq, exists, forall, int, or, var};
//! use autologic::program::NamedPredicate;
//! use autologic::unify::TruthValue;
//!
//! let mut session = Session::new(EvalConfig::default()).unwrap();
//!
//! // Even(x) := exists y. x = y + y
//! let even = exists("y", eq(var("x"), add(var("y"), var("y"))));
//! session
//!     .run(vec![Definition::Predicate(NamedPredicate::new("Even", &["x"], even))])
//!     .unwrap();
//!
//! let claim = forall("x", or(call("Even", vec![var("x")]), call("Even", vec![add(var("x"), int(1))])));
//! assert_eq!(session.truth_value(&claim).unwrap(), TruthValue::True);
//! ```
//!
//! ## Core Components
//!
//! - **[`automaton`]**: deterministic automata with BDD-labelled edges.
//! - **[`program`]**: evaluation state, named predicates and queries.
//! - **[`driver`]**: running a list of definitions and assertions.
//! - **[`hoa`]**, **[`dot`]**: reading and writing automata.

pub mod alphabet;
pub mod arith;
pub mod automaton;
pub mod bdd;
pub mod cache;
pub mod config;
pub mod dispatch;
pub mod dot;
pub mod driver;
pub mod error;
pub mod eval;
pub mod hoa;
pub mod infer;
pub mod ir;
pub mod optimize;
pub mod prelude;
pub mod program;
pub mod reference;
pub mod restriction;
pub mod table;
pub mod types;
pub mod unify;
pub mod utils;
