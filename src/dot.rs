//! Automaton to DOT (Graphviz) conversion.
//!
//! The generated DOT output follows these conventions:
//! - **States** are circles, accepting states are double circles
//! - **Initial state** is pointed at by an arrow from an invisible node
//! - **Edges** are labelled with their condition in disjunctive normal form,
//!   using proposition names (`!` for negation, `&` and `|` as connectives)
//!
//! # Examples
//!
//! ```
//! use std::rc::Rc;
//!
//! use autologic::alphabet::Alphabet;
//! use autologic::automaton::Automaton;
//!
//! let alphabet = Rc::new(Alphabet::default());
//! let dot = Automaton::universal(alphabet).to_dot().unwrap();
//! // Write to file and render with: dot -Tpng output.dot -o output.png
//! assert!(dot.starts_with("digraph {"));
//! ```

use std::fmt::Write as _;

use crate::automaton::Automaton;
use crate::types::Prop;

/// Configuration options for DOT output generation.
#[derive(Debug, Clone)]
pub struct DotConfig {
    /// Shape for non-accepting states (default: "circle")
    pub state_shape: &'static str,
    /// Shape for accepting states (default: "doublecircle")
    pub accepting_shape: &'static str,
    /// Render left to right instead of top to bottom (default: true)
    pub horizontal: bool,
}

impl Default for DotConfig {
    fn default() -> Self {
        Self {
            state_shape: "circle",
            accepting_shape: "doublecircle",
            horizontal: true,
        }
    }
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

impl Automaton {
    /// Converts the automaton to DOT format.
    pub fn to_dot(&self) -> Result<String, std::fmt::Error> {
        self.to_dot_with_config(&DotConfig::default())
    }

    /// Converts the automaton to DOT format with custom configuration.
    pub fn to_dot_with_config(&self, config: &DotConfig) -> Result<String, std::fmt::Error> {
        let alphabet = self.alphabet();
        let bdd = alphabet.bdd();

        let mut dot = String::new();
        writeln!(dot, "digraph {{")?;
        if config.horizontal {
            writeln!(dot, "rankdir=LR;")?;
        }
        writeln!(dot, "init [shape=point, style=invis];")?;

        for s in self.states() {
            let shape = if self.is_accepting(s) {
                config.accepting_shape
            } else {
                config.state_shape
            };
            writeln!(dot, "{} [shape={}, label=\"{}\"];", s, shape, s)?;
        }
        writeln!(dot, "init -> {};", self.initial())?;

        for s in self.states() {
            for &(t, cond) in self.edges(s) {
                let label = bdd.to_dnf_string(
                    cond,
                    |v, positive| {
                        let name = alphabet.name(Prop::new(v));
                        if positive {
                            name
                        } else {
                            format!("!{}", name)
                        }
                    },
                    " & ",
                    " | ",
                );
                writeln!(dot, "{} -> {} [label=\"{}\"];", s, t, escape(&label))?;
            }
        }

        writeln!(dot, "}}")?;
        Ok(dot)
    }
}
