//! Top-level execution of a program: definitions, restrictions and assertions.

use std::fmt::{self, Debug, Display, Formatter};
use std::path::PathBuf;
use std::rc::Rc;

use log::{info, warn};

use crate::automaton::Automaton;
use crate::config::EvalConfig;
use crate::dispatch::TypeDecl;
use crate::error::{Error, Result};
use crate::ir::{automaton, call_of, var, Node};
use crate::program::{NamedPredicate, Program};
use crate::unify::TruthValue;

/// Produces further definitions from the current state of the program.
pub type Generator = Rc<dyn Fn(&mut Program) -> Result<Vec<Definition>>>;

#[derive(Clone)]
pub enum Definition {
    Predicate(NamedPredicate),
    /// `vars` are restricted by `name(var, params...)`.
    Restrict {
        vars: Vec<String>,
        name: String,
        params: Vec<Node>,
    },
    Forget(Vec<String>),
    Type(TypeDecl),
    /// Route calls to `alias` to `target`.
    Context {
        alias: String,
        target: String,
    },
    AssertProp {
        expected: TruthValue,
        name: String,
    },
    /// Write the automaton of a predicate in HOA format.
    Save {
        name: String,
        path: PathBuf,
    },
    /// Define `name(args)` from an automaton in HOA format.
    Load {
        path: PathBuf,
        name: String,
        args: Vec<String>,
    },
    /// Run a nested program sharing this one's propositions and keep its definitions.
    Import(Vec<Definition>),
    Generate(Generator),
}

impl Debug for Definition {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Definition::Predicate(p) => write!(f, "Predicate({}({}))", p.name, p.args.join(", ")),
            Definition::Restrict { vars, name, params } => {
                write!(f, "Restrict({:?}, {}, {:?})", vars, name, params)
            }
            Definition::Forget(vars) => write!(f, "Forget({:?})", vars),
            Definition::Type(decl) => write!(f, "Type({})", decl.pattern),
            Definition::Context { alias, target } => write!(f, "Context({} -> {})", alias, target),
            Definition::AssertProp { expected, name } => write!(f, "AssertProp({} is {})", name, expected),
            Definition::Save { name, path } => write!(f, "Save({} -> {})", name, path.display()),
            Definition::Load { path, name, args } => {
                write!(f, "Load({} <- {}, {:?})", name, path.display(), args)
            }
            Definition::Import(defs) => write!(f, "Import({} definitions)", defs.len()),
            Definition::Generate(_) => write!(f, "Generate"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assertion {
    pub name: String,
    pub expected: TruthValue,
    pub actual: TruthValue,
}

impl Assertion {
    pub fn passed(&self) -> bool {
        self.expected == self.actual
    }
}

#[derive(Debug, Default, Clone)]
pub struct Report {
    pub assertions: Vec<Assertion>,
}

impl Report {
    pub fn passed(&self) -> bool {
        self.assertions.iter().all(|a| a.passed())
    }

    pub fn failures(&self) -> impl Iterator<Item = &Assertion> {
        self.assertions.iter().filter(|a| !a.passed())
    }
}

impl Display for Report {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for a in &self.assertions {
            let status = if a.passed() { "ok" } else { "FAILED" };
            writeln!(f, "{}: expected {}, got {} ... {}", a.name, a.expected, a.actual, status)?;
        }
        let failed = self.failures().count();
        write!(
            f,
            "{} assertion(s), {} passed, {} failed",
            self.assertions.len(),
            self.assertions.len() - failed,
            failed
        )
    }
}

#[derive(Debug)]
pub struct Session {
    program: Program,
    report: Report,
}

impl Session {
    /// Fresh program with the built-in relations installed.
    pub fn new(config: EvalConfig) -> Result<Self> {
        Self::from_program(Program::new(config))
    }

    fn from_program(mut program: Program) -> Result<Self> {
        crate::prelude::install(&mut program)?;
        Ok(Self {
            program,
            report: Report::default(),
        })
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn program_mut(&mut self) -> &mut Program {
        &mut self.program
    }

    pub fn report(&self) -> &Report {
        &self.report
    }

    /// Execute definitions in order; restrictions are dropped once all succeed.
    pub fn run(&mut self, definitions: Vec<Definition>) -> Result<&Report> {
        for def in definitions {
            self.execute(def)?;
        }
        self.program.clear_restrictions();
        Ok(&self.report)
    }

    fn execute(&mut self, def: Definition) -> Result<()> {
        match def {
            Definition::Predicate(pred) => self.program.define(pred),
            Definition::Restrict { vars, name, params } => {
                for v in vars {
                    let mut args = vec![var(&v)];
                    args.extend(params.iter().cloned());
                    self.program
                        .restrictions_mut()
                        .global_restrict(&v, call_of(name.clone(), args))?;
                }
                Ok(())
            }
            Definition::Forget(vars) => {
                for v in vars {
                    self.program.restrictions_mut().forget(&v);
                }
                Ok(())
            }
            Definition::Type(decl) => {
                self.program.add_type(decl);
                Ok(())
            }
            Definition::Context { alias, target } => {
                self.program.set_alias(alias, target);
                Ok(())
            }
            Definition::AssertProp { expected, name } => {
                let actual = self.program.predicate_truth(&name)?;
                let assertion = Assertion { name, expected, actual };
                if assertion.passed() {
                    info!("{} is {}", assertion.name, actual);
                } else {
                    warn!("{} is {}, expected {}", assertion.name, actual, expected);
                }
                self.report.assertions.push(assertion);
                Ok(())
            }
            Definition::Save { name, path } => self.save(&name, &path),
            Definition::Load { path, name, args } => self.load(&path, name, args),
            Definition::Import(defs) => self.import(defs),
            Definition::Generate(generate) => {
                let generated = generate(&mut self.program)?;
                info!("generated {} definition(s)", generated.len());
                for d in generated {
                    self.execute(d)?;
                }
                Ok(())
            }
        }
    }

    fn save(&mut self, name: &str, path: &std::path::Path) -> Result<()> {
        let target = self.program.resolve_alias(name)?;
        self.program.call_predicate(&target, None)?;
        let pred = self
            .program
            .predicate(&target)
            .ok_or_else(|| Error::UnboundPredicate(target.clone()))?;
        let memo = pred.memo().ok_or_else(|| Error::UnboundPredicate(target.clone()))?;
        let aps: Vec<_> = memo.formals.iter().copied().zip(pred.args.iter().cloned()).collect();
        std::fs::write(path, memo.aut.to_hoa_with_aps(&aps))?;
        info!("saved {} to {}", name, path.display());
        Ok(())
    }

    fn load(&mut self, path: &std::path::Path, name: String, args: Vec<String>) -> Result<()> {
        let (aut, aps) = Automaton::load_hoa(self.program.alphabet(), path)?;
        if aps.len() != args.len() {
            return Err(Error::Arity {
                name,
                expected: aps.len(),
                actual: args.len(),
            });
        }
        let vars = args.iter().cloned().zip(aps).collect();
        let arg_names: Vec<&str> = args.iter().map(|a| a.as_str()).collect();
        let body = automaton(name.clone(), aut, vars);
        info!("loaded {} from {}", name, path.display());
        self.program.define(NamedPredicate::new(name, &arg_names, body))
    }

    fn import(&mut self, defs: Vec<Definition>) -> Result<()> {
        let nested = Program::with_alphabet(Rc::clone(self.program.alphabet()), self.program.config().clone());
        let mut session = Session::from_program(nested)?;
        session.run(defs)?;

        let Session { program, report } = session;
        for pred in program.predicates.into_values() {
            self.program.adopt(pred);
        }
        for decl in program.types {
            self.program.add_type(decl);
        }
        for (alias, target) in program.context {
            self.program.set_alias(alias, target);
        }
        self.report.assertions.extend(report.assertions);
        Ok(())
    }

    pub fn truth_value(&mut self, formula: &Node) -> Result<TruthValue> {
        self.program.truth_value(formula)
    }
}
