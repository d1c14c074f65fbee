//! Proposition registry shared by all automata of a session.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt::Debug;

use log::debug;

use crate::bdd::Bdd;
use crate::error::{Error, Result};
use crate::reference::Ref;
use crate::types::Prop;

/// Owns the BDD manager and the mapping between propositions and their names.
///
/// Every proposition is backed by the BDD variable with the same index.
pub struct Alphabet {
    bdd: Bdd,
    names: RefCell<Vec<String>>,
    by_name: RefCell<HashMap<String, Prop>>,
    max_states: Cell<Option<usize>>,
}

impl Alphabet {
    pub fn new(storage_bits: usize) -> Self {
        Self {
            bdd: Bdd::new(storage_bits),
            names: RefCell::new(Vec::new()),
            by_name: RefCell::new(HashMap::new()),
            max_states: Cell::new(None),
        }
    }
}

impl Default for Alphabet {
    fn default() -> Self {
        Alphabet::new(16)
    }
}

impl Debug for Alphabet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Alphabet")
            .field("props", &self.num_props())
            .field("bdd", &self.bdd)
            .finish()
    }
}

impl Alphabet {
    pub fn bdd(&self) -> &Bdd {
        &self.bdd
    }

    pub fn num_props(&self) -> usize {
        self.names.borrow().len()
    }

    /// Proposition with the given name, creating it if needed.
    pub fn register(&self, name: &str) -> Prop {
        if let Some(&p) = self.by_name.borrow().get(name) {
            return p;
        }
        let mut names = self.names.borrow_mut();
        names.push(name.to_string());
        let p = Prop::new(names.len() as u32);
        self.by_name.borrow_mut().insert(name.to_string(), p);
        debug!("register({}) = {}", name, p);
        p
    }

    pub fn lookup(&self, name: &str) -> Option<Prop> {
        self.by_name.borrow().get(name).copied()
    }

    /// Brand-new proposition, named `hint#k` for the first unused `k`.
    pub fn fresh(&self, hint: &str) -> Prop {
        let base = self.num_props();
        let mut k = base;
        loop {
            let name = format!("{}#{}", hint, k);
            if self.lookup(&name).is_none() {
                return self.register(&name);
            }
            k += 1;
        }
    }

    pub fn name(&self, prop: Prop) -> String {
        self.names.borrow()[prop.id() as usize - 1].clone()
    }

    /// BDD of the single proposition.
    pub fn var(&self, prop: Prop) -> Ref {
        self.bdd.mk_var(prop.id())
    }

    pub fn max_states(&self) -> Option<usize> {
        self.max_states.get()
    }

    pub fn set_max_states(&self, limit: Option<usize>) {
        self.max_states.set(limit);
    }

    /// Fail once an automaton under construction grows past the budget.
    pub fn check_budget(&self, states: usize) -> Result<()> {
        match self.max_states.get() {
            Some(limit) if states > limit => Err(Error::BudgetExceeded { states, limit }),
            _ => Ok(()),
        }
    }
}
