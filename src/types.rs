//! Type-safe wrapper for atomic propositions.
//!
//! Every proposition of an automaton's alphabet is backed by one BDD variable.
use std::fmt;

/// An atomic proposition (1-indexed), i.e. one bit-label of a variable.
///
/// # Invariants
///
/// - Proposition IDs must be >= 1 (0 is reserved for BDD terminals)
/// - The ID is also the BDD variable index, so smaller IDs are tested first
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Prop(u32);

impl Prop {
    /// Creates a new proposition with the given ID.
    ///
    /// # Panics
    ///
    /// Panics if `id == 0`.
    pub fn new(id: u32) -> Self {
        assert_ne!(id, 0, "Proposition IDs must be >= 1");
        Prop(id)
    }

    /// Returns the raw ID, which is also the BDD variable index.
    pub fn id(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Prop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{}", self.0)
    }
}

impl From<Prop> for u32 {
    fn from(prop: Prop) -> Self {
        prop.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prop() {
        let p = Prop::new(3);
        assert_eq!(p.id(), 3);
        assert_eq!(u32::from(p), 3);
        assert_eq!(p.to_string(), "p3");
    }

    #[test]
    #[should_panic(expected = "Proposition IDs must be >= 1")]
    fn test_zero_prop_panics() {
        Prop::new(0);
    }
}
