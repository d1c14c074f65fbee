//! Evaluation settings.

/// Knobs for a [`Session`][crate::driver::Session].
///
/// ```
/// use autologic::config::EvalConfig;
///
/// let config = EvalConfig::default().with_max_states(10_000).with_optimize(false);
/// assert_eq!(config.max_states, Some(10_000));
/// ```
#[derive(Debug, Clone)]
pub struct EvalConfig {
    /// BDD size (in bits, so the initial storage is `2^storage_bits` nodes).
    pub storage_bits: usize,
    /// Upper bound on the number of states of any intermediate automaton.
    pub max_states: Option<usize>,
    /// Run the simplifier on every predicate body before evaluating it.
    pub optimize: bool,
    /// Fail with `CyclicPredicate` when a predicate re-enters itself.
    pub detect_cycles: bool,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            storage_bits: 16,
            max_states: None,
            optimize: true,
            detect_cycles: true,
        }
    }
}

impl EvalConfig {
    pub fn with_storage_bits(mut self, bits: usize) -> Self {
        self.storage_bits = bits;
        self
    }

    pub fn with_max_states(mut self, limit: usize) -> Self {
        self.max_states = Some(limit);
        self
    }

    pub fn with_optimize(mut self, optimize: bool) -> Self {
        self.optimize = optimize;
        self
    }

    pub fn with_detect_cycles(mut self, detect: bool) -> Self {
        self.detect_cycles = detect;
        self
    }
}
