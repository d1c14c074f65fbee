//! Errors raised while typing and evaluating programs.

use thiserror::Error;

/// Result type used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("predicate `{name}` expects {expected} argument(s), got {actual}")]
    Arity {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("no matching predicate for `{call}`: {reason}")]
    NoMatchingPredicate { call: String, reason: String },

    #[error("cannot unify `{left}` with `{right}`")]
    Unification { left: String, right: String },

    #[error("malformed restriction on `{var}`: `{predicate}` is not a call with `{var}` as its first argument")]
    MalformedRestriction { var: String, predicate: String },

    #[error("arithmetic type error in `{expr}`: {message}")]
    ArithmeticType { expr: String, message: String },

    #[error("unbound predicate `{0}`")]
    UnboundPredicate(String),

    #[error("unbound variable `{var}` in `{context}`")]
    UnboundVariable { var: String, context: String },

    #[error("predicate `{0}` depends on itself")]
    CyclicPredicate(String),

    #[error("automaton exceeds the state budget ({states} > {limit})")]
    BudgetExceeded { states: usize, limit: usize },

    #[error("format error at line {line}: {message}")]
    Format { line: usize, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn format(line: usize, message: impl Into<String>) -> Self {
        Error::Format {
            line,
            message: message.into(),
        }
    }

    pub(crate) fn arithmetic(expr: impl ToString, message: impl Into<String>) -> Self {
        Error::ArithmeticType {
            expr: expr.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn no_match(call: impl ToString, reason: impl Into<String>) -> Self {
        Error::NoMatchingPredicate {
            call: call.to_string(),
            reason: reason.into(),
        }
    }
}
