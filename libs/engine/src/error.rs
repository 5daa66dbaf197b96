//! Error types for the evaluation engine

use physcalc_units::Quantity;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Lexical, syntactic and semantic failures. All of them are returned as
/// values together with the unconsumed input; none abort the session.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Unexpected character '{found}' at position {position}")]
    Lexical { position: usize, found: char },

    #[error("Invalid number '{text}' at position {position}")]
    InvalidNumber { position: usize, text: String },

    #[error("Syntax error at position {position}: {message}")]
    Syntax { position: usize, message: String },

    #[error("Unterminated expression at position {position}")]
    Unterminated {
        position: usize,
        /// Best-effort value of what was parsed before the input ran out.
        partial: Option<Quantity>,
    },

    #[error("Empty expression")]
    EmptyExpression,

    #[error(transparent)]
    Unit(#[from] physcalc_units::Error),

    #[error("Unknown identifier: {0}")]
    UnknownIdentifier(String),

    #[error("Function '{name}' expects {expected} argument(s), got {got}")]
    Arity {
        name: String,
        expected: String,
        got: usize,
    },

    #[error("Parameter '{param}' of '{function}' must be convertible to '{unit}'")]
    ParameterUnit {
        function: String,
        param: String,
        unit: String,
    },

    #[error("Maximum call depth of {0} exceeded")]
    RecursionLimit(usize),

    #[error("Expression nested too deeply (max depth: {0})")]
    TooDeep(usize),

    #[error("Evaluation error: {0}")]
    Evaluation(String),

    #[error("Declaration error: {0}")]
    Declaration(String),

    #[error("Cannot read '{path}': {message}")]
    Io { path: String, message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    pub(crate) fn syntax(position: usize, message: impl Into<String>) -> Self {
        Error::Syntax {
            position,
            message: message.into(),
        }
    }

    /// Shifts positional information by `by` bytes, for errors reported by
    /// a parse of a sub-slice.
    pub(crate) fn offset(self, by: usize) -> Self {
        match self {
            Error::Lexical { position, found } => Error::Lexical {
                position: position + by,
                found,
            },
            Error::InvalidNumber { position, text } => Error::InvalidNumber {
                position: position + by,
                text,
            },
            Error::Syntax { position, message } => Error::Syntax {
                position: position + by,
                message,
            },
            Error::Unterminated { position, partial } => Error::Unterminated {
                position: position + by,
                partial,
            },
            other => other,
        }
    }
}
