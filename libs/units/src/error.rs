use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    #[error("invalid unit syntax at byte {pos}: {message}")]
    Syntax { pos: usize, message: &'static str },

    #[error("unknown unit symbol '{0}'")]
    UnknownUnit(String),

    #[error("unit symbol '{0}' is already declared")]
    DuplicateSymbol(String),

    #[error("cannot apply exponent or combine affine unit '{0}'")]
    AffineExponent(String),

    #[error("incompatible units: '{from}' vs '{to}'")]
    Incompatible { from: String, to: String },

    #[error("cannot take root {root} of unit '{unit}'")]
    NotRootable { unit: String, root: i8 },

    #[error("exponent must be dimensionless, got '{0}'")]
    DimensionedExponent(String),

    #[error("math domain error: {0}")]
    Domain(&'static str),

    #[error("dimension exponent overflow")]
    Overflow,
}
