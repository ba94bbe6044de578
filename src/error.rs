//! Error types for unit parsing, dimensional analysis and checked calls.
use crate::quantity::Operation;
use crate::store::Dimension;
use thiserror::Error;

/// The specific reason a unit expression could not be parsed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseErrorKind {
    #[error("expression is empty")]
    Empty,
    #[error("unexpected character '{ch}' at offset {pos}")]
    UnexpectedChar { ch: char, pos: usize },
    #[error("unexpected '{token}' at offset {pos}")]
    UnexpectedToken { token: String, pos: usize },
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    #[error("unbalanced parenthesis at offset {pos}")]
    UnbalancedParen { pos: usize },
    #[error("invalid exponent '{text}'")]
    InvalidExponent { text: String },
    #[error("unknown unit symbol '{symbol}'")]
    UnknownSymbol { symbol: String },
    #[error("numeric factor '{literal}' is not supported")]
    UnsupportedNumber { literal: String },
    #[error("exponent of '{symbol}' is out of range")]
    ExponentOverflow { symbol: String },
}

/// An unrecognized or malformed unit string. This is a configuration error,
/// never a data error.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("cannot parse unit '{expr}': {kind}")]
pub struct UnitParseError {
    pub expr: String,
    pub kind: ParseErrorKind,
}

/// Two dimension vectors that had to agree did not.
///
/// Always a programming or data error: it is never retried.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DimensionalityError {
    #[error("cannot convert from '{from}' ({from_dimension}) to '{to}' ({to_dimension})")]
    Incompatible {
        from: String,
        from_dimension: Dimension,
        to: String,
        to_dimension: Dimension,
    },
    #[error("parameter '{parameter}' expects '{expected}' ({expected_dimension}) but received '{found}' ({found_dimension})")]
    Parameter {
        parameter: String,
        expected: String,
        expected_dimension: Dimension,
        found: String,
        found_dimension: Dimension,
    },
    #[error("cannot {operation} '{lhs}' ({lhs_dimension}) and '{rhs}' ({rhs_dimension})")]
    Operands {
        operation: Operation,
        lhs: String,
        lhs_dimension: Dimension,
        rhs: String,
        rhs_dimension: Dimension,
    },
    #[error("cannot raise '{unit}' to non-integral power {exponent}")]
    NonIntegralPower { unit: String, exponent: f64 },
    #[error("exponent of '{symbol}' is out of range in '{expr}'")]
    ExponentOverflow { expr: String, symbol: String },
}

/// A checked call whose arguments could not be bound to the wrapped signature.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ArgumentError {
    #[error("{function}() missing required argument '{parameter}'")]
    Missing { function: String, parameter: String },
    #[error("{function}() got an unexpected keyword argument '{parameter}'")]
    UnexpectedKeyword { function: String, parameter: String },
    #[error("{function}() got multiple values for argument '{parameter}'")]
    Duplicate { function: String, parameter: String },
    #[error("{function}() takes {expected} positional arguments but {found} were given")]
    TooManyPositional {
        function: String,
        expected: usize,
        found: usize,
    },
    #[error("parameter '{parameter}' declares unit '{unit}' but received a {found} value")]
    NotNumeric {
        parameter: String,
        unit: String,
        found: &'static str,
    },
    #[error("unit spec declares parameter '{parameter}' more than once")]
    DuplicateSpec { parameter: String },
    #[error("no argument named '{parameter}'")]
    Unknown { parameter: String },
    #[error("argument '{parameter}' is a {found} value, expected {expected}")]
    WrongKind {
        parameter: String,
        expected: &'static str,
        found: &'static str,
    },
}

/// Umbrella error for every fallible operation in the crate.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum UnitError {
    #[error(transparent)]
    Parse(#[from] UnitParseError),
    #[error(transparent)]
    Dimensionality(#[from] DimensionalityError),
    #[error(transparent)]
    Argument(#[from] ArgumentError),
}
