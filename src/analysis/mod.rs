//! Syntax of unit expressions, independent of any symbol table.
pub mod units;

pub use units::{format_terms, parse_expression, ParsedUnit};
