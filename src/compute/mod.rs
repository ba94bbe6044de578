//! Parallel evaluation of checked functions and bulk conversions.
pub mod batch;

pub use batch::{convert_all, run_batch};
