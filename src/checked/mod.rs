//! Unit contracts for plain numeric functions.
//!
//! A [`UnitSpec`] is built once with [`unit_checked`] and turned into a
//! [`Checked`] callable with [`UnitSpec::wrap`].
pub mod args;
pub mod spec;
pub mod wrapper;

pub use args::{Arg, BoundArgs, CallArgs, Param};
pub use spec::{unit_checked, Admitted, UnitSpec, RETURN_KEY};
pub use wrapper::{Checked, Output};
