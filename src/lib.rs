// Unit-checked quantities with derivation tracking.
//
// `store` owns the process-wide unit registry, `quantity` the immutable
// tracked values built on it, and `checked` the unit contracts that guard
// plain numeric functions. The Python `_core` module lives in `bindings`
// behind the `python` feature.

pub mod analysis;
pub mod checked;
pub mod compute;
pub mod display;
pub mod error;
pub mod quantity;
pub mod store;

#[cfg(feature = "python")]
pub mod bindings;

// --- Public surface ---
pub use checked::{unit_checked, Admitted, Arg, BoundArgs, CallArgs, Checked, Output, Param, UnitSpec, RETURN_KEY};
pub use compute::{convert_all, run_batch};
pub use display::{format_trace, from_audit_json, to_audit_json};
pub use error::{ArgumentError, DimensionalityError, ParseErrorKind, UnitError, UnitParseError};
pub use quantity::{Operation, ProvenanceEntry, Step, TrackedQuantity, DEFAULT_RELATIVE_TOLERANCE};
pub use store::{get_registry, Dimension, Unit, UnitRegistry};
