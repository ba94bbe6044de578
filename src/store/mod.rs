//! The unit store: dimension vectors, the built-in unit table, and the
//! process-wide registry that resolves unit expressions against it.
pub mod definitions;
pub mod registry;
pub mod types;

pub use registry::{get_registry, UnitRegistry};
pub use types::{BaseDimension, Dimension, Prefix, Unit, UnitDefinition, UnitTerm};
