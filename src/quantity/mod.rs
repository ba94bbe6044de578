//! Immutable unit-tracked values and their derivation history.
mod ops;
pub mod provenance;
pub mod tracked;

pub use provenance::{NodeRecord, Operation, ProvenanceEntry, ProvenanceRecord, Step};
pub use tracked::{TrackedQuantity, DEFAULT_RELATIVE_TOLERANCE};
