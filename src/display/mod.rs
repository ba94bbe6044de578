//! Human- and machine-readable audit output.
pub mod export;
pub mod trace;

pub use export::{from_audit_json, to_audit_json};
pub use trace::format_trace;
