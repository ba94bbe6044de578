//! JSON audit records for tracked quantities.
use crate::quantity::TrackedQuantity;

/// Serializes `quantity`, including its full derivation graph, as pretty
/// printed JSON.
pub fn to_audit_json(quantity: &TrackedQuantity) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(quantity)
}

/// Restores a quantity written by [`to_audit_json`]. Units are re-resolved
/// against the process registry.
pub fn from_audit_json(text: &str) -> Result<TrackedQuantity, serde_json::Error> {
    serde_json::from_str(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::format_trace;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_audit_record_survives_a_file_round_trip() {
        let load = TrackedQuantity::new(12.0, "kN").unwrap();
        let span = TrackedQuantity::new(4.0, "m").unwrap();
        let moment = load.multiply(&span).unwrap().mul_scalar(0.125).to("kN*m").unwrap();

        let dir = tempdir().unwrap();
        let path = dir.path().join("moment.json");
        fs::write(&path, to_audit_json(&moment).unwrap()).unwrap();

        let restored = from_audit_json(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(restored.magnitude(), moment.magnitude());
        assert_eq!(restored.unit(), moment.unit());
        assert_eq!(restored.provenance(), moment.provenance());
        assert_eq!(format_trace(&restored), format_trace(&moment));
    }

    #[test]
    fn test_unknown_unit_in_record_is_rejected() {
        let text = r#"{"magnitude": 1.0, "unit": "furlong", "provenance": {"nodes": [], "chain": []}}"#;
        let err = from_audit_json(text).unwrap_err();
        assert!(err.to_string().contains("furlong"));
    }
}
