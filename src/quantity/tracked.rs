use super::provenance::{Operation, ProvenanceEntry, ProvenanceRecord, Step};
use crate::error::{DimensionalityError, UnitError, UnitParseError};
use crate::store::{get_registry, Dimension, Unit};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// Relative tolerance used by `try_eq` and `try_cmp` after conversion to a
/// common unit.
pub const DEFAULT_RELATIVE_TOLERANCE: f64 = 1e-9;

/// An immutable magnitude with a unit and the history of how it was derived.
///
/// Every operation returns a new quantity whose provenance is the source's
/// provenance plus exactly one entry. There is no `PartialEq`: comparing
/// quantities of different dimensions must fail, not return `false`, so use
/// [`TrackedQuantity::try_eq`].
///
/// Serializes as magnitude, unit string and a flat [`ProvenanceRecord`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(into = "QuantityRecord", try_from = "QuantityRecord")]
pub struct TrackedQuantity {
    magnitude: f64,
    unit: Unit,
    provenance: Vec<Arc<ProvenanceEntry>>,
}

#[derive(Serialize, Deserialize)]
struct QuantityRecord {
    magnitude: f64,
    unit: Unit,
    provenance: ProvenanceRecord,
}

impl From<TrackedQuantity> for QuantityRecord {
    fn from(q: TrackedQuantity) -> Self {
        Self {
            provenance: ProvenanceRecord::from_chain(&q.provenance),
            magnitude: q.magnitude,
            unit: q.unit,
        }
    }
}

impl TryFrom<QuantityRecord> for TrackedQuantity {
    type Error = String;

    fn try_from(record: QuantityRecord) -> Result<Self, Self::Error> {
        let provenance = record.provenance.into_chain()?;
        if provenance.is_empty() {
            return Err("provenance chain is empty".to_string());
        }
        Ok(Self::with_history(record.magnitude, record.unit, provenance))
    }
}

impl TrackedQuantity {
    /// Parses `unit_expr` through the process registry and starts a fresh
    /// provenance chain.
    pub fn new(magnitude: f64, unit_expr: &str) -> Result<Self, UnitParseError> {
        let unit = get_registry().parse(unit_expr)?;
        let entry = ProvenanceEntry::created(magnitude, unit_expr);
        Ok(Self::with_history(magnitude, unit, vec![Arc::new(entry)]))
    }

    /// Starts a fresh provenance chain for an already resolved unit.
    pub fn from_unit(magnitude: f64, unit: Unit) -> Self {
        let entry = ProvenanceEntry::created(magnitude, unit.to_string());
        Self::with_history(magnitude, unit, vec![Arc::new(entry)])
    }

    pub(crate) fn with_history(magnitude: f64, unit: Unit, provenance: Vec<Arc<ProvenanceEntry>>) -> Self {
        Self {
            magnitude,
            unit,
            provenance,
        }
    }

    pub fn magnitude(&self) -> f64 {
        self.magnitude
    }

    pub fn unit(&self) -> &Unit {
        &self.unit
    }

    pub fn provenance(&self) -> &[Arc<ProvenanceEntry>] {
        &self.provenance
    }

    pub fn dimension(&self) -> Dimension {
        self.unit.dimension()
    }

    pub fn is_compatible(&self, other: &TrackedQuantity) -> bool {
        self.unit.is_compatible(&other.unit)
    }

    /// The most recent provenance entry. Every constructor, deserialization
    /// included, records at least one.
    pub fn provenance_tail(&self) -> Arc<ProvenanceEntry> {
        match self.provenance.last() {
            Some(tail) => Arc::clone(tail),
            None => Arc::new(ProvenanceEntry::created(self.magnitude, self.unit.to_string())),
        }
    }

    fn extended(&self, magnitude: f64, unit: Unit, step: Step, sources: Vec<Arc<ProvenanceEntry>>) -> Self {
        let mut provenance = Vec::with_capacity(self.provenance.len() + 1);
        provenance.extend(self.provenance.iter().cloned());
        provenance.push(Arc::new(ProvenanceEntry::new(step, sources)));
        Self {
            magnitude,
            unit,
            provenance,
        }
    }

    /// A single-source step derived from this quantity's current state.
    fn derived(&self, magnitude: f64, unit: Unit, step: Step) -> Self {
        self.extended(magnitude, unit, step, vec![self.provenance_tail()])
    }

    /// Converts to another unit of the same dimension.
    pub fn to(&self, target_unit_expr: &str) -> Result<Self, UnitError> {
        let target = get_registry().parse(target_unit_expr)?;
        Ok(self.to_unit(&target)?)
    }

    pub fn to_unit(&self, target: &Unit) -> Result<Self, DimensionalityError> {
        let magnitude = get_registry().convert(self.magnitude, &self.unit, target)?;
        let step = Step::Converted {
            from: self.unit.to_string(),
            to: target.to_string(),
            magnitude,
        };
        Ok(self.derived(magnitude, target.clone(), step))
    }

    /// Expresses the quantity in coherent SI base units, e.g. `psi` becomes
    /// `kg/(m*s^2)`.
    pub fn to_base_units(&self) -> Self {
        let base = get_registry().base_unit(self.dimension());
        let magnitude = self.magnitude * (self.unit.scale() / base.scale());
        let step = Step::Converted {
            from: self.unit.to_string(),
            to: base.to_string(),
            magnitude,
        };
        self.derived(magnitude, base, step)
    }

    /// Expresses `other`'s magnitude in this quantity's unit, failing when
    /// the dimensions differ.
    fn aligned_magnitude(&self, other: &TrackedQuantity, operation: Operation) -> Result<f64, DimensionalityError> {
        if self.dimension() != other.dimension() {
            return Err(DimensionalityError::Operands {
                operation,
                lhs: self.unit.to_string(),
                lhs_dimension: self.dimension(),
                rhs: other.unit.to_string(),
                rhs_dimension: other.dimension(),
            });
        }
        get_registry().convert(other.magnitude, &other.unit, &self.unit)
    }

    fn combined(&self, other: &TrackedQuantity, operation: Operation, magnitude: f64, unit: Unit) -> Self {
        let step = Step::Combined {
            operation,
            magnitude,
            unit: unit.to_string(),
        };
        let sources = vec![self.provenance_tail(), other.provenance_tail()];
        self.extended(magnitude, unit, step, sources)
    }

    /// Adds `other`, converting it to this quantity's unit first.
    pub fn try_add(&self, other: &TrackedQuantity) -> Result<Self, DimensionalityError> {
        let rhs = self.aligned_magnitude(other, Operation::Add)?;
        Ok(self.combined(other, Operation::Add, self.magnitude + rhs, self.unit.clone()))
    }

    /// Subtracts `other`, converting it to this quantity's unit first.
    pub fn try_sub(&self, other: &TrackedQuantity) -> Result<Self, DimensionalityError> {
        let rhs = self.aligned_magnitude(other, Operation::Subtract)?;
        Ok(self.combined(other, Operation::Subtract, self.magnitude - rhs, self.unit.clone()))
    }

    /// Multiplies two quantities; the result carries the product unit.
    /// Fails only if a unit exponent leaves the `i32` range.
    pub fn multiply(&self, other: &TrackedQuantity) -> Result<Self, DimensionalityError> {
        let unit = self.unit.mul(&other.unit)?;
        Ok(self.combined(other, Operation::Multiply, self.magnitude * other.magnitude, unit))
    }

    /// Divides two quantities; the result carries the quotient unit.
    pub fn divide(&self, other: &TrackedQuantity) -> Result<Self, DimensionalityError> {
        let unit = self.unit.div(&other.unit)?;
        Ok(self.combined(other, Operation::Divide, self.magnitude / other.magnitude, unit))
    }

    pub fn mul_scalar(&self, factor: f64) -> Self {
        let magnitude = self.magnitude * factor;
        let step = Step::Scaled {
            factor,
            magnitude,
            unit: self.unit.to_string(),
        };
        self.derived(magnitude, self.unit.clone(), step)
    }

    pub fn div_scalar(&self, divisor: f64) -> Self {
        let magnitude = self.magnitude / divisor;
        let step = Step::Scaled {
            factor: divisor.recip(),
            magnitude,
            unit: self.unit.to_string(),
        };
        self.derived(magnitude, self.unit.clone(), step)
    }

    pub fn powi(&self, n: i32) -> Result<Self, DimensionalityError> {
        let unit = self.unit.powi(n)?;
        let magnitude = self.magnitude.powi(n);
        let step = Step::Powered {
            exponent: n as f64,
            magnitude,
            unit: unit.to_string(),
        };
        Ok(self.derived(magnitude, unit, step))
    }

    /// Raises to a real power; fails if any resulting unit exponent would be
    /// fractional (`m^0.5`).
    pub fn powf(&self, exponent: f64) -> Result<Self, DimensionalityError> {
        let unit = self.unit.try_powf(exponent)?;
        let magnitude = self.magnitude.powf(exponent);
        let step = Step::Powered {
            exponent,
            magnitude,
            unit: unit.to_string(),
        };
        Ok(self.derived(magnitude, unit, step))
    }

    /// Equality after expressing `other` in this quantity's unit, within
    /// `DEFAULT_RELATIVE_TOLERANCE`.
    pub fn try_eq(&self, other: &TrackedQuantity) -> Result<bool, DimensionalityError> {
        self.approx_eq(other, DEFAULT_RELATIVE_TOLERANCE)
    }

    pub fn approx_eq(&self, other: &TrackedQuantity, relative_tolerance: f64) -> Result<bool, DimensionalityError> {
        let rhs = self.aligned_magnitude(other, Operation::Compare)?;
        Ok(nearly_equal(self.magnitude, rhs, relative_tolerance))
    }

    /// Orders two quantities of the same dimension. Values equal within
    /// `DEFAULT_RELATIVE_TOLERANCE` compare as `Equal`.
    pub fn try_cmp(&self, other: &TrackedQuantity) -> Result<Ordering, DimensionalityError> {
        let rhs = self.aligned_magnitude(other, Operation::Compare)?;
        if nearly_equal(self.magnitude, rhs, DEFAULT_RELATIVE_TOLERANCE) {
            Ok(Ordering::Equal)
        } else {
            Ok(self.magnitude.total_cmp(&rhs))
        }
    }
}

fn nearly_equal(a: f64, b: f64, relative_tolerance: f64) -> bool {
    a == b || (a - b).abs() <= relative_tolerance * a.abs().max(b.abs())
}

impl fmt::Display for TrackedQuantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.magnitude, self.unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn q(magnitude: f64, unit: &str) -> TrackedQuantity {
        TrackedQuantity::new(magnitude, unit).unwrap()
    }

    #[test]
    fn test_construction_starts_provenance() {
        let thickness = q(10.0, "mm");
        assert_eq!(thickness.magnitude(), 10.0);
        assert_eq!(thickness.unit().to_string(), "mm");
        assert_eq!(thickness.provenance().len(), 1);
        assert_eq!(thickness.provenance()[0].to_string(), "created: 10 mm");
    }

    #[test]
    fn test_construction_rejects_unknown_unit() {
        let err = TrackedQuantity::new(1.0, "not_a_real_unit").unwrap_err();
        assert_eq!(err.expr, "not_a_real_unit");
    }

    #[rstest]
    #[case("mm", "m", 12.5)]
    #[case("psi", "Pa", 10.0)]
    #[case("psi", "kPa", 3.3)]
    #[case("ft", "in", 7.0)]
    #[case("h", "s", 1.5)]
    #[case("N/m^2", "bar", 250_000.0)]
    #[case("kg*m/s^2", "lbf", -4.2)]
    #[case("L", "m^3", 1e-7)]
    #[case("deg", "rad", 180.0)]
    fn test_round_trip_conversion(#[case] from: &str, #[case] to: &str, #[case] magnitude: f64) {
        let back = q(magnitude, from).to(to).unwrap().to(from).unwrap();
        let rel = ((back.magnitude() - magnitude) / magnitude).abs();
        assert!(rel < 1e-9, "{} {} -> {} -> {}: {}", magnitude, from, to, from, back.magnitude());
    }

    #[rstest]
    #[case("m", "Pa")]
    #[case("kg", "m")]
    #[case("s", "Hz")]
    #[case("N", "J")]
    #[case("psi", "N")]
    #[case("1", "m")]
    fn test_conversion_rejects_dimension_mismatch(#[case] from: &str, #[case] to: &str) {
        let original = q(1.0, from);
        let err = original.to(to).unwrap_err();
        assert!(matches!(err, UnitError::Dimensionality(DimensionalityError::Incompatible { .. })));
        // The source quantity is untouched.
        assert_eq!(original.magnitude(), 1.0);
        assert_eq!(original.provenance().len(), 1);
    }

    #[test]
    fn test_conversion_records_step() {
        let thickness = q(10.0, "mm").to("m").unwrap();
        assert!((thickness.magnitude() - 0.01).abs() < 1e-15);
        assert_eq!(thickness.unit().to_string(), "m");
        assert_eq!(thickness.provenance().len(), 2);
        let entry = &thickness.provenance()[1];
        match entry.step() {
            Step::Converted { from, to, .. } => assert_eq!((from.as_str(), to.as_str()), ("mm", "m")),
            other => panic!("Unexpected step: {:?}", other),
        }
        assert!(Arc::ptr_eq(&entry.sources()[0], &thickness.provenance()[0]));
    }

    #[test]
    fn test_provenance_grows_by_one_per_operation() {
        let breadth = q(2.0, "m");
        let mut current = q(10.0, "mm");
        let steps = 5;
        for i in 0..steps {
            current = match i % 5 {
                0 => current.to("m").unwrap(),
                1 => current.try_add(&breadth).unwrap(),
                2 => current.multiply(&breadth).unwrap(),
                3 => current.mul_scalar(3.0),
                _ => current.powi(2).unwrap(),
            };
        }
        assert_eq!(current.provenance().len(), 1 + steps);
    }

    #[test]
    fn test_addition_converts_right_operand() {
        let sum = q(10.0, "mm").try_add(&q(1.0, "m")).unwrap();
        assert!((sum.magnitude() - 1010.0).abs() < 1e-9);
        assert_eq!(sum.unit().to_string(), "mm");

        let diff = q(1.0, "m").try_sub(&q(10.0, "mm")).unwrap();
        assert!((diff.magnitude() - 0.99).abs() < 1e-12);
    }

    #[test]
    fn test_addition_rejects_mismatched_dimensions() {
        let err = q(1.0, "m").try_add(&q(1.0, "kg")).unwrap_err();
        match err {
            DimensionalityError::Operands { operation, lhs, rhs, .. } => {
                assert_eq!(operation, Operation::Add);
                assert_eq!(lhs, "m");
                assert_eq!(rhs, "kg");
            }
            other => panic!("Wrong error type: {:?}", other),
        }
    }

    #[test]
    fn test_division_derives_pressure() {
        let force = q(100.0, "N");
        let area = q(4.0, "m^2");
        let pressure = force.divide(&area).unwrap();
        assert_eq!(pressure.magnitude(), 25.0);
        assert_eq!(pressure.unit().to_string(), "N/m^2");
        assert_eq!(pressure.dimension(), Dimension::PRESSURE);
        assert!(pressure.try_eq(&q(25.0, "Pa")).unwrap());

        let tail = pressure.provenance_tail();
        assert!(matches!(tail.step(), Step::Combined { operation: Operation::Divide, .. }));
        assert!(Arc::ptr_eq(&tail.sources()[0], &force.provenance_tail()));
        assert!(Arc::ptr_eq(&tail.sources()[1], &area.provenance_tail()));
    }

    #[test]
    fn test_multiplication_sums_dimensions() {
        let area = q(3.0, "m").multiply(&q(200.0, "mm")).unwrap();
        assert_eq!(area.dimension(), Dimension::AREA);
        assert!((area.to("m^2").unwrap().magnitude() - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_powers() {
        let side = q(3.0, "m");
        let volume = side.powi(3).unwrap();
        assert_eq!(volume.magnitude(), 27.0);
        assert_eq!(volume.dimension(), Dimension::VOLUME);

        let root = q(16.0, "m^2").powf(0.5).unwrap();
        assert_eq!(root.magnitude(), 4.0);
        assert_eq!(root.unit().to_string(), "m");

        assert!(matches!(
            q(2.0, "m").powf(0.5),
            Err(DimensionalityError::NonIntegralPower { .. })
        ));
    }

    #[test]
    fn test_powers_reject_exponent_overflow() {
        let area = q(1.0, "m^2");
        let err = area.powi(i32::MAX).unwrap_err();
        assert_eq!(
            err,
            DimensionalityError::ExponentOverflow {
                expr: "(m^2)^2147483647".into(),
                symbol: "m".into(),
            }
        );
        assert!(matches!(
            q(1.0, "m").powf(1e12),
            Err(DimensionalityError::ExponentOverflow { .. })
        ));
        // The failed operations leave the source untouched.
        assert_eq!(area.provenance().len(), 1);

        let huge = q(1.0, "m^2147483647");
        assert!(huge.multiply(&q(1.0, "m")).is_err());
        assert!(huge.divide(&q(1.0, "m^-1")).is_err());
        assert!(huge.divide(&huge).unwrap().unit().is_dimensionless());
    }

    #[test]
    fn test_comparison_requires_matching_dimensions() {
        assert!(q(1000.0, "mm").try_eq(&q(1.0, "m")).unwrap());
        assert!(!q(999.0, "mm").try_eq(&q(1.0, "m")).unwrap());
        assert_eq!(q(1.0, "ft").try_cmp(&q(1.0, "m")).unwrap(), Ordering::Less);
        assert_eq!(q(12.0, "in").try_cmp(&q(1.0, "ft")).unwrap(), Ordering::Equal);

        let err = q(1.0, "m").try_eq(&q(1.0, "s")).unwrap_err();
        assert!(matches!(err, DimensionalityError::Operands { operation: Operation::Compare, .. }));
    }

    #[test]
    fn test_base_units() {
        let p = q(1.0, "psi").to_base_units();
        assert_eq!(p.unit().to_string(), "kg/(m*s^2)");
        assert!((p.magnitude() - 6894.757293168361).abs() < 1e-6);
    }

    #[test]
    fn test_display() {
        assert_eq!(q(2.5, "kN/m^2").to_string(), "2.5 kN/m^2");
        assert_eq!(q(0.5, "1").to_string(), "0.5 dimensionless");
    }

    #[test]
    fn test_serde_round_trip_preserves_unit_and_history() {
        let original = q(1.5, "h").to("min").unwrap();
        let json = serde_json::to_string(&original).unwrap();
        let back: TrackedQuantity = serde_json::from_str(&json).unwrap();
        assert_eq!(back.magnitude(), original.magnitude());
        assert_eq!(back.unit(), original.unit());
        assert_eq!(back.provenance(), original.provenance());
    }

    #[test]
    fn test_serde_keeps_operand_histories_shared() {
        let length = q(2.0, "m");
        let product = length.multiply(&q(3.0, "m")).unwrap();
        let json = serde_json::to_value(&product).unwrap();
        // created 2 m, created 3 m, the product; nothing duplicated
        assert_eq!(json["provenance"]["nodes"].as_array().unwrap().len(), 3);

        let back: TrackedQuantity = serde_json::from_value(json).unwrap();
        let tail = back.provenance_tail();
        assert!(Arc::ptr_eq(&tail.sources()[0], &back.provenance()[0]));
        assert_eq!(tail.sources()[1].to_string(), "created: 3 m");
    }

    #[test]
    fn test_deserialize_rejects_dangling_provenance() {
        let json = r#"{"magnitude":1.0,"unit":"m","provenance":{"nodes":[],"chain":[3]}}"#;
        assert!(serde_json::from_str::<TrackedQuantity>(json).is_err());
    }

    #[test]
    fn test_deserialize_rejects_empty_history() {
        let json = r#"{"magnitude":1.0,"unit":"m","provenance":{"nodes":[],"chain":[]}}"#;
        let err = serde_json::from_str::<TrackedQuantity>(json).unwrap_err();
        assert!(err.to_string().contains("provenance chain is empty"), "{}", err);
    }

    #[test]
    fn test_quantities_are_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<TrackedQuantity>();
    }
}
