use crate::analysis::units::format_terms;
use crate::error::{DimensionalityError, UnitParseError};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

/// Number of physical base dimensions tracked by a `Dimension`.
pub const BASE_DIMENSION_COUNT: usize = 7;

/// The basis of the dimension vector, in storage order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BaseDimension {
    Length,
    Mass,
    Time,
    Temperature,
    Current,
    Amount,
    LuminousIntensity,
}

impl BaseDimension {
    pub const ALL: [BaseDimension; BASE_DIMENSION_COUNT] = [
        BaseDimension::Length,
        BaseDimension::Mass,
        BaseDimension::Time,
        BaseDimension::Temperature,
        BaseDimension::Current,
        BaseDimension::Amount,
        BaseDimension::LuminousIntensity,
    ];

    pub fn name(self) -> &'static str {
        match self {
            BaseDimension::Length => "length",
            BaseDimension::Mass => "mass",
            BaseDimension::Time => "time",
            BaseDimension::Temperature => "temperature",
            BaseDimension::Current => "current",
            BaseDimension::Amount => "substance",
            BaseDimension::LuminousIntensity => "luminosity",
        }
    }

    #[inline(always)]
    fn index(self) -> usize {
        self as usize
    }
}

/// Exponents over the seven base dimensions. Two units are compatible iff
/// their dimensions are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Dimension([i32; BASE_DIMENSION_COUNT]);

impl Dimension {
    pub const DIMENSIONLESS: Self = Self::new(0, 0, 0, 0, 0, 0, 0);
    pub const LENGTH: Self = Self::new(1, 0, 0, 0, 0, 0, 0);
    pub const MASS: Self = Self::new(0, 1, 0, 0, 0, 0, 0);
    pub const TIME: Self = Self::new(0, 0, 1, 0, 0, 0, 0);
    pub const TEMPERATURE: Self = Self::new(0, 0, 0, 1, 0, 0, 0);
    pub const CURRENT: Self = Self::new(0, 0, 0, 0, 1, 0, 0);
    pub const AMOUNT: Self = Self::new(0, 0, 0, 0, 0, 1, 0);
    pub const LUMINOUS_INTENSITY: Self = Self::new(0, 0, 0, 0, 0, 0, 1);

    pub const AREA: Self = Self::new(2, 0, 0, 0, 0, 0, 0);
    pub const VOLUME: Self = Self::new(3, 0, 0, 0, 0, 0, 0);
    pub const FREQUENCY: Self = Self::new(0, 0, -1, 0, 0, 0, 0);
    pub const FORCE: Self = Self::new(1, 1, -2, 0, 0, 0, 0);
    pub const PRESSURE: Self = Self::new(-1, 1, -2, 0, 0, 0, 0);
    pub const ENERGY: Self = Self::new(2, 1, -2, 0, 0, 0, 0);
    pub const POWER: Self = Self::new(2, 1, -3, 0, 0, 0, 0);
    pub const CHARGE: Self = Self::new(0, 0, 1, 0, 1, 0, 0);
    pub const VOLTAGE: Self = Self::new(2, 1, -3, 0, -1, 0, 0);
    pub const RESISTANCE: Self = Self::new(2, 1, -3, 0, -2, 0, 0);

    pub const fn new(
        length: i32,
        mass: i32,
        time: i32,
        temperature: i32,
        current: i32,
        amount: i32,
        luminous_intensity: i32,
    ) -> Self {
        Self([length, mass, time, temperature, current, amount, luminous_intensity])
    }

    pub fn exponent(&self, base: BaseDimension) -> i32 {
        self.0[base.index()]
    }

    pub fn is_dimensionless(&self) -> bool {
        self.0.iter().all(|&e| e == 0)
    }

    /// Product of two dimensions, or `None` if an exponent leaves the `i32` range.
    pub fn checked_mul(self, other: Self) -> Option<Self> {
        self.combine(other, i32::checked_add)
    }

    pub fn checked_div(self, other: Self) -> Option<Self> {
        self.combine(other, i32::checked_sub)
    }

    pub fn checked_powi(self, n: i32) -> Option<Self> {
        let mut out = self.0;
        for e in out.iter_mut() {
            *e = e.checked_mul(n)?;
        }
        Some(Self(out))
    }

    fn combine(self, other: Self, op: fn(i32, i32) -> Option<i32>) -> Option<Self> {
        let mut out = self.0;
        for (o, e) in out.iter_mut().zip(other.0) {
            *o = op(*o, e)?;
        }
        Some(Self(out))
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_dimensionless() {
            return f.write_str("dimensionless");
        }
        let terms = BaseDimension::ALL
            .iter()
            .map(|&b| (format!("[{}]", b.name()), self.exponent(b)));
        f.write_str(&format_terms(terms))
    }
}

/// A built-in unit: a symbol with its SI scale factor and dimension.
#[derive(Debug, PartialEq)]
pub struct UnitDefinition {
    pub symbol: &'static str,
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub dimension: Dimension,
    /// Multiplier converting one of this unit into the coherent SI unit.
    pub scale: f64,
    /// Whether SI prefixes (`k`, `m`, ...) may be attached.
    pub prefixable: bool,
}

/// A decimal SI prefix, e.g. `k` / `kilo` = 1e3.
#[derive(Debug, PartialEq)]
pub struct Prefix {
    pub symbol: &'static str,
    pub name: &'static str,
    pub factor: f64,
}

/// One factor of a unit expression, e.g. `mm^2`.
///
/// Holds non-owning references into the static unit table; the table lives
/// as long as the process, like the registry that indexes it.
#[derive(Debug, Clone, Copy)]
pub struct UnitTerm {
    pub prefix: Option<&'static Prefix>,
    pub definition: &'static UnitDefinition,
    pub exponent: i32,
}

impl UnitTerm {
    pub fn symbol(&self) -> String {
        match self.prefix {
            Some(p) => format!("{}{}", p.symbol, self.definition.symbol),
            None => self.definition.symbol.to_string(),
        }
    }

    fn factor(&self) -> f64 {
        self.prefix.map_or(1.0, |p| p.factor) * self.definition.scale
    }
}

impl PartialEq for UnitTerm {
    fn eq(&self, other: &Self) -> bool {
        self.exponent == other.exponent && self.symbol() == other.symbol()
    }
}

/// A resolved unit: canonical product of terms, plus the dimension and SI
/// scale derived from them.
///
/// Units serialize as their canonical expression and are re-resolved through
/// the process registry when deserialized.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Unit {
    terms: SmallVec<[UnitTerm; 4]>,
    dimension: Dimension,
    scale: f64,
}

impl Unit {
    pub fn dimensionless() -> Self {
        Self {
            terms: SmallVec::new(),
            dimension: Dimension::DIMENSIONLESS,
            scale: 1.0,
        }
    }

    /// Builds a unit from raw terms, merging repeated symbols and dropping
    /// zero exponents. Terms are kept sorted by symbol.
    ///
    /// Fails with the symbol whose exponent, or whose contribution to the
    /// dimension, leaves the `i32` range.
    pub(crate) fn from_terms(raw: impl IntoIterator<Item = UnitTerm>) -> Result<Self, String> {
        let mut terms: SmallVec<[UnitTerm; 4]> = SmallVec::new();
        for term in raw {
            match terms.iter_mut().find(|t| t.symbol() == term.symbol()) {
                Some(existing) => {
                    existing.exponent = existing
                        .exponent
                        .checked_add(term.exponent)
                        .ok_or_else(|| term.symbol())?;
                }
                None => terms.push(term),
            }
        }

        let mut dimension = Dimension::DIMENSIONLESS;
        for t in terms.iter().filter(|t| t.exponent != 0) {
            dimension = t
                .definition
                .dimension
                .checked_powi(t.exponent)
                .and_then(|d| dimension.checked_mul(d))
                .ok_or_else(|| t.symbol())?;
        }
        Ok(Self::with_dimension(terms, dimension))
    }

    /// Builds a unit whose dimension is already known.
    pub(crate) fn with_dimension(raw: impl IntoIterator<Item = UnitTerm>, dimension: Dimension) -> Self {
        let mut terms: SmallVec<[UnitTerm; 4]> = raw.into_iter().filter(|t| t.exponent != 0).collect();
        terms.sort_by_key(|t| t.symbol());
        let scale: f64 = terms.iter().map(|t| t.factor().powi(t.exponent)).product();
        Self { terms, dimension, scale }
    }

    pub fn terms(&self) -> &[UnitTerm] {
        &self.terms
    }

    pub fn dimension(&self) -> Dimension {
        self.dimension
    }

    /// Multiplier converting a magnitude in this unit into coherent SI units.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn is_dimensionless(&self) -> bool {
        self.dimension.is_dimensionless()
    }

    pub fn is_compatible(&self, other: &Unit) -> bool {
        self.dimension == other.dimension
    }

    pub fn mul(&self, other: &Unit) -> Result<Unit, DimensionalityError> {
        Unit::from_terms(self.terms.iter().chain(other.terms.iter()).copied())
            .map_err(|symbol| overflow(format!("({})*({})", self, other), symbol))
    }

    pub fn div(&self, other: &Unit) -> Result<Unit, DimensionalityError> {
        let expr = || format!("({})/({})", self, other);
        let mut terms: SmallVec<[UnitTerm; 8]> = self.terms.iter().copied().collect();
        for t in &other.terms {
            let exponent = t.exponent.checked_neg().ok_or_else(|| overflow(expr(), t.symbol()))?;
            terms.push(UnitTerm { exponent, ..*t });
        }
        Unit::from_terms(terms).map_err(|symbol| overflow(expr(), symbol))
    }

    pub fn powi(&self, n: i32) -> Result<Unit, DimensionalityError> {
        let expr = || format!("({})^{}", self, n);
        let mut terms: SmallVec<[UnitTerm; 4]> = SmallVec::new();
        for t in &self.terms {
            let exponent = t.exponent.checked_mul(n).ok_or_else(|| overflow(expr(), t.symbol()))?;
            terms.push(UnitTerm { exponent, ..*t });
        }
        Unit::from_terms(terms).map_err(|symbol| overflow(expr(), symbol))
    }

    /// Raises the unit to a real power. Every resulting exponent must be
    /// integral, so `(m^2)^0.5` is fine but `m^0.5` is not.
    pub fn try_powf(&self, exponent: f64) -> Result<Unit, DimensionalityError> {
        let expr = || format!("({})^{}", self, exponent);
        let mut terms: SmallVec<[UnitTerm; 4]> = SmallVec::new();
        for t in &self.terms {
            let raised = t.exponent as f64 * exponent;
            if !raised.is_finite() || (raised - raised.round()).abs() > 1e-9 {
                return Err(DimensionalityError::NonIntegralPower {
                    unit: self.to_string(),
                    exponent,
                });
            }
            let raised = raised.round();
            if raised < i32::MIN as f64 || raised > i32::MAX as f64 {
                return Err(overflow(expr(), t.symbol()));
            }
            terms.push(UnitTerm {
                exponent: raised as i32,
                ..*t
            });
        }
        Unit::from_terms(terms).map_err(|symbol| overflow(expr(), symbol))
    }
}

fn overflow(expr: String, symbol: String) -> DimensionalityError {
    DimensionalityError::ExponentOverflow { expr, symbol }
}

impl PartialEq for Unit {
    fn eq(&self, other: &Self) -> bool {
        self.terms == other.terms
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.terms.is_empty() {
            return f.write_str("dimensionless");
        }
        f.write_str(&format_terms(self.terms.iter().map(|t| (t.symbol(), t.exponent))))
    }
}

impl TryFrom<String> for Unit {
    type Error = UnitParseError;

    fn try_from(expr: String) -> Result<Self, Self::Error> {
        super::get_registry().parse(&expr)
    }
}

impl From<Unit> for String {
    fn from(unit: Unit) -> Self {
        unit.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::get_registry;
    use rstest::rstest;

    #[test]
    fn test_dimension_arithmetic() {
        let velocity = Dimension::LENGTH.checked_div(Dimension::TIME).unwrap();
        let accel = velocity.checked_div(Dimension::TIME).unwrap();
        assert_eq!(Dimension::MASS.checked_mul(accel), Some(Dimension::FORCE));
        assert_eq!(Dimension::FORCE.checked_div(Dimension::AREA), Some(Dimension::PRESSURE));
        assert_eq!(Dimension::LENGTH.checked_powi(3), Some(Dimension::VOLUME));
        assert!(Dimension::LENGTH
            .checked_div(Dimension::LENGTH)
            .is_some_and(|d| d.is_dimensionless()));
    }

    #[test]
    fn test_dimension_arithmetic_detects_overflow() {
        let huge = Dimension::LENGTH.checked_powi(i32::MAX).unwrap();
        assert_eq!(huge.checked_mul(Dimension::LENGTH), None);
        assert_eq!(Dimension::AREA.checked_powi(i32::MAX), None);
        assert_eq!(huge.checked_powi(-1).and_then(|d| d.checked_div(Dimension::AREA)), None);
    }

    #[test]
    fn test_dimension_display() {
        assert_eq!(Dimension::PRESSURE.to_string(), "[mass]/([length]*[time]^2)");
        assert_eq!(Dimension::LENGTH.to_string(), "[length]");
        assert_eq!(Dimension::DIMENSIONLESS.to_string(), "dimensionless");
    }

    #[test]
    fn test_unit_terms_merge_and_cancel() {
        let reg = get_registry();
        let m = reg.parse("m").unwrap();
        let area = m.mul(&m).unwrap();
        assert_eq!(area.to_string(), "m^2");
        assert_eq!(area.dimension(), Dimension::AREA);

        let back = area.div(&m).unwrap();
        assert_eq!(back, m);
        let ratio = area.div(&area).unwrap();
        assert!(ratio.is_dimensionless());
        assert_eq!(ratio.to_string(), "dimensionless");
    }

    #[test]
    fn test_unit_scale_composes() {
        let reg = get_registry();
        let mm2 = reg.parse("mm^2").unwrap();
        assert!((mm2.scale() - 1e-6).abs() < 1e-18);
        let kpa = reg.parse("kN/m^2").unwrap();
        assert!((kpa.scale() - 1e3).abs() < 1e-9);
        assert_eq!(kpa.dimension(), Dimension::PRESSURE);
    }

    #[test]
    fn test_unit_powf_requires_integral_exponents() {
        let reg = get_registry();
        let area = reg.parse("m^2").unwrap();
        assert_eq!(area.try_powf(0.5).unwrap(), reg.parse("m").unwrap());

        let err = reg.parse("m").unwrap().try_powf(0.5).unwrap_err();
        assert!(matches!(err, DimensionalityError::NonIntegralPower { .. }));
    }

    #[rstest]
    #[case("m^2", Power::Int(i32::MAX))]
    #[case("m^2", Power::Int(i32::MIN))]
    #[case("m", Power::Real(1e12))]
    #[case("m", Power::Real(-3e9))]
    #[case("m^2147483647", Power::Mul("m"))]
    #[case("m^2147483647", Power::Mul("km"))]
    #[case("s^-2147483647", Power::Div("s^2"))]
    fn test_unit_algebra_rejects_exponent_overflow(#[case] base: &str, #[case] op: Power) {
        let reg = get_registry();
        let unit = reg.parse(base).unwrap();
        let result = match op {
            Power::Int(n) => unit.powi(n),
            Power::Real(x) => unit.try_powf(x),
            Power::Mul(rhs) => unit.mul(&reg.parse(rhs).unwrap()),
            Power::Div(rhs) => unit.div(&reg.parse(rhs).unwrap()),
        };
        assert!(
            matches!(result, Err(DimensionalityError::ExponentOverflow { .. })),
            "{} {:?} gave {:?}",
            base,
            op,
            result
        );
    }

    #[derive(Debug)]
    enum Power {
        Int(i32),
        Real(f64),
        Mul(&'static str),
        Div(&'static str),
    }

    #[test]
    fn test_unit_serializes_as_expression() {
        let unit = get_registry().parse("N/m^2").unwrap();
        let json = serde_json::to_string(&unit).unwrap();
        assert_eq!(json, "\"N/m^2\"");
        let back: Unit = serde_json::from_str(&json).unwrap();
        assert_eq!(back, unit);

        assert!(serde_json::from_str::<Unit>("\"furlongs_per_fortnight\"").is_err());
    }
}
