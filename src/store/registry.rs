use super::definitions::{PREFIXES, UNITS};
use super::types::{BaseDimension, Dimension, Prefix, Unit, UnitDefinition, UnitTerm};
use crate::analysis::units::parse_expression;
use crate::error::{DimensionalityError, ParseErrorKind, UnitParseError};
use smallvec::SmallVec;
use std::collections::HashMap;
use std::sync::OnceLock;
use tracing::{debug, trace};

static REGISTRY: OnceLock<UnitRegistry> = OnceLock::new();

/// Returns the process-wide unit registry, building it on first use.
///
/// Every call returns the same instance, including concurrent first calls
/// from several threads. Worker processes each build their own copy; the
/// content is a pure function of the built-in table, so copies agree.
pub fn get_registry() -> &'static UnitRegistry {
    REGISTRY.get_or_init(UnitRegistry::with_builtin_units)
}

/// The symbol table mapping unit strings to definitions, plus the parsing and
/// conversion logic built on it. Read-only once constructed.
#[derive(Debug)]
pub struct UnitRegistry {
    symbols: HashMap<&'static str, &'static UnitDefinition>,
    prefixes: HashMap<&'static str, &'static Prefix>,
}

impl UnitRegistry {
    fn with_builtin_units() -> Self {
        let mut symbols = HashMap::with_capacity(UNITS.len() * 3);
        // Long names go in first so a symbol or alias wins any collision.
        for def in UNITS {
            symbols.insert(def.name, def);
        }
        for def in UNITS {
            symbols.insert(def.symbol, def);
            for &alias in def.aliases {
                symbols.insert(alias, def);
            }
        }

        let mut prefixes = HashMap::with_capacity(PREFIXES.len() * 2);
        for prefix in PREFIXES {
            prefixes.insert(prefix.symbol, prefix);
            prefixes.insert(prefix.name, prefix);
        }

        debug!(
            units = UNITS.len(),
            symbols = symbols.len(),
            prefixes = PREFIXES.len(),
            "unit registry initialised"
        );
        Self { symbols, prefixes }
    }

    /// Number of built-in unit definitions.
    pub fn len(&self) -> usize {
        UNITS.len()
    }

    pub fn is_empty(&self) -> bool {
        UNITS.is_empty()
    }

    /// Canonical symbols of every built-in unit, in table order.
    pub fn symbols(&self) -> impl Iterator<Item = &'static str> {
        UNITS.iter().map(|d| d.symbol)
    }

    /// Looks up an unprefixed symbol, alias or long name.
    pub fn definition(&self, symbol: &str) -> Option<&'static UnitDefinition> {
        self.symbols.get(symbol).copied()
    }

    /// Whether `expr` parses against this registry.
    pub fn contains(&self, expr: &str) -> bool {
        self.parse(expr).is_ok()
    }

    /// Resolves one symbol: an exact symbol, alias or name first, then a
    /// prefix attached to a prefixable unit (`mm`, `kPa`, `millimeter`).
    fn resolve_symbol(&self, symbol: &str) -> Option<(Option<&'static Prefix>, &'static UnitDefinition)> {
        if let Some(def) = self.definition(symbol) {
            return Some((None, def));
        }
        symbol.char_indices().skip(1).find_map(|(split, _)| {
            let (head, tail) = symbol.split_at(split);
            let prefix = self.prefixes.get(head)?;
            let def = self.definition(tail)?;
            def.prefixable.then_some((Some(*prefix), def))
        })
    }

    /// Parses a unit expression such as `"N/m^2"` or `"psi"`.
    pub fn parse(&self, expr: &str) -> Result<Unit, UnitParseError> {
        let parsed = parse_expression(expr)?;
        let mut terms: SmallVec<[UnitTerm; 4]> = SmallVec::new();
        for (symbol, exponent) in parsed.terms() {
            let (prefix, definition) = self.resolve_symbol(symbol).ok_or_else(|| UnitParseError {
                expr: expr.to_string(),
                kind: ParseErrorKind::UnknownSymbol {
                    symbol: symbol.to_string(),
                },
            })?;
            terms.push(UnitTerm {
                prefix,
                definition,
                exponent,
            });
        }
        Unit::from_terms(terms).map_err(|symbol| UnitParseError {
            expr: expr.to_string(),
            kind: ParseErrorKind::ExponentOverflow { symbol },
        })
    }

    /// The coherent SI unit for `dimension`, e.g. `kg/(m*s^2)` for pressure.
    pub fn base_unit(&self, dimension: Dimension) -> Unit {
        const BASE_SYMBOLS: [&str; 7] = ["m", "kg", "s", "K", "A", "mol", "cd"];
        let terms = BaseDimension::ALL
            .iter()
            .zip(BASE_SYMBOLS)
            .filter_map(|(&base, symbol)| {
                Some(UnitTerm {
                    prefix: None,
                    definition: self.definition(symbol)?,
                    exponent: dimension.exponent(base),
                })
            });
        Unit::with_dimension(terms, dimension)
    }

    /// Converts `magnitude` from one unit to another of the same dimension.
    pub fn convert(&self, magnitude: f64, from: &Unit, to: &Unit) -> Result<f64, DimensionalityError> {
        if from.dimension() != to.dimension() {
            return Err(DimensionalityError::Incompatible {
                from: from.to_string(),
                from_dimension: from.dimension(),
                to: to.to_string(),
                to_dimension: to.dimension(),
            });
        }
        let converted = magnitude * (from.scale() / to.scale());
        trace!(%from, %to, magnitude, converted, "converted magnitude");
        Ok(converted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::sync::{Arc, Barrier};
    use std::thread;

    #[test]
    fn test_registry_is_a_singleton() {
        assert!(std::ptr::eq(get_registry(), get_registry()));
    }

    #[test]
    fn test_concurrent_first_access_yields_one_instance() {
        let threads = 8;
        let barrier = Arc::new(Barrier::new(threads));
        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    get_registry() as *const UnitRegistry as usize
                })
            })
            .collect();

        let addresses: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let expected = get_registry() as *const UnitRegistry as usize;
        assert!(addresses.iter().all(|&a| a == expected));
    }

    #[rstest]
    #[case("m", Dimension::LENGTH, 1.0)]
    #[case("mm", Dimension::LENGTH, 1e-3)]
    #[case("millimeter", Dimension::LENGTH, 1e-3)]
    #[case("dam", Dimension::LENGTH, 10.0)]
    #[case("kg", Dimension::MASS, 1.0)]
    #[case("mg", Dimension::MASS, 1e-6)]
    #[case("kPa", Dimension::PRESSURE, 1e3)]
    #[case("MPa", Dimension::PRESSURE, 1e6)]
    #[case("N/m^2", Dimension::PRESSURE, 1.0)]
    #[case("kg*m/s^2", Dimension::FORCE, 1.0)]
    #[case("psi", Dimension::PRESSURE, 6894.757293168361)]
    #[case("ft", Dimension::LENGTH, 0.3048)]
    #[case("h", Dimension::TIME, 3600.0)]
    #[case("ms", Dimension::TIME, 1e-3)]
    #[case("min", Dimension::TIME, 60.0)]
    #[case("mL", Dimension::VOLUME, 1e-6)]
    #[case("mol", Dimension::AMOUNT, 1.0)]
    #[case("cd", Dimension::LUMINOUS_INTENSITY, 1.0)]
    #[case("%", Dimension::DIMENSIONLESS, 0.01)]
    #[case("1", Dimension::DIMENSIONLESS, 1.0)]
    fn test_parse_resolves_dimension_and_scale(
        #[case] expr: &str,
        #[case] dimension: Dimension,
        #[case] scale: f64,
    ) {
        let unit = get_registry().parse(expr).unwrap();
        assert_eq!(unit.dimension(), dimension, "expr: {}", expr);
        assert!(
            ((unit.scale() - scale) / scale).abs() < 1e-12,
            "expr: {}, scale {} != {}",
            expr,
            unit.scale(),
            scale
        );
    }

    #[rstest]
    #[case("not_a_real_unit", "not_a_real_unit")]
    #[case("N/furlong", "furlong")]
    #[case("kkg", "kkg")] // kg is not prefixable
    #[case("kpsi", "kpsi")]
    fn test_parse_rejects_unknown_symbols(#[case] expr: &str, #[case] symbol: &str) {
        let err = get_registry().parse(expr).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::UnknownSymbol { symbol: symbol.into() });
    }

    #[test]
    fn test_equivalent_spellings_share_canonical_form() {
        let reg = get_registry();
        assert_eq!(reg.parse("meter").unwrap(), reg.parse("m").unwrap());
        assert_eq!(reg.parse("m*m").unwrap(), reg.parse("m^2").unwrap());
        assert_eq!(reg.parse("kilopascal").unwrap().to_string(), "kPa");
    }

    #[test]
    fn test_convert_psi_to_pascal() {
        let reg = get_registry();
        let psi = reg.parse("psi").unwrap();
        let pa = reg.parse("Pa").unwrap();
        let converted = reg.convert(10.0, &psi, &pa).unwrap();
        assert!((converted - 68947.57293168361).abs() < 1e-6);
    }

    #[test]
    fn test_convert_rejects_mismatched_dimensions() {
        let reg = get_registry();
        let m = reg.parse("m").unwrap();
        let pa = reg.parse("Pa").unwrap();
        let err = reg.convert(1.0, &m, &pa).unwrap_err();
        match err {
            DimensionalityError::Incompatible { from, to, .. } => {
                assert_eq!(from, "m");
                assert_eq!(to, "Pa");
            }
            other => panic!("Wrong error type: {:?}", other),
        }
    }

    #[test]
    fn test_parse_rejects_dimension_overflow_across_symbols() {
        let err = get_registry().parse("m^2147483647*km").unwrap_err();
        assert!(matches!(err.kind, ParseErrorKind::ExponentOverflow { .. }), "{:?}", err);
        assert!(get_registry().parse("m^2147483647").is_ok());
    }

    #[test]
    fn test_base_unit_for_dimension() {
        let reg = get_registry();
        assert_eq!(reg.base_unit(Dimension::PRESSURE).to_string(), "kg/(m*s^2)");
        assert_eq!(reg.base_unit(Dimension::FORCE).to_string(), "kg*m/s^2");
        assert!(reg.base_unit(Dimension::DIMENSIONLESS).is_dimensionless());
    }

    #[test]
    fn test_definition_lookup() {
        let reg = get_registry();
        assert_eq!(reg.definition("psi").map(|d| d.name), Some("pound_force_per_square_inch"));
        assert_eq!(reg.definition("metre").map(|d| d.symbol), Some("m"));
        assert!(reg.definition("mm").is_none()); // prefixed forms are not definitions
        assert!(reg.contains("mm"));
        assert!(reg.symbols().any(|s| s == "bar"));
        assert_eq!(reg.len(), reg.symbols().count());
    }
}
