//! The built-in unit table. Registry content is a pure function of these
//! slices, so every process that builds a registry builds the same one.
use super::types::{Dimension, Prefix, UnitDefinition};
use std::f64::consts::PI;

const D: Dimension = Dimension::DIMENSIONLESS;
const L: Dimension = Dimension::LENGTH;
const M: Dimension = Dimension::MASS;
const T: Dimension = Dimension::TIME;

const fn unit(
    symbol: &'static str,
    name: &'static str,
    aliases: &'static [&'static str],
    dimension: Dimension,
    scale: f64,
    prefixable: bool,
) -> UnitDefinition {
    UnitDefinition { symbol, name, aliases, dimension, scale, prefixable }
}

const POUND: f64 = 0.453_592_37;
const STANDARD_GRAVITY: f64 = 9.806_65;
const INCH: f64 = 0.0254;
const POUND_FORCE: f64 = POUND * STANDARD_GRAVITY;
const PSI: f64 = POUND_FORCE / (INCH * INCH);

pub static PREFIXES: &[Prefix] = &[
    Prefix { symbol: "Y", name: "yotta", factor: 1e24 },
    Prefix { symbol: "Z", name: "zetta", factor: 1e21 },
    Prefix { symbol: "E", name: "exa", factor: 1e18 },
    Prefix { symbol: "P", name: "peta", factor: 1e15 },
    Prefix { symbol: "T", name: "tera", factor: 1e12 },
    Prefix { symbol: "G", name: "giga", factor: 1e9 },
    Prefix { symbol: "M", name: "mega", factor: 1e6 },
    Prefix { symbol: "k", name: "kilo", factor: 1e3 },
    Prefix { symbol: "h", name: "hecto", factor: 1e2 },
    Prefix { symbol: "da", name: "deca", factor: 1e1 },
    Prefix { symbol: "d", name: "deci", factor: 1e-1 },
    Prefix { symbol: "c", name: "centi", factor: 1e-2 },
    Prefix { symbol: "m", name: "milli", factor: 1e-3 },
    Prefix { symbol: "u", name: "micro", factor: 1e-6 },
    Prefix { symbol: "µ", name: "micro", factor: 1e-6 },
    Prefix { symbol: "n", name: "nano", factor: 1e-9 },
    Prefix { symbol: "p", name: "pico", factor: 1e-12 },
    Prefix { symbol: "f", name: "femto", factor: 1e-15 },
    Prefix { symbol: "a", name: "atto", factor: 1e-18 },
];

pub static UNITS: &[UnitDefinition] = &[
    // SI base units
    unit("m", "meter", &["metre"], L, 1.0, true),
    unit("g", "gram", &["gramme"], M, 1e-3, true),
    unit("kg", "kilogram", &[], M, 1.0, false),
    unit("s", "second", &["sec"], T, 1.0, true),
    unit("K", "kelvin", &[], Dimension::TEMPERATURE, 1.0, true),
    unit("A", "ampere", &["amp"], Dimension::CURRENT, 1.0, true),
    unit("mol", "mole", &[], Dimension::AMOUNT, 1.0, true),
    unit("cd", "candela", &[], Dimension::LUMINOUS_INTENSITY, 1.0, true),
    // SI derived units
    unit("Hz", "hertz", &[], Dimension::FREQUENCY, 1.0, true),
    unit("N", "newton", &[], Dimension::FORCE, 1.0, true),
    unit("Pa", "pascal", &[], Dimension::PRESSURE, 1.0, true),
    unit("J", "joule", &[], Dimension::ENERGY, 1.0, true),
    unit("W", "watt", &[], Dimension::POWER, 1.0, true),
    unit("C", "coulomb", &[], Dimension::CHARGE, 1.0, true),
    unit("V", "volt", &[], Dimension::VOLTAGE, 1.0, true),
    unit("ohm", "ohm", &["Ω"], Dimension::RESISTANCE, 1.0, true),
    unit("L", "liter", &["l", "litre"], Dimension::VOLUME, 1e-3, true),
    unit("t", "tonne", &["metric_ton"], M, 1e3, false),
    // Time
    unit("min", "minute", &[], T, 60.0, false),
    unit("h", "hour", &["hr"], T, 3600.0, false),
    unit("day", "day", &["d"], T, 86_400.0, false),
    // Imperial / US customary
    unit("in", "inch", &[], L, INCH, false),
    unit("ft", "foot", &["feet"], L, 0.3048, false),
    unit("yd", "yard", &[], L, 0.9144, false),
    unit("mi", "mile", &[], L, 1609.344, false),
    unit("lb", "pound", &["lbm"], M, POUND, false),
    unit("lbf", "pound_force", &[], Dimension::FORCE, POUND_FORCE, false),
    unit("psi", "pound_force_per_square_inch", &[], Dimension::PRESSURE, PSI, false),
    unit("ksi", "kilopound_force_per_square_inch", &[], Dimension::PRESSURE, PSI * 1e3, false),
    // Pressure
    unit("bar", "bar", &[], Dimension::PRESSURE, 1e5, true),
    unit("atm", "atmosphere", &[], Dimension::PRESSURE, 101_325.0, false),
    // Temperature intervals (multiplicative only)
    unit("degR", "rankine", &["°R"], Dimension::TEMPERATURE, 5.0 / 9.0, false),
    unit("delta_degC", "delta_celsius", &[], Dimension::TEMPERATURE, 1.0, false),
    unit("delta_degF", "delta_fahrenheit", &[], Dimension::TEMPERATURE, 5.0 / 9.0, false),
    // Dimensionless
    unit("rad", "radian", &[], D, 1.0, true),
    unit("deg", "degree", &["°"], D, PI / 180.0, false),
    unit("%", "percent", &[], D, 1e-2, false),
];
