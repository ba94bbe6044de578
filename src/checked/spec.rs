//! The declared unit contract of a checked function.
use super::args::{Arg, BoundArgs, Param};
use super::wrapper::{Checked, Output};
use crate::error::{ArgumentError, DimensionalityError, UnitError};
use crate::quantity::{ProvenanceEntry, Step, TrackedQuantity};
use crate::store::{get_registry, Unit};
use std::sync::Arc;
use tracing::{debug, warn};

/// Reserved spec key naming the unit of the wrapped function's result.
pub const RETURN_KEY: &str = "_return";

/// Parameter units plus the optional return unit, all parsed up front.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitSpec {
    parameters: Vec<(String, Unit)>,
    return_unit: Option<Unit>,
}

/// A supplied argument of a declared parameter, expressed in the declared
/// unit, with the `Input` entry recording it.
#[derive(Debug, Clone)]
pub struct Admitted {
    pub magnitude: f64,
    pub input: Arc<ProvenanceEntry>,
}

/// Builds a [`UnitSpec`] from `(parameter, unit)` pairs.
///
/// Every unit string is parsed immediately, so a typo fails here rather than
/// on the first call. `_return` declares the result unit.
///
/// ```ignore
/// let spec = unit_checked([("p", "Pa"), ("_return", "Pa")])?;
/// ```
pub fn unit_checked<I, K, V>(spec: I) -> Result<UnitSpec, UnitError>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: AsRef<str>,
{
    let registry = get_registry();
    let mut parameters: Vec<(String, Unit)> = Vec::new();
    let mut return_unit = None;

    for (key, expr) in spec {
        let key = key.into();
        let unit = registry.parse(expr.as_ref())?;
        let taken = if key == RETURN_KEY {
            return_unit.replace(unit).is_some()
        } else if parameters.iter().any(|(name, _)| *name == key) {
            true
        } else {
            parameters.push((key.clone(), unit));
            false
        };
        if taken {
            return Err(ArgumentError::DuplicateSpec { parameter: key }.into());
        }
    }

    Ok(UnitSpec {
        parameters,
        return_unit,
    })
}

impl UnitSpec {
    /// Declared unit of `parameter`, if any.
    pub fn unit_for(&self, parameter: &str) -> Option<&Unit> {
        self.parameters
            .iter()
            .find(|(name, _)| name == parameter)
            .map(|(_, unit)| unit)
    }

    pub fn return_unit(&self) -> Option<&Unit> {
        self.return_unit.as_ref()
    }

    /// Declared parameter names, in declaration order.
    pub fn parameters(&self) -> impl Iterator<Item = &str> {
        self.parameters.iter().map(|(name, _)| name.as_str())
    }

    /// Checks one supplied argument of `function` against the contract.
    ///
    /// Undeclared parameters yield `None` and are left alone. A quantity must
    /// match the declared dimension and is converted to the declared unit;
    /// a raw number is taken to be in the declared unit already.
    pub fn admit(&self, function: &str, parameter: &str, arg: &Arg) -> Result<Option<Admitted>, UnitError> {
        let Some(declared) = self.unit_for(parameter) else {
            return Ok(None);
        };
        let (magnitude, origin) = match arg {
            Arg::Quantity(q) => (accept(function, parameter, declared, q)?, vec![q.provenance_tail()]),
            Arg::Number(x) => (*x, Vec::new()),
            other => {
                return Err(ArgumentError::NotNumeric {
                    parameter: parameter.to_string(),
                    unit: declared.to_string(),
                    found: other.kind(),
                }
                .into())
            }
        };
        let step = Step::Input {
            function: function.to_string(),
            parameter: parameter.to_string(),
            magnitude,
            unit: declared.to_string(),
        };
        Ok(Some(Admitted {
            magnitude,
            input: Arc::new(ProvenanceEntry::new(step, origin)),
        }))
    }

    /// Wraps the raw `result` of `function` in the declared return unit.
    ///
    /// The quantity's provenance is `inputs` followed by one `Computed` entry
    /// linked to all of them. Without a return unit the number is passed on.
    pub fn finish(&self, function: &str, result: f64, inputs: Vec<Arc<ProvenanceEntry>>) -> Output {
        let Some(unit) = self.return_unit() else {
            return Output::Number(result);
        };
        let step = Step::Computed {
            function: function.to_string(),
            magnitude: result,
            unit: unit.to_string(),
        };
        let computed = Arc::new(ProvenanceEntry::new(step, inputs.clone()));
        let mut provenance = inputs;
        provenance.push(computed);
        Output::Quantity(TrackedQuantity::with_history(result, unit.clone(), provenance))
    }

    /// Wraps `f`, whose signature is the ordered parameter list `params`.
    /// Plain names are required parameters; see [`Param::optional`] for
    /// defaults.
    ///
    /// Declared parameters that the signature lacks can never be bound; they
    /// are reported and otherwise ignored.
    pub fn wrap<F, P>(self, name: impl Into<String>, params: &[P], f: F) -> Checked<F>
    where
        F: Fn(&BoundArgs) -> Result<f64, UnitError>,
        P: Clone + Into<Param>,
    {
        let name = name.into();
        let params: Vec<Param> = params.iter().cloned().map(Into::into).collect();
        for declared in self.parameters() {
            if !params.iter().any(|p| p.name() == declared) {
                warn!(function = %name, parameter = declared, "unit spec names a parameter the function does not take");
            }
        }
        Checked::new(name, params, self, f)
    }
}

/// Magnitude of `q` in `declared`, or an error naming the parameter.
fn accept(function: &str, parameter: &str, declared: &Unit, q: &TrackedQuantity) -> Result<f64, DimensionalityError> {
    if q.dimension() != declared.dimension() {
        debug!(
            function,
            parameter,
            expected = %declared,
            found = %q.unit(),
            "rejected argument with wrong dimension"
        );
        return Err(DimensionalityError::Parameter {
            parameter: parameter.to_string(),
            expected: declared.to_string(),
            expected_dimension: declared.dimension(),
            found: q.unit().to_string(),
            found_dimension: q.dimension(),
        });
    }
    get_registry().convert(q.magnitude(), q.unit(), declared)
}
