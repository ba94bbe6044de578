//! The callable produced by [`UnitSpec::wrap`](super::UnitSpec::wrap).
use super::args::{Arg, BoundArgs, CallArgs, Param};
use super::spec::UnitSpec;
use crate::error::UnitError;
use crate::quantity::TrackedQuantity;

/// Result of a checked call: a bare number, or a quantity when the spec
/// declares `_return`.
#[derive(Debug, Clone)]
pub enum Output {
    Number(f64),
    Quantity(TrackedQuantity),
}

impl Output {
    pub fn magnitude(&self) -> f64 {
        match self {
            Output::Number(x) => *x,
            Output::Quantity(q) => q.magnitude(),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Output::Number(x) => Some(*x),
            Output::Quantity(_) => None,
        }
    }

    pub fn as_quantity(&self) -> Option<&TrackedQuantity> {
        match self {
            Output::Quantity(q) => Some(q),
            Output::Number(_) => None,
        }
    }

    pub fn into_quantity(self) -> Option<TrackedQuantity> {
        match self {
            Output::Quantity(q) => Some(q),
            Output::Number(_) => None,
        }
    }
}

/// A function wrapped with a unit contract.
///
/// Each call binds arguments by name, converts tracked arguments of declared
/// parameters to the declared unit, runs the function on plain magnitudes
/// and re-wraps the result when a return unit is declared.
pub struct Checked<F> {
    name: String,
    params: Vec<Param>,
    spec: UnitSpec,
    f: F,
}

impl<F> Checked<F>
where
    F: Fn(&BoundArgs) -> Result<f64, UnitError>,
{
    pub(crate) fn new(name: String, params: Vec<Param>, spec: UnitSpec, f: F) -> Self {
        Self { name, params, spec, f }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    pub fn spec(&self) -> &UnitSpec {
        &self.spec
    }

    pub fn call(&self, args: impl Into<CallArgs>) -> Result<Output, UnitError> {
        let bindings = args.into().bind(&self.name, &self.params)?;
        let mut values = Vec::with_capacity(bindings.len());
        let mut inputs = Vec::new();

        for binding in bindings {
            // Defaults are passed on as given.
            if binding.supplied {
                if let Some(admitted) = self.spec.admit(&self.name, &binding.name, &binding.value)? {
                    inputs.push(admitted.input);
                    values.push((binding.name, Arg::Number(admitted.magnitude)));
                    continue;
                }
            }
            values.push((binding.name, binding.value));
        }

        let result = (self.f)(&BoundArgs::new(values))?;
        Ok(self.spec.finish(&self.name, result, inputs))
    }
}

impl<F> std::fmt::Debug for Checked<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Checked")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("spec", &self.spec)
            .finish_non_exhaustive()
    }
}
