use crate::checked::{self, Arg, Output, UnitSpec};
use crate::display::{format_trace, to_audit_json};
use crate::error::UnitError;
use crate::quantity::TrackedQuantity;
use crate::store::get_registry;
use pyo3::create_exception;
use pyo3::exceptions::{PyRuntimeError, PyTypeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::{PyBool, PyDict, PyTuple};

create_exception!(_core, DimensionalityError, PyValueError, "Incompatible unit dimensions.");
create_exception!(_core, UnitParseError, PyValueError, "Unrecognized or malformed unit string.");

impl From<UnitError> for PyErr {
    fn from(err: UnitError) -> PyErr {
        match err {
            UnitError::Parse(e) => UnitParseError::new_err(e.to_string()),
            UnitError::Dimensionality(e) => DimensionalityError::new_err(e.to_string()),
            UnitError::Argument(e) => PyTypeError::new_err(e.to_string()),
        }
    }
}

/// Right-hand operand of the arithmetic dunders.
#[derive(FromPyObject)]
enum Operand<'py> {
    Quantity(PyRef<'py, PyTrackedQuantity>),
    Scalar(f64),
}

#[pyclass(name = "_TrackedQuantity", frozen)]
#[derive(Debug, Clone)]
pub struct PyTrackedQuantity {
    inner: TrackedQuantity,
}

impl From<TrackedQuantity> for PyTrackedQuantity {
    fn from(inner: TrackedQuantity) -> Self {
        Self { inner }
    }
}

#[pymethods]
impl PyTrackedQuantity {
    #[new]
    pub fn new(magnitude: f64, unit: &str) -> PyResult<Self> {
        let inner = TrackedQuantity::new(magnitude, unit).map_err(UnitError::from)?;
        Ok(inner.into())
    }

    #[getter]
    pub fn magnitude(&self) -> f64 {
        self.inner.magnitude()
    }

    #[getter]
    pub fn unit(&self) -> String {
        self.inner.unit().to_string()
    }

    #[getter]
    pub fn dimension(&self) -> String {
        self.inner.dimension().to_string()
    }

    /// Provenance entries, oldest first, as display strings.
    #[getter]
    pub fn provenance(&self) -> Vec<String> {
        self.inner.provenance().iter().map(|e| e.to_string()).collect()
    }

    pub fn to(&self, unit: &str) -> PyResult<Self> {
        Ok(self.inner.to(unit)?.into())
    }

    pub fn to_base_units(&self) -> Self {
        self.inner.to_base_units().into()
    }

    pub fn trace(&self) -> String {
        format_trace(&self.inner)
    }

    pub fn to_json(&self) -> PyResult<String> {
        to_audit_json(&self.inner).map_err(|e| PyRuntimeError::new_err(e.to_string()))
    }

    pub fn is_compatible(&self, other: PyRef<'_, Self>) -> bool {
        self.inner.is_compatible(&other.inner)
    }

    pub fn __add__(&self, other: PyRef<'_, Self>) -> PyResult<Self> {
        let sum = self.inner.try_add(&other.inner).map_err(UnitError::from)?;
        Ok(sum.into())
    }

    pub fn __sub__(&self, other: PyRef<'_, Self>) -> PyResult<Self> {
        let diff = self.inner.try_sub(&other.inner).map_err(UnitError::from)?;
        Ok(diff.into())
    }

    pub fn __mul__(&self, other: Operand<'_>) -> PyResult<Self> {
        let product = match other {
            Operand::Quantity(q) => self.inner.multiply(&q.inner).map_err(UnitError::from)?,
            Operand::Scalar(x) => self.inner.mul_scalar(x),
        };
        Ok(product.into())
    }

    pub fn __rmul__(&self, factor: f64) -> Self {
        self.inner.mul_scalar(factor).into()
    }

    pub fn __truediv__(&self, other: Operand<'_>) -> PyResult<Self> {
        let quotient = match other {
            Operand::Quantity(q) => self.inner.divide(&q.inner).map_err(UnitError::from)?,
            Operand::Scalar(x) => self.inner.div_scalar(x),
        };
        Ok(quotient.into())
    }

    pub fn __neg__(&self) -> Self {
        self.inner.mul_scalar(-1.0).into()
    }

    pub fn __pow__(&self, exponent: f64, _modulo: Option<Py<PyAny>>) -> PyResult<Self> {
        let powered = self.inner.powf(exponent).map_err(UnitError::from)?;
        Ok(powered.into())
    }

    pub fn __eq__(&self, other: PyRef<'_, Self>) -> PyResult<bool> {
        Ok(self.inner.try_eq(&other.inner).map_err(UnitError::from)?)
    }

    pub fn __repr__(&self) -> String {
        format!("TrackedQuantity({}, '{}')", self.inner.magnitude(), self.inner.unit())
    }

    pub fn __str__(&self) -> String {
        self.inner.to_string()
    }
}

/// The decorator returned by `unit_checked(**spec)`.
#[pyclass(name = "_UnitSpec", frozen)]
pub struct PyUnitSpec {
    spec: UnitSpec,
}

#[pymethods]
impl PyUnitSpec {
    pub fn __call__(&self, py: Python<'_>, func: Py<PyAny>) -> PyCheckedFunction {
        let name = func
            .bind(py)
            .getattr("__name__")
            .ok()
            .and_then(|n| n.extract::<String>().ok())
            .unwrap_or_else(|| "<function>".to_string());
        PyCheckedFunction {
            name,
            spec: self.spec.clone(),
            func,
        }
    }
}

/// A Python callable guarded by a unit contract.
#[pyclass(name = "_CheckedFunction", frozen)]
pub struct PyCheckedFunction {
    name: String,
    spec: UnitSpec,
    func: Py<PyAny>,
}

#[pymethods]
impl PyCheckedFunction {
    /// Binds the call with `inspect.signature`, so omitted defaults are left
    /// alone, then converts supplied values of declared parameters.
    #[pyo3(signature = (*args, **kwargs))]
    pub fn __call__(
        &self,
        py: Python<'_>,
        args: &Bound<'_, PyTuple>,
        kwargs: Option<&Bound<'_, PyDict>>,
    ) -> PyResult<Py<PyAny>> {
        let func = self.func.bind(py);
        let signature = py.import("inspect")?.call_method1("signature", (func,))?;
        let bound = signature.call_method("bind", args, kwargs)?;
        let arguments = bound.getattr("arguments")?;

        let mut names = Vec::new();
        for key in arguments.call_method0("keys")?.try_iter()? {
            names.push(key?.extract::<String>()?);
        }

        let mut inputs = Vec::new();
        for name in names {
            if self.spec.unit_for(&name).is_none() {
                continue;
            }
            let value = to_arg(&arguments.get_item(&name)?);
            if let Some(admitted) = self.spec.admit(&self.name, &name, &value)? {
                arguments.set_item(&name, admitted.magnitude)?;
                inputs.push(admitted.input);
            }
        }

        let call_args: Bound<'_, PyTuple> = bound.getattr("args")?.extract()?;
        let call_kwargs: Bound<'_, PyDict> = bound.getattr("kwargs")?.extract()?;
        let result: f64 = func.call(call_args, Some(&call_kwargs))?.extract()?;
        match self.spec.finish(&self.name, result, inputs) {
            Output::Number(x) => Ok(x.into_pyobject(py)?.into_any().unbind()),
            Output::Quantity(q) => Ok(Py::new(py, PyTrackedQuantity::from(q))?.into_any()),
        }
    }

    pub fn __repr__(&self) -> String {
        format!("<unit-checked function {}>", self.name)
    }
}

fn to_arg(value: &Bound<'_, PyAny>) -> Arg {
    if let Ok(q) = value.extract::<PyRef<'_, PyTrackedQuantity>>() {
        return Arg::Quantity(q.inner.clone());
    }
    if value.is_instance_of::<PyBool>() {
        return Arg::Flag(value.is_truthy().unwrap_or(false));
    }
    match value.extract::<f64>() {
        Ok(x) => Arg::Number(x),
        Err(_) => Arg::Text(value.to_string()),
    }
}

/// `unit_checked(p="Pa", _return="Pa")`: units are parsed here, before the
/// decorated function is ever called.
#[pyfunction]
#[pyo3(signature = (**spec))]
fn unit_checked(spec: Option<&Bound<'_, PyDict>>) -> PyResult<PyUnitSpec> {
    let mut pairs = Vec::new();
    if let Some(spec) = spec {
        for (key, unit) in spec.iter() {
            pairs.push((key.extract::<String>()?, unit.extract::<String>()?));
        }
    }
    Ok(PyUnitSpec {
        spec: checked::unit_checked(pairs)?,
    })
}

/// Every symbol the process registry resolves without a prefix.
#[pyfunction]
fn unit_symbols() -> Vec<String> {
    get_registry().symbols().map(str::to_string).collect()
}

/// Parses `expr` and returns its canonical spelling.
#[pyfunction]
fn parse_unit(expr: &str) -> PyResult<String> {
    let unit = get_registry().parse(expr).map_err(UnitError::from)?;
    Ok(unit.to_string())
}

/// Converts a bare magnitude between two unit expressions.
#[pyfunction]
fn convert(magnitude: f64, from_unit: &str, to_unit: &str) -> PyResult<f64> {
    let registry = get_registry();
    let from = registry.parse(from_unit).map_err(UnitError::from)?;
    let to = registry.parse(to_unit).map_err(UnitError::from)?;
    Ok(registry.convert(magnitude, &from, &to).map_err(UnitError::from)?)
}

/// The `_core` extension module.
#[pymodule]
fn _core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyTrackedQuantity>()?;
    m.add_class::<PyUnitSpec>()?;
    m.add_class::<PyCheckedFunction>()?;
    m.add_function(wrap_pyfunction!(unit_checked, m)?)?;
    m.add_function(wrap_pyfunction!(unit_symbols, m)?)?;
    m.add_function(wrap_pyfunction!(parse_unit, m)?)?;
    m.add_function(wrap_pyfunction!(convert, m)?)?;
    m.add("DimensionalityError", m.py().get_type::<DimensionalityError>())?;
    m.add("UnitParseError", m.py().get_type::<UnitParseError>())?;
    Ok(())
}
