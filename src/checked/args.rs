//! Call-site arguments and their binding to a checked function's signature.
use crate::error::ArgumentError;
use crate::quantity::TrackedQuantity;

/// One argument value handed to a checked function.
#[derive(Debug, Clone)]
pub enum Arg {
    Quantity(TrackedQuantity),
    Number(f64),
    Flag(bool),
    Text(String),
}

impl Arg {
    pub fn kind(&self) -> &'static str {
        match self {
            Arg::Quantity(_) => "quantity",
            Arg::Number(_) => "number",
            Arg::Flag(_) => "flag",
            Arg::Text(_) => "text",
        }
    }
}

impl From<TrackedQuantity> for Arg {
    fn from(q: TrackedQuantity) -> Self {
        Arg::Quantity(q)
    }
}

impl From<&TrackedQuantity> for Arg {
    fn from(q: &TrackedQuantity) -> Self {
        Arg::Quantity(q.clone())
    }
}

impl From<f64> for Arg {
    fn from(x: f64) -> Self {
        Arg::Number(x)
    }
}

impl From<i32> for Arg {
    fn from(x: i32) -> Self {
        Arg::Number(x.into())
    }
}

impl From<i64> for Arg {
    fn from(x: i64) -> Self {
        Arg::Number(x as f64)
    }
}

impl From<bool> for Arg {
    fn from(b: bool) -> Self {
        Arg::Flag(b)
    }
}

impl From<&str> for Arg {
    fn from(s: &str) -> Self {
        Arg::Text(s.to_string())
    }
}

impl From<String> for Arg {
    fn from(s: String) -> Self {
        Arg::Text(s)
    }
}

/// One parameter of a wrapped function's signature.
///
/// An optional parameter that the caller omits is bound to its default as
/// given: it is neither converted nor recorded as an input.
#[derive(Debug, Clone)]
pub struct Param {
    name: String,
    default: Option<Arg>,
}

impl Param {
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: None,
        }
    }

    pub fn optional(name: impl Into<String>, default: impl Into<Arg>) -> Self {
        Self {
            name: name.into(),
            default: Some(default.into()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn default(&self) -> Option<&Arg> {
        self.default.as_ref()
    }
}

impl From<&str> for Param {
    fn from(name: &str) -> Self {
        Param::required(name)
    }
}

impl From<String> for Param {
    fn from(name: String) -> Self {
        Param::required(name)
    }
}

/// A parameter's value after binding. `supplied` is false when the value is
/// the parameter's default.
#[derive(Debug, Clone)]
pub(crate) struct Binding {
    pub name: String,
    pub value: Arg,
    pub supplied: bool,
}

/// Positional and keyword arguments of one call, before binding.
#[derive(Debug, Clone, Default)]
pub struct CallArgs {
    positional: Vec<Arg>,
    keyword: Vec<(String, Arg)>,
}

impl CallArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arg(mut self, value: impl Into<Arg>) -> Self {
        self.positional.push(value.into());
        self
    }

    pub fn kwarg(mut self, name: impl Into<String>, value: impl Into<Arg>) -> Self {
        self.keyword.push((name.into(), value.into()));
        self
    }

    /// Binds positionals in order, then keywords by name. Every parameter
    /// ends up with exactly one value, either supplied or its default.
    pub(crate) fn bind(self, function: &str, params: &[Param]) -> Result<Vec<Binding>, ArgumentError> {
        if self.positional.len() > params.len() {
            return Err(ArgumentError::TooManyPositional {
                function: function.to_string(),
                expected: params.len(),
                found: self.positional.len(),
            });
        }

        let mut slots: Vec<Option<Arg>> = params.iter().map(|_| None).collect();
        for (slot, value) in slots.iter_mut().zip(self.positional) {
            *slot = Some(value);
        }
        for (name, value) in self.keyword {
            let Some(i) = params.iter().position(|p| p.name == name) else {
                return Err(ArgumentError::UnexpectedKeyword {
                    function: function.to_string(),
                    parameter: name,
                });
            };
            if slots[i].replace(value).is_some() {
                return Err(ArgumentError::Duplicate {
                    function: function.to_string(),
                    parameter: name,
                });
            }
        }

        params
            .iter()
            .zip(slots)
            .map(|(param, slot)| {
                let (value, supplied) = match (slot, &param.default) {
                    (Some(value), _) => (value, true),
                    (None, Some(default)) => (default.clone(), false),
                    (None, None) => {
                        return Err(ArgumentError::Missing {
                            function: function.to_string(),
                            parameter: param.name.clone(),
                        })
                    }
                };
                Ok(Binding {
                    name: param.name.clone(),
                    value,
                    supplied,
                })
            })
            .collect()
    }
}

impl<A: Into<Arg>> FromIterator<A> for CallArgs {
    fn from_iter<T: IntoIterator<Item = A>>(iter: T) -> Self {
        Self {
            positional: iter.into_iter().map(Into::into).collect(),
            keyword: Vec::new(),
        }
    }
}

impl<A: Into<Arg>, const N: usize> From<[A; N]> for CallArgs {
    fn from(values: [A; N]) -> Self {
        values.into_iter().collect()
    }
}

impl From<Vec<Arg>> for CallArgs {
    fn from(values: Vec<Arg>) -> Self {
        Self {
            positional: values,
            keyword: Vec::new(),
        }
    }
}

/// Arguments bound to parameter names, in signature order, as the wrapped
/// function sees them. Supplied values of declared parameters always arrive
/// as numbers.
#[derive(Debug, Clone, Default)]
pub struct BoundArgs {
    values: Vec<(String, Arg)>,
}

impl BoundArgs {
    pub fn new(values: Vec<(String, Arg)>) -> Self {
        Self { values }
    }

    pub fn get(&self, name: &str) -> Option<&Arg> {
        self.values.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    fn require(&self, name: &str) -> Result<&Arg, ArgumentError> {
        self.get(name).ok_or_else(|| ArgumentError::Unknown {
            parameter: name.to_string(),
        })
    }

    fn wrong_kind(name: &str, expected: &'static str, found: &Arg) -> ArgumentError {
        ArgumentError::WrongKind {
            parameter: name.to_string(),
            expected,
            found: found.kind(),
        }
    }

    pub fn number(&self, name: &str) -> Result<f64, ArgumentError> {
        match self.require(name)? {
            Arg::Number(x) => Ok(*x),
            other => Err(Self::wrong_kind(name, "number", other)),
        }
    }

    pub fn flag(&self, name: &str) -> Result<bool, ArgumentError> {
        match self.require(name)? {
            Arg::Flag(b) => Ok(*b),
            other => Err(Self::wrong_kind(name, "flag", other)),
        }
    }

    pub fn text(&self, name: &str) -> Result<&str, ArgumentError> {
        match self.require(name)? {
            Arg::Text(s) => Ok(s),
            other => Err(Self::wrong_kind(name, "text", other)),
        }
    }

    /// An undeclared parameter that was passed a quantity keeps it as is.
    pub fn quantity(&self, name: &str) -> Result<&TrackedQuantity, ArgumentError> {
        match self.require(name)? {
            Arg::Quantity(q) => Ok(q),
            other => Err(Self::wrong_kind(name, "quantity", other)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arg)> {
        self.values.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl IntoIterator for BoundArgs {
    type Item = (String, Arg);
    type IntoIter = std::vec::IntoIter<(String, Arg)>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}
