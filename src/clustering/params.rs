use crate::error::BackendError;

use std::collections::BTreeMap;
use std::fmt;

/// A single value of an algorithm parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Int(i64),
    /// unsigned integers beyond i64::MAX, e.g. seeds
    UInt(u64),
    Float(f64),
    Str(String),
    Bool(bool),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ParamValue::Int(v) => write!(f, "{}", v),
            ParamValue::UInt(v) => write!(f, "{}", v),
            ParamValue::Float(v) => write!(f, "{}", v),
            ParamValue::Str(v) => write!(f, "'{}'", v),
            ParamValue::Bool(v) => write!(f, "{}", v),
        }
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        ParamValue::Int(v as i64)
    }
}

impl From<usize> for ParamValue {
    fn from(v: usize) -> Self {
        ParamValue::from(v as u64)
    }
}

impl From<u64> for ParamValue {
    fn from(v: u64) -> Self {
        match i64::try_from(v) {
            Ok(v) => ParamValue::Int(v),
            Err(_) => ParamValue::UInt(v),
        }
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Str(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::Str(v)
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

/// Named options of a clustering algorithm, e.g. `n_clusters = 3`. Keys that are not set fall
/// back to the default of the algorithm.
///
/// # Example
///
/// ```rust
/// use hub_clustering::AlgorithmParams;
/// let params = AlgorithmParams::new().with("n_clusters", 3).with("init", "k-means++");
/// assert_eq!(params.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlgorithmParams {
    values: BTreeMap<String, ParamValue>,
}

impl AlgorithmParams {
    pub fn new() -> AlgorithmParams {
        AlgorithmParams { values: BTreeMap::new() }
    }

    /// Sets key to value and returns the parameters.
    pub fn with<V: Into<ParamValue>>(mut self, key: &str, value: V) -> AlgorithmParams {
        self.insert(key, value);
        self
    }

    /// Sets key to value, replacing an earlier value.
    pub fn insert<V: Into<ParamValue>>(&mut self, key: &str, value: V) {
        self.values.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.values.get(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates over all parameters ordered by key.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Fails for the first key that is not in allowed.
    pub(crate) fn expect_only(&self, allowed: &[&str]) -> Result<(), BackendError> {
        match self.values.keys().find(|k| !allowed.contains(&k.as_str())) {
            Some(key) => Err(BackendError::InvalidParameter(format!(
                "unexpected parameter '{}' (allowed: {})",
                key,
                allowed.join(", ")
            ))),
            None => Ok(()),
        }
    }

    /// A non-negative integer parameter.
    pub(crate) fn usize_or(&self, key: &str, default: usize) -> Result<usize, BackendError> {
        match self.values.get(key) {
            None => Ok(default),
            Some(ParamValue::Int(v)) if *v >= 0 => Ok(*v as usize),
            Some(ParamValue::UInt(v)) => {
                usize::try_from(*v).map_err(|_| type_error(key, "a non-negative integer", &ParamValue::UInt(*v)))
            }
            Some(other) => Err(type_error(key, "a non-negative integer", other)),
        }
    }

    /// A float parameter; integers are accepted as well.
    pub(crate) fn f64_or(&self, key: &str, default: f64) -> Result<f64, BackendError> {
        Ok(self.opt_f64(key)?.unwrap_or(default))
    }

    pub(crate) fn opt_f64(&self, key: &str) -> Result<Option<f64>, BackendError> {
        match self.values.get(key) {
            None => Ok(None),
            Some(ParamValue::Float(v)) if v.is_finite() => Ok(Some(*v)),
            Some(ParamValue::Int(v)) => Ok(Some(*v as f64)),
            Some(ParamValue::UInt(v)) => Ok(Some(*v as f64)),
            Some(other) => Err(type_error(key, "a finite number", other)),
        }
    }

    /// A seed for the random number generator.
    pub(crate) fn opt_seed(&self, key: &str) -> Result<Option<u64>, BackendError> {
        match self.values.get(key) {
            None => Ok(None),
            Some(ParamValue::Int(v)) if *v >= 0 => Ok(Some(*v as u64)),
            Some(ParamValue::UInt(v)) => Ok(Some(*v)),
            Some(other) => Err(type_error(key, "a non-negative integer", other)),
        }
    }

    /// A string parameter that must be one of choices.
    pub(crate) fn choice_or<'a>(&'a self, key: &str, choices: &[&str], default: &'a str) -> Result<&'a str, BackendError> {
        match self.values.get(key) {
            None => Ok(default),
            Some(ParamValue::Str(v)) if choices.contains(&v.as_str()) => Ok(v.as_str()),
            Some(other) => Err(type_error(key, &format!("one of {}", choices.join(", ")), other)),
        }
    }
}

impl fmt::Display for AlgorithmParams {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{{")?;
        let mut iter = self.values.iter();
        if let Some((k, v)) = iter.next() {
            write!(f, "{}: {}", k, v)?;
        }
        for (k, v) in iter {
            write!(f, ", {}: {}", k, v)?;
        }
        write!(f, "}}")
    }
}

fn type_error(key: &str, expected: &str, found: &ParamValue) -> BackendError {
    BackendError::InvalidParameter(format!("'{}' must be {}, got {}", key, expected, found))
}
