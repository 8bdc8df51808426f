//! Metadata filters and the predicate tree they compile to.
//!
//! A filter maps field names to a scalar (equality), a list (any-of) or a
//! mapping one level deep (conditions on sub-fields). Top-level entries are
//! AND-ed. Stores evaluate the compiled [`Predicate`] against the JSON view of
//! a payload, so the same filter works for every storage variant.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Bool(b) => write!(f, "{b}"),
            Scalar::Int(i) => write!(f, "{i}"),
            Scalar::Float(x) => write!(f, "{x}"),
            Scalar::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Text(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::Text(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Int(value)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Float(value)
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Bool(value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Scalar(Scalar),
    List(Vec<Scalar>),
    Nested(BTreeMap<String, FilterValue>),
}

impl FilterValue {
    pub fn any_of<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Scalar>,
    {
        FilterValue::List(values.into_iter().map(Into::into).collect())
    }

    pub fn nested<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, FilterValue)>,
        K: Into<String>,
    {
        FilterValue::Nested(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

impl From<Scalar> for FilterValue {
    fn from(value: Scalar) -> Self {
        FilterValue::Scalar(value)
    }
}

macro_rules! scalar_filter_value {
    ($($t:ty),*) => {
        $(impl From<$t> for FilterValue {
            fn from(value: $t) -> Self {
                FilterValue::Scalar(value.into())
            }
        })*
    };
}

scalar_filter_value!(&str, String, i64, f64, bool);

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SearchFilter(BTreeMap<String, FilterValue>);

impl SearchFilter {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Compiles the filter. Mappings nested more than one level are rejected.
    pub fn compile(&self) -> Result<Predicate> {
        let mut conditions = Vec::new();
        for (field, value) in &self.0 {
            match value {
                FilterValue::Nested(inner) => {
                    let mut sub = Vec::new();
                    for (sub_field, sub_value) in inner {
                        if matches!(sub_value, FilterValue::Nested(_)) {
                            return Err(Error::InvalidFilter(format!(
                                "'{field}.{sub_field}' nests deeper than one level"
                            )));
                        }
                        let path = vec![field.clone(), sub_field.clone()];
                        sub.extend(leaf(path, sub_value));
                    }
                    if !sub.is_empty() {
                        conditions.push(Predicate::All(sub));
                    }
                }
                other => conditions.extend(leaf(vec![field.clone()], other)),
            }
        }
        Ok(if conditions.is_empty() { Predicate::Always } else { Predicate::All(conditions) })
    }
}

fn leaf(path: Vec<String>, value: &FilterValue) -> Option<Predicate> {
    match value {
        FilterValue::Scalar(s) => Some(Predicate::Equals { path, value: s.clone() }),
        FilterValue::List(values) if values.is_empty() => None,
        FilterValue::List(values) => Some(Predicate::AnyOf { path, values: values.clone() }),
        FilterValue::Nested(_) => None,
    }
}

/// Engine-agnostic condition tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Always,
    All(Vec<Predicate>),
    Equals { path: Vec<String>, value: Scalar },
    AnyOf { path: Vec<String>, values: Vec<Scalar> },
}

impl Predicate {
    pub fn is_always(&self) -> bool {
        matches!(self, Predicate::Always)
    }

    pub fn matches(&self, doc: &Value) -> bool {
        match self {
            Predicate::Always => true,
            Predicate::All(parts) => parts.iter().all(|p| p.matches(doc)),
            Predicate::Equals { path, value } => {
                lookup(doc, path).is_some_and(|v| scalar_eq(v, value))
            }
            Predicate::AnyOf { path, values } => match lookup(doc, path) {
                Some(Value::Array(items)) => {
                    items.iter().any(|item| values.iter().any(|s| scalar_eq(item, s)))
                }
                Some(v) => values.iter().any(|s| scalar_eq(v, s)),
                None => false,
            },
        }
    }
}

fn lookup<'a>(doc: &'a Value, path: &[String]) -> Option<&'a Value> {
    path.iter().try_fold(doc, |v, key| v.get(key))
}

// Values compare by their string form, so 5 matches "5".
fn scalar_eq(field: &Value, expected: &Scalar) -> bool {
    let expected_text = expected.to_string();
    match field {
        Value::String(s) => *s == expected_text,
        Value::Bool(b) => b.to_string() == expected_text,
        Value::Number(n) => {
            if n.to_string() == expected_text {
                return true;
            }
            match (n.as_f64(), expected_text.parse::<f64>()) {
                (Some(a), Ok(b)) => a == b,
                _ => false,
            }
        }
        _ => false,
    }
}
