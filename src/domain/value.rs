use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

/// Inclusive pair of canonical ISO dates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    pub start: String,
    pub end: String,
}

impl DateRange {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }
}

/// A single field value as it travels between controls, controller and backend.
///
/// Numbers compare by value, so `95` and `95.0` are equal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Number(Number),
    Text(String),
    Range(DateRange),
}

impl PartialEq for FieldValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (FieldValue::Null, FieldValue::Null) => true,
            (FieldValue::Bool(left), FieldValue::Bool(right)) => left == right,
            (FieldValue::Number(left), FieldValue::Number(right)) => numbers_equal(left, right),
            (FieldValue::Text(left), FieldValue::Text(right)) => left == right,
            (FieldValue::Range(left), FieldValue::Range(right)) => left == right,
            _ => false,
        }
    }
}

fn numbers_equal(left: &Number, right: &Number) -> bool {
    if left.is_f64() || right.is_f64() {
        left.as_f64() == right.as_f64()
    } else {
        left == right
    }
}

/// Declared type of a field, fixed by its initial value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Null,
    Bool,
    Number,
    Text,
    Range,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FieldKind::Null => "null",
            FieldKind::Bool => "boolean",
            FieldKind::Number => "number",
            FieldKind::Text => "string",
            FieldKind::Range => "range",
        };
        f.write_str(label)
    }
}

impl FieldKind {
    /// Nullable fields accept anything; typed fields accept `Null` or their own kind.
    pub fn accepts(self, value: &FieldValue) -> bool {
        match self {
            FieldKind::Null => true,
            kind => {
                let found = value.kind();
                found == FieldKind::Null || found == kind
            }
        }
    }
}

impl FieldValue {
    pub fn kind(&self) -> FieldKind {
        match self {
            FieldValue::Null => FieldKind::Null,
            FieldValue::Bool(_) => FieldKind::Bool,
            FieldValue::Number(_) => FieldKind::Number,
            FieldValue::Text(_) => FieldKind::Text,
            FieldValue::Range(_) => FieldKind::Range,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(flag) => Some(*flag),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Number(number) => number.as_f64(),
            _ => None,
        }
    }

    /// Loose boolean reading used by checkbox-style controls.
    pub fn is_truthy(&self) -> bool {
        match self {
            FieldValue::Null => false,
            FieldValue::Bool(flag) => *flag,
            FieldValue::Number(number) => number.as_f64().is_some_and(|value| value != 0.0),
            FieldValue::Text(text) => !text.is_empty(),
            FieldValue::Range(_) => true,
        }
    }

    /// Converts an arbitrary JSON value; arrays and non-range objects are rejected.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(FieldValue::Null),
            Value::Bool(flag) => Some(FieldValue::Bool(*flag)),
            Value::Number(number) => Some(FieldValue::Number(number.clone())),
            Value::String(text) => Some(FieldValue::Text(text.clone())),
            Value::Object(map) => {
                let start = map.get("start")?.as_str()?;
                let end = map.get("end")?.as_str()?;
                (map.len() == 2).then(|| FieldValue::Range(DateRange::new(start, end)))
            }
            Value::Array(_) => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Null => Value::Null,
            FieldValue::Bool(flag) => Value::Bool(*flag),
            FieldValue::Number(number) => Value::Number(number.clone()),
            FieldValue::Text(text) => Value::String(text.clone()),
            FieldValue::Range(range) => serde_json::json!({
                "start": range.start,
                "end": range.end,
            }),
        }
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        FieldValue::Number(value.into())
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Number(value.into())
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Number::from_f64(value)
            .map(FieldValue::Number)
            .unwrap_or(FieldValue::Null)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<DateRange> for FieldValue {
    fn from(value: DateRange) -> Self {
        FieldValue::Range(value)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(FieldValue::Null)
    }
}
