//! Attribute values
//!
//! Inputs are read as [`Presence`] so "not set" and "set to empty" never
//! collapse into one another; outputs are [`AttrValue`]s where
//! [`AttrValue::Null`] marks an unset string or an empty collection.

use serde::{Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;

/// Flattened state of one data source read
pub type OutputRecord = BTreeMap<String, AttrValue>;

/// Configuration object handed to a data source read
pub type ConfigValues = BTreeMap<String, AttrValue>;

/// Three-state view of an optional input
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Presence<T> {
    #[default]
    Unset,
    Empty,
    Present(T),
}

impl<T> Presence<T> {
    pub fn is_present(&self) -> bool {
        matches!(self, Presence::Present(_))
    }

    pub fn as_present(&self) -> Option<&T> {
        match self {
            Presence::Present(v) => Some(v),
            _ => None,
        }
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            Presence::Present(v) => Some(v),
            _ => None,
        }
    }
}

impl Presence<String> {
    /// Read a string input, trimming surrounding whitespace
    pub fn from_attr(value: Option<&AttrValue>) -> Self {
        match value {
            None | Some(AttrValue::Null) => Presence::Unset,
            Some(AttrValue::String(s)) => Self::from_str_trimmed(s),
            Some(AttrValue::Int(i)) => Presence::Present(i.to_string()),
            Some(AttrValue::Bool(b)) => Presence::Present(b.to_string()),
            // not a scalar; schema validation reports the type mismatch
            Some(AttrValue::List(_)) | Some(AttrValue::Object(_)) => Presence::Empty,
        }
    }

    pub fn from_str_trimmed(s: &str) -> Self {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            Presence::Empty
        } else {
            Presence::Present(trimmed.to_string())
        }
    }

    pub fn from_option(value: Option<&str>) -> Self {
        match value {
            None => Presence::Unset,
            Some(s) => Self::from_str_trimmed(s),
        }
    }

    pub fn as_deref(&self) -> Option<&str> {
        self.as_present().map(|s| s.as_str())
    }
}

/// Typed attribute value as stored in state
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Null,
    String(String),
    Bool(bool),
    Int(i64),
    List(Vec<AttrValue>),
    Object(BTreeMap<String, AttrValue>),
}

impl AttrValue {
    pub fn string(s: impl Into<String>) -> Self {
        AttrValue::String(s.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, AttrValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[AttrValue]> {
        match self {
            AttrValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// Human readable name of the value's type, used in validation messages
    pub fn type_name(&self) -> &'static str {
        match self {
            AttrValue::Null => "null",
            AttrValue::String(_) => "string",
            AttrValue::Bool(_) => "bool",
            AttrValue::Int(_) => "number",
            AttrValue::List(_) => "list",
            AttrValue::Object(_) => "object",
        }
    }

    /// Convert a JSON value into an attribute value.
    /// Non-integral numbers are kept as their string rendering.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => AttrValue::Null,
            Value::Bool(b) => AttrValue::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => AttrValue::Int(i),
                None => AttrValue::String(n.to_string()),
            },
            Value::String(s) => AttrValue::String(s.clone()),
            Value::Array(arr) => AttrValue::List(arr.iter().map(AttrValue::from_json).collect()),
            Value::Object(map) => AttrValue::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), AttrValue::from_json(v)))
                    .collect(),
            ),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            AttrValue::Null => Value::Null,
            AttrValue::String(s) => Value::String(s.clone()),
            AttrValue::Bool(b) => Value::Bool(*b),
            AttrValue::Int(i) => Value::from(*i),
            AttrValue::List(items) => Value::Array(items.iter().map(AttrValue::to_json).collect()),
            AttrValue::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

impl Serialize for AttrValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

/// Parse a JSON object into configuration values.
/// Returns `None` when the input is not an object.
pub fn config_from_json(value: &Value) -> Option<ConfigValues> {
    let map = value.as_object()?;
    Some(
        map.iter()
            .map(|(k, v)| (k.clone(), AttrValue::from_json(v)))
            .collect(),
    )
}
