//! # Property Model
//!
//! Resource inputs and outputs travel through the host as loosely-typed property
//! bags. A [`PropertyMap`] maps property names to [`PropertyValue`]s, and the
//! same representation is persisted in the [`Checkpoint`](crate::Checkpoint).
//!
//! ## Numeric Coercion
//!
//! Providers read their numeric inputs with [`PropertyValue::to_number`], which
//! never fails. Anything that is not recognisably a number becomes `NaN` and
//! keeps flowing through dependent resources:
//!
//! | Value | Number |
//! |-------|--------|
//! | `Number(n)` | `n` |
//! | `Bool(b)` | `1.0` / `0.0` |
//! | `String(s)` | parsed after trimming, empty string is `0.0`, otherwise `NaN` |
//! | `Null` | `0.0` |
//! | missing key, array, object, reference | `NaN` |

use crate::urn::Urn;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Ordered property bag used for inputs, outputs and checkpoint state.
pub type PropertyMap = BTreeMap<String, PropertyValue>;

/// A link from one piece of state to a registered resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceReference {
    pub urn: Urn,
}

/// A single property value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum PropertyValue {
    Null,
    Bool(bool),
    Number(#[serde(with = "nan_as_null")] f64),
    String(String),
    Array(Vec<PropertyValue>),
    Object(PropertyMap),
    Resource(ResourceReference),
}

impl PropertyValue {
    /// Loose numeric coercion; see the module docs for the table.
    pub fn to_number(&self) -> f64 {
        match self {
            PropertyValue::Null => 0.0,
            PropertyValue::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            PropertyValue::Number(n) => *n,
            PropertyValue::String(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    0.0
                } else {
                    trimmed.parse::<f64>().unwrap_or(f64::NAN)
                }
            }
            PropertyValue::Array(_) | PropertyValue::Object(_) | PropertyValue::Resource(_) => {
                f64::NAN
            }
        }
    }

    pub fn as_resource(&self) -> Option<&ResourceReference> {
        match self {
            PropertyValue::Resource(reference) => Some(reference),
            _ => None,
        }
    }

    /// Walks this value and every nested value, depth first.
    pub fn visit<'a>(&'a self, f: &mut dyn FnMut(&'a PropertyValue)) {
        f(self);
        match self {
            PropertyValue::Array(items) => {
                for item in items {
                    item.visit(&mut *f);
                }
            }
            PropertyValue::Object(map) => {
                for item in map.values() {
                    item.visit(&mut *f);
                }
            }
            _ => {}
        }
    }
}

/// Reads `key` from `props` as a number. A missing key yields `NaN`.
pub fn number(props: &PropertyMap, key: &str) -> f64 {
    props.get(key).map_or(f64::NAN, PropertyValue::to_number)
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Null => write!(f, "null"),
            PropertyValue::Bool(b) => write!(f, "{b}"),
            PropertyValue::Number(n) => write!(f, "{n}"),
            PropertyValue::String(s) => write!(f, "{s:?}"),
            PropertyValue::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            PropertyValue::Object(map) => {
                write!(f, "{{")?;
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                write!(f, "}}")
            }
            PropertyValue::Resource(reference) => write!(f, "{}", reference.urn),
        }
    }
}

impl From<f64> for PropertyValue {
    fn from(n: f64) -> Self {
        PropertyValue::Number(n)
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        PropertyValue::Bool(b)
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        PropertyValue::String(s.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        PropertyValue::String(s)
    }
}

impl From<PropertyMap> for PropertyValue {
    fn from(map: PropertyMap) -> Self {
        PropertyValue::Object(map)
    }
}

impl From<ResourceReference> for PropertyValue {
    fn from(reference: ResourceReference) -> Self {
        PropertyValue::Resource(reference)
    }
}

// JSON has no NaN; serde_json writes non-finite floats as `null`.
mod nan_as_null {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(*value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
    }
}
