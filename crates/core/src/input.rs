//! Client-supplied fields that must survive a wrong JSON type.
//!
//! A request is validated field by field, so a single mistyped value (`"quantity":
//! "2"`) has to become an error on that field rather than a failure to read the
//! whole body.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};

/// One request field: absent (or `null`), well-typed, or present with the wrong
/// JSON type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lenient<T> {
    Missing,
    Value(T),
    Invalid,
}

impl<T> Lenient<T> {
    pub fn value(&self) -> Option<&T> {
        match self {
            Lenient::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            Lenient::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self, Lenient::Invalid)
    }
}

impl<T> Default for Lenient<T> {
    fn default() -> Self {
        Lenient::Missing
    }
}

impl<T> From<Option<T>> for Lenient<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Lenient::Missing, Lenient::Value)
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for Lenient<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = serde_json::Value::deserialize(deserializer)?;
        if raw.is_null() {
            return Ok(Lenient::Missing);
        }
        Ok(serde_json::from_value(raw).map_or(Lenient::Invalid, Lenient::Value))
    }
}
