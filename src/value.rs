//! Typed attribute values.
//!
//! Every attribute in host state is either null, unknown (a placeholder the
//! host resolves after apply) or a known value. [`Attr`] keeps the three
//! apart so that "absent on the wire" and "present but empty" never collapse
//! into each other.

use crate::error::ProviderError;
use crate::schema::AttributeType;
use crate::validation::matches_type;
use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// JSON encoding of a value that is not known until apply.
pub const UNKNOWN_VALUE: &str = "74D93920-ED26-11E3-AC10-0800200C9A66";

/// Whether a raw JSON value is the unknown sentinel.
pub fn is_unknown(value: &Value) -> bool {
    value.as_str() == Some(UNKNOWN_VALUE)
}

/// The unknown sentinel as a JSON value.
pub fn unknown() -> Value {
    Value::String(UNKNOWN_VALUE.to_string())
}

/// A state attribute: null, unknown, or a known value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Attr<T> {
    /// No value.
    #[default]
    Null,
    /// Known only after apply.
    Unknown,
    /// A concrete value.
    Known(T),
}

impl<T> Attr<T> {
    /// Wrap an optional wire value; `None` becomes null.
    pub fn from_option(value: Option<T>) -> Self {
        value.map_or(Self::Null, Self::Known)
    }

    /// Returns `true` for [`Attr::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns `true` for [`Attr::Unknown`].
    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }

    /// Borrow the known value.
    pub fn known(&self) -> Option<&T> {
        match self {
            Self::Known(value) => Some(value),
            _ => None,
        }
    }

    /// Take the known value.
    pub fn into_known(self) -> Option<T> {
        match self {
            Self::Known(value) => Some(value),
            _ => None,
        }
    }

    /// Map the known value, keeping null and unknown as they are.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Attr<U> {
        match self {
            Self::Null => Attr::Null,
            Self::Unknown => Attr::Unknown,
            Self::Known(value) => Attr::Known(f(value)),
        }
    }
}

impl<T> From<T> for Attr<T> {
    fn from(value: T) -> Self {
        Self::Known(value)
    }
}

impl From<&str> for Attr<String> {
    fn from(value: &str) -> Self {
        Self::Known(value.to_string())
    }
}

impl<T: Serialize> Serialize for Attr<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_none(),
            Self::Unknown => serializer.serialize_str(UNKNOWN_VALUE),
            Self::Known(value) => value.serialize(serializer),
        }
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for Attr<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Value::deserialize(deserializer)?;
        if raw.is_null() {
            return Ok(Self::Null);
        }
        if is_unknown(&raw) {
            return Ok(Self::Unknown);
        }
        serde_json::from_value(raw).map(Self::Known).map_err(D::Error::custom)
    }
}

/// An unordered collection of unique values of one element type.
///
/// Elements keep first-seen order so state output is stable between reads.
#[derive(Debug, Clone, PartialEq)]
pub struct SetValue {
    element_type: AttributeType,
    elements: Vec<Value>,
}

impl SetValue {
    /// Build a set, converting each item and checking it against `element_type`.
    ///
    /// Duplicates are dropped. An item that does not convert to the element
    /// type fails the whole set.
    pub fn from_elements<T, I>(element_type: AttributeType, items: I) -> Result<Self, ProviderError>
    where
        T: Serialize,
        I: IntoIterator<Item = T>,
    {
        let mut elements: Vec<Value> = Vec::new();
        for item in items {
            let value = serde_json::to_value(item)?;
            if !matches_type(&element_type, &value) {
                return Err(ProviderError::Validation(format!(
                    "set element {} is not a {}",
                    value,
                    element_type.name()
                )));
            }
            if !elements.contains(&value) {
                elements.push(value);
            }
        }
        Ok(Self {
            element_type,
            elements,
        })
    }

    /// The declared element type.
    pub fn element_type(&self) -> &AttributeType {
        &self.element_type
    }

    /// The elements in first-seen order.
    pub fn elements(&self) -> &[Value] {
        &self.elements
    }

    /// Number of unique elements.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Whether the set has no elements.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

/// Widen a wire integer into an int64 attribute.
///
/// `None` stays null. A value that does not fit in `i64` is an
/// [`ProviderError::OutOfRange`] error naming `field`.
pub fn widen<T>(field: &'static str, value: Option<T>) -> Result<Attr<i64>, ProviderError>
where
    T: Copy + ToString,
    i64: TryFrom<T>,
{
    match value {
        None => Ok(Attr::Null),
        Some(raw) => i64::try_from(raw).map(Attr::Known).map_err(|_| ProviderError::OutOfRange {
            field,
            value: raw.to_string(),
        }),
    }
}

impl Serialize for SetValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.elements.serialize(serializer)
    }
}
