//! Tri-state attribute values.
//!
//! Every attribute in a resource model is either known, explicitly null, or
//! unknown (a value the host will only learn during apply, such as a computed
//! id). The distinction matters for the mapper: unknown values are never
//! written into request bodies and never persist in state, while null values
//! are written where that clears the remote field (lists, custom fields).

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A tri-state attribute value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value<T> {
    /// A concrete value.
    Known(T),
    /// Explicitly absent.
    #[default]
    Null,
    /// Not yet known (computed during apply).
    Unknown,
}

/// A string attribute value.
pub type StringValue = Value<String>;
/// A 32-bit integer attribute value.
pub type Int32Value = Value<i32>;
/// A 64-bit integer attribute value.
pub type Int64Value = Value<i64>;
/// A 64-bit float attribute value.
pub type Float64Value = Value<f64>;
/// A boolean attribute value.
pub type BoolValue = Value<bool>;

impl<T> Value<T> {
    /// Whether the value is known.
    pub fn is_known(&self) -> bool {
        matches!(self, Self::Known(_))
    }

    /// Whether the value is explicitly null.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Whether the value is unknown.
    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }

    /// The known value, if any.
    pub fn known(&self) -> Option<&T> {
        match self {
            Self::Known(v) => Some(v),
            _ => None,
        }
    }

    /// Consume and return the known value, if any.
    pub fn into_known(self) -> Option<T> {
        match self {
            Self::Known(v) => Some(v),
            _ => None,
        }
    }

    /// Map the known value, preserving null/unknown.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Value<U> {
        match self {
            Self::Known(v) => Value::Known(f(v)),
            Self::Null => Value::Null,
            Self::Unknown => Value::Unknown,
        }
    }
}

impl<T> From<T> for Value<T> {
    fn from(v: T) -> Self {
        Self::Known(v)
    }
}

impl<T> From<Option<T>> for Value<T> {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => Self::Known(v),
            None => Self::Null,
        }
    }
}

impl From<&str> for StringValue {
    fn from(v: &str) -> Self {
        Self::Known(v.to_string())
    }
}

// State is plain JSON: known values serialize as themselves, null and unknown
// both collapse to null. Unknown is a planning artifact and must never survive
// a round trip through persisted state.
impl<T: Serialize> Serialize for Value<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Known(v) => v.serialize(serializer),
            Self::Null | Self::Unknown => serializer.serialize_none(),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Value<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Option::<T>::deserialize(deserializer)?.into())
    }
}

/// A user-defined custom field value: the m3ter API accepts strings and
/// numbers only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CustomFieldValue {
    /// A string custom field.
    String(String),
    /// A numeric custom field.
    Number(f64),
}

/// The `customFields` attribute carried by most m3ter entities.
pub type CustomFields = Value<BTreeMap<String, CustomFieldValue>>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tristate_predicates() {
        let known = StringValue::from("abc");
        assert!(known.is_known());
        assert_eq!(known.known(), Some(&"abc".to_string()));

        let null = StringValue::Null;
        assert!(null.is_null());
        assert!(null.known().is_none());

        let unknown = StringValue::Unknown;
        assert!(unknown.is_unknown());
        assert!(!unknown.is_null());
    }

    #[test]
    fn test_serialize_known_and_null() {
        assert_eq!(
            serde_json::to_value(Int64Value::Known(42)).unwrap(),
            json!(42)
        );
        assert_eq!(
            serde_json::to_value(Int64Value::Null).unwrap(),
            json!(null)
        );
        // Unknown collapses to null in serialized state.
        assert_eq!(
            serde_json::to_value(Int64Value::Unknown).unwrap(),
            json!(null)
        );
    }

    #[test]
    fn test_deserialize() {
        let v: StringValue = serde_json::from_value(json!("hello")).unwrap();
        assert_eq!(v, Value::Known("hello".to_string()));

        let v: StringValue = serde_json::from_value(json!(null)).unwrap();
        assert_eq!(v, Value::Null);

        // Missing fields default to null through #[serde(default)].
        #[derive(Deserialize, Default)]
        struct Model {
            #[serde(default)]
            name: StringValue,
        }
        let m: Model = serde_json::from_value(json!({})).unwrap();
        assert!(m.name.is_null());
    }

    #[test]
    fn test_custom_field_value_untagged() {
        let v: CustomFieldValue = serde_json::from_value(json!("tier-1")).unwrap();
        assert_eq!(v, CustomFieldValue::String("tier-1".to_string()));

        let v: CustomFieldValue = serde_json::from_value(json!(2.5)).unwrap();
        assert_eq!(v, CustomFieldValue::Number(2.5));

        assert_eq!(
            serde_json::to_value(CustomFieldValue::Number(3.0)).unwrap(),
            json!(3.0)
        );
    }

    #[test]
    fn test_map() {
        let v = Int64Value::Known(2).map(|n| n * 10);
        assert_eq!(v, Value::Known(20));
        assert_eq!(Int64Value::Null.map(|n| n * 10), Value::Null);
        assert_eq!(Int64Value::Unknown.map(|n| n * 10), Value::Unknown);
    }
}
