//! Scalar value wrapper used by DLP result payloads.
//!
//! The DLP API encodes every statistic as a `Value` message: a JSON object
//! with exactly one key naming the scalar kind, for example
//! `{"integerValue": "42"}` or `{"stringValue": "abc"}`. This module keeps
//! the kind tag and the scalar's text, and renders the text on demand.
//!
//! ```rust
//! use dlp_risk_analysis::value::{Value, ValueKind};
//!
//! let value: Value = serde_json::from_str(r#"{"integerValue": "42"}"#).unwrap();
//! assert_eq!(value.kind(), ValueKind::Integer);
//! assert_eq!(value.unpack(), "42");
//! ```

use std::fmt;

use serde::de::{self, Deserializer};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

use crate::error::{Result, RiskError};

/// The kind tag of a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// `integerValue`, an int64 carried as a JSON string
    Integer,
    /// `floatValue`, a JSON number
    Float,
    /// `stringValue`
    String,
    /// `booleanValue`
    Boolean,
    /// `timestampValue`, an RFC 3339 string
    Timestamp,
    /// `timeValue`, a `{hours, minutes, seconds, nanos}` object
    Time,
    /// `dateValue`, a `{year, month, day}` object
    Date,
    /// `dayOfWeekValue`, an enum name such as `MONDAY`
    DayOfWeek,
}

impl ValueKind {
    /// Returns the JSON field name for this kind.
    pub fn field_name(&self) -> &'static str {
        match self {
            Self::Integer => "integerValue",
            Self::Float => "floatValue",
            Self::String => "stringValue",
            Self::Boolean => "booleanValue",
            Self::Timestamp => "timestampValue",
            Self::Time => "timeValue",
            Self::Date => "dateValue",
            Self::DayOfWeek => "dayOfWeekValue",
        }
    }

    /// Looks up a kind by its JSON field name.
    pub fn from_field_name(name: &str) -> Option<Self> {
        match name {
            "integerValue" => Some(Self::Integer),
            "floatValue" => Some(Self::Float),
            "stringValue" => Some(Self::String),
            "booleanValue" => Some(Self::Boolean),
            "timestampValue" => Some(Self::Timestamp),
            "timeValue" => Some(Self::Time),
            "dateValue" => Some(Self::Date),
            "dayOfWeekValue" => Some(Self::DayOfWeek),
            _ => None,
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field_name())
    }
}

/// A tagged scalar holding exactly one value.
///
/// The scalar is kept as text: JSON strings verbatim, numbers and booleans
/// as their JSON text, and structured kinds (`dateValue`, `timeValue`) as
/// compact JSON.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Value {
    kind: ValueKind,
    raw: String,
}

impl Value {
    /// Creates a value from a kind and its text form.
    pub fn new(kind: ValueKind, raw: impl Into<String>) -> Self {
        Self {
            kind,
            raw: raw.into(),
        }
    }

    /// Creates an `integerValue`.
    pub fn integer(value: i64) -> Self {
        Self::new(ValueKind::Integer, value.to_string())
    }

    /// Creates a `floatValue`.
    pub fn float(value: f64) -> Self {
        Self::new(ValueKind::Float, value.to_string())
    }

    /// Creates a `stringValue`.
    pub fn string(value: impl Into<String>) -> Self {
        Self::new(ValueKind::String, value)
    }

    /// Returns the kind tag.
    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    /// Returns the text of the single underlying scalar.
    pub fn unpack(&self) -> &str {
        &self.raw
    }

    /// Builds a value from its decoded JSON envelope.
    pub fn from_json(json: &serde_json::Value) -> Result<Self> {
        let object = json.as_object().ok_or_else(|| {
            RiskError::serdes(format!("value wrapper must be an object, got {}", json))
        })?;

        let mut entries = object.iter();
        let (field, inner) = match (entries.next(), entries.next()) {
            (Some(entry), None) => entry,
            (None, _) => return Err(RiskError::serdes("value wrapper is empty")),
            (Some(_), Some(_)) => {
                return Err(RiskError::serdes(format!(
                    "value wrapper must hold exactly one field, got {}",
                    object.len()
                )))
            }
        };

        let kind = ValueKind::from_field_name(field)
            .ok_or_else(|| RiskError::serdes(format!("unknown value kind: {}", field)))?;

        let raw = match inner {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Null => {
                return Err(RiskError::serdes(format!("{} is null", field)));
            }
            other => other.to_string(),
        };

        Ok(Self { kind, raw })
    }

    /// Encodes the value back into its JSON envelope.
    pub fn to_json(&self) -> serde_json::Value {
        let inner = match self.kind {
            ValueKind::Float => self
                .raw
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(serde_json::Value::Number),
            ValueKind::Boolean => self.raw.parse::<bool>().ok().map(serde_json::Value::Bool),
            ValueKind::Time | ValueKind::Date => serde_json::from_str(&self.raw).ok(),
            _ => None,
        }
        .unwrap_or_else(|| serde_json::Value::String(self.raw.clone()));

        let mut object = serde_json::Map::new();
        object.insert(self.kind.field_name().to_string(), inner);
        serde_json::Value::Object(object)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let json = serde_json::Value::deserialize(deserializer)?;
        Value::from_json(&json).map_err(de::Error::custom)
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let json = self.to_json();
        let mut map = serializer.serialize_map(Some(1))?;
        if let serde_json::Value::Object(object) = json {
            for (key, value) in object {
                map.serialize_entry(&key, &value)?;
            }
        }
        map.end()
    }
}

/// Decodes a JSON value wrapper and returns its scalar text.
pub fn unpack_value(json: &str) -> Result<String> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    Ok(Value::from_json(&value)?.raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_unpack_integer() {
        assert_eq!(unpack_value(r#"{"integerValue": "42"}"#).unwrap(), "42");
        assert_eq!(unpack_value(r#"{"integerValue": 42}"#).unwrap(), "42");
    }

    #[test]
    fn test_unpack_string() {
        assert_eq!(unpack_value(r#"{"stringValue": "abc"}"#).unwrap(), "abc");
    }

    #[test]
    fn test_unpack_float_and_boolean() {
        assert_eq!(unpack_value(r#"{"floatValue": 1.5}"#).unwrap(), "1.5");
        assert_eq!(unpack_value(r#"{"booleanValue": true}"#).unwrap(), "true");
    }

    #[test]
    fn test_unpack_timestamp_and_day_of_week() {
        assert_eq!(
            unpack_value(r#"{"timestampValue": "2020-01-01T00:00:00Z"}"#).unwrap(),
            "2020-01-01T00:00:00Z"
        );
        assert_eq!(unpack_value(r#"{"dayOfWeekValue": "MONDAY"}"#).unwrap(), "MONDAY");
    }

    #[test]
    fn test_unpack_date_is_compact_json() {
        let text = unpack_value(r#"{"dateValue": {"year": 2020, "month": 2, "day": 3}}"#).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed["year"], 2020);
        assert!(!text.contains('\n'));
    }

    #[test]
    fn test_malformed_wrappers_fail() {
        for json in [
            r#"{}"#,
            r#"{"integerValue": "1", "stringValue": "a"}"#,
            r#"{"mysteryValue": "1"}"#,
            r#"{"stringValue": null}"#,
            r#""bare""#,
            r#"not json"#,
        ] {
            let err = unpack_value(json).unwrap_err();
            assert!(matches!(err, RiskError::SerDes { .. }), "{json}: {err:?}");
        }
    }

    #[test]
    fn test_deserialize_inside_struct() {
        #[derive(Deserialize)]
        struct Holder {
            v: Value,
        }
        let holder: Holder = serde_json::from_str(r#"{"v": {"stringValue": "x"}}"#).unwrap();
        assert_eq!(holder.v.kind(), ValueKind::String);
        assert_eq!(holder.v.to_string(), "x");

        let err = serde_json::from_str::<Holder>(r#"{"v": {"oops": 1}}"#);
        assert!(err.is_err());
    }

    #[test]
    fn test_serialize_uses_wire_shape() {
        let json = serde_json::to_value(Value::integer(7)).unwrap();
        assert_eq!(json, serde_json::json!({"integerValue": "7"}));
        let json = serde_json::to_value(Value::float(2.5)).unwrap();
        assert_eq!(json, serde_json::json!({"floatValue": 2.5}));
    }

    proptest! {
        #[test]
        fn prop_integer_unpacks_to_decimal_text(n in any::<i64>()) {
            let json = format!(r#"{{"integerValue": "{}"}}"#, n);
            prop_assert_eq!(unpack_value(&json).unwrap(), n.to_string());
        }

        #[test]
        fn prop_string_unpacks_verbatim(s in "[a-zA-Z0-9 _.-]{0,32}") {
            let json = serde_json::json!({"stringValue": s.clone()}).to_string();
            prop_assert_eq!(unpack_value(&json).unwrap(), s);
        }
    }
}
