//! Value coercion layer
//!
//! Scan result cells carry a generic `value` with a `value_type` tag. This
//! module classifies runtime values, serializes structured values for table
//! storage and decodes tagged cells into the typed [`ScanValue`] union.

use crate::error::ResultsError;
use crate::resultset::{decode_resultset, LabeledResult};
use scout_frame::JsonCodec;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::fmt;
use std::str::FromStr;

/// Discriminator for the `value` column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    /// Text
    String,
    /// Integer or float
    Number,
    /// True or false
    Boolean,
    /// Missing value
    Null,
    /// JSON-encoded list
    Array,
    /// JSON-encoded object
    Object,
    /// JSON-encoded list of labeled sub-results
    Resultset,
}

impl ValueType {
    /// Tag as stored in the `value_type` column
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueType::String => "string",
            ValueType::Number => "number",
            ValueType::Boolean => "boolean",
            ValueType::Null => "null",
            ValueType::Array => "array",
            ValueType::Object => "object",
            ValueType::Resultset => "resultset",
        }
    }

    /// Classify a runtime value (never yields `Resultset`)
    #[must_use]
    pub fn infer(value: &Value) -> Self {
        match value {
            Value::Null => ValueType::Null,
            Value::Bool(_) => ValueType::Boolean,
            Value::Number(_) => ValueType::Number,
            Value::String(_) => ValueType::String,
            Value::Array(_) => ValueType::Array,
            Value::Object(_) => ValueType::Object,
        }
    }

    /// Read a `value_type` cell (None if absent or unrecognized)
    #[must_use]
    pub fn of_cell(cell: Option<&Value>) -> Option<Self> {
        cell.and_then(Value::as_str).and_then(|tag| tag.parse().ok())
    }

    /// Check if values of this type are stored as JSON text
    #[inline]
    #[must_use]
    pub fn is_structured(&self) -> bool {
        matches!(
            self,
            ValueType::Array | ValueType::Object | ValueType::Resultset
        )
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValueType {
    type Err = ResultsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "string" => Ok(ValueType::String),
            "number" => Ok(ValueType::Number),
            "boolean" => Ok(ValueType::Boolean),
            "null" => Ok(ValueType::Null),
            "array" => Ok(ValueType::Array),
            "object" => Ok(ValueType::Object),
            "resultset" => Ok(ValueType::Resultset),
            other => Err(ResultsError::UnknownValueType(other.to_string())),
        }
    }
}

impl From<ValueType> for Value {
    fn from(value_type: ValueType) -> Self {
        Value::String(value_type.as_str().to_string())
    }
}

/// Short name of a value's JSON kind
pub(crate) fn kind_name(value: &Value) -> &'static str {
    ValueType::infer(value).as_str()
}

/// Serialize arrays and objects to JSON text, pass other values through
///
/// # Errors
/// Returns `ResultsError::Decode` if the value cannot be rendered
pub fn maybe_serialize_value(value: &Value, codec: &dyn JsonCodec) -> Result<Value, ResultsError> {
    match value {
        Value::Array(_) | Value::Object(_) => codec
            .stringify(value)
            .map(Value::String)
            .map_err(|e| ResultsError::decode("value", e)),
        other => Ok(other.clone()),
    }
}

/// Typed scan value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ScanValue {
    /// Text value
    String(String),
    /// Numeric value
    Number(Number),
    /// Boolean value
    Boolean(bool),
    /// No value
    Null,
    /// Decoded list
    Array(Vec<Value>),
    /// Decoded object
    Object(Map<String, Value>),
    /// Decoded labeled sub-results
    Resultset(Vec<LabeledResult>),
}

impl ScanValue {
    /// Decode a tagged cell
    ///
    /// Only structured tags decode JSON text. Scalars pass through; a scalar
    /// whose runtime type disagrees with its tag is classified by the runtime type.
    ///
    /// # Errors
    /// - `ResultsError::Decode` if structured text is not valid JSON
    /// - `ResultsError::ValueShape` if decoded JSON has the wrong shape
    pub async fn decode(
        value: &Value,
        value_type: ValueType,
        codec: &dyn JsonCodec,
    ) -> Result<Self, ResultsError> {
        match value_type {
            ValueType::Object => match decode_structured(value, codec).await? {
                Value::Object(map) => Ok(ScanValue::Object(map)),
                other => Err(ResultsError::ValueShape {
                    expected: "object",
                    found: kind_name(&other),
                }),
            },
            ValueType::Array => match decode_structured(value, codec).await? {
                Value::Array(items) => Ok(ScanValue::Array(items)),
                other => Err(ResultsError::ValueShape {
                    expected: "array",
                    found: kind_name(&other),
                }),
            },
            ValueType::Resultset => decode_resultset(value, codec)
                .await
                .map(ScanValue::Resultset),
            ValueType::String
            | ValueType::Number
            | ValueType::Boolean
            | ValueType::Null => Ok(Self::from_scalar(value.clone())),
        }
    }

    fn from_scalar(value: Value) -> Self {
        match value {
            Value::Null => ScanValue::Null,
            Value::Bool(b) => ScanValue::Boolean(b),
            Value::Number(n) => ScanValue::Number(n),
            Value::String(s) => ScanValue::String(s),
            Value::Array(items) => ScanValue::Array(items),
            Value::Object(map) => ScanValue::Object(map),
        }
    }

    /// Type tag of this value
    #[must_use]
    pub fn value_type(&self) -> ValueType {
        match self {
            ScanValue::String(_) => ValueType::String,
            ScanValue::Number(_) => ValueType::Number,
            ScanValue::Boolean(_) => ValueType::Boolean,
            ScanValue::Null => ValueType::Null,
            ScanValue::Array(_) => ValueType::Array,
            ScanValue::Object(_) => ValueType::Object,
            ScanValue::Resultset(_) => ValueType::Resultset,
        }
    }

    /// Check for null
    #[inline]
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, ScanValue::Null)
    }
}

async fn decode_structured(value: &Value, codec: &dyn JsonCodec) -> Result<Value, ResultsError> {
    match value {
        Value::String(text) => codec
            .parse(text)
            .await
            .map_err(|e| ResultsError::decode("value", e)),
        other => Ok(other.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scout_frame::SerdeJsonCodec;
    use serde_json::json;

    #[test]
    fn infer_runtime_types() {
        assert_eq!(ValueType::infer(&json!("x")), ValueType::String);
        assert_eq!(ValueType::infer(&json!(1.5)), ValueType::Number);
        assert_eq!(ValueType::infer(&json!(false)), ValueType::Boolean);
        assert_eq!(ValueType::infer(&Value::Null), ValueType::Null);
        assert_eq!(ValueType::infer(&json!([1])), ValueType::Array);
        assert_eq!(ValueType::infer(&json!({"a": 1})), ValueType::Object);
    }

    #[test]
    fn tag_roundtrip_and_unknown() {
        for tag in ["string", "number", "boolean", "null", "array", "object", "resultset"] {
            let parsed: ValueType = tag.parse().unwrap();
            assert_eq!(parsed.as_str(), tag);
        }
        assert!(matches!(
            "float".parse::<ValueType>(),
            Err(ResultsError::UnknownValueType(tag)) if tag == "float"
        ));
    }

    #[test]
    fn of_cell_reads_tag() {
        assert_eq!(
            ValueType::of_cell(Some(&json!("resultset"))),
            Some(ValueType::Resultset)
        );
        assert_eq!(ValueType::of_cell(Some(&json!(3))), None);
        assert_eq!(ValueType::of_cell(None), None);
    }

    #[test]
    fn serde_names_lowercase() {
        assert_eq!(serde_json::to_value(ValueType::Boolean).unwrap(), json!("boolean"));
        let back: ValueType = serde_json::from_value(json!("object")).unwrap();
        assert_eq!(back, ValueType::Object);
    }

    #[test]
    fn maybe_serialize_structured_only() {
        let codec = SerdeJsonCodec::default();
        assert_eq!(
            maybe_serialize_value(&json!({"a": 1}), &codec).unwrap(),
            json!(r#"{"a":1}"#)
        );
        assert_eq!(maybe_serialize_value(&json!([]), &codec).unwrap(), json!("[]"));
        assert_eq!(maybe_serialize_value(&json!(7), &codec).unwrap(), json!(7));
        assert_eq!(maybe_serialize_value(&json!("s"), &codec).unwrap(), json!("s"));
        assert_eq!(maybe_serialize_value(&Value::Null, &codec).unwrap(), Value::Null);
    }

    #[tokio::test]
    async fn decode_object_from_text() {
        let codec = SerdeJsonCodec::default();
        let value = ScanValue::decode(&json!(r#"{"k": [1]}"#), ValueType::Object, &codec)
            .await
            .unwrap();
        assert_eq!(value, ScanValue::Object(json!({"k": [1]}).as_object().cloned().unwrap()));
    }

    #[tokio::test]
    async fn decode_array_shape_mismatch() {
        let codec = SerdeJsonCodec::default();
        let err = ScanValue::decode(&json!(r#"{"k": 1}"#), ValueType::Array, &codec)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ResultsError::ValueShape { expected: "array", found: "object" }
        ));
    }

    #[tokio::test]
    async fn decode_scalars_pass_through() {
        let codec = SerdeJsonCodec::default();
        let s = ScanValue::decode(&json!("[not parsed]"), ValueType::String, &codec)
            .await
            .unwrap();
        assert_eq!(s, ScanValue::String("[not parsed]".to_string()));

        let b = ScanValue::decode(&json!(true), ValueType::Boolean, &codec).await.unwrap();
        assert_eq!(b.value_type(), ValueType::Boolean);

        let mismatched = ScanValue::decode(&json!(3), ValueType::String, &codec).await.unwrap();
        assert_eq!(mismatched.value_type(), ValueType::Number);
    }

    #[test]
    fn scan_value_serializes_untagged() {
        assert_eq!(serde_json::to_value(ScanValue::Boolean(true)).unwrap(), json!(true));
        assert_eq!(serde_json::to_value(ScanValue::Null).unwrap(), Value::Null);
    }
}
