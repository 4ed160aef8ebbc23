//! Resultset entries
//!
//! A resultset is a scanner value holding several labeled sub-results,
//! stored as JSON text in the `value` column.

use crate::error::ResultsError;
use scout_frame::JsonCodec;
use crate::value::ValueType;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Kind of transcript item a reference points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceKind {
    /// Transcript message
    Message,
    /// Transcript event
    Event,
}

/// Reference from a result to a transcript message or event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    /// Kind of referenced item
    #[serde(rename = "type")]
    pub kind: ReferenceKind,
    /// Id of the referenced message or event
    pub id: String,
    /// Citation text used in the explanation, e.g. `[M1]`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cite: Option<String>,
}

/// One labeled entry of a resultset
///
/// Scanners emit these loosely: optional fields may be null or of an
/// unexpected scalar type. Text fields accept any scalar, and a null or
/// unrecognized optional field reads as absent, so one odd field never
/// rejects the whole resultset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledResult {
    /// Label distinguishing this entry within the resultset
    #[serde(default, deserialize_with = "lenient_text")]
    pub label: Option<String>,
    /// Scanner answer
    #[serde(default, deserialize_with = "lenient_text")]
    pub answer: Option<String>,
    /// Scanner explanation
    #[serde(default, deserialize_with = "lenient_text")]
    pub explanation: Option<String>,
    /// Entry metadata (non-object payloads read as absent)
    #[serde(default, deserialize_with = "lenient_object")]
    pub metadata: Option<Map<String, Value>>,
    /// Entry value
    #[serde(default)]
    pub value: Value,
    /// Explicit type tag; inferred from `value` when absent or unrecognized
    #[serde(
        default,
        rename = "type",
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_value_type"
    )]
    pub value_type: Option<ValueType>,
    /// References to transcript items (null reads as none)
    #[serde(default, deserialize_with = "null_as_default")]
    pub references: Vec<Reference>,
}

impl LabeledResult {
    /// References of one kind, in original order
    #[must_use]
    pub fn references_of(&self, kind: ReferenceKind) -> Vec<&Reference> {
        self.references.iter().filter(|r| r.kind == kind).collect()
    }

    /// Label if present and non-empty
    #[inline]
    #[must_use]
    pub fn non_empty_label(&self) -> Option<&str> {
        self.label.as_deref().filter(|label| !label.is_empty())
    }
}

/// Decode a resultset `value` cell
///
/// String cells are parsed with the codec; an already-structured array is
/// used directly.
///
/// # Errors
/// - `ResultsError::Decode` if the text is not valid JSON
/// - `ResultsError::Field` if the JSON is not a list of labeled results
pub async fn decode_resultset(
    cell: &Value,
    codec: &dyn JsonCodec,
) -> Result<Vec<LabeledResult>, ResultsError> {
    let decoded = match cell {
        Value::String(text) => codec
            .parse(text)
            .await
            .map_err(|e| ResultsError::decode("value", e))?,
        other => other.clone(),
    };

    serde_json::from_value(decoded).map_err(|e| ResultsError::field("value", e))
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::String(text)) => Some(text),
        Some(other) => Some(other.to_string()),
    })
}

fn lenient_object<'de, D>(deserializer: D) -> Result<Option<Map<String, Value>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Object(map)) => Some(map),
        _ => None,
    })
}

fn lenient_value_type<'de, D>(deserializer: D) -> Result<Option<ValueType>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(deserializer)?
        .as_ref()
        .and_then(|tag| ValueType::of_cell(Some(tag))))
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use scout_frame::SerdeJsonCodec;
    use serde_json::json;

    #[tokio::test]
    async fn decode_full_entry() {
        let codec = SerdeJsonCodec::default();
        let cell = json!(
            r#"[{"label": "deception", "answer": "yes", "explanation": "see [M1]",
                 "metadata": {"confidence": 0.8}, "value": true, "type": "boolean",
                 "references": [{"type": "message", "id": "m1", "cite": "[M1]"},
                                {"type": "event", "id": "e7"}]}]"#
        );

        let entries = decode_resultset(&cell, &codec).await.unwrap();
        assert_eq!(entries.len(), 1);

        let entry = &entries[0];
        assert_eq!(entry.label.as_deref(), Some("deception"));
        assert_eq!(entry.value, json!(true));
        assert_eq!(entry.value_type, Some(ValueType::Boolean));
        assert_eq!(entry.references_of(ReferenceKind::Message).len(), 1);
        assert_eq!(entry.references_of(ReferenceKind::Event)[0].id, "e7");
    }

    #[tokio::test]
    async fn decode_minimal_entry_defaults() {
        let codec = SerdeJsonCodec::default();
        let entries = decode_resultset(&json!(r#"[{"value": 3}]"#), &codec).await.unwrap();

        let entry = &entries[0];
        assert!(entry.label.is_none());
        assert!(entry.metadata.is_none());
        assert!(entry.value_type.is_none());
        assert!(entry.references.is_empty());
    }

    #[tokio::test]
    async fn decode_structured_cell() {
        let codec = SerdeJsonCodec::default();
        let entries = decode_resultset(&json!([{"label": "a", "value": 1}]), &codec)
            .await
            .unwrap();
        assert_eq!(entries[0].non_empty_label(), Some("a"));
    }

    #[tokio::test]
    async fn decode_rejects_malformed() {
        let codec = SerdeJsonCodec::default();
        let bad_json = decode_resultset(&json!("[{oops"), &codec).await;
        assert!(matches!(bad_json, Err(ResultsError::Decode { .. })));

        let not_list = decode_resultset(&json!(r#"{"label": "a"}"#), &codec).await;
        assert!(matches!(not_list, Err(ResultsError::Field { .. })));
    }

    #[test]
    fn empty_label_is_not_a_label() {
        let entry: LabeledResult = serde_json::from_value(json!({"label": "", "value": 1})).unwrap();
        assert_eq!(entry.non_empty_label(), None);
    }

    #[test]
    fn loose_optional_fields_do_not_reject_entry() {
        let entry: LabeledResult = serde_json::from_value(json!({
            "label": "a",
            "answer": 5,
            "explanation": null,
            "metadata": "not an object",
            "value": 1,
            "type": "category",
            "references": null,
        }))
        .unwrap();

        assert_eq!(entry.answer.as_deref(), Some("5"));
        assert_eq!(entry.explanation, None);
        assert_eq!(entry.metadata, None);
        assert_eq!(entry.value_type, None);
        assert!(entry.references.is_empty());
    }

    #[tokio::test]
    async fn null_references_keep_sibling_entries() {
        let codec = SerdeJsonCodec::default();
        let cell = json!(r#"[{"label": "a", "value": 1, "references": null},
                             {"label": "b", "value": 2, "answer": true}]"#);

        let entries = decode_resultset(&cell, &codec).await.unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].answer.as_deref(), Some("true"));
    }
}
