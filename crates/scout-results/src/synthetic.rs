//! Synthetic row synthesis
//!
//! Scanners often omit a label entirely when the outcome is negative. When the
//! validation target explicitly expected a negative for such a label, a row is
//! synthesized so per-label aggregates still see one row per (item, label).

use crate::error::{fallback_on_error, ResultsError};
use crate::rows::{columns, empty_object, SyntheticRow};
use scout_frame::{JsonCodec, Row};
use crate::value::kind_name;
use serde_json::{Map, Value};
use std::collections::HashSet;

/// Check for a value treated as "absence means this"
///
/// Sentinels: `false`, `null`, `"NONE"`, `"none"`, `0`, `""`.
#[must_use]
pub fn is_negative_sentinel(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => true,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => matches!(s.as_str(), "NONE" | "none" | ""),
        Value::Bool(true) | Value::Array(_) | Value::Object(_) => false,
    }
}

/// Create rows for expected-but-absent negative labels
///
/// `expanded` is the full expansion output; its first row supplies the
/// validation target and results. `resultset_rows` are the raw pre-expansion
/// rows; the first is the field template for every synthetic row.
///
/// # Errors
/// Returns `ResultsError::Decode` if the first expanded row carries a
/// `validation_result` string that is not valid JSON
pub async fn create_synthetic_rows(
    expanded: &[Row],
    resultset_rows: &[Row],
    codec: &dyn JsonCodec,
) -> Result<Vec<Row>, ResultsError> {
    let (Some(first), Some(template)) = (expanded.first(), resultset_rows.first()) else {
        return Ok(Vec::new());
    };

    let Some(Value::String(raw_target)) = first.get(columns::VALIDATION_TARGET) else {
        return Ok(Vec::new());
    };

    let target = fallback_on_error(
        parse_target(raw_target, codec).await.map(Some),
        "validation target",
        || None,
    );
    let Some(target) = target else {
        return Ok(Vec::new());
    };

    let validation_results = match first.get(columns::VALIDATION_RESULT) {
        None | Some(Value::Null) => empty_object(),
        Some(Value::String(raw)) if raw.is_empty() => empty_object(),
        Some(Value::String(raw)) => codec
            .parse(raw)
            .await
            .map_err(|e| ResultsError::decode(columns::VALIDATION_RESULT, e))?,
        Some(other) => other.clone(),
    };

    let present: HashSet<&str> = expanded
        .iter()
        .filter_map(|row| row.get(columns::LABEL).and_then(Value::as_str))
        .collect();

    let synthetic: Vec<Row> = target
        .iter()
        .filter(|(label, _)| !present.contains(label.as_str()))
        .filter(|(_, expected)| is_negative_sentinel(expected))
        .map(|(label, expected)| {
            let validation_result = validation_results
                .get(label)
                .cloned()
                .unwrap_or(Value::Null);

            SyntheticRow {
                label: label.clone(),
                expected: expected.clone(),
                validation_result,
            }
            .apply(template)
        })
        .collect();

    if !synthetic.is_empty() {
        tracing::debug!(count = synthetic.len(), "synthesized rows for absent negative labels");
    }

    Ok(synthetic)
}

/// Decode the validation target, which must be an object of label expectations
async fn parse_target(raw: &str, codec: &dyn JsonCodec) -> Result<Map<String, Value>, ResultsError> {
    match codec.parse(raw).await {
        Ok(Value::Object(target)) => Ok(target),
        Ok(other) => Err(ResultsError::ValueShape {
            expected: "object",
            found: kind_name(&other),
        }),
        Err(error) => Err(ResultsError::decode(columns::VALIDATION_TARGET, error)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scout_frame::SerdeJsonCodec;
    use serde_json::json;

    fn row(value: Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    fn template(target: &str, validation: &str) -> Row {
        row(json!({
            "uuid": "parent",
            "transcript_id": "t1",
            "value": "[]",
            "value_type": "resultset",
            "validation_target": target,
            "validation_result": validation,
            "scan_error": "boom",
        }))
    }

    fn expanded(label: &str, target: &str, validation: Value) -> Row {
        row(json!({
            "uuid": "parent",
            "label": label,
            "validation_target": target,
            "validation_result": validation,
        }))
    }

    #[test]
    fn sentinels() {
        for v in [json!(false), Value::Null, json!("NONE"), json!("none"), json!(0), json!(0.0), json!("")] {
            assert!(is_negative_sentinel(&v), "{v} should be a sentinel");
        }
        for v in [json!(true), json!(1), json!("None"), json!("no"), json!([]), json!({})] {
            assert!(!is_negative_sentinel(&v), "{v} should not be a sentinel");
        }
    }

    #[tokio::test]
    async fn synthesizes_missing_negative_label() {
        let codec = SerdeJsonCodec::default();
        let target = r#"{"a": true, "b": false}"#;
        let validation = r#"{"a": true, "b": true}"#;
        let expanded = vec![expanded("a", target, json!(validation))];
        let raw = vec![template(target, validation)];

        let rows = create_synthetic_rows(&expanded, &raw, &codec).await.unwrap();

        assert_eq!(rows.len(), 1);
        let synthetic = &rows[0];
        assert_eq!(synthetic["label"], json!("b"));
        assert_eq!(synthetic["value"], json!(false));
        assert_eq!(synthetic["value_type"], json!("boolean"));
        assert_eq!(synthetic["scan_error"], Value::Null);
        assert_eq!(synthetic["uuid"], Value::Null);
        assert_eq!(synthetic["validation_result"], json!(true));
        assert_eq!(synthetic["transcript_id"], json!("t1"));
    }

    #[tokio::test]
    async fn skips_non_negative_missing_label() {
        let codec = SerdeJsonCodec::default();
        let target = r#"{"a": true, "b": true}"#;
        let expanded = vec![expanded("a", target, Value::Null)];
        let raw = vec![template(target, "{}")];

        let rows = create_synthetic_rows(&expanded, &raw, &codec).await.unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn visits_labels_in_target_order() {
        let codec = SerdeJsonCodec::default();
        let target = r#"{"z": null, "a": "NONE", "m": 0}"#;
        let expanded = vec![expanded("other", target, Value::Null)];
        let raw = vec![template(target, "{}")];

        let rows = create_synthetic_rows(&expanded, &raw, &codec).await.unwrap();
        let labels: Vec<_> = rows.iter().map(|r| r["label"].clone()).collect();
        assert_eq!(labels, vec![json!("z"), json!("a"), json!("m")]);
        assert_eq!(rows[1]["value_type"], json!("null"));
        assert_eq!(rows[2]["value"], json!(0));
    }

    #[tokio::test]
    async fn non_object_target_short_circuits() {
        let codec = SerdeJsonCodec::default();
        for target in ["[false]", "false", "{broken"] {
            let expanded = vec![expanded("a", target, Value::Null)];
            let raw = vec![template(target, "{}")];
            let rows = create_synthetic_rows(&expanded, &raw, &codec).await.unwrap();
            assert!(rows.is_empty(), "target {target} should not synthesize");
        }
    }

    #[tokio::test]
    async fn missing_target_or_inputs_short_circuit() {
        let codec = SerdeJsonCodec::default();
        let no_target = vec![row(json!({"label": "a"}))];
        let raw = vec![template("{}", "{}")];

        assert!(create_synthetic_rows(&no_target, &raw, &codec).await.unwrap().is_empty());
        assert!(create_synthetic_rows(&[], &raw, &codec).await.unwrap().is_empty());
        assert!(create_synthetic_rows(&no_target, &[], &codec).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn malformed_validation_result_propagates() {
        let codec = SerdeJsonCodec::default();
        let target = r#"{"a": true, "b": false}"#;
        let expanded = vec![expanded("a", target, json!("{not json"))];
        let raw = vec![template(target, "{not json")];

        let err = create_synthetic_rows(&expanded, &raw, &codec).await.unwrap_err();
        assert!(matches!(err, ResultsError::Decode { ref column, .. } if column == "validation_result"));
    }

    #[tokio::test]
    async fn scalar_validation_result_yields_null_lookup() {
        let codec = SerdeJsonCodec::default();
        let target = r#"{"a": true, "b": false}"#;
        let expanded = vec![expanded("a", target, json!(true))];
        let raw = vec![template(target, r#"{"a": true, "b": true}"#)];

        let rows = create_synthetic_rows(&expanded, &raw, &codec).await.unwrap();
        assert_eq!(rows[0]["validation_result"], Value::Null);
    }
}
