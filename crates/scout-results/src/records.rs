//! Row-to-record parsers
//!
//! Converts raw scan result rows into typed records. JSON-encoded columns are
//! decoded concurrently under one of two policies:
//!
//! - [`parse_json`]: structurally required columns, decode errors propagate
//! - [`try_parse_json`]: free-form validation columns, undecodable text is kept raw

use crate::error::{fallback_on_error, ResultsError};
use crate::resultset::Reference;
use crate::value::{ScanValue, ValueType};
use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use scout_frame::{JsonCodec, Row, Table};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::str::FromStr;

/// JSON object type used for metadata-like columns
pub type JsonMap = Map<String, Value>;

/// What a scanner was applied to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputType {
    /// Whole transcript
    Transcript,
    /// Single message
    Message,
    /// Message list
    Messages,
    /// Single event
    Event,
    /// Event list
    Events,
}

impl FromStr for InputType {
    type Err = ResultsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_value(Value::String(s.to_string()))
            .map_err(|e| ResultsError::field("input_type", e))
    }
}

/// Sample identifier (integer or string)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SampleId {
    /// Integer id
    Int(i64),
    /// String id
    Text(String),
}

impl SampleId {
    /// Read sample id from a cell
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(SampleId::Text(s.clone())),
            Value::Number(n) => as_i64(n).map(SampleId::Int),
            _ => None,
        }
    }
}

/// Transcript properties that may be recovered from transcript metadata
///
/// `None` means the column is absent from the row, which is distinct from a
/// present-but-null column (`Some(Value::Null)`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TranscriptProperties {
    /// `transcript_model` cell
    pub model: Option<Value>,
    /// `transcript_task_set` cell
    pub task_set: Option<Value>,
    /// `transcript_task_id` cell
    pub task_id: Option<Value>,
    /// `transcript_task_repeat` cell
    pub task_repeat: Option<Value>,
}

impl TranscriptProperties {
    /// Read properties from row columns
    #[must_use]
    pub fn from_row(row: &Row) -> Self {
        Self {
            model: row.get("transcript_model").cloned(),
            task_set: row.get("transcript_task_set").cloned(),
            task_id: row.get("transcript_task_id").cloned(),
            task_repeat: row.get("transcript_task_repeat").cloned(),
        }
    }
}

/// Fill absent transcript properties from transcript metadata
///
/// Only absent properties fall back (`model`, `task_name`, `id`, `epoch`);
/// a present null is kept.
#[must_use]
pub fn resolve_transcript_properties_from_metadata(
    properties: TranscriptProperties,
    metadata: &JsonMap,
) -> TranscriptProperties {
    let fallback = |key: &str| metadata.get(key).cloned();

    TranscriptProperties {
        model: properties.model.or_else(|| fallback("model")),
        task_set: properties.task_set.or_else(|| fallback("task_name")),
        task_id: properties.task_id.or_else(|| fallback("id")),
        task_repeat: properties.task_repeat.or_else(|| fallback("epoch")),
    }
}

/// Fully typed scan result
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResultData {
    /// Result id (absent on synthetic rows)
    pub uuid: Option<String>,
    /// Label within a resultset
    pub label: Option<String>,
    /// Scanner answer text
    pub answer: Option<String>,
    /// Scanner explanation
    pub explanation: Option<String>,
    /// RFC 3339 time the result was produced
    pub timestamp: Option<String>,
    /// Result metadata
    pub metadata: JsonMap,
    /// Decoded result value
    pub value: ScanValue,
    /// Tag for `value`
    pub value_type: ValueType,
    /// Validation outcome for this label
    pub validation_result: Option<Value>,
    /// Expected validation values
    pub validation_target: Option<Value>,
    /// Messages cited by the result
    pub message_references: Vec<Reference>,
    /// Events cited by the result
    pub event_references: Vec<Reference>,

    /// Ids of the scanned inputs
    pub input_ids: Vec<String>,
    /// Kind of scanned input
    pub input_type: Option<InputType>,

    /// Scan id
    pub scan_id: Option<String>,
    /// Scan tags
    pub scan_tags: Vec<String>,
    /// Scan metadata
    pub scan_metadata: JsonMap,
    /// Model usage keyed by model
    pub scan_model_usage: JsonMap,
    /// Total tokens used by the scan
    pub scan_total_tokens: Option<u64>,
    /// Events recorded during the scan
    pub scan_events: Vec<Value>,
    /// Scan error message
    pub scan_error: Option<String>,
    /// Scan error traceback
    pub scan_error_traceback: Option<String>,
    /// Whether the error was a model refusal
    pub scan_error_refusal: Option<bool>,

    /// Scanner key
    pub scanner_key: Option<String>,
    /// Scanner name
    pub scanner_name: Option<String>,
    /// File defining the scanner
    pub scanner_file: Option<String>,
    /// Scanner parameters
    pub scanner_params: JsonMap,

    /// Transcript id
    pub transcript_id: Option<String>,
    /// Source id of the transcript
    pub transcript_source_id: Option<String>,
    /// Source location of the transcript
    pub transcript_source_uri: Option<String>,
    /// Transcript date
    pub transcript_date: Option<String>,
    /// Task set name
    pub transcript_task_set: Option<String>,
    /// Sample id within the task set
    pub transcript_task_id: Option<SampleId>,
    /// Epoch of the sample
    pub transcript_task_repeat: Option<i64>,
    /// Agent name
    pub transcript_agent: Option<String>,
    /// Agent arguments
    pub transcript_agent_args: Option<Value>,
    /// Model name
    pub transcript_model: Option<String>,
    /// Transcript score
    pub transcript_score: Option<Value>,
    /// Whether the transcript succeeded
    pub transcript_success: Option<bool>,
    /// Total time in seconds
    pub transcript_total_time: Option<f64>,
    /// Total tokens in the transcript
    pub transcript_total_tokens: Option<u64>,
    /// Transcript error
    pub transcript_error: Option<String>,
    /// Limit that ended the transcript
    pub transcript_limit: Option<String>,
    /// Transcript metadata
    pub transcript_metadata: JsonMap,
}

impl ScanResultData {
    /// Result timestamp as UTC (None if absent or not RFC 3339)
    #[must_use]
    pub fn timestamp_utc(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(self.timestamp.as_deref())
    }

    /// Check if the scan errored for this result
    #[inline]
    #[must_use]
    pub fn has_error(&self) -> bool {
        self.scan_error.is_some()
    }
}

/// List-view subset of a scan result
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResultSummary {
    /// Result id (absent on synthetic rows)
    pub uuid: Option<String>,
    /// Label within a resultset
    pub label: Option<String>,
    /// Scanner answer text
    pub answer: Option<String>,
    /// Scanner explanation
    pub explanation: Option<String>,
    /// RFC 3339 time the result was produced
    pub timestamp: Option<String>,
    /// Decoded result value
    pub value: ScanValue,
    /// Tag for `value`
    pub value_type: ValueType,
    /// Validation outcome for this label
    pub validation_result: Option<Value>,
    /// Expected validation values
    pub validation_target: Option<Value>,
    /// Messages cited by the result
    pub message_references: Vec<Reference>,
    /// Events cited by the result
    pub event_references: Vec<Reference>,
    /// Kind of scanned input
    pub input_type: Option<InputType>,
    /// Scan error message
    pub scan_error: Option<String>,
    /// Whether the error was a model refusal
    pub scan_error_refusal: Option<bool>,
    /// Transcript id
    pub transcript_id: Option<String>,
    /// Source id of the transcript
    pub transcript_source_id: Option<String>,
    /// Task set name
    pub transcript_task_set: Option<String>,
    /// Sample id within the task set
    pub transcript_task_id: Option<SampleId>,
    /// Epoch of the sample
    pub transcript_task_repeat: Option<i64>,
    /// Model name
    pub transcript_model: Option<String>,
    /// Transcript metadata
    pub transcript_metadata: JsonMap,
}

impl ScanResultSummary {
    /// Result timestamp as UTC (None if absent or not RFC 3339)
    #[must_use]
    pub fn timestamp_utc(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(self.timestamp.as_deref())
    }
}

/// Decode a required structured column
///
/// Absent or null cells yield `null`; structured cells are used as-is.
///
/// # Errors
/// Returns `ResultsError::Decode` if a string cell is not valid JSON
pub async fn parse_json(row: &Row, column: &str, codec: &dyn JsonCodec) -> Result<Value, ResultsError> {
    match row.get(column) {
        None | Some(Value::Null) => Ok(Value::Null),
        Some(Value::String(text)) => codec
            .parse(text)
            .await
            .map_err(|e| ResultsError::decode(column, e)),
        Some(other) => Ok(other.clone()),
    }
}

/// Decode an optional free-form column, keeping undecodable text raw
pub async fn try_parse_json(row: &Row, column: &str, codec: &dyn JsonCodec) -> Value {
    match row.get(column) {
        None | Some(Value::Null) => Value::Null,
        Some(Value::String(text)) => {
            fallback_on_error(codec.parse(text).await, column, || Value::String(text.clone()))
        }
        Some(other) => other.clone(),
    }
}

/// Parse the first row of a (filtered) table into a full record
///
/// # Errors
/// - `ResultsError::EmptyTable` if the table has no rows
/// - `ResultsError::Decode` / `ResultsError::Field` if a required column is malformed
pub async fn parse_scan_result_data(
    table: &Table,
    codec: &dyn JsonCodec,
) -> Result<ScanResultData, ResultsError> {
    let row = table.row(0).ok_or(ResultsError::EmptyTable)?;
    parse_row_data(&row, codec).await
}

/// Parse raw row objects into summaries, preserving order
///
/// # Errors
/// Fails on the first row with a malformed required column
pub async fn parse_scan_result_summaries(
    rows: &[Row],
    codec: &dyn JsonCodec,
) -> Result<Vec<ScanResultSummary>, ResultsError> {
    try_join_all(rows.iter().map(|row| parse_row_summary(row, codec))).await
}

async fn parse_row_data(row: &Row, codec: &dyn JsonCodec) -> Result<ScanResultData, ResultsError> {
    let value_type = value_type_of(row)?;
    let raw_value = row.get("value").cloned().unwrap_or(Value::Null);

    let (
        metadata,
        message_references,
        event_references,
        input_ids,
        scan_events,
        scan_metadata,
        scan_model_usage,
        scan_tags,
        scanner_params,
        transcript_metadata,
        transcript_agent_args,
        transcript_score,
        validation_result,
        validation_target,
        value,
    ) = futures::try_join!(
        parse_json(row, "metadata", codec),
        parse_json(row, "message_references", codec),
        parse_json(row, "event_references", codec),
        parse_json(row, "input_ids", codec),
        parse_json(row, "scan_events", codec),
        parse_json(row, "scan_metadata", codec),
        parse_json(row, "scan_model_usage", codec),
        parse_json(row, "scan_tags", codec),
        parse_json(row, "scanner_params", codec),
        parse_json(row, "transcript_metadata", codec),
        parse_json(row, "transcript_agent_args", codec),
        parse_json(row, "transcript_score", codec),
        async { Ok::<_, ResultsError>(try_parse_json(row, "validation_result", codec).await) },
        async { Ok::<_, ResultsError>(try_parse_json(row, "validation_target", codec).await) },
        ScanValue::decode(&raw_value, value_type, codec),
    )?;

    let transcript_metadata: JsonMap = typed(transcript_metadata, "transcript_metadata")?;
    let transcript = resolve_transcript_properties_from_metadata(
        TranscriptProperties::from_row(row),
        &transcript_metadata,
    );

    Ok(ScanResultData {
        uuid: string_cell(row, "uuid"),
        label: string_cell(row, "label"),
        answer: string_cell(row, "answer"),
        explanation: string_cell(row, "explanation"),
        timestamp: string_cell(row, "timestamp"),
        metadata: typed(metadata, "metadata")?,
        value,
        value_type,
        validation_result: non_null(validation_result),
        validation_target: non_null(validation_target),
        message_references: typed(message_references, "message_references")?,
        event_references: typed(event_references, "event_references")?,

        input_ids: typed(input_ids, "input_ids")?,
        input_type: input_type_cell(row),

        scan_id: string_cell(row, "scan_id"),
        scan_tags: typed(scan_tags, "scan_tags")?,
        scan_metadata: typed(scan_metadata, "scan_metadata")?,
        scan_model_usage: typed(scan_model_usage, "scan_model_usage")?,
        scan_total_tokens: u64_cell(row, "scan_total_tokens"),
        scan_events: typed(scan_events, "scan_events")?,
        scan_error: string_cell(row, "scan_error"),
        scan_error_traceback: string_cell(row, "scan_error_traceback"),
        scan_error_refusal: bool_cell(row, "scan_error_refusal"),

        scanner_key: string_cell(row, "scanner_key"),
        scanner_name: string_cell(row, "scanner_name"),
        scanner_file: string_cell(row, "scanner_file"),
        scanner_params: typed(scanner_params, "scanner_params")?,

        transcript_id: string_cell(row, "transcript_id"),
        transcript_source_id: string_cell(row, "transcript_source_id"),
        transcript_source_uri: string_cell(row, "transcript_source_uri"),
        transcript_date: string_cell(row, "transcript_date"),
        transcript_task_set: transcript.task_set.as_ref().and_then(value_as_string),
        transcript_task_id: transcript.task_id.as_ref().and_then(SampleId::from_value),
        transcript_task_repeat: transcript
            .task_repeat
            .as_ref()
            .and_then(Value::as_number)
            .and_then(as_i64),
        transcript_agent: string_cell(row, "transcript_agent"),
        transcript_agent_args: non_null(transcript_agent_args),
        transcript_model: transcript.model.as_ref().and_then(value_as_string),
        transcript_score: non_null(transcript_score),
        transcript_success: bool_cell(row, "transcript_success"),
        transcript_total_time: row.get("transcript_total_time").and_then(Value::as_f64),
        transcript_total_tokens: u64_cell(row, "transcript_total_tokens"),
        transcript_error: string_cell(row, "transcript_error"),
        transcript_limit: string_cell(row, "transcript_limit"),
        transcript_metadata,
    })
}

async fn parse_row_summary(
    row: &Row,
    codec: &dyn JsonCodec,
) -> Result<ScanResultSummary, ResultsError> {
    let value_type = value_type_of(row)?;
    let raw_value = row.get("value").cloned().unwrap_or(Value::Null);

    let (message_references, event_references, transcript_metadata, validation_result, validation_target, value) =
        futures::try_join!(
            parse_json(row, "message_references", codec),
            parse_json(row, "event_references", codec),
            parse_json(row, "transcript_metadata", codec),
            async { Ok::<_, ResultsError>(try_parse_json(row, "validation_result", codec).await) },
            async { Ok::<_, ResultsError>(try_parse_json(row, "validation_target", codec).await) },
            ScanValue::decode(&raw_value, value_type, codec),
        )?;

    let transcript_metadata: JsonMap = typed(transcript_metadata, "transcript_metadata")?;
    let transcript = resolve_transcript_properties_from_metadata(
        TranscriptProperties::from_row(row),
        &transcript_metadata,
    );

    Ok(ScanResultSummary {
        uuid: string_cell(row, "uuid"),
        label: string_cell(row, "label"),
        answer: string_cell(row, "answer"),
        explanation: string_cell(row, "explanation"),
        timestamp: string_cell(row, "timestamp"),
        value,
        value_type,
        validation_result: non_null(validation_result),
        validation_target: non_null(validation_target),
        message_references: typed(message_references, "message_references")?,
        event_references: typed(event_references, "event_references")?,
        input_type: input_type_cell(row),
        scan_error: string_cell(row, "scan_error"),
        scan_error_refusal: bool_cell(row, "scan_error_refusal"),
        transcript_id: string_cell(row, "transcript_id"),
        transcript_source_id: string_cell(row, "transcript_source_id"),
        transcript_task_set: transcript.task_set.as_ref().and_then(value_as_string),
        transcript_task_id: transcript.task_id.as_ref().and_then(SampleId::from_value),
        transcript_task_repeat: transcript
            .task_repeat
            .as_ref()
            .and_then(Value::as_number)
            .and_then(as_i64),
        transcript_model: transcript.model.as_ref().and_then(value_as_string),
        transcript_metadata,
    })
}

/// Tag of the row; inferred from the value when the tag column is absent or null
fn value_type_of(row: &Row) -> Result<ValueType, ResultsError> {
    match row.get("value_type") {
        Some(Value::String(tag)) => tag.parse(),
        None | Some(Value::Null) => Ok(ValueType::infer(row.get("value").unwrap_or(&Value::Null))),
        Some(other) => Err(ResultsError::UnknownValueType(other.to_string())),
    }
}

/// Deserialize a decoded column; null yields the type's default
fn typed<T>(value: Value, column: &str) -> Result<T, ResultsError>
where
    T: DeserializeOwned + Default,
{
    if value.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(value).map_err(|e| ResultsError::field(column, e))
}

fn non_null(value: Value) -> Option<Value> {
    (!value.is_null()).then_some(value)
}

fn value_as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn string_cell(row: &Row, column: &str) -> Option<String> {
    row.get(column).and_then(value_as_string)
}

fn bool_cell(row: &Row, column: &str) -> Option<bool> {
    row.get(column).and_then(Value::as_bool)
}

fn u64_cell(row: &Row, column: &str) -> Option<u64> {
    let n = row.get(column).and_then(Value::as_number)?;
    n.as_u64().or_else(|| {
        // columnar storage may widen integers to floats
        n.as_f64()
            .filter(|f| f.fract() == 0.0 && *f >= 0.0 && *f <= u64::MAX as f64)
            .map(|f| f as u64)
    })
}

fn as_i64(n: &serde_json::Number) -> Option<i64> {
    n.as_i64().or_else(|| {
        n.as_f64()
            .filter(|f| f.fract() == 0.0 && f.abs() <= i64::MAX as f64)
            .map(|f| f as i64)
    })
}

fn input_type_cell(row: &Row) -> Option<InputType> {
    let tag = row.get("input_type").and_then(Value::as_str)?;
    fallback_on_error(tag.parse::<InputType>().map(Some), "input_type", || None)
}

fn parse_timestamp(timestamp: Option<&str>) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(timestamp?)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}
