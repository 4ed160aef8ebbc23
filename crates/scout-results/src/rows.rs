//! Output row builders
//!
//! Each kind of row the pipeline emits is built from its parent row plus an
//! explicit override set, so the fields a row kind changes are visible in one
//! place.

use crate::error::ResultsError;
use crate::resultset::{LabeledResult, ReferenceKind};
use crate::value::{maybe_serialize_value, ValueType};
use scout_frame::{JsonCodec, Row};
use serde_json::{Map, Value};

/// Column names written by the builders
pub mod columns {
    /// Result id
    pub const UUID: &str = "uuid";
    /// Resultset label
    pub const LABEL: &str = "label";
    /// Answer text
    pub const ANSWER: &str = "answer";
    /// Explanation text
    pub const EXPLANATION: &str = "explanation";
    /// Result metadata
    pub const METADATA: &str = "metadata";
    /// Result value
    pub const VALUE: &str = "value";
    /// Tag for `value`
    pub const VALUE_TYPE: &str = "value_type";
    /// Cited messages as JSON text
    pub const MESSAGE_REFERENCES: &str = "message_references";
    /// Cited events as JSON text
    pub const EVENT_REFERENCES: &str = "event_references";
    /// Validation outcome
    pub const VALIDATION_RESULT: &str = "validation_result";
    /// Expected validation values
    pub const VALIDATION_TARGET: &str = "validation_target";
    /// Scan error message
    pub const SCAN_ERROR: &str = "scan_error";
    /// Prefix shared by all scan error columns
    pub const SCAN_ERROR_PREFIX: &str = "scan_error";
}

/// Row produced from one resultset entry
#[derive(Debug, Clone, PartialEq)]
pub struct ExpandedRow {
    /// Entry label
    pub label: Option<String>,
    /// Entry answer
    pub answer: Option<String>,
    /// Entry explanation
    pub explanation: Option<String>,
    /// Serialized entry metadata
    pub metadata: Value,
    /// Serialized entry value
    pub value: Value,
    /// Tag for the entry value
    pub value_type: ValueType,
    /// Message references as JSON text
    pub message_references: Value,
    /// Event references as JSON text
    pub event_references: Value,
    /// Per-label validation result, replaces the parent's when set
    pub validation_result: Option<Value>,
}

impl ExpandedRow {
    /// Build override set from a resultset entry
    ///
    /// # Errors
    /// Returns `ResultsError::Decode` if a structured field cannot be serialized
    pub fn from_entry(entry: &LabeledResult, codec: &dyn JsonCodec) -> Result<Self, ResultsError> {
        let metadata = Value::Object(entry.metadata.clone().unwrap_or_default());

        Ok(Self {
            label: entry.label.clone(),
            answer: entry.answer.clone(),
            explanation: entry.explanation.clone(),
            metadata: maybe_serialize_value(&metadata, codec)?,
            value: maybe_serialize_value(&entry.value, codec)?,
            value_type: entry
                .value_type
                .unwrap_or_else(|| ValueType::infer(&entry.value)),
            message_references: serialize_references(entry, ReferenceKind::Message, codec)?,
            event_references: serialize_references(entry, ReferenceKind::Event, codec)?,
            validation_result: None,
        })
    }

    /// Set per-label validation result
    #[inline]
    #[must_use]
    pub fn with_validation_result(mut self, validation: Value) -> Self {
        self.validation_result = Some(validation);
        self
    }

    /// Apply overrides to a copy of the parent row
    #[must_use]
    pub fn apply(self, parent: &Row) -> Row {
        let mut row = parent.clone();
        row.insert(columns::LABEL.into(), opt_string(self.label));
        row.insert(columns::ANSWER.into(), opt_string(self.answer));
        row.insert(columns::EXPLANATION.into(), opt_string(self.explanation));
        row.insert(columns::METADATA.into(), self.metadata);
        row.insert(columns::VALUE.into(), self.value);
        row.insert(columns::VALUE_TYPE.into(), self.value_type.into());
        row.insert(columns::MESSAGE_REFERENCES.into(), self.message_references);
        row.insert(columns::EVENT_REFERENCES.into(), self.event_references);
        if let Some(validation) = self.validation_result {
            row.insert(columns::VALIDATION_RESULT.into(), validation);
        }
        row
    }
}

/// Row standing in for a resultset that decoded to no entries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmptyResultsetRow;

impl EmptyResultsetRow {
    /// Apply overrides to a copy of the parent row
    #[must_use]
    pub fn apply(self, parent: &Row) -> Row {
        let mut row = parent.clone();
        row.insert(columns::VALUE.into(), Value::Null);
        row.insert(columns::VALUE_TYPE.into(), ValueType::Null.into());
        row
    }
}

/// Row making an expected-but-absent negative label explicit
#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticRow {
    /// Missing label
    pub label: String,
    /// Negative sentinel taken from the validation target
    pub expected: Value,
    /// Validation result recorded for the label
    pub validation_result: Value,
}

impl SyntheticRow {
    /// Apply overrides to a copy of the raw resultset template row
    ///
    /// `validation_target` is inherited unchanged.
    #[must_use]
    pub fn apply(self, template: &Row) -> Row {
        let value_type = if self.expected.is_boolean() {
            ValueType::Boolean
        } else {
            ValueType::Null
        };

        let mut row = template.clone();
        row.insert(columns::LABEL.into(), Value::String(self.label));
        row.insert(columns::VALUE.into(), self.expected);
        row.insert(columns::VALUE_TYPE.into(), value_type.into());
        row.insert(columns::ANSWER.into(), Value::Null);
        row.insert(columns::EXPLANATION.into(), Value::Null);
        row.insert(columns::METADATA.into(), Value::String("{}".into()));
        row.insert(columns::MESSAGE_REFERENCES.into(), Value::String("[]".into()));
        row.insert(columns::EVENT_REFERENCES.into(), Value::String("[]".into()));
        row.insert(columns::UUID.into(), Value::Null);
        row.insert(columns::VALIDATION_RESULT.into(), self.validation_result);

        for (key, value) in row.iter_mut() {
            if key.starts_with(columns::SCAN_ERROR_PREFIX) {
                *value = Value::Null;
            }
        }
        row.insert(columns::SCAN_ERROR.into(), Value::Null);
        row
    }
}

fn serialize_references(
    entry: &LabeledResult,
    kind: ReferenceKind,
    codec: &dyn JsonCodec,
) -> Result<Value, ResultsError> {
    let refs = serde_json::to_value(entry.references_of(kind))
        .map_err(|e| ResultsError::field("references", e))?;
    maybe_serialize_value(&refs, codec)
}

fn opt_string(value: Option<String>) -> Value {
    value.map_or(Value::Null, Value::String)
}

/// Empty JSON object cell
#[inline]
#[must_use]
pub(crate) fn empty_object() -> Value {
    Value::Object(Map::new())
}
