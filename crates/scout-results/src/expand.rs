//! Resultset expansion
//!
//! Fans each `resultset` row out into one row per labeled entry, restructures
//! validation results per label, and appends synthetic rows for absent labels
//! whose expected outcome is negative.
//!
//! # Phases
//!
//! ```text
//! Table ─┬─ other rows ──────────────────────────────┐
//!        └─ resultset rows ─ decode (concurrent) ─ expanded rows ─ synthesize ─┴─→ Table
//! ```
//!
//! Synthesis starts only after every resultset row has been expanded.

use crate::error::{fallback_on_error, skip_on_error, ResultsError};
use crate::resultset::decode_resultset;
use crate::rows::{columns, EmptyResultsetRow, ExpandedRow};
use crate::synthetic::create_synthetic_rows;
use crate::value::ValueType;
use futures::future::join_all;
use scout_frame::{JsonCodec, Row, SerdeJsonCodec, Table};
use serde_json::Value;
use std::sync::Arc;

static NULL: Value = Value::Null;

/// Expands resultset rows of scan result tables
#[derive(Debug, Clone)]
pub struct ResultsetExpander {
    codec: Arc<dyn JsonCodec>,
    synthesize_missing_labels: bool,
}

impl ResultsetExpander {
    /// Create expander using codec
    #[inline]
    #[must_use]
    pub fn new(codec: Arc<dyn JsonCodec>) -> Self {
        Self {
            codec,
            synthesize_missing_labels: true,
        }
    }

    /// Enable or disable synthetic rows for absent negative labels
    #[inline]
    #[must_use]
    pub fn with_synthesis(mut self, enabled: bool) -> Self {
        self.synthesize_missing_labels = enabled;
        self
    }

    /// Codec used for decoding
    #[inline]
    #[must_use]
    pub fn codec(&self) -> &Arc<dyn JsonCodec> {
        &self.codec
    }

    /// Expand resultset rows
    ///
    /// Returns the input table unchanged when it has no rows, lacks the
    /// `value` / `value_type` columns, or holds no resultset rows. Otherwise
    /// returns a new table: other rows, then expanded rows, then synthetic
    /// rows, each group in original relative order.
    ///
    /// A resultset row whose value fails to decode is logged and skipped.
    ///
    /// # Errors
    /// Returns `ResultsError::Decode` only when synthesis meets a malformed
    /// `validation_result` on the first expanded row
    pub async fn expand(&self, table: Table) -> Result<Table, ResultsError> {
        if table.is_empty()
            || !table.has_column(columns::VALUE)
            || !table.has_column(columns::VALUE_TYPE)
        {
            return Ok(table);
        }

        let (resultset_rows, other_rows): (Vec<Row>, Vec<Row>) = table
            .objects()
            .into_iter()
            .partition(is_resultset_row);

        if resultset_rows.is_empty() {
            return Ok(table);
        }

        let codec = self.codec.as_ref();
        let outcomes = join_all(resultset_rows.iter().map(|row| expand_row(row, codec))).await;
        let skipped = outcomes.iter().filter(|o| o.is_none()).count();
        let expanded: Vec<Row> = outcomes.into_iter().flatten().flatten().collect();

        if expanded.is_empty() {
            tracing::debug!(skipped, "no resultset rows expanded");
            return Ok(Table::from_objects(other_rows));
        }

        let synthetic = if self.synthesize_missing_labels {
            create_synthetic_rows(&expanded, &resultset_rows, codec).await?
        } else {
            Vec::new()
        };

        tracing::debug!(
            input_rows = table.num_rows(),
            resultset_rows = resultset_rows.len(),
            expanded = expanded.len(),
            synthetic = synthetic.len(),
            skipped,
            "expanded resultset rows"
        );

        Ok(Table::from_objects(
            other_rows.into_iter().chain(expanded).chain(synthetic),
        ))
    }
}

impl Default for ResultsetExpander {
    fn default() -> Self {
        Self::new(Arc::new(SerdeJsonCodec::default()))
    }
}

/// Expand resultset rows with the given codec and default settings
///
/// # Errors
/// See [`ResultsetExpander::expand`]
pub async fn expand_resultset_rows(
    table: Table,
    codec: Arc<dyn JsonCodec>,
) -> Result<Table, ResultsError> {
    ResultsetExpander::new(codec).expand(table).await
}

fn is_resultset_row(row: &Row) -> bool {
    ValueType::of_cell(row.get(columns::VALUE_TYPE)) == Some(ValueType::Resultset)
}

/// Expand one resultset row; None if it had to be skipped
async fn expand_row(row: &Row, codec: &dyn JsonCodec) -> Option<Vec<Row>> {
    let uuid = row.get(columns::UUID).and_then(Value::as_str);
    let value = row.get(columns::VALUE).unwrap_or(&NULL);

    let entries = skip_on_error(decode_resultset(value, codec).await, "resultset row", uuid)?;

    if entries.is_empty() {
        return Some(vec![EmptyResultsetRow.apply(row)]);
    }

    let parent_validation = match row.get(columns::VALIDATION_RESULT) {
        Some(Value::String(raw)) => Some(raw.as_str()),
        _ => None,
    };

    let mut out = Vec::with_capacity(entries.len());
    for entry in &entries {
        let mut expanded = skip_on_error(
            ExpandedRow::from_entry(entry, codec),
            "resultset row",
            uuid,
        )?;

        if let (Some(raw), Some(label)) = (parent_validation, entry.non_empty_label()) {
            let validation = extract_label_validation(label, raw, codec).await;
            expanded = expanded.with_validation_result(validation);
        }

        out.push(expanded.apply(row));
    }

    Some(out)
}

/// Resolve the validation result for one label
///
/// - Object payloads yield the entry for `label` (null if absent)
/// - Any other payload is shared by all labels and returned as-is
/// - Undecodable text is returned verbatim
pub async fn extract_label_validation(label: &str, raw: &str, codec: &dyn JsonCodec) -> Value {
    let parsed = fallback_on_error(codec.parse(raw).await.map(Some), "validation result", || None);

    match parsed {
        Some(Value::Object(mut per_label)) => per_label.remove(label).unwrap_or(Value::Null),
        Some(shared) => shared,
        None => Value::String(raw.to_string()),
    }
}
