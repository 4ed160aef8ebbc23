//! Testing utilities for scout results workspace
//!
//! Shared row fixtures, table helpers and tracing setup.

#![allow(missing_docs)]

use scout_frame::{Row, Table};
use serde_json::{json, Value};
use std::sync::Once;

/// Convert a `json!` object literal into a row
pub fn row(value: Value) -> Row {
    match value {
        Value::Object(map) => map,
        other => panic!("row fixture must be a JSON object, got {other}"),
    }
}

/// Build table from rows
pub fn table_of(rows: Vec<Row>) -> Table {
    Table::from_objects(rows)
}

/// Scalar result row with the common column set
pub fn scalar_row(uuid: &str, value: Value, value_type: &str) -> Row {
    ScanRowBuilder::new(uuid).value(value, value_type).build()
}

/// Resultset row whose `value` is the JSON text of `entries`
pub fn resultset_row(uuid: &str, entries: Value) -> Row {
    ScanRowBuilder::new(uuid).resultset(entries).build()
}

/// Fluent builder for raw scan result rows
#[derive(Debug, Clone)]
pub struct ScanRowBuilder {
    row: Row,
}

impl ScanRowBuilder {
    pub fn new(uuid: &str) -> Self {
        Self {
            row: row(json!({
                "uuid": uuid,
                "scan_id": "scan-1",
                "scanner_key": "scanner",
                "transcript_id": format!("transcript-{uuid}"),
                "label": null,
                "answer": null,
                "explanation": null,
                "value": null,
                "value_type": "null",
                "validation_result": null,
                "validation_target": null,
                "scan_error": null,
            })),
        }
    }

    pub fn value(mut self, value: Value, value_type: &str) -> Self {
        self.row.insert("value".into(), value);
        self.row.insert("value_type".into(), json!(value_type));
        self
    }

    /// Store `entries` as JSON text with the resultset tag
    pub fn resultset(self, entries: Value) -> Self {
        let text = entries.to_string();
        self.value(Value::String(text), "resultset")
    }

    /// Store `target` as JSON text in `validation_target`
    pub fn validation_target(self, target: Value) -> Self {
        self.set("validation_target", Value::String(target.to_string()))
    }

    /// Store `result` as JSON text in `validation_result`
    pub fn validation_result(self, result: Value) -> Self {
        self.set("validation_result", Value::String(result.to_string()))
    }

    pub fn set(mut self, column: &str, value: Value) -> Self {
        self.row.insert(column.into(), value);
        self
    }

    pub fn without(mut self, column: &str) -> Self {
        self.row.shift_remove(column);
        self
    }

    pub fn build(self) -> Row {
        self.row
    }
}

static TRACING: Once = Once::new();

/// Install a test-writer tracing subscriber once per process
///
/// Honors `RUST_LOG`; defaults to `warn`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}
