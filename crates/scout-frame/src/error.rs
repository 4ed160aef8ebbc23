//! Error types for tables and the JSON codec

/// Errors while constructing tables
#[derive(Debug, thiserror::Error)]
pub enum TableError {
    /// Columns disagree on row count
    #[error("column '{column}' has {actual} rows, expected {expected}")]
    ColumnLengthMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },
}

impl TableError {
    /// Create length mismatch error for column
    pub fn length_mismatch(column: impl Into<String>, expected: usize, actual: usize) -> Self {
        Self::ColumnLengthMismatch {
            column: column.into(),
            expected,
            actual,
        }
    }
}

/// Errors while decoding or encoding JSON text
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// Text is not valid JSON
    #[error("invalid json: {0}")]
    Json(#[source] serde_json::Error),

    /// Blocking decode task did not complete
    #[error("offloaded decode failed: {0}")]
    Offload(String),

    /// Value could not be rendered as JSON text
    #[error("serialization failed: {0}")]
    Serialize(#[source] serde_json::Error),
}

impl DecodeError {
    /// True when the input text itself was malformed
    #[inline]
    #[must_use]
    pub fn is_syntax(&self) -> bool {
        matches!(self, Self::Json(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_mismatch_display() {
        let err = TableError::length_mismatch("value", 3, 2);
        assert_eq!(err.to_string(), "column 'value' has 2 rows, expected 3");
    }

    #[test]
    fn json_error_is_syntax() {
        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = DecodeError::Json(source);
        assert!(err.is_syntax());
        assert!(err.to_string().starts_with("invalid json"));
        assert!(!DecodeError::Offload("cancelled".to_string()).is_syntax());
    }
}
