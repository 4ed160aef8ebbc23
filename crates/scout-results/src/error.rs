//! Error types for scan result normalization
//!
//! Two failure classes exist:
//! - Soft failures (one row, one label, one optional feature) are logged and
//!   discarded through [`skip_on_error`]
//! - Hard failures (required structured columns) surface as [`ResultsError`]

use scout_frame::DecodeError;
use std::path::PathBuf;
use std::sync::Arc;

/// Main error type for result normalization
#[derive(Debug, thiserror::Error)]
pub enum ResultsError {
    /// JSON text in a column could not be decoded
    #[error("failed to decode column '{column}': {source}")]
    Decode {
        column: String,
        #[source]
        source: DecodeError,
    },

    /// Decoded column did not match its expected structure
    #[error("invalid structure in column '{column}': {source}")]
    Field {
        column: String,
        #[source]
        source: serde_json::Error,
    },

    /// Value decoded to the wrong JSON shape for its tag
    #[error("value shape mismatch: expected {expected}, found {found}")]
    ValueShape {
        expected: &'static str,
        found: &'static str,
    },

    /// Unrecognized `value_type` tag
    #[error("unknown value type: '{0}'")]
    UnknownValueType(String),

    /// Record parser received a table without rows
    #[error("no rows to parse")]
    EmptyTable,

    /// Upstream fetch of the raw table failed
    #[error("fetch failed: {0}")]
    Fetch(String),

    /// One failure delivered to several concurrent callers
    #[error(transparent)]
    Shared(Arc<ResultsError>),
}

impl ResultsError {
    /// Create decode error for column
    pub fn decode(column: impl Into<String>, source: DecodeError) -> Self {
        Self::Decode {
            column: column.into(),
            source,
        }
    }

    /// Wrap an error that may be shared between concurrent callers
    ///
    /// Unwraps it again when this is the only holder.
    #[must_use]
    pub fn from_shared(shared: Arc<ResultsError>) -> Self {
        Arc::try_unwrap(shared).unwrap_or_else(Self::Shared)
    }

    /// Underlying error, looking through `Shared`
    #[must_use]
    pub fn root(&self) -> &ResultsError {
        match self {
            Self::Shared(inner) => inner.root(),
            other => other,
        }
    }

    /// Create field structure error for column
    pub fn field(column: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Field {
            column: column.into(),
            source,
        }
    }
}

/// Errors while loading pipeline configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO error reading config file
    #[error("io error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for the schema
    #[error("invalid config: {0}")]
    Toml(#[from] toml::de::Error),
}

impl ConfigError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias for normalization operations
pub type ResultsResult<T> = Result<T, ResultsError>;

/// Log a soft failure and discard it
///
/// With [`fallback_on_error`], the only places where recoverable errors are
/// dropped: the failing unit (a row) is skipped and the batch continues.
pub(crate) fn skip_on_error<T, E>(result: Result<T, E>, unit: &str, id: Option<&str>) -> Option<T>
where
    E: std::fmt::Display,
{
    match result {
        Ok(value) => Some(value),
        Err(error) => {
            tracing::warn!(unit, id = id.unwrap_or("<unknown>"), %error, "skipping {unit}");
            None
        }
    }
}

/// Log a soft failure and substitute a fallback value
///
/// For optional features that degrade (raw text kept, feature skipped)
/// instead of dropping a whole row. Logged at debug level.
pub(crate) fn fallback_on_error<T, E, F>(result: Result<T, E>, unit: &str, fallback: F) -> T
where
    E: std::fmt::Display,
    F: FnOnce() -> T,
{
    match result {
        Ok(value) => value,
        Err(error) => {
            tracing::debug!(unit, %error, "falling back for {unit}");
            fallback()
        }
    }
}
