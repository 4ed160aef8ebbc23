//! Scout Results
//!
//! Normalization of raw scan result tables into a flat, one-row-per-label
//! shape and into typed records.
//!
//! # Core Operations
//!
//! - **Expand**: fan `resultset` rows out into one row per labeled entry
//! - **Synthesize**: add rows for expected-but-absent negative labels
//! - **Parse**: turn rows into [`ScanResultData`] / [`ScanResultSummary`]
//!
//! # Architecture
//!
//! ```text
//! ResultsSource → Table → ResultsetExpander → Table → records → ScanResultData
//!                               ↑_______________↓
//!                   ExpandedTableCache (per scan location + scanner)
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use scout_results::{PipelineConfig, ResultsPipeline};
//!
//! # async fn example(raw: scout_frame::Table) -> Result<(), Box<dyn std::error::Error>> {
//! let pipeline = ResultsPipeline::new(PipelineConfig::default());
//!
//! let expanded = pipeline.expand(raw).await?;
//! let summaries = pipeline.parse_summaries(&expanded.objects()).await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

// Core modules
pub mod cache;
pub mod config;
pub mod error;
pub mod expand;
pub mod pipeline;
pub mod records;
pub mod resultset;
pub mod rows;
pub mod synthetic;
pub mod value;

// Re-exports for convenience
pub use cache::{CacheStats, ExpandedTableCache, ScanResultsKey};
pub use config::{CacheConfig, CodecConfig, PipelineConfig};
pub use error::{ConfigError, ResultsError, ResultsResult};
pub use expand::{expand_resultset_rows, extract_label_validation, ResultsetExpander};
pub use pipeline::{ResultsPipeline, ResultsSource};
pub use records::{
    parse_json, parse_scan_result_data, parse_scan_result_summaries,
    resolve_transcript_properties_from_metadata, try_parse_json, InputType, SampleId,
    ScanResultData, ScanResultSummary, TranscriptProperties,
};
pub use resultset::{LabeledResult, Reference, ReferenceKind};
pub use synthetic::{create_synthetic_rows, is_negative_sentinel};
pub use value::{maybe_serialize_value, ScanValue, ValueType};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for normalizing scan results
    pub use crate::config::PipelineConfig;
    pub use crate::error::{ResultsError, ResultsResult};
    pub use crate::expand::ResultsetExpander;
    pub use crate::pipeline::{ResultsPipeline, ResultsSource};
    pub use crate::records::{ScanResultData, ScanResultSummary};
    pub use crate::value::{ScanValue, ValueType};
    pub use scout_frame::{JsonCodec, Row, SerdeJsonCodec, Table};
}
