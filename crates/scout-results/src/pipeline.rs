//! Results pipeline facade
//!
//! Wires the codec, expander and expanded-table cache built from one
//! [`PipelineConfig`].

use crate::cache::{ExpandedTableCache, ScanResultsKey};
use crate::config::PipelineConfig;
use crate::error::ResultsError;
use crate::expand::ResultsetExpander;
use crate::records::{
    parse_scan_result_data, parse_scan_result_summaries, ScanResultData, ScanResultSummary,
};
use async_trait::async_trait;
use scout_frame::{JsonCodec, Row, Table};
use std::future::Future;
use std::sync::Arc;

/// Provider of raw scan result tables
///
/// Implemented by whatever reads scan results from storage.
#[async_trait]
pub trait ResultsSource: Send + Sync {
    /// Fetch the raw table for one scanner of a scan
    async fn fetch(&self, key: &ScanResultsKey) -> Result<Table, ResultsError>;
}

/// Scan result normalization pipeline
#[derive(Debug, Clone)]
pub struct ResultsPipeline {
    config: PipelineConfig,
    codec: Arc<dyn JsonCodec>,
    expander: ResultsetExpander,
    cache: ExpandedTableCache,
}

impl ResultsPipeline {
    /// Create pipeline with the configured serde_json codec
    #[must_use]
    pub fn new(config: PipelineConfig) -> Self {
        let codec: Arc<dyn JsonCodec> = Arc::new(config.codec.build());
        Self::with_codec(config, codec)
    }

    /// Create pipeline with a custom codec
    ///
    /// The `codec` section of `config` is ignored.
    #[must_use]
    pub fn with_codec(config: PipelineConfig, codec: Arc<dyn JsonCodec>) -> Self {
        let expander = ResultsetExpander::new(Arc::clone(&codec))
            .with_synthesis(config.synthesize_missing_labels);
        let cache = config.cache.build();

        tracing::debug!(
            synthesize_missing_labels = config.synthesize_missing_labels,
            cache_capacity = config.cache.max_capacity,
            "results pipeline created"
        );

        Self {
            config,
            codec,
            expander,
            cache,
        }
    }

    /// Expand resultset rows of a raw table
    ///
    /// # Errors
    /// See [`ResultsetExpander::expand`]
    pub async fn expand(&self, table: Table) -> Result<Table, ResultsError> {
        self.expander.expand(table).await
    }

    /// Expand a fetched table, reusing the cached expansion for `key`
    ///
    /// # Errors
    /// Propagates errors from `fetch` and expansion; failures are not cached
    pub async fn expand_cached<F, Fut>(
        &self,
        key: ScanResultsKey,
        fetch: F,
    ) -> Result<Arc<Table>, ResultsError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Table, ResultsError>>,
    {
        self.cache
            .try_get_or_insert_with(key, || async move {
                let raw = fetch().await?;
                self.expander.expand(raw).await
            })
            .await
    }

    /// Fetch from `source` and expand, reusing the cached expansion for `key`
    ///
    /// # Errors
    /// See [`ResultsPipeline::expand_cached`]
    pub async fn load(
        &self,
        source: &dyn ResultsSource,
        key: ScanResultsKey,
    ) -> Result<Arc<Table>, ResultsError> {
        let fetch_key = key.clone();
        self.expand_cached(key, || async move { source.fetch(&fetch_key).await })
            .await
    }

    /// Parse the first row of a filtered table into a full record
    ///
    /// # Errors
    /// See [`parse_scan_result_data`]
    pub async fn parse_data(&self, table: &Table) -> Result<ScanResultData, ResultsError> {
        parse_scan_result_data(table, self.codec.as_ref()).await
    }

    /// Parse rows into list-view summaries
    ///
    /// # Errors
    /// See [`parse_scan_result_summaries`]
    pub async fn parse_summaries(&self, rows: &[Row]) -> Result<Vec<ScanResultSummary>, ResultsError> {
        parse_scan_result_summaries(rows, self.codec.as_ref()).await
    }

    /// Cache of expanded tables
    #[inline]
    #[must_use]
    pub fn cache(&self) -> &ExpandedTableCache {
        &self.cache
    }

    /// Codec used for every decode
    #[inline]
    #[must_use]
    pub fn codec(&self) -> &Arc<dyn JsonCodec> {
        &self.codec
    }

    /// Active configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }
}

impl Default for ResultsPipeline {
    fn default() -> Self {
        Self::new(PipelineConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scout_test_utils::{resultset_row, scalar_row, table_of};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        table: Table,
        fetches: AtomicUsize,
    }

    #[async_trait]
    impl ResultsSource for CountingSource {
        async fn fetch(&self, _key: &ScanResultsKey) -> Result<Table, ResultsError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            Ok(self.table.clone())
        }
    }

    fn raw_table() -> Table {
        table_of(vec![
            resultset_row("r1", json!([{"label": "a", "value": 1}, {"label": "b", "value": 2}])),
            scalar_row("u1", json!("x"), "string"),
        ])
    }

    #[tokio::test]
    async fn load_expands_once_per_key() {
        let pipeline = ResultsPipeline::default();
        let source = CountingSource {
            table: raw_table(),
            fetches: AtomicUsize::new(0),
        };
        let key = ScanResultsKey::new("scans/s1", "labels");

        let first = pipeline.load(&source, key.clone()).await.unwrap();
        let second = pipeline.load(&source, key.clone()).await.unwrap();

        assert_eq!(first.num_rows(), 3);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(source.fetches.load(Ordering::SeqCst), 1);

        pipeline.cache().invalidate(&key).await;
        pipeline.load(&source, key).await.unwrap();
        assert_eq!(source.fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn fetch_failure_propagates() {
        let pipeline = ResultsPipeline::default();
        let err = pipeline
            .expand_cached(ScanResultsKey::new("scans/s1", "x"), || async {
                Err(ResultsError::Fetch("not found".to_string()))
            })
            .await
            .unwrap_err();
        assert!(matches!(err.root(), ResultsError::Fetch(_)));
    }

    #[tokio::test]
    async fn config_controls_synthesis() {
        let mut row = resultset_row("r1", json!([{"label": "a", "value": true}]));
        row.insert("validation_target".into(), json!(r#"{"a": true, "b": false}"#));
        let table = table_of(vec![row]);

        let on = ResultsPipeline::default();
        let off = ResultsPipeline::new(PipelineConfig::new().with_synthesis(false));

        assert_eq!(on.expand(table.clone()).await.unwrap().num_rows(), 2);
        assert_eq!(off.expand(table).await.unwrap().num_rows(), 1);
        assert!(!off.config().synthesize_missing_labels);
    }

    #[tokio::test]
    async fn parses_summaries_of_expanded_rows() {
        let pipeline = ResultsPipeline::default();
        let expanded = pipeline.expand(raw_table()).await.unwrap();

        let summaries = pipeline.parse_summaries(&expanded.objects()).await.unwrap();
        let labels: Vec<_> = summaries.iter().map(|s| s.label.clone()).collect();
        assert_eq!(labels, vec![None, Some("a".to_string()), Some("b".to_string())]);
    }
}
