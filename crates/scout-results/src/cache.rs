//! Expanded-table cache using moka
//!
//! Expansion is a pure function of the raw table, so its output is cached per
//! (scan location, scanner) pair and recomputed only after invalidation.

use crate::error::ResultsError;
use moka::future::Cache;
use scout_frame::Table;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Statistics for cache monitoring
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of entries in cache
    pub entry_count: u64,
}

/// Identity of one scanner's results within a scan
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScanResultsKey {
    /// Location of the scan
    pub scan_location: String,
    /// Scanner name within the scan
    pub scanner: String,
}

impl ScanResultsKey {
    /// Create key from scan location and scanner
    #[inline]
    #[must_use]
    pub fn new(scan_location: impl Into<String>, scanner: impl Into<String>) -> Self {
        Self {
            scan_location: scan_location.into(),
            scanner: scanner.into(),
        }
    }
}

impl fmt::Display for ScanResultsKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.scan_location, self.scanner)
    }
}

/// Cache of expanded tables
#[derive(Debug, Clone)]
pub struct ExpandedTableCache {
    inner: Cache<ScanResultsKey, Arc<Table>>,
}

impl ExpandedTableCache {
    /// Create cache with max capacity
    #[inline]
    #[must_use]
    pub fn new(max_capacity: u64) -> Self {
        Self {
            inner: Cache::new(max_capacity),
        }
    }

    /// Create cache with time-based expiration
    #[inline]
    #[must_use]
    pub fn with_ttl(max_capacity: u64, ttl: Duration) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    /// Store an expanded table
    #[inline]
    pub async fn insert(&self, key: ScanResultsKey, table: Arc<Table>) {
        self.inner.insert(key, table).await;
    }

    /// Get cached table
    #[inline]
    #[must_use]
    pub async fn get(&self, key: &ScanResultsKey) -> Option<Arc<Table>> {
        self.inner.get(key).await
    }

    /// Get cached table or compute and store it
    ///
    /// Concurrent misses for the same key share one `compute`; the other
    /// callers wait for its outcome. Errors from `compute` are returned to
    /// every waiting caller and nothing is stored.
    ///
    /// # Errors
    /// Propagates the error returned by `compute`, as `ResultsError::Shared`
    /// when more than one caller received it
    pub async fn try_get_or_insert_with<F, Fut>(
        &self,
        key: ScanResultsKey,
        compute: F,
    ) -> Result<Arc<Table>, ResultsError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Table, ResultsError>>,
    {
        let init = async move {
            tracing::trace!("expanded table cache miss");
            compute().await.map(Arc::new)
        };

        self.inner
            .try_get_with(key, init)
            .await
            .map_err(ResultsError::from_shared)
    }

    /// Drop one entry
    #[inline]
    pub async fn invalidate(&self, key: &ScanResultsKey) {
        self.inner.invalidate(key).await;
    }

    /// Drop every entry
    #[inline]
    pub fn invalidate_all(&self) {
        self.inner.invalidate_all();
    }

    /// Check if key is cached
    #[inline]
    #[must_use]
    pub async fn contains(&self, key: &ScanResultsKey) -> bool {
        self.inner.get(key).await.is_some()
    }

    /// Get cache statistics
    ///
    /// Counts are approximate until pending maintenance has run.
    #[inline]
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entry_count: self.inner.entry_count(),
        }
    }

    /// Run pending maintenance so counts are exact
    pub async fn sync(&self) {
        self.inner.run_pending_tasks().await;
    }
}

impl Default for ExpandedTableCache {
    fn default() -> Self {
        Self::new(64)
    }
}
