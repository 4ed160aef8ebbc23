//! Pipeline configuration
//!
//! Loaded from TOML; every field has a default so partial files are valid.

use crate::cache::ExpandedTableCache;
use crate::error::ConfigError;
use scout_frame::{SerdeJsonCodec, DEFAULT_OFFLOAD_THRESHOLD};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Result normalization configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Append synthetic rows for absent negative labels
    pub synthesize_missing_labels: bool,
    /// JSON codec settings
    pub codec: CodecConfig,
    /// Expanded-table cache settings
    pub cache: CacheConfig,
}

impl PipelineConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse configuration from TOML text
    ///
    /// # Errors
    /// Returns `ConfigError::Toml` for malformed TOML or mistyped fields
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Load configuration from a TOML file
    ///
    /// # Errors
    /// - `ConfigError::Io` if the file cannot be read
    /// - `ConfigError::Toml` if its contents are invalid
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ConfigError::io_error(path, e))?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.display(), "loaded pipeline config");
        Ok(config)
    }

    /// With synthetic rows enabled or disabled
    #[inline]
    #[must_use]
    pub fn with_synthesis(mut self, enabled: bool) -> Self {
        self.synthesize_missing_labels = enabled;
        self
    }

    /// With codec settings
    #[inline]
    #[must_use]
    pub fn with_codec(mut self, codec: CodecConfig) -> Self {
        self.codec = codec;
        self
    }

    /// With cache settings
    #[inline]
    #[must_use]
    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            synthesize_missing_labels: true,
            codec: CodecConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

/// JSON codec settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Texts longer than this are decoded on the blocking pool
    pub offload_threshold_bytes: usize,
    /// Read `NaN` / `Infinity` / `-Infinity` tokens as null
    pub non_finite_as_null: bool,
}

impl CodecConfig {
    /// Build the codec described by these settings
    #[must_use]
    pub fn build(&self) -> SerdeJsonCodec {
        SerdeJsonCodec::new(self.offload_threshold_bytes)
            .with_non_finite_as_null(self.non_finite_as_null)
    }
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            offload_threshold_bytes: DEFAULT_OFFLOAD_THRESHOLD,
            non_finite_as_null: false,
        }
    }
}

/// Expanded-table cache settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum cached tables
    pub max_capacity: u64,
    /// Entry lifetime; unset keeps entries until evicted
    pub ttl_secs: Option<u64>,
}

impl CacheConfig {
    /// Build the cache described by these settings
    #[must_use]
    pub fn build(&self) -> ExpandedTableCache {
        match self.ttl_secs {
            Some(secs) => ExpandedTableCache::with_ttl(self.max_capacity, Duration::from_secs(secs)),
            None => ExpandedTableCache::new(self.max_capacity),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_capacity: 64,
            ttl_secs: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_text_gives_defaults() {
        assert_eq!(PipelineConfig::from_toml_str("").unwrap(), PipelineConfig::default());
    }

    #[test]
    fn full_config() {
        let config = PipelineConfig::from_toml_str(
            r#"
            synthesize_missing_labels = false

            [codec]
            offload_threshold_bytes = 1024
            non_finite_as_null = true

            [cache]
            max_capacity = 8
            ttl_secs = 30
            "#,
        )
        .unwrap();

        assert!(!config.synthesize_missing_labels);
        assert_eq!(config.codec.offload_threshold_bytes, 1024);
        assert!(config.codec.non_finite_as_null);
        assert_eq!(config.cache.max_capacity, 8);
        assert_eq!(config.cache.ttl_secs, Some(30));
        assert_eq!(config.codec.build().offload_threshold(), 1024);
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let config = PipelineConfig::from_toml_str("[cache]\nmax_capacity = 2\n").unwrap();
        assert!(config.synthesize_missing_labels);
        assert_eq!(config.cache.ttl_secs, None);
        assert_eq!(config.codec, CodecConfig::default());
    }

    #[test]
    fn mistyped_field_is_rejected() {
        let err = PipelineConfig::from_toml_str("synthesize_missing_labels = \"yes\"").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }

    #[tokio::test]
    async fn from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[codec]\nnon_finite_as_null = true").unwrap();

        let config = PipelineConfig::from_file(file.path()).await.unwrap();
        assert!(config.codec.non_finite_as_null);
    }

    #[tokio::test]
    async fn missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = PipelineConfig::from_file(dir.path().join("absent.toml"))
            .await
            .unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn builders() {
        let config = PipelineConfig::new()
            .with_synthesis(false)
            .with_cache(CacheConfig { max_capacity: 1, ttl_secs: Some(5) });
        assert!(!config.synthesize_missing_labels);
        assert_eq!(config.cache.max_capacity, 1);
    }
}
