//! Async JSON codec
//!
//! Scan result tables carry many JSON-encoded cells (metadata, references,
//! validation payloads, resultsets). Decoding goes through an injected
//! [`JsonCodec`] so callers control how and where text is decoded.

use crate::error::DecodeError;
use async_trait::async_trait;
use serde_json::Value;
use std::borrow::Cow;

/// Texts longer than this are decoded on the blocking pool
pub const DEFAULT_OFFLOAD_THRESHOLD: usize = 64 * 1024;

/// JSON decoding strategy
///
/// Implementations must be safe to share across concurrent decodes.
#[async_trait]
pub trait JsonCodec: Send + Sync + std::fmt::Debug {
    /// Decode JSON text into a value
    ///
    /// # Errors
    /// Returns `DecodeError` if the text is not valid JSON
    async fn parse(&self, text: &str) -> Result<Value, DecodeError>;

    /// Encode value as compact JSON text
    ///
    /// # Errors
    /// Returns `DecodeError::Serialize` if the value cannot be rendered
    fn stringify(&self, value: &Value) -> Result<String, DecodeError>;
}

/// Default codec backed by `serde_json`
#[derive(Debug, Clone, Copy)]
pub struct SerdeJsonCodec {
    offload_threshold: usize,
    non_finite_as_null: bool,
}

impl SerdeJsonCodec {
    /// Create codec with offload threshold in bytes
    #[inline]
    #[must_use]
    pub fn new(offload_threshold: usize) -> Self {
        Self {
            offload_threshold,
            non_finite_as_null: false,
        }
    }

    /// Read bare `NaN` / `Infinity` / `-Infinity` tokens as null
    #[inline]
    #[must_use]
    pub fn with_non_finite_as_null(mut self, enabled: bool) -> Self {
        self.non_finite_as_null = enabled;
        self
    }

    /// Offload threshold in bytes
    #[inline]
    #[must_use]
    pub fn offload_threshold(&self) -> usize {
        self.offload_threshold
    }

    fn decode(text: &str, non_finite_as_null: bool) -> Result<Value, DecodeError> {
        let text = if non_finite_as_null {
            replace_non_finite(text)
        } else {
            Cow::Borrowed(text)
        };
        serde_json::from_str(&text).map_err(DecodeError::Json)
    }
}

impl Default for SerdeJsonCodec {
    fn default() -> Self {
        Self::new(DEFAULT_OFFLOAD_THRESHOLD)
    }
}

#[async_trait]
impl JsonCodec for SerdeJsonCodec {
    async fn parse(&self, text: &str) -> Result<Value, DecodeError> {
        let lenient = self.non_finite_as_null;

        if text.len() <= self.offload_threshold {
            return Self::decode(text, lenient);
        }

        // Outside a runtime there is no blocking pool to hand off to
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return Self::decode(text, lenient);
        };

        tracing::trace!(bytes = text.len(), "offloading json decode");
        let owned = text.to_owned();
        handle
            .spawn_blocking(move || Self::decode(&owned, lenient))
            .await
            .map_err(|e| DecodeError::Offload(e.to_string()))?
    }

    fn stringify(&self, value: &Value) -> Result<String, DecodeError> {
        serde_json::to_string(value).map_err(DecodeError::Serialize)
    }
}

/// Rewrite non-finite number tokens outside string literals to `null`
fn replace_non_finite(text: &str) -> Cow<'_, str> {
    const TOKENS: [&str; 3] = ["-Infinity", "Infinity", "NaN"];

    if !text.contains("NaN") && !text.contains("Infinity") {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    let mut in_string = false;
    let mut escaped = false;

    while let Some(ch) = rest.chars().next() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
        } else if ch == '"' {
            in_string = true;
        } else if let Some(token) = TOKENS.iter().find(|t| rest.starts_with(**t)) {
            out.push_str("null");
            rest = &rest[token.len()..];
            continue;
        }
        out.push(ch);
        rest = &rest[ch.len_utf8()..];
    }

    Cow::Owned(out)
}
