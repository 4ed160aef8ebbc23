//! Scout Frame
//!
//! The data plumbing underneath scan result normalization:
//!
//! - [`Table`]: immutable in-memory columnar table, the shape scan result
//!   dataframes arrive in once decoded from storage
//! - [`JsonCodec`]: injected async JSON decoder/encoder strategy
//!
//! # Example
//!
//! ```rust,ignore
//! use scout_frame::{JsonCodec, SerdeJsonCodec, Table};
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let table = Table::from_objects(vec![
//!     json!({"uuid": "a", "value": 1}).as_object().cloned().unwrap(),
//! ]);
//! let errored = table.filter(|row| !row.is_null("scan_error"));
//!
//! let codec = SerdeJsonCodec::default();
//! let value = codec.parse(r#"{"score": 0.5}"#).await?;
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]

pub mod codec;
pub mod error;
pub mod table;

pub use codec::{JsonCodec, SerdeJsonCodec, DEFAULT_OFFLOAD_THRESHOLD};
pub use error::{DecodeError, TableError};
pub use table::{Row, RowRef, Table};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with scan result tables
    pub use crate::codec::{JsonCodec, SerdeJsonCodec};
    pub use crate::error::{DecodeError, TableError};
    pub use crate::table::{Row, RowRef, Table};
}
