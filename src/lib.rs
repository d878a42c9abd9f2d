//! # embedstore
//!
//! An embedded store for vector embeddings with content and key/value
//! metadata, answering top-K nearest-neighbour queries by brute-force cosine
//! scoring over a metadata-filtered candidate set.
//!
//! ## Features
//!
//! - Backend-agnostic [`VectorStore`] contract with typed [`Result`]s
//! - Composable [`MetadataFilter`] language with one pure evaluator
//! - `SQLite` backend that pushes filters down as parameterized SQL and
//!   falls back to the evaluator for anything it cannot translate
//! - In-memory backend for tests and ephemeral workloads
//! - [`StoreFactory`] selecting a backend from a [`StoreConfig`]
//!
//! ## Example
//!
//! ```rust
//! use embedstore::{MetadataFilter, StoreConfig, StoreFactory, VectorRecord};
//!
//! let store = StoreFactory::create(&StoreConfig::in_memory())?;
//! store.upsert(&VectorRecord::new(vec![1.0, 0.0, 0.0]).with_metadata("type", "doc"))?;
//! store.upsert(&VectorRecord::new(vec![0.0, 1.0, 0.0]).with_metadata("type", "code"))?;
//!
//! let hits = store.search(&[1.0, 0.0, 0.0], 1, Some(&MetadataFilter::equals("type", "doc")))?;
//! assert_eq!(hits.len(), 1);
//! store.close();
//! # Ok::<(), embedstore::Error>(())
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

pub mod cli;
pub mod config;
pub mod embedding;
pub mod models;
pub mod observability;
pub mod services;
pub mod similarity;
pub mod storage;

pub use config::{BackendKind, StoreConfig, StoreOptions};
pub use embedding::{Embedder, HashEmbedder};
pub use models::{MetadataFilter, RecordId, ScoredRecord, StoreStats, VectorRecord};
pub use services::{Document, DocumentIndexer, IndexReport, StoreFactory};
pub use storage::{InMemoryVectorStore, SqliteVectorStore, VectorStore};

/// Boxed root cause carried by [`Error::StorageIo`].
pub type BoxedCause = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error type for embedstore operations.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `Validation` | Empty ids, empty or non-finite vectors, `top_k == 0`, malformed filters |
/// | `DimensionMismatch` | Embedding or query length differs from the established dimension |
/// | `NotFound` | The factory is asked for a backend name it does not know |
/// | `Closed` | Any operation other than `close` on a closed store |
/// | `StorageIo` | The underlying driver or filesystem fails |
/// | `Configuration` | Missing or invalid construction parameters |
/// | `NotImplemented` | A recognised backend that this build cannot construct |
#[derive(Debug, ThisError)]
pub enum Error {
    /// Invalid input was provided.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A vector's length does not match the expected dimension.
    ///
    /// This is a validation failure; see [`Error::is_validation`].
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// The dimension in force.
        expected: usize,
        /// The length that was supplied.
        actual: usize,
    },

    /// The requested backend does not exist.
    #[error("backend '{requested}' not found (supported: {supported})")]
    NotFound {
        /// The backend name that was requested.
        requested: String,
        /// Comma-separated list of supported backend names.
        supported: String,
    },

    /// The store has been closed.
    #[error("store is closed")]
    Closed,

    /// The storage engine failed.
    #[error("storage operation '{operation}' failed: {source}")]
    StorageIo {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        #[source]
        source: BoxedCause,
    },

    /// Construction parameters are missing or invalid.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The backend is recognised but not available in this build.
    #[error("not implemented: {0}")]
    NotImplemented(String),
}

impl Error {
    /// Wraps a driver or I/O failure for the named operation.
    pub fn storage(operation: impl Into<String>, source: impl Into<BoxedCause>) -> Self {
        Self::StorageIo {
            operation: operation.into(),
            source: source.into(),
        }
    }

    /// Returns true for validation failures, including dimension mismatches.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::DimensionMismatch { .. })
    }
}

/// Result type alias for embedstore operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Returns the current Unix timestamp in seconds.
///
/// Falls back to 0 if the system clock is before the Unix epoch.
#[must_use]
pub fn current_timestamp() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_error_display() {
        let err = Error::Validation("top_k must be positive".to_string());
        assert_eq!(err.to_string(), "validation failed: top_k must be positive");

        let err = Error::DimensionMismatch {
            expected: 3,
            actual: 4,
        };
        assert_eq!(err.to_string(), "dimension mismatch: expected 3, got 4");

        let err = Error::NotFound {
            requested: "faiss".to_string(),
            supported: "sqlite, memory".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "backend 'faiss' not found (supported: sqlite, memory)"
        );

        assert_eq!(Error::Closed.to_string(), "store is closed");
    }

    #[test]
    fn test_storage_error_keeps_source() {
        let io = std::io::Error::other("disk full");
        let err = Error::storage("write_record", io);
        assert!(err.to_string().contains("write_record"));
        assert!(err.to_string().contains("disk full"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_is_validation() {
        assert!(Error::Validation("x".to_string()).is_validation());
        assert!(
            Error::DimensionMismatch {
                expected: 1,
                actual: 2
            }
            .is_validation()
        );
        assert!(!Error::Closed.is_validation());
        assert!(!Error::Configuration("x".to_string()).is_validation());
    }
}
