//! Record types and identifiers.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Unique identifier for a record within a store.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Creates a record ID from a caller-supplied string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a new time-ordered identifier (UUIDv7).
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::now_v7().to_string())
    }

    /// Returns the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for RecordId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Key/value metadata attached to a record.
///
/// Keys are unique and ordering carries no meaning; a `BTreeMap` keeps
/// serialization deterministic.
pub type Metadata = BTreeMap<String, String>;

/// An embedding with its content and metadata.
///
/// Records handed out by a store are independent copies; mutating one never
/// affects stored state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    /// Unique identifier; generated when absent from serialized input.
    #[serde(default = "RecordId::generate")]
    pub id: RecordId,
    /// The embedding vector.
    pub embedding: Vec<f32>,
    /// Optional text content the embedding was computed from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Key/value metadata used for filtering.
    #[serde(default)]
    pub metadata: Metadata,
}

impl VectorRecord {
    /// Creates a record with a generated ID.
    #[must_use]
    pub fn new(embedding: Vec<f32>) -> Self {
        Self::with_id(RecordId::generate(), embedding)
    }

    /// Creates a record with a caller-supplied ID.
    #[must_use]
    pub fn with_id(id: impl Into<RecordId>, embedding: Vec<f32>) -> Self {
        Self {
            id: id.into(),
            embedding,
            content: None,
            metadata: Metadata::new(),
        }
    }

    /// Sets the text content.
    #[must_use]
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    /// Adds (or replaces) one metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Returns the embedding length.
    #[must_use]
    pub fn dimensions(&self) -> usize {
        self.embedding.len()
    }

    /// Checks the record is storable, independent of any store state.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for an empty ID or an empty or non-finite
    /// embedding.
    pub fn validate(&self) -> Result<()> {
        if self.id.as_str().is_empty() {
            return Err(Error::Validation("record id must not be empty".to_string()));
        }
        validate_vector(&self.embedding, "embedding").map_err(|e| match e {
            Error::Validation(msg) => Error::Validation(format!("record '{}': {msg}", self.id)),
            other => other,
        })
    }
}

/// Checks that a vector is non-empty and contains only finite values.
///
/// # Errors
///
/// Returns [`Error::Validation`] naming `what` when the check fails.
pub fn validate_vector(vector: &[f32], what: &str) -> Result<()> {
    if vector.is_empty() {
        return Err(Error::Validation(format!("{what} must not be empty")));
    }
    if let Some(pos) = vector.iter().position(|v| !v.is_finite()) {
        return Err(Error::Validation(format!(
            "{what} contains a non-finite value at index {pos}"
        )));
    }
    Ok(())
}

/// A record paired with its similarity to a query.
///
/// Produced by `search` only; never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredRecord {
    /// The matching record.
    pub record: VectorRecord,
    /// Similarity score in `[0.0, 1.0]`, higher is more similar.
    pub score: f64,
}

/// Statistics about a store, recomputed on every call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct StoreStats {
    /// Number of stored records.
    pub total_records: u64,
    /// Embedding length in use, `None` when the store is empty.
    pub dimensions: Option<usize>,
    /// Approximate storage footprint in bytes.
    pub approximate_size_bytes: u64,
}
