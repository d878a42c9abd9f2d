//! Row conversion for the records table.
//!
//! Embeddings are stored as little-endian `f32` blobs and metadata as a JSON
//! object. The metadata side table mirrors the JSON for filter pushdown; the
//! JSON column is what gets read back.

use crate::models::{Metadata, RecordId, VectorRecord};
use crate::{Error, Result};
use rusqlite::Row;

/// Columns selected for a full record, in [`RecordRow::from_row`] order.
pub const RECORD_COLUMNS: &str = "r.id, r.embedding, r.dimensions, r.content, r.metadata";

/// Encodes an embedding as a little-endian `f32` blob.
#[must_use]
pub fn encode_embedding(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Decodes a little-endian `f32` blob.
///
/// # Errors
///
/// Returns [`Error::StorageIo`] if the blob length does not match
/// `dimensions`.
pub fn decode_embedding(blob: &[u8], dimensions: usize) -> Result<Vec<f32>> {
    let width = std::mem::size_of::<f32>();
    let expected = dimensions.checked_mul(width).ok_or_else(|| {
        Error::storage(
            "decode_embedding",
            format!("declared dimensions {dimensions} are out of range"),
        )
    })?;
    if blob.len() != expected {
        return Err(Error::storage(
            "decode_embedding",
            format!(
                "embedding blob is {} bytes, expected {expected} for {dimensions} dimensions",
                blob.len()
            ),
        ));
    }
    Ok(blob
        .chunks_exact(width)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}

/// Raw record row as stored.
#[derive(Debug)]
pub struct RecordRow {
    /// Record id.
    pub id: String,
    /// Encoded embedding.
    pub embedding: Vec<u8>,
    /// Declared embedding length.
    pub dimensions: i64,
    /// Optional content.
    pub content: Option<String>,
    /// Metadata as a JSON object.
    pub metadata: String,
}

impl RecordRow {
    /// Reads a row selected with [`RECORD_COLUMNS`].
    ///
    /// # Errors
    ///
    /// Returns the driver error for a missing or mistyped column.
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            embedding: row.get(1)?,
            dimensions: row.get(2)?,
            content: row.get(3)?,
            metadata: row.get(4)?,
        })
    }

    /// Converts the row into a record.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StorageIo`] if the stored embedding or metadata is
    /// corrupt.
    pub fn into_record(self) -> Result<VectorRecord> {
        let dimensions = usize::try_from(self.dimensions)
            .map_err(|e| Error::storage("decode_embedding", e))?;
        let embedding = decode_embedding(&self.embedding, dimensions)?;
        let metadata: Metadata = serde_json::from_str(&self.metadata)
            .map_err(|e| Error::storage("decode_metadata", e))?;
        Ok(VectorRecord {
            id: RecordId::new(self.id),
            embedding,
            content: self.content,
            metadata,
        })
    }
}
