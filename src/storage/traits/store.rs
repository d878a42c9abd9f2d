//! Vector store trait.
//!
//! The backend-agnostic contract every store implements.
//!
//! # Available Implementations
//!
//! | Backend | Use Case | Filtering |
//! |---------|----------|-----------|
//! | `SqliteVectorStore` | Embedded, file-backed | SQL pushdown with in-memory fallback |
//! | `InMemoryVectorStore` | Tests, ephemeral data | In-memory evaluator |
//!
//! # Usage Example
//!
//! ```rust
//! use embedstore::{InMemoryVectorStore, MetadataFilter, VectorRecord, VectorStore};
//!
//! let store = InMemoryVectorStore::new();
//! store.upsert_batch(&[
//!     VectorRecord::with_id("a", vec![1.0, 0.0]).with_metadata("lang", "en"),
//!     VectorRecord::with_id("b", vec![0.0, 1.0]).with_metadata("lang", "es"),
//! ])?;
//!
//! let english = MetadataFilter::equals("lang", "en");
//! assert_eq!(store.count(Some(&english))?, 1);
//! # Ok::<(), embedstore::Error>(())
//! ```
//!
//! # State
//!
//! A store is `Open` from construction until [`VectorStore::close`]; after
//! that every operation fails with [`Error::Closed`](crate::Error::Closed)
//! except `close` itself, which is a no-op. There is no reopening.

use crate::Result;
use crate::models::{MetadataFilter, RecordId, ScoredRecord, StoreStats, VectorRecord};

/// Trait for embedding stores.
///
/// Implementations must be thread-safe (`Send + Sync`). Methods take `&self`
/// so a store can be shared through `Arc<dyn VectorStore>`; writes are
/// serialized internally and readers never observe a half-applied write.
///
/// # Dimensionality
///
/// The first record inserted establishes the store's embedding dimension.
/// Later inserts and queries with a different length fail with
/// [`Error::DimensionMismatch`](crate::Error::DimensionMismatch). Only
/// [`clear`](VectorStore::clear) resets the dimension.
pub trait VectorStore: Send + Sync {
    /// Short backend name used in logs and metrics.
    fn backend_name(&self) -> &'static str;

    /// Inserts a record, fully replacing any record with the same id.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an invalid record or a dimension
    /// conflict, [`Error::Closed`](crate::Error::Closed) after close, or a
    /// storage error.
    fn upsert(&self, record: &VectorRecord) -> Result<()>;

    /// Upserts all records in one all-or-nothing transaction.
    ///
    /// # Errors
    ///
    /// Returns the first failure; nothing is written when any record is
    /// rejected.
    fn upsert_batch(&self, records: &[VectorRecord]) -> Result<()>;

    /// Returns the `top_k` records most similar to `query`.
    ///
    /// Results are sorted by descending score with ties broken by ascending
    /// id. Candidates are the records matching `filter` (all records when
    /// `None`), and every candidate is scored: cost is linear in the number
    /// of candidates times the dimension.
    ///
    /// # Errors
    ///
    /// Returns a validation error when `top_k` is zero, the query is empty or
    /// non-finite, the filter is malformed, or the query length differs from
    /// the established dimension.
    fn search(
        &self,
        query: &[f32],
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<ScoredRecord>>;

    /// Fetches a record by id.
    ///
    /// # Errors
    ///
    /// Never errors for an unknown id; returns `Ok(None)`.
    fn get(&self, id: &RecordId) -> Result<Option<VectorRecord>>;

    /// Fetches the records that exist among `ids`, in request order.
    ///
    /// Unknown and repeated ids are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error only for genuine failures.
    fn get_batch(&self, ids: &[RecordId]) -> Result<Vec<VectorRecord>>;

    /// Deletes a record. Deleting an unknown id is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is closed or storage fails.
    fn delete(&self, id: &RecordId) -> Result<()>;

    /// Deletes several records in one transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is closed or storage fails.
    fn delete_batch(&self, ids: &[RecordId]) -> Result<()>;

    /// Deletes every record matching `filter`, returning how many were removed.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a malformed filter.
    fn delete_by_filter(&self, filter: &MetadataFilter) -> Result<u64>;

    /// Counts records matching `filter`, or all records when `None`.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a malformed filter.
    fn count(&self, filter: Option<&MetadataFilter>) -> Result<u64>;

    /// Returns one page of records ordered by ascending id.
    ///
    /// An `offset` past the end yields an empty page.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a malformed filter.
    fn list(
        &self,
        limit: usize,
        offset: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<VectorRecord>>;

    /// Removes all records and resets the established dimension.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is closed or storage fails.
    fn clear(&self) -> Result<()>;

    /// Computes statistics from the current state.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is closed or storage fails.
    fn stats(&self) -> Result<StoreStats>;

    /// Releases the underlying resources. Idempotent.
    fn close(&self);

    /// Returns true once [`close`](VectorStore::close) has been called.
    fn is_closed(&self) -> bool;
}
