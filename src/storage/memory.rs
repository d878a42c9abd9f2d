//! In-memory vector store.
//!
//! Provides a non-persistent implementation of [`VectorStore`] for tests and
//! ephemeral workloads. Filtering always goes through
//! [`MetadataFilter::evaluate`], which makes this backend the reference the
//! `SQLite` pushdown path is checked against.

use crate::models::{MetadataFilter, RecordId, ScoredRecord, StoreStats, VectorRecord};
use crate::similarity::rank_top_k;
use crate::storage::metrics::observe;
use crate::storage::traits::VectorStore;
use crate::storage::validation::{
    check_query_dimension, resolve_batch_dimension, validate_filter, validate_search,
};
use crate::{Error, Result};
use std::collections::{BTreeMap, HashSet};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::instrument;

const BACKEND: &str = "memory";

#[derive(Debug, Default)]
struct MemoryState {
    /// Records keyed by id; the `BTreeMap` gives the stable listing order.
    records: BTreeMap<RecordId, VectorRecord>,
    /// Established embedding dimension.
    dimension: Option<usize>,
}

impl MemoryState {
    fn matching<'a>(
        &'a self,
        filter: Option<&'a MetadataFilter>,
    ) -> impl Iterator<Item = &'a VectorRecord> + 'a {
        self.records
            .values()
            .filter(move |r| filter.is_none_or(|f| f.evaluate(&r.metadata)))
    }

    fn approximate_size(&self) -> u64 {
        self.records
            .values()
            .map(|r| {
                let metadata: usize = r.metadata.iter().map(|(k, v)| k.len() + v.len()).sum();
                r.id.as_str().len()
                    + r.embedding.len() * std::mem::size_of::<f32>()
                    + r.content.as_ref().map_or(0, String::len)
                    + metadata
            })
            .map(|n| n as u64)
            .sum()
    }
}

/// In-memory vector store.
///
/// Uses an `RwLock` so reads run concurrently while writes are exclusive.
/// `close` drops all data.
///
/// # Example
///
/// ```rust
/// use embedstore::{InMemoryVectorStore, VectorRecord, VectorStore};
///
/// let store = InMemoryVectorStore::new();
/// store.upsert(&VectorRecord::with_id("a", vec![1.0, 0.0]))?;
/// let hits = store.search(&[1.0, 0.0], 5, None)?;
/// assert_eq!(hits[0].record.id.as_str(), "a");
/// # Ok::<(), embedstore::Error>(())
/// ```
#[derive(Debug)]
pub struct InMemoryVectorStore {
    state: RwLock<Option<MemoryState>>,
}

impl Default for InMemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryVectorStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: RwLock::new(Some(MemoryState::default())),
        }
    }

    fn read_guard(&self) -> RwLockReadGuard<'_, Option<MemoryState>> {
        self.state.read().unwrap_or_else(|poisoned| {
            tracing::warn!("In-memory store lock was poisoned, recovering");
            PoisonError::into_inner(poisoned)
        })
    }

    fn write_guard(&self) -> RwLockWriteGuard<'_, Option<MemoryState>> {
        self.state.write().unwrap_or_else(|poisoned| {
            tracing::warn!("In-memory store lock was poisoned, recovering");
            PoisonError::into_inner(poisoned)
        })
    }

    fn read<T>(&self, f: impl FnOnce(&MemoryState) -> Result<T>) -> Result<T> {
        let guard = self.read_guard();
        let state = guard.as_ref().ok_or(Error::Closed)?;
        f(state)
    }

    fn write<T>(&self, f: impl FnOnce(&mut MemoryState) -> Result<T>) -> Result<T> {
        let mut guard = self.write_guard();
        let state = guard.as_mut().ok_or(Error::Closed)?;
        f(state)
    }
}

impl VectorStore for InMemoryVectorStore {
    fn backend_name(&self) -> &'static str {
        BACKEND
    }

    #[instrument(skip(self, record), fields(operation = "upsert", backend = BACKEND, record.id = %record.id))]
    fn upsert(&self, record: &VectorRecord) -> Result<()> {
        self.upsert_batch(std::slice::from_ref(record))
    }

    #[instrument(skip(self, records), fields(operation = "upsert_batch", backend = BACKEND, batch_size = records.len()))]
    fn upsert_batch(&self, records: &[VectorRecord]) -> Result<()> {
        observe(BACKEND, "upsert_batch", || {
            self.write(|state| {
                let dimension = resolve_batch_dimension(state.dimension, records)?;
                if state.dimension.is_none() && dimension.is_some() {
                    tracing::debug!(dimensions = ?dimension, "Established store dimension");
                }
                state.dimension = dimension;
                for record in records {
                    state.records.insert(record.id.clone(), record.clone());
                }
                Ok(())
            })
        })
    }

    #[instrument(skip(self, query, filter), fields(operation = "search", backend = BACKEND))]
    fn search(
        &self,
        query: &[f32],
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<ScoredRecord>> {
        observe(BACKEND, "search", || {
            validate_search(query, top_k, filter)?;
            self.read(|state| {
                if state.records.is_empty() {
                    return Ok(Vec::new());
                }
                if let Some(dimension) = state.dimension {
                    check_query_dimension(dimension, query)?;
                }
                rank_top_k(query, state.matching(filter).cloned(), top_k)
            })
        })
    }

    fn get(&self, id: &RecordId) -> Result<Option<VectorRecord>> {
        observe(BACKEND, "get", || {
            self.read(|state| Ok(state.records.get(id).cloned()))
        })
    }

    fn get_batch(&self, ids: &[RecordId]) -> Result<Vec<VectorRecord>> {
        observe(BACKEND, "get_batch", || {
            self.read(|state| {
                let mut seen = HashSet::new();
                Ok(ids
                    .iter()
                    .filter(|id| seen.insert(*id))
                    .filter_map(|id| state.records.get(id).cloned())
                    .collect())
            })
        })
    }

    fn delete(&self, id: &RecordId) -> Result<()> {
        self.delete_batch(std::slice::from_ref(id))
    }

    #[instrument(skip(self, ids), fields(operation = "delete_batch", backend = BACKEND, batch_size = ids.len()))]
    fn delete_batch(&self, ids: &[RecordId]) -> Result<()> {
        observe(BACKEND, "delete_batch", || {
            self.write(|state| {
                for id in ids {
                    state.records.remove(id);
                }
                Ok(())
            })
        })
    }

    #[instrument(skip(self, filter), fields(operation = "delete_by_filter", backend = BACKEND))]
    fn delete_by_filter(&self, filter: &MetadataFilter) -> Result<u64> {
        observe(BACKEND, "delete_by_filter", || {
            filter.validate()?;
            self.write(|state| {
                let before = state.records.len();
                state.records.retain(|_, r| !filter.evaluate(&r.metadata));
                Ok((before - state.records.len()) as u64)
            })
        })
    }

    fn count(&self, filter: Option<&MetadataFilter>) -> Result<u64> {
        observe(BACKEND, "count", || {
            validate_filter(filter)?;
            self.read(|state| Ok(state.matching(filter).count() as u64))
        })
    }

    fn list(
        &self,
        limit: usize,
        offset: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<VectorRecord>> {
        observe(BACKEND, "list", || {
            validate_filter(filter)?;
            self.read(|state| {
                Ok(state
                    .matching(filter)
                    .skip(offset)
                    .take(limit)
                    .cloned()
                    .collect())
            })
        })
    }

    #[instrument(skip(self), fields(operation = "clear", backend = BACKEND))]
    fn clear(&self) -> Result<()> {
        observe(BACKEND, "clear", || {
            self.write(|state| {
                state.records.clear();
                state.dimension = None;
                Ok(())
            })
        })
    }

    fn stats(&self) -> Result<StoreStats> {
        observe(BACKEND, "stats", || {
            self.read(|state| {
                let total_records = state.records.len() as u64;
                Ok(StoreStats {
                    total_records,
                    dimensions: state.dimension.filter(|_| total_records > 0),
                    approximate_size_bytes: state.approximate_size(),
                })
            })
        })
    }

    fn close(&self) {
        if self.write_guard().take().is_some() {
            tracing::debug!(backend = BACKEND, "Closed vector store");
        }
    }

    fn is_closed(&self) -> bool {
        self.read_guard().is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_store() -> InMemoryVectorStore {
        let store = InMemoryVectorStore::new();
        store
            .upsert_batch(&[
                VectorRecord::with_id("a", vec![1.0, 0.0, 0.0]).with_metadata("type", "doc"),
                VectorRecord::with_id("b", vec![0.9, 0.1, 0.0]).with_metadata("type", "doc"),
                VectorRecord::with_id("c", vec![0.0, 1.0, 0.0]).with_metadata("type", "code"),
            ])
            .unwrap();
        store
    }

    #[test]
    fn test_search_ranks_exact_match_first() {
        let store = sample_store();
        let results = store.search(&[1.0, 0.0, 0.0], 2, None).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].record.id.as_str(), "a");
        assert_eq!(results[1].record.id.as_str(), "b");
    }

    #[test]
    fn test_search_with_filter() {
        let store = sample_store();
        let filter = MetadataFilter::equals("type", "code");
        let results = store.search(&[1.0, 0.0, 0.0], 5, Some(&filter)).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].record.id.as_str(), "c");
    }

    #[test]
    fn test_batch_is_atomic() {
        let store = sample_store();
        let result = store.upsert_batch(&[
            VectorRecord::with_id("d", vec![0.0, 0.0, 1.0]),
            VectorRecord::with_id("e", vec![1.0]),
        ]);
        assert!(matches!(result, Err(Error::DimensionMismatch { .. })));
        assert_eq!(store.count(None).unwrap(), 3);
        assert!(store.get(&RecordId::new("d")).unwrap().is_none());
    }

    #[test]
    fn test_returned_records_are_copies() {
        let store = sample_store();
        let mut record = store.get(&RecordId::new("a")).unwrap().unwrap();
        record.metadata.insert("type".to_string(), "changed".to_string());
        let stored = store.get(&RecordId::new("a")).unwrap().unwrap();
        assert_eq!(stored.metadata.get("type").map(String::as_str), Some("doc"));
    }

    #[test]
    fn test_stats() {
        let store = sample_store();
        let stats = store.stats().unwrap();
        assert_eq!(stats.total_records, 3);
        assert_eq!(stats.dimensions, Some(3));
        assert!(stats.approximate_size_bytes > 0);

        store.delete_batch(&["a".into(), "b".into(), "c".into()]).unwrap();
        let stats = store.stats().unwrap();
        assert_eq!(stats.total_records, 0);
        assert_eq!(stats.dimensions, None);
    }

    #[test]
    fn test_close_is_idempotent() {
        let store = sample_store();
        assert!(!store.is_closed());
        store.close();
        store.close();
        assert!(store.is_closed());
        assert!(matches!(store.count(None), Err(Error::Closed)));
        assert!(matches!(
            store.upsert(&VectorRecord::with_id("x", vec![1.0, 0.0, 0.0])),
            Err(Error::Closed)
        ));
    }
}
