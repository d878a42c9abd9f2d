//! Incremental document indexing.
//!
//! Keeps a store in step with an external document registry. Each indexed
//! record carries a `content_hash` metadata entry (SHA-256 of the text and
//! user metadata); documents whose hash is unchanged are not re-embedded.

use crate::embedding::Embedder;
use crate::models::{Metadata, MetadataFilter, RecordId, VectorRecord};
use crate::storage::VectorStore;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::instrument;

/// Metadata key holding the content hash of an indexed document.
pub const CONTENT_HASH_KEY: &str = "content_hash";

/// Page size used when scanning the store for stale records.
const SCAN_PAGE_SIZE: usize = 500;

/// A text document to index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Record id the document is stored under.
    pub id: RecordId,
    /// Text to embed; stored as the record content.
    pub text: String,
    /// Metadata copied onto the record.
    #[serde(default)]
    pub metadata: Metadata,
}

impl Document {
    /// Creates a document without metadata.
    #[must_use]
    pub fn new(id: impl Into<RecordId>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            metadata: Metadata::new(),
        }
    }

    /// Adds a metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Hex SHA-256 over the text and metadata.
    #[must_use]
    pub fn content_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.text.as_bytes());
        for (key, value) in &self.metadata {
            hasher.update([0]);
            hasher.update(key.as_bytes());
            hasher.update([0]);
            hasher.update(value.as_bytes());
        }
        hex::encode(hasher.finalize())
    }
}

/// Outcome of an indexing pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IndexReport {
    /// Documents embedded and written.
    pub indexed: usize,
    /// Documents skipped because their hash matched.
    pub unchanged: usize,
    /// Stale records deleted.
    pub removed: usize,
}

/// Indexes documents into a vector store.
pub struct DocumentIndexer {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
}

impl DocumentIndexer {
    /// Creates an indexer.
    #[must_use]
    pub fn new(store: Arc<dyn VectorStore>, embedder: Arc<dyn Embedder>) -> Self {
        Self { store, embedder }
    }

    /// Returns the underlying store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn VectorStore> {
        &self.store
    }

    /// Embeds and stores every document whose content changed.
    ///
    /// All writes happen in one batch: either every changed document is
    /// stored or none is.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for duplicate or empty document ids,
    /// and propagates embedder and store failures.
    #[instrument(skip(self, documents), fields(operation = "index", document_count = documents.len()))]
    pub fn index(&self, documents: &[Document]) -> Result<IndexReport> {
        let mut seen = HashSet::with_capacity(documents.len());
        for doc in documents {
            if !seen.insert(&doc.id) {
                return Err(Error::Validation(format!(
                    "duplicate document id '{}'",
                    doc.id
                )));
            }
        }

        let ids: Vec<RecordId> = documents.iter().map(|d| d.id.clone()).collect();
        let stored: HashMap<RecordId, String> = self
            .store
            .get_batch(&ids)?
            .into_iter()
            .filter_map(|r| {
                let hash = r.metadata.get(CONTENT_HASH_KEY)?.clone();
                Some((r.id, hash))
            })
            .collect();

        let mut changed = Vec::new();
        let mut report = IndexReport::default();
        for doc in documents {
            let hash = doc.content_hash();
            if stored.get(&doc.id) == Some(&hash) {
                report.unchanged += 1;
            } else {
                changed.push((doc, hash));
            }
        }

        if changed.is_empty() {
            tracing::debug!(unchanged = report.unchanged, "Nothing to index");
            return Ok(report);
        }

        let texts: Vec<&str> = changed.iter().map(|(doc, _)| doc.text.as_str()).collect();
        let embeddings = self.embedder.embed_batch(&texts)?;
        if embeddings.len() != changed.len() {
            return Err(Error::Validation(format!(
                "embedder returned {} embeddings for {} documents",
                embeddings.len(),
                changed.len()
            )));
        }

        let records: Vec<VectorRecord> = changed
            .into_iter()
            .zip(embeddings)
            .map(|((doc, hash), embedding)| {
                let mut metadata = doc.metadata.clone();
                metadata.insert(CONTENT_HASH_KEY.to_string(), hash);
                VectorRecord {
                    id: doc.id.clone(),
                    embedding,
                    content: Some(doc.text.clone()),
                    metadata,
                }
            })
            .collect();

        self.store.upsert_batch(&records)?;
        report.indexed = records.len();
        tracing::info!(
            indexed = report.indexed,
            unchanged = report.unchanged,
            "Indexed documents"
        );
        Ok(report)
    }

    /// Deletes indexed records whose id is not in `present`.
    ///
    /// Only records written by an indexer (those carrying `content_hash`)
    /// are considered, narrowed further by `scope` when given.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    #[instrument(skip(self, present, scope), fields(operation = "remove_missing", present_count = present.len()))]
    pub fn remove_missing(
        &self,
        present: &[RecordId],
        scope: Option<&MetadataFilter>,
    ) -> Result<IndexReport> {
        let present: HashSet<&RecordId> = present.iter().collect();
        let indexed = MetadataFilter::has_key(CONTENT_HASH_KEY);
        let filter = match scope {
            Some(scope) => indexed.and(scope.clone()),
            None => indexed,
        };

        let mut stale = Vec::new();
        let mut offset = 0;
        loop {
            let page = self.store.list(SCAN_PAGE_SIZE, offset, Some(&filter))?;
            let fetched = page.len();
            stale.extend(
                page.into_iter()
                    .map(|r| r.id)
                    .filter(|id| !present.contains(id)),
            );
            if fetched < SCAN_PAGE_SIZE {
                break;
            }
            offset += fetched;
        }

        if !stale.is_empty() {
            self.store.delete_batch(&stale)?;
            tracing::info!(removed = stale.len(), "Removed stale records");
        }
        Ok(IndexReport {
            removed: stale.len(),
            ..IndexReport::default()
        })
    }
}
