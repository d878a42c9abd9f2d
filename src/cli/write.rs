//! Commands that modify the store.

use super::{emit, parse_filter};
use crate::embedding::HashEmbedder;
use crate::models::{RecordId, VectorRecord};
use crate::services::{Document, DocumentIndexer};
use crate::storage::VectorStore;
use anyhow::{Context, bail};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::sync::Arc;

pub fn delete(store: &dyn VectorStore, ids: &[String], out: &mut dyn Write) -> anyhow::Result<()> {
    let ids: Vec<RecordId> = ids.iter().map(RecordId::new).collect();
    store.delete_batch(&ids)?;
    emit(out, &json!({ "requested": ids.len() }))
}

pub fn delete_where(store: &dyn VectorStore, filter: &str, out: &mut dyn Write) -> anyhow::Result<()> {
    let Some(filter) = parse_filter(Some(filter))? else {
        bail!("a filter is required");
    };
    let deleted = store.delete_by_filter(&filter)?;
    emit(out, &json!({ "deleted": deleted }))
}

pub fn clear(store: &dyn VectorStore, yes: bool, out: &mut dyn Write) -> anyhow::Result<()> {
    if !yes {
        bail!("refusing to clear the store without --yes");
    }
    store.clear()?;
    emit(out, &json!({ "cleared": true }))
}

pub fn import(
    store: &dyn VectorStore,
    file: &Path,
    batch_size: usize,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    if batch_size == 0 {
        bail!("--batch-size must be positive");
    }
    let records: Vec<VectorRecord> = read_json_lines(file)?;
    for batch in records.chunks(batch_size) {
        store.upsert_batch(batch)?;
    }
    tracing::info!(records = records.len(), "Imported records");
    emit(out, &json!({ "imported": records.len() }))
}

pub fn index(
    store: &Arc<dyn VectorStore>,
    file: &Path,
    dimensions: usize,
    prune: bool,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    let documents: Vec<Document> = read_json_lines(file)?;
    let indexer = DocumentIndexer::new(Arc::clone(store), Arc::new(HashEmbedder::new(dimensions)?));
    let mut report = indexer.index(&documents)?;
    if prune {
        let present: Vec<RecordId> = documents.iter().map(|d| d.id.clone()).collect();
        report.removed = indexer.remove_missing(&present, None)?.removed;
    }
    emit(out, &report)
}

/// Reads one JSON value per non-blank line from `path`, or stdin for `-`.
fn read_json_lines<T: DeserializeOwned>(path: &Path) -> anyhow::Result<Vec<T>> {
    let reader: Box<dyn BufRead> = if path == Path::new("-") {
        Box::new(BufReader::new(std::io::stdin()))
    } else {
        let file =
            File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
        Box::new(BufReader::new(file))
    };

    let mut values = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("failed to read {}", path.display()))?;
        if line.trim().is_empty() {
            continue;
        }
        let value = serde_json::from_str(&line)
            .with_context(|| format!("{}:{}: invalid JSON", path.display(), index + 1))?;
        values.push(value);
    }
    Ok(values)
}
