//! Read-only commands.

use super::{emit, parse_filter};
use crate::models::RecordId;
use crate::storage::VectorStore;
use anyhow::Context;
use serde_json::json;
use std::io::Write;

pub fn stats(store: &dyn VectorStore, out: &mut dyn Write) -> anyhow::Result<()> {
    let stats = store.stats()?;
    emit(out, &stats)
}

pub fn count(store: &dyn VectorStore, filter: Option<&str>, out: &mut dyn Write) -> anyhow::Result<()> {
    let filter = parse_filter(filter)?;
    let count = store.count(filter.as_ref())?;
    emit(out, &json!({ "count": count }))
}

pub fn list(
    store: &dyn VectorStore,
    limit: usize,
    offset: usize,
    filter: Option<&str>,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    let filter = parse_filter(filter)?;
    for record in store.list(limit, offset, filter.as_ref())? {
        emit(out, &record)?;
    }
    Ok(())
}

pub fn get(store: &dyn VectorStore, ids: &[String], out: &mut dyn Write) -> anyhow::Result<()> {
    let ids: Vec<RecordId> = ids.iter().map(RecordId::new).collect();
    let records = store.get_batch(&ids)?;
    if records.len() < ids.len() {
        tracing::info!(
            requested = ids.len(),
            found = records.len(),
            "Some ids were not found"
        );
    }
    for record in records {
        emit(out, &record)?;
    }
    Ok(())
}

pub fn search(
    store: &dyn VectorStore,
    vector: &str,
    top_k: usize,
    filter: Option<&str>,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    let query: Vec<f32> = serde_json::from_str(vector)
        .with_context(|| format!("query vector must be a JSON array of numbers: {vector}"))?;
    let filter = parse_filter(filter)?;
    for hit in store.search(&query, top_k, filter.as_ref())? {
        emit(out, &hit)?;
    }
    Ok(())
}
