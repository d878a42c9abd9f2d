//! `SQLite` vector store.
//!
//! Persists records in a single database file. Embeddings live in the
//! records table as little-endian `f32` blobs; metadata is stored twice, as
//! a JSON column that is read back and as one row per key in a side table
//! that filter predicates query.
//!
//! # Schema
//!
//! ```sql
//! CREATE TABLE "vectors" (
//!     id TEXT PRIMARY KEY NOT NULL,
//!     embedding BLOB NOT NULL,
//!     dimensions INTEGER NOT NULL,
//!     content TEXT,
//!     metadata TEXT NOT NULL,
//!     updated_at INTEGER NOT NULL
//! );
//! CREATE TABLE "vectors_metadata" (
//!     record_id TEXT NOT NULL, key TEXT NOT NULL, value TEXT NOT NULL,
//!     PRIMARY KEY (record_id, key)
//! );
//! CREATE TABLE "vectors_settings" (name TEXT PRIMARY KEY NOT NULL, value TEXT NOT NULL);
//! ```
//!
//! The established dimension is kept in the settings table so it survives
//! deleting every record; only `clear` removes it.
//!
//! # Concurrency
//!
//! One connection behind a `Mutex`. Every write runs in `BEGIN IMMEDIATE`,
//! so a reader never sees part of a batch.

use super::connection::{acquire_lock, configure_connection, with_transaction};
use super::record_row::{RECORD_COLUMNS, RecordRow, encode_embedding};
use super::sql::{FilterPlan, FilterTranslator, PushdownCapabilities};
use crate::config::StoreOptions;
use crate::models::{Metadata, MetadataFilter, RecordId, ScoredRecord, StoreStats, VectorRecord};
use crate::similarity::rank_top_k;
use crate::storage::metrics::observe;
use crate::storage::traits::VectorStore;
use crate::storage::validation::{
    check_query_dimension, resolve_batch_dimension, validate_filter, validate_search,
};
use crate::{Error, Result, current_timestamp};
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::instrument;

const BACKEND: &str = "sqlite";
const DIMENSIONS_SETTING: &str = "dimensions";

/// Table names derived from the configured records table.
#[derive(Debug, Clone)]
struct Tables {
    records: String,
    metadata: String,
    settings: String,
}

impl Tables {
    fn new(records: &str) -> Self {
        Self {
            records: records.to_string(),
            metadata: format!("{records}_metadata"),
            settings: format!("{records}_settings"),
        }
    }
}

/// `SQLite`-backed vector store.
///
/// # Example
///
/// ```rust
/// use embedstore::{MetadataFilter, SqliteVectorStore, VectorRecord, VectorStore};
///
/// let store = SqliteVectorStore::in_memory()?;
/// store.upsert(&VectorRecord::with_id("a", vec![1.0, 0.0]).with_metadata("lang", "en"))?;
/// let hits = store.search(&[1.0, 0.0], 3, Some(&MetadataFilter::equals("lang", "en")))?;
/// assert_eq!(hits.len(), 1);
/// store.close();
/// # Ok::<(), embedstore::Error>(())
/// ```
pub struct SqliteVectorStore {
    /// `None` once closed.
    conn: Mutex<Option<Connection>>,
    db_path: Option<PathBuf>,
    tables: Tables,
    translator: FilterTranslator,
}

impl std::fmt::Debug for SqliteVectorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteVectorStore")
            .field("db_path", &self.db_path)
            .field("table", &self.tables.records)
            .finish_non_exhaustive()
    }
}

impl SqliteVectorStore {
    /// Opens or creates a store at `db_path`.
    ///
    /// Missing parent directories are created.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StorageIo`] if the database cannot be opened or the
    /// schema cannot be created.
    pub fn new(db_path: impl Into<PathBuf>, options: &StoreOptions) -> Result<Self> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| Error::storage("create_db_dir", e))?;
        }
        let conn = Connection::open(&db_path).map_err(|e| Error::storage("open_database", e))?;
        tracing::debug!(path = %db_path.display(), table = %options.table, "Opened SQLite vector store");
        Self::from_connection(conn, Some(db_path), options)
    }

    /// Creates an in-memory store with default options.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StorageIo`] if the schema cannot be created.
    pub fn in_memory() -> Result<Self> {
        Self::in_memory_with_options(&StoreOptions::default())
    }

    /// Creates an in-memory store.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StorageIo`] if the schema cannot be created.
    pub fn in_memory_with_options(options: &StoreOptions) -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| Error::storage("open_database", e))?;
        Self::from_connection(conn, None, options)
    }

    fn from_connection(
        conn: Connection,
        db_path: Option<PathBuf>,
        options: &StoreOptions,
    ) -> Result<Self> {
        configure_connection(&conn, options.cache_size_kib)?;
        let tables = Tables::new(&options.table);
        let translator = FilterTranslator::new(
            tables.metadata.clone(),
            PushdownCapabilities {
                enabled: options.filter_pushdown,
                substring: options.substring_pushdown,
            },
        );
        initialize(&conn, &tables)?;
        Ok(Self {
            conn: Mutex::new(Some(conn)),
            db_path,
            tables,
            translator,
        })
    }

    /// Returns the database path, or `None` for an in-memory store.
    #[must_use]
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let guard = acquire_lock(&self.conn);
        let conn = guard.as_ref().ok_or(Error::Closed)?;
        f(conn)
    }

    fn established_dimension(&self, conn: &Connection) -> Result<Option<usize>> {
        let value: Option<String> = conn
            .query_row(
                &format!("SELECT value FROM \"{}\" WHERE name = ?1", self.tables.settings),
                params![DIMENSIONS_SETTING],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| Error::storage("read_dimension", e))?;
        value
            .map(|v| {
                v.parse::<usize>()
                    .map_err(|e| Error::storage("read_dimension", e))
            })
            .transpose()
    }

    fn is_empty(&self, conn: &Connection) -> Result<bool> {
        conn.query_row(
            &format!("SELECT NOT EXISTS (SELECT 1 FROM \"{}\")", self.tables.records),
            [],
            |row| row.get(0),
        )
        .map_err(|e| Error::storage("check_empty", e))
    }

    fn write_record(&self, conn: &Connection, record: &VectorRecord, now: i64) -> Result<()> {
        let metadata_json = serde_json::to_string(&record.metadata)
            .map_err(|e| Error::storage("encode_metadata", e))?;
        let dimensions = i64::try_from(record.dimensions())
            .map_err(|e| Error::storage("encode_embedding", e))?;

        conn.prepare_cached(&format!(
            "INSERT OR REPLACE INTO \"{}\" (id, embedding, dimensions, content, metadata, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            self.tables.records
        ))
        .and_then(|mut stmt| {
            stmt.execute(params![
                record.id.as_str(),
                encode_embedding(&record.embedding),
                dimensions,
                record.content.as_deref(),
                metadata_json,
                now
            ])
        })
        .map_err(|e| Error::storage("insert_record", e))?;

        // Replace, never merge: drop keys the new version no longer has.
        self.delete_metadata(conn, &record.id)?;

        let mut stmt = conn
            .prepare_cached(&format!(
                "INSERT INTO \"{}\" (record_id, key, value) VALUES (?1, ?2, ?3)",
                self.tables.metadata
            ))
            .map_err(|e| Error::storage("insert_metadata", e))?;
        for (key, value) in &record.metadata {
            stmt.execute(params![record.id.as_str(), key, value])
                .map_err(|e| Error::storage("insert_metadata", e))?;
        }
        Ok(())
    }

    fn delete_metadata(&self, conn: &Connection, id: &RecordId) -> Result<()> {
        conn.prepare_cached(&format!(
            "DELETE FROM \"{}\" WHERE record_id = ?1",
            self.tables.metadata
        ))
        .and_then(|mut stmt| stmt.execute(params![id.as_str()]))
        .map_err(|e| Error::storage("delete_metadata", e))?;
        Ok(())
    }

    fn delete_record(&self, conn: &Connection, id: &RecordId) -> Result<bool> {
        self.delete_metadata(conn, id)?;
        let deleted = conn
            .prepare_cached(&format!(
                "DELETE FROM \"{}\" WHERE id = ?1",
                self.tables.records
            ))
            .and_then(|mut stmt| stmt.execute(params![id.as_str()]))
            .map_err(|e| Error::storage("delete_record", e))?;
        Ok(deleted > 0)
    }

    /// Builds the `WHERE` clause for `plan` and its parameters.
    fn where_clause(plan: &FilterPlan) -> (String, Vec<Value>) {
        plan.predicate.as_ref().map_or_else(
            || (String::new(), Vec::new()),
            |predicate| {
                (
                    format!(" WHERE {}", predicate.sql),
                    predicate.params.iter().cloned().map(Value::Text).collect(),
                )
            },
        )
    }

    /// Loads the records selected by `filter`, in id order, paging when
    /// `page` is `(limit, offset)`.
    fn select_records(
        &self,
        conn: &Connection,
        filter: Option<&MetadataFilter>,
        page: Option<(usize, usize)>,
    ) -> Result<Vec<VectorRecord>> {
        let plan = self.translator.plan(filter);
        let (where_sql, mut params) = Self::where_clause(&plan);
        let mut sql = format!(
            "SELECT {RECORD_COLUMNS} FROM \"{}\" r{where_sql} ORDER BY r.id",
            self.tables.records
        );
        let sql_page = page.filter(|_| plan.is_exact());
        if let Some((limit, offset)) = sql_page {
            sql.push_str(" LIMIT ? OFFSET ?");
            params.push(Value::Integer(to_sql_int(limit)));
            params.push(Value::Integer(to_sql_int(offset)));
        }

        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| Error::storage("select_records", e))?;
        let rows = stmt
            .query_map(params_from_iter(params.iter()), RecordRow::from_row)
            .map_err(|e| Error::storage("select_records", e))?;

        let mut records = Vec::new();
        for row in rows {
            let record = row
                .map_err(|e| Error::storage("select_records", e))?
                .into_record()?;
            if residual_accepts(&plan, filter, &record.metadata) {
                records.push(record);
            }
        }

        match page {
            Some((limit, offset)) if sql_page.is_none() => Ok(records
                .into_iter()
                .skip(offset)
                .take(limit)
                .collect()),
            _ => Ok(records),
        }
    }

    /// Ids of the records matching `filter`, read without embeddings.
    fn matching_ids(&self, conn: &Connection, filter: &MetadataFilter) -> Result<Vec<RecordId>> {
        let plan = self.translator.plan(Some(filter));
        let (where_sql, params) = Self::where_clause(&plan);
        let sql = format!(
            "SELECT r.id, r.metadata FROM \"{}\" r{where_sql} ORDER BY r.id",
            self.tables.records
        );
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| Error::storage("select_ids", e))?;
        let rows = stmt
            .query_map(params_from_iter(params.iter()), |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })
            .map_err(|e| Error::storage("select_ids", e))?;

        let mut ids = Vec::new();
        for row in rows {
            let (id, metadata_json) = row.map_err(|e| Error::storage("select_ids", e))?;
            if plan.residual {
                let metadata: Metadata = serde_json::from_str(&metadata_json)
                    .map_err(|e| Error::storage("decode_metadata", e))?;
                if !filter.evaluate(&metadata) {
                    continue;
                }
            }
            ids.push(RecordId::new(id));
        }
        Ok(ids)
    }
}

/// Returns true when a fetched row passes the in-memory part of `plan`.
fn residual_accepts(plan: &FilterPlan, filter: Option<&MetadataFilter>, metadata: &Metadata) -> bool {
    !plan.residual || filter.is_none_or(|f| f.evaluate(metadata))
}

fn to_sql_int(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

/// Creates the schema if it does not exist.
fn initialize(conn: &Connection, tables: &Tables) -> Result<()> {
    let Tables {
        records,
        metadata,
        settings,
    } = tables;
    conn.execute_batch(&format!(
        "CREATE TABLE IF NOT EXISTS \"{records}\" (
            id TEXT PRIMARY KEY NOT NULL,
            embedding BLOB NOT NULL,
            dimensions INTEGER NOT NULL,
            content TEXT,
            metadata TEXT NOT NULL DEFAULT '{{}}',
            updated_at INTEGER NOT NULL
        );
        CREATE TABLE IF NOT EXISTS \"{metadata}\" (
            record_id TEXT NOT NULL,
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            PRIMARY KEY (record_id, key)
        );
        CREATE INDEX IF NOT EXISTS \"idx_{metadata}_key_value\" ON \"{metadata}\" (key, value);
        CREATE TABLE IF NOT EXISTS \"{settings}\" (
            name TEXT PRIMARY KEY NOT NULL,
            value TEXT NOT NULL
        );"
    ))
    .map_err(|e| Error::storage("create_schema", e))
}

impl VectorStore for SqliteVectorStore {
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
            self.with_conn(|conn| {
                with_transaction(conn, |tx| {
                    let established = self.established_dimension(tx)?;
                    let dimension = resolve_batch_dimension(established, records)?;
                    if let (None, Some(dimension)) = (established, dimension) {
                        tx.execute(
                            &format!(
                                "INSERT OR REPLACE INTO \"{}\" (name, value) VALUES (?1, ?2)",
                                self.tables.settings
                            ),
                            params![DIMENSIONS_SETTING, dimension.to_string()],
                        )
                        .map_err(|e| Error::storage("write_dimension", e))?;
                        tracing::debug!(dimensions = dimension, "Established store dimension");
                    }
                    let now = i64::try_from(current_timestamp()).unwrap_or(i64::MAX);
                    for record in records {
                        self.write_record(tx, record, now)?;
                    }
                    Ok(())
                })
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
            self.with_conn(|conn| {
                if self.is_empty(conn)? {
                    return Ok(Vec::new());
                }
                if let Some(dimension) = self.established_dimension(conn)? {
                    check_query_dimension(dimension, query)?;
                }
                let candidates = self.select_records(conn, filter, None)?;
                tracing::debug!(candidates = candidates.len(), "Scoring candidates");
                rank_top_k(query, candidates, top_k)
            })
        })
    }

    fn get(&self, id: &RecordId) -> Result<Option<VectorRecord>> {
        observe(BACKEND, "get", || {
            self.with_conn(|conn| {
                conn.query_row(
                    &format!(
                        "SELECT {RECORD_COLUMNS} FROM \"{}\" r WHERE r.id = ?1",
                        self.tables.records
                    ),
                    params![id.as_str()],
                    RecordRow::from_row,
                )
                .optional()
                .map_err(|e| Error::storage("get_record", e))?
                .map(RecordRow::into_record)
                .transpose()
            })
        })
    }

    fn get_batch(&self, ids: &[RecordId]) -> Result<Vec<VectorRecord>> {
        observe(BACKEND, "get_batch", || {
            self.with_conn(|conn| {
                let mut stmt = conn
                    .prepare_cached(&format!(
                        "SELECT {RECORD_COLUMNS} FROM \"{}\" r WHERE r.id = ?1",
                        self.tables.records
                    ))
                    .map_err(|e| Error::storage("get_batch", e))?;
                let mut seen = HashSet::new();
                let mut records = Vec::with_capacity(ids.len());
                for id in ids.iter().filter(|id| seen.insert(*id)) {
                    let row = stmt
                        .query_row(params![id.as_str()], RecordRow::from_row)
                        .optional()
                        .map_err(|e| Error::storage("get_batch", e))?;
                    if let Some(row) = row {
                        records.push(row.into_record()?);
                    }
                }
                Ok(records)
            })
        })
    }

    fn delete(&self, id: &RecordId) -> Result<()> {
        self.delete_batch(std::slice::from_ref(id))
    }

    #[instrument(skip(self, ids), fields(operation = "delete_batch", backend = BACKEND, batch_size = ids.len()))]
    fn delete_batch(&self, ids: &[RecordId]) -> Result<()> {
        observe(BACKEND, "delete_batch", || {
            self.with_conn(|conn| {
                with_transaction(conn, |tx| {
                    for id in ids {
                        self.delete_record(tx, id)?;
                    }
                    Ok(())
                })
            })
        })
    }

    #[instrument(skip(self, filter), fields(operation = "delete_by_filter", backend = BACKEND))]
    fn delete_by_filter(&self, filter: &MetadataFilter) -> Result<u64> {
        observe(BACKEND, "delete_by_filter", || {
            filter.validate()?;
            self.with_conn(|conn| {
                with_transaction(conn, |tx| {
                    let mut deleted = 0_u64;
                    for id in self.matching_ids(tx, filter)? {
                        if self.delete_record(tx, &id)? {
                            deleted += 1;
                        }
                    }
                    tracing::debug!(deleted, %filter, "Deleted records by filter");
                    Ok(deleted)
                })
            })
        })
    }

    fn count(&self, filter: Option<&MetadataFilter>) -> Result<u64> {
        observe(BACKEND, "count", || {
            validate_filter(filter)?;
            self.with_conn(|conn| {
                let plan = self.translator.plan(filter);
                if let (true, Some(filter)) = (plan.residual, filter) {
                    return Ok(self.matching_ids(conn, filter)?.len() as u64);
                }
                let (where_sql, params) = Self::where_clause(&plan);
                let sql = format!(
                    "SELECT COUNT(*) FROM \"{}\" r{where_sql}",
                    self.tables.records
                );
                let count: i64 = conn
                    .query_row(&sql, params_from_iter(params.iter()), |row| row.get(0))
                    .map_err(|e| Error::storage("count_records", e))?;
                Ok(u64::try_from(count).unwrap_or(0))
            })
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
            self.with_conn(|conn| {
                if limit == 0 {
                    return Ok(Vec::new());
                }
                self.select_records(conn, filter, Some((limit, offset)))
            })
        })
    }

    #[instrument(skip(self), fields(operation = "clear", backend = BACKEND))]
    fn clear(&self) -> Result<()> {
        observe(BACKEND, "clear", || {
            self.with_conn(|conn| {
                with_transaction(conn, |tx| {
                    for table in [
                        &self.tables.metadata,
                        &self.tables.records,
                        &self.tables.settings,
                    ] {
                        tx.execute(&format!("DELETE FROM \"{table}\""), [])
                            .map_err(|e| Error::storage("clear", e))?;
                    }
                    Ok(())
                })?;
                tracing::debug!(table = %self.tables.records, "Cleared vector store");
                Ok(())
            })
        })
    }

    fn stats(&self) -> Result<StoreStats> {
        observe(BACKEND, "stats", || {
            self.with_conn(|conn| {
                let total: i64 = conn
                    .query_row(
                        &format!("SELECT COUNT(*) FROM \"{}\"", self.tables.records),
                        [],
                        |row| row.get(0),
                    )
                    .map_err(|e| Error::storage("stats", e))?;
                let total_records = u64::try_from(total).unwrap_or(0);
                let dimensions = if total_records > 0 {
                    self.established_dimension(conn)?
                } else {
                    None
                };
                let page_count: i64 = conn
                    .pragma_query_value(None, "page_count", |row| row.get(0))
                    .map_err(|e| Error::storage("stats", e))?;
                let page_size: i64 = conn
                    .pragma_query_value(None, "page_size", |row| row.get(0))
                    .map_err(|e| Error::storage("stats", e))?;
                Ok(StoreStats {
                    total_records,
                    dimensions,
                    approximate_size_bytes: u64::try_from(page_count.saturating_mul(page_size))
                        .unwrap_or(0),
                })
            })
        })
    }

    fn close(&self) {
        let Some(conn) = acquire_lock(&self.conn).take() else {
            return;
        };
        match conn.close() {
            Ok(()) => tracing::debug!(backend = BACKEND, "Closed vector store"),
            Err((_, e)) => {
                tracing::warn!(backend = BACKEND, error = %e, "Failed to close SQLite connection cleanly");
            },
        }
    }

    fn is_closed(&self) -> bool {
        acquire_lock(&self.conn).is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_records() -> Vec<VectorRecord> {
        vec![
            VectorRecord::with_id("a", vec![1.0, 0.0, 0.0])
                .with_content("alpha")
                .with_metadata("type", "doc")
                .with_metadata("title", "Rust ownership"),
            VectorRecord::with_id("b", vec![0.9, 0.1, 0.0]).with_metadata("type", "doc"),
            VectorRecord::with_id("c", vec![0.0, 1.0, 0.0]).with_metadata("type", "code"),
        ]
    }

    fn create_store() -> SqliteVectorStore {
        let store = SqliteVectorStore::in_memory().unwrap();
        store.upsert_batch(&sample_records()).unwrap();
        store
    }

    #[test]
    fn test_round_trip_preserves_record() {
        let store = create_store();
        let record = store.get(&RecordId::new("a")).unwrap().unwrap();
        assert_eq!(record, sample_records()[0]);
        assert!(store.get(&RecordId::new("zz")).unwrap().is_none());
    }

    #[test]
    fn test_upsert_replaces_metadata() {
        let store = create_store();
        store
            .upsert(&VectorRecord::with_id("a", vec![1.0, 0.0, 0.0]).with_metadata("lang", "en"))
            .unwrap();
        let record = store.get(&RecordId::new("a")).unwrap().unwrap();
        assert!(!record.metadata.contains_key("type"));
        assert!(record.content.is_none());

        // The side table must not keep the dropped key either.
        let filter = MetadataFilter::has_key("title");
        assert_eq!(store.count(Some(&filter)).unwrap(), 0);
    }

    #[test]
    fn test_search_with_pushdown() {
        let store = create_store();
        let filter = MetadataFilter::equals("type", "doc");
        let results = store.search(&[0.0, 1.0, 0.0], 10, Some(&filter)).unwrap();
        let ids: Vec<_> = results.iter().map(|r| r.record.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[test]
    fn test_partial_pushdown_matches_evaluator() {
        let options = StoreOptions::default().with_substring_pushdown(false);
        let store = SqliteVectorStore::in_memory_with_options(&options).unwrap();
        store.upsert_batch(&sample_records()).unwrap();

        let filter =
            MetadataFilter::equals("type", "doc").and(MetadataFilter::contains("title", "Rust"));
        assert_eq!(store.count(Some(&filter)).unwrap(), 1);
        let page = store.list(10, 0, Some(&filter)).unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].id.as_str(), "a");
    }

    #[test]
    fn test_dimension_survives_deletes_until_clear() {
        let store = create_store();
        store
            .delete_batch(&["a".into(), "b".into(), "c".into()])
            .unwrap();
        assert_eq!(store.stats().unwrap().dimensions, None);
        assert!(matches!(
            store.upsert(&VectorRecord::with_id("d", vec![1.0, 0.0])),
            Err(Error::DimensionMismatch {
                expected: 3,
                actual: 2
            })
        ));

        store.clear().unwrap();
        store
            .upsert(&VectorRecord::with_id("d", vec![1.0, 0.0]))
            .unwrap();
        assert_eq!(store.stats().unwrap().dimensions, Some(2));
    }

    #[test]
    fn test_delete_by_filter() {
        let store = create_store();
        let deleted = store
            .delete_by_filter(&MetadataFilter::equals("type", "doc"))
            .unwrap();
        assert_eq!(deleted, 2);
        assert_eq!(store.count(None).unwrap(), 1);
    }

    #[test]
    fn test_custom_table_name() {
        let options = StoreOptions::default().with_table("chunks").unwrap();
        let store = SqliteVectorStore::in_memory_with_options(&options).unwrap();
        store.upsert_batch(&sample_records()).unwrap();
        assert_eq!(store.count(None).unwrap(), 3);
    }

    #[test]
    fn test_persistence_across_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("vectors.db");

        let store = SqliteVectorStore::new(&path, &StoreOptions::default()).unwrap();
        store.upsert_batch(&sample_records()).unwrap();
        store.close();
        assert!(store.is_closed());
        assert!(matches!(store.count(None), Err(Error::Closed)));

        let reopened = SqliteVectorStore::new(&path, &StoreOptions::default()).unwrap();
        assert_eq!(reopened.db_path(), Some(path.as_path()));
        assert_eq!(reopened.count(None).unwrap(), 3);
        let stats = reopened.stats().unwrap();
        assert_eq!(stats.dimensions, Some(3));
        assert!(stats.approximate_size_bytes > 0);
    }

    #[test]
    fn test_failed_batch_writes_nothing() {
        let store = SqliteVectorStore::in_memory().unwrap();
        let result = store.upsert_batch(&[
            VectorRecord::with_id("a", vec![1.0, 0.0]),
            VectorRecord::with_id("", vec![1.0, 0.0]),
        ]);
        assert!(matches!(result, Err(Error::Validation(_))));
        assert_eq!(store.count(None).unwrap(), 0);
        assert_eq!(store.stats().unwrap().dimensions, None);
    }
}
