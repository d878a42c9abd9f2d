//! Connection handling for the `SQLite` backend.
//!
//! Mutex acquisition with poison recovery, pragma configuration, and the
//! `BEGIN IMMEDIATE` transaction wrapper every write goes through.

use crate::{Error, Result};
use rusqlite::Connection;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// Milliseconds `SQLite` waits on a locked database before failing.
pub const BUSY_TIMEOUT_MS: u64 = 5000;

/// Helper to acquire mutex lock with poison recovery.
///
/// If the mutex is poisoned (due to a panic in a previous critical section),
/// we recover the inner value and log a warning. Every write runs in a
/// transaction that is rolled back on failure, so the connection is still
/// consistent.
pub fn acquire_lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::warn!("SQLite mutex was poisoned, recovering");
            metrics::counter!("sqlite_mutex_poison_recovery_total").increment(1);
            poisoned.into_inner()
        },
    }
}

/// Configures a `SQLite` connection for concurrent access.
///
/// # Configuration Applied
///
/// - **WAL mode**: readers in other processes do not block the writer
/// - **NORMAL synchronous**: durable at checkpoints, fast on commit
/// - **`busy_timeout`**: waits up to 5 seconds on lock contention
/// - **`cache_size`**: page cache in KiB, when a hint is given
///
/// In-memory databases report `memory` for the journal mode; that is not an
/// error.
///
/// # Errors
///
/// Returns [`Error::StorageIo`] if a pragma other than `journal_mode` fails.
pub fn configure_connection(conn: &Connection, cache_size_kib: Option<u32>) -> Result<()> {
    if let Err(e) = conn.pragma_update(None, "journal_mode", "WAL") {
        tracing::debug!(error = %e, "WAL journal mode unavailable");
    }
    conn.pragma_update(None, "synchronous", "NORMAL")
        .map_err(|e| Error::storage("configure_synchronous", e))?;
    conn.busy_timeout(Duration::from_millis(BUSY_TIMEOUT_MS))
        .map_err(|e| Error::storage("configure_busy_timeout", e))?;
    if let Some(kib) = cache_size_kib {
        // Negative cache_size is interpreted as KiB rather than pages.
        conn.pragma_update(None, "cache_size", -i64::from(kib))
            .map_err(|e| Error::storage("configure_cache_size", e))?;
    }
    Ok(())
}

/// Runs `f` inside `BEGIN IMMEDIATE ... COMMIT`, rolling back on error.
///
/// `IMMEDIATE` takes the write lock up front so concurrent writers queue on
/// `busy_timeout` instead of failing mid-transaction.
///
/// # Errors
///
/// Returns the error from `f`, or [`Error::StorageIo`] if the transaction
/// cannot be started or committed.
pub fn with_transaction<T>(conn: &Connection, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
    conn.execute("BEGIN IMMEDIATE", [])
        .map_err(|e| Error::storage("begin_transaction", e))?;

    let result = f(conn);

    if result.is_ok() {
        if let Err(e) = conn.execute("COMMIT", []) {
            rollback(conn);
            return Err(Error::storage("commit_transaction", e));
        }
    } else {
        rollback(conn);
    }
    result
}

fn rollback(conn: &Connection) {
    if let Err(e) = conn.execute("ROLLBACK", []) {
        tracing::warn!(error = %e, "Failed to roll back transaction");
    }
}
