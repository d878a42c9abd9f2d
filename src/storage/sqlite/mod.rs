//! `SQLite` storage backend.
//!
//! ## Module Structure
//!
//! - `connection`: lock acquisition, pragmas, transactions
//! - `sql`: metadata filter translation and pushdown planning
//! - `record_row`: row and embedding blob conversion
//! - `store`: [`SqliteVectorStore`] itself

mod connection;
mod record_row;
mod sql;
mod store;

pub use connection::{BUSY_TIMEOUT_MS, acquire_lock, configure_connection, with_transaction};
pub use record_row::{RECORD_COLUMNS, RecordRow, decode_embedding, encode_embedding};
pub use sql::{
    FilterPlan, FilterTranslator, MAX_PUSHDOWN_DEPTH, MAX_PUSHDOWN_PARAMS, PushdownCapabilities,
    SqlPredicate,
};
pub use store::SqliteVectorStore;
