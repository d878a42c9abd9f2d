//! Storage layer.
//!
//! Every backend implements [`VectorStore`]:
//! - **`SQLite`**: persistent, filters pushed down as SQL ([`SqliteVectorStore`])
//! - **Memory**: ephemeral, filters evaluated in process ([`InMemoryVectorStore`])
//!
//! Both share the argument checks in [`validation`] and the metrics helpers
//! in [`metrics`], so they accept and reject exactly the same inputs.

// Allow cast precision loss for record counts reported as u64.
#![allow(clippy::cast_precision_loss)]
// Allow significant_drop_tightening - holding the connection lock for the
// whole operation is what serializes writes.
#![allow(clippy::significant_drop_tightening)]
// Allow unused_self for methods kept for API consistency.
#![allow(clippy::unused_self)]

pub mod memory;
pub mod metrics;
pub mod sqlite;
pub mod traits;
pub mod validation;

pub use memory::InMemoryVectorStore;
pub use sqlite::SqliteVectorStore;
pub use traits::VectorStore;
