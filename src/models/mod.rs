//! Data models for embedstore.
//!
//! Records, scored search results, store statistics and the metadata filter
//! language.

mod filter;
mod record;

pub use filter::MetadataFilter;
pub use record::{
    Metadata, RecordId, ScoredRecord, StoreStats, VectorRecord, validate_vector,
};
