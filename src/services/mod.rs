//! Services built on the storage layer.
//!
//! - [`StoreFactory`]: constructs a store from configuration
//! - [`DocumentIndexer`]: keeps a store in step with a document registry

mod backend_factory;
mod indexer;

pub use backend_factory::StoreFactory;
pub use indexer::{CONTENT_HASH_KEY, Document, DocumentIndexer, IndexReport};
