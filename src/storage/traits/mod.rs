//! Storage trait definitions.

mod store;

pub use store::VectorStore;
