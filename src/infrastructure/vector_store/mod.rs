//! Vector store adapters
//!
//! - [`IndexVectorStore`] ranks through an external [`VectorIndex`](crate::domain::VectorIndex)
//! - [`ScanVectorStore`] ranks every document in process
//! - [`FallbackVectorStore`] tries the first and degrades to the second

mod document_store;
mod fallback;
mod in_memory;
mod native;
mod pgvector;

pub use document_store::InMemoryDocumentStore;
pub use fallback::FallbackVectorStore;
pub use in_memory::ScanVectorStore;
pub use native::IndexVectorStore;
pub use pgvector::{filter_to_sql, PgVectorConfig, PgVectorRuleIndex, DEFAULT_TABLE_NAME};
