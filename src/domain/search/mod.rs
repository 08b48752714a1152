//! Search domain - Results, options and storage seams

mod options;
mod result;
mod store;

pub use options::{RetrievalOptions, RetrievalStrategy, SearchTrace, VectorSearchParams};
pub use result::{sort_by_score_desc, SearchResult};
pub use store::{DocumentStore, IndexHit, IndexQuery, VectorIndex, VectorStore};

#[cfg(test)]
pub use store::MockVectorIndex;
