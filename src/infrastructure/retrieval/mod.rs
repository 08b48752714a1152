//! Rule retrieval: strategy execution over the vector and document stores

mod category;
mod combined;
mod doc_type;
mod engine;
mod hierarchical;
mod keyword;

pub use category::DEFAULT_CATEGORY;
pub use engine::{RetrieverConfig, RuleRetriever};

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use crate::domain::rule::RuleDocument;
    use crate::domain::search::{SearchResult, VectorSearchParams, VectorStore};
    use crate::domain::DomainError;
    use crate::infrastructure::vector_store::{InMemoryDocumentStore, ScanVectorStore};

    /// 2-d unit vector whose cosine with `[1, 0]` is `cos`
    pub fn unit(cos: f32) -> Vec<f32> {
        vec![cos, (1.0 - cos * cos).max(0.0).sqrt()]
    }

    pub fn scan_store(documents: Vec<RuleDocument>) -> ScanVectorStore {
        ScanVectorStore::new(Arc::new(InMemoryDocumentStore::new(documents)))
    }

    /// Scan store that records the parameters of every search
    #[derive(Debug)]
    pub struct RecordingStore {
        inner: ScanVectorStore,
        seen: Mutex<Vec<VectorSearchParams>>,
    }

    impl RecordingStore {
        pub fn new(documents: Vec<RuleDocument>) -> Self {
            Self {
                inner: scan_store(documents),
                seen: Mutex::new(Vec::new()),
            }
        }

        pub fn seen(&self) -> Vec<VectorSearchParams> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl VectorStore for RecordingStore {
        async fn search(
            &self,
            collection: &str,
            query: &[f32],
            params: &VectorSearchParams,
        ) -> Result<Vec<SearchResult>, DomainError> {
            self.seen.lock().unwrap().push(params.clone());
            self.inner.search(collection, query, params).await
        }

        fn store_type(&self) -> &'static str {
            "recording"
        }
    }
}
