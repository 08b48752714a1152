//! Native-first vector store with in-memory fallback

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::domain::search::{SearchResult, VectorSearchParams, VectorStore};
use crate::domain::DomainError;

/// Tries the native store first and scans in memory on any native error
///
/// The native error is logged and never surfaced. Without a native store
/// every search goes straight to the fallback.
#[derive(Debug, Clone)]
pub struct FallbackVectorStore {
    native: Option<Arc<dyn VectorStore>>,
    fallback: Arc<dyn VectorStore>,
}

impl FallbackVectorStore {
    pub fn new(native: Option<Arc<dyn VectorStore>>, fallback: Arc<dyn VectorStore>) -> Self {
        Self { native, fallback }
    }

    pub fn fallback_only(fallback: Arc<dyn VectorStore>) -> Self {
        Self::new(None, fallback)
    }

    pub fn has_native(&self) -> bool {
        self.native.is_some()
    }
}

#[async_trait]
impl VectorStore for FallbackVectorStore {
    async fn search(
        &self,
        collection: &str,
        query: &[f32],
        params: &VectorSearchParams,
    ) -> Result<Vec<SearchResult>, DomainError> {
        if let Some(native) = &self.native {
            match native.search(collection, query, params).await {
                Ok(results) => return Ok(results),
                Err(e) => {
                    warn!(
                        strategy = %params.trace.strategy,
                        query_len = params.trace.query_len,
                        collection,
                        native = native.store_type(),
                        fallback = self.fallback.store_type(),
                        error = %e,
                        "Native vector search failed, falling back to in-memory scan"
                    );
                }
            }
        }

        self.fallback.search(collection, query, params).await
    }

    fn store_type(&self) -> &'static str {
        if self.native.is_some() {
            "native_with_fallback"
        } else {
            self.fallback.store_type()
        }
    }
}
