//! Brute-force cosine scan over the document store

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::domain::embedding::cosine_similarity;
use crate::domain::rule::{FilterCondition, RuleDocument, RuleFilter};
use crate::domain::search::{
    sort_by_score_desc, DocumentStore, SearchResult, SearchTrace, VectorSearchParams, VectorStore,
};
use crate::domain::DomainError;

/// Vector store that ranks every active, embedded document in process
///
/// This is O(N) per query and is used when no native index is configured or
/// when the native index fails.
#[derive(Debug, Clone)]
pub struct ScanVectorStore {
    documents: Arc<dyn DocumentStore>,
}

impl ScanVectorStore {
    pub fn new(documents: Arc<dyn DocumentStore>) -> Self {
        Self { documents }
    }

    fn score(query: &[f32], doc: &RuleDocument, trace: &SearchTrace) -> Option<f32> {
        let embedding = doc.embedding.as_deref()?;

        match cosine_similarity(query, embedding) {
            Ok(score) => Some(score),
            Err(e) => {
                warn!(
                    strategy = %trace.strategy,
                    query_len = trace.query_len,
                    document_id = %doc.id,
                    collection = %doc.collection,
                    error = %e,
                    "Skipping document with malformed embedding"
                );
                None
            }
        }
    }
}

#[async_trait]
impl VectorStore for ScanVectorStore {
    async fn search(
        &self,
        collection: &str,
        query: &[f32],
        params: &VectorSearchParams,
    ) -> Result<Vec<SearchResult>, DomainError> {
        let filter = RuleFilter::merged(
            params.filter.as_ref(),
            vec![
                FilterCondition::eq("is_active", true).into(),
                FilterCondition::exists("embedding").into(),
            ],
        );

        let candidates = self.documents.find(collection, Some(&filter)).await?;
        let scanned = candidates.len();

        let mut results: Vec<SearchResult> = candidates
            .into_iter()
            .filter(|doc| doc.is_active)
            .filter_map(|doc| {
                let score = Self::score(query, &doc, &params.trace)?;
                (score >= params.min_score).then(|| SearchResult::scored(doc, score))
            })
            .collect();

        sort_by_score_desc(&mut results);
        results.truncate(params.limit);

        debug!(
            collection,
            scanned,
            returned = results.len(),
            min_score = params.min_score,
            "In-memory vector scan complete"
        );

        Ok(results)
    }

    fn store_type(&self) -> &'static str {
        "in_memory"
    }
}
