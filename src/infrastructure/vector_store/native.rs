//! Vector store backed by an external nearest-neighbor index

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::domain::search::{
    sort_by_score_desc, IndexQuery, SearchResult, VectorIndex, VectorSearchParams, VectorStore,
};
use crate::domain::DomainError;

/// Delegates ranking to a [`VectorIndex`]
///
/// Index-side filtering is adapter specific, so the caller filter, the
/// minimum score and the active flag are re-applied to every hit.
pub struct IndexVectorStore {
    index: Arc<dyn VectorIndex>,
}

impl Debug for IndexVectorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexVectorStore")
            .field("index", &self.index.index_name())
            .finish()
    }
}

impl IndexVectorStore {
    pub fn new(index: Arc<dyn VectorIndex>) -> Self {
        Self { index }
    }
}

#[async_trait]
impl VectorStore for IndexVectorStore {
    async fn search(
        &self,
        collection: &str,
        query: &[f32],
        params: &VectorSearchParams,
    ) -> Result<Vec<SearchResult>, DomainError> {
        let index_query = IndexQuery {
            collection: collection.to_string(),
            vector: query.to_vec(),
            k: params.limit,
            filter: params.filter.clone(),
            score_field: params.score_field.clone(),
        };

        let hits = self.index.query(&index_query).await?;
        let received = hits.len();

        let mut results: Vec<SearchResult> = hits
            .into_iter()
            .filter(|hit| hit.document.is_active)
            .filter(|hit| hit.score >= params.min_score)
            .filter(|hit| {
                params
                    .filter
                    .as_ref()
                    .is_none_or(|f| f.matches(&hit.document))
            })
            .map(|hit| SearchResult::scored(hit.document, hit.score))
            .collect();

        sort_by_score_desc(&mut results);
        results.truncate(params.limit);

        debug!(
            collection,
            index = self.index.index_name(),
            received,
            returned = results.len(),
            "Native index search complete"
        );

        Ok(results)
    }

    fn store_type(&self) -> &'static str {
        "native"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::rule::{FilterCondition, RuleDocument};
    use crate::domain::search::{IndexHit, MockVectorIndex};

    fn index_returning(hits: Vec<IndexHit>) -> MockVectorIndex {
        let mut index = MockVectorIndex::new();
        index.expect_index_name().return_const("mock");
        index
            .expect_query()
            .returning(move |_| Ok(hits.clone()));
        index
    }

    #[tokio::test]
    async fn test_reapplies_min_score_and_active() {
        let index = index_returning(vec![
            IndexHit::new(RuleDocument::new("low", "x"), 0.4),
            IndexHit::new(RuleDocument::new("off", "x").inactive(), 0.95),
            IndexHit::new(RuleDocument::new("good", "x"), 0.9),
        ]);
        let store = IndexVectorStore::new(Arc::new(index));

        let results = store
            .search("rules", &[1.0], &VectorSearchParams::new(5, 0.6))
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id(), "good");
    }

    #[tokio::test]
    async fn test_reapplies_caller_filter() {
        let index = index_returning(vec![
            IndexHit::new(RuleDocument::new("a", "x").with_category("spacing"), 0.9),
            IndexHit::new(RuleDocument::new("b", "x").with_category("spelling"), 0.8),
        ]);
        let store = IndexVectorStore::new(Arc::new(index));

        let params = VectorSearchParams::new(5, 0.0)
            .with_filter(Some(FilterCondition::eq("category", "spelling").into()));
        let results = store.search("rules", &[1.0], &params).await.unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id(), "b");
    }

    #[tokio::test]
    async fn test_passes_query_fields_to_index() {
        let mut index = MockVectorIndex::new();
        index.expect_index_name().return_const("mock");
        index
            .expect_query()
            .withf(|q| q.collection == "rules" && q.k == 3 && q.score_field == "similarity")
            .times(1)
            .returning(|_| Ok(Vec::new()));
        let store = IndexVectorStore::new(Arc::new(index));

        let params = VectorSearchParams::new(3, 0.5).with_score_field("similarity");
        let results = store.search("rules", &[0.1, 0.2], &params).await.unwrap();

        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_index_error_propagates() {
        let mut index = MockVectorIndex::new();
        index.expect_index_name().return_const("mock");
        index
            .expect_query()
            .returning(|_| Err(DomainError::index_unavailable("missing")));
        let store = IndexVectorStore::new(Arc::new(index));

        let err = store
            .search("rules", &[1.0], &VectorSearchParams::new(5, 0.6))
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::IndexUnavailable { .. }));
    }
}
