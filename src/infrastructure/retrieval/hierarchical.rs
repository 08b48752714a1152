//! Parent-then-chunk search

use futures::future::join_all;
use tracing::{debug, warn};

use crate::domain::rule::{FilterCondition, RuleFilter};
use crate::domain::search::{
    sort_by_score_desc, RetrievalOptions, SearchResult, SearchTrace, VectorSearchParams,
    VectorStore,
};
use crate::domain::DomainError;

/// Caller filter restricted to top-level documents
pub(crate) fn parent_filter(options: &RetrievalOptions, extra: Vec<RuleFilter>) -> RuleFilter {
    let mut constraints = vec![FilterCondition::ne("is_chunk", true).into()];
    constraints.extend(extra);

    RuleFilter::merged(options.filter.as_ref(), constraints)
}

/// Parent-only search with the top-level score threshold
pub(crate) async fn search_parents(
    store: &dyn VectorStore,
    vector: &[f32],
    options: &RetrievalOptions,
    limit: usize,
    extra: Vec<RuleFilter>,
    trace: SearchTrace,
) -> Result<Vec<SearchResult>, DomainError> {
    let params = VectorSearchParams::from_options(options)
        .with_limit(limit)
        .with_filter(Some(parent_filter(options, extra)))
        .with_trace(trace);

    store.search(&options.collection, vector, &params).await
}

/// Chunks of every parent, searched concurrently and sorted by score
///
/// A failed chunk search only loses that parent's chunks.
pub(crate) async fn search_chunks(
    store: &dyn VectorStore,
    vector: &[f32],
    options: &RetrievalOptions,
    parents: &[SearchResult],
    trace: SearchTrace,
) -> Vec<SearchResult> {
    let searches = parents
        .iter()
        .filter(|parent| !parent.id().is_empty())
        .map(|parent| {
            let parent_id = parent.id().to_string();
            let params = VectorSearchParams::new(options.chunks_limit, options.chunks_min_score)
                .with_score_field(options.score_field.clone())
                .with_trace(trace)
                .with_filter(Some(RuleFilter::and(vec![
                    FilterCondition::eq("is_chunk", true).into(),
                    FilterCondition::eq("parent_id", parent_id.as_str()).into(),
                ])));

            async move {
                let result = store.search(&options.collection, vector, &params).await;
                (parent_id, result)
            }
        });

    let mut chunks = Vec::new();
    for (parent_id, result) in join_all(searches).await {
        match result {
            Ok(found) => chunks.extend(found),
            Err(e) => warn!(
                strategy = %trace.strategy,
                query_len = trace.query_len,
                collection = %options.collection,
                parent_id = %parent_id,
                error = %e,
                "Chunk search failed for parent"
            ),
        }
    }

    sort_by_score_desc(&mut chunks);
    chunks
}

/// Two-phase search: parents first, then the chunks of each parent
///
/// Returns `(documents, chunks)`; no parents means no chunk searches.
pub(crate) async fn hierarchical_search(
    store: &dyn VectorStore,
    vector: &[f32],
    options: &RetrievalOptions,
    limit: usize,
    trace: SearchTrace,
) -> Result<(Vec<SearchResult>, Vec<SearchResult>), DomainError> {
    let documents = search_parents(store, vector, options, limit, Vec::new(), trace).await?;

    if documents.is_empty() {
        debug!(collection = %options.collection, "No parent documents matched");
        return Ok((Vec::new(), Vec::new()));
    }

    let chunks = search_chunks(store, vector, options, &documents, trace).await;

    debug!(
        collection = %options.collection,
        documents = documents.len(),
        chunks = chunks.len(),
        "Hierarchical search complete"
    );

    Ok((documents, chunks))
}
