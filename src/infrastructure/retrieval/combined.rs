//! Flat search and the flat + hierarchical combination

use tracing::debug;

use super::hierarchical::hierarchical_search;
use crate::domain::retrieval::merge_all;
use crate::domain::search::{
    sort_by_score_desc, RetrievalOptions, SearchResult, SearchTrace, VectorSearchParams,
    VectorStore,
};
use crate::domain::DomainError;

/// Single-phase search with the caller's options
pub(crate) async fn flat_search(
    store: &dyn VectorStore,
    vector: &[f32],
    options: &RetrievalOptions,
    limit: usize,
    trace: SearchTrace,
) -> Result<Vec<SearchResult>, DomainError> {
    let params = VectorSearchParams::from_options(options)
        .with_limit(limit)
        .with_trace(trace);
    store.search(&options.collection, vector, &params).await
}

/// Flat and hierarchical search run concurrently, merged and re-ranked
///
/// Each branch gets half the limit, rounded up; the final truncation to
/// `options.limit` decides what survives.
pub(crate) async fn combined_search(
    store: &dyn VectorStore,
    vector: &[f32],
    options: &RetrievalOptions,
    trace: SearchTrace,
) -> Result<Vec<SearchResult>, DomainError> {
    let half = options.limit.div_ceil(2);

    let (flat, hierarchical) = tokio::join!(
        flat_search(store, vector, options, half, trace),
        hierarchical_search(store, vector, options, half, trace),
    );
    let flat = flat?;
    let (documents, chunks) = hierarchical?;

    let mut merged = merge_all([flat.as_slice(), documents.as_slice(), chunks.as_slice()]);
    sort_by_score_desc(&mut merged);
    merged.truncate(options.limit);

    debug!(
        collection = %options.collection,
        flat = flat.len(),
        documents = documents.len(),
        chunks = chunks.len(),
        returned = merged.len(),
        "Combined search complete"
    );

    Ok(merged)
}
