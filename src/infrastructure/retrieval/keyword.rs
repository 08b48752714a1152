//! Keyword search used when no query embedding could be produced

use std::cmp::Reverse;

use tracing::debug;

use crate::domain::retrieval::keyword_filter;
use crate::domain::search::{DocumentStore, RetrievalOptions, SearchResult};
use crate::domain::DomainError;

/// Substring match over the rule text fields, ordered by stored priority
///
/// Results carry no score. A blank query finds nothing.
pub(crate) async fn keyword_search(
    documents: &dyn DocumentStore,
    query: &str,
    options: &RetrievalOptions,
    max_terms: usize,
) -> Result<Vec<SearchResult>, DomainError> {
    let Some(filter) = keyword_filter(query, options.filter.as_ref(), max_terms) else {
        return Ok(Vec::new());
    };

    let mut found = documents.find(&options.collection, Some(&filter)).await?;
    let matched = found.len();

    found.sort_by_key(|doc| Reverse(doc.priority));
    found.truncate(options.limit);

    debug!(
        collection = %options.collection,
        matched,
        returned = found.len(),
        "Keyword search complete"
    );

    Ok(found.into_iter().map(SearchResult::unscored).collect())
}
