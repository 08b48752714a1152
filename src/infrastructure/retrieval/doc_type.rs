//! One flat search per requested document type

use std::collections::BTreeMap;

use futures::future::join_all;
use tracing::debug;

use super::hierarchical::search_parents;
use crate::domain::rule::FilterCondition;
use crate::domain::search::{RetrievalOptions, SearchResult, SearchTrace, VectorStore};
use crate::domain::DomainError;

/// Concurrent parent-only searches keyed by doc type
///
/// Every requested type appears in the output, with an empty list when
/// nothing matched.
pub(crate) async fn doc_type_search(
    store: &dyn VectorStore,
    vector: &[f32],
    options: &RetrievalOptions,
    trace: SearchTrace,
) -> Result<BTreeMap<String, Vec<SearchResult>>, DomainError> {
    let doc_types = options.doc_types.as_deref().unwrap_or_default();

    let searches = doc_types.iter().map(|doc_type| async move {
        let extra = vec![FilterCondition::eq("doc_type", doc_type.as_str()).into()];
        let result = search_parents(store, vector, options, options.limit, extra, trace).await;
        (doc_type.clone(), result)
    });

    let mut grouped = BTreeMap::new();
    for (doc_type, result) in join_all(searches).await {
        grouped.insert(doc_type, result?);
    }

    debug!(
        collection = %options.collection,
        doc_types = grouped.len(),
        "Doc type search complete"
    );

    Ok(grouped)
}
