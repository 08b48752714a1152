//! Category-bucketed search

use std::collections::BTreeMap;

use tracing::debug;

use super::hierarchical::{search_chunks, search_parents};
use crate::domain::search::{
    sort_by_score_desc, RetrievalOptions, SearchResult, SearchTrace, VectorStore,
};
use crate::domain::DomainError;

/// Bucket used for documents without a category
pub const DEFAULT_CATEGORY: &str = "general";

/// Group results by category, each bucket sorted by score
pub(crate) fn bucket_by_category(
    results: Vec<SearchResult>,
    default_category: &str,
) -> BTreeMap<String, Vec<SearchResult>> {
    let mut buckets: BTreeMap<String, Vec<SearchResult>> = BTreeMap::new();

    for result in results {
        let category = result
            .rule
            .category
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .unwrap_or(default_category)
            .to_string();
        buckets.entry(category).or_default().push(result);
    }

    for bucket in buckets.values_mut() {
        sort_by_score_desc(bucket);
    }

    buckets
}

/// Over-fetched parent search partitioned by category
///
/// Returns the buckets and, when `include_chunks` is set, the chunks of the
/// top `limit` parents.
pub(crate) async fn category_search(
    store: &dyn VectorStore,
    vector: &[f32],
    options: &RetrievalOptions,
    default_category: &str,
    trace: SearchTrace,
) -> Result<(BTreeMap<String, Vec<SearchResult>>, Option<Vec<SearchResult>>), DomainError> {
    let fetch_limit = options.limit.saturating_mul(options.category_overfetch);
    let parents = search_parents(store, vector, options, fetch_limit, Vec::new(), trace).await?;

    let chunks = if options.include_chunks {
        let top = &parents[..parents.len().min(options.limit)];
        Some(search_chunks(store, vector, options, top, trace).await)
    } else {
        None
    };

    let categories = bucket_by_category(parents, default_category);

    debug!(
        collection = %options.collection,
        fetch_limit,
        categories = categories.len(),
        "Category search complete"
    );

    Ok((categories, chunks))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::rule::RuleDocument;
    use crate::infrastructure::retrieval::test_support::{scan_store, unit};

    fn fixtures() -> Vec<RuleDocument> {
        vec![
            RuleDocument::new("s1", "x")
                .with_category("spelling")
                .with_embedding(unit(0.7)),
            RuleDocument::new("s2", "x")
                .with_category("spelling")
                .with_embedding(unit(0.9)),
            RuleDocument::new("sp1", "x")
                .with_category("spacing")
                .with_embedding(unit(0.8)),
            RuleDocument::new("g1", "x").with_embedding(unit(0.75)),
            RuleDocument::new("c1", "x")
                .as_chunk_of("s2")
                .with_embedding(unit(0.9)),
        ]
    }

    #[tokio::test]
    async fn test_buckets_sorted_with_default_bucket() {
        let store = scan_store(fixtures());
        let options = RetrievalOptions::default().with_limit(2);

        let (categories, chunks) = category_search(&store, &unit(1.0), &options, DEFAULT_CATEGORY, SearchTrace::default())
            .await
            .unwrap();

        assert!(chunks.is_none());
        let spelling: Vec<&str> = categories["spelling"].iter().map(|r| r.id()).collect();
        assert_eq!(spelling, vec!["s2", "s1"]);
        assert_eq!(categories["spacing"][0].id(), "sp1");
        assert_eq!(categories["general"][0].id(), "g1");
    }

    #[tokio::test]
    async fn test_include_chunks() {
        let store = scan_store(fixtures());
        let options = RetrievalOptions::default()
            .with_limit(1)
            .with_include_chunks(true);

        let (_, chunks) = category_search(&store, &unit(1.0), &options, DEFAULT_CATEGORY, SearchTrace::default())
            .await
            .unwrap();

        let chunks = chunks.unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].id(), "c1");
    }

    #[test]
    fn test_blank_category_goes_to_default() {
        let results = vec![SearchResult::scored(
            RuleDocument::new("a", "x").with_category("  "),
            0.5,
        )];

        let buckets = bucket_by_category(results, "misc");
        assert!(buckets.contains_key("misc"));
    }
}
