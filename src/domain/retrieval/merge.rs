//! Result merging and deduplication

use std::collections::HashSet;

use crate::domain::search::SearchResult;

/// Merge two candidate lists, dropping identity duplicates
///
/// Order is `a` then `b`; the first occurrence of an identity key wins.
/// Neither input is modified.
pub fn merge_results(a: &[SearchResult], b: &[SearchResult]) -> Vec<SearchResult> {
    merge_all([a, b])
}

/// Merge any number of candidate lists in order, first occurrence wins
pub fn merge_all<'a, I>(lists: I) -> Vec<SearchResult>
where
    I: IntoIterator<Item = &'a [SearchResult]>,
{
    let mut seen = HashSet::new();
    let mut merged = Vec::new();

    for list in lists {
        for result in list {
            if seen.insert(result.identity_key()) {
                merged.push(result.clone());
            }
        }
    }

    merged
}
