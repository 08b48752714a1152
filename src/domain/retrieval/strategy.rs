//! Retrieval strategy selection

use crate::domain::search::{RetrievalOptions, RetrievalStrategy};

/// Query-length thresholds used by the strategy heuristic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrategyThresholds {
    /// Queries longer than this (in chars) use hierarchical search
    pub hierarchical_chars: usize,
    /// Queries longer than this (in chars) use combined search
    pub combined_chars: usize,
}

impl Default for StrategyThresholds {
    fn default() -> Self {
        Self {
            hierarchical_chars: 500,
            combined_chars: 100,
        }
    }
}

/// Choose a strategy for a query; the first matching rule wins
///
/// An explicit strategy, then doc types, categories and the hierarchical
/// flag; otherwise the query length decides.
pub fn choose_strategy(
    query: &str,
    options: &RetrievalOptions,
    thresholds: &StrategyThresholds,
) -> RetrievalStrategy {
    if let Some(strategy) = options.strategy {
        return strategy;
    }

    if options.doc_types.is_some() {
        return RetrievalStrategy::DocType;
    }

    if options.use_categories {
        return RetrievalStrategy::Category;
    }

    if options.use_hierarchical {
        return RetrievalStrategy::Hierarchical;
    }

    let length = query.chars().count();

    if length > thresholds.hierarchical_chars {
        RetrievalStrategy::Hierarchical
    } else if length > thresholds.combined_chars {
        RetrievalStrategy::Combined
    } else {
        RetrievalStrategy::Default
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn choose(query: &str, options: &RetrievalOptions) -> RetrievalStrategy {
        choose_strategy(query, options, &StrategyThresholds::default())
    }

    #[test]
    fn test_long_query_is_hierarchical() {
        let query = "가".repeat(600);
        assert_eq!(
            choose(&query, &RetrievalOptions::default()),
            RetrievalStrategy::Hierarchical
        );
    }

    #[test]
    fn test_medium_query_is_combined() {
        let query = "a".repeat(150);
        assert_eq!(
            choose(&query, &RetrievalOptions::default()),
            RetrievalStrategy::Combined
        );
    }

    #[test]
    fn test_short_query_is_default() {
        let query = "a".repeat(50);
        assert_eq!(
            choose(&query, &RetrievalOptions::default()),
            RetrievalStrategy::Default
        );
    }

    #[test]
    fn test_boundaries_are_exclusive() {
        let options = RetrievalOptions::default();
        assert_eq!(choose(&"a".repeat(100), &options), RetrievalStrategy::Default);
        assert_eq!(choose(&"a".repeat(500), &options), RetrievalStrategy::Combined);
    }

    #[test]
    fn test_length_counts_chars_not_bytes() {
        // 60 Hangul syllables are 180 bytes but only 60 chars
        let query = "한".repeat(60);
        assert_eq!(
            choose(&query, &RetrievalOptions::default()),
            RetrievalStrategy::Default
        );
    }

    #[test]
    fn test_explicit_strategy_always_wins() {
        let options = RetrievalOptions::default()
            .with_strategy(RetrievalStrategy::Category)
            .with_doc_types(vec!["guide".into()])
            .with_hierarchical(true);

        assert_eq!(choose("short", &options), RetrievalStrategy::Category);
        assert_eq!(
            choose(&"a".repeat(900), &options),
            RetrievalStrategy::Category
        );
    }

    #[test]
    fn test_flag_precedence() {
        let doc_types = RetrievalOptions::default()
            .with_doc_types(vec!["guide".into()])
            .with_categories(true)
            .with_hierarchical(true);
        assert_eq!(choose("q", &doc_types), RetrievalStrategy::DocType);

        let categories = RetrievalOptions::default()
            .with_categories(true)
            .with_hierarchical(true);
        assert_eq!(choose("q", &categories), RetrievalStrategy::Category);

        let hierarchical = RetrievalOptions::default().with_hierarchical(true);
        assert_eq!(choose("q", &hierarchical), RetrievalStrategy::Hierarchical);
    }

    #[test]
    fn test_custom_thresholds() {
        let thresholds = StrategyThresholds {
            hierarchical_chars: 20,
            combined_chars: 10,
        };

        assert_eq!(
            choose_strategy(&"a".repeat(15), &RetrievalOptions::default(), &thresholds),
            RetrievalStrategy::Combined
        );
    }
}
