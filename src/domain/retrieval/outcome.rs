//! Retrieval outcome - the shape returned by each strategy

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::search::{sort_by_score_desc, RetrievalStrategy, SearchResult};

/// Result of a retrieval call, tagged by the strategy that produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum RetrievalOutcome {
    Default {
        results: Vec<SearchResult>,
    },
    Combined {
        results: Vec<SearchResult>,
    },
    Hierarchical {
        documents: Vec<SearchResult>,
        chunks: Vec<SearchResult>,
    },
    Category {
        categories: BTreeMap<String, Vec<SearchResult>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        chunks: Option<Vec<SearchResult>>,
    },
    DocType {
        doc_types: BTreeMap<String, Vec<SearchResult>>,
    },
    /// Unranked results from the keyword path, used when embedding failed
    KeywordFallback {
        results: Vec<SearchResult>,
    },
}

impl RetrievalOutcome {
    /// An empty outcome shaped for the given strategy
    pub fn empty(strategy: RetrievalStrategy) -> Self {
        match strategy {
            RetrievalStrategy::Default => Self::Default {
                results: Vec::new(),
            },
            RetrievalStrategy::Combined => Self::Combined {
                results: Vec::new(),
            },
            RetrievalStrategy::Hierarchical => Self::Hierarchical {
                documents: Vec::new(),
                chunks: Vec::new(),
            },
            RetrievalStrategy::Category => Self::Category {
                categories: BTreeMap::new(),
                chunks: None,
            },
            RetrievalStrategy::DocType => Self::DocType {
                doc_types: BTreeMap::new(),
            },
        }
    }

    /// Name of the producing strategy, as used in logs and serialized output
    pub fn strategy_name(&self) -> &'static str {
        match self {
            Self::Default { .. } => "default",
            Self::Combined { .. } => "combined",
            Self::Hierarchical { .. } => "hierarchical",
            Self::Category { .. } => "category",
            Self::DocType { .. } => "doc_type",
            Self::KeywordFallback { .. } => "keyword_fallback",
        }
    }

    /// Whether this outcome came from the keyword path
    pub fn is_keyword_fallback(&self) -> bool {
        matches!(self, Self::KeywordFallback { .. })
    }

    /// Total number of results across every group
    pub fn len(&self) -> usize {
        match self {
            Self::Default { results }
            | Self::Combined { results }
            | Self::KeywordFallback { results } => results.len(),
            Self::Hierarchical { documents, chunks } => documents.len() + chunks.len(),
            Self::Category { categories, chunks } => {
                categories.values().map(Vec::len).sum::<usize>()
                    + chunks.as_ref().map_or(0, Vec::len)
            }
            Self::DocType { doc_types } => doc_types.values().map(Vec::len).sum(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flatten all groups into a single list
    ///
    /// Hierarchical outcomes keep documents before chunks. Category and
    /// doc-type groups are merged and re-sorted by score, so the best rule
    /// leads regardless of its group key. Identity duplicates are dropped,
    /// first wins.
    pub fn flatten(&self) -> Vec<SearchResult> {
        match self {
            Self::Default { results }
            | Self::Combined { results }
            | Self::KeywordFallback { results } => results.clone(),
            Self::Hierarchical { documents, chunks } => {
                super::merge_results(documents, chunks)
            }
            Self::Category { categories, chunks } => {
                let groups = categories
                    .values()
                    .map(Vec::as_slice)
                    .chain(chunks.as_deref());
                let mut merged = super::merge_all(groups);
                sort_by_score_desc(&mut merged);
                merged
            }
            Self::DocType { doc_types } => {
                let mut merged = super::merge_all(doc_types.values().map(Vec::as_slice));
                sort_by_score_desc(&mut merged);
                merged
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::prompt::{format_block, format_results, omitted_marker, RULES_HEADER};
    use crate::domain::rule::RuleDocument;

    fn result(id: &str, score: f32) -> SearchResult {
        SearchResult::scored(RuleDocument::new(id, "body"), score)
    }

    #[test]
    fn test_empty_outcomes() {
        for strategy in [
            RetrievalStrategy::Default,
            RetrievalStrategy::Combined,
            RetrievalStrategy::Hierarchical,
            RetrievalStrategy::Category,
            RetrievalStrategy::DocType,
        ] {
            let outcome = RetrievalOutcome::empty(strategy);
            assert!(outcome.is_empty());
            assert_eq!(outcome.strategy_name(), strategy.as_str());
        }
    }

    #[test]
    fn test_hierarchical_flatten_dedupes() {
        let outcome = RetrievalOutcome::Hierarchical {
            documents: vec![result("p1", 0.9)],
            chunks: vec![result("c1", 0.8), result("p1", 0.7)],
        };

        assert_eq!(outcome.len(), 3);
        let ids: Vec<String> = outcome.flatten().iter().map(|r| r.id().to_string()).collect();
        assert_eq!(ids, vec!["p1", "c1"]);
    }

    #[test]
    fn test_category_len_counts_chunks() {
        let mut categories = BTreeMap::new();
        categories.insert("spacing".to_string(), vec![result("a", 0.9)]);
        categories.insert("spelling".to_string(), vec![result("b", 0.8)]);

        let outcome = RetrievalOutcome::Category {
            categories,
            chunks: Some(vec![result("c", 0.7)]),
        };

        assert_eq!(outcome.len(), 3);
        assert_eq!(outcome.flatten().len(), 3);
    }

    #[test]
    fn test_serialized_tag() {
        let outcome = RetrievalOutcome::KeywordFallback {
            results: vec![SearchResult::unscored(RuleDocument::new("k", "body"))],
        };

        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["strategy"], "keyword_fallback");
        assert!(json["results"][0].get("score").is_none());

        let doc_types = RetrievalOutcome::empty(RetrievalStrategy::DocType);
        let json = serde_json::to_value(&doc_types).unwrap();
        assert_eq!(json["strategy"], "doc_type");
        assert!(json["doc_types"].as_object().unwrap().is_empty());
    }

    #[test]
    fn test_grouped_flatten_orders_by_score() {
        let weak = SearchResult::scored(RuleDocument::new("weak", "body").with_title("Weak"), 0.61);
        let best = SearchResult::scored(RuleDocument::new("best", "body").with_title("Best"), 0.99);
        let outcome = RetrievalOutcome::Category {
            categories: BTreeMap::from([
                ("grammar".to_string(), vec![weak.clone()]),
                ("spelling".to_string(), vec![best.clone()]),
            ]),
            chunks: Some(vec![result("chunk", 0.8)]),
        };

        let flat = outcome.flatten();
        let ids: Vec<&str> = flat.iter().map(|r| r.id()).collect();
        assert_eq!(ids, vec!["best", "chunk", "weak"]);

        // Room for one block plus the omitted marker
        let budget = [RULES_HEADER, format_block(&best).as_str(), omitted_marker(2).as_str()]
            .iter()
            .map(|part| part.chars().count())
            .sum::<usize>()
            + 4;
        let rendered = format_results(&flat, budget);
        assert!(rendered.contains("### Best"));
        assert!(!rendered.contains("### Weak"));
        assert!(rendered.ends_with(&omitted_marker(2)));
    }

    #[test]
    fn test_doc_type_flatten_orders_by_score() {
        let outcome = RetrievalOutcome::DocType {
            doc_types: BTreeMap::from([
                ("guideline".to_string(), vec![result("a", 0.4), result("b", 0.3)]),
                ("rule".to_string(), vec![result("c", 0.9)]),
            ]),
        };

        let ids: Vec<String> = outcome.flatten().iter().map(|r| r.id().to_string()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }
}
