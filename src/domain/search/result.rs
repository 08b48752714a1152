//! Search result types

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::domain::rule::RuleDocument;

/// A rule returned by a search
///
/// Vector-ranked results always carry a cosine `score`; keyword fallback
/// results carry none, so they cannot be mistaken for ranked output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Matched rule (without its embedding vector)
    pub rule: RuleDocument,
    /// Cosine similarity in [-1, 1]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
}

impl SearchResult {
    /// Create a ranked result
    pub fn scored(rule: RuleDocument, score: f32) -> Self {
        Self {
            rule: strip_embedding(rule),
            score: Some(score),
        }
    }

    /// Create an unranked result (keyword fallback)
    pub fn unscored(rule: RuleDocument) -> Self {
        Self {
            rule: strip_embedding(rule),
            score: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.rule.id
    }

    /// Identity used for deduplication
    pub fn identity_key(&self) -> String {
        self.rule.identity_key()
    }
}

fn strip_embedding(mut rule: RuleDocument) -> RuleDocument {
    rule.embedding = None;
    rule
}

/// Sort results by score, highest first; unscored results go last
///
/// The sort is stable, so equal scores keep their incoming order.
pub fn sort_by_score_desc(results: &mut [SearchResult]) {
    results.sort_by(|a, b| match (a.score, b.score) {
        (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scored_result_drops_embedding() {
        let rule = RuleDocument::new("r1", "body").with_embedding(vec![1.0]);
        let result = SearchResult::scored(rule, 0.9);

        assert!(result.rule.embedding.is_none());
        assert_eq!(result.score, Some(0.9));
        assert_eq!(result.id(), "r1");
    }

    #[test]
    fn test_sort_by_score_desc() {
        let mut results = vec![
            SearchResult::scored(RuleDocument::new("a", ""), 0.2),
            SearchResult::unscored(RuleDocument::new("b", "")),
            SearchResult::scored(RuleDocument::new("c", ""), 0.9),
            SearchResult::scored(RuleDocument::new("d", ""), 0.5),
        ];

        sort_by_score_desc(&mut results);

        let ids: Vec<&str> = results.iter().map(|r| r.id()).collect();
        assert_eq!(ids, vec!["c", "d", "a", "b"]);
    }

    #[test]
    fn test_unscored_serializes_without_score() {
        let result = SearchResult::unscored(RuleDocument::new("r1", "body"));
        let json = serde_json::to_value(&result).unwrap();

        assert!(json.get("score").is_none());
    }
}
