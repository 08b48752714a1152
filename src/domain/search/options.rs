//! Retrieval options and strategies

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::rule::{RuleFilter, DEFAULT_COLLECTION};
use crate::domain::DomainError;

/// Named retrieval algorithm variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalStrategy {
    /// Single-phase flat vector search
    Default,
    /// Parent search followed by per-parent chunk search
    Hierarchical,
    /// Over-fetched parent search bucketed by category
    Category,
    /// One flat search per requested document type
    #[serde(alias = "docType")]
    DocType,
    /// Default and hierarchical searches merged
    Combined,
}

impl RetrievalStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Hierarchical => "hierarchical",
            Self::Category => "category",
            Self::DocType => "doc_type",
            Self::Combined => "combined",
        }
    }
}

impl fmt::Display for RetrievalStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RetrievalStrategy {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "default" | "basic" => Ok(Self::Default),
            "hierarchical" => Ok(Self::Hierarchical),
            "category" => Ok(Self::Category),
            "doc_type" | "docType" => Ok(Self::DocType),
            "combined" => Ok(Self::Combined),
            other => Err(DomainError::configuration(format!(
                "Unknown retrieval strategy '{}'",
                other
            ))),
        }
    }
}

/// Options for a retrieval call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalOptions {
    /// Collection to search
    pub collection: String,
    /// Maximum number of results
    pub limit: usize,
    /// Minimum cosine similarity
    pub min_score: f32,
    /// Caller field predicates
    pub filter: Option<RuleFilter>,
    /// Name of the score field reported by the native index
    pub score_field: String,
    /// Append chunk results to category search
    pub include_chunks: bool,
    /// Explicit strategy, wins over every heuristic
    pub strategy: Option<RetrievalStrategy>,
    /// Document types for doc-type search
    pub doc_types: Option<Vec<String>>,
    /// Prefer category search
    pub use_categories: bool,
    /// Prefer hierarchical search
    pub use_hierarchical: bool,
    /// Chunks per parent in hierarchical search
    pub chunks_limit: usize,
    /// Minimum score for chunks (looser than parents)
    pub chunks_min_score: f32,
    /// Over-fetch multiplier for category search
    pub category_overfetch: usize,
}

impl Default for RetrievalOptions {
    fn default() -> Self {
        Self {
            collection: DEFAULT_COLLECTION.to_string(),
            limit: 5,
            min_score: 0.6,
            filter: None,
            score_field: "score".to_string(),
            include_chunks: false,
            strategy: None,
            doc_types: None,
            use_categories: false,
            use_hierarchical: false,
            chunks_limit: 3,
            chunks_min_score: 0.65,
            category_overfetch: 3,
        }
    }
}

impl RetrievalOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_min_score(mut self, min_score: f32) -> Self {
        self.min_score = min_score;
        self
    }

    pub fn with_filter(mut self, filter: RuleFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_strategy(mut self, strategy: RetrievalStrategy) -> Self {
        self.strategy = Some(strategy);
        self
    }

    /// Set the strategy from its name; unknown names are a configuration error
    pub fn with_strategy_name(self, name: &str) -> Result<Self, DomainError> {
        Ok(self.with_strategy(name.parse()?))
    }

    pub fn with_doc_types(mut self, doc_types: Vec<String>) -> Self {
        self.doc_types = Some(doc_types);
        self
    }

    pub fn with_categories(mut self, use_categories: bool) -> Self {
        self.use_categories = use_categories;
        self
    }

    pub fn with_hierarchical(mut self, use_hierarchical: bool) -> Self {
        self.use_hierarchical = use_hierarchical;
        self
    }

    pub fn with_include_chunks(mut self, include_chunks: bool) -> Self {
        self.include_chunks = include_chunks;
        self
    }

    pub fn with_chunks(mut self, limit: usize, min_score: f32) -> Self {
        self.chunks_limit = limit;
        self.chunks_min_score = min_score;
        self
    }

    /// Check the options for caller mistakes
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.limit == 0 {
            return Err(DomainError::configuration("limit must be greater than 0"));
        }

        if self.chunks_limit == 0 {
            return Err(DomainError::configuration(
                "chunks_limit must be greater than 0",
            ));
        }

        if self.category_overfetch == 0 {
            return Err(DomainError::configuration(
                "category_overfetch must be at least 1",
            ));
        }

        for (name, score) in [
            ("min_score", self.min_score),
            ("chunks_min_score", self.chunks_min_score),
        ] {
            if !score.is_finite() || !(-1.0..=1.0).contains(&score) {
                return Err(DomainError::configuration(format!(
                    "{} must be within [-1, 1], got {}",
                    name, score
                )));
            }
        }

        if self.collection.trim().is_empty() {
            return Err(DomainError::configuration("collection must not be empty"));
        }

        Ok(())
    }
}

/// Retrieval call a store search belongs to, carried for recovery logs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchTrace {
    pub strategy: RetrievalStrategy,
    /// Query length in chars
    pub query_len: usize,
}

impl SearchTrace {
    pub fn new(strategy: RetrievalStrategy, query_len: usize) -> Self {
        Self {
            strategy,
            query_len,
        }
    }
}

impl Default for SearchTrace {
    fn default() -> Self {
        Self::new(RetrievalStrategy::Default, 0)
    }
}

/// Parameters for a single vector store search
#[derive(Debug, Clone, PartialEq)]
pub struct VectorSearchParams {
    pub limit: usize,
    pub min_score: f32,
    pub filter: Option<RuleFilter>,
    pub score_field: String,
    pub trace: SearchTrace,
}

impl VectorSearchParams {
    pub fn new(limit: usize, min_score: f32) -> Self {
        Self {
            limit,
            min_score,
            filter: None,
            score_field: "score".to_string(),
            trace: SearchTrace::default(),
        }
    }

    /// Parameters matching the top-level options of a retrieval call
    pub fn from_options(options: &RetrievalOptions) -> Self {
        Self {
            limit: options.limit,
            min_score: options.min_score,
            filter: options.filter.clone(),
            score_field: options.score_field.clone(),
            trace: SearchTrace::default(),
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_filter(mut self, filter: Option<RuleFilter>) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_score_field(mut self, score_field: impl Into<String>) -> Self {
        self.score_field = score_field.into();
        self
    }

    pub fn with_trace(mut self, trace: SearchTrace) -> Self {
        self.trace = trace;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_strategy_names() {
        assert_eq!(
            "category".parse::<RetrievalStrategy>().unwrap(),
            RetrievalStrategy::Category
        );
        assert_eq!(
            "docType".parse::<RetrievalStrategy>().unwrap(),
            RetrievalStrategy::DocType
        );
        assert_eq!(
            "basic".parse::<RetrievalStrategy>().unwrap(),
            RetrievalStrategy::Default
        );
    }

    #[test]
    fn test_unknown_strategy_is_configuration_error() {
        let err = RetrievalOptions::new()
            .with_strategy_name("semantic-magic")
            .unwrap_err();

        assert!(matches!(err, DomainError::Configuration { .. }));
    }

    #[test]
    fn test_strategy_serde_alias() {
        let strategy: RetrievalStrategy = serde_json::from_str("\"docType\"").unwrap();
        assert_eq!(strategy, RetrievalStrategy::DocType);
        assert_eq!(serde_json::to_string(&strategy).unwrap(), "\"doc_type\"");
    }

    #[test]
    fn test_default_options() {
        let options = RetrievalOptions::default();

        assert_eq!(options.limit, 5);
        assert_eq!(options.min_score, 0.6);
        assert_eq!(options.chunks_min_score, 0.65);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(RetrievalOptions::new().with_limit(0).validate().is_err());
        assert!(RetrievalOptions::new().with_min_score(1.5).validate().is_err());
        assert!(RetrievalOptions::new()
            .with_min_score(f32::NAN)
            .validate()
            .is_err());
    }

    #[test]
    fn test_options_deserialize_partial() {
        let options: RetrievalOptions =
            serde_json::from_value(serde_json::json!({"limit": 2, "strategy": "combined"}))
                .unwrap();

        assert_eq!(options.limit, 2);
        assert_eq!(options.strategy, Some(RetrievalStrategy::Combined));
        assert_eq!(options.min_score, 0.6);
    }
}
