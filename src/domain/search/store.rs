//! Storage seams consumed by the retrieval engine

use std::fmt::Debug;

use async_trait::async_trait;

use super::options::VectorSearchParams;
use super::result::SearchResult;
use crate::domain::rule::{RuleDocument, RuleFilter};
use crate::domain::DomainError;

#[cfg(test)]
use mockall::automock;

/// Ranked similarity search over one collection
///
/// Implementations must return results sorted by score (descending), with
/// every score at or above `params.min_score`, at most `params.limit` long.
#[async_trait]
pub trait VectorStore: Send + Sync + Debug {
    async fn search(
        &self,
        collection: &str,
        query: &[f32],
        params: &VectorSearchParams,
    ) -> Result<Vec<SearchResult>, DomainError>;

    /// Short name used in logs
    fn store_type(&self) -> &'static str;
}

/// Query sent to an approximate-nearest-neighbor index
#[derive(Debug, Clone, PartialEq)]
pub struct IndexQuery {
    pub collection: String,
    pub vector: Vec<f32>,
    pub k: usize,
    pub filter: Option<RuleFilter>,
    pub score_field: String,
}

/// A raw hit returned by the index
#[derive(Debug, Clone, PartialEq)]
pub struct IndexHit {
    pub document: RuleDocument,
    pub score: f32,
}

impl IndexHit {
    pub fn new(document: RuleDocument, score: f32) -> Self {
        Self { document, score }
    }
}

/// External approximate-nearest-neighbor index
///
/// May fail with `DomainError::IndexUnavailable` when the index is missing or
/// unreachable.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait VectorIndex: Send + Sync {
    async fn query(&self, query: &IndexQuery) -> Result<Vec<IndexHit>, DomainError>;

    /// Short name used in logs
    fn index_name(&self) -> &'static str;
}

/// Read path of the content-management document store
#[async_trait]
pub trait DocumentStore: Send + Sync + Debug {
    /// Find documents in a collection matching an optional filter
    async fn find(
        &self,
        collection: &str,
        filter: Option<&RuleFilter>,
    ) -> Result<Vec<RuleDocument>, DomainError>;
}
