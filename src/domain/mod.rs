//! Domain layer - Core retrieval logic and entities

pub mod cache;
pub mod completion;
pub mod embedding;
pub mod error;
pub mod prompt;
pub mod retrieval;
pub mod retry;
pub mod rule;
pub mod search;

pub use cache::{Cache, CacheExt, CacheKeyGenerator, CacheKeyParams, Clock, DefaultKeyGenerator};
pub use completion::{CompletionOptions, CompletionProvider};
pub use embedding::{cosine_similarity, EmbeddingOutcome, EmbeddingProvider, EmbeddingSource};
pub use error::DomainError;
pub use prompt::{InsertionPoint, PromptLimits, PromptTemplate, TemplateError};
pub use retrieval::{choose_strategy, merge_results, RetrievalOutcome, StrategyThresholds};
pub use retry::RetryConfig;
pub use rule::{FilterCondition, FilterOperator, RuleDocument, RuleFilter, RulePriority};
pub use search::{
    DocumentStore, RetrievalOptions, RetrievalStrategy, SearchResult, SearchTrace, VectorIndex,
    VectorSearchParams, VectorStore,
};
