//! Rule retrieval pipeline

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::category::{category_search, DEFAULT_CATEGORY};
use super::combined::{combined_search, flat_search};
use super::doc_type::doc_type_search;
use super::hierarchical::hierarchical_search;
use super::keyword::keyword_search;
use crate::domain::cache::{Cache, CacheExt, CacheKeyGenerator, CacheKeyParams, DefaultKeyGenerator};
use crate::domain::retrieval::{choose_strategy, RetrievalOutcome, StrategyThresholds, DEFAULT_MAX_TERMS};
use crate::domain::search::{
    DocumentStore, RetrievalOptions, RetrievalStrategy, SearchTrace, VectorStore,
};
use crate::domain::DomainError;
use crate::infrastructure::embedding::ResilientEmbedder;

const CACHE_NAMESPACE: &str = "retrieval";

/// Tuning for [`RuleRetriever`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrieverConfig {
    /// Queries longer than this (chars) use hierarchical search
    pub hierarchical_threshold_chars: usize,
    /// Queries longer than this (chars) use combined search
    pub combined_threshold_chars: usize,
    /// Maximum distinct terms used by keyword search
    pub keyword_token_limit: usize,
    /// Bucket for documents without a category
    pub default_category: String,
    /// Cache lifetime for retrieval outcomes; 0 or less never expires
    pub cache_ttl_seconds: i64,
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        let thresholds = StrategyThresholds::default();

        Self {
            hierarchical_threshold_chars: thresholds.hierarchical_chars,
            combined_threshold_chars: thresholds.combined_chars,
            keyword_token_limit: DEFAULT_MAX_TERMS,
            default_category: DEFAULT_CATEGORY.to_string(),
            cache_ttl_seconds: 300,
        }
    }
}

impl RetrieverConfig {
    pub fn thresholds(&self) -> StrategyThresholds {
        StrategyThresholds {
            hierarchical_chars: self.hierarchical_threshold_chars,
            combined_chars: self.combined_threshold_chars,
        }
    }
}

/// Finds the rules relevant to a piece of text
///
/// Backend failures never fail a call: they are logged and the call
/// degrades to an empty outcome. Only caller mistakes (bad options,
/// dimension mismatches) are returned as errors.
#[derive(Debug, Clone)]
pub struct RuleRetriever {
    embedder: ResilientEmbedder,
    store: Arc<dyn VectorStore>,
    documents: Arc<dyn DocumentStore>,
    cache: Option<Arc<dyn Cache>>,
    key_generator: DefaultKeyGenerator,
    config: RetrieverConfig,
}

impl RuleRetriever {
    pub fn new(
        embedder: ResilientEmbedder,
        store: Arc<dyn VectorStore>,
        documents: Arc<dyn DocumentStore>,
    ) -> Self {
        Self {
            embedder,
            store,
            documents,
            cache: None,
            key_generator: DefaultKeyGenerator::hashed(),
            config: RetrieverConfig::default(),
        }
    }

    pub fn with_cache(mut self, cache: Arc<dyn Cache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_config(mut self, config: RetrieverConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &RetrieverConfig {
        &self.config
    }

    /// Retrieve rules for `text` with the strategy the options call for
    pub async fn find_relevant_rules(
        &self,
        text: &str,
        options: &RetrievalOptions,
    ) -> Result<RetrievalOutcome, DomainError> {
        options.validate()?;

        let strategy = choose_strategy(text, options, &self.config.thresholds());
        let query_len = text.chars().count();

        if text.trim().is_empty() {
            debug!(strategy = %strategy, "Blank query, nothing to retrieve");
            return Ok(RetrievalOutcome::empty(strategy));
        }

        let cache_key = self.cache_key(text, options);
        if let Some(outcome) = self.cached(cache_key.as_deref()).await {
            debug!(strategy = %strategy, query_len, "Retrieval cache hit");
            return Ok(outcome);
        }

        let embedding = match self.embedder.embed(text).await {
            Ok(embedding) => embedding,
            Err(e) if e.is_caller_error() => return Err(e),
            Err(e) => {
                warn!(
                    strategy = %strategy,
                    query_len,
                    error = %e,
                    "Embedding failed, using keyword search"
                );
                return Ok(self
                    .keyword_fallback(text, options, SearchTrace::new(strategy, query_len))
                    .await);
            }
        };

        let trace = SearchTrace::new(strategy, query_len);
        let outcome = match self.run_strategy(trace, &embedding.vector, options).await {
            Ok(outcome) => outcome,
            Err(e) if e.is_caller_error() => return Err(e),
            Err(e) => {
                warn!(
                    strategy = %strategy,
                    query_len,
                    collection = %options.collection,
                    error = %e,
                    "Retrieval failed, continuing without rules"
                );
                return Ok(RetrievalOutcome::empty(strategy));
            }
        };

        info!(
            strategy = %strategy,
            query_len,
            results = outcome.len(),
            degraded = embedding.is_degraded(),
            "Rules retrieved"
        );

        // Fallback vectors are meaningless, so their results are not reused
        if !embedding.is_degraded() {
            self.store_cached(cache_key.as_deref(), &outcome).await;
        }

        Ok(outcome)
    }

    async fn run_strategy(
        &self,
        trace: SearchTrace,
        vector: &[f32],
        options: &RetrievalOptions,
    ) -> Result<RetrievalOutcome, DomainError> {
        let store = self.store.as_ref();

        Ok(match trace.strategy {
            RetrievalStrategy::Default => RetrievalOutcome::Default {
                results: flat_search(store, vector, options, options.limit, trace).await?,
            },
            RetrievalStrategy::Hierarchical => {
                let (documents, chunks) =
                    hierarchical_search(store, vector, options, options.limit, trace).await?;
                RetrievalOutcome::Hierarchical { documents, chunks }
            }
            RetrievalStrategy::Category => {
                let (categories, chunks) =
                    category_search(
                    store,
                    vector,
                    options,
                    &self.config.default_category,
                    trace,
                )
                .await?;
                RetrievalOutcome::Category { categories, chunks }
            }
            RetrievalStrategy::DocType => RetrievalOutcome::DocType {
                doc_types: doc_type_search(store, vector, options, trace).await?,
            },
            RetrievalStrategy::Combined => RetrievalOutcome::Combined {
                results: combined_search(store, vector, options, trace).await?,
            },
        })
    }

    async fn keyword_fallback(
        &self,
        text: &str,
        options: &RetrievalOptions,
        trace: SearchTrace,
    ) -> RetrievalOutcome {
        let results = keyword_search(
            self.documents.as_ref(),
            text,
            options,
            self.config.keyword_token_limit,
        )
        .await
        .unwrap_or_else(|e| {
            warn!(
                strategy = %trace.strategy,
                query_len = trace.query_len,
                collection = %options.collection,
                error = %e,
                "Keyword search failed, continuing without rules"
            );
            Vec::new()
        });

        RetrievalOutcome::KeywordFallback { results }
    }

    fn cache_key(&self, text: &str, options: &RetrievalOptions) -> Option<String> {
        if self.cache.is_none() {
            return None;
        }

        match CacheKeyParams::new(text).with_serialized("options", options) {
            Ok(params) => Some(
                self.key_generator
                    .generate_with_namespace(CACHE_NAMESPACE, &params),
            ),
            Err(e) => {
                warn!(error = %e, "Could not build retrieval cache key");
                None
            }
        }
    }

    async fn cached(&self, key: Option<&str>) -> Option<RetrievalOutcome> {
        let (cache, key) = (self.cache.as_ref()?, key?);

        match cache.get::<RetrievalOutcome>(key).await {
            Ok(hit) => hit,
            Err(e) => {
                warn!(error = %e, "Retrieval cache read failed");
                None
            }
        }
    }

    async fn store_cached(&self, key: Option<&str>, outcome: &RetrievalOutcome) {
        let (Some(cache), Some(key)) = (self.cache.as_ref(), key) else {
            return;
        };

        if let Err(e) = cache.set(key, outcome, self.config.cache_ttl_seconds).await {
            warn!(error = %e, "Retrieval cache write failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cache::MockCache;
    use crate::domain::embedding::MockEmbeddingProvider;
    use crate::domain::rule::RuleDocument;
    use crate::domain::search::{IndexHit, MockVectorIndex, SearchResult};
    use crate::domain::RetryConfig;
    use crate::infrastructure::retrieval::test_support::unit;
    use crate::infrastructure::vector_store::{
        FallbackVectorStore, IndexVectorStore, InMemoryDocumentStore, ScanVectorStore,
    };

    const QUERY: &str = "외래어 표기법";

    fn fixtures() -> Vec<RuleDocument> {
        vec![
            RuleDocument::new("loanword", "외래어는 외래어 표기법에 따라 적는다")
                .with_title("외래어 표기법")
                .with_category("spelling")
                .with_embedding(unit(0.82)),
            RuleDocument::new("spacing", "조사는 앞말에 붙여 쓴다")
                .with_title("조사 띄어쓰기")
                .with_category("spacing")
                .with_embedding(unit(0.55)),
        ]
    }

    fn retriever_with(provider: MockEmbeddingProvider, native: Option<MockVectorIndex>) -> RuleRetriever {
        let documents = Arc::new(InMemoryDocumentStore::new(fixtures()));
        let scan: Arc<dyn VectorStore> = Arc::new(ScanVectorStore::new(documents.clone()));
        let native = native.map(|index| {
            Arc::new(IndexVectorStore::new(Arc::new(index))) as Arc<dyn VectorStore>
        });
        let embedder = ResilientEmbedder::new(Arc::new(provider))
            .with_retry(RetryConfig::attempts(2, 0));

        RuleRetriever::new(
            embedder,
            Arc::new(FallbackVectorStore::new(native, scan)),
            documents,
        )
    }

    fn provider() -> MockEmbeddingProvider {
        MockEmbeddingProvider::new(2).with_vector(QUERY, unit(1.0))
    }

    fn results(outcome: &RetrievalOutcome) -> &[SearchResult] {
        match outcome {
            RetrievalOutcome::Default { results }
            | RetrievalOutcome::Combined { results }
            | RetrievalOutcome::KeywordFallback { results } => results,
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_min_score_keeps_only_relevant_rule() {
        let retriever = retriever_with(provider(), None);

        let outcome = retriever
            .find_relevant_rules(QUERY, &RetrievalOptions::default())
            .await
            .unwrap();

        let results = results(&outcome);
        assert_eq!(outcome.strategy_name(), "default");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id(), "loanword");
        assert!((results[0].score.unwrap() - 0.82).abs() < 1e-5);
    }

    #[tokio::test]
    async fn test_index_unavailable_degrades_to_scan() {
        let mut index = MockVectorIndex::new();
        index.expect_index_name().return_const("mock");
        index
            .expect_query()
            .returning(|_| Err(DomainError::index_unavailable("index missing")));
        let retriever = retriever_with(provider(), Some(index));

        let outcome = retriever
            .find_relevant_rules(QUERY, &RetrievalOptions::default().with_min_score(0.0))
            .await
            .unwrap();

        assert_eq!(results(&outcome)[0].id(), "loanword");
        assert_eq!(results(&outcome).len(), 2);
    }

    #[tokio::test]
    async fn test_native_index_results_are_used() {
        let mut index = MockVectorIndex::new();
        index.expect_index_name().return_const("mock");
        index.expect_query().returning(|_| {
            Ok(vec![IndexHit::new(RuleDocument::new("indexed", "x"), 0.9)])
        });
        let retriever = retriever_with(provider(), Some(index));

        let outcome = retriever
            .find_relevant_rules(QUERY, &RetrievalOptions::default())
            .await
            .unwrap();

        assert_eq!(results(&outcome)[0].id(), "indexed");
    }

    #[tokio::test]
    async fn test_embedding_failure_uses_keyword_search() {
        let retriever = {
            let documents = Arc::new(InMemoryDocumentStore::new(fixtures()));
            let embedder = ResilientEmbedder::new(Arc::new(
                MockEmbeddingProvider::new(2).with_error("provider down"),
            ))
            .with_retry(RetryConfig::attempts(2, 0))
            .with_fallback(false);
            RuleRetriever::new(
                embedder,
                Arc::new(ScanVectorStore::new(documents.clone())),
                documents,
            )
        };

        let outcome = retriever
            .find_relevant_rules(QUERY, &RetrievalOptions::default())
            .await
            .unwrap();

        assert!(outcome.is_keyword_fallback());
        let results = results(&outcome);
        assert_eq!(results[0].id(), "loanword");
        assert!(results[0].score.is_none());
    }

    #[tokio::test]
    async fn test_fallback_embedding_is_deterministic() {
        let retriever = retriever_with(MockEmbeddingProvider::new(2).with_error("down"), None);
        let options = RetrievalOptions::default().with_min_score(-1.0);

        let first = retriever.find_relevant_rules(QUERY, &options).await.unwrap();
        let second = retriever.find_relevant_rules(QUERY, &options).await.unwrap();

        assert!(!first.is_keyword_fallback());
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_invalid_options_propagate() {
        let retriever = retriever_with(provider(), None);

        let err = retriever
            .find_relevant_rules(QUERY, &RetrievalOptions::default().with_limit(0))
            .await
            .unwrap_err();

        assert!(err.is_caller_error());
    }

    #[tokio::test]
    async fn test_blank_query_returns_empty_outcome() {
        let retriever = retriever_with(provider(), None);

        let outcome = retriever
            .find_relevant_rules("   ", &RetrievalOptions::default())
            .await
            .unwrap();

        assert!(outcome.is_empty());
    }

    #[tokio::test]
    async fn test_explicit_strategy_shapes_outcome() {
        let retriever = retriever_with(provider(), None);
        let options = RetrievalOptions::default()
            .with_min_score(0.0)
            .with_strategy(RetrievalStrategy::Category);

        let outcome = retriever.find_relevant_rules(QUERY, &options).await.unwrap();

        let RetrievalOutcome::Category { categories, chunks } = outcome else {
            panic!("expected category outcome");
        };
        assert_eq!(categories.len(), 2);
        assert!(chunks.is_none());
    }

    #[tokio::test]
    async fn test_cache_serves_repeat_queries() {
        let provider = Arc::new(provider());
        let documents = Arc::new(InMemoryDocumentStore::new(fixtures()));
        let cache = Arc::new(MockCache::new());
        let retriever = RuleRetriever::new(
            ResilientEmbedder::new(provider.clone()),
            Arc::new(ScanVectorStore::new(documents.clone())),
            documents,
        )
        .with_cache(cache.clone());

        let options = RetrievalOptions::default();
        let first = retriever.find_relevant_rules(QUERY, &options).await.unwrap();
        let second = retriever.find_relevant_rules(QUERY, &options).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(provider.calls(), 1);
        assert_eq!(cache.size().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_degraded_results_are_not_cached() {
        let documents = Arc::new(InMemoryDocumentStore::new(fixtures()));
        let cache = Arc::new(MockCache::new());
        let retriever = RuleRetriever::new(
            ResilientEmbedder::new(Arc::new(MockEmbeddingProvider::new(2).with_error("down")))
                .with_retry(RetryConfig::attempts(1, 0)),
            Arc::new(ScanVectorStore::new(documents.clone())),
            documents,
        )
        .with_cache(cache.clone());

        retriever
            .find_relevant_rules(QUERY, &RetrievalOptions::default())
            .await
            .unwrap();

        assert_eq!(cache.size().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_cache_errors_do_not_fail_retrieval() {
        let documents = Arc::new(InMemoryDocumentStore::new(fixtures()));
        let retriever = RuleRetriever::new(
            ResilientEmbedder::new(Arc::new(provider())),
            Arc::new(ScanVectorStore::new(documents.clone())),
            documents,
        )
        .with_cache(Arc::new(MockCache::new().with_error("cache offline")));

        let outcome = retriever
            .find_relevant_rules(QUERY, &RetrievalOptions::default())
            .await
            .unwrap();

        assert_eq!(outcome.len(), 1);
    }
}
