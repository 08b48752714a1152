//! Wiring of the retrieval pipeline from configuration

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::domain::{
    DocumentStore, EmbeddingProvider, PromptTemplate, RetrievalOptions, VectorStore,
};
use crate::infrastructure::cache::{InMemoryCache, InMemoryCacheConfig};
use crate::infrastructure::embedding::{
    OpenAiEmbeddingProvider, ResilientEmbedder, DEFAULT_FALLBACK_DIMENSIONS,
};
use crate::infrastructure::http_client::HttpClient;
use crate::infrastructure::retrieval::RuleRetriever;
use crate::infrastructure::services::DEFAULT_CORRECTION_TEMPLATE;
use crate::infrastructure::vector_store::{
    FallbackVectorStore, InMemoryDocumentStore, IndexVectorStore, PgVectorConfig,
    PgVectorRuleIndex, ScanVectorStore,
};

use super::InputArgs;

/// Load the rules file into an in-memory document store
pub(crate) async fn load_rules(path: &Path) -> anyhow::Result<InMemoryDocumentStore> {
    let json = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read rules file {}", path.display()))?;

    let store = InMemoryDocumentStore::from_json(&json)
        .with_context(|| format!("Invalid rules file {}", path.display()))?;

    info!(path = %path.display(), documents = store.len().await, "Rules loaded");
    Ok(store)
}

/// Load a template file, or the built-in correction template
pub(crate) async fn load_template(path: Option<&Path>) -> anyhow::Result<PromptTemplate> {
    let content = match path {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read template {}", path.display()))?,
        None => DEFAULT_CORRECTION_TEMPLATE.to_string(),
    };

    Ok(PromptTemplate::parse(content)?)
}

/// Configured retrieval options with the command line overrides applied
pub(crate) fn retrieval_options(config: &AppConfig, input: &InputArgs) -> RetrievalOptions {
    let options = config.retrieval.options();

    match &input.collection {
        Some(collection) => options.with_collection(collection.clone()),
        None => options,
    }
}

/// Resilient embedder over the configured provider, and its vector length
fn embedder(config: &AppConfig) -> anyhow::Result<(ResilientEmbedder, usize)> {
    let settings = &config.embedding;
    let client = HttpClient::with_timeout(Duration::from_secs(settings.timeout_secs))?;

    let mut provider = OpenAiEmbeddingProvider::with_base_url(
        client,
        settings.api_key.clone().unwrap_or_default(),
        settings.base_url.clone(),
    )
    .with_model(settings.model.clone());
    if let Some(dimensions) = settings.dimensions {
        provider = provider.with_dimensions(dimensions);
    }

    let dimensions = provider.dimensions().unwrap_or(DEFAULT_FALLBACK_DIMENSIONS);
    let embedder = ResilientEmbedder::new(Arc::new(provider))
        .with_retry(settings.retry())
        .with_fallback(settings.fallback_enabled);

    Ok((embedder, dimensions))
}

/// Connect the pgvector index when one is configured
///
/// An unreachable database leaves the scan store as the only backend.
async fn native_store(config: &AppConfig, dimensions: usize) -> Option<Arc<dyn VectorStore>> {
    let url = config.index.database_url.as_deref()?;
    let pg_config = PgVectorConfig::new(dimensions).with_table_name(config.index.table_name.clone());

    let index = match PgVectorRuleIndex::connect(url, pg_config).await {
        Ok(index) => index,
        Err(e) => {
            warn!(error = %e, "Native index unavailable, using in-memory search only");
            return None;
        }
    };

    if config.index.ensure_schema {
        if let Err(e) = index.ensure_schema().await {
            warn!(error = %e, "Failed to prepare native index schema");
            return None;
        }
    }

    info!(table = %config.index.table_name, "Native index connected");
    Some(Arc::new(IndexVectorStore::new(Arc::new(index))))
}

/// Build the rule retriever over the given rules
pub(crate) async fn build_retriever(
    config: &AppConfig,
    rules: InMemoryDocumentStore,
) -> anyhow::Result<RuleRetriever> {
    let (embedder, dimensions) = embedder(config)?;

    let documents: Arc<dyn DocumentStore> = Arc::new(rules);
    let scan: Arc<dyn VectorStore> = Arc::new(ScanVectorStore::new(documents.clone()));
    let store = FallbackVectorStore::new(native_store(config, dimensions).await, scan);

    let mut retriever = RuleRetriever::new(embedder, Arc::new(store), documents)
        .with_config(config.retrieval.retriever(&config.cache));

    if config.cache.enabled {
        let cache_config = InMemoryCacheConfig::default().with_max_capacity(config.cache.max_capacity);
        retriever = retriever.with_cache(Arc::new(InMemoryCache::with_config(cache_config)));
    }

    Ok(retriever)
}
