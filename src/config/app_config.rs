use serde::Deserialize;

use crate::domain::{
    CompletionOptions, InsertionPoint, PromptLimits, RetrievalOptions, RetryConfig,
};
use crate::infrastructure::retrieval::RetrieverConfig;

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    pub embedding: EmbeddingConfig,
    pub retrieval: RetrievalConfig,
    pub prompt: PromptConfig,
    pub cache: CacheConfig,
    pub index: IndexConfig,
    pub completion: CompletionConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Embedding provider settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    /// Requested vector length; the model's native length when unset
    pub dimensions: Option<usize>,
    pub max_attempts: u32,
    pub retry_delay_ms: u64,
    pub fallback_enabled: bool,
    pub timeout_secs: u64,
}

/// Retrieval defaults and strategy thresholds
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub collection: String,
    pub limit: usize,
    pub min_score: f32,
    pub chunks_limit: usize,
    pub chunks_min_score: f32,
    pub category_overfetch: usize,
    pub hierarchical_threshold_chars: usize,
    pub combined_threshold_chars: usize,
    pub keyword_token_limit: usize,
    pub default_category: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    pub max_rules_chars: usize,
    pub max_prompt_chars: usize,
    pub insertion_point: InsertionPoint,
    pub instructions_marker: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    /// Lifetime of cached retrieval outcomes; 0 or less never expires
    pub ttl_seconds: i64,
    pub max_capacity: u64,
}

/// Native vector index; disabled while `database_url` is unset
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    pub database_url: Option<String>,
    pub table_name: String,
    pub ensure_schema: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CompletionConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub max_retries: u32,
    pub timeout_secs: u64,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".to_string(),
            api_key: None,
            model: "text-embedding-3-small".to_string(),
            dimensions: None,
            max_attempts: 3,
            retry_delay_ms: 1000,
            fallback_enabled: true,
            timeout_secs: 30,
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        let options = RetrievalOptions::default();
        let retriever = RetrieverConfig::default();

        Self {
            collection: options.collection,
            limit: options.limit,
            min_score: options.min_score,
            chunks_limit: options.chunks_limit,
            chunks_min_score: options.chunks_min_score,
            category_overfetch: options.category_overfetch,
            hierarchical_threshold_chars: retriever.hierarchical_threshold_chars,
            combined_threshold_chars: retriever.combined_threshold_chars,
            keyword_token_limit: retriever.keyword_token_limit,
            default_category: retriever.default_category,
        }
    }
}

impl Default for PromptConfig {
    fn default() -> Self {
        let limits = PromptLimits::default();

        Self {
            max_rules_chars: limits.max_rules_chars,
            max_prompt_chars: limits.max_prompt_chars,
            insertion_point: limits.insertion_point,
            instructions_marker: limits.instructions_marker,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_seconds: 300,
            max_capacity: 10_000,
        }
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            table_name: "rule_documents".to_string(),
            ensure_schema: false,
        }
    }
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".to_string(),
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            temperature: 0.2,
            max_tokens: None,
            max_retries: 2,
            timeout_secs: 60,
        }
    }
}

impl EmbeddingConfig {
    pub fn retry(&self) -> RetryConfig {
        RetryConfig::attempts(self.max_attempts, self.retry_delay_ms)
    }
}

impl RetrievalConfig {
    /// Default options for a retrieval call
    pub fn options(&self) -> RetrievalOptions {
        RetrievalOptions {
            collection: self.collection.clone(),
            limit: self.limit,
            min_score: self.min_score,
            chunks_limit: self.chunks_limit,
            chunks_min_score: self.chunks_min_score,
            category_overfetch: self.category_overfetch,
            ..RetrievalOptions::default()
        }
    }

    pub fn retriever(&self, cache: &CacheConfig) -> RetrieverConfig {
        RetrieverConfig {
            hierarchical_threshold_chars: self.hierarchical_threshold_chars,
            combined_threshold_chars: self.combined_threshold_chars,
            keyword_token_limit: self.keyword_token_limit,
            default_category: self.default_category.clone(),
            cache_ttl_seconds: cache.ttl_seconds,
        }
    }
}

impl PromptConfig {
    pub fn limits(&self) -> PromptLimits {
        PromptLimits {
            max_rules_chars: self.max_rules_chars,
            max_prompt_chars: self.max_prompt_chars,
            insertion_point: self.insertion_point,
            instructions_marker: self.instructions_marker.clone(),
        }
    }
}

impl CompletionConfig {
    pub fn options(&self) -> CompletionOptions {
        let options = CompletionOptions::default()
            .with_model(self.model.clone())
            .with_temperature(self.temperature);

        match self.max_tokens {
            Some(max_tokens) => options.with_max_tokens(max_tokens),
            None => options,
        }
    }

    pub fn retry(&self) -> RetryConfig {
        RetryConfig::new(self.max_retries)
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("RAG")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_domain_defaults() {
        let config = AppConfig::default();

        assert_eq!(config.retrieval.options(), RetrievalOptions::default());
        assert_eq!(config.prompt.limits(), PromptLimits::default());
        assert_eq!(config.embedding.retry().max_attempts(), 3);
        assert!(config.index.database_url.is_none());
    }

    #[test]
    fn test_partial_sections_deserialize() {
        let config: AppConfig = serde_json::from_value(serde_json::json!({
            "logging": {"format": "json"},
            "retrieval": {"limit": 8},
            "prompt": {"insertion_point": "beforeInstructions"}
        }))
        .unwrap();

        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.retrieval.options().limit, 8);
        assert_eq!(
            config.prompt.limits().insertion_point,
            InsertionPoint::BeforeInstructions
        );
    }

    #[test]
    fn test_retriever_config_takes_cache_ttl() {
        let config = AppConfig::default();
        let cache = CacheConfig {
            ttl_seconds: 42,
            ..CacheConfig::default()
        };

        assert_eq!(config.retrieval.retriever(&cache).cache_ttl_seconds, 42);
    }
}
