//! Application configuration

mod app_config;

pub use app_config::{
    AppConfig, CacheConfig, CompletionConfig, EmbeddingConfig, IndexConfig, LogFormat,
    LoggingConfig, PromptConfig, RetrievalConfig,
};
