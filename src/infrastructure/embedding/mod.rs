//! Embedding provider implementations

mod fallback;
mod openai;
mod resilient;

pub use fallback::deterministic_fallback_vector;
pub use openai::{OpenAiEmbeddingProvider, DEFAULT_EMBEDDING_MODEL};
pub use resilient::{ResilientEmbedder, DEFAULT_FALLBACK_DIMENSIONS};
