//! Embedding provider trait definition

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

use crate::domain::DomainError;

/// Trait for embedding backends (OpenAI-compatible endpoints, local models, ...)
///
/// The engine treats the provider as a black box: text in, vector out.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync + Debug {
    /// Embed a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>, DomainError>;

    /// Embed several texts, preserving order
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, DomainError> {
        let mut vectors = Vec::with_capacity(texts.len());

        for text in texts {
            vectors.push(self.embed(text).await?);
        }

        Ok(vectors)
    }

    /// Get the provider name
    fn provider_name(&self) -> &'static str;

    /// Vector length produced by this provider, if known
    fn dimensions(&self) -> Option<usize>;
}

/// Where an embedding vector came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingSource {
    /// Returned by the embedding provider
    Provider,
    /// Deterministic pseudo-random vector produced after retries ran out
    Fallback,
}

/// An embedding together with its provenance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingOutcome {
    pub vector: Vec<f32>,
    pub source: EmbeddingSource,
}

impl EmbeddingOutcome {
    pub fn provider(vector: Vec<f32>) -> Self {
        Self {
            vector,
            source: EmbeddingSource::Provider,
        }
    }

    pub fn fallback(vector: Vec<f32>) -> Self {
        Self {
            vector,
            source: EmbeddingSource::Fallback,
        }
    }

    /// Whether this vector was produced in degraded mode
    pub fn is_degraded(&self) -> bool {
        self.source == EmbeddingSource::Fallback
    }
}
