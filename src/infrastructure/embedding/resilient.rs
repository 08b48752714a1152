//! Embedding with bounded retries and a deterministic fallback

use std::sync::Arc;

use tracing::{debug, warn};

use super::fallback::deterministic_fallback_vector;
use crate::domain::embedding::{EmbeddingOutcome, EmbeddingProvider};
use crate::domain::{DomainError, RetryConfig};

/// Vector length used for fallback vectors when the provider does not say
pub const DEFAULT_FALLBACK_DIMENSIONS: usize = 1536;

/// Progress of one embedding call
#[derive(Debug)]
enum EmbedState<T> {
    /// Calling the provider, 1-based attempt number
    Attempting(u32),
    /// Attempts exhausted with this last error
    Fallback(DomainError),
    Done(T),
}

/// Wraps an [`EmbeddingProvider`] with retry and degraded-mode fallback
///
/// Every attempt failure (including an empty vector) is retried with the
/// configured delay. When attempts run out the embedder either returns a
/// deterministic fallback vector tagged as such, or, with the fallback
/// disabled, a provider error.
#[derive(Debug, Clone)]
pub struct ResilientEmbedder {
    provider: Arc<dyn EmbeddingProvider>,
    retry: RetryConfig,
    fallback_enabled: bool,
    fallback_dimensions: usize,
}

impl ResilientEmbedder {
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        let fallback_dimensions = provider.dimensions().unwrap_or(DEFAULT_FALLBACK_DIMENSIONS);

        Self {
            provider,
            retry: RetryConfig::attempts(3, 1000),
            fallback_enabled: true,
            fallback_dimensions,
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_fallback(mut self, enabled: bool) -> Self {
        self.fallback_enabled = enabled;
        self
    }

    pub fn with_fallback_dimensions(mut self, dimensions: usize) -> Self {
        self.fallback_dimensions = dimensions;
        self
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.provider_name()
    }

    /// Embed one text
    ///
    /// Blank text is a validation error and is never sent to the provider.
    pub async fn embed(&self, text: &str) -> Result<EmbeddingOutcome, DomainError> {
        if text.trim().is_empty() {
            return Err(DomainError::validation("Cannot embed blank text"));
        }

        let max_attempts = self.retry.max_attempts();
        let mut state = EmbedState::Attempting(1);

        loop {
            state = match state {
                EmbedState::Attempting(attempt) => match self.provider.embed(text).await {
                    Ok(vector) if !vector.is_empty() => {
                        debug!(
                            provider = self.provider_name(),
                            attempt,
                            dimensions = vector.len(),
                            "Embedding generated"
                        );
                        EmbedState::Done(EmbeddingOutcome::provider(vector))
                    }
                    result => {
                        let error = result.err().unwrap_or_else(|| {
                            DomainError::provider(self.provider_name(), "Empty embedding vector")
                        });
                        self.next_after_failure(attempt, max_attempts, error).await
                    }
                },
                EmbedState::Fallback(error) => {
                    EmbedState::Done(self.fallback_for(text, max_attempts, &error)?)
                }
                EmbedState::Done(outcome) => return Ok(outcome),
            };
        }
    }

    /// Embed several texts, preserving order
    ///
    /// The batch call is retried as a whole. If it never succeeds every item
    /// falls back on its own; items the provider answered with an empty
    /// vector are re-embedded individually.
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<EmbeddingOutcome>, DomainError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        if texts.iter().any(|t| t.trim().is_empty()) {
            return Err(DomainError::validation("Cannot embed blank text"));
        }

        let max_attempts = self.retry.max_attempts();
        let mut state = EmbedState::Attempting(1);

        loop {
            state = match state {
                EmbedState::Attempting(attempt) => match self.provider.embed_batch(texts).await {
                    Ok(vectors) if vectors.len() == texts.len() => EmbedState::Done(vectors),
                    result => {
                        let error = match result {
                            Err(e) => e,
                            Ok(vectors) => DomainError::provider(
                                self.provider_name(),
                                format!("Expected {} embeddings, got {}", texts.len(), vectors.len()),
                            ),
                        };
                        self.next_after_failure(attempt, max_attempts, error).await
                    }
                },
                EmbedState::Fallback(error) => {
                    let mut outcomes = Vec::with_capacity(texts.len());
                    for text in texts {
                        outcomes.push(self.fallback_for(text, max_attempts, &error)?);
                    }
                    return Ok(outcomes);
                }
                EmbedState::Done(vectors) => {
                    let mut outcomes = Vec::with_capacity(texts.len());
                    for (text, vector) in texts.iter().zip(vectors) {
                        if vector.is_empty() {
                            outcomes.push(self.embed(text).await?);
                        } else {
                            outcomes.push(EmbeddingOutcome::provider(vector));
                        }
                    }
                    return Ok(outcomes);
                }
            };
        }
    }

    async fn next_after_failure<T>(
        &self,
        attempt: u32,
        max_attempts: u32,
        error: DomainError,
    ) -> EmbedState<T> {
        warn!(
            provider = self.provider_name(),
            attempt,
            max_attempts,
            error = %error,
            "Embedding attempt failed"
        );

        if attempt >= max_attempts {
            return EmbedState::Fallback(error);
        }

        tokio::time::sleep(self.retry.delay_for_attempt(attempt - 1)).await;
        EmbedState::Attempting(attempt + 1)
    }

    fn fallback_for(
        &self,
        text: &str,
        max_attempts: u32,
        error: &DomainError,
    ) -> Result<EmbeddingOutcome, DomainError> {
        if !self.fallback_enabled {
            return Err(DomainError::provider(
                self.provider_name(),
                format!("Embedding failed after {} attempts: {}", max_attempts, error),
            ));
        }

        warn!(
            provider = self.provider_name(),
            query_len = text.chars().count(),
            dimensions = self.fallback_dimensions,
            error = %error,
            "Embedding provider unavailable, using deterministic fallback vector"
        );

        Ok(EmbeddingOutcome::fallback(deterministic_fallback_vector(
            text,
            self.fallback_dimensions,
        )))
    }
}
