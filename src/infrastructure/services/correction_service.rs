//! Correction service - augmented prompt in, corrected text out

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use super::prompt_service::PromptEnhancer;
use crate::domain::{
    CompletionOptions, CompletionProvider, DomainError, PromptTemplate, RetrievalOptions,
    RetryConfig,
};

/// Result of one correction call
#[derive(Debug, Clone, Serialize)]
pub struct CorrectionResult {
    /// Text returned by the completion provider
    pub corrected_text: String,
    /// Prompt sent to the provider
    pub prompt: String,
    /// Strategy that produced the reference rules
    pub strategy: String,
    /// Number of reference rules retrieved
    pub rules_used: usize,
    /// Whether the rules came from keyword search
    pub keyword_fallback: bool,
    /// Whether the source text was shortened to fit the prompt ceiling
    pub source_truncated: bool,
    /// Completion attempts made
    pub attempts: u32,
}

/// Corrects text with a completion provider and retrieved reference rules
#[derive(Debug, Clone)]
pub struct CorrectionService {
    enhancer: PromptEnhancer,
    completion: Arc<dyn CompletionProvider>,
    completion_options: CompletionOptions,
    retry: RetryConfig,
}

impl CorrectionService {
    pub fn new(enhancer: PromptEnhancer, completion: Arc<dyn CompletionProvider>) -> Self {
        Self {
            enhancer,
            completion,
            completion_options: CompletionOptions::default(),
            retry: RetryConfig::default(),
        }
    }

    pub fn with_completion_options(mut self, options: CompletionOptions) -> Self {
        self.completion_options = options;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Build the augmented prompt for `text` and complete it
    ///
    /// Completion failures are retried with backoff. When retries run out
    /// the last failure is returned as a provider error.
    pub async fn correct(
        &self,
        text: &str,
        template: &PromptTemplate,
        options: &RetrievalOptions,
    ) -> Result<CorrectionResult, DomainError> {
        if text.trim().is_empty() {
            return Err(DomainError::validation("Text to correct must not be blank"));
        }

        let enhanced = self
            .enhancer
            .build_prompt_with_variables(template, text, options, &Default::default())
            .await?;
        let prompt = enhanced.prompt.text;

        let (corrected_text, attempts) = self.complete_with_retry(&prompt).await?;

        info!(
            provider = self.completion.provider_name(),
            strategy = enhanced.outcome.strategy_name(),
            rules = enhanced.outcome.len(),
            attempts,
            "Text corrected"
        );

        Ok(CorrectionResult {
            corrected_text: corrected_text.trim().to_string(),
            prompt,
            strategy: enhanced.outcome.strategy_name().to_string(),
            rules_used: enhanced.outcome.len(),
            keyword_fallback: enhanced.outcome.is_keyword_fallback(),
            source_truncated: enhanced.prompt.source_truncated,
            attempts,
        })
    }

    async fn complete_with_retry(&self, prompt: &str) -> Result<(String, u32), DomainError> {
        let max_attempts = self.retry.max_attempts();
        let mut attempt = 1;

        loop {
            match self.completion.complete(prompt, &self.completion_options).await {
                Ok(text) => return Ok((text, attempt)),
                Err(e) if attempt >= max_attempts => {
                    return Err(DomainError::provider(
                        self.completion.provider_name(),
                        format!("Completion failed after {} attempts: {}", attempt, e),
                    ));
                }
                Err(e) => {
                    let delay = self.retry.delay_for_attempt(attempt - 1);
                    warn!(
                        provider = self.completion.provider_name(),
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Completion attempt failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::completion::MockCompletionProvider;
    use crate::domain::embedding::MockEmbeddingProvider;
    use crate::domain::{PromptLimits, RuleDocument};
    use crate::infrastructure::embedding::ResilientEmbedder;
    use crate::infrastructure::retrieval::RuleRetriever;
    use crate::infrastructure::services::DEFAULT_CORRECTION_TEMPLATE;
    use crate::infrastructure::vector_store::{InMemoryDocumentStore, ScanVectorStore};

    const TEXT: &str = "나는 어제 까페에 갔다";

    fn service(completion: MockCompletionProvider) -> (CorrectionService, Arc<MockCompletionProvider>) {
        let documents = Arc::new(InMemoryDocumentStore::new(vec![
            RuleDocument::new("loanword", "외래어는 외래어 표기법에 따라 적는다")
                .with_title("외래어 표기법")
                .with_example("까페 → 카페")
                .with_embedding(vec![1.0, 0.0]),
        ]));
        let embedder = ResilientEmbedder::new(Arc::new(
            MockEmbeddingProvider::new(2).with_vector(TEXT, vec![1.0, 0.0]),
        ));
        let retriever = RuleRetriever::new(
            embedder,
            Arc::new(ScanVectorStore::new(documents.clone())),
            documents,
        );
        let enhancer = PromptEnhancer::new(Arc::new(retriever), PromptLimits::default()).unwrap();
        let completion = Arc::new(completion);

        let service = CorrectionService::new(enhancer, completion.clone())
            .with_retry(RetryConfig::fixed(2, 0));
        (service, completion)
    }

    fn template() -> PromptTemplate {
        PromptTemplate::parse(DEFAULT_CORRECTION_TEMPLATE).unwrap()
    }

    #[tokio::test]
    async fn test_correct_sends_augmented_prompt() {
        let (service, completion) = service(MockCompletionProvider::new(" 나는 어제 카페에 갔다\n"));

        let result = service
            .correct(TEXT, &template(), &RetrievalOptions::default())
            .await
            .unwrap();

        assert_eq!(result.corrected_text, "나는 어제 카페에 갔다");
        assert_eq!(result.rules_used, 1);
        assert_eq!(result.strategy, "default");
        assert_eq!(result.attempts, 1);

        let prompts = completion.prompts();
        assert!(prompts[0].contains("까페 → 카페"));
        assert!(prompts[0].contains(TEXT));
    }

    #[tokio::test]
    async fn test_retries_transient_failures() {
        let (service, completion) =
            service(MockCompletionProvider::new("카페").failing_times(2));

        let result = service
            .correct(TEXT, &template(), &RetrievalOptions::default())
            .await
            .unwrap();

        assert_eq!(result.attempts, 3);
        assert_eq!(completion.calls(), 3);
    }

    #[tokio::test]
    async fn test_exhaustion_is_provider_error() {
        let (service, completion) = service(MockCompletionProvider::new("").with_error("down"));

        let err = service
            .correct(TEXT, &template(), &RetrievalOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::Provider { .. }));
        assert_eq!(completion.calls(), 3);
    }

    #[tokio::test]
    async fn test_blank_text_is_rejected() {
        let (service, completion) = service(MockCompletionProvider::new("x"));

        let err = service
            .correct("  ", &template(), &RetrievalOptions::default())
            .await
            .unwrap_err();

        assert!(err.is_caller_error());
        assert_eq!(completion.calls(), 0);
    }
}
