//! Prompt service - rule-augmented prompt construction

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::domain::prompt::{assemble, enhance_bounded, AssembledPrompt, PromptContext};
use crate::domain::{DomainError, PromptLimits, PromptTemplate, RetrievalOptions, RetrievalOutcome};
use crate::infrastructure::retrieval::RuleRetriever;

/// Default template used when the caller does not supply one
pub const DEFAULT_CORRECTION_TEMPLATE: &str = "\
You are a professional Korean copy editor. Correct spelling, spacing, grammar \
and punctuation in the text below while keeping its meaning and tone.

## Instructions
Return only the corrected text, without explanations.

## Text
${var:text}";

/// An assembled prompt together with the rules that went into it
#[derive(Debug, Clone)]
pub struct EnhancedPrompt {
    pub prompt: AssembledPrompt,
    pub outcome: RetrievalOutcome,
}

/// Builds prompts augmented with retrieved reference rules
#[derive(Debug, Clone)]
pub struct PromptEnhancer {
    retriever: Arc<RuleRetriever>,
    limits: PromptLimits,
}

impl PromptEnhancer {
    pub fn new(retriever: Arc<RuleRetriever>, limits: PromptLimits) -> Result<Self, DomainError> {
        limits.validate()?;
        Ok(Self { retriever, limits })
    }

    pub fn limits(&self) -> &PromptLimits {
        &self.limits
    }

    /// Splice rules relevant to `query_text` into an already rendered prompt
    ///
    /// The base prompt is kept whole; only the rules block shrinks to fit
    /// the ceiling.
    pub async fn enhance_prompt(
        &self,
        base_prompt: &str,
        query_text: &str,
        options: &RetrievalOptions,
    ) -> Result<String, DomainError> {
        let outcome = self.retriever.find_relevant_rules(query_text, options).await?;
        let results = outcome.flatten();

        let assembled = enhance_bounded(base_prompt, &results, &self.limits);
        self.log_assembly(&outcome, &assembled);

        Ok(assembled.text)
    }

    /// Render `template` for `query_text` with relevant rules spliced in
    pub async fn build_prompt(
        &self,
        template: &PromptTemplate,
        query_text: &str,
        options: &RetrievalOptions,
    ) -> Result<String, DomainError> {
        Ok(self
            .build_prompt_with_variables(template, query_text, options, &HashMap::new())
            .await?
            .prompt
            .text)
    }

    /// Like [`build_prompt`](Self::build_prompt), with extra template variables,
    /// returning the assembly details and the retrieval outcome
    pub async fn build_prompt_with_variables(
        &self,
        template: &PromptTemplate,
        query_text: &str,
        options: &RetrievalOptions,
        variables: &HashMap<String, String>,
    ) -> Result<EnhancedPrompt, DomainError> {
        let outcome = self.retriever.find_relevant_rules(query_text, options).await?;
        let results = outcome.flatten();

        let mut context = PromptContext::new(template, query_text, &results);
        context.variables = variables.clone();

        let prompt = assemble(&context, &self.limits)?;
        self.log_assembly(&outcome, &prompt);

        Ok(EnhancedPrompt { prompt, outcome })
    }

    fn log_assembly(&self, outcome: &RetrievalOutcome, prompt: &AssembledPrompt) {
        if prompt.source_truncated || prompt.reduced_rules_budget.is_some() {
            warn!(
                strategy = outcome.strategy_name(),
                prompt_len = prompt.char_len(),
                max_prompt_chars = self.limits.max_prompt_chars,
                source_truncated = prompt.source_truncated,
                reduced_rules_budget = ?prompt.reduced_rules_budget,
                "Prompt exceeded ceiling and was shortened"
            );
        } else {
            debug!(
                strategy = outcome.strategy_name(),
                rules = outcome.len(),
                prompt_len = prompt.char_len(),
                "Prompt assembled"
            );
        }
    }
}
