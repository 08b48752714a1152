//! Prompt assembly under a hard length ceiling

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::formatter::format_results;
use super::splice::{splice, truncate_graphemes, InsertionPoint, DEFAULT_INSTRUCTIONS_MARKER};
use super::template::PromptTemplate;
use crate::domain::search::SearchResult;
use crate::domain::DomainError;

// Upper bound on the separator chars `splice` can add around a block
const SPLICE_OVERHEAD: usize = 4;

/// Size limits and placement for prompt assembly
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptLimits {
    /// Budget for the rendered rules block
    pub max_rules_chars: usize,
    /// Hard ceiling for the whole prompt
    pub max_prompt_chars: usize,
    pub insertion_point: InsertionPoint,
    pub instructions_marker: String,
}

impl Default for PromptLimits {
    fn default() -> Self {
        Self {
            max_rules_chars: 4_000,
            max_prompt_chars: 12_000,
            insertion_point: InsertionPoint::End,
            instructions_marker: DEFAULT_INSTRUCTIONS_MARKER.to_string(),
        }
    }
}

impl PromptLimits {
    pub fn with_insertion_point(mut self, point: InsertionPoint) -> Self {
        self.insertion_point = point;
        self
    }

    pub fn with_max_rules_chars(mut self, max: usize) -> Self {
        self.max_rules_chars = max;
        self
    }

    pub fn with_max_prompt_chars(mut self, max: usize) -> Self {
        self.max_prompt_chars = max;
        self
    }

    pub fn with_instructions_marker(mut self, marker: impl Into<String>) -> Self {
        self.instructions_marker = marker.into();
        self
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.max_prompt_chars == 0 {
            return Err(DomainError::configuration(
                "max_prompt_chars must be greater than 0",
            ));
        }
        Ok(())
    }
}

/// Inputs of one prompt assembly
#[derive(Debug, Clone)]
pub struct PromptContext<'a> {
    pub template: &'a PromptTemplate,
    pub source_text: &'a str,
    pub results: &'a [SearchResult],
    /// Additional template values
    pub variables: HashMap<String, String>,
}

impl<'a> PromptContext<'a> {
    pub fn new(template: &'a PromptTemplate, source_text: &'a str, results: &'a [SearchResult]) -> Self {
        Self {
            template,
            source_text,
            results,
            variables: HashMap::new(),
        }
    }

    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }
}

/// An assembled prompt and how it was fitted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledPrompt {
    pub text: String,
    /// The source text was shortened to fit the ceiling
    pub source_truncated: bool,
    /// The rules block was re-rendered with this smaller budget
    pub reduced_rules_budget: Option<usize>,
}

impl AssembledPrompt {
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Splice formatted rules into an already rendered prompt
pub fn enhance(base_prompt: &str, results: &[SearchResult], limits: &PromptLimits) -> String {
    let block = format_results(results, limits.max_rules_chars);
    splice(
        base_prompt,
        &block,
        limits.insertion_point,
        &limits.instructions_marker,
    )
}

/// Render the template, splice the rules and enforce the ceiling
///
/// Over the ceiling, the source text is shortened first. If the prompt
/// still does not fit, the rules block is re-rendered into whatever room
/// the template and source leave. Only the template's own fixed text can
/// keep the result above the ceiling.
pub fn assemble(
    context: &PromptContext<'_>,
    limits: &PromptLimits,
) -> Result<AssembledPrompt, DomainError> {
    let ceiling = limits.max_prompt_chars;
    let render = |source: &str| context.template.render_source(source, &context.variables);

    let base = render(context.source_text)?;
    let prompt = enhance(&base, context.results, limits);

    if char_len(&prompt) <= ceiling {
        return Ok(AssembledPrompt {
            text: prompt,
            source_truncated: false,
            reduced_rules_budget: None,
        });
    }

    // The source may appear any number of times in the template
    let source_len = char_len(context.source_text);
    let fixed_len = char_len(&render("")?);
    let occurrences = if source_len == 0 {
        0
    } else {
        char_len(&base).saturating_sub(fixed_len) / source_len
    };

    let mut base = base;
    let mut source_truncated = false;

    if occurrences > 0 {
        let overflow = char_len(&prompt) - ceiling;
        let per_occurrence = overflow.div_ceil(occurrences);
        let target = source_len.saturating_sub(per_occurrence);

        base = render(&truncate_graphemes(context.source_text, target))?;
        source_truncated = true;

        let prompt = enhance(&base, context.results, limits);
        if char_len(&prompt) <= ceiling {
            return Ok(AssembledPrompt {
                text: prompt,
                source_truncated,
                reduced_rules_budget: None,
            });
        }
    }

    let reduced = enhance_bounded(&base, context.results, limits);

    Ok(AssembledPrompt {
        source_truncated,
        ..reduced
    })
}

/// Splice rules into a rendered prompt, shrinking the block to the ceiling
///
/// The base prompt is never cut; when it alone exceeds the ceiling the
/// rules block is dropped entirely.
pub fn enhance_bounded(
    base_prompt: &str,
    results: &[SearchResult],
    limits: &PromptLimits,
) -> AssembledPrompt {
    let prompt = enhance(base_prompt, results, limits);

    if char_len(&prompt) <= limits.max_prompt_chars {
        return AssembledPrompt {
            text: prompt,
            source_truncated: false,
            reduced_rules_budget: None,
        };
    }

    let budget = limits
        .max_prompt_chars
        .saturating_sub(char_len(base_prompt) + SPLICE_OVERHEAD);
    let block = format_results(results, budget.min(limits.max_rules_chars));
    let text = splice(
        base_prompt,
        &block,
        limits.insertion_point,
        &limits.instructions_marker,
    );

    AssembledPrompt {
        text,
        source_truncated: false,
        reduced_rules_budget: Some(budget),
    }
}
