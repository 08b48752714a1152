//! Prompt template parsing and rendering
//!
//! Supports variable syntax: `${var:variable-name:default-value}`
//! - `${var:name}` - Required variable, error if not provided
//! - `${var:name:default}` - Optional variable with default value
//!
//! The passage being corrected is bound to [`SOURCE_TEXT_VAR`].

use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

/// Variable receiving the source text
pub const SOURCE_TEXT_VAR: &str = "text";

/// Regex to match variable patterns: ${var:name} or ${var:name:default}
static VARIABLE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$\{var:([a-zA-Z0-9][-_a-zA-Z0-9]*)(?::([^}]*))?\}").unwrap()
});

/// Template processing errors
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TemplateError {
    #[error("Missing required variable: {name}")]
    MissingVariable { name: String },

    #[error("Template parsing error: {message}")]
    ParseError { message: String },
}

/// A parsed variable from a template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptVariable {
    pub name: String,
    pub default: Option<String>,
}

impl PromptVariable {
    /// Whether the variable must be supplied at render time
    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }
}

/// A parsed prompt template
#[derive(Debug, Clone, PartialEq)]
pub struct PromptTemplate {
    content: String,
    variables: Vec<PromptVariable>,
}

impl PromptTemplate {
    /// Parse a template string and extract variables
    ///
    /// A `${var:` opening that never closes is a parse error, since it
    /// would otherwise leak into the prompt verbatim.
    pub fn parse(content: impl Into<String>) -> Result<Self, TemplateError> {
        let content = content.into();
        let mut variables = Vec::new();
        let mut seen = HashSet::new();

        for cap in VARIABLE_PATTERN.captures_iter(&content) {
            let Some(name) = cap.get(1).map(|m| m.as_str().to_string()) else {
                continue;
            };

            if !seen.insert(name.clone()) {
                continue;
            }

            variables.push(PromptVariable {
                name,
                default: cap.get(2).map(|m| m.as_str().to_string()),
            });
        }

        let unmatched = VARIABLE_PATTERN.replace_all(&content, "");
        if let Some(pos) = unmatched.find("${var:") {
            return Err(TemplateError::ParseError {
                message: format!("Unterminated or invalid variable near offset {}", pos),
            });
        }

        Ok(Self { content, variables })
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn variables(&self) -> &[PromptVariable] {
        &self.variables
    }

    pub fn has_variable(&self, name: &str) -> bool {
        self.variables.iter().any(|v| v.name == name)
    }

    /// Render the template with provided values
    ///
    /// Substitution is single-pass, so values containing `${var:...}` are
    /// inserted literally.
    pub fn render(&self, values: &HashMap<String, String>) -> Result<String, TemplateError> {
        if let Some(missing) = self
            .variables
            .iter()
            .find(|v| v.is_required() && !values.contains_key(&v.name))
        {
            return Err(TemplateError::MissingVariable {
                name: missing.name.clone(),
            });
        }

        let rendered = VARIABLE_PATTERN.replace_all(&self.content, |cap: &regex::Captures<'_>| {
            let name = cap.get(1).map(|m| m.as_str()).unwrap_or_default();

            values
                .get(name)
                .cloned()
                .or_else(|| cap.get(2).map(|m| m.as_str().to_string()))
                .unwrap_or_default()
        });

        Ok(rendered.into_owned())
    }

    /// Render with the source text bound to [`SOURCE_TEXT_VAR`]
    pub fn render_source(
        &self,
        source_text: &str,
        extra: &HashMap<String, String>,
    ) -> Result<String, TemplateError> {
        let mut values = extra.clone();
        values.insert(SOURCE_TEXT_VAR.to_string(), source_text.to_string());
        self.render(&values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_parse_no_variables() {
        let template = PromptTemplate::parse("Correct the passage.").unwrap();
        assert!(template.variables().is_empty());
    }

    #[test]
    fn test_parse_required_and_default() {
        let template =
            PromptTemplate::parse("Language: ${var:language:Korean}\n\n${var:text}").unwrap();

        assert_eq!(template.variables().len(), 2);
        assert!(!template.variables()[0].is_required());
        assert_eq!(template.variables()[0].default.as_deref(), Some("Korean"));
        assert!(template.variables()[1].is_required());
        assert!(template.has_variable("text"));
    }

    #[test]
    fn test_parse_duplicate_variables() {
        let template = PromptTemplate::parse("${var:text} and ${var:text} again").unwrap();
        assert_eq!(template.variables().len(), 1);
    }

    #[test]
    fn test_parse_rejects_unterminated_variable() {
        let err = PromptTemplate::parse("Fix ${var:text").unwrap_err();
        assert!(matches!(err, TemplateError::ParseError { .. }));
    }

    #[test]
    fn test_render_missing_required_variable() {
        let template = PromptTemplate::parse("Fix: ${var:text}").unwrap();

        match template.render(&HashMap::new()) {
            Err(TemplateError::MissingVariable { name }) => assert_eq!(name, "text"),
            other => panic!("Expected MissingVariable error, got {:?}", other),
        }
    }

    #[test]
    fn test_render_defaults_and_overrides() {
        let template =
            PromptTemplate::parse("Tone: ${var:tone:formal}. Fix: ${var:text}").unwrap();

        let rendered = template.render(&values(&[("text", "본문")])).unwrap();
        assert_eq!(rendered, "Tone: formal. Fix: 본문");

        let rendered = template
            .render(&values(&[("text", "본문"), ("tone", "casual")]))
            .unwrap();
        assert_eq!(rendered, "Tone: casual. Fix: 본문");
    }

    #[test]
    fn test_render_is_single_pass() {
        let template = PromptTemplate::parse("${var:text} / ${var:tone:plain}").unwrap();

        let rendered = template
            .render(&values(&[("text", "${var:tone}")]))
            .unwrap();
        assert_eq!(rendered, "${var:tone} / plain");
    }

    #[test]
    fn test_render_source() {
        let template = PromptTemplate::parse("## Text\n${var:text}").unwrap();

        let rendered = template.render_source("띄어쓰기", &HashMap::new()).unwrap();
        assert_eq!(rendered, "## Text\n띄어쓰기");
    }
}
