//! Rule document entity

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// Collection used when a document does not name one
pub const DEFAULT_COLLECTION: &str = "rules";

/// Importance of a rule on a single 1..=5 scale, higher is more important
///
/// | level | meaning                        |
/// |-------|--------------------------------|
/// | 5     | critical, always apply         |
/// | 4     | high                           |
/// | 3     | normal                         |
/// | 2     | low                            |
/// | 1     | informational                  |
///
/// Legacy `P1`..`P5` labels are accepted on input, with `P1` being the most
/// urgent (maps to 5) and `P5` the least (maps to 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "PriorityInput", into = "u8")]
pub struct RulePriority(u8);

impl RulePriority {
    pub const INFORMATIONAL: Self = Self(1);
    pub const LOW: Self = Self(2);
    pub const NORMAL: Self = Self(3);
    pub const HIGH: Self = Self(4);
    pub const CRITICAL: Self = Self(5);

    pub const MIN_LEVEL: u8 = 1;
    pub const MAX_LEVEL: u8 = 5;

    /// Create a priority from an integer level
    pub fn new(level: i64) -> Result<Self, DomainError> {
        if (Self::MIN_LEVEL as i64..=Self::MAX_LEVEL as i64).contains(&level) {
            Ok(Self(level as u8))
        } else {
            Err(DomainError::validation(format!(
                "Priority must be between {} and {}, got {}",
                Self::MIN_LEVEL,
                Self::MAX_LEVEL,
                level
            )))
        }
    }

    /// Parse a legacy `P1`..`P5` label or a plain numeric string
    pub fn from_label(label: &str) -> Result<Self, DomainError> {
        let trimmed = label.trim();

        if let Some(rest) = trimmed.strip_prefix(['P', 'p']) {
            let rank: i64 = rest
                .parse()
                .map_err(|_| DomainError::validation(format!("Invalid priority label: {}", label)))?;
            let level = Self::new(rank)?;

            return Ok(Self(Self::MAX_LEVEL + Self::MIN_LEVEL - level.0));
        }

        let level: i64 = trimmed
            .parse()
            .map_err(|_| DomainError::validation(format!("Invalid priority label: {}", label)))?;

        Self::new(level)
    }

    /// Get the numeric level
    pub fn level(&self) -> u8 {
        self.0
    }

    /// Human readable name for the level
    pub fn name(&self) -> &'static str {
        match self.0 {
            5 => "critical",
            4 => "high",
            3 => "normal",
            2 => "low",
            _ => "informational",
        }
    }
}

impl Default for RulePriority {
    fn default() -> Self {
        Self::NORMAL
    }
}

impl fmt::Display for RulePriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.0, self.name())
    }
}

impl From<RulePriority> for u8 {
    fn from(priority: RulePriority) -> Self {
        priority.0
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PriorityInput {
    Level(i64),
    Label(String),
}

impl TryFrom<PriorityInput> for RulePriority {
    type Error = DomainError;

    fn try_from(input: PriorityInput) -> Result<Self, Self::Error> {
        match input {
            PriorityInput::Level(level) => Self::new(level),
            PriorityInput::Label(label) => Self::from_label(&label),
        }
    }
}

fn default_collection() -> String {
    DEFAULT_COLLECTION.to_string()
}

fn default_active() -> bool {
    true
}

/// A reference rule (style-guide entry or linguistic knowledge rule)
///
/// Rule documents are owned by the content-management side; the engine only
/// reads them and their vectors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleDocument {
    /// Unique identifier (may be empty for projections without identity)
    #[serde(default)]
    pub id: String,
    /// Collection this document belongs to
    #[serde(default = "default_collection")]
    pub collection: String,
    /// Short title of the rule
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Category used for bucketed retrieval
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Main body text
    #[serde(default)]
    pub content: String,
    /// Normative rule statement (knowledge-rule shaped documents)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule: Option<String>,
    /// Explanation of the rule
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    /// Usage examples
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<String>,
    /// Free-form tags
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub tags: BTreeSet<String>,
    /// Importance of the rule
    #[serde(default)]
    pub priority: RulePriority,
    /// Document type (style guide, spelling rule, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_type: Option<String>,
    /// Additional metadata
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,
    /// Stored embedding vector
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    /// Inactive documents are never returned by searches
    #[serde(default = "default_active")]
    pub is_active: bool,
    /// Whether this document is a chunk of a parent rule
    #[serde(default)]
    pub is_chunk: bool,
    /// Parent rule id for chunks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

impl RuleDocument {
    /// Create a new active, top-level document
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            collection: default_collection(),
            title: None,
            category: None,
            content: content.into(),
            rule: None,
            explanation: None,
            examples: Vec::new(),
            tags: BTreeSet::new(),
            priority: RulePriority::default(),
            doc_type: None,
            metadata: HashMap::new(),
            embedding: None,
            is_active: true,
            is_chunk: false,
            parent_id: None,
        }
    }

    pub fn in_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_rule(mut self, rule: impl Into<String>) -> Self {
        self.rule = Some(rule.into());
        self
    }

    pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = Some(explanation.into());
        self
    }

    pub fn with_example(mut self, example: impl Into<String>) -> Self {
        self.examples.push(example.into());
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    pub fn with_priority(mut self, priority: RulePriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_doc_type(mut self, doc_type: impl Into<String>) -> Self {
        self.doc_type = Some(doc_type.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    /// Mark this document as a chunk of `parent_id`
    pub fn as_chunk_of(mut self, parent_id: impl Into<String>) -> Self {
        self.is_chunk = true;
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    /// Check structural invariants of the document
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.is_chunk && self.parent_id.as_deref().is_none_or(str::is_empty) {
            return Err(DomainError::validation(format!(
                "Chunk '{}' must reference a parent",
                self.id
            )));
        }

        if self.embedding.as_ref().is_some_and(Vec::is_empty) {
            return Err(DomainError::malformed_document(
                &self.id,
                "embedding vector is empty",
            ));
        }

        Ok(())
    }

    /// Heading used when rendering the rule (title, then rule statement)
    pub fn heading(&self) -> Option<&str> {
        self.title.as_deref().or(self.rule.as_deref())
    }

    /// Identity used for deduplication: the id, else a natural key
    pub fn identity_key(&self) -> String {
        if !self.id.is_empty() {
            return self.id.clone();
        }

        format!(
            "{}|{}|{}",
            self.collection,
            self.heading().unwrap_or(&self.content),
            self.category.as_deref().unwrap_or_default()
        )
    }

    /// Copy of the document without its embedding vector
    pub fn projection(&self) -> Self {
        Self {
            embedding: None,
            ..self.clone()
        }
    }

    /// Resolve a field by name for filter evaluation
    ///
    /// Known document fields take precedence; other keys are looked up in
    /// `metadata`.
    pub fn field_value(&self, key: &str) -> Option<serde_json::Value> {
        use serde_json::Value;

        match key {
            "id" => Some(Value::String(self.id.clone())),
            "collection" => Some(Value::String(self.collection.clone())),
            "title" => self.title.clone().map(Value::String),
            "category" => self.category.clone().map(Value::String),
            "content" => Some(Value::String(self.content.clone())),
            "rule" => self.rule.clone().map(Value::String),
            "explanation" => self.explanation.clone().map(Value::String),
            "examples" => Some(Value::Array(
                self.examples.iter().cloned().map(Value::String).collect(),
            )),
            "tags" => Some(Value::Array(
                self.tags.iter().cloned().map(Value::String).collect(),
            )),
            "priority" => Some(Value::from(self.priority.level())),
            "doc_type" => self.doc_type.clone().map(Value::String),
            "is_active" => Some(Value::Bool(self.is_active)),
            "is_chunk" => Some(Value::Bool(self.is_chunk)),
            "parent_id" => self.parent_id.clone().map(Value::String),
            "embedding" => self.embedding.as_ref().map(|v| Value::from(v.clone())),
            other => self.metadata.get(other).cloned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_range() {
        assert!(RulePriority::new(1).is_ok());
        assert!(RulePriority::new(5).is_ok());
        assert!(RulePriority::new(0).is_err());
        assert!(RulePriority::new(6).is_err());
    }

    #[test]
    fn test_priority_labels_invert() {
        assert_eq!(RulePriority::from_label("P1").unwrap(), RulePriority::CRITICAL);
        assert_eq!(RulePriority::from_label("p5").unwrap(), RulePriority::INFORMATIONAL);
        assert_eq!(RulePriority::from_label("4").unwrap(), RulePriority::HIGH);
        assert!(RulePriority::from_label("P9").is_err());
        assert!(RulePriority::from_label("urgent").is_err());
    }

    #[test]
    fn test_deserialize_priority_forms() {
        let doc: RuleDocument =
            serde_json::from_value(serde_json::json!({"id": "a", "priority": "P2"})).unwrap();
        assert_eq!(doc.priority.level(), 4);

        let doc: RuleDocument =
            serde_json::from_value(serde_json::json!({"id": "b", "priority": 2})).unwrap();
        assert_eq!(doc.priority, RulePriority::LOW);

        let bad = serde_json::from_value::<RuleDocument>(serde_json::json!({"priority": 7}));
        assert!(bad.is_err());
    }

    #[test]
    fn test_deserialize_defaults() {
        let doc: RuleDocument =
            serde_json::from_value(serde_json::json!({"id": "r1", "content": "body"})).unwrap();

        assert_eq!(doc.collection, DEFAULT_COLLECTION);
        assert!(doc.is_active);
        assert!(!doc.is_chunk);
        assert_eq!(doc.priority, RulePriority::NORMAL);
    }

    #[test]
    fn test_chunk_requires_parent() {
        let mut chunk = RuleDocument::new("c1", "excerpt");
        chunk.is_chunk = true;
        assert!(chunk.validate().is_err());

        let chunk = RuleDocument::new("c1", "excerpt").as_chunk_of("p1");
        assert!(chunk.validate().is_ok());
    }

    #[test]
    fn test_identity_key_falls_back_to_natural_key() {
        let with_id = RuleDocument::new("r1", "body").with_title("Title");
        assert_eq!(with_id.identity_key(), "r1");

        let without_id = RuleDocument::new("", "body")
            .with_title("Title")
            .with_category("spelling");
        assert_eq!(without_id.identity_key(), "rules|Title|spelling");
    }

    #[test]
    fn test_field_value_lookup() {
        let doc = RuleDocument::new("r1", "body")
            .with_tag("loanword")
            .with_metadata("source", serde_json::json!("guide"));

        assert_eq!(doc.field_value("is_chunk"), Some(serde_json::json!(false)));
        assert_eq!(doc.field_value("tags"), Some(serde_json::json!(["loanword"])));
        assert_eq!(doc.field_value("source"), Some(serde_json::json!("guide")));
        assert_eq!(doc.field_value("category"), None);
    }

    #[test]
    fn test_projection_drops_embedding() {
        let doc = RuleDocument::new("r1", "body").with_embedding(vec![1.0, 0.0]);
        assert!(doc.projection().embedding.is_none());
    }
}
