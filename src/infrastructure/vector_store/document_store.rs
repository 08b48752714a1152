//! In-memory document store for development and testing

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::rule::{RuleDocument, RuleFilter};
use crate::domain::search::DocumentStore;
use crate::domain::DomainError;

/// Rule documents held in memory, evaluated with [`RuleFilter::matches`]
#[derive(Debug, Clone, Default)]
pub struct InMemoryDocumentStore {
    documents: Arc<RwLock<Vec<RuleDocument>>>,
}

impl InMemoryDocumentStore {
    pub fn new(documents: Vec<RuleDocument>) -> Self {
        Self {
            documents: Arc::new(RwLock::new(documents)),
        }
    }

    /// Parse a JSON array of rule documents
    pub fn from_json(json: &str) -> Result<Self, DomainError> {
        let documents: Vec<RuleDocument> = serde_json::from_str(json)
            .map_err(|e| DomainError::validation(format!("Invalid rules JSON: {}", e)))?;

        for document in &documents {
            document.validate()?;
        }

        Ok(Self::new(documents))
    }

    /// Add or replace a document by id
    pub async fn upsert(&self, document: RuleDocument) {
        let mut documents = self.documents.write().await;

        match documents
            .iter_mut()
            .find(|d| !d.id.is_empty() && d.id == document.id)
        {
            Some(existing) => *existing = document,
            None => documents.push(document),
        }
    }

    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn find(
        &self,
        collection: &str,
        filter: Option<&RuleFilter>,
    ) -> Result<Vec<RuleDocument>, DomainError> {
        let documents = self.documents.read().await;

        Ok(documents
            .iter()
            .filter(|doc| doc.collection == collection)
            .filter(|doc| filter.is_none_or(|f| f.matches(doc)))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::rule::FilterCondition;

    fn store() -> InMemoryDocumentStore {
        InMemoryDocumentStore::new(vec![
            RuleDocument::new("r1", "띄어쓰기").with_category("spacing"),
            RuleDocument::new("r2", "외래어").with_category("spelling"),
            RuleDocument::new("r3", "other").in_collection("drafts"),
        ])
    }

    #[tokio::test]
    async fn test_find_scopes_to_collection() {
        let docs = store().find("rules", None).await.unwrap();

        assert_eq!(docs.len(), 2);
    }

    #[tokio::test]
    async fn test_find_applies_filter() {
        let filter = RuleFilter::from(FilterCondition::eq("category", "spelling"));
        let docs = store().find("rules", Some(&filter)).await.unwrap();

        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, "r2");
    }

    #[tokio::test]
    async fn test_upsert_replaces_by_id() {
        let store = store();
        store
            .upsert(RuleDocument::new("r1", "updated").with_category("spacing"))
            .await;

        assert_eq!(store.len().await, 3);
        let docs = store.find("rules", None).await.unwrap();
        assert_eq!(docs[0].content, "updated");
    }

    #[test]
    fn test_from_json_rejects_orphan_chunk() {
        let json = r#"[{"id": "c1", "content": "x", "is_chunk": true}]"#;

        let err = InMemoryDocumentStore::from_json(json).unwrap_err();
        assert!(matches!(err, DomainError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_from_json_loads_documents() {
        let json = r#"[{"id": "a", "content": "x", "priority": "P1"}]"#;

        let store = InMemoryDocumentStore::from_json(json).unwrap();
        assert_eq!(store.len().await, 1);
    }
}
