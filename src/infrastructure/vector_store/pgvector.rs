//! pgvector-backed rule index and document store

use std::fmt::Debug;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;
use tracing::{debug, error, warn};

use crate::domain::rule::{
    FilterCondition, FilterConnector, FilterOperator, FilterValue, RuleDocument, RuleFilter,
    RulePriority,
};
use crate::domain::search::{DocumentStore, IndexHit, IndexQuery, VectorIndex};
use crate::domain::DomainError;

pub const DEFAULT_TABLE_NAME: &str = "rule_documents";

static IDENTIFIER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,62}$").unwrap());

const DOCUMENT_COLUMNS: &str = "id, collection, title, category, content, rule, explanation, \
     examples, tags, priority, doc_type, metadata, is_active, is_chunk, parent_id, \
     embedding::text AS embedding_text";

/// Configuration for the pgvector rule table
#[derive(Debug, Clone)]
pub struct PgVectorConfig {
    /// Embedding dimensions of the `embedding` column
    pub dimensions: usize,
    /// Table holding the rule documents
    pub table_name: String,
}

impl PgVectorConfig {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            table_name: DEFAULT_TABLE_NAME.to_string(),
        }
    }

    pub fn with_table_name(mut self, name: impl Into<String>) -> Self {
        self.table_name = name.into();
        self
    }
}

fn check_identifier(kind: &str, name: &str) -> Result<(), DomainError> {
    if IDENTIFIER.is_match(name) {
        Ok(())
    } else {
        Err(DomainError::configuration(format!(
            "Invalid {} '{}': expected a plain SQL identifier",
            kind, name
        )))
    }
}

/// Rule documents in PostgreSQL with a pgvector `embedding` column
///
/// Serves both as the native [`VectorIndex`] (cosine distance via `<=>`) and
/// as the [`DocumentStore`] read path.
#[derive(Clone)]
pub struct PgVectorRuleIndex {
    pool: PgPool,
    config: PgVectorConfig,
}

impl Debug for PgVectorRuleIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgVectorRuleIndex")
            .field("config", &self.config)
            .finish()
    }
}

impl PgVectorRuleIndex {
    pub fn new(pool: PgPool, config: PgVectorConfig) -> Result<Self, DomainError> {
        check_identifier("table name", &config.table_name)?;
        Ok(Self { pool, config })
    }

    /// Connect to `database_url` and wrap the pool
    pub async fn connect(database_url: &str, config: PgVectorConfig) -> Result<Self, DomainError> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to connect to database: {}", e)))?;

        Self::new(pool, config)
    }

    /// Create the extension, table and indexes when missing
    pub async fn ensure_schema(&self) -> Result<(), DomainError> {
        let table = &self.config.table_name;

        sqlx::query("CREATE EXTENSION IF NOT EXISTS vector")
            .execute(&self.pool)
            .await
            .map_err(|e| {
                DomainError::storage(format!("Failed to create vector extension: {}", e))
            })?;

        let create_table = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                id VARCHAR(255) PRIMARY KEY,
                collection VARCHAR(255) NOT NULL DEFAULT 'rules',
                title TEXT,
                category VARCHAR(255),
                content TEXT NOT NULL DEFAULT '',
                rule TEXT,
                explanation TEXT,
                examples JSONB NOT NULL DEFAULT '[]',
                tags JSONB NOT NULL DEFAULT '[]',
                priority SMALLINT NOT NULL DEFAULT 3,
                doc_type VARCHAR(255),
                metadata JSONB NOT NULL DEFAULT '{{}}',
                embedding vector({dims}),
                is_active BOOLEAN NOT NULL DEFAULT TRUE,
                is_chunk BOOLEAN NOT NULL DEFAULT FALSE,
                parent_id VARCHAR(255),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
            table = table,
            dims = self.config.dimensions
        );

        sqlx::query(&create_table)
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to create table: {}", e)))?;

        for (suffix, columns) in [("collection", "collection"), ("parent_id", "parent_id")] {
            let index = format!(
                "CREATE INDEX IF NOT EXISTS idx_{table}_{suffix} ON {table} ({columns})"
            );
            sqlx::query(&index).execute(&self.pool).await.map_err(|e| {
                DomainError::storage(format!("Failed to create {} index: {}", suffix, e))
            })?;
        }

        let vector_index = format!(
            "CREATE INDEX IF NOT EXISTS idx_{table}_embedding ON {table} \
             USING hnsw (embedding vector_cosine_ops)"
        );

        // Older pgvector builds lack hnsw; exact scans still work without it
        if let Err(e) = sqlx::query(&vector_index).execute(&self.pool).await {
            warn!(table = %table, error = %e, "Could not create vector index");
        }

        Ok(())
    }

    fn row_to_document(row: &PgRow) -> Result<RuleDocument, DomainError> {
        let id: String = row.try_get("id").map_err(decode_error)?;
        let malformed = |message: String| DomainError::malformed_document(&id, message);

        let priority: i16 = row.try_get("priority").map_err(decode_error)?;
        let priority = RulePriority::new(priority as i64).map_err(|e| malformed(e.to_string()))?;

        let examples: serde_json::Value = row.try_get("examples").map_err(decode_error)?;
        let tags: serde_json::Value = row.try_get("tags").map_err(decode_error)?;
        let metadata: serde_json::Value = row.try_get("metadata").map_err(decode_error)?;
        let embedding: Option<String> = row.try_get("embedding_text").map_err(decode_error)?;

        let embedding = embedding
            .map(|text| parse_pgvector(&text))
            .transpose()
            .map_err(|e| malformed(e.to_string()))?;

        Ok(RuleDocument {
            collection: row.try_get("collection").map_err(decode_error)?,
            title: row.try_get("title").map_err(decode_error)?,
            category: row.try_get("category").map_err(decode_error)?,
            content: row.try_get("content").map_err(decode_error)?,
            rule: row.try_get("rule").map_err(decode_error)?,
            explanation: row.try_get("explanation").map_err(decode_error)?,
            examples: serde_json::from_value(examples).map_err(|e| malformed(e.to_string()))?,
            tags: serde_json::from_value(tags).map_err(|e| malformed(e.to_string()))?,
            priority,
            doc_type: row.try_get("doc_type").map_err(decode_error)?,
            metadata: serde_json::from_value(metadata).unwrap_or_default(),
            embedding,
            is_active: row.try_get("is_active").map_err(decode_error)?,
            is_chunk: row.try_get("is_chunk").map_err(decode_error)?,
            parent_id: row.try_get("parent_id").map_err(decode_error)?,
            id,
        })
    }

    /// Convert rows, skipping (and logging) malformed ones
    fn rows_to_documents<'a>(
        rows: impl IntoIterator<Item = &'a PgRow>,
    ) -> impl Iterator<Item = (&'a PgRow, RuleDocument)> {
        rows.into_iter().filter_map(|row| match Self::row_to_document(row) {
            Ok(doc) => Some((row, doc)),
            Err(e) => {
                warn!(error = %e, "Skipping malformed rule row");
                None
            }
        })
    }
}

fn decode_error(e: sqlx::Error) -> DomainError {
    DomainError::storage(format!("Failed to decode row: {}", e))
}

#[async_trait]
impl VectorIndex for PgVectorRuleIndex {
    async fn query(&self, query: &IndexQuery) -> Result<Vec<IndexHit>, DomainError> {
        check_identifier("score field", &query.score_field)?;

        let filter_sql = query
            .filter
            .as_ref()
            .map(filter_to_sql)
            .filter(|s| !s.is_empty())
            .map(|s| format!(" AND {}", s))
            .unwrap_or_default();

        let sql = format!(
            r#"
            SELECT {columns},
                   1 - (embedding <=> $2::text::vector) AS {score}
            FROM {table}
            WHERE collection = $1
              AND embedding IS NOT NULL
              AND is_active{filter}
            ORDER BY embedding <=> $2::text::vector
            LIMIT {limit}
            "#,
            columns = DOCUMENT_COLUMNS,
            score = query.score_field,
            table = self.config.table_name,
            filter = filter_sql,
            limit = query.k
        );

        let rows = sqlx::query(&sql)
            .bind(&query.collection)
            .bind(embedding_to_pgvector(&query.vector))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                error!(
                    collection = %query.collection,
                    error = %e,
                    "pgvector query failed"
                );
                DomainError::index_unavailable(format!("pgvector query failed: {}", e))
            })?;

        let mut hits = Vec::with_capacity(rows.len());
        for (row, document) in Self::rows_to_documents(&rows) {
            let score: f64 = row
                .try_get(query.score_field.as_str())
                .map_err(|e| DomainError::index_unavailable(format!("Missing score: {}", e)))?;
            hits.push(IndexHit::new(document, score as f32));
        }

        debug!(
            collection = %query.collection,
            k = query.k,
            rows = rows.len(),
            hits = hits.len(),
            "pgvector query complete"
        );

        Ok(hits)
    }

    fn index_name(&self) -> &'static str {
        "pgvector"
    }
}

#[async_trait]
impl DocumentStore for PgVectorRuleIndex {
    async fn find(
        &self,
        collection: &str,
        filter: Option<&RuleFilter>,
    ) -> Result<Vec<RuleDocument>, DomainError> {
        let filter_sql = filter
            .map(filter_to_sql)
            .filter(|s| !s.is_empty())
            .map(|s| format!(" AND {}", s))
            .unwrap_or_default();

        let sql = format!(
            "SELECT {} FROM {} WHERE collection = $1{}",
            DOCUMENT_COLUMNS, self.config.table_name, filter_sql
        );

        let rows = sqlx::query(&sql)
            .bind(collection)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to query rules: {}", e)))?;

        Ok(Self::rows_to_documents(&rows).map(|(_, doc)| doc).collect())
    }
}

/// How a filter key maps onto the table
enum Column {
    Text(&'static str),
    Bool(&'static str),
    Int(&'static str),
    JsonArray(&'static str),
    Metadata(String),
}

impl Column {
    fn for_key(key: &str) -> Self {
        match key {
            "id" => Self::Text("id"),
            "collection" => Self::Text("collection"),
            "title" => Self::Text("title"),
            "category" => Self::Text("category"),
            "content" => Self::Text("content"),
            "rule" => Self::Text("rule"),
            "explanation" => Self::Text("explanation"),
            "doc_type" => Self::Text("doc_type"),
            "parent_id" => Self::Text("parent_id"),
            "is_active" => Self::Bool("is_active"),
            "is_chunk" => Self::Bool("is_chunk"),
            "priority" => Self::Int("priority"),
            "examples" => Self::JsonArray("examples"),
            "tags" => Self::JsonArray("tags"),
            "embedding" => Self::Text("embedding"),
            other => Self::Metadata(escape_literal(other)),
        }
    }

    /// Scalar expression, text for metadata keys
    fn scalar(&self) -> String {
        match self {
            Self::Text(c) | Self::Bool(c) | Self::Int(c) | Self::JsonArray(c) => c.to_string(),
            Self::Metadata(key) => format!("metadata->>'{}'", key),
        }
    }
}

/// Convert a rule filter to a SQL boolean expression
///
/// Values are embedded as escaped literals. An empty group yields an empty
/// string (no constraint).
pub fn filter_to_sql(filter: &RuleFilter) -> String {
    match filter {
        RuleFilter::Condition(condition) => condition_to_sql(condition),
        RuleFilter::Group { connector, filters } => {
            let clauses: Vec<String> = filters
                .iter()
                .map(filter_to_sql)
                .filter(|s| !s.is_empty())
                .collect();

            if clauses.is_empty() {
                return String::new();
            }

            let connector_sql = match connector {
                FilterConnector::And => " AND ",
                FilterConnector::Or => " OR ",
            };

            format!("({})", clauses.join(connector_sql))
        }
    }
}

fn condition_to_sql(condition: &FilterCondition) -> String {
    let column = Column::for_key(&condition.key);

    match &condition.operator {
        FilterOperator::Exists => exists_sql(&column),
        FilterOperator::NotExists => format!("NOT ({})", exists_sql(&column)),
        op => match &condition.value {
            Some(value) => compare_sql(&column, op, value),
            None => "FALSE".to_string(),
        },
    }
}

fn exists_sql(column: &Column) -> String {
    match column {
        Column::Bool(_) => "TRUE".to_string(),
        Column::Metadata(key) => {
            format!("(metadata ? '{key}' AND metadata->'{key}' <> 'null'::jsonb)")
        }
        other => format!("{} IS NOT NULL", other.scalar()),
    }
}

fn compare_sql(column: &Column, op: &FilterOperator, value: &FilterValue) -> String {
    let expr = column.scalar();

    match op {
        FilterOperator::Eq => match value {
            FilterValue::Null => format!("{} IS NULL", expr),
            _ => column_literal(column, value).map_or_else(
                || "FALSE".to_string(),
                |lit| format!("{} = {}", typed(column, &expr), lit),
            ),
        },
        FilterOperator::Ne => match value {
            FilterValue::Null => format!("{} IS NOT NULL", expr),
            _ => column_literal(column, value).map_or_else(
                || "TRUE".to_string(),
                |lit| format!("{} IS DISTINCT FROM {}", typed(column, &expr), lit),
            ),
        },
        FilterOperator::Gt | FilterOperator::Gte | FilterOperator::Lt | FilterOperator::Lte => {
            let symbol = op.to_string();
            match (column, value) {
                (Column::Int(_) | Column::Metadata(_), FilterValue::Integer(_) | FilterValue::Float(_)) => {
                    let number = literal(value).unwrap_or_default();
                    format!("({})::numeric {} {}", expr, symbol, number)
                }
                _ => "FALSE".to_string(),
            }
        }
        FilterOperator::Contains | FilterOperator::IContains => {
            let FilterValue::String(needle) = value else {
                return "FALSE".to_string();
            };
            let like = if *op == FilterOperator::IContains {
                "ILIKE"
            } else {
                "LIKE"
            };
            let pattern = format!("'%{}%'", escape_like(needle));

            match column {
                Column::JsonArray(c) if *op == FilterOperator::Contains => {
                    let array = serde_json::json!([needle]).to_string();
                    format!("{} @> '{}'::jsonb", c, escape_literal(&array))
                }
                Column::JsonArray(c) => format!(
                    "EXISTS (SELECT 1 FROM jsonb_array_elements_text({}) AS e WHERE e {} {})",
                    c, like, pattern
                ),
                _ => format!("{} {} {}", expr, like, pattern),
            }
        }
        FilterOperator::In | FilterOperator::NotIn => {
            let FilterValue::List(items) = value else {
                return if *op == FilterOperator::In { "FALSE" } else { "TRUE" }.to_string();
            };
            let literals: Vec<String> = items
                .iter()
                .filter_map(|item| column_literal(column, item))
                .collect();

            if literals.is_empty() {
                return if *op == FilterOperator::In { "FALSE" } else { "TRUE" }.to_string();
            }

            let typed_expr = typed(column, &expr);
            let list = literals.join(", ");
            if *op == FilterOperator::In {
                format!("{} IN ({})", typed_expr, list)
            } else {
                format!("({} IS NULL OR {} NOT IN ({}))", expr, typed_expr, list)
            }
        }
        FilterOperator::Exists | FilterOperator::NotExists => exists_sql(column),
    }
}

/// Expression compared against [`column_literal`] values
fn typed(column: &Column, expr: &str) -> String {
    match column {
        Column::Metadata(key) => format!("metadata->'{}'", key),
        _ => expr.to_string(),
    }
}

/// Literal for `column`; metadata values are compared as jsonb
fn column_literal(column: &Column, value: &FilterValue) -> Option<String> {
    match column {
        Column::Metadata(_) => {
            let json = match value {
                FilterValue::String(s) => serde_json::Value::String(s.clone()),
                FilterValue::Integer(n) => serde_json::Value::from(*n),
                FilterValue::Float(f) => serde_json::Value::from(*f),
                FilterValue::Boolean(b) => serde_json::Value::Bool(*b),
                FilterValue::Null | FilterValue::List(_) => return None,
            };
            Some(format!("'{}'::jsonb", escape_literal(&json.to_string())))
        }
        _ => literal(value),
    }
}

fn literal(value: &FilterValue) -> Option<String> {
    match value {
        FilterValue::String(s) => Some(format!("'{}'", escape_literal(s))),
        FilterValue::Integer(n) => Some(n.to_string()),
        FilterValue::Float(f) => Some(f.to_string()),
        FilterValue::Boolean(b) => Some(b.to_string()),
        FilterValue::Null | FilterValue::List(_) => None,
    }
}

fn escape_literal(s: &str) -> String {
    s.replace('\'', "''")
}

fn escape_like(s: &str) -> String {
    escape_literal(&s.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_"))
}

fn embedding_to_pgvector(embedding: &[f32]) -> String {
    let values: Vec<String> = embedding.iter().map(|v| v.to_string()).collect();
    format!("[{}]", values.join(","))
}

fn parse_pgvector(s: &str) -> Result<Vec<f32>, DomainError> {
    let trimmed = s.trim().trim_start_matches('[').trim_end_matches(']');
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    trimmed
        .split(',')
        .map(|v| v.trim().parse::<f32>())
        .collect::<Result<Vec<f32>, _>>()
        .map_err(|e| DomainError::storage(format!("Failed to parse vector: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pgvector() {
        let result = parse_pgvector("[0.1, 0.2, 0.3]").unwrap();
        assert_eq!(result.len(), 3);
        assert!((result[1] - 0.2).abs() < 0.001);

        assert!(parse_pgvector("[]").unwrap().is_empty());
        assert!(parse_pgvector("[a,b]").is_err());
    }

    #[test]
    fn test_embedding_to_pgvector() {
        assert_eq!(embedding_to_pgvector(&[1.0, -0.5]), "[1,-0.5]");
    }

    #[test]
    fn test_identifiers_are_checked() {
        assert!(check_identifier("score field", "score").is_ok());
        assert!(check_identifier("score field", "_sim2").is_ok());
        assert!(check_identifier("score field", "score; DROP TABLE x").is_err());
        assert!(check_identifier("table name", "").is_err());
    }

    #[test]
    fn test_column_conditions() {
        let sql = filter_to_sql(&FilterCondition::eq("category", "spelling").into());
        assert_eq!(sql, "category = 'spelling'");

        let sql = filter_to_sql(&FilterCondition::eq("is_chunk", true).into());
        assert_eq!(sql, "is_chunk = true");

        let sql = filter_to_sql(&FilterCondition::gte("priority", 4).into());
        assert_eq!(sql, "(priority)::numeric >= 4");
    }

    #[test]
    fn test_metadata_conditions() {
        let sql = filter_to_sql(&FilterCondition::eq("source", "handbook").into());
        assert_eq!(sql, r#"metadata->'source' = '"handbook"'::jsonb"#);

        let sql = filter_to_sql(&FilterCondition::exists("source").into());
        assert!(sql.starts_with("(metadata ? 'source'"));
    }

    #[test]
    fn test_icontains_uses_ilike_and_escapes() {
        let sql = filter_to_sql(&FilterCondition::icontains("title", "it's 100%").into());
        assert_eq!(sql, r"title ILIKE '%it''s 100\%%'");

        let sql = filter_to_sql(&FilterCondition::icontains("tags", "loan").into());
        assert!(sql.contains("jsonb_array_elements_text(tags)"));
    }

    #[test]
    fn test_in_and_groups() {
        let filter = RuleFilter::or(vec![
            FilterCondition::in_list("doc_type", vec!["style".into(), "spelling".into()]).into(),
            FilterCondition::ne("parent_id", "p1").into(),
        ]);

        assert_eq!(
            filter_to_sql(&filter),
            "(doc_type IN ('style', 'spelling') OR parent_id IS DISTINCT FROM 'p1')"
        );
        assert_eq!(filter_to_sql(&RuleFilter::and(vec![])), "");
    }
}
