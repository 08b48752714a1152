//! Field-predicate filtering for rule queries

use serde::{Deserialize, Serialize};

use super::entity::RuleDocument;

/// Comparison operators for rule filters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOperator {
    /// Equal to
    Eq,
    /// Not equal to (also matches a missing field)
    Ne,
    /// Greater than
    Gt,
    /// Greater than or equal to
    Gte,
    /// Less than
    Lt,
    /// Less than or equal to
    Lte,
    /// Substring for strings, element for arrays
    Contains,
    /// Case-insensitive substring for strings or any array element
    IContains,
    /// In list of values
    In,
    /// Not in list of values
    NotIn,
    /// Field is present
    Exists,
    /// Field is not present
    NotExists,
}

impl std::fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Eq => write!(f, "="),
            Self::Ne => write!(f, "!="),
            Self::Gt => write!(f, ">"),
            Self::Gte => write!(f, ">="),
            Self::Lt => write!(f, "<"),
            Self::Lte => write!(f, "<="),
            Self::Contains => write!(f, "contains"),
            Self::IContains => write!(f, "icontains"),
            Self::In => write!(f, "in"),
            Self::NotIn => write!(f, "not_in"),
            Self::Exists => write!(f, "exists"),
            Self::NotExists => write!(f, "not_exists"),
        }
    }
}

/// Logical connectors for combining filters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterConnector {
    #[default]
    And,
    Or,
}

/// Filter value that can be various types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    List(Vec<FilterValue>),
    Null,
}

impl From<&str> for FilterValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for FilterValue {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<i32> for FilterValue {
    fn from(n: i32) -> Self {
        Self::Integer(n as i64)
    }
}

impl From<f64> for FilterValue {
    fn from(n: f64) -> Self {
        Self::Float(n)
    }
}

impl From<bool> for FilterValue {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl<T: Into<FilterValue>> From<Vec<T>> for FilterValue {
    fn from(list: Vec<T>) -> Self {
        Self::List(list.into_iter().map(|v| v.into()).collect())
    }
}

/// A single filter condition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterCondition {
    /// Document field (or metadata key)
    pub key: String,
    /// Comparison operator
    pub operator: FilterOperator,
    /// Value to compare against (absent for Exists/NotExists)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<FilterValue>,
}

impl FilterCondition {
    pub fn new(key: impl Into<String>, operator: FilterOperator, value: FilterValue) -> Self {
        Self {
            key: key.into(),
            operator,
            value: Some(value),
        }
    }

    pub fn exists(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            operator: FilterOperator::Exists,
            value: None,
        }
    }

    pub fn not_exists(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            operator: FilterOperator::NotExists,
            value: None,
        }
    }

    pub fn eq(key: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(key, FilterOperator::Eq, value.into())
    }

    pub fn ne(key: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(key, FilterOperator::Ne, value.into())
    }

    pub fn gte(key: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(key, FilterOperator::Gte, value.into())
    }

    pub fn icontains(key: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(key, FilterOperator::IContains, value.into())
    }

    pub fn in_list(key: impl Into<String>, values: Vec<FilterValue>) -> Self {
        Self::new(key, FilterOperator::In, FilterValue::List(values))
    }
}

/// A rule filter: a single condition or a group of filters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleFilter {
    Condition(FilterCondition),
    Group {
        connector: FilterConnector,
        filters: Vec<RuleFilter>,
    },
}

impl From<FilterCondition> for RuleFilter {
    fn from(condition: FilterCondition) -> Self {
        Self::Condition(condition)
    }
}

impl RuleFilter {
    pub fn and(filters: Vec<RuleFilter>) -> Self {
        Self::Group {
            connector: FilterConnector::And,
            filters,
        }
    }

    pub fn or(filters: Vec<RuleFilter>) -> Self {
        Self::Group {
            connector: FilterConnector::Or,
            filters,
        }
    }

    /// AND the optional caller filter with additional constraints
    pub fn merged(caller: Option<&RuleFilter>, extra: Vec<RuleFilter>) -> Self {
        let mut filters: Vec<RuleFilter> = caller.cloned().into_iter().collect();
        filters.extend(extra);

        if filters.len() == 1 {
            filters.remove(0)
        } else {
            Self::and(filters)
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Condition(_) => false,
            Self::Group { filters, .. } => filters.is_empty(),
        }
    }

    /// Evaluate the filter against a document
    ///
    /// An empty group matches everything.
    pub fn matches(&self, doc: &RuleDocument) -> bool {
        match self {
            Self::Condition(condition) => matches_condition(doc, condition),
            Self::Group { filters, .. } if filters.is_empty() => true,
            Self::Group { connector, filters } => match connector {
                FilterConnector::And => filters.iter().all(|f| f.matches(doc)),
                FilterConnector::Or => filters.iter().any(|f| f.matches(doc)),
            },
        }
    }
}

fn matches_condition(doc: &RuleDocument, condition: &FilterCondition) -> bool {
    let doc_value = doc.field_value(&condition.key);
    let doc_value = doc_value.as_ref();

    let Some(value) = condition.value.as_ref() else {
        return match condition.operator {
            FilterOperator::Exists => doc_value.is_some_and(|v| !v.is_null()),
            FilterOperator::NotExists => doc_value.is_none_or(|v| v.is_null()),
            _ => false,
        };
    };

    match condition.operator {
        FilterOperator::Eq => compare_eq(doc_value, value),
        FilterOperator::Ne => !compare_eq(doc_value, value),
        FilterOperator::Gt => compare_ord(doc_value, value, |a, b| a > b),
        FilterOperator::Gte => compare_ord(doc_value, value, |a, b| a >= b),
        FilterOperator::Lt => compare_ord(doc_value, value, |a, b| a < b),
        FilterOperator::Lte => compare_ord(doc_value, value, |a, b| a <= b),
        FilterOperator::Contains => match (doc_value, value) {
            (Some(serde_json::Value::String(s)), FilterValue::String(needle)) => {
                s.contains(needle.as_str())
            }
            (Some(serde_json::Value::Array(items)), needle) => {
                items.iter().any(|item| compare_eq(Some(item), needle))
            }
            _ => false,
        },
        FilterOperator::IContains => {
            let FilterValue::String(needle) = value else {
                return false;
            };
            let needle = needle.to_lowercase();

            match doc_value {
                Some(serde_json::Value::String(s)) => s.to_lowercase().contains(&needle),
                Some(serde_json::Value::Array(items)) => items.iter().any(|item| {
                    item.as_str()
                        .is_some_and(|s| s.to_lowercase().contains(&needle))
                }),
                _ => false,
            }
        }
        FilterOperator::In => match value {
            FilterValue::List(values) => values.iter().any(|v| compare_eq(doc_value, v)),
            _ => false,
        },
        FilterOperator::NotIn => match value {
            FilterValue::List(values) => !values.iter().any(|v| compare_eq(doc_value, v)),
            _ => true,
        },
        FilterOperator::Exists => doc_value.is_some_and(|v| !v.is_null()),
        FilterOperator::NotExists => doc_value.is_none_or(|v| v.is_null()),
    }
}

fn compare_eq(doc_value: Option<&serde_json::Value>, filter_value: &FilterValue) -> bool {
    match (doc_value, filter_value) {
        (Some(serde_json::Value::String(s)), FilterValue::String(fs)) => s == fs,
        (Some(serde_json::Value::Number(n)), FilterValue::Integer(fi)) => {
            n.as_i64().is_some_and(|i| i == *fi)
        }
        (Some(serde_json::Value::Number(n)), FilterValue::Float(ff)) => {
            n.as_f64().is_some_and(|f| (f - ff).abs() < f64::EPSILON)
        }
        (Some(serde_json::Value::Bool(b)), FilterValue::Boolean(fb)) => b == fb,
        (Some(serde_json::Value::Null) | None, FilterValue::Null) => true,
        _ => false,
    }
}

fn compare_ord<F>(doc_value: Option<&serde_json::Value>, filter_value: &FilterValue, cmp: F) -> bool
where
    F: Fn(f64, f64) -> bool,
{
    let Some(serde_json::Value::Number(n)) = doc_value else {
        return false;
    };

    match filter_value {
        FilterValue::Integer(fi) => n.as_f64().is_some_and(|f| cmp(f, *fi as f64)),
        FilterValue::Float(ff) => n.as_f64().is_some_and(|f| cmp(f, *ff)),
        _ => false,
    }
}
