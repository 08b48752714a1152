//! Keyword query construction for the degraded retrieval path

use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::rule::{FilterCondition, RuleFilter};

/// Fields searched by keyword matching
pub const KEYWORD_FIELDS: &[&str] = &[
    "title",
    "category",
    "content",
    "rule",
    "explanation",
    "tags",
];

// Anything that is not a letter or a digit separates terms
static WORD_SPLIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\p{L}\p{N}]+").unwrap());

/// Default cap on the number of terms taken from a query
pub const DEFAULT_MAX_TERMS: usize = 10;

/// Split a query into distinct lowercase terms longer than one char,
/// preserving first-seen order, at most `max_terms` of them
pub fn extract_terms(query: &str, max_terms: usize) -> Vec<String> {
    let mut terms: Vec<String> = Vec::new();

    for word in WORD_SPLIT.split(query) {
        if terms.len() >= max_terms {
            break;
        }

        let word = word.to_lowercase();
        if word.chars().count() > 1 && !terms.contains(&word) {
            terms.push(word);
        }
    }

    terms
}

/// Build the keyword filter for a query
///
/// Returns `None` for a blank query. The result is an OR group of
/// case-insensitive substring checks of every term over [`KEYWORD_FIELDS`];
/// caller predicates and the active flag are added with AND. A query with
/// no multi-char terms is matched as a whole.
pub fn keyword_filter(
    query: &str,
    caller: Option<&RuleFilter>,
    max_terms: usize,
) -> Option<RuleFilter> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return None;
    }

    let mut needles = extract_terms(trimmed, max_terms);
    if needles.is_empty() {
        needles.push(trimmed.to_lowercase());
    }

    let alternatives = needles
        .iter()
        .flat_map(|needle| {
            KEYWORD_FIELDS
                .iter()
                .map(move |field| FilterCondition::icontains(*field, needle.as_str()).into())
        })
        .collect();

    Some(RuleFilter::merged(
        caller,
        vec![
            RuleFilter::or(alternatives),
            FilterCondition::eq("is_active", true).into(),
        ],
    ))
}
