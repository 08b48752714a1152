//! Retrieval domain - Strategy selection, merging and outcome shapes

mod keyword;
mod merge;
mod outcome;
mod strategy;

pub use keyword::{extract_terms, keyword_filter, DEFAULT_MAX_TERMS, KEYWORD_FIELDS};
pub use merge::{merge_all, merge_results};
pub use outcome::RetrievalOutcome;
pub use strategy::{choose_strategy, StrategyThresholds};
