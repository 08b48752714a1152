//! Rule domain - Reference rules consulted while correcting text

mod entity;
mod filter;

pub use entity::{RuleDocument, RulePriority, DEFAULT_COLLECTION};
pub use filter::{FilterCondition, FilterConnector, FilterOperator, FilterValue, RuleFilter};
