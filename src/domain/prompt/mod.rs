//! Prompt domain - Templates, rule formatting and assembly

mod assembler;
mod formatter;
mod splice;
mod template;

pub use assembler::{
    assemble, enhance, enhance_bounded, AssembledPrompt, PromptContext, PromptLimits,
};
pub use formatter::{format_block, format_results, omitted_marker, RULES_HEADER};
pub use splice::{
    splice, truncate_graphemes, InsertionPoint, DEFAULT_INSTRUCTIONS_MARKER, ELLIPSIS,
};
pub use template::{PromptTemplate, PromptVariable, TemplateError, SOURCE_TEXT_VAR};
