//! Infrastructure services

mod correction_service;
mod prompt_service;

pub use correction_service::{CorrectionResult, CorrectionService};
pub use prompt_service::{EnhancedPrompt, PromptEnhancer, DEFAULT_CORRECTION_TEMPLATE};
