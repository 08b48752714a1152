//! Completion provider implementations

mod openai;

pub use openai::{OpenAiCompletionProvider, DEFAULT_COMPLETION_MODEL};
