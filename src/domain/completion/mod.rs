//! Completion domain - Text completion provider seam

mod provider;

pub use provider::{CompletionOptions, CompletionProvider};

#[cfg(test)]
pub use provider::mock::MockCompletionProvider;
