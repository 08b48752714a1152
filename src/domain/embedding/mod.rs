//! Embedding provider domain models and traits

mod provider;
mod similarity;

pub use provider::{EmbeddingOutcome, EmbeddingProvider, EmbeddingSource};
pub use similarity::{cosine_similarity, normalize};

#[cfg(test)]
pub use provider::mock::MockEmbeddingProvider;
