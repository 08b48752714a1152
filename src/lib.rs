//! correction-rag - Retrieval-augmented prompt construction for text correction
//!
//! Finds the style and spelling rules relevant to a piece of text and splices
//! them into a bounded prompt for a completion provider.
//!
//! The crate is organized in layers:
//! - [`domain`]: rule documents, filters, similarity, strategies, prompt assembly
//! - [`infrastructure`]: providers, vector stores, the retriever, cache and services
//! - [`config`]: layered application configuration
//! - [`cli`]: the `correction-rag` command line

pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;
pub use domain::{DomainError, RetrievalOptions, RetrievalOutcome, RuleDocument};
pub use infrastructure::retrieval::RuleRetriever;
pub use infrastructure::services::{CorrectionService, PromptEnhancer};
