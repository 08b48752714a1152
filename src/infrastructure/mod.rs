//! Infrastructure layer - External service implementations

pub mod cache;
pub mod completion;
pub mod embedding;
pub mod http_client;
pub mod logging;
pub mod retrieval;
pub mod services;
pub mod vector_store;
