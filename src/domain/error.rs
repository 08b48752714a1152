use thiserror::Error;

use super::prompt::TemplateError;

/// Core domain errors
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Provider error: {provider} - {message}")]
    Provider { provider: String, message: String },

    #[error("Vector index unavailable: {message}")]
    IndexUnavailable { message: String },

    #[error("Malformed document {id}: {message}")]
    MalformedDocument { id: String, message: String },

    #[error("Vector dimension mismatch: {left} != {right}")]
    DimensionMismatch { left: usize, right: usize },

    #[error("Storage error: {message}")]
    Storage { message: String },

    #[error("Cache error: {message}")]
    Cache { message: String },

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DomainError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn index_unavailable(message: impl Into<String>) -> Self {
        Self::IndexUnavailable {
            message: message.into(),
        }
    }

    pub fn malformed_document(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedDocument {
            id: id.into(),
            message: message.into(),
        }
    }

    pub fn dimension_mismatch(left: usize, right: usize) -> Self {
        Self::DimensionMismatch { left, right }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    pub fn cache(message: impl Into<String>) -> Self {
        Self::Cache {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Errors caused by the caller rather than by a backend.
    ///
    /// These propagate out of the retrieval pipeline; everything else is
    /// recovered locally and degrades to an empty rule set.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Self::Validation { .. }
                | Self::Configuration { .. }
                | Self::DimensionMismatch { .. }
                | Self::Template(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_error() {
        let error = DomainError::configuration("Unknown strategy 'fuzzy'");
        assert_eq!(
            error.to_string(),
            "Configuration error: Unknown strategy 'fuzzy'"
        );
    }

    #[test]
    fn test_provider_error() {
        let error = DomainError::provider("openai", "HTTP 503");
        assert_eq!(error.to_string(), "Provider error: openai - HTTP 503");
    }

    #[test]
    fn test_caller_errors_are_classified() {
        assert!(DomainError::configuration("x").is_caller_error());
        assert!(DomainError::validation("x").is_caller_error());
        assert!(DomainError::dimension_mismatch(2, 3).is_caller_error());
        assert!(!DomainError::provider("p", "x").is_caller_error());
        assert!(!DomainError::index_unavailable("x").is_caller_error());
        assert!(!DomainError::storage("x").is_caller_error());
    }
}
