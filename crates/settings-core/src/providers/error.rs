//! Provider error types

use thiserror::Error;

/// Errors that can occur during provider operations
#[derive(Error, Debug)]
pub enum ProviderError {
    /// The provider refuses writes
    #[error("Provider is read-only")]
    ReadOnly,

    /// IO error from a file-backed provider
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML encoding or decoding error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ProviderError {
    /// Create an error from any message
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }

    /// Whether this is a read-only refusal
    ///
    /// The resolver moves on to the next provider when this is true.
    pub fn is_read_only(&self) -> bool {
        matches!(self, ProviderError::ReadOnly)
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_only_classification() {
        assert!(ProviderError::ReadOnly.is_read_only());
        assert!(!ProviderError::other("boom").is_read_only());
        assert_eq!(ProviderError::ReadOnly.to_string(), "Provider is read-only");
    }
}
