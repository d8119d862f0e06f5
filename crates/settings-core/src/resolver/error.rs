//! Resolver error types

use thiserror::Error;

use crate::providers::ProviderError;

/// Errors surfaced by the resolver to its callers
///
/// Read-only refusals during broadcasts never show up here; the resolver moves
/// on to the next provider instead.
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Settings provider not found: {0}")]
    ProviderNotFound(String),

    #[error("Settings provider registered twice: {0}")]
    DuplicateProvider(String),

    #[error("Settings provider '{provider}' failed: {source}")]
    Provider {
        provider: String,
        #[source]
        source: ProviderError,
    },
}

impl SettingsError {
    pub fn provider(provider: impl Into<String>, source: ProviderError) -> Self {
        Self::Provider {
            provider: provider.into(),
            source,
        }
    }
}

pub type SettingsResult<T> = Result<T, SettingsError>;
