//! Settings provider trait

use async_trait::async_trait;

use super::error::ProviderResult;
use crate::types::{DomainModel, SettingModel};

/// Backend capable of reading and writing settings and domains
///
/// Implementations:
/// - `MemorySettingsProvider`: In-memory, also the base of the cache provider
/// - `FileSettingsProvider`: YAML file on disk
/// - `AuthenticatedCacheProvider`: Signed, encrypted cookie token
/// - Custom implementations (database, Redis, etc.)
///
/// Reads must not have side effects. Writes must be idempotent for the same
/// setting values. A provider that refuses a write returns either `Ok(false)`
/// or `Err(ProviderError::ReadOnly)`.
#[async_trait]
pub trait SettingsProvider: Send + Sync {
    /// Whether the provider refuses all writes
    fn is_read_only(&self) -> bool {
        false
    }

    /// Domains known to this provider
    async fn get_domains(&self, only_enabled: bool) -> ProviderResult<Vec<DomainModel>>;

    /// All settings belonging to any of `domain_names`
    async fn get_settings(&self, domain_names: &[String]) -> ProviderResult<Vec<SettingModel>>;

    /// Settings named in `setting_names` belonging to any of `domain_names`
    async fn get_settings_by_name(
        &self,
        domain_names: &[String],
        setting_names: &[String],
    ) -> ProviderResult<Vec<SettingModel>>;

    /// Insert or replace a setting
    async fn save(&self, setting: &SettingModel) -> ProviderResult<bool>;

    /// Remove a setting, returning whether anything was removed
    async fn delete(&self, setting: &SettingModel) -> ProviderResult<bool>;

    /// Replace the definition of a domain
    async fn update_domain(&self, domain: &DomainModel) -> ProviderResult<bool>;

    /// Remove a domain and its settings
    async fn delete_domain(&self, domain_name: &str) -> ProviderResult<bool>;
}
