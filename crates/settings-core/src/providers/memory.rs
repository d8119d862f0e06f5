//! In-memory settings provider

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::error::{ProviderError, ProviderResult};
use super::traits::SettingsProvider;
use crate::types::{DomainModel, SettingModel};

/// Ordered list of settings with the lookup and mutation rules every
/// list-backed provider shares
///
/// A setting is identified by its domain name plus its own name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SettingSet {
    settings: Vec<SettingModel>,
}

impl SettingSet {
    pub fn new(settings: Vec<SettingModel>) -> Self {
        Self { settings }
    }

    pub fn len(&self) -> usize {
        self.settings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.settings.is_empty()
    }

    pub fn as_slice(&self) -> &[SettingModel] {
        &self.settings
    }

    pub fn into_vec(self) -> Vec<SettingModel> {
        self.settings
    }

    /// Distinct domains in first-seen order
    pub fn domains(&self, only_enabled: bool) -> Vec<DomainModel> {
        let mut domains: Vec<DomainModel> = Vec::new();
        for setting in &self.settings {
            if only_enabled && !setting.domain.enabled {
                continue;
            }
            if !domains.iter().any(|d| d.name == setting.domain.name) {
                domains.push(setting.domain.clone());
            }
        }
        domains
    }

    pub fn in_domains(&self, domain_names: &[String]) -> Vec<SettingModel> {
        self.settings
            .iter()
            .filter(|s| domain_names.iter().any(|d| *d == s.domain.name))
            .cloned()
            .collect()
    }

    pub fn by_name(&self, domain_names: &[String], setting_names: &[String]) -> Vec<SettingModel> {
        self.settings
            .iter()
            .filter(|s| domain_names.iter().any(|d| *d == s.domain.name))
            .filter(|s| setting_names.iter().any(|n| *n == s.name))
            .cloned()
            .collect()
    }

    /// Insert or replace, keeping the position of a replaced entry
    ///
    /// The provider binding is a runtime property and is never stored.
    pub fn upsert(&mut self, setting: &SettingModel) {
        let mut stored = setting.clone();
        stored.provider_name = None;
        match self.position(setting) {
            Some(pos) => self.settings[pos] = stored,
            None => self.settings.push(stored),
        }
    }

    pub fn remove(&mut self, setting: &SettingModel) -> bool {
        match self.position(setting) {
            Some(pos) => {
                self.settings.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Rewrite the domain of every setting in it
    pub fn update_domain(&mut self, domain: &DomainModel) -> bool {
        let mut updated = false;
        for setting in self.settings.iter_mut().filter(|s| s.domain.name == domain.name) {
            setting.domain = domain.clone();
            updated = true;
        }
        updated
    }

    pub fn delete_domain(&mut self, domain_name: &str) -> bool {
        let before = self.settings.len();
        self.settings.retain(|s| s.domain.name != domain_name);
        self.settings.len() != before
    }

    fn position(&self, setting: &SettingModel) -> Option<usize> {
        self.settings
            .iter()
            .position(|s| s.name == setting.name && s.domain.name == setting.domain.name)
    }
}

impl From<Vec<SettingModel>> for SettingSet {
    fn from(settings: Vec<SettingModel>) -> Self {
        Self::new(settings)
    }
}

/// In-memory settings provider
///
/// Fully read-write unless created with [`MemorySettingsProvider::read_only`].
/// Settings are lost when the provider is dropped.
///
/// # Thread Safety
///
/// The provider uses `RwLock` internally and is safe to use from multiple threads.
#[derive(Debug, Default)]
pub struct MemorySettingsProvider {
    settings: RwLock<SettingSet>,
    read_only: bool,
}

impl MemorySettingsProvider {
    /// Create a new empty provider
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a provider with initial settings
    pub fn with_settings(settings: Vec<SettingModel>) -> Self {
        Self {
            settings: RwLock::new(SettingSet::new(settings)),
            read_only: false,
        }
    }

    /// Create a provider that refuses every write
    pub fn read_only(settings: Vec<SettingModel>) -> Self {
        Self {
            settings: RwLock::new(SettingSet::new(settings)),
            read_only: true,
        }
    }

    /// Snapshot of the current settings
    pub fn settings(&self) -> Vec<SettingModel> {
        self.settings.read().as_slice().to_vec()
    }

    /// Replace every setting at once
    pub fn replace_settings(&self, settings: Vec<SettingModel>) {
        *self.settings.write() = SettingSet::new(settings);
    }

    pub fn len(&self) -> usize {
        self.settings.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.settings.read().is_empty()
    }

    fn ensure_writable(&self) -> ProviderResult<()> {
        if self.read_only {
            return Err(ProviderError::ReadOnly);
        }
        Ok(())
    }
}

impl Clone for MemorySettingsProvider {
    fn clone(&self) -> Self {
        Self {
            settings: RwLock::new(self.settings.read().clone()),
            read_only: self.read_only,
        }
    }
}

#[async_trait]
impl SettingsProvider for MemorySettingsProvider {
    fn is_read_only(&self) -> bool {
        self.read_only
    }

    async fn get_domains(&self, only_enabled: bool) -> ProviderResult<Vec<DomainModel>> {
        Ok(self.settings.read().domains(only_enabled))
    }

    async fn get_settings(&self, domain_names: &[String]) -> ProviderResult<Vec<SettingModel>> {
        Ok(self.settings.read().in_domains(domain_names))
    }

    async fn get_settings_by_name(
        &self,
        domain_names: &[String],
        setting_names: &[String],
    ) -> ProviderResult<Vec<SettingModel>> {
        Ok(self.settings.read().by_name(domain_names, setting_names))
    }

    async fn save(&self, setting: &SettingModel) -> ProviderResult<bool> {
        self.ensure_writable()?;
        self.settings.write().upsert(setting);
        Ok(true)
    }

    async fn delete(&self, setting: &SettingModel) -> ProviderResult<bool> {
        self.ensure_writable()?;
        Ok(self.settings.write().remove(setting))
    }

    async fn update_domain(&self, domain: &DomainModel) -> ProviderResult<bool> {
        self.ensure_writable()?;
        Ok(self.settings.write().update_domain(domain))
    }

    async fn delete_domain(&self, domain_name: &str) -> ProviderResult<bool> {
        self.ensure_writable()?;
        Ok(self.settings.write().delete_domain(domain_name))
    }
}
