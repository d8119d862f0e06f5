//! Instrumented provider for testing
//!
//! Wraps a `MemorySettingsProvider` and counts every call, with switchable
//! failure modes. Useful for checking how the resolver routes reads and writes
//! across a chain.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use super::error::{ProviderError, ProviderResult};
use super::memory::MemorySettingsProvider;
use super::traits::SettingsProvider;
use crate::types::{DomainModel, SettingModel};

/// How the mock reacts to writes and reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MockMode {
    /// Behave like a normal in-memory provider
    #[default]
    Normal,
    /// Report `is_read_only() == true` and refuse writes
    ReadOnly,
    /// Claim to be writable but raise `ProviderError::ReadOnly` on save
    RejectWrites,
    /// Return `Ok(false)` from save
    DeclineWrites,
    /// Fail every read with `ProviderError::Other`
    FailReads,
}

/// Per-operation call counters
#[derive(Debug, Default)]
pub struct CallCounts {
    pub get_domains: AtomicUsize,
    pub get_settings: AtomicUsize,
    pub get_settings_by_name: AtomicUsize,
    pub save: AtomicUsize,
    pub delete: AtomicUsize,
    pub update_domain: AtomicUsize,
    pub delete_domain: AtomicUsize,
}

/// Mock settings provider for testing
#[derive(Debug, Default)]
pub struct MockSettingsProvider {
    inner: MemorySettingsProvider,
    mode: MockMode,
    calls: CallCounts,
}

impl MockSettingsProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: Vec<SettingModel>) -> Self {
        Self {
            inner: MemorySettingsProvider::with_settings(settings),
            ..Default::default()
        }
    }

    pub fn with_mode(mut self, mode: MockMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn calls(&self) -> &CallCounts {
        &self.calls
    }

    pub fn save_calls(&self) -> usize {
        self.calls.save.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.calls.delete.load(Ordering::SeqCst)
    }

    pub fn by_name_calls(&self) -> usize {
        self.calls.get_settings_by_name.load(Ordering::SeqCst)
    }

    /// Settings currently held
    pub fn settings(&self) -> Vec<SettingModel> {
        self.inner.settings()
    }

    fn check_read(&self) -> ProviderResult<()> {
        if self.mode == MockMode::FailReads {
            return Err(ProviderError::other("mock read failure"));
        }
        Ok(())
    }

    fn check_write(&self) -> ProviderResult<()> {
        match self.mode {
            MockMode::ReadOnly | MockMode::RejectWrites => Err(ProviderError::ReadOnly),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl SettingsProvider for MockSettingsProvider {
    fn is_read_only(&self) -> bool {
        self.mode == MockMode::ReadOnly
    }

    async fn get_domains(&self, only_enabled: bool) -> ProviderResult<Vec<DomainModel>> {
        self.calls.get_domains.fetch_add(1, Ordering::SeqCst);
        self.check_read()?;
        self.inner.get_domains(only_enabled).await
    }

    async fn get_settings(&self, domain_names: &[String]) -> ProviderResult<Vec<SettingModel>> {
        self.calls.get_settings.fetch_add(1, Ordering::SeqCst);
        self.check_read()?;
        self.inner.get_settings(domain_names).await
    }

    async fn get_settings_by_name(
        &self,
        domain_names: &[String],
        setting_names: &[String],
    ) -> ProviderResult<Vec<SettingModel>> {
        self.calls.get_settings_by_name.fetch_add(1, Ordering::SeqCst);
        self.check_read()?;
        self.inner.get_settings_by_name(domain_names, setting_names).await
    }

    async fn save(&self, setting: &SettingModel) -> ProviderResult<bool> {
        self.calls.save.fetch_add(1, Ordering::SeqCst);
        self.check_write()?;
        if self.mode == MockMode::DeclineWrites {
            return Ok(false);
        }
        self.inner.save(setting).await
    }

    async fn delete(&self, setting: &SettingModel) -> ProviderResult<bool> {
        self.calls.delete.fetch_add(1, Ordering::SeqCst);
        self.check_write()?;
        self.inner.delete(setting).await
    }

    async fn update_domain(&self, domain: &DomainModel) -> ProviderResult<bool> {
        self.calls.update_domain.fetch_add(1, Ordering::SeqCst);
        self.check_write()?;
        self.inner.update_domain(domain).await
    }

    async fn delete_domain(&self, domain_name: &str) -> ProviderResult<bool> {
        self.calls.delete_domain.fetch_add(1, Ordering::SeqCst);
        self.check_write()?;
        self.inner.delete_domain(domain_name).await
    }
}
