//! File-based settings provider (YAML)
//!
//! Keeps every setting of the chain level in a single YAML document:
//!
//! ```yaml
//! settings:
//!   - name: foo
//!     type: bool
//!     data: true
//!     domain: { name: default, enabled: true, priority: 0 }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::error::{ProviderError, ProviderResult};
use super::memory::SettingSet;
use super::traits::SettingsProvider;
use crate::types::{DomainModel, SettingModel};

/// Settings file structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SettingsFile {
    #[serde(default)]
    pub settings: SettingSet,
}

/// YAML file-backed settings provider
///
/// The file is read lazily on first access and cached; writes go straight
/// back to disk. Writes through one provider instance are serialized; the
/// file is not locked against other processes.
///
/// # Example
///
/// ```no_run
/// use settings_core::providers::FileSettingsProvider;
///
/// let provider = FileSettingsProvider::new("/etc/myapp/settings.yaml");
/// let defaults = FileSettingsProvider::new("/etc/myapp/defaults.yaml").with_read_only(true);
/// ```
pub struct FileSettingsProvider {
    path: PathBuf,
    read_only: bool,
    cache: RwLock<Option<SettingSet>>,
}

impl FileSettingsProvider {
    /// Create a writable provider for `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            read_only: false,
            cache: RwLock::new(None),
        }
    }

    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    fn load(&self) -> ProviderResult<SettingSet> {
        if !self.path.exists() {
            return Ok(SettingSet::default());
        }

        let content = fs::read_to_string(&self.path)?;
        let file: SettingsFile = serde_yaml::from_str(&content)?;
        Ok(file.settings)
    }

    fn persist(&self, file: &SettingsFile) -> ProviderResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_yaml::to_string(file)?)?;
        Ok(())
    }

    /// Cached or freshly loaded settings
    fn current(&self) -> ProviderResult<SettingSet> {
        if let Some(settings) = self.cache.read().as_ref() {
            return Ok(settings.clone());
        }

        let mut cache = self.cache.write();
        if cache.is_none() {
            *cache = Some(self.load()?);
        }
        Ok(cache.get_or_insert_with(SettingSet::default).clone())
    }

    /// Drop the cache and re-read the file
    pub fn reload(&self) -> ProviderResult<usize> {
        let mut cache = self.cache.write();
        let settings = self.load()?;
        let count = settings.len();
        *cache = Some(settings);
        Ok(count)
    }

    /// Copy the current file next to itself with a `.backup` suffix
    pub fn backup(&self) -> ProviderResult<Option<PathBuf>> {
        if !self.exists() {
            return Ok(None);
        }

        let backup_path = self.path.with_extension("yaml.backup");
        fs::copy(&self.path, &backup_path)?;
        Ok(Some(backup_path))
    }

    fn ensure_writable(&self) -> ProviderResult<()> {
        if self.read_only {
            return Err(ProviderError::ReadOnly);
        }
        Ok(())
    }

    /// Apply `change` and persist only when it reports a modification
    ///
    /// The write lock is held from load to persist, so concurrent writers are
    /// serialized. The cache only takes the change once the file is written.
    fn modify(&self, change: impl FnOnce(&mut SettingSet) -> bool) -> ProviderResult<bool> {
        self.ensure_writable()?;

        let mut cache = self.cache.write();
        if cache.is_none() {
            *cache = Some(self.load()?);
        }
        let settings = cache.get_or_insert_with(SettingSet::default);

        let mut file = SettingsFile {
            settings: settings.clone(),
        };
        if !change(&mut file.settings) {
            return Ok(false);
        }

        self.persist(&file)?;
        *settings = file.settings;
        Ok(true)
    }
}

impl std::fmt::Debug for FileSettingsProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileSettingsProvider")
            .field("path", &self.path)
            .field("read_only", &self.read_only)
            .field("exists", &self.exists())
            .finish()
    }
}

#[async_trait]
impl SettingsProvider for FileSettingsProvider {
    fn is_read_only(&self) -> bool {
        self.read_only
    }

    async fn get_domains(&self, only_enabled: bool) -> ProviderResult<Vec<DomainModel>> {
        Ok(self.current()?.domains(only_enabled))
    }

    async fn get_settings(&self, domain_names: &[String]) -> ProviderResult<Vec<SettingModel>> {
        Ok(self.current()?.in_domains(domain_names))
    }

    async fn get_settings_by_name(
        &self,
        domain_names: &[String],
        setting_names: &[String],
    ) -> ProviderResult<Vec<SettingModel>> {
        Ok(self.current()?.by_name(domain_names, setting_names))
    }

    async fn save(&self, setting: &SettingModel) -> ProviderResult<bool> {
        self.modify(|settings| {
            settings.upsert(setting);
            true
        })
    }

    async fn delete(&self, setting: &SettingModel) -> ProviderResult<bool> {
        self.modify(|settings| settings.remove(setting))
    }

    async fn update_domain(&self, domain: &DomainModel) -> ProviderResult<bool> {
        self.modify(|settings| settings.update_domain(domain))
    }

    async fn delete_domain(&self, domain_name: &str) -> ProviderResult<bool> {
        self.modify(|settings| settings.delete_domain(domain_name))
    }
}
