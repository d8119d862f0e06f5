//! YAML configuration for the provider chain and the cookie cache

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::error::{ConfigError, ConfigResult};
use crate::cache::{CacheConfig, SettingsCache};
use crate::events::EventDispatcher;
use crate::providers::{create_provider, ProviderDefinition};
use crate::resolver::{ProviderChain, SettingsResolver};

/// Environment variable overriding the cache key material
pub const CACHE_KEY_ENV: &str = "SETTINGS_CACHE_KEY";
/// Environment variable overriding the cache ttl, in seconds
pub const CACHE_TTL_ENV: &str = "SETTINGS_CACHE_TTL";

/// Configuration file structure
///
/// ```yaml
/// providers:
///   - name: defaults
///     kind: file
///     path: /etc/app/settings.yaml
///     read_only: true
///   - name: runtime
///     kind: memory
/// cache:
///   key_material: change-me
///   ttl: 3600
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SettingsConfig {
    /// Provider chain, in chain order
    #[serde(default)]
    pub providers: Vec<ProviderDefinition>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache: Option<CacheConfig>,
}

impl SettingsConfig {
    /// Parse and validate a YAML document
    pub fn from_yaml_str(content: &str) -> ConfigResult<Self> {
        let config: SettingsConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        debug!(path = %path.display(), "loaded settings configuration");
        Self::from_yaml_str(&content)
    }

    /// Default configuration file location
    pub fn default_path() -> PathBuf {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(".config"));
        config_dir.join("settings-manager").join("config.yaml")
    }

    /// Load `path` (or the default location) and apply environment overrides
    ///
    /// A missing file yields an empty configuration rather than an error.
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        let path = path.map(Path::to_path_buf).unwrap_or_else(Self::default_path);

        let mut config = if path.exists() {
            Self::from_file(&path)?
        } else {
            debug!(path = %path.display(), "no settings configuration file, using defaults");
            Self::default()
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply `SETTINGS_CACHE_KEY` and `SETTINGS_CACHE_TTL`
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(std::env::var(CACHE_KEY_ENV).ok(), std::env::var(CACHE_TTL_ENV).ok());
    }

    fn apply_overrides(&mut self, key: Option<String>, ttl: Option<String>) {
        if let Some(key) = key.filter(|k| !k.is_empty()) {
            match self.cache.as_mut() {
                Some(cache) => cache.key_material = key,
                None => self.cache = Some(CacheConfig::new(key)),
            }
        }

        let Some(raw) = ttl else {
            return;
        };
        let Some(cache) = self.cache.as_mut() else {
            warn!(variable = CACHE_TTL_ENV, "cache ttl override set but no cache is configured");
            return;
        };
        match raw.trim().parse::<u32>() {
            Ok(ttl) if ttl > 0 => cache.ttl = ttl,
            _ => warn!(variable = CACHE_TTL_ENV, value = %raw, "ignoring unparsable cache ttl"),
        }
    }

    pub fn validate(&self) -> ConfigResult<()> {
        for (i, def) in self.providers.iter().enumerate() {
            if def.name.is_empty() {
                return Err(ConfigError::Invalid(format!("provider #{} has no name", i)));
            }
            if self.providers[..i].iter().any(|other| other.name == def.name) {
                return Err(ConfigError::Invalid(format!("duplicate provider name: {}", def.name)));
            }
        }

        if let Some(cache) = &self.cache {
            cache.validate()?;
        }
        Ok(())
    }

    /// Instantiate every configured provider through the provider registry
    pub fn create_providers(&self) -> ConfigResult<ProviderChain> {
        let mut chain = ProviderChain::with_capacity(self.providers.len());

        for def in &self.providers {
            let provider = create_provider(def)
                .ok_or_else(|| ConfigError::UnknownProviderKind(def.kind.clone()))?
                .map_err(|e| ConfigError::Invalid(format!("provider '{}': {}", def.name, e)))?;
            debug!(provider = %def.name, kind = %def.kind, read_only = provider.is_read_only(), "provider created");
            chain.push((def.name.clone(), provider));
        }

        Ok(chain)
    }

    /// Build a resolver over the configured chain
    ///
    /// The cookie cache is request-scoped and is not part of this chain; see
    /// [`SettingsConfig::settings_cache`].
    pub fn build_resolver(&self, dispatcher: Option<Arc<dyn EventDispatcher>>) -> ConfigResult<SettingsResolver> {
        let mut builder = SettingsResolver::builder();
        for (name, provider) in self.create_providers()? {
            builder = builder.provider(name, provider);
        }
        if let Some(dispatcher) = dispatcher {
            builder = builder.dispatcher(dispatcher);
        }
        builder.build().map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    /// The shared cookie cache, when one is configured
    pub fn settings_cache(&self) -> ConfigResult<Option<Arc<SettingsCache>>> {
        self.cache
            .clone()
            .map(|config| SettingsCache::new(config).map(Arc::new))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::RecordingDispatcher;
    use crate::types::{DomainModel, SettingModel, SettingType};
    use serde_json::json;
    use tempfile::TempDir;

    const CHAIN: &str = r#"
providers:
  - name: defaults
    kind: memory
    read_only: true
  - name: runtime
    kind: memory
cache:
  key_material: s3cret
  ttl: 600
"#;

    #[test]
    fn test_parse_chain() {
        let config = SettingsConfig::from_yaml_str(CHAIN).unwrap();
        assert_eq!(config.providers.len(), 2);
        assert_eq!(config.providers[0], ProviderDefinition::new("defaults", "memory").with_read_only(true));
        assert_eq!(config.providers[1], ProviderDefinition::new("runtime", "memory"));

        let cache = config.cache.unwrap();
        assert_eq!(cache.key_material, "s3cret");
        assert_eq!(cache.ttl, 600);
        assert_eq!(cache.cookie_name, "stn");
    }

    #[test]
    fn test_empty_document() {
        let config = SettingsConfig::from_yaml_str("{}").unwrap();
        assert!(config.providers.is_empty());
        assert!(config.cache.is_none());
    }

    #[test]
    fn test_rejects_invalid() {
        let duplicate = "providers:\n  - {name: a, kind: memory}\n  - {name: a, kind: memory}\n";
        assert!(matches!(SettingsConfig::from_yaml_str(duplicate), Err(ConfigError::Invalid(_))));

        let empty_key = "cache:\n  key_material: ''\n";
        assert!(matches!(SettingsConfig::from_yaml_str(empty_key), Err(ConfigError::Invalid(_))));

        assert!(matches!(SettingsConfig::from_yaml_str("providers: 3"), Err(ConfigError::Yaml(_))));
    }

    #[test]
    fn test_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, CHAIN).unwrap();

        let config = SettingsConfig::from_file(&path).unwrap();
        assert_eq!(config.providers.len(), 2);

        let missing = SettingsConfig::from_file(dir.path().join("missing.yaml"));
        assert!(matches!(missing, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_load_missing_file_is_default() {
        let dir = TempDir::new().unwrap();
        let config = SettingsConfig::load(Some(&dir.path().join("missing.yaml"))).unwrap();
        assert!(config.providers.is_empty());
    }

    #[test]
    fn test_default_path() {
        let path = SettingsConfig::default_path();
        assert!(path.ends_with("settings-manager/config.yaml"));
    }

    #[test]
    fn test_overrides() {
        let mut config = SettingsConfig::from_yaml_str(CHAIN).unwrap();
        config.apply_overrides(Some("rotated".to_string()), Some("120".to_string()));
        let cache = config.cache.as_ref().unwrap();
        assert_eq!(cache.key_material, "rotated");
        assert_eq!(cache.ttl, 120);

        // Unparsable ttl is ignored
        config.apply_overrides(None, Some("soon".to_string()));
        config.apply_overrides(None, Some("0".to_string()));
        assert_eq!(config.cache.as_ref().unwrap().ttl, 120);
    }

    #[test]
    fn test_key_override_enables_cache() {
        let mut config = SettingsConfig::default();
        config.apply_overrides(None, Some("60".to_string()));
        assert!(config.cache.is_none());

        config.apply_overrides(Some("s3cret".to_string()), None);
        assert_eq!(config.cache, Some(CacheConfig::new("s3cret")));
    }

    #[test]
    fn test_unknown_kind() {
        let config = SettingsConfig::from_yaml_str("providers:\n  - {name: a, kind: nonexistent_xyz}\n").unwrap();
        assert!(matches!(
            config.build_resolver(None),
            Err(ConfigError::UnknownProviderKind(kind)) if kind == "nonexistent_xyz"
        ));
    }

    #[test]
    fn test_factory_failure() {
        // The file kind needs a path
        let config = SettingsConfig::from_yaml_str("providers:\n  - {name: disk, kind: file}\n").unwrap();
        assert!(matches!(config.create_providers(), Err(ConfigError::Invalid(_))));
    }

    #[tokio::test]
    async fn test_build_resolver() {
        let dir = TempDir::new().unwrap();
        let yaml = format!(
            "providers:\n  - {{name: defaults, kind: memory, read_only: true}}\n  - {{name: disk, kind: file, path: {}}}\n",
            dir.path().join("settings.yaml").display()
        );
        let config = SettingsConfig::from_yaml_str(&yaml).unwrap();

        let dispatcher = Arc::new(RecordingDispatcher::new());
        let resolver = config.build_resolver(Some(dispatcher.clone() as Arc<dyn EventDispatcher>)).unwrap();
        assert_eq!(resolver.provider_names(), vec!["defaults", "disk"]);

        let mut setting = SettingModel::new("foo", DomainModel::default(), SettingType::Int, json!(3));
        assert!(resolver.save(&mut setting).await);
        assert_eq!(setting.provider_name.as_deref(), Some("disk"));
        assert_eq!(dispatcher.names(), vec!["settings_manager.setting.registered"]);
        assert!(dir.path().join("settings.yaml").exists());
    }

    #[test]
    fn test_settings_cache() {
        let config = SettingsConfig::from_yaml_str(CHAIN).unwrap();
        let cache = config.settings_cache().unwrap().unwrap();
        assert_eq!(cache.config().ttl, 600);

        assert!(SettingsConfig::default().settings_cache().unwrap().is_none());
    }
}
