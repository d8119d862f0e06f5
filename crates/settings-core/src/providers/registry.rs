//! Provider kind registry for building chains from configuration

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::error::{ProviderError, ProviderResult};
use super::file::FileSettingsProvider;
use super::memory::MemorySettingsProvider;
use super::traits::SettingsProvider;

/// One entry of a configured provider chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderDefinition {
    /// Unique name of the provider within the chain
    pub name: String,
    /// Registered kind used to create it (e.g. "memory", "file")
    pub kind: String,
    /// Backing file, for kinds that need one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub read_only: bool,
}

impl ProviderDefinition {
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            path: None,
            read_only: false,
        }
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }
}

/// Factory function type for creating providers
pub type ProviderFactory =
    Box<dyn Fn(&ProviderDefinition) -> ProviderResult<Arc<dyn SettingsProvider>> + Send + Sync>;

/// A registered provider kind
pub struct KindDefinition {
    pub kind: String,
    pub description: String,
    pub factory: ProviderFactory,
}

impl std::fmt::Debug for KindDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KindDefinition")
            .field("kind", &self.kind)
            .field("description", &self.description)
            .finish()
    }
}

fn memory_factory(def: &ProviderDefinition) -> ProviderResult<Arc<dyn SettingsProvider>> {
    if def.read_only {
        Ok(Arc::new(MemorySettingsProvider::read_only(Vec::new())))
    } else {
        Ok(Arc::new(MemorySettingsProvider::new()))
    }
}

fn file_factory(def: &ProviderDefinition) -> ProviderResult<Arc<dyn SettingsProvider>> {
    let path = def
        .path
        .as_ref()
        .ok_or_else(|| ProviderError::other(format!("provider '{}' of kind 'file' needs a path", def.name)))?;
    Ok(Arc::new(FileSettingsProvider::new(path).with_read_only(def.read_only)))
}

/// Global registry of provider kinds
static REGISTRY: Lazy<RwLock<HashMap<String, KindDefinition>>> = Lazy::new(|| {
    let mut map = HashMap::new();

    map.insert(
        "memory".to_string(),
        KindDefinition {
            kind: "memory".to_string(),
            description: "In-memory settings, lost on restart".to_string(),
            factory: Box::new(memory_factory),
        },
    );

    map.insert(
        "file".to_string(),
        KindDefinition {
            kind: "file".to_string(),
            description: "Settings stored in a YAML file".to_string(),
            factory: Box::new(file_factory),
        },
    );

    RwLock::new(map)
});

/// Register a provider kind, replacing any previous one with the same name
///
/// # Example
///
/// ```
/// use settings_core::providers::{
///     register_provider_kind, MemorySettingsProvider, ProviderDefinition, ProviderResult,
///     SettingsProvider,
/// };
/// use std::sync::Arc;
///
/// fn scratch(_: &ProviderDefinition) -> ProviderResult<Arc<dyn SettingsProvider>> {
///     Ok(Arc::new(MemorySettingsProvider::new()))
/// }
///
/// register_provider_kind("scratch", "Throwaway in-memory store", Box::new(scratch));
/// ```
pub fn register_provider_kind(kind: &str, description: &str, factory: ProviderFactory) {
    REGISTRY.write().insert(
        kind.to_string(),
        KindDefinition {
            kind: kind.to_string(),
            description: description.to_string(),
            factory,
        },
    );
}

/// Create a provider from its definition
///
/// Returns `None` when the kind is not registered.
pub fn create_provider(def: &ProviderDefinition) -> Option<ProviderResult<Arc<dyn SettingsProvider>>> {
    let registry = REGISTRY.read();
    registry.get(&def.kind).map(|kind| (kind.factory)(def))
}

/// List registered kinds as (kind, description) pairs
pub fn list_provider_kinds() -> Vec<(String, String)> {
    REGISTRY
        .read()
        .values()
        .map(|def| (def.kind.clone(), def.description.clone()))
        .collect()
}

pub fn has_provider_kind(kind: &str) -> bool {
    REGISTRY.read().contains_key(kind)
}

/// Unregister a provider kind (mainly for testing)
pub fn unregister_provider_kind(kind: &str) -> bool {
    REGISTRY.write().remove(kind).is_some()
}
