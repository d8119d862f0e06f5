//! Domain model

use serde::{Deserialize, Serialize};

/// A named, prioritized grouping of settings
///
/// When several providers report a domain with the same name, the instance
/// with the highest `priority` wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainModel {
    /// Grouping key
    pub name: String,
    /// Whether settings in this domain are active
    #[serde(default)]
    pub enabled: bool,
    /// Higher wins when domains collide by name
    #[serde(default)]
    pub priority: i64,
    /// Whether the domain should be treated as read-only by callers
    #[serde(default)]
    pub read_only: bool,
}

impl DomainModel {
    /// Name used when a setting does not declare a domain
    pub const DEFAULT_NAME: &'static str = "default";

    /// Create a disabled, writable domain with priority 0
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enabled: false,
            priority: 0,
            read_only: false,
        }
    }

    /// Set the enabled flag
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set the priority
    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = priority;
        self
    }

    /// Mark the domain read-only
    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }
}

impl Default for DomainModel {
    fn default() -> Self {
        Self::new(Self::DEFAULT_NAME)
    }
}
