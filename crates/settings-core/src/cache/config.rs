//! Cookie cache configuration

use serde::{Deserialize, Serialize};

use crate::config::{ConfigError, ConfigResult};

/// Settings for the signed cookie cache
///
/// The key material has no default: it must be provisioned per deployment
/// (see `SETTINGS_CACHE_KEY` in [`crate::config`]).
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Secret the symmetric token key is derived from
    pub key_material: String,
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    /// Token and cookie lifetime in seconds
    #[serde(default = "default_ttl")]
    pub ttl: u32,
    #[serde(default = "default_issuer")]
    pub issuer: String,
    #[serde(default = "default_subject")]
    pub subject: String,
    /// Authenticated but unencrypted trailer of the token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footer: Option<String>,
    #[serde(default = "default_path")]
    pub path: String,
    /// Cookie domain; host-only when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
}

fn default_cookie_name() -> String {
    "stn".to_string()
}

fn default_ttl() -> u32 {
    86400
}

fn default_issuer() -> String {
    "settings_manager".to_string()
}

fn default_subject() -> String {
    "cookie_provider".to_string()
}

fn default_path() -> String {
    "/".to_string()
}

impl CacheConfig {
    pub fn new(key_material: impl Into<String>) -> Self {
        Self {
            key_material: key_material.into(),
            cookie_name: default_cookie_name(),
            ttl: default_ttl(),
            issuer: default_issuer(),
            subject: default_subject(),
            footer: None,
            path: default_path(),
            domain: None,
        }
    }

    pub fn with_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.cookie_name = name.into();
        self
    }

    pub fn with_ttl(mut self, ttl: u32) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = issuer.into();
        self
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    pub fn with_footer(mut self, footer: impl Into<String>) -> Self {
        self.footer = Some(footer.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.key_material.is_empty() {
            return Err(ConfigError::Invalid("cache key material must not be empty".to_string()));
        }
        if self.cookie_name.is_empty() {
            return Err(ConfigError::Invalid("cache cookie name must not be empty".to_string()));
        }
        if self.ttl == 0 {
            return Err(ConfigError::Invalid("cache ttl must be positive".to_string()));
        }
        Ok(())
    }
}

// Keeps the key material out of logs
impl std::fmt::Debug for CacheConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheConfig")
            .field("key_material", &"<redacted>")
            .field("cookie_name", &self.cookie_name)
            .field("ttl", &self.ttl)
            .field("issuer", &self.issuer)
            .field("subject", &self.subject)
            .field("footer", &self.footer)
            .field("path", &self.path)
            .field("domain", &self.domain)
            .finish()
    }
}
