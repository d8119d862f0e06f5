//! Engine configuration
//!
//! A YAML file lists the provider chain in order and, optionally, the cookie
//! cache. Default location is `~/.config/settings-manager/config.yaml` (or the
//! platform equivalent). Two environment variables override the cache:
//! - `SETTINGS_CACHE_KEY`: key material
//! - `SETTINGS_CACHE_TTL`: token and cookie lifetime in seconds

mod error;
mod settings_config;

pub use error::{ConfigError, ConfigResult};
pub use settings_config::{SettingsConfig, CACHE_KEY_ENV, CACHE_TTL_ENV};
