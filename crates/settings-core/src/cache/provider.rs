//! Settings provider backed by a signed cookie
//!
//! One [`SettingsCache`] lives for the whole application. Every top-level
//! request gets its own [`AuthenticatedCacheProvider`] from
//! [`SettingsCache::begin_request`], which is composed into that request's
//! resolver and dropped after [`AuthenticatedCacheProvider::finish_request`].
//! Nothing mutable is shared between requests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, error, warn};

use super::config::CacheConfig;
use super::cookie::{CookieInstruction, RequestContext, SetCookie};
use super::token::TokenCodec;
use crate::config::{ConfigError, ConfigResult};
use crate::providers::{MemorySettingsProvider, ProviderResult, SettingsProvider};
use crate::types::{DomainModel, SettingModel};

/// Application-wide half of the cookie cache: configuration and key
pub struct SettingsCache {
    config: CacheConfig,
    codec: TokenCodec,
}

impl SettingsCache {
    /// Validate the configuration and derive the token key
    pub fn new(config: CacheConfig) -> ConfigResult<Self> {
        config.validate()?;
        let codec = TokenCodec::new(
            &config.key_material,
            config.issuer.clone(),
            config.subject.clone(),
            config.footer.clone(),
        )
        .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        Ok(Self { config, codec })
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Start a request: create its provider and hydrate it from the cookie
    pub fn begin_request(self: &Arc<Self>, request: &RequestContext) -> Arc<AuthenticatedCacheProvider> {
        self.begin_request_at(request, Utc::now())
    }

    /// [`begin_request`](Self::begin_request) with an explicit clock
    ///
    /// Sub-requests and requests without the cookie start empty. A cookie that
    /// fails to open (bad key, tampered, expired, wrong issuer or subject,
    /// unreadable payload) is logged and ignored.
    pub fn begin_request_at(self: &Arc<Self>, request: &RequestContext, now: DateTime<Utc>) -> Arc<AuthenticatedCacheProvider> {
        let provider = AuthenticatedCacheProvider::empty(Arc::clone(self));

        if !request.is_main_request() {
            return Arc::new(provider);
        }

        let Some(raw_token) = request.cookie(&self.config.cookie_name) else {
            return Arc::new(provider);
        };

        match self.codec.decode(raw_token, now) {
            Ok(settings) => {
                debug!(cookie = %self.config.cookie_name, count = settings.len(), "settings restored from cookie");
                provider.inner.replace_settings(settings);
            }
            Err(e) => {
                warn!(cookie = %self.config.cookie_name, error = %e, "failed to parse settings cookie, ignoring it");
            }
        }

        Arc::new(provider)
    }
}

impl std::fmt::Debug for SettingsCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettingsCache")
            .field("config", &self.config)
            .finish()
    }
}

/// Request-scoped provider whose settings travel in a signed cookie
///
/// Reads and writes behave like [`MemorySettingsProvider`]. Every successful
/// write marks the provider changed; only a changed provider touches the
/// cookie when the request finishes.
#[derive(Debug)]
pub struct AuthenticatedCacheProvider {
    cache: Arc<SettingsCache>,
    inner: MemorySettingsProvider,
    changed: AtomicBool,
}

impl AuthenticatedCacheProvider {
    fn empty(cache: Arc<SettingsCache>) -> Self {
        Self {
            cache,
            inner: MemorySettingsProvider::new(),
            changed: AtomicBool::new(false),
        }
    }

    /// Whether any write succeeded during this request
    pub fn is_changed(&self) -> bool {
        self.changed.load(Ordering::SeqCst)
    }

    /// Snapshot of the settings this request currently holds
    pub fn settings(&self) -> Vec<SettingModel> {
        self.inner.settings()
    }

    fn track(&self, result: ProviderResult<bool>) -> ProviderResult<bool> {
        if let Ok(true) = result {
            self.changed.store(true, Ordering::SeqCst);
        }
        result
    }

    /// Finish the request: produce the cookie change for the response, if any
    pub fn finish_request(&self, request: &RequestContext) -> Option<CookieInstruction> {
        self.finish_request_at(request, Utc::now())
    }

    /// [`finish_request`](Self::finish_request) with an explicit clock
    ///
    /// Returns `None` for sub-requests and when nothing was written, which
    /// leaves the client's cookie as it is. With no settings left the cookie
    /// is cleared if the client sent one; otherwise a fresh token valid for
    /// the configured ttl is issued.
    pub fn finish_request_at(&self, request: &RequestContext, now: DateTime<Utc>) -> Option<CookieInstruction> {
        if !request.is_main_request() || !self.is_changed() {
            return None;
        }

        let config = &self.cache.config;
        let settings = self.inner.settings();

        if settings.is_empty() {
            if request.has_cookie(&config.cookie_name) {
                return Some(CookieInstruction::Clear {
                    name: config.cookie_name.clone(),
                    path: config.path.clone(),
                    domain: config.domain.clone(),
                });
            }
            return None;
        }

        let ttl = Duration::seconds(i64::from(config.ttl));
        match self.cache.codec.encode(&settings, now, ttl) {
            Ok(token) => Some(CookieInstruction::Set(SetCookie {
                name: config.cookie_name.clone(),
                value: token,
                expires: now + ttl,
                max_age: config.ttl,
                path: config.path.clone(),
                domain: config.domain.clone(),
            })),
            Err(e) => {
                error!(cookie = %config.cookie_name, error = %e, "failed to build settings cookie");
                None
            }
        }
    }
}

#[async_trait]
impl SettingsProvider for AuthenticatedCacheProvider {
    async fn get_domains(&self, only_enabled: bool) -> ProviderResult<Vec<DomainModel>> {
        self.inner.get_domains(only_enabled).await
    }

    async fn get_settings(&self, domain_names: &[String]) -> ProviderResult<Vec<SettingModel>> {
        self.inner.get_settings(domain_names).await
    }

    async fn get_settings_by_name(
        &self,
        domain_names: &[String],
        setting_names: &[String],
    ) -> ProviderResult<Vec<SettingModel>> {
        self.inner.get_settings_by_name(domain_names, setting_names).await
    }

    async fn save(&self, setting: &SettingModel) -> ProviderResult<bool> {
        let result = self.inner.save(setting).await;
        self.track(result)
    }

    async fn delete(&self, setting: &SettingModel) -> ProviderResult<bool> {
        let result = self.inner.delete(setting).await;
        self.track(result)
    }

    async fn update_domain(&self, domain: &DomainModel) -> ProviderResult<bool> {
        let result = self.inner.update_domain(domain).await;
        self.track(result)
    }

    async fn delete_domain(&self, domain_name: &str) -> ProviderResult<bool> {
        let result = self.inner.delete_domain(domain_name).await;
        self.track(result)
    }
}
