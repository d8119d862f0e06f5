//! Settings resolver over an ordered provider chain
//!
//! Chain order matters:
//! - `get_settings_by_name` walks the chain backwards, so the provider
//!   registered last answers first, and stops once every name is found.
//! - `get_settings_by_domain` walks forwards; later providers overwrite
//!   earlier ones for the same setting name.
//! - Writes walk forwards and stop at the first provider that accepts them.
//!   A setting bound to a provider skips every provider before it.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::error::{SettingsError, SettingsResult};
use crate::events::{EventDispatcher, NoOpDispatcher, SettingEvent};
use crate::providers::{ProviderError, SettingsProvider};
use crate::types::{DomainModel, SettingModel};

/// Ordered (name, provider) pairs
pub type ProviderChain = Vec<(String, Arc<dyn SettingsProvider>)>;

/// Builder for [`SettingsResolver`]
#[derive(Default)]
pub struct SettingsResolverBuilder {
    providers: ProviderChain,
    dispatcher: Option<Arc<dyn EventDispatcher>>,
}

impl SettingsResolverBuilder {
    /// Append a provider to the end of the chain
    pub fn provider(mut self, name: impl Into<String>, provider: Arc<dyn SettingsProvider>) -> Self {
        self.providers.push((name.into(), provider));
        self
    }

    /// Set the event dispatcher (default: drop events)
    pub fn dispatcher(mut self, dispatcher: Arc<dyn EventDispatcher>) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    /// Freeze the chain
    ///
    /// Fails if two providers share a name.
    pub fn build(self) -> SettingsResult<SettingsResolver> {
        for (i, (name, _)) in self.providers.iter().enumerate() {
            if self.providers[..i].iter().any(|(other, _)| other == name) {
                return Err(SettingsError::DuplicateProvider(name.clone()));
            }
        }

        Ok(SettingsResolver {
            providers: self.providers,
            dispatcher: self.dispatcher.unwrap_or_else(|| Arc::new(NoOpDispatcher)),
        })
    }
}

/// Aggregates settings from an ordered chain of providers
///
/// The chain is fixed at build time. The resolver holds no other state and
/// takes no locks of its own, so it can be shared freely between tasks.
///
/// # Example
///
/// ```
/// use settings_core::providers::MemorySettingsProvider;
/// use settings_core::resolver::SettingsResolver;
/// use std::sync::Arc;
///
/// let resolver = SettingsResolver::builder()
///     .provider("defaults", Arc::new(MemorySettingsProvider::read_only(vec![])))
///     .provider("runtime", Arc::new(MemorySettingsProvider::new()))
///     .build()
///     .unwrap();
/// assert_eq!(resolver.provider_names(), vec!["defaults", "runtime"]);
/// ```
pub struct SettingsResolver {
    providers: ProviderChain,
    dispatcher: Arc<dyn EventDispatcher>,
}

impl SettingsResolver {
    pub fn builder() -> SettingsResolverBuilder {
        SettingsResolverBuilder::default()
    }

    /// Providers in chain order
    pub fn providers(&self) -> &[(String, Arc<dyn SettingsProvider>)] {
        &self.providers
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Look up a provider by name
    pub fn get_provider(&self, name: &str) -> SettingsResult<Arc<dyn SettingsProvider>> {
        self.find_provider(name)
            .ok_or_else(|| SettingsError::ProviderNotFound(name.to_string()))
    }

    fn find_provider(&self, name: &str) -> Option<Arc<dyn SettingsProvider>> {
        self.providers
            .iter()
            .find(|(pname, _)| pname == name)
            .map(|(_, provider)| Arc::clone(provider))
    }

    /// Domains merged by name, keeping the highest priority
    ///
    /// With `provider_name` only that provider is consulted and its errors are
    /// returned. Otherwise every provider is asked in chain order; a failing
    /// provider is logged and skipped. When two instances share both name and
    /// priority, the one seen last in chain order wins.
    pub async fn get_domains(
        &self,
        provider_name: Option<&str>,
        only_enabled: bool,
    ) -> SettingsResult<BTreeMap<String, DomainModel>> {
        let mut domains: BTreeMap<String, DomainModel> = BTreeMap::new();

        let reported = match provider_name {
            Some(name) => {
                let provider = self.get_provider(name)?;
                provider
                    .get_domains(only_enabled)
                    .await
                    .map_err(|e| SettingsError::provider(name, e))?
            }
            None => {
                let mut all = Vec::new();
                for (name, provider) in &self.providers {
                    match provider.get_domains(only_enabled).await {
                        Ok(found) => all.extend(found),
                        Err(e) => warn!(provider = %name, error = %e, "failed to read domains, skipping provider"),
                    }
                }
                all
            }
        };

        for domain in reported {
            let wins = domains
                .get(&domain.name)
                .map_or(true, |existing| existing.priority <= domain.priority);
            if wins {
                domains.insert(domain.name.clone(), domain);
            }
        }

        Ok(domains)
    }

    /// Enabled domains across the whole chain
    pub async fn get_enabled_domains(&self) -> SettingsResult<BTreeMap<String, DomainModel>> {
        self.get_domains(None, true).await
    }

    /// Settings by name, answered by the last-registered provider first
    ///
    /// Each name is taken from the first provider (in reverse chain order)
    /// that reports it; providers further down are only asked for names that
    /// are still missing, and not asked at all once everything is found.
    /// Every returned setting is bound to the provider it came from.
    pub async fn get_settings_by_name(
        &self,
        domain_names: &[String],
        setting_names: &[String],
    ) -> Vec<SettingModel> {
        let mut outstanding: Vec<String> = Vec::new();
        for name in setting_names {
            if !outstanding.contains(name) {
                outstanding.push(name.clone());
            }
        }

        let mut settings = Vec::new();
        if outstanding.is_empty() {
            return settings;
        }

        for (pname, provider) in self.providers.iter().rev() {
            let found = match provider.get_settings_by_name(domain_names, &outstanding).await {
                Ok(found) => found,
                Err(e) => {
                    warn!(provider = %pname, settings = ?outstanding, error = %e, "failed to read settings, skipping provider");
                    continue;
                }
            };

            // A provider may report the same name in several domains
            let mut found_here: Vec<String> = Vec::new();
            for mut setting in found {
                if let Some(pos) = outstanding.iter().position(|n| *n == setting.name) {
                    outstanding.remove(pos);
                    found_here.push(setting.name.clone());
                } else if !found_here.contains(&setting.name) {
                    warn!(provider = %pname, setting = %setting.name, "received setting that was not requested");
                    continue;
                }

                setting.provider_name = Some(pname.clone());
                settings.push(setting);
            }

            if outstanding.is_empty() {
                break;
            }
        }

        settings
    }

    /// All settings of the given domains, later providers overriding earlier ones
    pub async fn get_settings_by_domain(&self, domain_names: &[String]) -> BTreeMap<String, SettingModel> {
        self.merge_forward(domain_names, |_| true).await
    }

    /// Like [`get_settings_by_domain`](Self::get_settings_by_domain), restricted to settings tagged `tag_name`
    pub async fn get_enabled_settings_by_tag(
        &self,
        domain_names: &[String],
        tag_name: &str,
    ) -> BTreeMap<String, SettingModel> {
        self.merge_forward(domain_names, |setting| setting.has_tag(tag_name)).await
    }

    async fn merge_forward(
        &self,
        domain_names: &[String],
        keep: impl Fn(&SettingModel) -> bool,
    ) -> BTreeMap<String, SettingModel> {
        let mut settings = BTreeMap::new();

        for (pname, provider) in &self.providers {
            let found = match provider.get_settings(domain_names).await {
                Ok(found) => found,
                Err(e) => {
                    warn!(provider = %pname, domains = ?domain_names, error = %e, "failed to read settings, skipping provider");
                    continue;
                }
            };

            for mut setting in found.into_iter().filter(|s| keep(s)) {
                setting.provider_name = Some(pname.clone());
                settings.insert(setting.name.clone(), setting);
            }
        }

        settings
    }

    /// Write a setting to the first provider that accepts it
    ///
    /// A bound setting is only offered to its own provider and the ones after
    /// it; if the bound provider is not in the chain nothing is eligible.
    /// Read-only providers are skipped, and a provider that refuses or fails
    /// simply hands over to the next one. On success the setting is bound to
    /// the accepting provider and a `Registered` event is emitted.
    pub async fn save(&self, setting: &mut SettingModel) -> bool {
        if !setting.kind.accepts(&setting.data) {
            debug!(setting = %setting.name, kind = %setting.kind, "payload does not match setting type");
        }

        let bound = setting.provider_name.clone();
        let mut closed = bound.is_some();

        for (pname, provider) in &self.providers {
            if closed {
                if bound.as_deref() == Some(pname.as_str()) {
                    closed = false;
                } else {
                    continue;
                }
            }

            if provider.is_read_only() {
                continue;
            }

            match provider.save(setting).await {
                Ok(true) => {
                    setting.provider_name = Some(pname.clone());
                    info!(
                        setting = %setting.name,
                        kind = %setting.kind,
                        value = %setting.data,
                        domain = %setting.domain.name,
                        domain_read_only = setting.domain.read_only,
                        provider = %pname,
                        "setting saved"
                    );
                    self.dispatcher.dispatch(SettingEvent::Registered(setting.clone()));
                    return true;
                }
                Ok(false) => debug!(provider = %pname, setting = %setting.name, "provider declined setting"),
                Err(e) => log_write_refusal(pname, &setting.name, &e),
            }
        }

        false
    }

    /// Write a setting back to its own provider, falling back to [`save`](Self::save)
    ///
    /// The fallback runs when the setting is unbound, its provider is not in
    /// the chain, or its provider does not accept the write. The fallback may
    /// bind the setting to a different provider.
    pub async fn update(&self, setting: &mut SettingModel) -> bool {
        if let Some(pname) = setting.provider_name.clone() {
            match self.find_provider(&pname) {
                Some(provider) => match provider.save(setting).await {
                    Ok(true) => {
                        info!(
                            setting = %setting.name,
                            kind = %setting.kind,
                            value = %setting.data,
                            domain = %setting.domain.name,
                            domain_read_only = setting.domain.read_only,
                            provider = %pname,
                            "setting updated"
                        );
                        self.dispatcher.dispatch(SettingEvent::Updated(setting.clone()));
                        return true;
                    }
                    Ok(false) => debug!(provider = %pname, setting = %setting.name, "provider declined update"),
                    Err(e) => log_write_refusal(&pname, &setting.name, &e),
                },
                None => warn!(provider = %pname, setting = %setting.name, "bound provider is not in the chain"),
            }
        }

        self.save(setting).await
    }

    /// Remove a setting
    ///
    /// A bound setting is removed from its own provider only, and errors other
    /// than a read-only refusal are returned. An unbound setting is removed
    /// from every provider; it counts as deleted if any of them removed it.
    pub async fn delete(&self, setting: &SettingModel) -> SettingsResult<bool> {
        let changed = match setting.provider_name.as_deref() {
            Some(pname) => match self.find_provider(pname) {
                Some(provider) => match provider.delete(setting).await {
                    Ok(deleted) => deleted,
                    Err(e) if e.is_read_only() => false,
                    Err(e) => return Err(SettingsError::provider(pname, e)),
                },
                None => {
                    warn!(provider = %pname, setting = %setting.name, "bound provider is not in the chain");
                    false
                }
            },
            None => {
                let mut changed = false;
                for (pname, provider) in &self.providers {
                    match provider.delete(setting).await {
                        Ok(true) => changed = true,
                        Ok(false) => {}
                        Err(e) => log_write_refusal(pname, &setting.name, &e),
                    }
                }
                changed
            }
        };

        if changed {
            info!(
                setting = %setting.name,
                domain = %setting.domain.name,
                provider = ?setting.provider_name,
                "setting deleted"
            );
            self.dispatcher.dispatch(SettingEvent::Deleted(setting.clone()));
        }

        Ok(changed)
    }

    /// Save every setting of a domain into one provider
    ///
    /// Used to seed or migrate a provider. The settings are read with
    /// [`get_settings_by_domain`](Self::get_settings_by_domain) and written
    /// directly, bypassing write routing. Returns how many were accepted.
    pub async fn copy_domain_to_provider(&self, domain_name: &str, provider_name: &str) -> SettingsResult<usize> {
        let provider = self.get_provider(provider_name)?;
        let settings = self.get_settings_by_domain(&[domain_name.to_string()]).await;

        let mut copied = 0;
        for setting in settings.values() {
            match provider.save(setting).await {
                Ok(true) => copied += 1,
                Ok(false) => debug!(provider = %provider_name, setting = %setting.name, "provider declined copied setting"),
                Err(e) => warn!(provider = %provider_name, setting = %setting.name, error = %e, "failed to copy setting"),
            }
        }

        info!(domain = %domain_name, provider = %provider_name, copied, total = settings.len(), "domain copied");
        Ok(copied)
    }

    /// Update a domain in one provider, or in every writable provider
    pub async fn update_domain(&self, domain: &DomainModel, provider_name: Option<&str>) -> SettingsResult<()> {
        match provider_name {
            Some(pname) => {
                let provider = self.get_provider(pname)?;
                provider
                    .update_domain(domain)
                    .await
                    .map_err(|e| SettingsError::provider(pname, e))?;
            }
            None => {
                for (pname, provider) in self.providers.iter().filter(|(_, p)| !p.is_read_only()) {
                    if let Err(e) = provider.update_domain(domain).await {
                        warn!(provider = %pname, domain = %domain.name, error = %e, "failed to update domain");
                    }
                }
            }
        }

        info!(
            provider = ?provider_name,
            domain = %domain.name,
            enabled = domain.enabled,
            priority = domain.priority,
            "domain updated"
        );
        self.dispatcher.dispatch(SettingEvent::DomainUpdated(domain.clone()));
        Ok(())
    }

    /// Delete a domain from one provider, or from every writable provider
    pub async fn delete_domain(&self, domain_name: &str, provider_name: Option<&str>) -> SettingsResult<()> {
        match provider_name {
            Some(pname) => {
                let provider = self.get_provider(pname)?;
                provider
                    .delete_domain(domain_name)
                    .await
                    .map_err(|e| SettingsError::provider(pname, e))?;
            }
            None => {
                for (pname, provider) in self.providers.iter().filter(|(_, p)| !p.is_read_only()) {
                    if let Err(e) = provider.delete_domain(domain_name).await {
                        warn!(provider = %pname, domain = %domain_name, error = %e, "failed to delete domain");
                    }
                }
            }
        }

        info!(provider = ?provider_name, domain = %domain_name, "domain deleted");
        self.dispatcher.dispatch(SettingEvent::DomainDeleted(domain_name.to_string()));
        Ok(())
    }
}

impl std::fmt::Debug for SettingsResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettingsResolver")
            .field("providers", &self.provider_names())
            .finish()
    }
}

fn log_write_refusal(provider: &str, setting: &str, error: &ProviderError) {
    if error.is_read_only() {
        debug!(provider = %provider, setting = %setting, "provider is read-only, trying next");
    } else {
        warn!(provider = %provider, setting = %setting, error = %error, "provider failed to write, trying next");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::RecordingDispatcher;
    use crate::providers::{MemorySettingsProvider, MockMode, MockSettingsProvider};
    use crate::types::SettingType;
    use serde_json::json;

    fn domain(name: &str, priority: i64) -> DomainModel {
        DomainModel::new(name).with_enabled(true).with_priority(priority)
    }

    fn setting(name: &str, value: serde_json::Value) -> SettingModel {
        SettingModel::new(name, domain("default", 0), SettingType::Json, value)
    }

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    fn mock(settings: Vec<SettingModel>) -> Arc<MockSettingsProvider> {
        Arc::new(MockSettingsProvider::with_settings(settings))
    }

    #[test]
    fn test_duplicate_provider_names_rejected() {
        let result = SettingsResolver::builder()
            .provider("a", Arc::new(MemorySettingsProvider::new()))
            .provider("a", Arc::new(MemorySettingsProvider::new()))
            .build();
        assert!(matches!(result, Err(SettingsError::DuplicateProvider(name)) if name == "a"));
    }

    #[test]
    fn test_get_provider() {
        let resolver = SettingsResolver::builder()
            .provider("a", Arc::new(MemorySettingsProvider::new()))
            .build()
            .unwrap();

        assert!(resolver.get_provider("a").is_ok());
        assert!(matches!(
            resolver.get_provider("missing"),
            Err(SettingsError::ProviderNotFound(name)) if name == "missing"
        ));
    }

    #[tokio::test]
    async fn test_get_domains_keeps_highest_priority() {
        let with_domain = |priority| {
            Arc::new(MemorySettingsProvider::with_settings(vec![SettingModel::new(
                "foo",
                domain("D", priority),
                SettingType::Bool,
                json!(true),
            )]))
        };

        let resolver = SettingsResolver::builder()
            .provider("p1", with_domain(3))
            .provider("p2", with_domain(7))
            .provider("p3", with_domain(5))
            .build()
            .unwrap();

        let domains = resolver.get_domains(None, false).await.unwrap();
        assert_eq!(domains.len(), 1);
        assert_eq!(domains["D"].priority, 7);

        // Restricted to one provider
        let domains = resolver.get_domains(Some("p3"), false).await.unwrap();
        assert_eq!(domains["D"].priority, 5);

        assert!(matches!(
            resolver.get_domains(Some("nope"), false).await,
            Err(SettingsError::ProviderNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_get_domains_tie_last_seen_wins() {
        let first = SettingModel::new("a", domain("D", 1).with_read_only(false), SettingType::Bool, json!(true));
        let second = SettingModel::new("b", domain("D", 1).with_read_only(true), SettingType::Bool, json!(true));

        let resolver = SettingsResolver::builder()
            .provider("p1", Arc::new(MemorySettingsProvider::with_settings(vec![first])))
            .provider("p2", Arc::new(MemorySettingsProvider::with_settings(vec![second])))
            .build()
            .unwrap();

        let domains = resolver.get_domains(None, false).await.unwrap();
        assert!(domains["D"].read_only);
    }

    #[tokio::test]
    async fn test_get_domains_skips_failing_provider() {
        let failing = Arc::new(MockSettingsProvider::new().with_mode(MockMode::FailReads));
        let resolver = SettingsResolver::builder()
            .provider("broken", failing)
            .provider("ok", mock(vec![setting("foo", json!(1))]))
            .build()
            .unwrap();

        let domains = resolver.get_enabled_domains().await.unwrap();
        assert!(domains.contains_key("default"));

        assert!(matches!(
            resolver.get_domains(Some("broken"), false).await,
            Err(SettingsError::Provider { provider, .. }) if provider == "broken"
        ));
    }

    #[tokio::test]
    async fn test_get_settings_by_name_reverse_order_and_early_stop() {
        let first = mock(vec![setting("foo", json!("first")), setting("bar", json!("first"))]);
        let second = mock(vec![setting("foo", json!("second"))]);
        let third = mock(vec![setting("bar", json!("third"))]);

        let resolver = SettingsResolver::builder()
            .provider("first", first.clone())
            .provider("second", second.clone())
            .provider("third", third.clone())
            .build()
            .unwrap();

        let found = resolver
            .get_settings_by_name(&strings(&["default"]), &strings(&["foo", "bar"]))
            .await;

        assert_eq!(found.len(), 2);
        let bar = found.iter().find(|s| s.name == "bar").unwrap();
        assert_eq!(bar.data, json!("third"));
        assert_eq!(bar.provider_name.as_deref(), Some("third"));
        let foo = found.iter().find(|s| s.name == "foo").unwrap();
        assert_eq!(foo.data, json!("second"));
        assert_eq!(foo.provider_name.as_deref(), Some("second"));

        // Everything was found before reaching the first provider
        assert_eq!(third.by_name_calls(), 1);
        assert_eq!(second.by_name_calls(), 1);
        assert_eq!(first.by_name_calls(), 0);
    }

    #[tokio::test]
    async fn test_get_settings_by_name_missing_and_failing() {
        let first = mock(vec![setting("foo", json!(1))]);
        let broken = Arc::new(MockSettingsProvider::new().with_mode(MockMode::FailReads));

        let resolver = SettingsResolver::builder()
            .provider("first", first.clone())
            .provider("broken", broken.clone())
            .build()
            .unwrap();

        let found = resolver
            .get_settings_by_name(&strings(&["default"]), &strings(&["foo", "missing"]))
            .await;
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].provider_name.as_deref(), Some("first"));
        assert_eq!(broken.by_name_calls(), 1);
        assert_eq!(first.by_name_calls(), 1);

        // Nothing requested, nobody asked
        assert!(resolver.get_settings_by_name(&strings(&["default"]), &[]).await.is_empty());
        assert_eq!(first.by_name_calls(), 1);
    }

    #[tokio::test]
    async fn test_get_settings_by_domain_later_provider_wins() {
        let resolver = SettingsResolver::builder()
            .provider("first", mock(vec![setting("foo", json!(1)), setting("bar", json!(1))]))
            .provider("second", mock(vec![setting("foo", json!(2))]))
            .build()
            .unwrap();

        let settings = resolver.get_settings_by_domain(&strings(&["default"])).await;
        assert_eq!(settings.len(), 2);
        assert_eq!(settings["foo"].data, json!(2));
        assert_eq!(settings["foo"].provider_name.as_deref(), Some("second"));
        assert_eq!(settings["bar"].provider_name.as_deref(), Some("first"));
    }

    #[tokio::test]
    async fn test_get_enabled_settings_by_tag() {
        let resolver = SettingsResolver::builder()
            .provider(
                "first",
                mock(vec![
                    setting("foo", json!(1)).with_tag("beta"),
                    setting("bar", json!(1)),
                ]),
            )
            .provider("second", mock(vec![setting("baz", json!(2)).with_tag("beta")]))
            .build()
            .unwrap();

        let settings = resolver.get_enabled_settings_by_tag(&strings(&["default"]), "beta").await;
        let names: Vec<_> = settings.keys().cloned().collect();
        assert_eq!(names, vec!["baz".to_string(), "foo".to_string()]);
    }

    #[tokio::test]
    async fn test_save_first_writable_provider_wins() {
        let read_only = Arc::new(MockSettingsProvider::new().with_mode(MockMode::ReadOnly));
        let rejecting = Arc::new(MockSettingsProvider::new().with_mode(MockMode::RejectWrites));
        let writable = mock(vec![]);
        let last = mock(vec![]);
        let events = Arc::new(RecordingDispatcher::new());

        let resolver = SettingsResolver::builder()
            .provider("ro", read_only.clone())
            .provider("rejecting", rejecting.clone())
            .provider("writable", writable.clone())
            .provider("last", last.clone())
            .dispatcher(events.clone())
            .build()
            .unwrap();

        let mut foo = setting("foo", json!(true));
        assert!(resolver.save(&mut foo).await);

        assert_eq!(foo.provider_name.as_deref(), Some("writable"));
        assert_eq!(read_only.save_calls(), 0);
        assert_eq!(rejecting.save_calls(), 1);
        assert_eq!(writable.settings().len(), 1);
        assert_eq!(last.save_calls(), 0);
        assert_eq!(events.names(), vec!["settings_manager.setting.registered"]);
    }

    #[tokio::test]
    async fn test_save_bound_skips_earlier_providers() {
        let p1 = mock(vec![]);
        let p2 = Arc::new(MockSettingsProvider::new().with_mode(MockMode::DeclineWrites));
        let p3 = mock(vec![]);

        let resolver = SettingsResolver::builder()
            .provider("p1", p1.clone())
            .provider("p2", p2.clone())
            .provider("p3", p3.clone())
            .build()
            .unwrap();

        let mut foo = setting("foo", json!(1)).with_provider("p2");
        assert!(resolver.save(&mut foo).await);

        assert_eq!(p1.save_calls(), 0);
        assert_eq!(p2.save_calls(), 1);
        assert_eq!(p3.save_calls(), 1);
        assert_eq!(foo.provider_name.as_deref(), Some("p3"));
    }

    #[tokio::test]
    async fn test_save_bound_to_unknown_provider() {
        let p1 = mock(vec![]);
        let events = Arc::new(RecordingDispatcher::new());
        let resolver = SettingsResolver::builder()
            .provider("p1", p1.clone())
            .dispatcher(events.clone())
            .build()
            .unwrap();

        let mut foo = setting("foo", json!(1)).with_provider("gone");
        assert!(!resolver.save(&mut foo).await);
        assert_eq!(p1.save_calls(), 0);
        assert!(events.events().is_empty());
    }

    #[tokio::test]
    async fn test_save_exhausted_chain() {
        let resolver = SettingsResolver::builder()
            .provider("ro", Arc::new(MockSettingsProvider::new().with_mode(MockMode::ReadOnly)))
            .provider("decline", Arc::new(MockSettingsProvider::new().with_mode(MockMode::DeclineWrites)))
            .build()
            .unwrap();

        let mut foo = setting("foo", json!(1));
        assert!(!resolver.save(&mut foo).await);
        assert!(foo.provider_name.is_none());
    }

    #[tokio::test]
    async fn test_update_bound_provider() {
        let p1 = mock(vec![]);
        let p2 = mock(vec![]);
        let events = Arc::new(RecordingDispatcher::new());

        let resolver = SettingsResolver::builder()
            .provider("p1", p1.clone())
            .provider("p2", p2.clone())
            .dispatcher(events.clone())
            .build()
            .unwrap();

        let mut foo = setting("foo", json!(1)).with_provider("p2");
        assert!(resolver.update(&mut foo).await);

        assert_eq!(p1.save_calls(), 0);
        assert_eq!(p2.settings().len(), 1);
        assert_eq!(events.names(), vec!["settings_manager.setting.updated"]);
    }

    #[tokio::test]
    async fn test_update_falls_back_and_rebinds() {
        let p1 = Arc::new(MockSettingsProvider::new().with_mode(MockMode::RejectWrites));
        let p2 = mock(vec![]);
        let events = Arc::new(RecordingDispatcher::new());

        let resolver = SettingsResolver::builder()
            .provider("p1", p1.clone())
            .provider("p2", p2.clone())
            .dispatcher(events.clone())
            .build()
            .unwrap();

        let mut foo = setting("foo", json!(1)).with_provider("p1");
        assert!(resolver.update(&mut foo).await);

        // Direct attempt plus the save broadcast
        assert_eq!(p1.save_calls(), 2);
        assert_eq!(foo.provider_name.as_deref(), Some("p2"));
        assert_eq!(events.names(), vec!["settings_manager.setting.registered"]);
    }

    #[tokio::test]
    async fn test_update_unbound_is_save() {
        let p1 = mock(vec![]);
        let resolver = SettingsResolver::builder().provider("p1", p1.clone()).build().unwrap();

        let mut foo = setting("foo", json!(1));
        assert!(resolver.update(&mut foo).await);
        assert_eq!(foo.provider_name.as_deref(), Some("p1"));
    }

    #[tokio::test]
    async fn test_delete_unbound_any_provider_counts() {
        let p1 = mock(vec![]);
        let p2 = mock(vec![setting("foo", json!(1))]);
        let p3 = mock(vec![]);
        let events = Arc::new(RecordingDispatcher::new());

        let resolver = SettingsResolver::builder()
            .provider("p1", p1.clone())
            .provider("p2", p2.clone())
            .provider("p3", p3.clone())
            .dispatcher(events.clone())
            .build()
            .unwrap();

        assert!(resolver.delete(&setting("foo", json!(1))).await.unwrap());
        assert_eq!(p1.delete_calls(), 1);
        assert_eq!(p2.delete_calls(), 1);
        assert_eq!(p3.delete_calls(), 1);
        assert!(p2.settings().is_empty());
        assert_eq!(events.names(), vec!["settings_manager.setting.deleted"]);

        // Nothing left to delete, no event
        assert!(!resolver.delete(&setting("foo", json!(1))).await.unwrap());
        assert_eq!(events.events().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_bound_only_touches_its_provider() {
        let p1 = mock(vec![setting("foo", json!(1))]);
        let p2 = mock(vec![setting("foo", json!(2))]);

        let resolver = SettingsResolver::builder()
            .provider("p1", p1.clone())
            .provider("p2", p2.clone())
            .build()
            .unwrap();

        let bound = setting("foo", json!(2)).with_provider("p2");
        assert!(resolver.delete(&bound).await.unwrap());
        assert_eq!(p1.delete_calls(), 0);
        assert_eq!(p1.settings().len(), 1);
        assert!(p2.settings().is_empty());

        let unknown = setting("foo", json!(1)).with_provider("gone");
        assert!(!resolver.delete(&unknown).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_broadcast_survives_read_only() {
        let resolver = SettingsResolver::builder()
            .provider("ro", Arc::new(MockSettingsProvider::new().with_mode(MockMode::ReadOnly)))
            .provider("rw", mock(vec![setting("foo", json!(1))]))
            .build()
            .unwrap();

        assert!(resolver.delete(&setting("foo", json!(1))).await.unwrap());
    }

    #[tokio::test]
    async fn test_copy_domain_to_provider() {
        let source = mock(vec![setting("foo", json!(1)), setting("bar", json!(2))]);
        let target = mock(vec![]);

        let resolver = SettingsResolver::builder()
            .provider("source", source)
            .provider("target", target.clone())
            .build()
            .unwrap();

        assert_eq!(resolver.copy_domain_to_provider("default", "target").await.unwrap(), 2);
        assert_eq!(target.settings().len(), 2);

        assert!(matches!(
            resolver.copy_domain_to_provider("default", "nope").await,
            Err(SettingsError::ProviderNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_update_domain_broadcast_skips_read_only() {
        let ro = Arc::new(MockSettingsProvider::with_settings(vec![setting("foo", json!(1))]).with_mode(MockMode::ReadOnly));
        let rw = mock(vec![setting("foo", json!(1))]);
        let events = Arc::new(RecordingDispatcher::new());

        let resolver = SettingsResolver::builder()
            .provider("ro", ro.clone())
            .provider("rw", rw.clone())
            .dispatcher(events.clone())
            .build()
            .unwrap();

        let updated = domain("default", 9);
        resolver.update_domain(&updated, None).await.unwrap();

        assert_eq!(ro.calls().update_domain.load(std::sync::atomic::Ordering::SeqCst), 0);
        assert_eq!(rw.settings()[0].domain.priority, 9);
        assert_eq!(events.names(), vec!["settings_manager.domain.updated"]);
    }

    #[tokio::test]
    async fn test_targeted_domain_operations() {
        let ro = Arc::new(MockSettingsProvider::new().with_mode(MockMode::ReadOnly));
        let rw = mock(vec![setting("foo", json!(1))]);

        let resolver = SettingsResolver::builder()
            .provider("ro", ro)
            .provider("rw", rw.clone())
            .build()
            .unwrap();

        // Targeted calls surface the provider's refusal
        assert!(matches!(
            resolver.update_domain(&domain("default", 1), Some("ro")).await,
            Err(SettingsError::Provider { provider, source: ProviderError::ReadOnly }) if provider == "ro"
        ));
        assert!(matches!(
            resolver.delete_domain("default", Some("missing")).await,
            Err(SettingsError::ProviderNotFound(_))
        ));

        resolver.delete_domain("default", Some("rw")).await.unwrap();
        assert!(rw.settings().is_empty());
    }

    #[tokio::test]
    async fn test_delete_domain_broadcast() {
        let p1 = mock(vec![setting("foo", json!(1))]);
        let p2 = mock(vec![setting("bar", json!(1))]);
        let events = Arc::new(RecordingDispatcher::new());

        let resolver = SettingsResolver::builder()
            .provider("p1", p1.clone())
            .provider("p2", p2.clone())
            .dispatcher(events.clone())
            .build()
            .unwrap();

        resolver.delete_domain("default", None).await.unwrap();
        assert!(p1.settings().is_empty());
        assert!(p2.settings().is_empty());
        assert_eq!(
            events.events(),
            vec![SettingEvent::DomainDeleted("default".to_string())]
        );
    }
}
