//! Settings Core
//!
//! Layered settings resolution. Settings live in domains and are served by an
//! ordered chain of providers (files, memory, per-client cookies, ...). The
//! [`SettingsResolver`] merges what the chain reports, routes writes to the
//! first provider willing to accept them and announces every change through an
//! [`EventDispatcher`].
//!
//! ```rust,ignore
//! use settings_core::{RequestContext, SettingsConfig, SettingsResolver};
//!
//! let config = SettingsConfig::load(None)?;
//! let cache = config.settings_cache()?.expect("cache configured");
//!
//! // Per request: the shared chain plus this client's cookie
//! let request = RequestContext::from_cookie_header(cookie_header);
//! let cookie = cache.begin_request(&request);
//! let mut builder = SettingsResolver::builder();
//! for (name, provider) in chain.iter().cloned() {
//!     builder = builder.provider(name, provider);
//! }
//! let resolver = builder.provider("cookie", cookie.clone()).build()?;
//!
//! resolver.save(&mut setting).await;
//! if let Some(instruction) = cookie.finish_request(&request) {
//!     response.add_header("Set-Cookie", instruction.to_header_value());
//! }
//! ```

pub mod types;
pub mod providers;
pub mod events;
pub mod resolver;
pub mod cache;
pub mod config;
pub mod logging;

// Re-export commonly used types
pub use types::{DomainModel, SettingModel, SettingType};

pub use providers::{
    SettingsProvider, ProviderError, ProviderResult,
    MemorySettingsProvider, FileSettingsProvider, MockSettingsProvider,
    ProviderDefinition, register_provider_kind, create_provider, list_provider_kinds,
};

pub use events::{SettingEvent, EventDispatcher, NoOpDispatcher, RecordingDispatcher, ChannelDispatcher};

pub use resolver::{SettingsResolver, SettingsResolverBuilder, SettingsError, SettingsResult};

pub use cache::{
    SettingsCache, AuthenticatedCacheProvider, CacheConfig,
    RequestContext, CookieInstruction, SetCookie,
    TokenCodec, TokenError,
};

pub use config::{SettingsConfig, ConfigError, ConfigResult};
