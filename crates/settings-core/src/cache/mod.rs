//! Signed cookie cache
//!
//! Lets a client carry its own settings between requests. The settings are
//! serialized into an authenticated, encrypted token stored in a cookie; the
//! server keeps no per-client state. A request-scoped
//! [`AuthenticatedCacheProvider`] exposes the token's content as an ordinary
//! provider in the resolver chain and produces the cookie change for the
//! response when the request ends.

mod config;
mod cookie;
mod provider;
mod token;

pub use config::CacheConfig;
pub use cookie::{CookieInstruction, RequestContext, SetCookie};
pub use provider::{AuthenticatedCacheProvider, SettingsCache};
pub use token::{TokenClaims, TokenCodec, TokenError, TokenResult};
