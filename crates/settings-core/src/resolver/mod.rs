//! Resolution of settings across an ordered chain of providers
//!
//! The [`SettingsResolver`] merges reads from every provider in the chain,
//! routes writes to the first provider willing to take them, and reports
//! every change to an event dispatcher.

mod error;
mod settings_resolver;

pub use error::{SettingsError, SettingsResult};
pub use settings_resolver::{SettingsResolver, SettingsResolverBuilder, ProviderChain};
