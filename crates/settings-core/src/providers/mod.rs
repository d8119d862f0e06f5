//! Settings providers
//!
//! Every backend the resolver can read from or write to implements
//! [`SettingsProvider`]. Built-in implementations:
//! - `MemorySettingsProvider`: in-memory list, also the base of the cookie cache
//! - `FileSettingsProvider`: YAML file on disk
//! - `MockSettingsProvider`: instrumented provider for tests
//!
//! The registry maps provider kinds to factories so chains can be assembled
//! from configuration.

mod traits;
mod error;
mod memory;
mod file;
mod mock;
mod registry;

pub use traits::SettingsProvider;
pub use error::{ProviderError, ProviderResult};
pub use memory::{MemorySettingsProvider, SettingSet};
pub use file::{FileSettingsProvider, SettingsFile};
pub use mock::{MockSettingsProvider, MockMode, CallCounts};
pub use registry::{
    register_provider_kind, create_provider, list_provider_kinds, has_provider_kind,
    unregister_provider_kind, ProviderDefinition, ProviderFactory, KindDefinition,
};
