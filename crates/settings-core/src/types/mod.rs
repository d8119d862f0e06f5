//! Core types shared by providers, the resolver and the cache
//!
//! Settings and domains are plain data records. Providers create them on read,
//! the resolver stamps the source provider onto them, and nothing here persists
//! anything by itself.

mod setting;
mod domain;

pub use setting::{SettingModel, SettingType};
pub use domain::DomainModel;
