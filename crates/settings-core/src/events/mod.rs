//! Change notifications emitted by the resolver
//!
//! The resolver never knows who listens. It hands every change to an
//! [`EventDispatcher`]; the built-in dispatchers drop, record or broadcast
//! them.

mod dispatcher;

pub use dispatcher::{EventDispatcher, NoOpDispatcher, RecordingDispatcher, ChannelDispatcher};

use crate::types::{DomainModel, SettingModel};

/// A change made through the resolver
#[derive(Debug, Clone, PartialEq)]
pub enum SettingEvent {
    /// A setting was written to the first provider that accepted it
    Registered(SettingModel),
    /// A bound setting was written back to its own provider
    Updated(SettingModel),
    /// A setting was removed from at least one provider
    Deleted(SettingModel),
    DomainUpdated(DomainModel),
    DomainDeleted(String),
}

impl SettingEvent {
    /// Stable identifier of the event kind
    pub fn name(&self) -> &'static str {
        match self {
            SettingEvent::Registered(_) => "settings_manager.setting.registered",
            SettingEvent::Updated(_) => "settings_manager.setting.updated",
            SettingEvent::Deleted(_) => "settings_manager.setting.deleted",
            SettingEvent::DomainUpdated(_) => "settings_manager.domain.updated",
            SettingEvent::DomainDeleted(_) => "settings_manager.domain.deleted",
        }
    }

    /// The affected setting, for setting events
    pub fn setting(&self) -> Option<&SettingModel> {
        match self {
            SettingEvent::Registered(s) | SettingEvent::Updated(s) | SettingEvent::Deleted(s) => Some(s),
            _ => None,
        }
    }
}
