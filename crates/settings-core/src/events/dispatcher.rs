//! Event dispatcher implementations

use parking_lot::Mutex;
use tokio::sync::broadcast;

use super::SettingEvent;

/// Receives every change made through the resolver
pub trait EventDispatcher: Send + Sync {
    fn dispatch(&self, event: SettingEvent);
}

/// Dispatcher that drops every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpDispatcher;

impl EventDispatcher for NoOpDispatcher {
    fn dispatch(&self, _event: SettingEvent) {}
}

/// Dispatcher that keeps every event in memory
#[derive(Debug, Default)]
pub struct RecordingDispatcher {
    events: Mutex<Vec<SettingEvent>>,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events received so far
    pub fn events(&self) -> Vec<SettingEvent> {
        self.events.lock().clone()
    }

    /// Names of the events received so far, in order
    pub fn names(&self) -> Vec<&'static str> {
        self.events.lock().iter().map(|e| e.name()).collect()
    }

    /// Remove and return every recorded event
    pub fn take(&self) -> Vec<SettingEvent> {
        std::mem::take(&mut *self.events.lock())
    }
}

impl EventDispatcher for RecordingDispatcher {
    fn dispatch(&self, event: SettingEvent) {
        self.events.lock().push(event);
    }
}

/// Dispatcher that fans events out over a tokio broadcast channel
///
/// Events sent while nobody subscribes are dropped.
#[derive(Debug, Clone)]
pub struct ChannelDispatcher {
    sender: broadcast::Sender<SettingEvent>,
}

impl ChannelDispatcher {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SettingEvent> {
        self.sender.subscribe()
    }
}

impl EventDispatcher for ChannelDispatcher {
    fn dispatch(&self, event: SettingEvent) {
        if self.sender.send(event).is_err() {
            tracing::trace!("no subscribers for settings event");
        }
    }
}
