//! Observer registry
//!
//! Observers are held weakly: dropping the last `Arc` of an observer is
//! enough to stop its callbacks, no explicit removal needed.

use std::sync::{Arc, Weak};
use std::time::Duration;

use crate::model::{ControlState, LoadingState, PlaybackMode, PlaybackState, Queue, QueueItem, SeekInfo};
use crate::player::PlayerEvent;

/// Callbacks for everything the controller reports. All methods default to no-ops.
pub trait PlaybackObserver: Send + Sync {
    fn on_playback_state(&self, _state: &PlaybackState) {}

    fn on_control_state(&self, _state: ControlState) {}

    fn on_loading_state(&self, _state: LoadingState) {}

    /// Buffered fraction, 0.0 - 1.0
    fn on_buffer_updated(&self, _progress: f64) {}

    fn on_duration_updated(&self, _duration: Duration) {}

    fn on_current_time_updated(&self, _time: Duration) {}

    fn on_seek_began(&self, _seek: SeekInfo) {}

    fn on_seek_ended(&self, _seek: SeekInfo) {}

    fn on_queue_changed(&self, _queue: &Queue) {}

    fn on_item_changed(&self, _item: Option<&QueueItem>) {}

    fn on_mode_changed(&self, _mode: PlaybackMode) {}
}

/// One queued notification, delivered to every live observer in order
#[derive(Clone, Debug)]
pub enum Notification {
    Player(PlayerEvent),
    QueueChanged(Arc<Queue>),
    ItemChanged(Option<QueueItem>),
    ModeChanged(PlaybackMode),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

#[derive(Default)]
pub struct ObserverRegistry {
    entries: Vec<(ObserverId, Weak<dyn PlaybackObserver>)>,
    next_id: u64,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, observer: &Arc<dyn PlaybackObserver>) -> ObserverId {
        self.next_id += 1;
        let id = ObserverId(self.next_id);
        self.entries.push((id, Arc::downgrade(observer)));
        id
    }

    pub fn remove(&mut self, id: ObserverId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry, _)| *entry != id);
        self.entries.len() != before
    }

    /// Number of observers that are still alive
    pub fn len(&self) -> usize {
        self.entries.iter().filter(|(_, weak)| weak.strong_count() > 0).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver in registration order, pruning observers that were dropped
    pub fn notify(&mut self, notification: &Notification) {
        self.entries.retain(|(_, weak)| weak.strong_count() > 0);
        for (_, weak) in &self.entries {
            if let Some(observer) = weak.upgrade() {
                deliver(observer.as_ref(), notification);
            }
        }
    }
}

fn deliver(observer: &dyn PlaybackObserver, notification: &Notification) {
    match notification {
        Notification::Player(event) => match event {
            PlayerEvent::State(state) => observer.on_playback_state(state),
            PlayerEvent::Control(state) => observer.on_control_state(*state),
            PlayerEvent::Loading(state) => observer.on_loading_state(*state),
            PlayerEvent::Buffer(progress) => observer.on_buffer_updated(*progress),
            PlayerEvent::Duration(duration) => observer.on_duration_updated(*duration),
            PlayerEvent::CurrentTime(time) => observer.on_current_time_updated(*time),
            PlayerEvent::SeekBegan(seek) => observer.on_seek_began(*seek),
            PlayerEvent::SeekEnded(seek) => observer.on_seek_ended(*seek),
        },
        Notification::QueueChanged(queue) => observer.on_queue_changed(queue),
        Notification::ItemChanged(item) => observer.on_item_changed(item.as_ref()),
        Notification::ModeChanged(mode) => observer.on_mode_changed(*mode),
    }
}
