//! Controller module - playback coordination
//!
//! [`PlaybackController`] is the public face of the playback layer. It owns
//! the [`Player`], the current queue and item, and the collaborators around
//! them (resume store, now-playing surface, lifecycle host). It is organized
//! into submodules by responsibility:
//!
//! - `observer`: weakly held observers and the notifications they receive
//! - `now_playing`: the system "now playing" surface
//! - `lifecycle`: background/foreground, interruptions, route changes, remote commands
//! - `handle`: the async task that serializes every call onto one context

mod handle;
mod lifecycle;
mod now_playing;
mod observer;

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use crate::config::PlayerConfig;
use crate::engine::{Engine, EngineMessage, SeekId};
use crate::error::{Error, Result};
use crate::model::{
    ControlState, LoadingState, MemoryResumeStore, PlaybackMode, PlaybackState, Queue, QueueItem,
    ResumeState, ResumeStore, Seek, Switchable,
};
use crate::player::{Player, PlayerEvent};

pub use handle::{Command, PlaybackHandle, PlaybackSnapshot, spawn};
pub use lifecycle::{
    ExecutionToken, LifecycleEvent, LifecycleHost, NoopLifecycleHost, RemoteCommand,
    RemoteCommandStatus, RouteChangeReason,
};
pub use now_playing::{NowPlaying, NowPlayingInfo, TracingNowPlaying};
pub use observer::{Notification, ObserverId, ObserverRegistry, PlaybackObserver};

/// Resume positions are written at most once per this much playhead movement
const RESUME_WRITE_INTERVAL: Duration = Duration::from_secs(1);

/// The environment the controller talks to
pub struct Collaborators {
    pub resume: Box<dyn ResumeStore>,
    pub now_playing: Box<dyn NowPlaying>,
    pub lifecycle: Box<dyn LifecycleHost>,
}

impl Default for Collaborators {
    fn default() -> Self {
        Self {
            resume: Box::new(MemoryResumeStore::new()),
            now_playing: Box::new(TracingNowPlaying),
            lifecycle: Box::new(NoopLifecycleHost),
        }
    }
}

pub struct PlaybackController {
    pub(crate) player: Player,
    queue: Arc<Queue>,
    item: Option<QueueItem>,
    switchable: Switchable,
    mode: PlaybackMode,
    allow_background_playback: bool,

    resume: Box<dyn ResumeStore>,
    now_playing: Box<dyn NowPlaying>,
    now_playing_info: Option<NowPlayingInfo>,
    lifecycle: Box<dyn LifecycleHost>,
    background_task: Option<ExecutionToken>,
    in_background: bool,
    interrupted: bool,
    last_resume_write: Option<Duration>,

    observers: ObserverRegistry,
    outbox: VecDeque<Notification>,
}

impl PlaybackController {
    pub fn new(engine: Box<dyn Engine>, config: &PlayerConfig, collaborators: Collaborators) -> Self {
        let mut player = Player::new(engine, config);
        player.set_loop(config.mode == PlaybackMode::Single);

        Self {
            player,
            queue: Arc::new(Queue::empty()),
            item: None,
            switchable: Switchable::default(),
            mode: config.mode,
            allow_background_playback: config.allow_background_playback,
            resume: collaborators.resume,
            now_playing: collaborators.now_playing,
            now_playing_info: None,
            lifecycle: collaborators.lifecycle,
            background_task: None,
            in_background: false,
            interrupted: false,
            last_resume_write: None,
            observers: ObserverRegistry::new(),
            outbox: VecDeque::new(),
        }
    }

    // ========================================================================
    // Observers
    // ========================================================================

    pub fn subscribe(&mut self, observer: &Arc<dyn PlaybackObserver>) -> ObserverId {
        self.observers.add(observer)
    }

    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        self.observers.remove(id)
    }

    // ========================================================================
    // Commands
    // ========================================================================

    /// Make `queue` current and start `item` from it
    pub fn play_item(&mut self, item: QueueItem, queue: Arc<Queue>) -> Result<()> {
        if !queue.contains(&item) {
            return Err(Error::ItemNotInQueue(item.id));
        }
        tracing::info!(item_id = %item.id, queue_len = queue.len(), "Playing item from new queue");
        self.queue = queue.clone();
        self.outbox.push_back(Notification::QueueChanged(queue));
        self.update(item);
        self.pump();
        Ok(())
    }

    /// Resume, or restart a finished item
    pub fn play(&mut self) {
        self.player.play();
        self.pump();
    }

    pub fn pause(&mut self) {
        self.player.pause();
        self.pump();
    }

    pub fn stop(&mut self) {
        self.player.stop();
        self.pump();
    }

    /// Returns whether there was a next item to move to
    pub fn next(&mut self) -> bool {
        let moved = self.advance(|queue, item| queue.next(item).cloned());
        self.pump();
        moved
    }

    /// Returns whether there was a previous item to move to
    pub fn prev(&mut self) -> bool {
        let moved = self.advance(|queue, item| queue.prev(item).cloned());
        self.pump();
        moved
    }

    /// Prepare the current item again from scratch; also the way out of `Failed`
    pub fn replay(&mut self) {
        match self.item.clone() {
            Some(item) => {
                self.update(item);
                self.pump();
            }
            None => tracing::debug!("replay() ignored, no current item"),
        }
    }

    pub fn seek(&mut self, request: Seek) -> SeekId {
        let id = self.player.seek(request);
        self.pump();
        id
    }

    pub fn set_rate(&mut self, rate: f64) {
        self.player.set_rate(rate);
        self.refresh_now_playing();
        self.pump();
    }

    pub fn set_volume(&mut self, volume: f64) {
        self.player.set_volume(volume);
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.player.set_muted(muted);
    }

    pub fn set_mode(&mut self, mode: PlaybackMode) {
        if self.mode == mode {
            return;
        }
        tracing::info!(?mode, "Playback mode changed");
        self.mode = mode;
        self.player.set_loop(mode == PlaybackMode::Single);
        self.outbox.push_back(Notification::ModeChanged(mode));
        self.pump();
    }

    /// Deliver an engine event to the player
    pub fn handle_engine_message(&mut self, message: EngineMessage) {
        self.player.handle_engine(message);
        self.pump();
    }

    /// Periodic position update
    pub fn tick(&mut self) {
        self.player.tick();
        self.pump();
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn current_queue(&self) -> &Arc<Queue> {
        &self.queue
    }

    pub fn current_item(&self) -> Option<&QueueItem> {
        self.item.as_ref()
    }

    pub fn switchable(&self) -> Switchable {
        self.switchable
    }

    pub fn mode(&self) -> PlaybackMode {
        self.mode
    }

    pub fn state(&self) -> &PlaybackState {
        self.player.state()
    }

    pub fn control(&self) -> ControlState {
        self.player.control()
    }

    pub fn loading(&self) -> LoadingState {
        self.player.loading()
    }

    pub fn current_time(&self) -> Duration {
        self.player.current_time()
    }

    pub fn duration(&self) -> Duration {
        self.player.duration()
    }

    pub fn buffer(&self) -> f64 {
        self.player.buffer()
    }

    pub fn rate(&self) -> f64 {
        self.player.rate()
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    pub fn resume_state(&self, item: &QueueItem) -> Option<ResumeState> {
        self.resume.get(&item.id)
    }

    // ========================================================================
    // Item switching
    // ========================================================================

    fn advance(&mut self, pick: impl FnOnce(&Queue, &QueueItem) -> Option<QueueItem>) -> bool {
        let Some(current) = self.item.as_ref() else {
            return false;
        };
        let Some(target) = pick(&self.queue, current) else {
            tracing::debug!(item_id = %current.id, "No item to move to");
            return false;
        };
        self.update(target);
        true
    }

    fn update(&mut self, item: QueueItem) {
        // Nothing may record state against the old item while the new one loads.
        self.item = None;
        self.now_playing_info = None;

        self.player.prepare(item.resource.clone());
        if let Some(ResumeState::At { position }) = self.resume.get(&item.id) {
            tracing::debug!(item_id = %item.id, position_ms = position.as_millis() as u64, "Resuming from saved position");
            self.player.seek(Seek::new(position));
        }
        // The old item's teardown is announced before the new item.
        while self.react_to_player() {}

        self.switchable = self.queue.switchable(&item);
        let info = NowPlayingInfo::for_item(&item, self.player.rate());
        self.now_playing.publish(&info);
        self.now_playing.set_switchable(self.switchable);
        self.now_playing_info = Some(info);
        self.last_resume_write = None;

        tracing::info!(item_id = %item.id, title = %item.title, "Current item changed");
        self.item = Some(item.clone());
        self.outbox.push_back(Notification::ItemChanged(Some(item)));
    }

    // ========================================================================
    // Notification pump
    // ========================================================================

    /// React to everything the player queued, then deliver it all to observers
    fn pump(&mut self) {
        while self.react_to_player() {}
        while let Some(notification) = self.outbox.pop_front() {
            self.observers.notify(&notification);
        }
    }

    /// Queue one batch of player events and react to it. Returns false once
    /// the player has nothing left.
    fn react_to_player(&mut self) -> bool {
        let events = self.player.take_events();
        if events.is_empty() {
            return false;
        }
        for event in events {
            self.outbox.push_back(Notification::Player(event.clone()));
            self.react(&event);
        }
        true
    }

    fn react(&mut self, event: &PlayerEvent) {
        match event {
            PlayerEvent::State(state) => self.on_state(state),
            PlayerEvent::CurrentTime(time) => {
                let due = self
                    .last_resume_write
                    .is_none_or(|last| last.abs_diff(*time) > RESUME_WRITE_INTERVAL);
                if due {
                    self.last_resume_write = Some(*time);
                    self.record_resume_state();
                }
            }
            PlayerEvent::Buffer(_) => {}
            PlayerEvent::SeekBegan(_) => self.record_resume_state(),
            PlayerEvent::Control(_)
            | PlayerEvent::Loading(_)
            | PlayerEvent::Duration(_)
            | PlayerEvent::SeekEnded(_) => {
                self.record_resume_state();
                self.refresh_now_playing();
            }
        }
    }

    fn on_state(&mut self, state: &PlaybackState) {
        self.record_resume_state_for(state);

        match state {
            PlaybackState::Preparing => {}
            PlaybackState::Playing => {
                self.end_background_task();
                self.refresh_now_playing();
            }
            PlaybackState::Finished => {
                self.refresh_now_playing();
                match self.mode {
                    PlaybackMode::Sequential => {
                        self.advance(|queue, item| queue.next(item).cloned());
                    }
                    PlaybackMode::Random => {
                        self.advance(|queue, item| queue.random(item).cloned());
                    }
                    PlaybackMode::Single => {}
                }
            }
            PlaybackState::Stopped | PlaybackState::Failed(_) => {
                self.end_background_task();
                self.now_playing.clear();
                self.now_playing_info = None;
            }
        }
    }

    fn record_resume_state(&mut self) {
        let state = self.player.state().clone();
        self.record_resume_state_for(&state);
    }

    fn record_resume_state_for(&mut self, state: &PlaybackState) {
        let Some(item) = self.item.as_ref() else { return };
        let record = match state {
            PlaybackState::Playing => Some(ResumeState::at(self.player.current_time())),
            PlaybackState::Finished => Some(ResumeState::Played),
            PlaybackState::Failed(_) if self.resume.get(&item.id).is_none() => Some(ResumeState::Failed),
            _ => None,
        };
        if let Some(record) = record {
            if let Err(e) = self.resume.set(&item.id, record) {
                tracing::warn!(item_id = %item.id, error = %e, "Failed to store resume state");
            }
        }
    }

    fn refresh_now_playing(&mut self) {
        let Some(info) = self.now_playing_info.as_mut() else { return };
        let duration = self.player.duration();
        if !duration.is_zero() {
            info.duration = duration;
        }
        info.elapsed = self.player.current_time();
        info.rate = if self.player.control() == ControlState::Playing {
            self.player.rate()
        } else {
            0.0
        };
        self.now_playing.publish(info);
    }
}
