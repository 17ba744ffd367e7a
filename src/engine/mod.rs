//! Engine abstraction: the native decode/render backend the player drives
//!
//! The player never reaches into the engine's internals. It issues commands
//! through [`Engine`] and learns about progress through [`EngineMessage`]s
//! delivered back to it on the controller's execution context.

mod simulated;

use std::ops::Range;
use std::time::Duration;

use thiserror::Error;

pub use simulated::SimulatedEngine;

/// Identifies one prepared item. Every `prepare` gets a fresh token so events
/// from a replaced item can be recognised and dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct ItemToken(pub u64);

impl ItemToken {
    pub(crate) fn advance(self) -> Self {
        ItemToken(self.0 + 1)
    }
}

/// Identifies one seek issued to the engine
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct SeekId(pub u64);

/// Opaque failure reported by the engine
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("failed to load resource: {0}")]
    Load(String),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("playback error: {0}")]
    Playback(String),
}

/// What the engine says it is doing with the clock
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TimeControlStatus {
    Paused,
    WaitingToPlay,
    Playing { rate: f64 },
}

#[derive(Clone, Debug, PartialEq)]
pub enum EngineEvent {
    /// The prepared resource can be played
    Ready,
    /// Loading or playback failed; the item is unusable
    Failed(Option<EngineError>),
    DurationChanged(Duration),
    BufferRangeChanged { start: Duration, length: Duration },
    /// `false` means playback will probably stall
    LikelyToKeepUp(bool),
    /// The engine holds playback back to avoid stalls
    WaitingToMinimizeStalls(bool),
    /// Playback stalled while it should have been running
    Stalled,
    ReachedEnd,
    TimeControl(TimeControlStatus),
    SeekCompleted { id: SeekId, finished: bool },
}

/// An engine event tagged with the item it belongs to
#[derive(Clone, Debug, PartialEq)]
pub struct EngineMessage {
    pub item: ItemToken,
    pub event: EngineEvent,
}

impl EngineMessage {
    pub fn new(item: ItemToken, event: EngineEvent) -> Self {
        Self { item, event }
    }
}

/// Per-item loading hints
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PrepareOptions {
    /// How much to buffer ahead; zero lets the engine choose
    pub preferred_buffer: Duration,
}

/// Commands the player issues to the engine.
///
/// Implementations report results asynchronously as [`EngineMessage`]s.
/// `seek` has a single pending slot: a newer seek replaces an unfinished one.
pub trait Engine: Send {
    /// Release whatever is loaded and start loading `resource`
    fn prepare(&mut self, item: ItemToken, resource: &str, options: PrepareOptions);

    fn play(&mut self, rate: f64);

    fn pause(&mut self);

    /// Release the loaded item
    fn stop(&mut self);

    fn seek(&mut self, id: SeekId, target: Duration);

    fn cancel_pending_seeks(&mut self);

    fn set_rate(&mut self, rate: f64);

    fn set_volume(&mut self, volume: f64);

    fn set_muted(&mut self, muted: bool);

    /// Current playhead as the engine sees it
    fn position(&mut self) -> Duration;

    /// The range the engine can seek within right now, if it knows
    fn seekable_range(&self) -> Option<Range<Duration>>;
}
