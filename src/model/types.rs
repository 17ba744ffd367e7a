//! Core type definitions for the playback layer

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::engine::{EngineError, SeekId};

/// Playback state of the player
///
/// stopped -> preparing -> playing -> finished
#[derive(Clone, Debug, PartialEq)]
pub enum PlaybackState {
    /// A resource was handed to the engine and it is not ready yet
    Preparing,
    /// The engine is ready. Calling `play()` in `Finished` also lands here.
    Playing,
    /// Initial state, and the state after `stop()`
    Stopped,
    /// Reached the end of the item with loop mode off
    Finished,
    /// Any engine error after `prepare`. The reason is `None` when the
    /// engine could not say what went wrong.
    Failed(Option<EngineError>),
}

impl PlaybackState {
    pub fn is_failed(&self) -> bool {
        matches!(self, PlaybackState::Failed(_))
    }
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaybackState::Preparing => write!(f, "preparing"),
            PlaybackState::Playing => write!(f, "playing"),
            PlaybackState::Stopped => write!(f, "stopped"),
            PlaybackState::Finished => write!(f, "finished"),
            PlaybackState::Failed(Some(e)) => write!(f, "failed ({})", e),
            PlaybackState::Failed(None) => write!(f, "failed"),
        }
    }
}

/// Control state: only meaningful while the playback state is `Playing`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlState {
    Playing,
    Paused,
}

/// Whether the engine is currently buffering
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadingState {
    Began,
    Ended,
}

/// What happens automatically when an item finishes
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackMode {
    /// Loop the current item
    Single,
    /// Advance to the next item in queue order
    #[default]
    Sequential,
    /// Jump to a random other item of the queue
    Random,
}

impl PlaybackMode {
    pub fn next(self) -> Self {
        match self {
            PlaybackMode::Sequential => PlaybackMode::Random,
            PlaybackMode::Random => PlaybackMode::Single,
            PlaybackMode::Single => PlaybackMode::Sequential,
        }
    }
}

/// Whether the current item has neighbours to switch to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Switchable {
    pub prev: bool,
    pub next: bool,
}

type SeekCompletion = Box<dyn FnOnce(bool) + Send>;

/// A request to move the playhead
///
/// The completion fires exactly once: `true` when the engine landed on the
/// target, `false` when the seek failed or was superseded by a later one.
pub struct Seek {
    pub time: Duration,
    completion: Option<SeekCompletion>,
}

impl Seek {
    pub fn new(time: Duration) -> Self {
        Self { time, completion: None }
    }

    pub fn with_completion(time: Duration, completion: impl FnOnce(bool) + Send + 'static) -> Self {
        Self {
            time,
            completion: Some(Box::new(completion)),
        }
    }

    pub(crate) fn complete(&mut self, success: bool) {
        if let Some(completion) = self.completion.take() {
            completion(success);
        }
    }
}

impl fmt::Debug for Seek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Seek")
            .field("time", &self.time)
            .field("has_completion", &self.completion.is_some())
            .finish()
    }
}

/// Identity of a seek as reported to observers
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SeekInfo {
    pub id: SeekId,
    pub time: Duration,
}
