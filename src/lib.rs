//! Media playback control layer
//!
//! A [`Player`] state machine reconciles asynchronous engine readiness and seek
//! completion with the play/pause/seek intents issued in the meantime. A
//! [`PlaybackController`] adds queue navigation, resume positions, lifecycle
//! handling and observers on top, and [`controller::spawn`] runs it on a
//! single tokio task.

pub mod config;
pub mod controller;
pub mod engine;
pub mod error;
pub mod logging;
pub mod model;
pub mod player;

pub use config::{Config, LoggingConfig, PlayerConfig, ResumeConfig};
pub use controller::{Collaborators, PlaybackController, PlaybackHandle, PlaybackObserver};
pub use engine::{Engine, EngineError, EngineEvent, EngineMessage, SimulatedEngine};
pub use error::{Error, Result};
pub use model::{
    ControlState, LoadingState, PlaybackMode, PlaybackState, Queue, QueueItem, ResumeState, Seek,
    SeekInfo, Switchable,
};
pub use player::{Player, PlayerEvent};
