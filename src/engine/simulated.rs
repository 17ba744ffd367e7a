//! In-process engine with a wall clock instead of a decoder

use std::collections::HashMap;
use std::ops::Range;
use std::time::{Duration, Instant};

use tokio::sync::mpsc::UnboundedSender;

use crate::model::Queue;
use super::{
    Engine, EngineError, EngineEvent, EngineMessage, ItemToken, PrepareOptions, SeekId,
    TimeControlStatus,
};

struct Loaded {
    token: ItemToken,
    duration: Duration,
    base: Duration,
    playing_since: Option<Instant>,
    ended: bool,
}

impl Loaded {
    fn position(&self, rate: f64) -> Duration {
        let elapsed = self
            .playing_since
            .map(|since| since.elapsed().mul_f64(rate))
            .unwrap_or_default();
        (self.base + elapsed).min(self.duration)
    }

    /// Freeze the clock at the current position
    fn settle(&mut self, rate: f64) {
        self.base = self.position(rate);
        if self.playing_since.is_some() {
            self.playing_since = Some(Instant::now());
        }
    }
}

/// Engine that "plays" known resources by letting time pass.
///
/// Readiness and seeks complete immediately; the end of an item is noticed
/// when the player polls `position`.
pub struct SimulatedEngine {
    events: UnboundedSender<EngineMessage>,
    catalog: HashMap<String, Duration>,
    loaded: Option<Loaded>,
    rate: f64,
    volume: f64,
    muted: bool,
}

impl SimulatedEngine {
    pub fn new(events: UnboundedSender<EngineMessage>) -> Self {
        Self {
            events,
            catalog: HashMap::new(),
            loaded: None,
            rate: 1.0,
            volume: 1.0,
            muted: false,
        }
    }

    pub fn with_track(mut self, resource: impl Into<String>, duration: Duration) -> Self {
        self.catalog.insert(resource.into(), duration);
        self
    }

    /// Make every item of `queue` playable
    pub fn with_queue(mut self, queue: &Queue) -> Self {
        for item in queue.items() {
            self.catalog.insert(item.resource.clone(), item.duration);
        }
        self
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    fn emit(&self, token: ItemToken, event: EngineEvent) {
        if self.events.send(EngineMessage::new(token, event)).is_err() {
            tracing::trace!("Engine event dropped, controller is gone");
        }
    }
}

impl Engine for SimulatedEngine {
    fn prepare(&mut self, item: ItemToken, resource: &str, options: PrepareOptions) {
        self.loaded = None;
        tracing::debug!(resource, preferred_buffer_ms = options.preferred_buffer.as_millis() as u64, "Simulated prepare");

        let Some(duration) = self.catalog.get(resource).copied() else {
            self.emit(
                item,
                EngineEvent::Failed(Some(EngineError::Load(format!("unknown resource {}", resource)))),
            );
            return;
        };

        self.loaded = Some(Loaded {
            token: item,
            duration,
            base: Duration::ZERO,
            playing_since: None,
            ended: false,
        });
        self.emit(item, EngineEvent::DurationChanged(duration));
        self.emit(
            item,
            EngineEvent::BufferRangeChanged {
                start: Duration::ZERO,
                length: duration,
            },
        );
        self.emit(item, EngineEvent::LikelyToKeepUp(true));
        self.emit(item, EngineEvent::Ready);
    }

    fn play(&mut self, rate: f64) {
        self.rate = rate;
        let Some(loaded) = self.loaded.as_mut() else { return };
        loaded.settle(rate);
        if loaded.playing_since.is_none() {
            loaded.playing_since = Some(Instant::now());
        }
        let token = loaded.token;
        self.emit(token, EngineEvent::TimeControl(TimeControlStatus::Playing { rate }));
    }

    fn pause(&mut self) {
        let rate = self.rate;
        let Some(loaded) = self.loaded.as_mut() else { return };
        let was_playing = loaded.playing_since.is_some();
        loaded.settle(rate);
        loaded.playing_since = None;
        let token = loaded.token;
        if was_playing {
            self.emit(token, EngineEvent::TimeControl(TimeControlStatus::Paused));
        }
    }

    fn stop(&mut self) {
        self.loaded = None;
    }

    fn seek(&mut self, id: SeekId, target: Duration) {
        let rate = self.rate;
        let Some(loaded) = self.loaded.as_mut() else { return };
        loaded.settle(rate);
        loaded.base = target.min(loaded.duration);
        loaded.ended = false;
        let token = loaded.token;
        self.emit(token, EngineEvent::SeekCompleted { id, finished: true });
    }

    fn cancel_pending_seeks(&mut self) {
        // Seeks land immediately, nothing is ever pending.
    }

    fn set_rate(&mut self, rate: f64) {
        let previous = self.rate;
        self.rate = rate;
        let Some(loaded) = self.loaded.as_mut() else { return };
        loaded.settle(previous);
        if loaded.playing_since.is_some() {
            let token = loaded.token;
            self.emit(token, EngineEvent::TimeControl(TimeControlStatus::Playing { rate }));
        }
    }

    fn set_volume(&mut self, volume: f64) {
        self.volume = volume;
    }

    fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    fn position(&mut self) -> Duration {
        let rate = self.rate;
        let Some(loaded) = self.loaded.as_mut() else {
            return Duration::ZERO;
        };
        let position = loaded.position(rate);
        if position >= loaded.duration && loaded.playing_since.is_some() && !loaded.ended {
            loaded.ended = true;
            loaded.base = loaded.duration;
            loaded.playing_since = None;
            let token = loaded.token;
            self.emit(token, EngineEvent::ReachedEnd);
        }
        position
    }

    fn seekable_range(&self) -> Option<Range<Duration>> {
        self.loaded.as_ref().map(|loaded| Duration::ZERO..loaded.duration)
    }
}
