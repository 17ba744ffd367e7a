//! Playback state machine
//!
//! [`Player`] owns the engine and the public playback, control and loading
//! states. Commands record the user's intent first and only touch the engine
//! when it can act on them; engine events (see `events.rs`) reconcile what was
//! asked for with what the engine achieved. Every observable change is queued
//! as a [`PlayerEvent`] and handed out by [`Player::take_events`].

mod events;
mod intent;
mod seek;

use std::time::Duration;

use crate::config::{MAX_RATE, MIN_RATE, PlayerConfig};
use crate::engine::{Engine, EngineError, ItemToken, PrepareOptions, SeekId};
use crate::model::{ControlState, LoadingState, PlaybackState, Seek, SeekInfo};
use intent::{Intent, PendingSeek, SeekStage};
use seek::{TimeCalibrator, clamp_target};

/// Observable change produced by the player
#[derive(Clone, Debug, PartialEq)]
pub enum PlayerEvent {
    State(PlaybackState),
    Control(ControlState),
    Loading(LoadingState),
    /// Buffered fraction of the item, 0.0 - 1.0
    Buffer(f64),
    Duration(Duration),
    CurrentTime(Duration),
    SeekBegan(SeekInfo),
    SeekEnded(SeekInfo),
}

pub struct Player {
    engine: Box<dyn Engine>,
    autoplay: bool,
    preferred_buffer: Duration,
    max_stall_retries: u32,

    resource: Option<String>,
    last_resource: Option<String>,
    token: ItemToken,
    engine_ready: bool,

    state: PlaybackState,
    control: ControlState,
    loading: LoadingState,

    rate: f64,
    volume: f64,
    muted: bool,
    is_loop: bool,
    /// Engine held paused by the host (interruption, background) regardless of intent
    output_suspended: bool,

    intent: Intent,
    calibrator: TimeCalibrator,

    position: Duration,
    duration: Duration,
    buffer: f64,

    likely_to_stall: bool,
    waiting_to_minimize_stalls: bool,
    stall_retries: u32,
    stalled_at: Duration,

    events: Vec<PlayerEvent>,
}

impl Player {
    pub fn new(engine: Box<dyn Engine>, config: &PlayerConfig) -> Self {
        Self {
            engine,
            autoplay: config.autoplay,
            preferred_buffer: config.preferred_buffer(),
            max_stall_retries: config.max_stall_retries,
            resource: None,
            last_resource: None,
            token: ItemToken::default(),
            engine_ready: false,
            state: PlaybackState::Stopped,
            control: ControlState::Paused,
            loading: LoadingState::Ended,
            rate: finite_or(config.rate, 1.0).clamp(MIN_RATE, MAX_RATE),
            volume: finite_or(config.volume, 1.0).clamp(0.0, 1.0),
            muted: config.muted,
            is_loop: false,
            output_suspended: false,
            intent: Intent::default(),
            calibrator: TimeCalibrator::default(),
            position: Duration::ZERO,
            duration: Duration::ZERO,
            buffer: 0.0,
            likely_to_stall: false,
            waiting_to_minimize_stalls: false,
            stall_retries: 0,
            stalled_at: Duration::ZERO,
            events: Vec::new(),
        }
    }

    // ========================================================================
    // Commands
    // ========================================================================

    /// Tear down the current item and start loading `resource`
    pub fn prepare(&mut self, resource: impl Into<String>) {
        let resource = resource.into();
        self.clear();

        self.token = self.token.advance();
        self.set_loading(LoadingState::Began);
        self.set_state(PlaybackState::Preparing);

        self.resource = Some(resource.clone());
        self.last_resource = Some(resource.clone());
        self.position = Duration::ZERO;
        self.duration = Duration::ZERO;
        self.buffer = 0.0;

        tracing::info!(resource = %resource, item = self.token.0, "Preparing item");
        let options = PrepareOptions {
            preferred_buffer: self.preferred_buffer,
        };
        self.engine.prepare(self.token, &resource, options);
        self.engine.set_rate(self.rate);
        self.engine.set_volume(self.volume);
        self.engine.set_muted(self.muted);

        self.intent.wants_to_play = self.autoplay;
    }

    pub fn play(&mut self) {
        match self.state {
            PlaybackState::Preparing => {
                self.intent.wants_to_play = true;
            }
            PlaybackState::Playing => {
                self.intent.wants_to_play = true;
                // An issued seek resumes playback itself when it lands.
                if self.can_start_engine() {
                    self.engine.play(self.rate);
                }
            }
            PlaybackState::Finished => {
                self.set_state(PlaybackState::Playing);
                self.intent.wants_to_play = true;
                self.seek(Seek::new(Duration::ZERO));
            }
            _ => {
                tracing::debug!(state = %self.state, "play() ignored, nothing to play");
            }
        }
    }

    pub fn pause(&mut self) {
        self.intent.wants_to_play = false;
        if self.resource.is_some() {
            self.engine.pause();
        }
    }

    pub fn stop(&mut self) {
        self.clear();
        self.set_state(PlaybackState::Stopped);
    }

    /// Prepare the last known resource again
    pub fn replay(&mut self) {
        match self.last_resource.clone() {
            Some(resource) => self.prepare(resource),
            None => tracing::debug!("replay() ignored, nothing was ever prepared"),
        }
    }

    /// Move the playhead. The last request wins: an unfinished earlier seek is
    /// completed with `false`.
    pub fn seek(&mut self, request: Seek) -> SeekId {
        let id = self.intent.next_seek_id();
        if let Some(previous) = self.intent.pending_seek.take() {
            self.abandon_seek(previous);
        }

        let mut pending = PendingSeek {
            id,
            request,
            stage: SeekStage::Stored,
        };
        if self.resource.is_some() && self.engine_ready {
            match self.state {
                PlaybackState::Preparing => self.issue_preload(&mut pending),
                PlaybackState::Playing => self.issue_interactive(&mut pending),
                _ => {}
            }
        }
        if pending.stage == SeekStage::Stored {
            tracing::debug!(
                seek_id = id.0,
                target_ms = pending.request.time.as_millis() as u64,
                state = %self.state,
                "Seek recorded until the engine is ready"
            );
        }
        self.intent.pending_seek = Some(pending);
        id
    }

    pub fn set_rate(&mut self, rate: f64) {
        if !rate.is_finite() {
            tracing::warn!(rate, "Ignoring non-finite playback rate");
            return;
        }
        self.rate = rate.clamp(MIN_RATE, MAX_RATE);
        if self.state == PlaybackState::Playing && self.control == ControlState::Playing {
            self.engine.set_rate(self.rate);
        }
    }

    pub fn set_volume(&mut self, volume: f64) {
        if !volume.is_finite() {
            tracing::warn!(volume, "Ignoring non-finite volume");
            return;
        }
        self.volume = volume.clamp(0.0, 1.0);
        self.engine.set_volume(self.volume);
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
        self.engine.set_muted(muted);
    }

    pub fn set_loop(&mut self, is_loop: bool) {
        self.is_loop = is_loop;
    }

    /// Hold the engine paused without touching the user's intent, e.g. for an
    /// audio-session interruption. Nothing plays until [`resume_output`](Self::resume_output).
    pub(crate) fn suspend_output(&mut self) {
        if self.output_suspended {
            return;
        }
        tracing::debug!(wants_to_play = self.intent.wants_to_play, "Output suspended");
        self.output_suspended = true;
        if self.resource.is_some() && self.intent.wants_to_play {
            self.engine.pause();
        }
    }

    /// Lift a suspension and pick playback back up if it is still wanted
    pub(crate) fn resume_output(&mut self) {
        if !std::mem::take(&mut self.output_suspended) {
            return;
        }
        tracing::debug!(wants_to_play = self.intent.wants_to_play, "Output resumed");
        if self.can_start_engine() {
            self.engine.play(self.rate);
        }
    }

    /// Poll the engine clock and report the current time
    pub fn tick(&mut self) {
        if self.resource.is_none() {
            return;
        }
        let raw = self.engine.position();
        self.position = raw;
        if self.state != PlaybackState::Playing {
            return;
        }
        if self.stall_retries > 0 && raw > self.stalled_at + STALL_RECOVERY {
            self.stall_retries = 0;
        }

        let reported = match &self.intent.pending_seek {
            Some(pending) if pending.is_issued() => pending.request.time,
            _ => self.calibrator.calibrate(raw),
        };
        tracing::trace!(raw_ms = raw.as_millis() as u64, reported_ms = reported.as_millis() as u64, "Tick");
        self.events.push(PlayerEvent::CurrentTime(reported));
    }

    /// Drain the changes queued since the last call
    pub fn take_events(&mut self) -> Vec<PlayerEvent> {
        std::mem::take(&mut self.events)
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn control(&self) -> ControlState {
        self.control
    }

    pub fn loading(&self) -> LoadingState {
        self.loading
    }

    pub fn resource(&self) -> Option<&str> {
        self.resource.as_deref()
    }

    pub fn has_item(&self) -> bool {
        self.resource.is_some()
    }

    pub fn item_token(&self) -> ItemToken {
        self.token
    }

    pub fn wants_to_play(&self) -> bool {
        self.intent.wants_to_play
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn is_loop(&self) -> bool {
        self.is_loop
    }

    pub fn is_output_suspended(&self) -> bool {
        self.output_suspended
    }

    /// Current time as observers should see it: the pending seek target,
    /// then the calibrated engine time.
    pub fn current_time(&self) -> Duration {
        if self.resource.is_none() {
            return Duration::ZERO;
        }
        match &self.intent.pending_seek {
            Some(pending) => pending.request.time,
            None => self.calibrator.peek(self.position),
        }
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn buffer(&self) -> f64 {
        self.buffer
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn set_state(&mut self, state: PlaybackState) {
        tracing::info!(from = %self.state, to = %state, "Playback state changed");
        self.state = state.clone();
        self.events.push(PlayerEvent::State(state));
    }

    fn set_control(&mut self, control: ControlState) {
        if self.control == control {
            return;
        }
        tracing::debug!(?control, "Control state changed");
        self.control = control;
        self.events.push(PlayerEvent::Control(control));
    }

    fn set_loading(&mut self, loading: LoadingState) {
        if self.loading == loading {
            return;
        }
        tracing::debug!(?loading, "Loading state changed");
        self.loading = loading;
        self.events.push(PlayerEvent::Loading(loading));
    }

    /// Whether the engine may be told to play right now
    fn can_start_engine(&self) -> bool {
        self.state == PlaybackState::Playing
            && self.intent.wants_to_play
            && !self.intent.has_issued_seek()
            && !self.output_suspended
    }

    fn clamp(&self, target: Duration) -> Duration {
        clamp_target(target, self.engine.seekable_range(), self.duration)
    }

    /// Seek while the item becomes ready; `Playing` is announced afterwards
    fn issue_preload(&mut self, pending: &mut PendingSeek) {
        pending.request.time = self.clamp(pending.request.time);
        self.engine.pause();
        self.engine.seek(pending.id, pending.request.time);
        pending.stage = SeekStage::Preloading;
        tracing::debug!(seek_id = pending.id.0, target_ms = pending.request.time.as_millis() as u64, "Seeking before announcing ready");
    }

    fn issue_interactive(&mut self, pending: &mut PendingSeek) {
        pending.request.time = self.clamp(pending.request.time);
        let info = pending.info();
        self.engine.pause();
        self.events.push(PlayerEvent::CurrentTime(info.time));
        self.events.push(PlayerEvent::SeekBegan(info));
        self.engine.seek(pending.id, info.time);
        pending.stage = SeekStage::InFlight;
        tracing::debug!(seek_id = info.id.0, target_ms = info.time.as_millis() as u64, "Seek began");
    }

    /// Give up on a seek that will never be applied
    fn abandon_seek(&mut self, mut seek: PendingSeek) {
        if seek.is_issued() {
            self.engine.cancel_pending_seeks();
        }
        tracing::debug!(seek_id = seek.id.0, stage = ?seek.stage, "Seek superseded");
        seek.request.complete(false);
        if seek.stage == SeekStage::InFlight {
            self.events.push(PlayerEvent::SeekEnded(seek.info()));
        }
    }

    fn fail(&mut self, error: Option<EngineError>) {
        match &error {
            Some(e) => tracing::warn!(error = %e, "Playback failed"),
            None => tracing::warn!("Playback failed without a reason"),
        }
        self.clear();
        self.set_state(PlaybackState::Failed(error));
    }

    /// Release the current item and forget every intent tied to it
    fn clear(&mut self) {
        if let Some(seek) = self.intent.reset() {
            self.abandon_seek(seek);
        }
        self.calibrator.clear();
        self.engine_ready = false;
        self.likely_to_stall = false;
        self.waiting_to_minimize_stalls = false;
        self.stall_retries = 0;

        if self.resource.take().is_some() {
            self.set_loading(LoadingState::Ended);
            self.set_control(ControlState::Paused);
            self.engine.pause();
            self.engine.cancel_pending_seeks();
            self.engine.stop();
        }
    }
}

/// Playback must advance this far past a stall before retries are re-armed
const STALL_RECOVERY: Duration = Duration::from_secs(5);

fn finite_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() { value } else { fallback }
}
