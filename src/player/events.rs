//! Engine event handling for the state machine

use std::time::Duration;

use crate::engine::{EngineError, EngineEvent, EngineMessage, SeekId, TimeControlStatus};
use crate::model::{ControlState, LoadingState, PlaybackState, Seek};
use super::intent::SeekStage;
use super::{Player, PlayerEvent};

/// Rates closer than this are the same rate
const RATE_TOLERANCE: f64 = 1e-3;

impl Player {
    /// Apply one engine event. Events for any item other than the current one
    /// are dropped.
    pub fn handle_engine(&mut self, message: EngineMessage) {
        if self.resource.is_none() || message.item != self.token {
            tracing::trace!(item = message.item.0, current = self.token.0, event = ?message.event, "Dropping event from stale item");
            return;
        }

        match message.event {
            EngineEvent::Ready => self.on_ready(),
            EngineEvent::Failed(error) => self.on_failed(error),
            EngineEvent::DurationChanged(duration) => {
                self.duration = duration;
                self.events.push(PlayerEvent::Duration(duration));
            }
            EngineEvent::BufferRangeChanged { start, length } => self.on_buffer(start + length),
            EngineEvent::LikelyToKeepUp(keeps_up) => {
                self.likely_to_stall = !keeps_up;
                self.update_loading();
            }
            EngineEvent::WaitingToMinimizeStalls(waiting) => {
                self.waiting_to_minimize_stalls = waiting;
                self.update_loading();
            }
            EngineEvent::Stalled => self.on_stalled(),
            EngineEvent::ReachedEnd => self.on_reached_end(),
            EngineEvent::TimeControl(status) => self.on_time_control(status),
            EngineEvent::SeekCompleted { id, finished } => self.on_seek_completed(id, finished),
        }
    }

    fn on_ready(&mut self) {
        if self.state != PlaybackState::Preparing || self.engine_ready {
            return;
        }
        self.engine_ready = true;

        match self.intent.pending_seek.take() {
            Some(mut pending) => {
                self.issue_preload(&mut pending);
                self.intent.pending_seek = Some(pending);
            }
            None => self.finish_ready(),
        }
    }

    /// Announce `Playing` and honour the recorded play/pause wish
    fn finish_ready(&mut self) {
        self.set_state(PlaybackState::Playing);
        if self.can_start_engine() {
            self.engine.play(self.rate);
        } else {
            self.engine.pause();
        }
    }

    fn on_failed(&mut self, error: Option<EngineError>) {
        match self.state {
            PlaybackState::Preparing | PlaybackState::Playing => self.fail(error),
            _ => tracing::debug!(state = %self.state, "Engine failure outside of playback ignored"),
        }
    }

    fn on_buffer(&mut self, loaded_until: Duration) {
        let progress = if self.duration.is_zero() {
            0.0
        } else {
            (loaded_until.as_secs_f64() / self.duration.as_secs_f64()).clamp(0.0, 1.0)
        };
        self.buffer = progress;
        self.events.push(PlayerEvent::Buffer(progress));
    }

    fn update_loading(&mut self) {
        let loading = if self.likely_to_stall || self.waiting_to_minimize_stalls {
            LoadingState::Began
        } else {
            LoadingState::Ended
        };
        self.set_loading(loading);
    }

    /// Nudge a stalled engine back into playing, a bounded number of times
    fn on_stalled(&mut self) {
        if !self.can_start_engine() {
            return;
        }
        if self.stall_retries >= self.max_stall_retries {
            tracing::warn!(retries = self.stall_retries, "Playback keeps stalling, no more retries");
            return;
        }
        self.stall_retries += 1;
        self.stalled_at = self.position;
        tracing::debug!(retry = self.stall_retries, "Playback stalled, resuming");
        self.engine.play(self.rate);
    }

    fn on_reached_end(&mut self) {
        if self.state != PlaybackState::Playing {
            return;
        }
        if self.is_loop {
            tracing::debug!("Reached end, looping");
            self.seek(Seek::new(Duration::ZERO));
        } else {
            self.pause();
            self.set_state(PlaybackState::Finished);
        }
    }

    fn on_time_control(&mut self, status: TimeControlStatus) {
        if self.state != PlaybackState::Playing {
            return;
        }
        match status {
            TimeControlStatus::Paused => self.set_control(ControlState::Paused),
            TimeControlStatus::Playing { rate } if (rate - self.rate).abs() < RATE_TOLERANCE => {
                self.set_control(ControlState::Playing);
            }
            TimeControlStatus::Playing { rate } => {
                // The configured rate is authoritative; correct the engine.
                tracing::debug!(engine_rate = rate, rate = self.rate, "Correcting engine rate");
                self.engine.set_rate(self.rate);
            }
            TimeControlStatus::WaitingToPlay => {}
        }
    }

    fn on_seek_completed(&mut self, id: SeekId, finished: bool) {
        let Some(mut seek) = self.intent.take_seek(id) else {
            tracing::debug!(seek_id = id.0, "Ignoring completion of a superseded seek");
            return;
        };

        match seek.stage {
            SeekStage::Stored => {
                // Never handed to the engine; this completion is not for it.
                self.intent.pending_seek = Some(seek);
            }
            SeekStage::Preloading => {
                tracing::debug!(seek_id = id.0, finished, "Seek before ready completed");
                self.calibrator.arm(seek.request.time);
                seek.request.complete(finished);
                self.finish_ready();
            }
            SeekStage::InFlight => {
                tracing::debug!(seek_id = id.0, finished, "Seek ended");
                let info = seek.info();
                self.calibrator.arm(info.time);
                seek.request.complete(finished);
                if self.can_start_engine() {
                    self.engine.play(self.rate);
                }
                self.events.push(PlayerEvent::SeekEnded(info));
            }
        }
    }
}
