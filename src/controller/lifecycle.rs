//! Host lifecycle and remote-control commands
//!
//! The host (application shell, OS integration) forwards its events as plain
//! [`LifecycleEvent`] values; nothing here listens on a global bus.

use crate::model::{ControlState, PlaybackState};
use super::PlaybackController;

/// Handle for a granted stretch of extra execution time
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ExecutionToken(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RouteChangeReason {
    NewDeviceAvailable,
    /// Headphones unplugged, bluetooth device gone
    OldDeviceUnavailable,
    Other,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LifecycleEvent {
    EnteredBackground,
    EnteredForeground,
    InterruptionBegan,
    InterruptionEnded,
    RouteChanged(RouteChangeReason),
    ExtendedExecutionExpired(ExecutionToken),
    WillTerminate,
}

/// Lets the controller keep the process alive while an item loads in the background
pub trait LifecycleHost: Send {
    fn begin_extended_execution(&mut self) -> ExecutionToken;

    fn end_extended_execution(&mut self, token: ExecutionToken);
}

/// Host without a suspension model: tokens are handed out and forgotten
#[derive(Debug, Default)]
pub struct NoopLifecycleHost;

impl LifecycleHost for NoopLifecycleHost {
    fn begin_extended_execution(&mut self) -> ExecutionToken {
        ExecutionToken(0)
    }

    fn end_extended_execution(&mut self, _token: ExecutionToken) {}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RemoteCommand {
    Play,
    Pause,
    Next,
    Prev,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RemoteCommandStatus {
    Success,
    NoSuchContent,
}

impl RemoteCommandStatus {
    fn from_bool(done: bool) -> Self {
        if done { Self::Success } else { Self::NoSuchContent }
    }
}

impl PlaybackController {
    pub fn handle_lifecycle(&mut self, event: LifecycleEvent) {
        tracing::debug!(?event, state = %self.player.state(), "Lifecycle event");
        match event {
            LifecycleEvent::EnteredBackground => self.entered_background(),
            LifecycleEvent::EnteredForeground => self.entered_foreground(),
            LifecycleEvent::InterruptionBegan => {
                self.interrupted = true;
                self.player.suspend_output();
            }
            LifecycleEvent::InterruptionEnded => {
                // A user pause during the interruption clears the wish to play.
                if std::mem::take(&mut self.interrupted) && !self.held_by_background() {
                    self.player.resume_output();
                }
            }
            LifecycleEvent::RouteChanged(RouteChangeReason::OldDeviceUnavailable) => {
                tracing::info!("Output device went away, pausing");
                self.player.pause();
            }
            LifecycleEvent::RouteChanged(_) => {}
            LifecycleEvent::ExtendedExecutionExpired(token) => {
                if self.background_task == Some(token) {
                    tracing::warn!(token = token.0, "Extended execution expired");
                    self.end_background_task();
                }
            }
            LifecycleEvent::WillTerminate => {
                self.end_background_task();
                self.record_resume_state();
            }
        }
        self.pump();
    }

    fn entered_background(&mut self) {
        self.in_background = true;
        if !self.allow_background_playback {
            tracing::debug!("Background playback disallowed, suspending output");
            self.player.suspend_output();
        } else if *self.player.state() == PlaybackState::Preparing && self.background_task.is_none() {
            let token = self.lifecycle.begin_extended_execution();
            tracing::debug!(token = token.0, "Extended execution started for loading item");
            self.background_task = Some(token);
        }
    }

    fn entered_foreground(&mut self) {
        self.in_background = false;
        self.end_background_task();
        if !self.interrupted {
            self.player.resume_output();
        }
    }

    fn held_by_background(&self) -> bool {
        self.in_background && !self.allow_background_playback
    }

    pub(crate) fn end_background_task(&mut self) {
        if let Some(token) = self.background_task.take() {
            tracing::debug!(token = token.0, "Extended execution released");
            self.lifecycle.end_extended_execution(token);
        }
    }

    pub fn is_in_background(&self) -> bool {
        self.in_background
    }

    pub fn has_background_task(&self) -> bool {
        self.background_task.is_some()
    }

    // ========================================================================
    // Remote commands
    // ========================================================================

    pub fn handle_remote(&mut self, command: RemoteCommand) -> RemoteCommandStatus {
        match command {
            RemoteCommand::Play => self.remote_play(),
            RemoteCommand::Pause => self.remote_pause(),
            RemoteCommand::Next => self.remote_next(),
            RemoteCommand::Prev => self.remote_prev(),
        }
    }

    pub fn remote_play(&mut self) -> RemoteCommandStatus {
        let playable = match self.player.state() {
            PlaybackState::Playing => self.player.control() == ControlState::Paused,
            PlaybackState::Finished => true,
            _ => false,
        };
        if playable {
            self.play();
        }
        RemoteCommandStatus::from_bool(playable)
    }

    pub fn remote_pause(&mut self) -> RemoteCommandStatus {
        let pausable = *self.player.state() == PlaybackState::Playing
            && self.player.control() == ControlState::Playing;
        if pausable {
            self.pause();
        }
        RemoteCommandStatus::from_bool(pausable)
    }

    pub fn remote_next(&mut self) -> RemoteCommandStatus {
        RemoteCommandStatus::from_bool(self.next())
    }

    pub fn remote_prev(&mut self) -> RemoteCommandStatus {
        RemoteCommandStatus::from_bool(self.prev())
    }
}
