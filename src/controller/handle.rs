//! Async driver
//!
//! [`spawn`] moves a [`PlaybackController`] into a single tokio task. Commands
//! from every [`PlaybackHandle`], engine messages and the position tick are
//! applied one at a time in that task, so the controller never needs a lock.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::engine::EngineMessage;
use crate::error::{Error, Result};
use crate::model::{ControlState, LoadingState, PlaybackMode, PlaybackState, Queue, QueueItem, Seek, Switchable};
use super::{LifecycleEvent, ObserverId, PlaybackController, PlaybackObserver, RemoteCommand, RemoteCommandStatus};

/// Everything a handle can ask of the controller task
pub enum Command {
    PlayItem {
        item: QueueItem,
        queue: Arc<Queue>,
        reply: oneshot::Sender<Result<()>>,
    },
    Play,
    Pause,
    Stop,
    Next(oneshot::Sender<bool>),
    Prev(oneshot::Sender<bool>),
    Replay,
    Seek(Seek),
    SetRate(f64),
    SetVolume(f64),
    SetMuted(bool),
    SetMode(PlaybackMode),
    Lifecycle(LifecycleEvent),
    Remote(RemoteCommand, oneshot::Sender<RemoteCommandStatus>),
    Subscribe(Arc<dyn PlaybackObserver>, oneshot::Sender<ObserverId>),
    Unsubscribe(ObserverId),
    Snapshot(oneshot::Sender<PlaybackSnapshot>),
    Shutdown,
}

/// Point-in-time copy of the controller's observable state
#[derive(Clone, Debug, PartialEq)]
pub struct PlaybackSnapshot {
    pub state: PlaybackState,
    pub control: ControlState,
    pub loading: LoadingState,
    pub item: Option<QueueItem>,
    pub queue_len: usize,
    pub switchable: Switchable,
    pub mode: PlaybackMode,
    pub current_time: Duration,
    pub duration: Duration,
    pub buffer: f64,
    pub rate: f64,
}

impl PlaybackController {
    pub fn snapshot(&self) -> PlaybackSnapshot {
        PlaybackSnapshot {
            state: self.state().clone(),
            control: self.control(),
            loading: self.loading(),
            item: self.current_item().cloned(),
            queue_len: self.current_queue().len(),
            switchable: self.switchable(),
            mode: self.mode(),
            current_time: self.current_time(),
            duration: self.duration(),
            buffer: self.buffer(),
            rate: self.rate(),
        }
    }

    fn apply(&mut self, command: Command) {
        match command {
            Command::PlayItem { item, queue, reply } => {
                let _ = reply.send(self.play_item(item, queue));
            }
            Command::Play => self.play(),
            Command::Pause => self.pause(),
            Command::Stop => self.stop(),
            Command::Next(reply) => {
                let _ = reply.send(self.next());
            }
            Command::Prev(reply) => {
                let _ = reply.send(self.prev());
            }
            Command::Replay => self.replay(),
            Command::Seek(request) => {
                self.seek(request);
            }
            Command::SetRate(rate) => self.set_rate(rate),
            Command::SetVolume(volume) => self.set_volume(volume),
            Command::SetMuted(muted) => self.set_muted(muted),
            Command::SetMode(mode) => self.set_mode(mode),
            Command::Lifecycle(event) => self.handle_lifecycle(event),
            Command::Remote(command, reply) => {
                let _ = reply.send(self.handle_remote(command));
            }
            Command::Subscribe(observer, reply) => {
                let _ = reply.send(self.subscribe(&observer));
            }
            Command::Unsubscribe(id) => {
                self.unsubscribe(id);
            }
            Command::Snapshot(reply) => {
                let _ = reply.send(self.snapshot());
            }
            Command::Shutdown => {}
        }
    }
}

/// Cloneable sender side of the controller task
#[derive(Clone)]
pub struct PlaybackHandle {
    commands: mpsc::UnboundedSender<Command>,
}

impl PlaybackHandle {
    fn send(&self, command: Command) -> Result<()> {
        self.commands.send(command).map_err(|_| Error::ControllerClosed)
    }

    async fn ask<T>(&self, command: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.send(command(tx))?;
        rx.await.map_err(|_| Error::ControllerClosed)
    }

    pub async fn play_item(&self, item: QueueItem, queue: Arc<Queue>) -> Result<()> {
        self.ask(|reply| Command::PlayItem { item, queue, reply }).await?
    }

    pub fn play(&self) -> Result<()> {
        self.send(Command::Play)
    }

    pub fn pause(&self) -> Result<()> {
        self.send(Command::Pause)
    }

    pub fn stop(&self) -> Result<()> {
        self.send(Command::Stop)
    }

    pub async fn next(&self) -> Result<bool> {
        self.ask(Command::Next).await
    }

    pub async fn prev(&self) -> Result<bool> {
        self.ask(Command::Prev).await
    }

    pub fn replay(&self) -> Result<()> {
        self.send(Command::Replay)
    }

    pub fn seek(&self, request: Seek) -> Result<()> {
        self.send(Command::Seek(request))
    }

    pub fn set_rate(&self, rate: f64) -> Result<()> {
        self.send(Command::SetRate(rate))
    }

    pub fn set_volume(&self, volume: f64) -> Result<()> {
        self.send(Command::SetVolume(volume))
    }

    pub fn set_muted(&self, muted: bool) -> Result<()> {
        self.send(Command::SetMuted(muted))
    }

    pub fn set_mode(&self, mode: PlaybackMode) -> Result<()> {
        self.send(Command::SetMode(mode))
    }

    pub fn lifecycle(&self, event: LifecycleEvent) -> Result<()> {
        self.send(Command::Lifecycle(event))
    }

    pub async fn remote(&self, command: RemoteCommand) -> Result<RemoteCommandStatus> {
        self.ask(|reply| Command::Remote(command, reply)).await
    }

    pub async fn subscribe(&self, observer: Arc<dyn PlaybackObserver>) -> Result<ObserverId> {
        self.ask(|reply| Command::Subscribe(observer, reply)).await
    }

    pub fn unsubscribe(&self, id: ObserverId) -> Result<()> {
        self.send(Command::Unsubscribe(id))
    }

    pub async fn snapshot(&self) -> Result<PlaybackSnapshot> {
        self.ask(Command::Snapshot).await
    }

    /// Stop the task. Await the join handle from [`spawn`] to get the controller back.
    pub fn shutdown(&self) -> Result<()> {
        self.send(Command::Shutdown)
    }
}

const MIN_TICK: Duration = Duration::from_millis(1);

/// Run `controller` on its own task.
///
/// The task ends on [`PlaybackHandle::shutdown`] or once every handle is
/// dropped, and yields the controller back through the join handle.
pub fn spawn(
    mut controller: PlaybackController,
    mut engine_events: mpsc::UnboundedReceiver<EngineMessage>,
    tick: Duration,
) -> (PlaybackHandle, JoinHandle<PlaybackController>) {
    let (commands, mut command_rx) = mpsc::unbounded_channel();
    // `interval` rejects a zero period.
    let tick = tick.max(MIN_TICK);

    let task = tokio::spawn(async move {
        tracing::info!(tick_ms = tick.as_millis() as u64, "Playback controller task started");
        let mut ticker = tokio::time::interval(tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                command = command_rx.recv() => match command {
                    Some(Command::Shutdown) | None => break,
                    Some(command) => controller.apply(command),
                },
                Some(message) = engine_events.recv() => controller.handle_engine_message(message),
                _ = ticker.tick() => controller.tick(),
            }
        }

        tracing::info!("Playback controller task shutting down");
        controller
    });

    (PlaybackHandle { commands }, task)
}
