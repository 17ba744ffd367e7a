#![allow(dead_code)]

use std::ops::Range;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use audio_player::controller::{Collaborators, PlaybackController, PlaybackObserver};
use audio_player::engine::{Engine, EngineEvent, EngineMessage, ItemToken, PrepareOptions, SeekId};
use audio_player::model::{
    ControlState, LoadingState, PlaybackMode, PlaybackState, Queue, QueueItem, SeekInfo,
};
use audio_player::{Player, PlayerConfig};

pub const fn secs(s: u64) -> Duration {
    Duration::from_secs(s)
}

/// Every call the player made on the engine, in order
#[derive(Clone, Debug, PartialEq)]
pub enum EngineCommand {
    Prepare(String),
    Play(f64),
    Pause,
    Stop,
    Seek(SeekId, Duration),
    CancelPendingSeeks,
    SetRate(f64),
    SetVolume(f64),
    SetMuted(bool),
}

#[derive(Default)]
struct ProbeState {
    commands: Vec<EngineCommand>,
    position: Duration,
    seekable: Option<Range<Duration>>,
}

/// Test-side view of a [`ScriptedEngine`]
#[derive(Clone, Default)]
pub struct EngineProbe {
    state: Arc<Mutex<ProbeState>>,
}

impl EngineProbe {
    pub fn commands(&self) -> Vec<EngineCommand> {
        self.state.lock().commands.clone()
    }

    /// Commands recorded since the last call, clearing the record
    pub fn drain(&self) -> Vec<EngineCommand> {
        std::mem::take(&mut self.state.lock().commands)
    }

    pub fn seeks(&self) -> Vec<(SeekId, Duration)> {
        self.commands()
            .into_iter()
            .filter_map(|command| match command {
                EngineCommand::Seek(id, target) => Some((id, target)),
                _ => None,
            })
            .collect()
    }

    pub fn last_seek(&self) -> Option<(SeekId, Duration)> {
        self.seeks().pop()
    }

    pub fn prepared(&self) -> Vec<String> {
        self.commands()
            .into_iter()
            .filter_map(|command| match command {
                EngineCommand::Prepare(resource) => Some(resource),
                _ => None,
            })
            .collect()
    }

    pub fn play_count(&self) -> usize {
        self.commands()
            .iter()
            .filter(|command| matches!(command, EngineCommand::Play(_)))
            .count()
    }

    pub fn set_position(&self, position: Duration) {
        self.state.lock().position = position;
    }

    pub fn set_seekable(&self, range: Option<Range<Duration>>) {
        self.state.lock().seekable = range;
    }
}

/// Engine that does nothing but record; tests deliver events by hand
pub struct ScriptedEngine {
    probe: EngineProbe,
}

impl ScriptedEngine {
    pub fn new() -> (Self, EngineProbe) {
        let probe = EngineProbe::default();
        (Self { probe: probe.clone() }, probe)
    }

    fn record(&self, command: EngineCommand) {
        self.probe.state.lock().commands.push(command);
    }
}

impl Engine for ScriptedEngine {
    fn prepare(&mut self, _item: ItemToken, resource: &str, _options: PrepareOptions) {
        self.record(EngineCommand::Prepare(resource.to_string()));
    }

    fn play(&mut self, rate: f64) {
        self.record(EngineCommand::Play(rate));
    }

    fn pause(&mut self) {
        self.record(EngineCommand::Pause);
    }

    fn stop(&mut self) {
        self.record(EngineCommand::Stop);
    }

    fn seek(&mut self, id: SeekId, target: Duration) {
        self.record(EngineCommand::Seek(id, target));
    }

    fn cancel_pending_seeks(&mut self) {
        self.record(EngineCommand::CancelPendingSeeks);
    }

    fn set_rate(&mut self, rate: f64) {
        self.record(EngineCommand::SetRate(rate));
    }

    fn set_volume(&mut self, volume: f64) {
        self.record(EngineCommand::SetVolume(volume));
    }

    fn set_muted(&mut self, muted: bool) {
        self.record(EngineCommand::SetMuted(muted));
    }

    fn position(&mut self) -> Duration {
        self.probe.state.lock().position
    }

    fn seekable_range(&self) -> Option<Range<Duration>> {
        self.probe.state.lock().seekable.clone()
    }
}

pub fn player(config: &PlayerConfig) -> (Player, EngineProbe) {
    let (engine, probe) = ScriptedEngine::new();
    (Player::new(Box::new(engine), config), probe)
}

pub fn send(player: &mut Player, event: EngineEvent) {
    let token = player.item_token();
    player.handle_engine(EngineMessage::new(token, event));
}

pub fn deliver(controller: &mut PlaybackController, event: EngineEvent) {
    let token = controller.player().item_token();
    controller.handle_engine_message(EngineMessage::new(token, event));
}

/// Ready and actually playing at the configured rate
pub fn make_playing(controller: &mut PlaybackController) {
    let rate = controller.rate();
    deliver(controller, EngineEvent::Ready);
    deliver(
        controller,
        EngineEvent::TimeControl(audio_player::engine::TimeControlStatus::Playing { rate }),
    );
}

pub fn item(id: &str) -> QueueItem {
    QueueItem::new(id, format!("Title {}", id), "Author", format!("res://{}", id), secs(100))
}

pub fn queue(ids: &[&str]) -> Arc<Queue> {
    let items = ids.iter().map(|id| item(id)).collect();
    Arc::new(Queue::new(items).expect("unique ids"))
}

/// What a [`Recorder`] saw, in delivery order
#[derive(Clone, Debug, PartialEq)]
pub enum Observed {
    State(PlaybackState),
    Control(ControlState),
    Loading(LoadingState),
    Buffer(f64),
    Duration(Duration),
    Time(Duration),
    SeekBegan(SeekInfo),
    SeekEnded(SeekInfo),
    Queue(Vec<String>),
    Item(Option<String>),
    Mode(PlaybackMode),
}

#[derive(Default)]
pub struct Recorder {
    seen: Mutex<Vec<Observed>>,
}

impl Recorder {
    pub fn seen(&self) -> Vec<Observed> {
        self.seen.lock().clone()
    }

    pub fn take(&self) -> Vec<Observed> {
        std::mem::take(&mut *self.seen.lock())
    }

    pub fn states(&self) -> Vec<PlaybackState> {
        self.seen()
            .into_iter()
            .filter_map(|observed| match observed {
                Observed::State(state) => Some(state),
                _ => None,
            })
            .collect()
    }

    fn push(&self, observed: Observed) {
        self.seen.lock().push(observed);
    }
}

impl PlaybackObserver for Recorder {
    fn on_playback_state(&self, state: &PlaybackState) {
        self.push(Observed::State(state.clone()));
    }

    fn on_control_state(&self, state: ControlState) {
        self.push(Observed::Control(state));
    }

    fn on_loading_state(&self, state: LoadingState) {
        self.push(Observed::Loading(state));
    }

    fn on_buffer_updated(&self, progress: f64) {
        self.push(Observed::Buffer(progress));
    }

    fn on_duration_updated(&self, duration: Duration) {
        self.push(Observed::Duration(duration));
    }

    fn on_current_time_updated(&self, time: Duration) {
        self.push(Observed::Time(time));
    }

    fn on_seek_began(&self, seek: SeekInfo) {
        self.push(Observed::SeekBegan(seek));
    }

    fn on_seek_ended(&self, seek: SeekInfo) {
        self.push(Observed::SeekEnded(seek));
    }

    fn on_queue_changed(&self, queue: &Queue) {
        self.push(Observed::Queue(queue.items().iter().map(|item| item.id.clone()).collect()));
    }

    fn on_item_changed(&self, item: Option<&QueueItem>) {
        self.push(Observed::Item(item.map(|item| item.id.clone())));
    }

    fn on_mode_changed(&self, mode: PlaybackMode) {
        self.push(Observed::Mode(mode));
    }
}

pub struct Harness {
    pub controller: PlaybackController,
    pub engine: EngineProbe,
    pub recorder: Arc<Recorder>,
}

pub fn harness(config: &PlayerConfig, collaborators: Collaborators) -> Harness {
    let (engine, probe) = ScriptedEngine::new();
    let mut controller = PlaybackController::new(Box::new(engine), config, collaborators);
    let recorder = Arc::new(Recorder::default());
    let observer: Arc<dyn PlaybackObserver> = recorder.clone();
    controller.subscribe(&observer);
    Harness {
        controller,
        engine: probe,
        recorder,
    }
}
