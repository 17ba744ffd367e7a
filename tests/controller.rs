mod helpers;

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use audio_player::controller::{Collaborators, NowPlaying, NowPlayingInfo, PlaybackObserver};
use audio_player::engine::{EngineError, EngineEvent};
use audio_player::model::{
    ControlState, LoadingState, MemoryResumeStore, PlaybackMode, PlaybackState, ResumeState,
    ResumeStore, Seek, SeekInfo, Switchable,
};
use audio_player::{Error, PlayerConfig};
use helpers::{EngineCommand, Harness, Observed, Recorder, deliver, harness, item, make_playing, queue, secs};

fn default_harness() -> Harness {
    harness(&PlayerConfig::default(), Collaborators::default())
}

fn with_resume(id: &str, state: ResumeState) -> Harness {
    let mut store = MemoryResumeStore::new();
    store.set(id, state).expect("memory store");
    let collaborators = Collaborators {
        resume: Box::new(store),
        ..Collaborators::default()
    };
    harness(&PlayerConfig::default(), collaborators)
}

fn current_id(h: &Harness) -> Option<String> {
    h.controller.current_item().map(|item| item.id.clone())
}

#[test]
fn navigates_a_three_item_queue() {
    let mut h = default_harness();
    let abc = queue(&["A", "B", "C"]);

    h.controller.play_item(item("B"), abc).expect("B is queued");
    assert_eq!(h.engine.prepared(), vec!["res://B".to_string()]);

    deliver(&mut h.controller, EngineEvent::Ready);
    assert_eq!(*h.controller.state(), PlaybackState::Playing);
    assert_eq!(h.controller.switchable(), Switchable { prev: true, next: true });

    assert!(h.controller.next());
    assert_eq!(current_id(&h).as_deref(), Some("C"));
    assert_eq!(h.controller.switchable(), Switchable { prev: true, next: false });

    assert!(!h.controller.next());
    assert_eq!(current_id(&h).as_deref(), Some("C"));
    assert_eq!(h.engine.prepared(), vec!["res://B".to_string(), "res://C".to_string()]);

    assert!(h.controller.prev());
    assert_eq!(current_id(&h).as_deref(), Some("B"));
}

#[test]
fn play_item_announces_queue_then_item_once() {
    let mut h = default_harness();

    h.controller.play_item(item("B"), queue(&["A", "B", "C"])).expect("B is queued");

    assert_eq!(
        h.recorder.seen(),
        vec![
            Observed::Queue(vec!["A".into(), "B".into(), "C".into()]),
            Observed::Loading(LoadingState::Began),
            Observed::State(PlaybackState::Preparing),
            Observed::Item(Some("B".into())),
        ]
    );
}

#[test]
fn old_item_teardown_is_announced_before_the_new_item() {
    let mut h = default_harness();
    h.controller.play_item(item("A"), queue(&["A", "B"])).expect("A is queued");
    make_playing(&mut h.controller);
    let seek = h.controller.seek(Seek::new(secs(30)));
    h.recorder.take();

    assert!(h.controller.next());

    let seen = h.recorder.seen();
    assert_eq!(seen.last(), Some(&Observed::Item(Some("B".into()))));
    assert_eq!(seen.iter().filter(|o| matches!(o, Observed::Item(_))).count(), 1);
    assert!(seen.contains(&Observed::SeekEnded(SeekInfo { id: seek, time: secs(30) })));
    assert!(seen.contains(&Observed::Control(ControlState::Paused)));
    assert!(seen.contains(&Observed::State(PlaybackState::Preparing)));
    assert_eq!(h.controller.resume_state(&item("B")), None);
}

#[test]
fn play_item_outside_queue_is_rejected() {
    let mut h = default_harness();

    let result = h.controller.play_item(item("Z"), queue(&["A", "B"]));

    assert!(matches!(result, Err(Error::ItemNotInQueue(id)) if id == "Z"));
    assert!(h.recorder.seen().is_empty());
    assert!(h.engine.commands().is_empty());
    assert!(h.controller.current_item().is_none());
}

#[test]
fn resume_position_is_sought_before_playing() {
    let mut h = with_resume("B", ResumeState::at(secs(40)));

    h.controller.play_item(item("B"), queue(&["A", "B"])).expect("B is queued");
    assert!(h.engine.seeks().is_empty());

    deliver(&mut h.controller, EngineEvent::Ready);
    let (id, target) = h.engine.last_seek().expect("resume seek");
    assert_eq!(target, secs(40));
    assert_eq!(*h.controller.state(), PlaybackState::Preparing);

    deliver(&mut h.controller, EngineEvent::SeekCompleted { id, finished: true });
    assert_eq!(*h.controller.state(), PlaybackState::Playing);
    assert_eq!(h.controller.current_time(), secs(40));
    assert_eq!(h.controller.resume_state(&item("B")), Some(ResumeState::at(secs(40))));
}

#[test]
fn played_items_start_from_the_beginning() {
    let mut h = with_resume("B", ResumeState::Played);

    h.controller.play_item(item("B"), queue(&["A", "B"])).expect("B is queued");
    deliver(&mut h.controller, EngineEvent::Ready);

    assert!(h.engine.seeks().is_empty());
    assert_eq!(*h.controller.state(), PlaybackState::Playing);
}

#[test]
fn finishing_advances_sequentially_and_marks_played() {
    let mut h = default_harness();
    h.controller.play_item(item("A"), queue(&["A", "B"])).expect("A is queued");
    make_playing(&mut h.controller);

    deliver(&mut h.controller, EngineEvent::ReachedEnd);

    assert_eq!(h.controller.resume_state(&item("A")), Some(ResumeState::Played));
    assert_eq!(current_id(&h).as_deref(), Some("B"));
    assert_eq!(*h.controller.state(), PlaybackState::Preparing);
}

#[test]
fn finishing_the_last_item_stays_finished() {
    let mut h = default_harness();
    h.controller.play_item(item("B"), queue(&["A", "B"])).expect("B is queued");
    make_playing(&mut h.controller);

    deliver(&mut h.controller, EngineEvent::ReachedEnd);

    assert_eq!(current_id(&h).as_deref(), Some("B"));
    assert_eq!(*h.controller.state(), PlaybackState::Finished);
}

#[test]
fn random_mode_picks_another_item() {
    let mut h = default_harness();
    h.controller.set_mode(PlaybackMode::Random);
    h.controller.play_item(item("A"), queue(&["A", "B"])).expect("A is queued");
    make_playing(&mut h.controller);

    deliver(&mut h.controller, EngineEvent::ReachedEnd);

    assert_eq!(current_id(&h).as_deref(), Some("B"));
}

#[test]
fn single_mode_loops_the_item() {
    let mut h = default_harness();
    h.controller.set_mode(PlaybackMode::Single);
    assert!(h.controller.player().is_loop());
    h.controller.play_item(item("A"), queue(&["A", "B"])).expect("A is queued");
    make_playing(&mut h.controller);

    deliver(&mut h.controller, EngineEvent::ReachedEnd);

    assert_eq!(current_id(&h).as_deref(), Some("A"));
    assert_eq!(*h.controller.state(), PlaybackState::Playing);
    assert!(!h.recorder.states().contains(&PlaybackState::Finished));
    assert_eq!(h.engine.last_seek().map(|(_, target)| target), Some(secs(0)));
}

#[test]
fn mode_change_is_announced_once() {
    let mut h = default_harness();

    h.controller.set_mode(PlaybackMode::Random);
    h.controller.set_mode(PlaybackMode::Random);

    assert_eq!(h.recorder.seen(), vec![Observed::Mode(PlaybackMode::Random)]);
    assert!(!h.controller.player().is_loop());
}

#[test]
fn failure_is_recorded_and_replay_prepares_again() {
    let mut h = default_harness();
    h.controller.play_item(item("A"), queue(&["A"])).expect("A is queued");

    deliver(&mut h.controller, EngineEvent::Failed(Some(EngineError::Network("offline".into()))));

    assert!(h.controller.state().is_failed());
    assert_eq!(h.controller.resume_state(&item("A")), Some(ResumeState::Failed));

    h.controller.replay();
    assert_eq!(*h.controller.state(), PlaybackState::Preparing);
    assert_eq!(h.engine.prepared().len(), 2);
    assert_eq!(current_id(&h).as_deref(), Some("A"));
}

#[test]
fn failure_does_not_overwrite_a_saved_position() {
    let mut h = with_resume("A", ResumeState::at(secs(12)));
    h.controller.play_item(item("A"), queue(&["A"])).expect("A is queued");

    deliver(&mut h.controller, EngineEvent::Failed(None));

    assert_eq!(h.controller.resume_state(&item("A")), Some(ResumeState::at(secs(12))));
}

#[test]
fn position_writes_are_throttled_until_termination() {
    let mut h = default_harness();
    h.controller.play_item(item("A"), queue(&["A"])).expect("A is queued");
    make_playing(&mut h.controller);

    h.engine.set_position(Duration::from_millis(500));
    h.controller.tick();
    h.engine.set_position(Duration::from_millis(1200));
    h.controller.tick();
    assert_eq!(
        h.controller.resume_state(&item("A")),
        Some(ResumeState::at(Duration::from_millis(500)))
    );

    h.controller.handle_lifecycle(audio_player::controller::LifecycleEvent::WillTerminate);
    assert_eq!(
        h.controller.resume_state(&item("A")),
        Some(ResumeState::at(Duration::from_millis(1200)))
    );
}

#[test]
fn rate_waits_for_playback() {
    let config = PlayerConfig {
        autoplay: false,
        ..PlayerConfig::default()
    };
    let mut h = harness(&config, Collaborators::default());
    h.controller.play_item(item("A"), queue(&["A"])).expect("A is queued");
    deliver(&mut h.controller, EngineEvent::Ready);
    h.engine.drain();

    h.controller.set_rate(1.25);
    assert!(h.engine.commands().is_empty());

    h.controller.play();
    assert_eq!(h.engine.commands(), vec![EngineCommand::Play(1.25)]);
}

#[test]
fn unsubscribed_and_dropped_observers_hear_nothing() {
    let mut h = default_harness();
    let extra = Arc::new(Recorder::default());
    let observer: Arc<dyn PlaybackObserver> = extra.clone();
    let id = h.controller.subscribe(&observer);
    drop(observer);

    assert!(h.controller.unsubscribe(id));
    h.controller.set_mode(PlaybackMode::Random);

    assert!(extra.seen().is_empty());
    assert_eq!(h.recorder.seen().len(), 1);
}

#[derive(Clone, Default)]
struct SurfaceLog {
    published: Arc<Mutex<Vec<NowPlayingInfo>>>,
    cleared: Arc<Mutex<usize>>,
    switchable: Arc<Mutex<Option<Switchable>>>,
}

impl NowPlaying for SurfaceLog {
    fn publish(&mut self, info: &NowPlayingInfo) {
        self.published.lock().push(info.clone());
    }

    fn clear(&mut self) {
        *self.cleared.lock() += 1;
    }

    fn set_switchable(&mut self, switchable: Switchable) {
        *self.switchable.lock() = Some(switchable);
    }
}

#[test]
fn now_playing_follows_the_item() {
    let surface = SurfaceLog::default();
    let collaborators = Collaborators {
        now_playing: Box::new(surface.clone()),
        ..Collaborators::default()
    };
    let mut h = harness(&PlayerConfig::default(), collaborators);

    h.controller.play_item(item("A"), queue(&["A", "B"])).expect("A is queued");
    {
        let published = surface.published.lock();
        assert_eq!(published[0].title, "Title A");
        assert_eq!(published[0].resource, "res://A");
        assert_eq!(published[0].duration, secs(100));
    }
    assert_eq!(*surface.switchable.lock(), Some(Switchable { prev: false, next: true }));

    make_playing(&mut h.controller);
    let last = surface.published.lock().last().cloned().expect("refreshed");
    assert_eq!(last.rate, 1.0);

    h.controller.stop();
    assert_eq!(*surface.cleared.lock(), 1);
}
