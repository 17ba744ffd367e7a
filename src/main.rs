use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use parking_lot::Mutex;
use tokio::sync::mpsc;

use audio_player::controller::{self, Collaborators, PlaybackObserver};
use audio_player::engine::SimulatedEngine;
use audio_player::model::{
    ControlState, JsonResumeStore, PlaybackMode, PlaybackState, Queue, QueueItem, ResumeStore,
    Seek, SeekInfo,
};
use audio_player::{Config, PlaybackController, logging};

const CONFIG_ENV: &str = "AUDIO_PLAYER_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "audio-player.toml";

/// Prints what the controller reports, remembering the last position for the summary
#[derive(Default)]
struct ConsoleObserver {
    last_time: Mutex<Duration>,
}

impl PlaybackObserver for ConsoleObserver {
    fn on_playback_state(&self, state: &PlaybackState) {
        println!("  state    -> {}", state);
    }

    fn on_control_state(&self, state: ControlState) {
        println!("  control  -> {:?}", state);
    }

    fn on_current_time_updated(&self, time: Duration) {
        *self.last_time.lock() = time;
    }

    fn on_seek_began(&self, seek: SeekInfo) {
        println!("  seek #{} began -> {:.1}s", seek.id.0, seek.time.as_secs_f64());
    }

    fn on_seek_ended(&self, seek: SeekInfo) {
        println!("  seek #{} ended", seek.id.0);
    }

    fn on_item_changed(&self, item: Option<&QueueItem>) {
        match item {
            Some(item) => println!("now playing: {} - {}", item.author, item.title),
            None => println!("nothing playing"),
        }
    }

    fn on_mode_changed(&self, mode: PlaybackMode) {
        println!("  mode     -> {:?}", mode);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let config = Config::load_or_default(&config_path)
        .with_context(|| format!("loading configuration from {}", config_path))?;

    if let Err(e) = logging::init_logging(&config.logging) {
        eprintln!("Warning: Failed to initialize logging: {}", e);
    }
    tracing::info!("=== Audio player demo starting ===");

    let queue = match std::env::args().nth(1) {
        Some(path) => load_playlist(Path::new(&path))?,
        None => builtin_queue()?,
    };
    let queue = Arc::new(queue);
    let Some(first) = queue.item(0).cloned() else {
        anyhow::bail!("playlist is empty");
    };

    let mut collaborators = Collaborators::default();
    if let Some(path) = &config.resume.path {
        collaborators.resume = open_resume_store(path)?;
    }

    let (engine_tx, engine_rx) = mpsc::unbounded_channel();
    let engine = SimulatedEngine::new(engine_tx).with_queue(&queue);
    let controller = PlaybackController::new(Box::new(engine), &config.player, collaborators);
    let (handle, task) = controller::spawn(controller, engine_rx, config.player.tick_interval());

    let console = Arc::new(ConsoleObserver::default());
    let observer: Arc<dyn PlaybackObserver> = console.clone();
    handle.subscribe(observer).await?;

    handle.play_item(first, queue.clone()).await?;
    tokio::time::sleep(Duration::from_millis(600)).await;

    handle.seek(Seek::with_completion(Duration::from_secs(2), |finished| {
        tracing::debug!(finished, "Demo seek completed");
    }))?;
    tokio::time::sleep(Duration::from_millis(400)).await;

    if !handle.next().await? {
        println!("no next item");
    }
    tokio::time::sleep(Duration::from_millis(600)).await;

    handle.set_mode(PlaybackMode::Single)?;
    handle.set_rate(1.5)?;
    tokio::time::sleep(Duration::from_millis(400)).await;

    let snapshot = handle.snapshot().await?;
    println!(
        "at {:.1}s of {:.1}s, rate {}, last reported {:.1}s",
        snapshot.current_time.as_secs_f64(),
        snapshot.duration.as_secs_f64(),
        snapshot.rate,
        console.last_time.lock().as_secs_f64()
    );

    handle.shutdown()?;
    let mut controller = task.await.context("controller task panicked")?;
    controller.stop();

    tracing::info!("Audio player demo shutting down");
    Ok(())
}

fn load_playlist(path: &Path) -> Result<Queue> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading playlist {}", path.display()))?;
    let items: Vec<QueueItem> = serde_json::from_str(&content)
        .with_context(|| format!("parsing playlist {}", path.display()))?;
    Ok(Queue::new(items)?)
}

fn builtin_queue() -> Result<Queue> {
    let items = vec![
        QueueItem::new("ep-1", "Opening Night", "The Demo Hour", "sim://ep-1", Duration::from_secs(30)),
        QueueItem::new("ep-2", "Second Act", "The Demo Hour", "sim://ep-2", Duration::from_secs(45)),
        QueueItem::new("ep-3", "Curtain Call", "The Demo Hour", "sim://ep-3", Duration::from_secs(20)),
    ];
    Ok(Queue::new(items)?)
}

fn open_resume_store(path: &Path) -> Result<Box<dyn ResumeStore>> {
    let store = JsonResumeStore::open(path)
        .with_context(|| format!("opening resume store {}", path.display()))?;
    Ok(Box::new(store))
}
