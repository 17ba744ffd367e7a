//! Now-playing surface: the system-wide "what is playing" display

use std::time::Duration;

use crate::model::{QueueItem, Switchable};

#[derive(Clone, Debug, PartialEq)]
pub struct NowPlayingInfo {
    pub title: String,
    pub artist: String,
    pub cover: String,
    pub resource: String,
    pub duration: Duration,
    pub elapsed: Duration,
    pub rate: f64,
}

impl NowPlayingInfo {
    pub fn for_item(item: &QueueItem, rate: f64) -> Self {
        Self {
            title: item.title.clone(),
            artist: item.author.clone(),
            cover: item.cover.clone(),
            resource: item.resource.clone(),
            duration: item.duration,
            elapsed: Duration::ZERO,
            rate,
        }
    }
}

pub trait NowPlaying: Send {
    fn publish(&mut self, info: &NowPlayingInfo);

    fn clear(&mut self);

    /// Enable or disable the previous/next buttons
    fn set_switchable(&mut self, _switchable: Switchable) {}
}

/// Surface that only writes to the log
#[derive(Debug, Default)]
pub struct TracingNowPlaying;

impl NowPlaying for TracingNowPlaying {
    fn publish(&mut self, info: &NowPlayingInfo) {
        tracing::debug!(
            title = %info.title,
            artist = %info.artist,
            elapsed_ms = info.elapsed.as_millis() as u64,
            duration_ms = info.duration.as_millis() as u64,
            rate = info.rate,
            "Now playing"
        );
    }

    fn clear(&mut self) {
        tracing::debug!("Now playing cleared");
    }
}
