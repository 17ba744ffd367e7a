//! Playback queue: an ordered, immutable list of playable items

use std::collections::HashMap;
use std::time::Duration;

use rand::Rng;
use rand::seq::IteratorRandom;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use super::types::Switchable;

/// A playable entry of a queue. Two items are equal when their ids are.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QueueItem {
    pub id: String,
    pub title: String,
    pub author: String,
    #[serde(default)]
    pub cover: String,
    /// URI handed to the engine
    pub resource: String,
    #[serde(default, with = "seconds")]
    pub duration: Duration,
}

impl QueueItem {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        author: impl Into<String>,
        resource: impl Into<String>,
        duration: Duration,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            author: author.into(),
            cover: String::new(),
            resource: resource.into(),
            duration,
        }
    }

    pub fn with_cover(mut self, cover: impl Into<String>) -> Self {
        self.cover = cover.into();
        self
    }
}

impl PartialEq for QueueItem {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for QueueItem {}

/// Ordered collection of items with prev/next/random lookup
///
/// Item ids are unique within a queue; construction rejects duplicates.
#[derive(Clone, Debug, Default)]
pub struct Queue {
    items: Vec<QueueItem>,
    index: HashMap<String, usize>,
}

impl Queue {
    pub fn new(items: Vec<QueueItem>) -> Result<Self> {
        let mut index = HashMap::with_capacity(items.len());
        for (position, item) in items.iter().enumerate() {
            if index.insert(item.id.clone(), position).is_some() {
                return Err(Error::DuplicateQueueItem(item.id.clone()));
            }
        }
        Ok(Self { items, index })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[QueueItem] {
        &self.items
    }

    pub fn item(&self, at: usize) -> Option<&QueueItem> {
        self.items.get(at)
    }

    pub fn position(&self, item: &QueueItem) -> Option<usize> {
        self.index.get(&item.id).copied()
    }

    pub fn contains(&self, item: &QueueItem) -> bool {
        self.index.contains_key(&item.id)
    }

    pub fn prev(&self, of: &QueueItem) -> Option<&QueueItem> {
        let position = self.position(of)?;
        position.checked_sub(1).and_then(|p| self.items.get(p))
    }

    pub fn next(&self, of: &QueueItem) -> Option<&QueueItem> {
        let position = self.position(of)?;
        self.items.get(position + 1)
    }

    /// A uniformly chosen item other than `of`.
    ///
    /// A single-entry queue returns its only entry; an empty queue returns `None`.
    pub fn random(&self, of: &QueueItem) -> Option<&QueueItem> {
        self.random_with(of, &mut rand::thread_rng())
    }

    pub fn random_with<R: Rng + ?Sized>(&self, of: &QueueItem, rng: &mut R) -> Option<&QueueItem> {
        match self.items.len() {
            0 => None,
            1 => self.items.first(),
            _ => self.items.iter().filter(|candidate| candidate.id != of.id).choose(rng),
        }
    }

    pub fn switchable(&self, of: &QueueItem) -> Switchable {
        Switchable {
            prev: self.prev(of).is_some(),
            next: self.next(of).is_some(),
        }
    }
}

impl TryFrom<Vec<QueueItem>> for Queue {
    type Error = Error;

    fn try_from(items: Vec<QueueItem>) -> Result<Self> {
        Self::new(items)
    }
}

/// Durations in playlist files are plain seconds
mod seconds {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}
