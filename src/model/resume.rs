//! Resume positions: where each item was left off

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// What is remembered about an item between sessions
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ResumeState {
    /// Partially played, resume from here
    At { position: Duration },
    /// Played to the end
    Played,
    /// Could not be played
    Failed,
}

impl ResumeState {
    pub fn at(position: Duration) -> Self {
        ResumeState::At { position }
    }
}

pub trait ResumeStore: Send {
    fn get(&self, id: &str) -> Option<ResumeState>;

    fn set(&mut self, id: &str, state: ResumeState) -> Result<()>;

    fn remove(&mut self, id: &str) -> Result<()>;
}

/// Store that forgets everything when the process exits
#[derive(Debug, Default)]
pub struct MemoryResumeStore {
    states: HashMap<String, ResumeState>,
}

impl MemoryResumeStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ResumeStore for MemoryResumeStore {
    fn get(&self, id: &str) -> Option<ResumeState> {
        self.states.get(id).copied()
    }

    fn set(&mut self, id: &str, state: ResumeState) -> Result<()> {
        self.states.insert(id.to_string(), state);
        Ok(())
    }

    fn remove(&mut self, id: &str) -> Result<()> {
        self.states.remove(id);
        Ok(())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct ResumeRecord {
    state: ResumeState,
    updated_at: DateTime<Utc>,
}

/// Store backed by a JSON file, rewritten on every change
#[derive(Debug)]
pub struct JsonResumeStore {
    path: PathBuf,
    records: HashMap<String, ResumeRecord>,
}

impl JsonResumeStore {
    /// Open the store at `path`. A missing file is an empty store.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let records = if path.exists() {
            let content = fs::read_to_string(&path)?;
            serde_json::from_str(&content)?
        } else {
            HashMap::new()
        };
        tracing::debug!(path = %path.display(), records = records.len(), "Resume store opened");
        Ok(Self { path, records })
    }

    pub fn updated_at(&self, id: &str) -> Option<DateTime<Utc>> {
        self.records.get(id).map(|r| r.updated_at)
    }

    fn save(&self) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                fs::create_dir_all(dir)?;
            }
        }
        let content = serde_json::to_string_pretty(&self.records)?;
        fs::write(&self.path, content)?;
        Ok(())
    }
}

impl ResumeStore for JsonResumeStore {
    fn get(&self, id: &str) -> Option<ResumeState> {
        self.records.get(id).map(|r| r.state)
    }

    fn set(&mut self, id: &str, state: ResumeState) -> Result<()> {
        let record = ResumeRecord {
            state,
            updated_at: Utc::now(),
        };
        self.records.insert(id.to_string(), record);
        self.save()
    }

    fn remove(&mut self, id: &str) -> Result<()> {
        if self.records.remove(id).is_some() {
            self.save()?;
        }
        Ok(())
    }
}
