//! What the user asked for, independent of what the engine has achieved

use crate::engine::SeekId;
use crate::model::{Seek, SeekInfo};

/// How far a recorded seek has travelled towards the engine
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum SeekStage {
    /// Recorded while the engine could not take it yet
    Stored,
    /// Issued while the item is becoming ready, before anyone sees `Playing`
    Preloading,
    /// Issued during playback; observers were told it began
    InFlight,
}

#[derive(Debug)]
pub(crate) struct PendingSeek {
    pub id: SeekId,
    pub request: Seek,
    pub stage: SeekStage,
}

impl PendingSeek {
    pub fn info(&self) -> SeekInfo {
        SeekInfo {
            id: self.id,
            time: self.request.time,
        }
    }

    pub fn is_issued(&self) -> bool {
        self.stage != SeekStage::Stored
    }
}

/// The single source of truth for the user's play/pause and seek wishes
#[derive(Debug, Default)]
pub(crate) struct Intent {
    pub wants_to_play: bool,
    pub pending_seek: Option<PendingSeek>,
    next_seek_id: u64,
}

impl Intent {
    pub fn next_seek_id(&mut self) -> SeekId {
        self.next_seek_id += 1;
        SeekId(self.next_seek_id)
    }

    /// Take the pending seek only if it is the one `id` refers to
    pub fn take_seek(&mut self, id: SeekId) -> Option<PendingSeek> {
        match &self.pending_seek {
            Some(pending) if pending.id == id => self.pending_seek.take(),
            _ => None,
        }
    }

    pub fn has_issued_seek(&self) -> bool {
        self.pending_seek.as_ref().is_some_and(PendingSeek::is_issued)
    }

    /// Forget everything. Returns the abandoned seek so the caller can fail it.
    pub fn reset(&mut self) -> Option<PendingSeek> {
        self.wants_to_play = false;
        self.pending_seek.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn pending(intent: &mut Intent, secs: u64, stage: SeekStage) -> SeekId {
        let id = intent.next_seek_id();
        intent.pending_seek = Some(PendingSeek {
            id,
            request: Seek::new(Duration::from_secs(secs)),
            stage,
        });
        id
    }

    #[test]
    fn stale_seek_id_is_not_taken() {
        let mut intent = Intent::default();
        let old = pending(&mut intent, 10, SeekStage::InFlight);
        let new = pending(&mut intent, 20, SeekStage::InFlight);

        assert!(intent.take_seek(old).is_none());
        let taken = intent.take_seek(new).unwrap();
        assert_eq!(taken.request.time, Duration::from_secs(20));
        assert!(intent.pending_seek.is_none());
    }

    #[test]
    fn stored_seek_is_not_issued() {
        let mut intent = Intent::default();
        pending(&mut intent, 5, SeekStage::Stored);
        assert!(!intent.has_issued_seek());

        intent.pending_seek.as_mut().unwrap().stage = SeekStage::Preloading;
        assert!(intent.has_issued_seek());
    }

    #[test]
    fn reset_clears_play_wish() {
        let mut intent = Intent::default();
        intent.wants_to_play = true;
        pending(&mut intent, 5, SeekStage::Stored);

        assert!(intent.reset().is_some());
        assert!(!intent.wants_to_play);
        assert!(intent.pending_seek.is_none());
    }
}
