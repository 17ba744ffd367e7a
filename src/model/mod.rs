//! Model module - playback value data
//!
//! Plain data shared between the player and the controller. It is organized
//! into submodules by responsibility:
//!
//! - `types`: playback, control and loading states, modes, seek requests
//! - `queue`: queue items and navigation over an immutable queue
//! - `resume`: per-item resume positions and the stores that keep them

mod queue;
mod resume;
mod types;

pub use queue::{Queue, QueueItem};
pub use resume::{JsonResumeStore, MemoryResumeStore, ResumeState, ResumeStore};
pub use types::{
    ControlState, LoadingState, PlaybackMode, PlaybackState, Seek, SeekInfo, Switchable,
};
