//! Seek target clamping and current-time calibration

use std::ops::Range;
use std::time::Duration;

/// Clamp a seek target into `[0, duration]` unless the engine says it can
/// seek there. An unknown (zero) duration leaves the target alone.
pub(crate) fn clamp_target(
    target: Duration,
    seekable: Option<Range<Duration>>,
    duration: Duration,
) -> Duration {
    if seekable.is_some_and(|range| range.contains(&target)) {
        return target;
    }
    if duration.is_zero() {
        target
    } else {
        target.min(duration)
    }
}

/// Keeps reporting a seek target until the engine's clock catches up with it,
/// so the playhead never snaps back to a stale position after a seek.
#[derive(Debug, Default)]
pub(crate) struct TimeCalibrator {
    target: Option<Duration>,
}

impl TimeCalibrator {
    pub fn arm(&mut self, target: Duration) {
        self.target = Some(target);
    }

    pub fn clear(&mut self) {
        self.target = None;
    }

    /// Time to report for a tick carrying `raw`. Disarms once `raw` reaches the target.
    pub fn calibrate(&mut self, raw: Duration) -> Duration {
        match self.target {
            Some(target) if target > raw => target,
            _ => {
                self.target = None;
                raw
            }
        }
    }

    /// Same as [`calibrate`](Self::calibrate) without disarming
    pub fn peek(&self, raw: Duration) -> Duration {
        match self.target {
            Some(target) if target > raw => target,
            _ => raw,
        }
    }
}
