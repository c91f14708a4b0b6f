use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::COMPLETION_TOLERANCE_SECS;

/// Final position handed to the host when the viewer leaves.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LeaveProgress {
    pub last_position: f64,
    pub progress_percent: f64,
    pub completed: bool,
}

impl LeaveProgress {
    /// Computes progress from the farthest watched position.
    ///
    /// An unknown or zero duration yields 0% and never counts as completed.
    pub fn compute(max_watched: f64, duration: f64) -> Self {
        if !(duration.is_finite() && duration > 0.0) {
            return Self {
                last_position: max_watched,
                progress_percent: 0.0,
                completed: false,
            };
        }

        Self {
            last_position: max_watched,
            progress_percent: (max_watched / duration * 100.0).min(100.0),
            completed: max_watched >= duration - COMPLETION_TOLERANCE_SECS,
        }
    }
}

/// Latch that lets leave-progress out at most once per mount.
#[derive(Debug, Default)]
pub struct LeaveProgressFlusher {
    fired: bool,
}

impl LeaveProgressFlusher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the payload the first time it is called, `None` afterwards.
    pub fn take(&mut self, max_watched: f64, duration: f64) -> Option<LeaveProgress> {
        if self.fired {
            debug!("Leave progress already flushed");
            return None;
        }
        self.fired = true;
        Some(LeaveProgress::compute(max_watched, duration))
    }

    pub fn has_fired(&self) -> bool {
        self.fired
    }
}
