use tracing::trace;

use crate::constants::BACKWARD_JUMP_THRESHOLD_SECS;
use crate::utils::time::sanitize_seconds;

/// One observed timeline step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressSample {
    pub previous: f64,
    pub current: f64,
    pub backward_jump: bool,
}

/// Tracks the farthest legitimately watched position.
///
/// `max_watched` only ever grows: backward jumps are recorded but never pull it down,
/// so seeking back and then forward again cannot unlock unwatched content.
#[derive(Debug, Clone, Default)]
pub struct ProgressTracker {
    max_watched: f64,
    last_time: f64,
    backward_jumps: u32,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes a periodic time update from the sink.
    pub fn observe(&mut self, current_time: f64) -> ProgressSample {
        let current = sanitize_seconds(current_time);
        let previous = self.last_time;
        self.last_time = current;

        let backward_jump = current + BACKWARD_JUMP_THRESHOLD_SECS < previous;
        if backward_jump {
            self.backward_jumps += 1;
            trace!("Backward jump {:.2}s -> {:.2}s", previous, current);
        }

        if current > self.max_watched {
            self.max_watched = current;
        }

        ProgressSample {
            previous,
            current,
            backward_jump,
        }
    }

    pub fn max_watched(&self) -> f64 {
        self.max_watched
    }

    pub fn last_time(&self) -> f64 {
        self.last_time
    }

    /// Number of backward jumps seen so far.
    pub fn backward_jumps(&self) -> u32 {
        self.backward_jumps
    }
}
