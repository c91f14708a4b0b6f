use std::time::Duration;
use tokio::time::Instant;
use tracing::trace;

/// Control visibility state machine states
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlState {
    /// Controls are hidden
    Hidden,
    /// Controls are visible; `hide_at` is armed only while playback is running
    Visible { hide_at: Option<Instant> },
}

/// Auto-hiding control bar.
#[derive(Debug)]
pub struct ControlsVisibility {
    state: ControlState,
    autohide: Duration,
    playing: bool,
    buffering: bool,
}

impl ControlsVisibility {
    pub fn new(autohide: Duration) -> Self {
        Self {
            state: ControlState::Visible { hide_at: None },
            autohide,
            playing: false,
            buffering: false,
        }
    }

    pub fn state(&self) -> ControlState {
        self.state
    }

    pub fn is_visible(&self) -> bool {
        !matches!(self.state, ControlState::Hidden)
    }

    /// Transition to the Visible state, restarting the inactivity timer
    pub fn show(&mut self, now: Instant) {
        self.state = ControlState::Visible {
            hide_at: self.arm(now),
        };
    }

    /// Transition to the Hidden state
    pub fn hide(&mut self) {
        self.state = ControlState::Hidden;
    }

    pub fn toggle(&mut self, now: Instant) {
        if self.is_visible() {
            self.hide();
        } else {
            self.show(now);
        }
    }

    /// Playback or buffering changed; visible controls re-arm their timer.
    pub fn set_playback(&mut self, playing: bool, buffering: bool, now: Instant) {
        if self.playing == playing && self.buffering == buffering {
            return;
        }
        self.playing = playing;
        self.buffering = buffering;
        if self.is_visible() {
            self.show(now);
        }
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        match self.state {
            ControlState::Visible { hide_at } => hide_at,
            ControlState::Hidden => None,
        }
    }

    /// Hides the controls once the inactivity deadline passes. Returns true on change.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.state {
            ControlState::Visible {
                hide_at: Some(deadline),
            } if deadline <= now => {
                trace!("Auto-hiding controls");
                self.hide();
                true
            }
            _ => false,
        }
    }

    fn arm(&self, now: Instant) -> Option<Instant> {
        (self.playing && !self.buffering).then(|| now + self.autohide)
    }
}
