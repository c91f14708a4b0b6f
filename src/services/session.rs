use serde::Serialize;
use tracing::{error, info};

use crate::models::FatalReason;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "reason")]
pub enum SessionState {
    /// Issued by the backend; playback not yet confirmed
    Starting,
    Live,
    Ended,
    Fatal(FatalReason),
}

/// Session state machine: `Starting -> Live -> Ended | Fatal`.
///
/// Terminal states are sticky; a session that ended or failed never comes back.
#[derive(Debug)]
pub struct SessionLifecycle {
    state: SessionState,
    sessionless: bool,
    monitoring: bool,
}

impl SessionLifecycle {
    pub fn new(sessionless: bool, monitoring: bool) -> Self {
        Self {
            state: SessionState::Starting,
            sessionless,
            monitoring,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_live(&self) -> bool {
        self.state == SessionState::Live
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.state, SessionState::Ended | SessionState::Fatal(_))
    }

    pub fn is_sessionless(&self) -> bool {
        self.sessionless
    }

    pub fn set_sessionless(&mut self, sessionless: bool) {
        self.sessionless = sessionless;
    }

    /// Whether heartbeat and flush timers should run.
    pub fn timers_active(&self) -> bool {
        self.monitoring && self.is_live()
    }

    /// Whether a backend round trip would be made for this session.
    pub fn talks_to_backend(&self) -> bool {
        !self.sessionless && !self.is_terminal()
    }

    /// Stream attached and playback is under way.
    pub fn go_live(&mut self) -> bool {
        if self.state != SessionState::Starting {
            return false;
        }
        info!("Playback session live");
        self.state = SessionState::Live;
        true
    }

    pub fn end(&mut self) -> bool {
        if self.is_terminal() {
            return false;
        }
        info!("Playback session ended");
        self.state = SessionState::Ended;
        true
    }

    /// Returns false if the session was already terminal, so callers notify at most once.
    pub fn fail(&mut self, reason: FatalReason) -> bool {
        if self.is_terminal() {
            return false;
        }
        error!("Playback session failed: {}", reason);
        self.state = SessionState::Fatal(reason);
        true
    }
}
