use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::utils::time::epoch_secs;

/// Telemetry signal types understood by the backend audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    VisibilityHidden,
    VisibilityVisible,
    FocusLost,
    FocusGained,
    SeekAttempt,
    SpeedChangeAttempt,
    FullscreenEnter,
    FullscreenExit,
    PlayerError,
}

impl EventType {
    /// Attempts to exceed the granted policy, as opposed to lifecycle signals.
    pub fn is_violation(&self) -> bool {
        matches!(self, EventType::SeekAttempt | EventType::SpeedChangeAttempt)
    }
}

/// A single queued telemetry record. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViolationEvent {
    #[serde(rename = "type")]
    pub kind: EventType,
    /// Epoch seconds.
    pub occurred_at: i64,
    #[serde(default)]
    pub payload: Map<String, Value>,
}

impl ViolationEvent {
    pub fn new(kind: EventType, payload: Map<String, Value>) -> Self {
        Self {
            kind,
            occurred_at: epoch_secs(),
            payload,
        }
    }
}

/// Builds an event payload from key/value pairs.
pub fn payload<I, K>(entries: I) -> Map<String, Value>
where
    I: IntoIterator<Item = (K, Value)>,
    K: Into<String>,
{
    entries.into_iter().map(|(k, v)| (k.into(), v)).collect()
}
