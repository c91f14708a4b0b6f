pub mod events;
mod fatal;
mod identifiers;
pub mod policy;
pub mod state;

pub use events::{EventType, ViolationEvent};
pub use fatal::FatalReason;
pub use identifiers::{DeviceId, SessionId, SessionToken};
pub use policy::{Policy, SeekMode};
pub use state::{PlaybackState, Toast, ToastKind};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccessMode {
    #[serde(rename = "FREE_REVIEW")]
    FreeReview,
    #[serde(rename = "PROCTORED_CLASS")]
    ProctoredClass,
}

impl AccessMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "FREE_REVIEW" => Some(Self::FreeReview),
            "PROCTORED_CLASS" => Some(Self::ProctoredClass),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FreeReview => "FREE_REVIEW",
            Self::ProctoredClass => "PROCTORED_CLASS",
        }
    }
}

/// Video being played. Immutable for the lifetime of a controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoMeta {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default, alias = "hls_url")]
    pub stream_url: Option<String>,
}

impl VideoMeta {
    pub fn new(id: i64, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            duration: None,
            status: None,
            thumbnail_url: None,
            stream_url: None,
        }
    }
}

/// One-time authorization payload for a single playback attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackBootstrap {
    pub token: SessionToken,
    #[serde(default)]
    pub session_id: Option<SessionId>,
    /// Epoch seconds; absent for review sessions.
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub access_mode: AccessMode,
    /// Used when the policy carries no flag of its own.
    #[serde(default)]
    pub monitoring_enabled: Option<bool>,
    /// Raw policy exactly as issued; normalized once at the controller boundary.
    #[serde(default)]
    pub policy: Value,
    #[serde(default)]
    pub play_url: String,
}

impl PlaybackBootstrap {
    pub fn normalized_policy(&self) -> Policy {
        Policy::normalize_for_bootstrap(&self.policy, self.access_mode, self.monitoring_enabled)
    }

    pub fn expires_at_utc(&self) -> Option<DateTime<Utc>> {
        self.expires_at
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
    }

    /// The playable URL: the bootstrap's, else the video's own stream URL.
    pub fn effective_play_url<'a>(&'a self, video: &'a VideoMeta) -> Option<&'a str> {
        if !self.play_url.trim().is_empty() {
            return Some(self.play_url.trim());
        }
        video
            .stream_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }
}
