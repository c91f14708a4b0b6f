use serde::Serialize;
use std::fmt;

/// Why playback was terminated. Reported to the host exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FatalReason {
    PolicyChanged,
    SessionInactive,
    PlayUrlNotProvided,
    InvalidPlayUrl,
    StreamNotFound,
    StreamNetwork,
}

impl FatalReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FatalReason::PolicyChanged => "policy_changed",
            FatalReason::SessionInactive => "session_inactive",
            FatalReason::PlayUrlNotProvided => "play_url_not_provided",
            FatalReason::InvalidPlayUrl => "invalid_play_url",
            FatalReason::StreamNotFound => "stream_not_found",
            FatalReason::StreamNetwork => "stream_network",
        }
    }

    /// Message shown to the viewer when playback stops for this reason.
    pub fn user_message(&self) -> &'static str {
        match self {
            FatalReason::PolicyChanged => "Playback stopped because the access policy changed.",
            FatalReason::SessionInactive => "This playback session has ended.",
            FatalReason::PlayUrlNotProvided => "No playback URL was provided.",
            FatalReason::InvalidPlayUrl => "The playback URL is invalid.",
            FatalReason::StreamNotFound => {
                "The video file could not be found. It may still be processing."
            }
            FatalReason::StreamNetwork => "A network error occurred. Check your connection.",
        }
    }
}

impl fmt::Display for FatalReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
