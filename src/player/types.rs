//! Common types shared by the controller and its sink/demuxer collaborators
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::FatalReason;

/// Signals reported by the media sink (or the demuxer bound to it).
#[derive(Debug, Clone, PartialEq)]
pub enum SinkEvent {
    LoadedMetadata { duration: Option<f64> },
    TimeUpdate { current_time: f64 },
    Play,
    Pause,
    Waiting,
    Playing,
    RateChange { rate: f64 },
    /// `current_time` was set outside of normal playback advance.
    Seeking { target: f64 },
    MediaError { code: u16, message: String },
    DemuxerError(DemuxerErrorReport),
}

/// Error payload forwarded from the software demuxer.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DemuxerErrorReport {
    pub fatal: bool,
    /// Demuxer error category, e.g. `networkError` or `mediaError`.
    pub kind: String,
    pub details: String,
    /// HTTP status or demuxer-specific code when known.
    pub code: Option<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamFailure {
    NotFound,
    Network,
    Decode,
    Other,
}

impl StreamFailure {
    /// Classifies a native media element error (`MediaError.code`).
    pub fn from_media_error(code: u16, message: &str) -> Self {
        if code == 4 || message.contains("404") || message.contains("Not Found") {
            StreamFailure::NotFound
        } else if code == 2 {
            StreamFailure::Network
        } else if code == 3 {
            StreamFailure::Decode
        } else {
            StreamFailure::Other
        }
    }

    pub fn from_demuxer_error(report: &DemuxerErrorReport) -> Self {
        let details = report.details.as_str();
        if report.code == Some(404) || details.contains("404") || details.contains("Not Found") {
            StreamFailure::NotFound
        } else if matches!(report.code, Some(-1) | Some(-2))
            || details.contains("network")
            || details.contains("NetworkError")
            || report.kind.contains("network")
        {
            StreamFailure::Network
        } else {
            StreamFailure::Other
        }
    }

    /// Not-found and network failures leave nothing to play.
    pub fn fatal_reason(&self) -> Option<FatalReason> {
        match self {
            StreamFailure::NotFound => Some(FatalReason::StreamNotFound),
            StreamFailure::Network => Some(FatalReason::StreamNetwork),
            StreamFailure::Decode | StreamFailure::Other => None,
        }
    }

    pub fn warning_message(&self) -> &'static str {
        match self {
            StreamFailure::NotFound => FatalReason::StreamNotFound.user_message(),
            StreamFailure::Network => FatalReason::StreamNetwork.user_message(),
            StreamFailure::Decode => "A video decoding error occurred.",
            StreamFailure::Other => "A playback error occurred.",
        }
    }
}

/// How the stream ended up bound to the sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachMode {
    Native,
    Demuxer,
    /// Neither native support nor a usable demuxer; the URL was handed to the sink as-is.
    DirectFallback,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AttachError {
    #[error("No playback URL was provided")]
    MissingUrl,

    #[error("Invalid playback URL: {0}")]
    InvalidUrl(String),
}

impl AttachError {
    pub fn fatal_reason(&self) -> FatalReason {
        match self {
            AttachError::MissingUrl => FatalReason::PlayUrlNotProvided,
            AttachError::InvalidUrl(_) => FatalReason::InvalidPlayUrl,
        }
    }
}

/// Bounds of the gesture surface in the host's coordinate space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl StageRect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn is_right_half(&self, x: f64) -> bool {
        x > self.left + self.width / 2.0
    }

    pub fn zone(&self, x: f64) -> TapZone {
        let third = self.width / 3.0;
        if x < self.left + third {
            TapZone::Left
        } else if x > self.right() - third {
            TapZone::Right
        } else {
            TapZone::Center
        }
    }
}

impl Default for StageRect {
    fn default() -> Self {
        Self::new(0.0, 0.0, 1280.0, 720.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapZone {
    Left,
    Center,
    Right,
}

/// Raw pointer/touch input captured on the stage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerInput {
    Down { x: f64, y: f64 },
    Move { x: f64, y: f64 },
    Up { x: f64, y: f64 },
    Cancel,
    /// Mouse click; classified as a tap directly.
    Click { x: f64, y: f64 },
}
