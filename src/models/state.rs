use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastKind {
    Info,
    Warn,
    Danger,
}

/// Transient message shown over the stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Toast {
    pub text: String,
    pub kind: ToastKind,
}

impl Toast {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: ToastKind::Info,
        }
    }

    pub fn warn(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: ToastKind::Warn,
        }
    }

    pub fn danger(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: ToastKind::Danger,
        }
    }
}

/// Derived playback state broadcast to the render surface. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaybackState {
    pub ready: bool,
    pub playing: bool,
    pub buffering: bool,
    pub current_time: f64,
    pub duration: f64,
    pub volume: f64,
    pub muted: bool,
    pub rate: f64,
    pub max_watched: f64,
    pub fullscreen: bool,
    pub theater_mode: bool,
    pub controls_visible: bool,
    pub toast: Option<Toast>,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            ready: false,
            playing: false,
            buffering: false,
            current_time: 0.0,
            duration: 0.0,
            volume: 1.0,
            muted: false,
            rate: 1.0,
            max_watched: 0.0,
            fullscreen: false,
            theater_mode: false,
            controls_visible: true,
            toast: None,
        }
    }
}
