//! Headless view model for the player chrome.
//!
//! Everything here is derived from controller state on demand; nothing in the surface
//! feeds back into enforcement.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::constants::{RATE_MENU, WATERMARK_BRAND};
use crate::models::{AccessMode, DeviceId, FatalReason, PlaybackState, Policy, SeekMode, Toast};
use crate::utils::time::format_clock;

/// Rates within this distance of a menu entry mark it as selected.
const RATE_MATCH_TOLERANCE: f64 = 0.001;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PillTone {
    Neutral,
    Warn,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pill {
    pub label: String,
    pub tone: PillTone,
}

impl Pill {
    fn neutral(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            tone: PillTone::Neutral,
        }
    }

    fn warn(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            tone: PillTone::Warn,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopBar {
    pub title: String,
    pub video_tag: String,
    pub enrollment_tag: String,
    pub pills: Vec<Pill>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Overlays {
    pub loading: bool,
    pub play_button: bool,
    pub buffering: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Watermark {
    pub brand: String,
    pub device_tag: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateOption {
    pub rate: f64,
    pub label: String,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ControlBar {
    pub visible: bool,
    pub playing: bool,
    pub current_label: String,
    pub duration_label: String,
    /// Playhead position in `[0, 1]`.
    pub progress: f64,
    /// Farthest watched position in `[0, 1]`.
    pub watched: f64,
    pub rate_label: String,
    pub rate_menu: Vec<RateOption>,
    pub speed_locked: bool,
    pub volume: f64,
    pub muted: bool,
    pub fullscreen: bool,
    pub theater_mode: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SidePanel {
    pub info: String,
    pub bullets: Vec<String>,
}

/// Everything a host needs to paint one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SurfaceModel {
    pub top_bar: TopBar,
    pub overlays: Overlays,
    pub watermark: Option<Watermark>,
    pub controls: ControlBar,
    pub toast: Option<Toast>,
    pub side_panel: SidePanel,
    /// Present once the session is fatally stopped.
    pub fatal: Option<String>,
}

/// Borrowed controller state the surface is built from.
#[derive(Debug, Clone, Copy)]
pub struct SurfaceInputs<'a> {
    pub title: &'a str,
    pub video_id: i64,
    pub enrollment_id: Option<i64>,
    pub policy: &'a Policy,
    pub state: &'a PlaybackState,
    pub device_id: &'a DeviceId,
    pub expires_at: Option<DateTime<Utc>>,
    pub fatal: Option<&'a FatalReason>,
}

impl SurfaceModel {
    pub fn build(inputs: SurfaceInputs<'_>) -> Self {
        let SurfaceInputs { policy, state, .. } = inputs;
        let device_tag = inputs.device_id.short_tag();

        let watermark = policy.watermark.enabled.then(|| Watermark {
            brand: WATERMARK_BRAND.to_string(),
            device_tag: device_tag.clone(),
        });

        Self {
            top_bar: TopBar {
                title: inputs.title.to_string(),
                video_tag: format!("video#{}", inputs.video_id),
                enrollment_tag: format!(
                    "enrollment#{}",
                    inputs
                        .enrollment_id
                        .map_or_else(|| "-".to_string(), |id| id.to_string())
                ),
                pills: pills(policy),
            },
            overlays: Overlays {
                loading: !state.ready,
                play_button: state.ready && !state.playing,
                buffering: state.ready && state.buffering,
            },
            watermark,
            controls: control_bar(policy, state),
            toast: state.toast.clone(),
            side_panel: SidePanel {
                info: info_text(policy, &device_tag, inputs.expires_at),
                bullets: policy_bullets(policy),
            },
            fatal: inputs.fatal.map(|reason| reason.user_message().to_string()),
        }
    }
}

/// Menu entries up to the policy cap. Normal speed is always offered.
pub fn rate_menu(max_rate: f64) -> Vec<f64> {
    let mut rates: Vec<f64> = RATE_MENU
        .iter()
        .copied()
        .filter(|rate| *rate <= max_rate + 0.0001)
        .collect();
    if !rates.iter().any(|rate| (*rate - 1.0).abs() < RATE_MATCH_TOLERANCE) {
        rates.push(1.0);
    }
    rates.sort_by(f64::total_cmp);
    rates
}

fn pills(policy: &Policy) -> Vec<Pill> {
    let mut pills = Vec::new();

    match policy.access_mode {
        Some(AccessMode::ProctoredClass) => pills.push(Pill::warn("Live class")),
        Some(AccessMode::FreeReview) if policy.monitoring_enabled => {
            pills.push(Pill::neutral("Review"))
        }
        Some(AccessMode::FreeReview) => pills.push(Pill::neutral("Review (no monitoring)")),
        None => {}
    }

    if policy.seek_blocked() {
        pills.push(Pill::warn("Seek disabled"));
    } else if policy.seek.mode == SeekMode::BoundedForward {
        pills.push(Pill::warn("Forward seek limited"));
    }

    if policy.speed_locked() {
        pills.push(Pill::warn("Speed locked"));
    }
    if policy.watermark.enabled {
        pills.push(Pill::neutral("Watermark"));
    }

    pills
}

fn control_bar(policy: &Policy, state: &PlaybackState) -> ControlBar {
    let speed_locked = policy.speed_locked();
    let menu = if speed_locked {
        Vec::new()
    } else {
        rate_menu(policy.max_rate())
            .into_iter()
            .map(|rate| RateOption {
                rate,
                label: format!("{}x", rate),
                selected: (rate - state.rate).abs() < RATE_MATCH_TOLERANCE,
            })
            .collect()
    };

    ControlBar {
        visible: state.controls_visible,
        playing: state.playing,
        current_label: format_clock(state.current_time),
        duration_label: format_clock(state.duration),
        progress: fraction(state.current_time, state.duration),
        watched: fraction(state.max_watched, state.duration),
        rate_label: if speed_locked {
            "Speed locked".to_string()
        } else {
            format!("{:.2}x", state.rate)
        },
        rate_menu: menu,
        speed_locked,
        volume: if state.muted { 0.0 } else { state.volume },
        muted: state.muted,
        fullscreen: state.fullscreen,
        theater_mode: state.theater_mode,
    }
}

fn info_text(policy: &Policy, device_tag: &str, expires_at: Option<DateTime<Utc>>) -> String {
    if !policy.monitoring_enabled {
        return format!("Device: {} · No monitoring (review mode)", device_tag);
    }

    let expiry = expires_at.map_or_else(
        || "-".to_string(),
        |at| at.format("%Y-%m-%d %H:%M UTC").to_string(),
    );
    format!("Device: {} · Session expires: {}", device_tag, expiry)
}

fn policy_bullets(policy: &Policy) -> Vec<String> {
    let seek = if policy.seek_blocked() {
        "Seeking blocked".to_string()
    } else if policy.seek.mode == SeekMode::BoundedForward {
        format!(
            "Seek only within watched range (+{}s)",
            policy.grace_seconds()
        )
    } else {
        "Seeking allowed".to_string()
    };

    let speed = if policy.speed_locked() {
        "Speed changes blocked".to_string()
    } else {
        format!("Speed up to {}x", policy.max_rate())
    };

    let watermark = if policy.watermark.enabled {
        "Watermark shown"
    } else {
        "No watermark"
    };

    vec![seek, speed, watermark.to_string()]
}

fn fraction(value: f64, total: f64) -> f64 {
    if total.is_finite() && total > 0.0 && value.is_finite() {
        (value / total).clamp(0.0, 1.0)
    } else {
        0.0
    }
}
