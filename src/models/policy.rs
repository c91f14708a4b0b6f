use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::AccessMode;

const DEFAULT_GRACE_SECONDS: f64 = 3.0;
const DEFAULT_MAX_RATE: f64 = 16.0;

/// Rates at or below this value leave no headroom above normal speed.
const SPEED_LOCK_THRESHOLD: f64 = 1.0001;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SeekMode {
    #[default]
    Free,
    Blocked,
    BoundedForward,
}

impl SeekMode {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "free" => Some(Self::Free),
            "blocked" => Some(Self::Blocked),
            "bounded_forward" => Some(Self::BoundedForward),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForwardLimit {
    MaxWatched,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeekPolicy {
    pub mode: SeekMode,
    pub forward_limit: Option<ForwardLimit>,
    pub grace_seconds: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatePolicy {
    pub max: f64,
    pub ui_control: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatermarkPolicy {
    pub enabled: bool,
    pub fields: Vec<String>,
}

/// Declared by the server; cross-session limits are enforced server-side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ConcurrencyPolicy {
    pub max_sessions: Option<u32>,
    pub max_devices: Option<u32>,
}

/// Canonical access policy. Every field is populated once [`Policy::normalize`] has run,
/// so enforcement code never has to branch on missing values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    pub allow_seek: bool,
    pub seek: SeekPolicy,
    pub playback_rate: RatePolicy,
    pub watermark: WatermarkPolicy,
    pub concurrency: ConcurrencyPolicy,
    pub access_mode: Option<AccessMode>,
    pub monitoring_enabled: bool,
}

impl Default for Policy {
    fn default() -> Self {
        Self::normalize(&Value::Null)
    }
}

impl Policy {
    /// Builds a canonical policy from a raw, possibly partial payload.
    ///
    /// Never fails: malformed or missing fields fall back to their defaults. Numbers are
    /// accepted either as JSON numbers or numeric strings.
    pub fn normalize(raw: &Value) -> Self {
        let seek = raw.get("seek");
        let rate = raw.get("playback_rate");
        let watermark = raw.get("watermark");
        let concurrency = raw.get("concurrency");

        let access_mode = raw
            .get("access_mode")
            .and_then(Value::as_str)
            .and_then(AccessMode::parse);

        let monitoring_enabled = raw
            .get("monitoring_enabled")
            .and_then(read_bool)
            .unwrap_or(access_mode == Some(AccessMode::ProctoredClass));

        Self {
            allow_seek: raw.get("allow_seek").and_then(read_bool).unwrap_or(true),
            seek: SeekPolicy {
                mode: seek
                    .and_then(|s| s.get("mode"))
                    .and_then(Value::as_str)
                    .and_then(SeekMode::parse)
                    .unwrap_or_default(),
                forward_limit: seek
                    .and_then(|s| s.get("forward_limit"))
                    .and_then(Value::as_str)
                    .filter(|limit| *limit == "max_watched")
                    .map(|_| ForwardLimit::MaxWatched),
                grace_seconds: seek
                    .and_then(|s| s.get("grace_seconds"))
                    .and_then(read_number)
                    .unwrap_or(DEFAULT_GRACE_SECONDS),
            },
            playback_rate: RatePolicy {
                max: rate
                    .and_then(|r| r.get("max"))
                    .and_then(read_number)
                    .unwrap_or(DEFAULT_MAX_RATE),
                ui_control: rate
                    .and_then(|r| r.get("ui_control"))
                    .and_then(read_bool)
                    .unwrap_or(true),
            },
            watermark: WatermarkPolicy {
                enabled: watermark
                    .and_then(|w| w.get("enabled"))
                    .and_then(read_bool)
                    .unwrap_or(false),
                fields: watermark
                    .and_then(|w| w.get("fields"))
                    .and_then(Value::as_array)
                    .map(|fields| {
                        fields
                            .iter()
                            .filter_map(Value::as_str)
                            .map(str::to_string)
                            .collect()
                    })
                    .unwrap_or_default(),
            },
            concurrency: ConcurrencyPolicy {
                max_sessions: concurrency
                    .and_then(|c| c.get("max_sessions"))
                    .and_then(read_count),
                max_devices: concurrency
                    .and_then(|c| c.get("max_devices"))
                    .and_then(read_count),
            },
            access_mode,
            monitoring_enabled,
        }
    }

    /// Normalizes `raw` under a bootstrap. The bootstrap's access mode and monitoring flag
    /// fill in whatever the policy leaves out.
    pub fn normalize_for_bootstrap(
        raw: &Value,
        access_mode: AccessMode,
        monitoring_enabled: Option<bool>,
    ) -> Self {
        let mut patched = match raw {
            Value::Object(map) => map.clone(),
            _ => serde_json::Map::new(),
        };

        let own_mode = patched
            .get("access_mode")
            .and_then(Value::as_str)
            .and_then(AccessMode::parse);
        if own_mode.is_none() {
            patched.insert(
                "access_mode".to_string(),
                Value::String(access_mode.as_str().to_string()),
            );
        }

        let own_monitoring = patched.get("monitoring_enabled").and_then(read_bool);
        if let (None, Some(enabled)) = (own_monitoring, monitoring_enabled) {
            patched.insert("monitoring_enabled".to_string(), Value::Bool(enabled));
        }

        Self::normalize(&Value::Object(patched))
    }

    /// True when every seek is a violation.
    pub fn seek_blocked(&self) -> bool {
        !self.allow_seek || self.seek.mode == SeekMode::Blocked
    }

    pub fn grace_seconds(&self) -> f64 {
        self.seek.grace_seconds.max(0.0)
    }

    /// Effective rate ceiling, never below normal speed.
    pub fn max_rate(&self) -> f64 {
        if self.playback_rate.max.is_finite() {
            self.playback_rate.max.max(1.0)
        } else {
            1.0
        }
    }

    pub fn speed_locked(&self) -> bool {
        !self.playback_rate.ui_control || self.max_rate() <= SPEED_LOCK_THRESHOLD
    }

    /// Violation telemetry is withheld for free review sessions even when monitored.
    pub fn reports_violations(&self) -> bool {
        self.monitoring_enabled && self.access_mode != Some(AccessMode::FreeReview)
    }
}

fn read_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) if s == "true" => Some(true),
        Value::String(s) if s == "false" => Some(false),
        _ => None,
    }
}

fn read_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    number.is_finite().then_some(number)
}

fn read_count(value: &Value) -> Option<u32> {
    read_number(value)
        .filter(|n| *n >= 0.0)
        .map(|n| n as u32)
}
