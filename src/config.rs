use anyhow::{Context, Result};
use dirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::models::DeviceId;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Stable identity of this device, shown in watermarks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,

    #[serde(default)]
    pub timing: TimingConfig,

    #[serde(default)]
    pub gestures: GestureConfig,

    #[serde(default)]
    pub network: NetworkConfig,

    #[serde(default)]
    pub telemetry: TelemetryConfig,

    #[serde(default)]
    pub stream: StreamConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimingConfig {
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_ms: u64,

    #[serde(default = "default_event_flush_interval")]
    pub event_flush_interval_ms: u64,

    #[serde(default = "default_tap_window")]
    pub tap_window_ms: u64,

    #[serde(default = "default_long_press")]
    pub long_press_ms: u64,

    #[serde(default = "default_seek_warning_cooldown")]
    pub seek_warning_cooldown_ms: u64,

    #[serde(default = "default_controls_autohide")]
    pub controls_autohide_ms: u64,

    #[serde(default = "default_toast_duration")]
    pub toast_duration_ms: u64,

    /// How long `run()` waits for in-flight end/flush calls after unmount.
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GestureConfig {
    #[serde(default = "default_swipe_dead_zone")]
    pub swipe_dead_zone_px: f64,

    #[serde(default = "default_volume_per_px")]
    pub volume_per_px: f64,

    #[serde(default = "default_boost_rate")]
    pub boost_rate: f64,

    #[serde(default = "default_double_tap_seek")]
    pub double_tap_seek_secs: f64,

    #[serde(default = "default_triple_tap_seek")]
    pub triple_tap_seek_secs: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NetworkConfig {
    /// Base used to resolve relative play URLs and to reach the session API.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    #[serde(default = "default_timeout")]
    pub connection_timeout: u64,

    /// Tokens starting with this prefix never reach the backend.
    #[serde(default = "default_sessionless_prefix")]
    pub sessionless_prefix: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TelemetryConfig {
    #[serde(default = "default_event_queue_cap")]
    pub event_queue_cap: usize,
}

/// Tuning handed to the software demuxer when native playback is unavailable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StreamConfig {
    #[serde(default = "default_true")]
    pub low_latency: bool,

    #[serde(default = "default_back_buffer")]
    pub back_buffer_secs: u32,

    #[serde(default = "default_max_buffer")]
    pub max_buffer_secs: u32,

    #[serde(default = "default_max_max_buffer")]
    pub max_max_buffer_secs: u32,
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        Self::load_from(&config_path)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            debug!("Loading config from {:?}", config_path);
            let contents =
                fs::read_to_string(config_path).context("Failed to read config file")?;
            let config = Self::from_toml_str(&contents)?;
            info!("Config loaded successfully");
            Ok(config)
        } else {
            info!("No config file found, using defaults");
            let config = Config::default();
            config.save_to(config_path)?;
            Ok(config)
        }
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("Failed to parse config file")
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;
        self.save_to(&config_path)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        // Ensure config directory exists
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(config_path, contents).context("Failed to write config file")?;

        debug!("Config saved to {:?}", config_path);
        Ok(())
    }

    /// Configured device identity, or a freshly generated one.
    pub fn device_id(&self) -> DeviceId {
        self.device_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .map(DeviceId::new)
            .unwrap_or_else(DeviceId::generate)
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("Failed to get config directory")?;
        Ok(config_dir.join("proctored-player").join("config.toml"))
    }
}

impl TimingConfig {
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms.max(1))
    }

    pub fn event_flush_interval(&self) -> Duration {
        Duration::from_millis(self.event_flush_interval_ms.max(1))
    }

    pub fn tap_window(&self) -> Duration {
        Duration::from_millis(self.tap_window_ms)
    }

    pub fn long_press(&self) -> Duration {
        Duration::from_millis(self.long_press_ms)
    }

    pub fn seek_warning_cooldown(&self) -> Duration {
        Duration::from_millis(self.seek_warning_cooldown_ms)
    }

    pub fn controls_autohide(&self) -> Duration {
        Duration::from_millis(self.controls_autohide_ms)
    }

    pub fn toast_duration(&self) -> Duration {
        Duration::from_millis(self.toast_duration_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            device_id: None,
            timing: TimingConfig::default(),
            gestures: GestureConfig::default(),
            network: NetworkConfig::default(),
            telemetry: TelemetryConfig::default(),
            stream: StreamConfig::default(),
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_ms: default_heartbeat_interval(),
            event_flush_interval_ms: default_event_flush_interval(),
            tap_window_ms: default_tap_window(),
            long_press_ms: default_long_press(),
            seek_warning_cooldown_ms: default_seek_warning_cooldown(),
            controls_autohide_ms: default_controls_autohide(),
            toast_duration_ms: default_toast_duration(),
            shutdown_grace_ms: default_shutdown_grace(),
        }
    }
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            swipe_dead_zone_px: default_swipe_dead_zone(),
            volume_per_px: default_volume_per_px(),
            boost_rate: default_boost_rate(),
            double_tap_seek_secs: default_double_tap_seek(),
            triple_tap_seek_secs: default_triple_tap_seek(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            connection_timeout: default_timeout(),
            sessionless_prefix: default_sessionless_prefix(),
            auth_token: None,
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            event_queue_cap: default_event_queue_cap(),
        }
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            low_latency: default_true(),
            back_buffer_secs: default_back_buffer(),
            max_buffer_secs: default_max_buffer(),
            max_max_buffer_secs: default_max_max_buffer(),
        }
    }
}

// Default value functions
fn default_true() -> bool { true }
fn default_heartbeat_interval() -> u64 { 30_000 }
fn default_event_flush_interval() -> u64 { 2_200 }
fn default_tap_window() -> u64 { 200 }
fn default_long_press() -> u64 { 500 }
fn default_seek_warning_cooldown() -> u64 { 900 }
fn default_controls_autohide() -> u64 { 3_000 }
fn default_toast_duration() -> u64 { 2_500 }
fn default_shutdown_grace() -> u64 { 2_000 }
fn default_swipe_dead_zone() -> f64 { 15.0 }
fn default_volume_per_px() -> f64 { 0.008 }
fn default_boost_rate() -> f64 { 2.0 }
fn default_double_tap_seek() -> f64 { 10.0 }
fn default_triple_tap_seek() -> f64 { 20.0 }
fn default_api_base_url() -> String { "http://localhost:8000".to_string() }
fn default_timeout() -> u64 { 30 }
fn default_sessionless_prefix() -> String { "student-".to_string() }
fn default_event_queue_cap() -> usize { 300 }
fn default_back_buffer() -> u32 { 30 }
fn default_max_buffer() -> u32 { 60 }
fn default_max_max_buffer() -> u32 { 120 }
