//! Classifies raw stage input into playback intents.
//!
//! The recognizer never touches the sink itself. It returns [`GestureIntent`]s which the
//! controller routes through the same seek and rate enforcement as every other request.
//! Time-based classification (tap counting, long-press) is driven by deadlines: the
//! owner sleeps until [`GestureDisambiguator::next_deadline`] and then calls
//! [`GestureDisambiguator::poll`].

use std::time::Duration;
use tokio::time::Instant;
use tracing::trace;

use super::types::{PointerInput, StageRect, TapZone};
use crate::config::{GestureConfig, TimingConfig};
use crate::utils::time::clamp;

#[derive(Debug, Clone, PartialEq)]
pub enum GestureIntent {
    ToggleControls,
    TogglePlay,
    /// Relative seek in seconds.
    Seek { delta: f64 },
    BoostRate { rate: f64 },
    RestoreRate { rate: f64 },
    SetVolume { volume: f64 },
}

/// Playback facts the recognizer needs at the moment a touch starts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureContext {
    pub speed_locked: bool,
    pub rate: f64,
    pub volume: f64,
}

#[derive(Debug, Clone)]
struct GestureSettings {
    tap_window: Duration,
    long_press: Duration,
    dead_zone_px: f64,
    volume_per_px: f64,
    boost_rate: f64,
    double_tap_seek: f64,
    triple_tap_seek: f64,
}

#[derive(Debug, Clone, Copy)]
struct TouchTrack {
    start_y: f64,
    start_volume: f64,
    right_half: bool,
    swiped: bool,
}

#[derive(Debug)]
pub struct GestureDisambiguator {
    settings: GestureSettings,
    stage: StageRect,
    tap_count: u32,
    last_tap_x: f64,
    tap_deadline: Option<Instant>,
    touch: Option<TouchTrack>,
    long_press_deadline: Option<Instant>,
    saved_rate: Option<f64>,
    boosted: bool,
}

impl GestureDisambiguator {
    pub fn new(timing: &TimingConfig, gestures: &GestureConfig, stage: StageRect) -> Self {
        Self {
            settings: GestureSettings {
                tap_window: timing.tap_window(),
                long_press: timing.long_press(),
                dead_zone_px: gestures.swipe_dead_zone_px,
                volume_per_px: gestures.volume_per_px,
                boost_rate: gestures.boost_rate,
                double_tap_seek: gestures.double_tap_seek_secs,
                triple_tap_seek: gestures.triple_tap_seek_secs,
            },
            stage,
            tap_count: 0,
            last_tap_x: 0.0,
            tap_deadline: None,
            touch: None,
            long_press_deadline: None,
            saved_rate: None,
            boosted: false,
        }
    }

    pub fn set_stage(&mut self, stage: StageRect) {
        self.stage = stage;
    }

    /// Feeds one input sample. Intents that resolve immediately are returned.
    pub fn handle(
        &mut self,
        input: PointerInput,
        ctx: GestureContext,
        now: Instant,
    ) -> Vec<GestureIntent> {
        match input {
            PointerInput::Down { x, y } => {
                self.touch_start(x, y, ctx, now);
                Vec::new()
            }
            PointerInput::Move { y, .. } => self.touch_move(y),
            PointerInput::Up { x, .. } => {
                let long_pressed = self.boosted;
                let intents = self.end_long_press();
                let swiped = self.touch.take().is_some_and(|touch| touch.swiped);
                if !swiped && !long_pressed {
                    self.register_tap(x, now);
                }
                intents
            }
            PointerInput::Cancel => {
                self.touch = None;
                self.end_long_press()
            }
            PointerInput::Click { x, .. } => {
                self.register_tap(x, now);
                Vec::new()
            }
        }
    }

    /// Earliest pending tap or long-press deadline.
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.tap_deadline, self.long_press_deadline) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Resolves every deadline that has passed by `now`.
    pub fn poll(&mut self, now: Instant) -> Vec<GestureIntent> {
        let mut intents = Vec::new();

        if self.long_press_deadline.is_some_and(|deadline| deadline <= now) {
            self.long_press_deadline = None;
            self.boosted = true;
            trace!("Long press recognised, boosting to {}x", self.settings.boost_rate);
            intents.push(GestureIntent::BoostRate {
                rate: self.settings.boost_rate,
            });
        }

        if self.tap_deadline.is_some_and(|deadline| deadline <= now) {
            self.tap_deadline = None;
            intents.extend(self.resolve_taps());
        }

        intents
    }

    /// Drops every pending classification without emitting intents.
    pub fn reset(&mut self) {
        self.tap_count = 0;
        self.tap_deadline = None;
        self.touch = None;
        self.long_press_deadline = None;
        self.saved_rate = None;
        self.boosted = false;
    }

    fn touch_start(&mut self, x: f64, y: f64, ctx: GestureContext, now: Instant) {
        let right_half = self.stage.is_right_half(x);
        self.touch = Some(TouchTrack {
            start_y: y,
            start_volume: ctx.volume,
            right_half,
            swiped: false,
        });

        if ctx.speed_locked || !right_half {
            return;
        }
        self.saved_rate = Some(ctx.rate);
        self.long_press_deadline = Some(now + self.settings.long_press);
    }

    fn touch_move(&mut self, y: f64) -> Vec<GestureIntent> {
        let Some(touch) = self.touch.as_mut() else {
            return Vec::new();
        };

        let dy = touch.start_y - y;
        if dy.abs() < self.settings.dead_zone_px {
            return Vec::new();
        }

        // A swipe is never also a long press.
        touch.swiped = true;
        if !self.boosted {
            self.long_press_deadline = None;
            self.saved_rate = None;
        }

        if !touch.right_half {
            return Vec::new();
        }
        let volume = clamp(touch.start_volume + dy * self.settings.volume_per_px, 0.0, 1.0);
        vec![GestureIntent::SetVolume { volume }]
    }

    fn end_long_press(&mut self) -> Vec<GestureIntent> {
        self.long_press_deadline = None;
        let saved = self.saved_rate.take();
        if !std::mem::take(&mut self.boosted) {
            return Vec::new();
        }
        saved
            .map(|rate| vec![GestureIntent::RestoreRate { rate }])
            .unwrap_or_default()
    }

    fn register_tap(&mut self, x: f64, now: Instant) {
        self.tap_count += 1;
        self.last_tap_x = x;
        self.tap_deadline = Some(now + self.settings.tap_window);
    }

    fn resolve_taps(&mut self) -> Vec<GestureIntent> {
        let count = std::mem::take(&mut self.tap_count);
        let zone = self.stage.zone(self.last_tap_x);
        trace!("Resolved {} tap(s) in {:?} zone", count, zone);

        match count {
            0 => Vec::new(),
            1 => {
                let mut intents = vec![GestureIntent::ToggleControls];
                if zone == TapZone::Center {
                    intents.push(GestureIntent::TogglePlay);
                }
                intents
            }
            n => {
                let step = if n >= 3 {
                    self.settings.triple_tap_seek
                } else {
                    self.settings.double_tap_seek
                };
                match zone {
                    TapZone::Left => vec![GestureIntent::Seek { delta: -step }],
                    TapZone::Right => vec![GestureIntent::Seek { delta: step }],
                    TapZone::Center => Vec::new(),
                }
            }
        }
    }
}
