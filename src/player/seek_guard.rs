use serde_json::{Map, Value, json};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use crate::models::events::payload;
use crate::models::{Policy, SeekMode};

/// Margin applied before a forward seek counts as leaving the grace window.
const FORWARD_TOLERANCE_SECS: f64 = 0.001;
/// A corrective write is recognised by landing within this distance of its target.
const ECHO_TOLERANCE_SECS: f64 = 0.01;

const BLOCKED_WARNING: &str = "Seeking is disabled for this video.";
const BOUNDED_WARNING: &str = "You can't skip ahead past what you've watched.";

/// Outcome of evaluating one seek against the policy.
#[derive(Debug, Clone, PartialEq)]
pub enum SeekDecision {
    Allow,
    /// The corrective write performed by the guard itself; nothing to do.
    Echo,
    SnapBack(SeekViolation),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeekViolation {
    /// Position the sink must be forced back to.
    pub corrected: f64,
    pub payload: Map<String, Value>,
    /// Present unless a warning was already shown within the cooldown.
    pub warning: Option<&'static str>,
}

/// Intercepts seeks and snaps disallowed targets back to the permitted bound.
#[derive(Debug)]
pub struct SeekGuard {
    warning_cooldown: Duration,
    last_warning: Option<Instant>,
    pending_echo: Option<f64>,
}

impl SeekGuard {
    pub fn new(warning_cooldown: Duration) -> Self {
        Self {
            warning_cooldown,
            last_warning: None,
            pending_echo: None,
        }
    }

    /// Handles the sink's seeking signal.
    ///
    /// The first signal matching a pending correction is swallowed so the guard never
    /// reacts to its own write.
    pub fn on_seeking(
        &mut self,
        policy: &Policy,
        target: f64,
        max_watched: f64,
        now: Instant,
    ) -> SeekDecision {
        if let Some(echo) = self.pending_echo.take()
            && (target - echo).abs() <= ECHO_TOLERANCE_SECS
        {
            return SeekDecision::Echo;
        }
        self.evaluate(policy, target, max_watched, now)
    }

    /// Evaluates a seek request before it reaches the sink.
    pub fn evaluate(
        &mut self,
        policy: &Policy,
        target: f64,
        max_watched: f64,
        now: Instant,
    ) -> SeekDecision {
        if policy.seek_blocked() {
            debug!(
                "Blocked seek to {:.2}s, snapping back to {:.2}s",
                target, max_watched
            );
            let payload = payload([
                ("mode", json!("blocked")),
                ("target", json!(target)),
                ("max_watched", json!(max_watched)),
            ]);
            return self.violation(max_watched, payload, BLOCKED_WARNING, now);
        }

        if policy.seek.mode == SeekMode::BoundedForward {
            let grace = policy.grace_seconds();
            let allowed_max = max_watched + grace;
            if target > allowed_max + FORWARD_TOLERANCE_SECS {
                debug!(
                    "Seek to {:.2}s exceeds allowed {:.2}s, snapping back",
                    target, allowed_max
                );
                let payload = payload([
                    ("mode", json!("bounded_forward")),
                    ("target", json!(target)),
                    ("max_watched", json!(max_watched)),
                    ("grace", json!(grace)),
                ]);
                return self.violation(allowed_max, payload, BOUNDED_WARNING, now);
            }
        }

        SeekDecision::Allow
    }

    /// Records that the controller is about to write `position` to the sink.
    pub fn expect_correction(&mut self, position: f64) {
        self.pending_echo = Some(position);
    }

    fn violation(
        &mut self,
        corrected: f64,
        payload: Map<String, Value>,
        text: &'static str,
        now: Instant,
    ) -> SeekDecision {
        let warn = self
            .last_warning
            .is_none_or(|last| now.duration_since(last) > self.warning_cooldown);
        if warn {
            self.last_warning = Some(now);
        }

        SeekDecision::SnapBack(SeekViolation {
            corrected,
            payload,
            warning: warn.then_some(text),
        })
    }
}
