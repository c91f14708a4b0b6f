use serde_json::{Map, Value, json};
use tracing::debug;

use crate::constants::MIN_PLAYBACK_RATE;
use crate::models::Policy;
use crate::models::events::payload;
use crate::utils::time::clamp;

/// Rates within this distance of 1.0 count as normal speed.
const NORMAL_RATE_TOLERANCE: f64 = 0.001;
const CAP_TOLERANCE: f64 = 0.0001;

pub const LOCKED_WARNING: &str = "Playback speed changes are disabled.";

#[derive(Debug, Clone, PartialEq)]
pub enum RateDecision {
    /// Apply this rate; nothing was violated.
    Accept(f64),
    Enforce(RateViolation),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RateViolation {
    pub enforced: f64,
    pub payload: Map<String, Value>,
    pub warning: String,
}

impl RateDecision {
    pub fn rate(&self) -> f64 {
        match self {
            RateDecision::Accept(rate) => *rate,
            RateDecision::Enforce(violation) => violation.enforced,
        }
    }
}

/// Clamps or locks playback rate changes according to the policy.
#[derive(Debug, Default, Clone, Copy)]
pub struct SpeedGovernor;

impl SpeedGovernor {
    pub fn new() -> Self {
        Self
    }

    /// Reacts to a rate the sink already switched to.
    pub fn on_rate_change(&self, policy: &Policy, rate: f64) -> RateDecision {
        if policy.speed_locked() {
            if (rate - 1.0).abs() > NORMAL_RATE_TOLERANCE {
                return Self::locked(rate);
            }
            return RateDecision::Accept(rate);
        }

        let max = policy.max_rate();
        if rate > max + CAP_TOLERANCE {
            debug!("Rate {:.2}x exceeds cap {:.2}x, clamping", rate, max);
            return RateDecision::Enforce(RateViolation {
                enforced: max,
                payload: payload([("attempted", json!(rate)), ("enforced", json!(max))]),
                warning: format!("Maximum playback speed is {}x.", max),
            });
        }

        RateDecision::Accept(rate)
    }

    /// Validates a rate requested through the UI before it is applied.
    ///
    /// Unlocked requests are clamped into `[MIN_PLAYBACK_RATE, max]` without a violation;
    /// the cap is advertised by the rate menu already.
    pub fn clamp_request(&self, policy: &Policy, requested: f64) -> RateDecision {
        if policy.speed_locked() {
            if (requested - 1.0).abs() > NORMAL_RATE_TOLERANCE {
                return Self::locked(requested);
            }
            return RateDecision::Accept(1.0);
        }

        RateDecision::Accept(clamp(requested, MIN_PLAYBACK_RATE, policy.max_rate()))
    }

    fn locked(attempted: f64) -> RateDecision {
        debug!("Speed locked, resetting {:.2}x to 1x", attempted);
        RateDecision::Enforce(RateViolation {
            enforced: 1.0,
            payload: payload([("attempted", json!(attempted)), ("enforced", json!(1))]),
            warning: LOCKED_WARNING.to_string(),
        })
    }
}
