use serde_json::{Map, Value};
use std::collections::VecDeque;
use tracing::{trace, warn};

use crate::models::{EventType, Policy, ViolationEvent};

/// In-memory telemetry queue drained on every flush tick.
#[derive(Debug)]
pub struct EventBatcher {
    queue: VecDeque<ViolationEvent>,
    cap: usize,
    monitoring: bool,
    reports_violations: bool,
    dropped: u64,
}

impl EventBatcher {
    pub fn new(policy: &Policy, cap: usize) -> Self {
        Self {
            queue: VecDeque::new(),
            cap: cap.max(1),
            monitoring: policy.monitoring_enabled,
            reports_violations: policy.reports_violations(),
            dropped: 0,
        }
    }

    /// Queues an event if the session's gating allows it. Returns true when queued.
    pub fn record(&mut self, kind: EventType, payload: Map<String, Value>) -> bool {
        if !self.monitoring {
            return false;
        }
        if kind.is_violation() && !self.reports_violations {
            trace!("Violation {:?} not reported in review mode", kind);
            return false;
        }

        self.queue.push_back(ViolationEvent::new(kind, payload));
        if self.queue.len() > self.cap {
            let excess = self.queue.len() - self.cap;
            self.queue.drain(..excess);
            self.dropped += excess as u64;
            warn!("Event queue over capacity, dropped {} oldest event(s)", excess);
        }
        true
    }

    /// Empties the queue, returning everything in arrival order.
    pub fn drain(&mut self) -> Vec<ViolationEvent> {
        self.queue.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn pending(&self) -> impl Iterator<Item = &ViolationEvent> {
        self.queue.iter()
    }

    /// Events discarded by the soft cap so far.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}
