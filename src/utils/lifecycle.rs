use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Liveness flag shared between a controller and the background work it spawns.
///
/// The controller owns the guard and retires it during teardown. Every asynchronous
/// callback checks [`LifecycleGuard::is_live`] before touching controller state, so nothing
/// mutates an instance after it has been torn down.
#[derive(Debug, Clone)]
pub struct LifecycleGuard {
    live: Arc<AtomicBool>,
}

impl LifecycleGuard {
    pub fn new() -> Self {
        Self {
            live: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }

    /// Marks the instance as torn down. Returns false if it was already retired.
    pub fn retire(&self) -> bool {
        self.live.swap(false, Ordering::AcqRel)
    }
}

impl Default for LifecycleGuard {
    fn default() -> Self {
        Self::new()
    }
}
