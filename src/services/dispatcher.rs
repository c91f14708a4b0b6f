use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio_util::task::TaskTracker;
use tracing::{debug, trace, warn};

use crate::backends::{BackendError, EventBatch, PlaybackBackend};
use crate::models::{SessionToken, ViolationEvent};
use crate::utils::LifecycleGuard;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendCall {
    Heartbeat,
    /// `manual` is set when the viewer asked for the refresh.
    Refresh { manual: bool },
    End,
    SubmitEvents { count: usize },
}

/// Result of a background backend call, delivered back to the controller loop.
#[derive(Debug)]
pub struct BackendOutcome {
    pub call: BackendCall,
    pub result: Result<(), BackendError>,
}

/// Fire-and-forget bridge between the synchronous controller and the async backend.
///
/// Calls never block the caller. Outcomes are only delivered while the lifecycle guard
/// is live, so a torn-down controller never observes a late response.
///
/// Calls run on the Tokio runtime current at construction, or the one passed to
/// [`BackendDispatcher::set_runtime`]. Without a runtime, calls are dropped with a warning.
pub struct BackendDispatcher {
    backend: Arc<dyn PlaybackBackend>,
    guard: LifecycleGuard,
    outcomes: mpsc::UnboundedSender<BackendOutcome>,
    sessionless_prefix: String,
    token: SessionToken,
    video_id: i64,
    enrollment_id: Option<i64>,
    runtime: Option<Handle>,
    tasks: TaskTracker,
}

impl std::fmt::Debug for BackendDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendDispatcher")
            .field("backend", &self.backend)
            .field("video_id", &self.video_id)
            .field("sessionless", &self.is_sessionless())
            .field("has_runtime", &self.runtime.is_some())
            .field("in_flight", &self.tasks.len())
            .finish()
    }
}

impl BackendDispatcher {
    pub fn new(
        backend: Arc<dyn PlaybackBackend>,
        guard: LifecycleGuard,
        outcomes: mpsc::UnboundedSender<BackendOutcome>,
        sessionless_prefix: impl Into<String>,
        token: SessionToken,
        video_id: i64,
        enrollment_id: Option<i64>,
    ) -> Self {
        Self {
            backend,
            guard,
            outcomes,
            sessionless_prefix: sessionless_prefix.into(),
            token,
            video_id,
            enrollment_id,
            runtime: Handle::try_current().ok(),
            tasks: TaskTracker::new(),
        }
    }

    /// Runs later calls on `runtime`, for controllers built outside one.
    pub fn set_runtime(&mut self, runtime: Handle) {
        self.runtime = Some(runtime);
    }

    pub fn set_token(&mut self, token: SessionToken) {
        debug!("Session token rotated");
        self.token = token;
    }

    pub fn is_sessionless(&self) -> bool {
        self.token.is_sessionless(&self.sessionless_prefix)
    }

    pub fn heartbeat(&self) -> bool {
        let backend = Arc::clone(&self.backend);
        let token = self.token.clone();
        self.spawn(BackendCall::Heartbeat, async move {
            backend.heartbeat(&token).await
        })
    }

    pub fn refresh(&self, manual: bool) -> bool {
        let backend = Arc::clone(&self.backend);
        let token = self.token.clone();
        self.spawn(BackendCall::Refresh { manual }, async move {
            backend.refresh(&token).await
        })
    }

    /// Sent during teardown; its outcome is never delivered.
    pub fn end(&self) -> bool {
        let backend = Arc::clone(&self.backend);
        let token = self.token.clone();
        self.spawn(BackendCall::End, async move { backend.end(&token).await })
    }

    /// Submits one batch. Empty batches are never sent.
    pub fn submit(&self, events: Vec<ViolationEvent>) -> bool {
        if events.is_empty() {
            return false;
        }

        let batch = EventBatch {
            token: self.token.clone(),
            video_id: self.video_id,
            enrollment_id: self.enrollment_id,
            events,
        };
        let count = batch.events.len();
        let backend = Arc::clone(&self.backend);
        self.spawn(BackendCall::SubmitEvents { count }, async move {
            backend.submit_events(&batch).await
        })
    }

    /// Waits up to `grace` for in-flight calls to finish. New calls are still accepted.
    pub async fn settle(&self, grace: Duration) {
        self.tasks.close();
        if tokio::time::timeout(grace, self.tasks.wait()).await.is_err() {
            debug!("{} backend call(s) still in flight after {:?}", self.tasks.len(), grace);
        }
        self.tasks.reopen();
    }

    fn spawn<F>(&self, call: BackendCall, request: F) -> bool
    where
        F: Future<Output = Result<(), BackendError>> + Send + 'static,
    {
        if self.is_sessionless() {
            trace!("Sessionless playback, skipping {:?}", call);
            return false;
        }

        let Some(runtime) = self.runtime.as_ref() else {
            warn!("No Tokio runtime available, dropping {:?}", call);
            return false;
        };

        let guard = self.guard.clone();
        let outcomes = self.outcomes.clone();
        let task = async move {
            let result = request.await;
            if let Err(e) = &result {
                debug!("{:?} failed: {}", call, e);
            }
            if !guard.is_live() {
                trace!("Controller gone, dropping {:?} outcome", call);
                return;
            }
            let _ = outcomes.send(BackendOutcome { call, result });
        };
        self.tasks.spawn_on(task, runtime);
        true
    }
}
