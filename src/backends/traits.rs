use async_trait::async_trait;
use serde::Serialize;

use super::errors::BackendError;
use crate::models::{SessionToken, ViolationEvent};

/// One telemetry submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventBatch {
    pub token: SessionToken,
    pub video_id: i64,
    pub enrollment_id: Option<i64>,
    pub events: Vec<ViolationEvent>,
}

/// Session service the controller keeps alive and reports to.
///
/// Implementations never see sessionless tokens; the dispatcher filters those out.
#[async_trait]
pub trait PlaybackBackend: Send + Sync + std::fmt::Debug {
    /// Keep-alive ping for a live session
    async fn heartbeat(&self, token: &SessionToken) -> Result<(), BackendError>;

    /// Re-validates the session, e.g. after the page regains visibility
    async fn refresh(&self, token: &SessionToken) -> Result<(), BackendError>;

    /// Best-effort termination notice
    async fn end(&self, token: &SessionToken) -> Result<(), BackendError>;

    async fn submit_events(&self, batch: &EventBatch) -> Result<(), BackendError>;
}
