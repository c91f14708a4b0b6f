use serde_json::Value;
use thiserror::Error;

use crate::models::FatalReason;

/// Failures reported by the session backend.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BackendError {
    /// The policy behind the session changed; playback must stop
    #[error("Playback policy changed")]
    PolicyChanged,

    /// The session is no longer active (expired, revoked or superseded)
    #[error("Playback session is inactive")]
    SessionInactive,

    /// Any other non-success status
    #[error("HTTP error: {detail} (status: {status})")]
    Http { status: u16, detail: String },

    /// Network/connection errors (timeout, connection refused, etc.)
    #[error("Network error: {0}")]
    Network(String),

    #[error("Failed to parse response: {0}")]
    Parse(String),
}

impl BackendError {
    /// Classifies a non-success response from its status and raw body.
    ///
    /// The `detail` field of a JSON body is preferred over the raw text.
    pub fn from_response(status: u16, body: &str) -> Self {
        let detail = serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|value| {
                value
                    .get("detail")
                    .and_then(Value::as_str)
                    .map(str::to_string)
            })
            .unwrap_or_else(|| body.trim().to_string());

        if detail.contains("policy_changed") {
            BackendError::PolicyChanged
        } else if detail.contains("session_inactive") || status == 409 {
            BackendError::SessionInactive
        } else {
            BackendError::Http { status, detail }
        }
    }

    /// Create an error from a reqwest error
    pub fn from_reqwest(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            BackendError::Network(format!("Request timeout: {}", error))
        } else if error.is_connect() {
            BackendError::Network(format!("Connection failed: {}", error))
        } else if error.is_decode() {
            BackendError::Parse(error.to_string())
        } else {
            BackendError::Network(error.to_string())
        }
    }

    /// The fatal reason when this error signals loss of session liveness.
    pub fn liveness(&self) -> Option<FatalReason> {
        match self {
            BackendError::PolicyChanged => Some(FatalReason::PolicyChanged),
            BackendError::SessionInactive => Some(FatalReason::SessionInactive),
            _ => None,
        }
    }

    /// Check if this error is transient and the next tick may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            BackendError::Network(_) => true,
            BackendError::Http { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}
