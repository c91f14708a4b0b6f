use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::Serialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, trace};
use url::Url;

use super::errors::BackendError;
use super::traits::{EventBatch, PlaybackBackend};
use crate::config::NetworkConfig;
use crate::constants::{END_PATH, EVENTS_PATH, HEARTBEAT_PATH, REFRESH_PATH};
use crate::models::SessionToken;
use crate::utils::PlayerError;

/// reqwest client for the playback session endpoints.
#[derive(Debug, Clone)]
pub struct HttpPlaybackBackend {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpPlaybackBackend {
    pub fn new(config: &NetworkConfig) -> Result<Self, PlayerError> {
        let base_url = Url::parse(config.api_base_url.trim()).map_err(|e| {
            PlayerError::Configuration(format!(
                "Invalid API base URL '{}': {}",
                config.api_base_url, e
            ))
        })?;

        let mut headers = HeaderMap::new();
        headers.insert("Accept", HeaderValue::from_static("application/json"));
        if let Some(token) = config.auth_token.as_deref().filter(|t| !t.is_empty()) {
            let value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| PlayerError::Configuration("Invalid auth token".to_string()))?;
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.connection_timeout.max(1)))
            .default_headers(headers)
            .build()?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, BackendError> {
        self.base_url
            .join(path)
            .map_err(|e| BackendError::Parse(format!("Invalid endpoint {}: {}", path, e)))
    }

    async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<(), BackendError> {
        let url = self.endpoint(path)?;
        trace!("POST {}", url);

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(BackendError::from_reqwest)?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        debug!("{} responded with {}: {}", path, status, body);
        Err(BackendError::from_response(status.as_u16(), &body))
    }
}

#[async_trait]
impl PlaybackBackend for HttpPlaybackBackend {
    async fn heartbeat(&self, token: &SessionToken) -> Result<(), BackendError> {
        self.post(HEARTBEAT_PATH, &json!({ "token": token })).await
    }

    async fn refresh(&self, token: &SessionToken) -> Result<(), BackendError> {
        self.post(REFRESH_PATH, &json!({ "token": token })).await
    }

    async fn end(&self, token: &SessionToken) -> Result<(), BackendError> {
        self.post(END_PATH, &json!({ "token": token })).await
    }

    async fn submit_events(&self, batch: &EventBatch) -> Result<(), BackendError> {
        if batch.events.is_empty() {
            return Ok(());
        }
        self.post(EVENTS_PATH, batch).await
    }
}
