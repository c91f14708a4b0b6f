use proctored_player::models::PlaybackBootstrap;
use serde_json::{Value, json};

pub struct BootstrapBuilder {
    token: String,
    access_mode: &'static str,
    policy: Value,
    play_url: String,
    expires_at: Option<i64>,
    monitoring_enabled: Option<bool>,
}

impl BootstrapBuilder {
    pub fn proctored() -> Self {
        Self {
            token: "tok-live-1".to_string(),
            access_mode: "PROCTORED_CLASS",
            policy: json!({}),
            play_url: "/media/hls/7/master.m3u8".to_string(),
            expires_at: Some(1_900_000_000),
            monitoring_enabled: None,
        }
    }

    pub fn review() -> Self {
        Self {
            access_mode: "FREE_REVIEW",
            expires_at: None,
            ..Self::proctored()
        }
    }

    pub fn with_token(mut self, token: &str) -> Self {
        self.token = token.to_string();
        self
    }

    pub fn with_policy(mut self, policy: Value) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_play_url(mut self, play_url: &str) -> Self {
        self.play_url = play_url.to_string();
        self
    }

    pub fn with_monitoring(mut self, enabled: bool) -> Self {
        self.monitoring_enabled = Some(enabled);
        self
    }

    pub fn build(self) -> PlaybackBootstrap {
        serde_json::from_value(json!({
            "token": self.token,
            "session_id": "3f9c2a10-aaaa-bbbb-cccc-000000000001",
            "expires_at": self.expires_at,
            "access_mode": self.access_mode,
            "monitoring_enabled": self
                .monitoring_enabled
                .unwrap_or(self.access_mode == "PROCTORED_CLASS"),
            "policy": self.policy,
            "play_url": self.play_url,
        }))
        .expect("bootstrap fixture should deserialize")
    }
}
