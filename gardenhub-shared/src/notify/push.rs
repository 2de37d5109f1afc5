/// Push delivery gateway
///
/// [`HttpPushGateway`] posts an FCM-style legacy message
/// (`{"to": <token>, "data": {...}}`) with a bearer server key. Messages are
/// data-only: the client app renders them. [`NoopPushGateway`] is wired in
/// when no key is configured and [`RecordingPushGateway`] backs tests.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, instrument};

/// Default FCM legacy endpoint
pub const DEFAULT_PUSH_ENDPOINT: &str = "https://fcm.googleapis.com/fcm/send";

/// Push gateway errors
#[derive(Debug, thiserror::Error)]
pub enum PushError {
    /// Transport failure or timeout
    #[error("Push request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Provider answered with a non-success status
    #[error("Push provider returned {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Data payload of a push message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PushPayload {
    pub title: String,
    pub body: String,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

#[derive(Serialize)]
struct PushMessage<'a> {
    to: &'a str,
    data: &'a PushPayload,
}

/// Sends a push message to a single device token
#[async_trait]
pub trait PushGateway: Send + Sync {
    async fn send(&self, token: &str, payload: &PushPayload) -> Result<(), PushError>;
}

/// HTTP push client
pub struct HttpPushGateway {
    client: Client,
    endpoint: String,
    server_key: String,
}

impl HttpPushGateway {
    /// Builds a client with a 10 second request timeout
    pub fn new(endpoint: impl Into<String>, server_key: impl Into<String>) -> Result<Self, PushError> {
        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            server_key: server_key.into(),
        })
    }
}

#[async_trait]
impl PushGateway for HttpPushGateway {
    #[instrument(skip(self, payload), fields(category = %payload.category))]
    async fn send(&self, token: &str, payload: &PushPayload) -> Result<(), PushError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.server_key)
            .json(&PushMessage { to: token, data: payload })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PushError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        debug!("Push message accepted");
        Ok(())
    }
}

/// Gateway that drops every message
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPushGateway;

#[async_trait]
impl PushGateway for NoopPushGateway {
    async fn send(&self, _token: &str, _payload: &PushPayload) -> Result<(), PushError> {
        Ok(())
    }
}

/// Gateway that records messages; tokens listed in `failing` are rejected
#[derive(Default)]
pub struct RecordingPushGateway {
    sent: Mutex<Vec<(String, PushPayload)>>,
    failing: Vec<String>,
}

impl RecordingPushGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects deliveries to the given tokens
    pub fn failing_for(tokens: &[&str]) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            failing: tokens.iter().map(|t| t.to_string()).collect(),
        }
    }

    /// Successfully delivered messages in send order
    pub async fn sent(&self) -> Vec<(String, PushPayload)> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl PushGateway for RecordingPushGateway {
    async fn send(&self, token: &str, payload: &PushPayload) -> Result<(), PushError> {
        if self.failing.iter().any(|t| t == token) {
            return Err(PushError::Rejected {
                status: 410,
                body: "NotRegistered".to_string(),
            });
        }
        self.sent
            .lock()
            .await
            .push((token.to_string(), payload.clone()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_body_shape() {
        let payload = PushPayload {
            title: "Frost tonight".into(),
            body: "Cover your seedlings".into(),
            category: "weather".into(),
            link: None,
        };
        let json = serde_json::to_value(PushMessage {
            to: "device-token",
            data: &payload,
        })
        .unwrap();

        assert_eq!(json["to"], "device-token");
        assert_eq!(json["data"]["title"], "Frost tonight");
        assert_eq!(json["data"]["category"], "weather");
        assert!(json["data"].get("link").is_none());
        assert!(json.get("notification").is_none());
    }

    #[test]
    fn test_http_gateway_builds() {
        assert!(HttpPushGateway::new(DEFAULT_PUSH_ENDPOINT, "key").is_ok());
    }

    #[tokio::test]
    async fn test_recording_gateway_rejects_failing_tokens() {
        let gateway = RecordingPushGateway::failing_for(&["stale"]);
        let payload = PushPayload {
            title: "t".into(),
            body: "b".into(),
            category: "system".into(),
            link: None,
        };

        assert!(gateway.send("stale", &payload).await.is_err());
        assert!(gateway.send("fresh", &payload).await.is_ok());
        assert_eq!(gateway.sent().await.len(), 1);
    }
}
