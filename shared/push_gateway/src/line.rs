//! LINE Messaging API push client
//!
//! `POST {base}/v2/bot/message/push` with a channel access token. The API
//! acknowledges at the HTTP level only; a non-2xx answer leaves the send
//! unconfirmed.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use crate::{PushChannel, PushError, PushResult};

const DEFAULT_BASE_URL: &str = "https://api.line.me";
const SEND_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Serialize)]
struct PushPayload<'a> {
    to: &'a str,
    messages: [TextMessage<'a>; 1],
}

#[derive(Debug, Serialize)]
struct TextMessage<'a> {
    #[serde(rename = "type")]
    message_type: &'static str,
    text: &'a str,
}

/// LINE Messaging API client
pub struct LineMessaging {
    http: reqwest::Client,
    base_url: String,
    access_token: String,
}

impl LineMessaging {
    /// Creates a client against the public LINE endpoint
    ///
    /// # Panics
    ///
    /// Panics if the TLS backend cannot be initialized.
    #[must_use]
    pub fn new(access_token: String) -> Self {
        Self::with_base_url(access_token, DEFAULT_BASE_URL.to_string())
    }

    /// Creates a client against a custom endpoint (local stub in development)
    ///
    /// # Panics
    ///
    /// Panics if the TLS backend cannot be initialized.
    #[must_use]
    pub fn with_base_url(access_token: String, base_url: String) -> Self {
        let http = reqwest::Client::builder()
            .timeout(SEND_TIMEOUT)
            .build()
            .expect("failed to build LINE HTTP client");

        Self {
            http,
            base_url,
            access_token,
        }
    }
}

#[async_trait]
impl PushChannel for LineMessaging {
    async fn send(&self, channel_identity: &str, text: &str) -> PushResult<()> {
        let payload = PushPayload {
            to: channel_identity,
            messages: [TextMessage {
                message_type: "text",
                text,
            }],
        };

        let response = self
            .http
            .post(format!("{}/v2/bot/message/push", self.base_url))
            .bearer_auth(&self.access_token)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            debug!(to = channel_identity, "LINE push acknowledged");
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(PushError::Unconfirmed {
            status: status.as_u16(),
            body,
        })
    }
}
