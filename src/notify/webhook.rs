//! Webhook-backed chat transport.
//!
//! A minimal HTTP implementation of [`ChatTransport`]: one POST per send,
//! response status mapped onto the [`ChatError`] taxonomy. No platform wire
//! protocol beyond that.

use async_trait::async_trait;
use serde_json::json;

use crate::notify::transport::{Attachment, ChatError, ChatTransport, MessageRef};

/// Header carrying the platform's global rate-limit marker.
const GLOBAL_LIMIT_HEADER: &str = "x-ratelimit-global";

/// Chat transport that POSTs message payloads to a webhook endpoint.
pub struct WebhookTransport {
    client: reqwest::Client,
    base_url: String,
}

impl WebhookTransport {
    /// Create a transport for the given webhook base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    /// Create a transport with a per-request timeout.
    pub fn with_timeout(base_url: impl Into<String>, timeout: std::time::Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn message_url(&self, message: &MessageRef) -> String {
        format!("{}/messages/{}", self.base_url, message.message_id)
    }

    /// Map a non-success HTTP response onto the error taxonomy.
    fn classify(response: &reqwest::Response) -> ChatError {
        let status = response.status().as_u16();
        match status {
            429 => {
                let retry_after = response
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<f64>().ok());
                let global = response.headers().contains_key(GLOBAL_LIMIT_HEADER);
                ChatError::RateLimited {
                    retry_after,
                    global,
                }
            }
            s if s >= 500 => ChatError::Server(s),
            s => ChatError::Client(s),
        }
    }

    fn classify_transport(err: reqwest::Error) -> ChatError {
        if err.is_timeout() || err.is_connect() || err.is_request() {
            ChatError::Network(err.to_string())
        } else {
            ChatError::Other(err.to_string())
        }
    }

    /// Extract the platform-assigned message id from a response body.
    async fn message_ref(
        destination_id: u64,
        response: reqwest::Response,
    ) -> Result<MessageRef, ChatError> {
        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ChatError::Other(format!("malformed response body: {e}")))?;
        let message_id = body
            .get("id")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        Ok(MessageRef {
            destination_id,
            message_id,
        })
    }
}

#[async_trait]
impl ChatTransport for WebhookTransport {
    async fn send(
        &self,
        destination_id: u64,
        content: &str,
        attachment: Option<&Attachment>,
    ) -> Result<MessageRef, ChatError> {
        let mut payload = json!({
            "destination_id": destination_id,
            "content": content,
        });
        if let Some(attachment) = attachment {
            payload["attachment"] = attachment.clone();
        }

        let response = self
            .client
            .post(&self.base_url)
            .json(&payload)
            .send()
            .await
            .map_err(Self::classify_transport)?;

        if !response.status().is_success() {
            return Err(Self::classify(&response));
        }
        Self::message_ref(destination_id, response).await
    }

    async fn edit(&self, message: &MessageRef, content: &str) -> Result<MessageRef, ChatError> {
        let response = self
            .client
            .patch(self.message_url(message))
            .json(&json!({ "content": content }))
            .send()
            .await
            .map_err(Self::classify_transport)?;

        if !response.status().is_success() {
            return Err(Self::classify(&response));
        }
        Self::message_ref(message.destination_id, response).await
    }

    async fn delete(&self, message: &MessageRef) -> Result<(), ChatError> {
        let response = self
            .client
            .delete(self.message_url(message))
            .send()
            .await
            .map_err(Self::classify_transport)?;

        if !response.status().is_success() {
            return Err(Self::classify(&response));
        }
        Ok(())
    }
}
