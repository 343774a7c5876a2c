//! Remote responder client.
//!
//! One utterance goes out as a single JSON `POST`; the reply is parsed into
//! a [`BotReply`]. Transport errors, non-2xx statuses and malformed bodies
//! all collapse into [`ChatError::Responder`]. There is no retry and no
//! explicit timeout.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::config::WidgetConfig;
use crate::error::{ChatError, ChatResult};
use crate::types::{BotReply, QuickReply, NO_RESPONSE_TEXT};

/// Maps an utterance to a bot reply
#[async_trait]
pub trait BotResponder: Send + Sync {
    /// Send one utterance, tagged with an opaque conversation correlator
    async fn send(&self, utterance: &str, conversation_id: i64) -> ChatResult<BotReply>;
}

/// Request body sent to the bot endpoint
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ResponderRequest {
    pub message: String,
    pub conversation_id: i64,
}

/// Reply body as received; both fields are optional on the wire.
///
/// `buttons` is kept raw so that a badly shaped button costs only that
/// button, never the reply text.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponderPayload {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub buttons: Option<Value>,
}

impl ResponderPayload {
    /// Buttons that carry a string `title` and `payload`
    pub fn quick_replies(&self) -> Vec<QuickReply> {
        let Some(Value::Array(entries)) = &self.buttons else {
            return Vec::new();
        };

        let buttons: Vec<QuickReply> = entries
            .iter()
            .filter_map(|entry| QuickReply::deserialize(entry).ok())
            .collect();

        if buttons.len() < entries.len() {
            debug!(
                dropped = entries.len() - buttons.len(),
                "Skipping malformed quick replies"
            );
        }
        buttons
    }
}

impl From<ResponderPayload> for BotReply {
    fn from(payload: ResponderPayload) -> Self {
        let buttons = payload.quick_replies();
        let text = payload
            .text
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| NO_RESPONSE_TEXT.to_string());
        BotReply::new(text, buttons)
    }
}

/// Parse a reply body
pub fn parse_reply(body: &str) -> ChatResult<BotReply> {
    let payload: Option<ResponderPayload> = serde_json::from_str(body)
        .map_err(|e| ChatError::responder(format!("Failed to parse response: {}", e)))?;
    Ok(payload.unwrap_or_default().into())
}

/// HTTP implementation of [`BotResponder`]
pub struct HttpResponder {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpResponder {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            client: reqwest::Client::new(),
        }
    }

    pub fn from_config(config: &WidgetConfig) -> Self {
        Self::new(config.endpoint.clone())
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl BotResponder for HttpResponder {
    async fn send(&self, utterance: &str, conversation_id: i64) -> ChatResult<BotReply> {
        let request = ResponderRequest {
            message: utterance.to_string(),
            conversation_id,
        };

        debug!(endpoint = %self.endpoint, conversation_id, "Sending utterance");

        let response = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| ChatError::responder(format!("Network error: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChatError::responder(format!(
                "Bot endpoint error {}: {}",
                status, body
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ChatError::responder(format!("Failed to read response: {}", e)))?;

        parse_reply(&body)
    }
}
