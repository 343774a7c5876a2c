//! Mock responder for testing.
//!
//! Returns scripted replies in order and records every call, so controller
//! behaviour can be verified without a bot endpoint. A reply can be held
//! behind a gate until the test releases it, which makes overlapping sends
//! deterministic.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::Notify;

use crate::error::{ChatError, ChatResult};
use crate::responder::BotResponder;
use crate::types::{BotReply, QuickReply};

/// Predefined outcome for one `send` call.
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub outcome: Result<BotReply, String>,
    pub gate: Option<Arc<Notify>>,
}

impl MockResponse {
    pub fn reply(text: impl Into<String>) -> Self {
        Self {
            outcome: Ok(BotReply::plain(text)),
            gate: None,
        }
    }

    pub fn with_buttons(text: impl Into<String>, buttons: Vec<QuickReply>) -> Self {
        Self {
            outcome: Ok(BotReply::new(text, buttons)),
            gate: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            outcome: Err(message.into()),
            gate: None,
        }
    }

    /// Hold this response until `gate` is notified
    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }
}

/// Captured call information for verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedSend {
    pub utterance: String,
    pub conversation_id: i64,
}

/// Scripted responder.
///
/// Clones share the script and the captured calls. When the script runs
/// out, the default response is used.
#[derive(Clone)]
pub struct MockResponder {
    responses: Arc<RwLock<VecDeque<MockResponse>>>,
    default_response: Arc<RwLock<MockResponse>>,
    captured: Arc<RwLock<Vec<CapturedSend>>>,
}

impl MockResponder {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(RwLock::new(VecDeque::new())),
            default_response: Arc::new(RwLock::new(MockResponse::reply("ok"))),
            captured: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Queue a response for the next unanswered call
    pub fn push(&self, response: MockResponse) -> &Self {
        self.responses.write().push_back(response);
        self
    }

    pub fn set_default(&self, response: MockResponse) {
        *self.default_response.write() = response;
    }

    pub fn calls(&self) -> Vec<CapturedSend> {
        self.captured.read().clone()
    }

    pub fn call_count(&self) -> usize {
        self.captured.read().len()
    }
}

impl Default for MockResponder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BotResponder for MockResponder {
    async fn send(&self, utterance: &str, conversation_id: i64) -> ChatResult<BotReply> {
        self.captured.write().push(CapturedSend {
            utterance: utterance.to_string(),
            conversation_id,
        });

        let response = self
            .responses
            .write()
            .pop_front()
            .unwrap_or_else(|| self.default_response.read().clone());

        if let Some(gate) = &response.gate {
            gate.notified().await;
        }

        response.outcome.map_err(ChatError::Responder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_then_default() {
        let mock = MockResponder::new();
        mock.push(MockResponse::reply("first"))
            .push(MockResponse::failure("down"));

        assert_eq!(mock.send("a", 1).await.unwrap().text, "first");
        assert!(matches!(mock.send("b", 1).await, Err(ChatError::Responder(_))));
        assert_eq!(mock.send("c", 7).await.unwrap().text, "ok");

        let calls = mock.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[2], CapturedSend { utterance: "c".to_string(), conversation_id: 7 });
    }

    #[tokio::test]
    async fn test_gate_holds_reply() {
        let gate = Arc::new(Notify::new());
        let mock = MockResponder::new();
        mock.push(MockResponse::reply("held").gated(gate.clone()));

        // A stored permit releases the waiter immediately
        gate.notify_one();
        assert_eq!(mock.send("x", 1).await.unwrap().text, "held");
    }
}
