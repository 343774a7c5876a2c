//! Observable controller events.
//!
//! Faults never cross the controller boundary as errors. They are logged
//! and published here so a host can surface diagnostics if it wants to;
//! nobody has to listen.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::error::{ChatError, FaultKind};
use crate::types::{Turn, Visibility};

const EVENT_CAPACITY: usize = 128;

/// A swallowed error
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatFault {
    pub kind: FaultKind,
    pub message: String,
    pub ts: DateTime<Utc>,
}

impl From<&ChatError> for ChatFault {
    fn from(err: &ChatError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
            ts: Utc::now(),
        }
    }
}

/// Something the controller did
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ChatEvent {
    VisibilityChanged {
        visibility: Visibility,
    },
    TurnAppended {
        conversation: usize,
        turn: Turn,
    },
    ConversationSelected {
        conversation: usize,
    },
    Fault(ChatFault),
}

/// Broadcast bus for [`ChatEvent`]s
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ChatEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChatEvent> {
        self.tx.subscribe()
    }

    /// Publish to current subscribers. No subscribers is fine.
    pub fn publish(&self, event: ChatEvent) {
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
