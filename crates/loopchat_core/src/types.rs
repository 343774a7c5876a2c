//! Core types for the conversation model.

use serde::{Deserialize, Serialize};

use crate::error::{ChatError, ChatResult};

/// Text substituted when the responder reply carries no text
pub const NO_RESPONSE_TEXT: &str = "No response";

/// Greeting seeded into a fresh conversation set
pub const DEFAULT_GREETING: &str = "I'm Loopi's friendly chatbot, here to provide quick answers to your frequently asked questions. How can I assist you today?";

/// A clickable suggestion attached to a bot turn
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuickReply {
    /// Display label
    pub title: String,
    /// Value resent as if typed by the user
    pub payload: String,
}

impl QuickReply {
    pub fn new(title: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            payload: payload.into(),
        }
    }
}

/// One message unit in a conversation.
///
/// Stored as `{"user": ...}` or `{"bot": ..., "buttons": [...]}`. The
/// `buttons` key is omitted when empty, and a bot turn stored without it
/// loads with no buttons.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum Turn {
    Bot {
        #[serde(rename = "bot")]
        text: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        buttons: Vec<QuickReply>,
    },
    User {
        #[serde(rename = "user")]
        text: String,
    },
}

impl Turn {
    /// Create a user turn
    pub fn user(text: impl Into<String>) -> Self {
        Self::User { text: text.into() }
    }

    /// Create a bot turn
    pub fn bot(text: impl Into<String>, buttons: Vec<QuickReply>) -> Self {
        Self::Bot {
            text: text.into(),
            buttons,
        }
    }

    pub fn text(&self) -> &str {
        match self {
            Self::Bot { text, .. } | Self::User { text } => text.as_str(),
        }
    }

    pub fn buttons(&self) -> &[QuickReply] {
        match self {
            Self::Bot { buttons, .. } => buttons,
            Self::User { .. } => &[],
        }
    }

    pub fn is_user(&self) -> bool {
        matches!(self, Self::User { .. })
    }

    pub fn is_bot(&self) -> bool {
        matches!(self, Self::Bot { .. })
    }
}

/// A parsed responder reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotReply {
    pub text: String,
    pub buttons: Vec<QuickReply>,
}

impl BotReply {
    pub fn new(text: impl Into<String>, buttons: Vec<QuickReply>) -> Self {
        Self {
            text: text.into(),
            buttons,
        }
    }

    /// Plain text reply without buttons
    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(text, Vec::new())
    }
}

impl From<BotReply> for Turn {
    fn from(reply: BotReply) -> Self {
        Turn::bot(reply.text, reply.buttons)
    }
}

/// An ordered, append-only sequence of turns
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Conversation {
    turns: Vec<Turn>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Conversation opened by a single bot greeting
    pub fn greeting(text: impl Into<String>) -> Self {
        Self {
            turns: vec![Turn::bot(text, Vec::new())],
        }
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Most recent bot turn, if any
    pub fn last_bot_turn(&self) -> Option<&Turn> {
        self.turns.iter().rev().find(|t| t.is_bot())
    }
}

/// Per-conversation metadata kept in the `conversations` slot
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConversationMeta {
    #[serde(rename = "conversationId")]
    pub conversation_id: i64,
}

/// All conversation threads plus the selected one.
///
/// Never empty once constructed: `selected_index` always points at an
/// existing conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationSet {
    conversations: Vec<Conversation>,
    selected_index: usize,
}

impl ConversationSet {
    /// Build from stored parts. An empty list materializes one empty
    /// conversation; an out-of-range index falls back to 0.
    pub fn from_parts(mut conversations: Vec<Conversation>, selected_index: usize) -> Self {
        if conversations.is_empty() {
            conversations.push(Conversation::new());
        }
        let selected_index = if selected_index < conversations.len() {
            selected_index
        } else {
            0
        };
        Self {
            conversations,
            selected_index,
        }
    }

    /// Fresh set holding one conversation with the greeting
    pub fn seeded(greeting: impl Into<String>) -> Self {
        Self::from_parts(vec![Conversation::greeting(greeting)], 0)
    }

    pub fn selected_index(&self) -> usize {
        self.selected_index
    }

    pub fn active(&self) -> &Conversation {
        &self.conversations[self.selected_index]
    }

    pub fn get(&self, index: usize) -> Option<&Conversation> {
        self.conversations.get(index)
    }

    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }

    /// Append a turn to the conversation at `index`
    pub fn append(&mut self, index: usize, turn: Turn) -> ChatResult<()> {
        let conversation = self
            .conversations
            .get_mut(index)
            .ok_or(ChatError::ConversationNotFound(index))?;
        conversation.push(turn);
        Ok(())
    }

    pub fn select(&mut self, index: usize) -> ChatResult<()> {
        if index >= self.conversations.len() {
            return Err(ChatError::ConversationNotFound(index));
        }
        self.selected_index = index;
        Ok(())
    }

    /// Add an empty conversation and select it, returning its index
    pub fn push_new(&mut self) -> usize {
        self.conversations.push(Conversation::new());
        self.selected_index = self.conversations.len() - 1;
        self.selected_index
    }

    /// Remove the conversation at `index`.
    ///
    /// The selection moves to the last conversation when it falls off the
    /// end. Removing the only conversation leaves a single empty one.
    pub fn remove(&mut self, index: usize) -> ChatResult<Conversation> {
        if index >= self.conversations.len() {
            return Err(ChatError::ConversationNotFound(index));
        }
        let removed = self.conversations.remove(index);
        if self.conversations.is_empty() {
            self.conversations.push(Conversation::new());
        }
        if self.selected_index >= self.conversations.len() {
            self.selected_index = self.conversations.len() - 1;
        }
        Ok(removed)
    }
}

/// Chat window visibility
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Closed,
    Open,
}

impl Visibility {
    pub fn toggled(self) -> Self {
        match self {
            Self::Closed => Self::Open,
            Self::Open => Self::Closed,
        }
    }

    pub fn is_open(self) -> bool {
        self == Self::Open
    }
}
