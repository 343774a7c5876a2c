//! Error types for the chat core.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for chat operations
pub type ChatResult<T> = Result<T, ChatError>;

/// Chat core errors
#[derive(Error, Debug)]
pub enum ChatError {
    /// Slot could not be written or read back
    #[error("Storage error: {0}")]
    Storage(String),

    /// Slot value exceeds the store's capacity
    #[error("Storage capacity exceeded for slot '{key}': {size} bytes > {limit} bytes")]
    CapacityExceeded { key: String, size: usize, limit: usize },

    /// File system error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Remote responder failed (transport, status or body)
    #[error("Responder error: {0}")]
    Responder(String),

    /// Rejected input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Conversation index does not exist
    #[error("Conversation not found: {0}")]
    ConversationNotFound(usize),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for ChatError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<reqwest::Error> for ChatError {
    fn from(err: reqwest::Error) -> Self {
        Self::Responder(err.to_string())
    }
}

/// Coarse fault category, used when publishing faults to observers
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FaultKind {
    Storage,
    Responder,
    Validation,
    Model,
    Config,
}

impl ChatError {
    /// Category of this error
    pub fn kind(&self) -> FaultKind {
        match self {
            Self::Storage(_)
            | Self::CapacityExceeded { .. }
            | Self::Io(_)
            | Self::Serialization(_) => FaultKind::Storage,
            Self::Responder(_) => FaultKind::Responder,
            Self::Validation(_) => FaultKind::Validation,
            Self::ConversationNotFound(_) => FaultKind::Model,
            Self::Config(_) => FaultKind::Config,
        }
    }

    /// Create a storage error.
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    /// Create a responder error.
    pub fn responder(message: impl Into<String>) -> Self {
        Self::Responder(message.into())
    }
}
