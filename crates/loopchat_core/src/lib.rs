//! # loopchat_core - Conversation core for the loopchat widget
//!
//! This crate provides everything behind the chat bubble:
//! - Conversation model (turns, quick replies, conversation set)
//! - Durable key/value slots for history and selection
//! - A client for the remote bot endpoint
//! - The controller that ties them together
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌──────────────────┐     ┌─────────────────┐
//! │  Presentation   │────▶│  ChatController  │────▶│  BotResponder   │──▶ POST <endpoint>
//! └─────────────────┘     └────────┬─────────┘     └─────────────────┘
//!                                  │
//!                    ┌─────────────┴─────────────┐
//!                    ▼                           ▼
//!          ┌──────────────────┐        ┌──────────────────┐
//!          │ ConversationSet  │        │  KeyValueStore   │
//!          └──────────────────┘        └──────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use loopchat_core::{ChatController, FileStore, WidgetConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = Arc::new(FileStore::new(".loopchat"));
//!     let controller = ChatController::with_http(WidgetConfig::from_build_env(), store);
//!
//!     controller.toggle();
//!     controller.submit_user_message("What are your opening hours?").await;
//!
//!     for turn in controller.active_transcript() {
//!         println!("{}", turn.text());
//!     }
//! }
//! ```

pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod mock;
pub mod persistence;
pub mod responder;
pub mod store;
pub mod types;

pub use config::{WidgetConfig, DEFAULT_CONVERSATION_ID, FALLBACK_ENDPOINT};
pub use controller::ChatController;
pub use error::{ChatError, ChatResult, FaultKind};
pub use events::{ChatEvent, ChatFault, EventBus};
pub use mock::{CapturedSend, MockResponder, MockResponse};
pub use persistence::ConversationPersistence;
pub use responder::{parse_reply, BotResponder, HttpResponder, ResponderPayload, ResponderRequest};
pub use store::{FileStore, KeyValueStore, MemoryStore, CHATS_SLOT, CONVERSATIONS_SLOT, SELECTED_INDEX_SLOT};
pub use types::{
    BotReply, Conversation, ConversationMeta, ConversationSet, QuickReply, Turn, Visibility,
    DEFAULT_GREETING, NO_RESPONSE_TEXT,
};
