//! Conversation controller.
//!
//! Owns the conversation set and mediates between the presentation layer,
//! the store and the remote responder:
//!
//! ```text
//! submit_user_message ─▶ append user turn ─▶ persist ─▶ send ─▶ append bot turn ─▶ persist
//! submit_button_payload ──────────────────────────────▶ send ─▶ append bot turn ─▶ persist
//! ```
//!
//! Nothing returned from `submit_*` or `toggle` can fail. Faults are logged
//! and published on the event bus, and the transcript simply does not grow.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::config::WidgetConfig;
use crate::error::{ChatError, ChatResult, FaultKind};
use crate::events::{ChatEvent, ChatFault, EventBus};
use crate::persistence::ConversationPersistence;
use crate::responder::{BotResponder, HttpResponder};
use crate::store::KeyValueStore;
use crate::types::{Conversation, ConversationMeta, ConversationSet, Turn, Visibility};

struct ModelState {
    set: ConversationSet,
    metadata: Vec<ConversationMeta>,
}

impl ModelState {
    /// Keep one metadata entry per conversation
    fn align_metadata(&mut self, first_id: i64) {
        self.metadata.truncate(self.set.len());
        while self.metadata.len() < self.set.len() {
            let id = self.next_conversation_id(first_id);
            self.metadata.push(ConversationMeta { conversation_id: id });
        }
    }

    fn next_conversation_id(&self, first_id: i64) -> i64 {
        self.metadata
            .iter()
            .map(|m| m.conversation_id + 1)
            .max()
            .unwrap_or(first_id)
    }
}

/// Main conversation controller
pub struct ChatController {
    config: WidgetConfig,
    persistence: ConversationPersistence,
    responder: Arc<dyn BotResponder>,
    state: Mutex<ModelState>,
    visibility: Mutex<Visibility>,
    events: EventBus,
}

impl ChatController {
    /// Create a controller, loading the conversation set from `store` or
    /// seeding it with the configured greeting.
    pub fn new(
        config: WidgetConfig,
        store: Arc<dyn KeyValueStore>,
        responder: Arc<dyn BotResponder>,
    ) -> Self {
        let persistence = ConversationPersistence::new(store);
        let events = EventBus::new();

        let (set, seed_fault) = persistence.load_or_seed(&config.greeting);
        let mut state = ModelState {
            set,
            metadata: persistence.load_metadata(),
        };
        state.align_metadata(config.conversation_id);

        info!(
            conversations = state.set.len(),
            selected = state.set.selected_index(),
            "Chat controller ready"
        );

        let controller = Self {
            config,
            persistence,
            responder,
            state: Mutex::new(state),
            visibility: Mutex::new(Visibility::Closed),
            events,
        };

        if let Some(fault) = seed_fault {
            controller.report(&fault);
        }

        controller
    }

    /// Create a controller talking to the configured HTTP endpoint
    pub fn with_http(config: WidgetConfig, store: Arc<dyn KeyValueStore>) -> Self {
        let responder = Arc::new(HttpResponder::from_config(&config));
        Self::new(config, store, responder)
    }

    pub fn config(&self) -> &WidgetConfig {
        &self.config
    }

    /// Receive controller events (turns, selection, visibility, faults)
    pub fn subscribe(&self) -> broadcast::Receiver<ChatEvent> {
        self.events.subscribe()
    }

    // =========================================================================
    // Visibility
    // =========================================================================

    pub fn visibility(&self) -> Visibility {
        *self.visibility.lock()
    }

    pub fn is_open(&self) -> bool {
        self.visibility().is_open()
    }

    /// Flip the chat window between closed and open
    pub fn toggle(&self) -> Visibility {
        let visibility = {
            let mut current = self.visibility.lock();
            *current = current.toggled();
            *current
        };

        debug!(?visibility, "Chat window toggled");
        self.events.publish(ChatEvent::VisibilityChanged { visibility });
        visibility
    }

    // =========================================================================
    // Message exchange
    // =========================================================================

    /// Record a user message and ask the responder for a reply.
    ///
    /// Blank text is ignored. The user turn is persisted before the request
    /// goes out; the reply lands in the conversation that was active when
    /// the message was sent.
    pub async fn submit_user_message(&self, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            self.report(&ChatError::Validation("empty message".to_string()));
            return;
        }

        let index = {
            let mut state = self.state.lock();
            let index = state.set.selected_index();
            self.append_and_persist(&mut state, index, Turn::user(text));
            index
        };

        self.request_reply(text, index).await;
    }

    /// Send a quick-reply payload without echoing it as a user turn
    pub async fn submit_button_payload(&self, payload: &str) {
        if payload.trim().is_empty() {
            self.report(&ChatError::Validation("empty payload".to_string()));
            return;
        }

        let index = self.active_index();
        self.request_reply(payload, index).await;
    }

    async fn request_reply(&self, utterance: &str, index: usize) {
        match self.responder.send(utterance, self.config.conversation_id).await {
            Ok(reply) => {
                let mut state = self.state.lock();
                self.append_and_persist(&mut state, index, reply.into());
            }
            Err(e) => self.report(&e),
        }
    }

    /// Runs under the model lock; the store write is synchronous and short.
    fn append_and_persist(&self, state: &mut ModelState, index: usize, turn: Turn) {
        if let Err(e) = state.set.append(index, turn.clone()) {
            self.report(&e);
            return;
        }

        if let Err(e) = self.persistence.save_conversations(&state.set) {
            self.report(&e);
        }

        self.events.publish(ChatEvent::TurnAppended {
            conversation: index,
            turn,
        });
    }

    // =========================================================================
    // Conversation management
    // =========================================================================

    /// Start an empty conversation and select it
    pub fn new_conversation(&self) -> usize {
        let mut state = self.state.lock();
        let id = state.next_conversation_id(self.config.conversation_id);
        let index = state.set.push_new();
        state.metadata.push(ConversationMeta { conversation_id: id });

        self.persist_all(&state);
        info!(conversation = index, conversation_id = id, "Started new conversation");
        self.events.publish(ChatEvent::ConversationSelected { conversation: index });
        index
    }

    pub fn select_conversation(&self, index: usize) -> ChatResult<()> {
        let mut state = self.state.lock();
        state.set.select(index)?;

        if let Err(e) = self.persistence.save_selected_index(&state.set) {
            self.report(&e);
        }
        self.events.publish(ChatEvent::ConversationSelected { conversation: index });
        Ok(())
    }

    /// Remove a conversation. Removing the last one leaves an empty one.
    pub fn delete_conversation(&self, index: usize) -> ChatResult<()> {
        let mut state = self.state.lock();
        state.set.remove(index)?;
        if index < state.metadata.len() {
            state.metadata.remove(index);
        }
        state.align_metadata(self.config.conversation_id);

        self.persist_all(&state);
        info!(conversation = index, "Deleted conversation");
        self.events.publish(ChatEvent::ConversationSelected {
            conversation: state.set.selected_index(),
        });
        Ok(())
    }

    fn persist_all(&self, state: &ModelState) {
        if let Err(e) = self.persistence.save_all(&state.set, &state.metadata) {
            self.report(&e);
        }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub fn active_index(&self) -> usize {
        self.state.lock().set.selected_index()
    }

    /// Turns of the selected conversation
    pub fn active_transcript(&self) -> Vec<Turn> {
        self.state.lock().set.active().turns().to_vec()
    }

    pub fn conversation(&self, index: usize) -> Option<Conversation> {
        self.state.lock().set.get(index).cloned()
    }

    pub fn conversations(&self) -> Vec<Conversation> {
        self.state.lock().set.conversations().to_vec()
    }

    pub fn conversation_count(&self) -> usize {
        self.state.lock().set.len()
    }

    pub fn metadata(&self) -> Vec<ConversationMeta> {
        self.state.lock().metadata.clone()
    }

    // =========================================================================
    // Faults
    // =========================================================================

    fn report(&self, err: &ChatError) {
        match err.kind() {
            FaultKind::Validation => debug!(error = %err, "Ignoring submission"),
            kind => warn!(?kind, error = %err, "Chat fault swallowed"),
        }
        self.events.publish(ChatEvent::Fault(ChatFault::from(err)));
    }
}
