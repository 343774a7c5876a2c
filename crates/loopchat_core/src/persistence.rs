//! Conversation persistence layer.
//!
//! Maps the conversation model onto the three store slots. Every save
//! rewrites the whole slot; there is no incremental format.

use std::sync::Arc;

use tracing::{info, warn};

use crate::error::{ChatError, ChatResult};
use crate::store::{self, KeyValueStore, CHATS_SLOT, CONVERSATIONS_SLOT, SELECTED_INDEX_SLOT};
use crate::types::{Conversation, ConversationMeta, ConversationSet};

/// Persistence manager for conversations
#[derive(Clone)]
pub struct ConversationPersistence {
    store: Arc<dyn KeyValueStore>,
}

impl ConversationPersistence {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    /// Stored conversations, or `None` when absent or malformed
    pub fn load_conversations(&self) -> Option<Vec<Conversation>> {
        store::load(self.store.as_ref(), CHATS_SLOT)
    }

    pub fn save_conversations(&self, set: &ConversationSet) -> ChatResult<()> {
        store::save(self.store.as_ref(), CHATS_SLOT, set.conversations())
    }

    pub fn load_selected_index(&self) -> Option<usize> {
        store::load(self.store.as_ref(), SELECTED_INDEX_SLOT)
    }

    pub fn save_selected_index(&self, set: &ConversationSet) -> ChatResult<()> {
        store::save(self.store.as_ref(), SELECTED_INDEX_SLOT, &set.selected_index())
    }

    pub fn load_metadata(&self) -> Vec<ConversationMeta> {
        store::load(self.store.as_ref(), CONVERSATIONS_SLOT).unwrap_or_default()
    }

    pub fn save_metadata(&self, metadata: &[ConversationMeta]) -> ChatResult<()> {
        store::save(self.store.as_ref(), CONVERSATIONS_SLOT, metadata)
    }

    /// Write every slot
    pub fn save_all(&self, set: &ConversationSet, metadata: &[ConversationMeta]) -> ChatResult<()> {
        self.save_conversations(set)?;
        self.save_selected_index(set)?;
        self.save_metadata(metadata)
    }

    /// Load the conversation set, seeding it with `greeting` when the store
    /// holds nothing usable.
    ///
    /// The seed is written back straight away. A failure to write it is
    /// returned alongside the set so the caller can report it; the set is
    /// usable either way.
    pub fn load_or_seed(&self, greeting: &str) -> (ConversationSet, Option<ChatError>) {
        let stored = self.load_conversations().filter(|c| !c.is_empty());

        let Some(conversations) = stored else {
            info!("No stored conversations, seeding greeting");
            let set = ConversationSet::seeded(greeting);
            let fault = self.save_conversations(&set).err();
            return (set, fault);
        };

        let count = conversations.len();
        let requested = self.load_selected_index().unwrap_or(0);
        if requested >= count {
            warn!(
                selected = requested,
                conversations = count,
                "Stored selection out of range, falling back to first conversation"
            );
        }

        (ConversationSet::from_parts(conversations, requested), None)
    }
}
