//! Durable key/value slots.
//!
//! A store is the stand-in for browser-origin local storage: a flat
//! namespace of named slots, each holding one serialized value that is
//! always overwritten whole.
//!
//! On disk a [`FileStore`] keeps one file per slot:
//! ```text
//! <store dir>/
//! ├── chats.json              # conversations (array of turn arrays)
//! ├── selectedChatIndex.json  # selected conversation index
//! └── conversations.json      # per-conversation metadata
//! ```

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{ChatError, ChatResult};

/// Slot holding every conversation's turns
pub const CHATS_SLOT: &str = "chats";
/// Slot holding the selected conversation index
pub const SELECTED_INDEX_SLOT: &str = "selectedChatIndex";
/// Slot holding per-conversation metadata
pub const CONVERSATIONS_SLOT: &str = "conversations";

/// Raw slot storage.
pub trait KeyValueStore: Send + Sync {
    /// Read a slot; `Ok(None)` if it was never written.
    fn read(&self, key: &str) -> ChatResult<Option<String>>;

    /// Overwrite a slot with `value`.
    fn write(&self, key: &str, value: &str) -> ChatResult<()>;
}

/// Load and deserialize a slot.
///
/// Missing, unreadable and malformed slots all come back as `None`.
pub fn load<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Option<T> {
    let raw = match store.read(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            warn!(slot = key, error = %e, "Failed to read slot, treating as absent");
            return None;
        }
    };

    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(slot = key, error = %e, "Malformed slot content, treating as absent");
            None
        }
    }
}

/// Serialize and write a slot.
pub fn save<T: Serialize + ?Sized>(store: &dyn KeyValueStore, key: &str, value: &T) -> ChatResult<()> {
    let json = serde_json::to_string(value)?;
    store.write(key, &json)?;
    debug!(slot = key, bytes = json.len(), "Slot saved");
    Ok(())
}

fn check_capacity(key: &str, used_elsewhere: usize, value: &str, limit: Option<usize>) -> ChatResult<()> {
    if let Some(limit) = limit {
        let size = used_elsewhere + value.len();
        if size > limit {
            return Err(ChatError::CapacityExceeded {
                key: key.to_string(),
                size,
                limit,
            });
        }
    }
    Ok(())
}

/// Directory-backed store, one `<key>.json` file per slot
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
    capacity_bytes: Option<usize>,
}

impl FileStore {
    /// Create a store rooted at `root`. The directory is created lazily.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            capacity_bytes: None,
        }
    }

    /// Limit the total size of all slots
    pub fn with_capacity(mut self, bytes: usize) -> Self {
        self.capacity_bytes = Some(bytes);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn slot_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.json", key))
    }

    /// Bytes used by every slot except `key`
    fn used_bytes_excluding(&self, key: &str) -> ChatResult<usize> {
        if !self.root.exists() {
            return Ok(0);
        }

        let own = self.slot_path(key);
        let mut total = 0;
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path != own && path.extension().map_or(false, |e| e == "json") {
                total += fs::metadata(&path)?.len() as usize;
            }
        }
        Ok(total)
    }
}

impl KeyValueStore for FileStore {
    fn read(&self, key: &str) -> ChatResult<Option<String>> {
        let path = self.slot_path(key);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(path)?))
    }

    fn write(&self, key: &str, value: &str) -> ChatResult<()> {
        if self.capacity_bytes.is_some() {
            let used = self.used_bytes_excluding(key)?;
            check_capacity(key, used, value, self.capacity_bytes)?;
        }

        fs::create_dir_all(&self.root)?;

        // Write beside the target and rename so readers never see half a slot
        let mut tmp = tempfile::NamedTempFile::new_in(&self.root)?;
        tmp.write_all(value.as_bytes())?;
        tmp.persist(self.slot_path(key))
            .map_err(|e| ChatError::Io(e.error))?;
        Ok(())
    }
}

/// In-process store, shared between clones.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    slots: Arc<RwLock<HashMap<String, String>>>,
    capacity_bytes: Option<usize>,
    writes: Arc<AtomicUsize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Limit the total size of all slots
    pub fn with_capacity(mut self, bytes: usize) -> Self {
        self.capacity_bytes = Some(bytes);
        self
    }

    /// Put raw content into a slot without counting it as a write.
    pub fn seed(&self, key: &str, value: impl Into<String>) {
        self.slots.write().insert(key.to_string(), value.into());
    }

    /// Raw slot content
    pub fn raw(&self, key: &str) -> Option<String> {
        self.slots.read().get(key).cloned()
    }

    /// Number of successful writes so far
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl KeyValueStore for MemoryStore {
    fn read(&self, key: &str) -> ChatResult<Option<String>> {
        Ok(self.raw(key))
    }

    fn write(&self, key: &str, value: &str) -> ChatResult<()> {
        let mut slots = self.slots.write();
        let used: usize = slots
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(_, v)| v.len())
            .sum();
        check_capacity(key, used, value, self.capacity_bytes)?;

        slots.insert(key.to_string(), value.to_string());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
