//! Follow-up and update reminders
//!
//! A small list of user-written notes, kept under a namespaced key in a
//! key-value store. The store has one writer; concurrent writers simply
//! overwrite each other.

use log::warn;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, create_dir_all};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use crate::error::StoreError;

/// Change to a stored value, computed from its current contents.
///
/// Returns the new value, or `None` to leave the key untouched.
pub type Update<'f> = &'f mut dyn FnMut(Option<String>) -> Result<Option<String>, StoreError>;

/// String key-value persistence.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;

    /// Read, change and write one key under a single write lock.
    fn update(&self, key: &str, change: Update<'_>) -> Result<(), StoreError>;
}

/// In-process store, lost on exit.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.remove(key);
        Ok(())
    }

    fn update(&self, key: &str, change: Update<'_>) -> Result<(), StoreError> {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        if let Some(value) = change(entries.get(key).cloned())? {
            entries.insert(key.to_string(), value);
        }
        Ok(())
    }
}

/// Store backed by one JSON object file, rewritten whole on every change.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    lock: RwLock<()>,
}

impl FileStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        FileStore {
            path: path.as_ref().to_path_buf(),
            lock: RwLock::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    // Missing or unreadable files read as empty
    fn read_all(&self) -> HashMap<String, String> {
        let Ok(contents) = fs::read_to_string(&self.path) else {
            return HashMap::new();
        };
        match serde_json::from_str(&contents) {
            Ok(map) => map,
            Err(e) => {
                warn!("Ignoring unreadable store {}: {}", self.path.display(), e);
                HashMap::new()
            }
        }
    }

    fn write_all(&self, entries: &HashMap<String, String>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(entries)?;
        fs::write(&self.path, json)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        let _guard = self.lock.read().unwrap_or_else(|e| e.into_inner());
        self.read_all().remove(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let _guard = self.lock.write().unwrap_or_else(|e| e.into_inner());
        let mut entries = self.read_all();
        entries.insert(key.to_string(), value.to_string());
        self.write_all(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let _guard = self.lock.write().unwrap_or_else(|e| e.into_inner());
        let mut entries = self.read_all();
        if entries.remove(key).is_some() {
            self.write_all(&entries)?;
        }
        Ok(())
    }

    fn update(&self, key: &str, change: Update<'_>) -> Result<(), StoreError> {
        let _guard = self.lock.write().unwrap_or_else(|e| e.into_inner());
        let mut entries = self.read_all();
        if let Some(value) = change(entries.get(key).cloned())? {
            entries.insert(key.to_string(), value);
            self.write_all(&entries)?;
        }
        Ok(())
    }
}

/// The two reminder lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReminderKind {
    FollowUps,
    Updates,
}

impl ReminderKind {
    pub fn storage_key(self) -> &'static str {
        match self {
            ReminderKind::FollowUps => "claims_portal.follow_ups",
            ReminderKind::Updates => "claims_portal.updates",
        }
    }

    /// Parse a URL or CLI segment: `follow-ups` or `updates`.
    pub fn from_segment(segment: &str) -> Option<Self> {
        match segment.to_lowercase().as_str() {
            "follow-ups" | "followups" | "follow_ups" => Some(ReminderKind::FollowUps),
            "updates" => Some(ReminderKind::Updates),
            _ => None,
        }
    }
}

/// A user-authored note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderItem {
    pub id: String,
    pub description: String,

    /// Epoch milliseconds
    pub created_at: i64,
}

const ID_SUFFIX_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

impl ReminderItem {
    /// New item stamped with the current time and a unique id.
    pub fn new(description: impl Into<String>) -> Self {
        let created_at = chrono::Utc::now().timestamp_millis();
        ReminderItem {
            id: generate_id(created_at),
            description: description.into(),
            created_at,
        }
    }
}

/// `<millis>-<9 random base-36 chars>`
pub fn generate_id(created_at: i64) -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..9)
        .map(|_| {
            let idx = rng.gen_range(0..ID_SUFFIX_CHARSET.len());
            ID_SUFFIX_CHARSET[idx] as char
        })
        .collect();
    format!("{}-{}", created_at, suffix)
}

/// Display order: newest first. Ties keep their stored order.
pub fn newest_first(mut items: Vec<ReminderItem>) -> Vec<ReminderItem> {
    items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    items
}

/// One reminder list over a key-value store.
pub struct ReminderStore<'a> {
    storage: &'a dyn KeyValueStore,
    kind: ReminderKind,
}

impl<'a> ReminderStore<'a> {
    pub fn new(storage: &'a dyn KeyValueStore, kind: ReminderKind) -> Self {
        ReminderStore { storage, kind }
    }

    /// Read the list.
    ///
    /// # Returns
    /// * `Vec<ReminderItem>` - Stored items in stored order; empty when the key
    ///   is missing or holds malformed JSON
    pub fn load(&self) -> Vec<ReminderItem> {
        self.parse(self.storage.get(self.kind.storage_key()))
    }

    fn parse(&self, raw: Option<String>) -> Vec<ReminderItem> {
        let Some(raw) = raw else {
            return Vec::new();
        };
        match serde_json::from_str(&raw) {
            Ok(items) => items,
            Err(e) => {
                warn!(
                    "Treating malformed {} as empty: {}",
                    self.kind.storage_key(),
                    e
                );
                Vec::new()
            }
        }
    }

    /// Overwrite the list.
    pub fn save(&self, items: &[ReminderItem]) -> Result<(), StoreError> {
        let json = serde_json::to_string(items)?;
        self.storage.set(self.kind.storage_key(), &json)
    }

    /// Append a new item and persist.
    ///
    /// The list is read and written under one store lock, so concurrent adds
    /// all land.
    pub fn add(&self, description: &str) -> Result<ReminderItem, StoreError> {
        let item = ReminderItem::new(description.trim());
        self.storage.update(self.kind.storage_key(), &mut |raw: Option<String>| {
            let mut items = self.parse(raw);
            items.push(item.clone());
            Ok(Some(serde_json::to_string(&items)?))
        })?;
        Ok(item)
    }

    /// Delete by id and persist.
    ///
    /// # Returns
    /// * `Result<bool, StoreError>` - Whether an item was removed
    pub fn remove(&self, id: &str) -> Result<bool, StoreError> {
        let mut removed = false;
        self.storage.update(self.kind.storage_key(), &mut |raw: Option<String>| {
            let mut items = self.parse(raw);
            let before = items.len();
            items.retain(|item| item.id != id);
            removed = items.len() != before;
            if !removed {
                return Ok(None);
            }
            Ok(Some(serde_json::to_string(&items)?))
        })?;
        Ok(removed)
    }
}
