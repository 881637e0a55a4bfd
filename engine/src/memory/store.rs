//! Persistent per-user conversation memory
//!
//! Every user gets a rolling summary plus the few most recent turns. The
//! whole mapping lives in one JSON file that is read once at startup and
//! rewritten in full after each mutation.

use sdk::errors::BotError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

use crate::llm::{Content, Role};

/// Mapping from user id to that user's memory
pub type MemoryMap = BTreeMap<String, UserMemory>;

/// One remembered message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            text: text.into(),
        }
    }

    pub fn to_content(&self) -> Content {
        Content::text(self.role, self.text.clone())
    }
}

/// Conversation state kept for a single user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserMemory {
    /// Rolling digest of compacted turns
    #[serde(default)]
    pub summary: String,

    /// Most recent turns, oldest first
    #[serde(default)]
    pub turns: Vec<Turn>,

    /// Last modification, Unix epoch milliseconds
    #[serde(default)]
    pub updated_at: i64,
}

impl UserMemory {
    pub fn new() -> Self {
        Self {
            summary: String::new(),
            turns: Vec::new(),
            updated_at: now_millis(),
        }
    }

    /// Bump `updated_at` to now
    pub fn touch(&mut self) {
        self.updated_at = now_millis();
    }

    /// Retained turns as prompt history
    pub fn history(&self) -> Vec<Content> {
        self.turns.iter().map(Turn::to_content).collect()
    }
}

impl Default for UserMemory {
    fn default() -> Self {
        Self::new()
    }
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Owner of every user's memory and of the backing file
#[derive(Debug)]
pub struct MemoryStore {
    path: PathBuf,
    users: Mutex<MemoryMap>,
}

impl MemoryStore {
    /// Load the store from `path`
    ///
    /// A missing, unreadable or corrupt file yields an empty store; startup
    /// never fails because of memory state.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let users = match read_map(&path) {
            Ok(Some(map)) => {
                info!("Loaded memory for {} users from {:?}", map.len(), path);
                map
            }
            Ok(None) => {
                debug!("No memory file at {:?}, starting empty", path);
                MemoryMap::new()
            }
            Err(e) => {
                warn!("Ignoring unreadable memory file {:?}: {}", path, e);
                MemoryMap::new()
            }
        };

        Self {
            path,
            users: Mutex::new(users),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Snapshot of a user's memory, creating an empty record on first access
    pub fn get_or_create(&self, user_id: &str) -> UserMemory {
        self.lock()
            .entry(user_id.to_string())
            .or_default()
            .clone()
    }

    /// Snapshot of a user's memory without creating it
    pub fn get(&self, user_id: &str) -> Option<UserMemory> {
        self.lock().get(user_id).cloned()
    }

    /// Mutate a user's memory, then persist the whole store
    ///
    /// The mutation stays applied in memory even if the write fails, so the
    /// next successful persist still records it.
    pub fn update<R>(
        &self,
        user_id: &str,
        f: impl FnOnce(&mut UserMemory) -> R,
    ) -> Result<R, BotError> {
        let mut users = self.lock();
        let result = f(users.entry(user_id.to_string()).or_default());
        self.write(&users)?;
        Ok(result)
    }

    /// Overwrite the backing file with the full current state
    pub fn persist(&self) -> Result<(), BotError> {
        let users = self.lock();
        self.write(&users)
    }

    /// Copy of the whole mapping
    pub fn snapshot(&self) -> MemoryMap {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryMap> {
        self.users.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Write through a sibling temp file so a crash never leaves half a file
    fn write(&self, users: &MemoryMap) -> Result<(), BotError> {
        let json = serde_json::to_string_pretty(users)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                BotError::Storage(format!("Failed to create memory directory: {}", e))
            })?;
        }

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, json)
            .map_err(|e| BotError::Storage(format!("Failed to write memory file: {}", e)))?;
        fs::rename(&tmp, &self.path)
            .map_err(|e| BotError::Storage(format!("Failed to replace memory file: {}", e)))?;

        debug!("Persisted memory for {} users", users.len());
        Ok(())
    }
}

fn read_map(path: &Path) -> Result<Option<MemoryMap>, BotError> {
    if !path.exists() {
        return Ok(None);
    }
    let contents = fs::read_to_string(path)?;
    Ok(Some(serde_json::from_str(&contents)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_get_or_create_starts_empty() {
        let dir = TempDir::new().unwrap();
        let store = MemoryStore::load(dir.path().join("memory.json"));

        let memory = store.get_or_create("42");
        assert_eq!(memory.summary, "");
        assert!(memory.turns.is_empty());
        assert!(memory.updated_at > 0);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_get_or_create_does_not_persist() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("memory.json");
        let store = MemoryStore::load(&path);

        store.get_or_create("42");
        assert!(!path.exists());
    }

    #[test]
    fn test_update_persists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("memory.json");
        let store = MemoryStore::load(&path);

        let count = store
            .update("42", |m| {
                m.turns.push(Turn::user("hi"));
                m.turns.len()
            })
            .unwrap();
        assert_eq!(count, 1);

        let raw = fs::read_to_string(&path).unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json["42"]["turns"][0]["role"], "user");
        assert_eq!(json["42"]["turns"][0]["text"], "hi");
        assert!(json["42"]["updatedAt"].is_i64());
    }

    #[test]
    fn test_corrupt_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("memory.json");
        fs::write(&path, "{ not json").unwrap();

        let store = MemoryStore::load(&path);
        assert!(store.is_empty());
    }

    #[test]
    fn test_reads_original_file_format() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("memory.json");
        fs::write(
            &path,
            r#"{"7": {"summary": "likes rust", "turns": [{"role": "model", "text": "ok"}], "updatedAt": 1700000000000}}"#,
        )
        .unwrap();

        let store = MemoryStore::load(&path);
        let memory = store.get("7").unwrap();
        assert_eq!(memory.summary, "likes rust");
        assert_eq!(memory.turns, vec![Turn::model("ok")]);
        assert_eq!(memory.updated_at, 1_700_000_000_000);
    }

    #[test]
    fn test_persist_creates_parent_directory() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("memory.json");
        let store = MemoryStore::load(&path);
        store.get_or_create("1");
        store.persist().unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_history_maps_roles() {
        let mut memory = UserMemory::new();
        memory.turns = vec![Turn::user("q"), Turn::model("a")];
        let history = memory.history();
        assert_eq!(history[0].role, Role::User);
        assert_eq!(history[1].role, Role::Model);
        assert_eq!(history[1].parts[0].as_text(), Some("a"));
    }
}
