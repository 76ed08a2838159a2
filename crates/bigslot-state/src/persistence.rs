//! Persistence adapter
//!
//! Only the permanent part of the progression record is saved: gems,
//! permanent upgrades and lifetime stats. Everything else belongs to the
//! run and starts fresh.
//!
//! Failure policy:
//! - Write failures are logged and returned as `Err`; game state is untouched.
//! - Missing, unreadable or corrupt records load as `None` with a warning,
//!   so the caller falls back to defaults.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use bigslot_core::{Amount, SlotError, SlotResult};

/// Storage key of the save record
pub const SAVE_KEY: &str = "bigslot_save";

// ═══════════════════════════════════════════════════════════════════════════════
// RECORD
// ═══════════════════════════════════════════════════════════════════════════════

/// Lifetime statistics, never decreasing across runs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LifetimeStats {
    /// Sum of every coin credit
    pub total_winnings: Amount,
    /// Runs started after the first
    pub total_runs: u32,
    /// Highest stage reached in any run
    pub longest_run: u32,
    /// Largest single credit
    pub biggest_win: Amount,
}

/// The persisted part of the progression record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaveRecord {
    pub gems: Amount,
    /// Permanent upgrade levels by id
    pub upgrades: BTreeMap<String, u32>,
    pub stats: LifetimeStats,
}

impl SaveRecord {
    pub fn to_json(&self) -> SlotResult<String> {
        serde_json::to_string(self).map_err(|e| SlotError::Serialization(e.to_string()))
    }

    /// Parse a stored record
    pub fn from_json(json: &str) -> SlotResult<Self> {
        serde_json::from_str(json).map_err(|e| SlotError::CorruptPersistedState(e.to_string()))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// STORES
// ═══════════════════════════════════════════════════════════════════════════════

/// Local key-value storage
pub trait KeyValueStore: Send + Sync {
    /// Stored value, `None` when the key is absent
    fn get(&self, key: &str) -> SlotResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> SlotResult<()>;
    /// Remove a key; false if it was absent
    fn remove(&self, key: &str) -> SlotResult<bool>;
}

/// In-memory store
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> SlotResult<Option<String>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> SlotResult<()> {
        self.entries.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> SlotResult<bool> {
        Ok(self.entries.write().remove(key).is_some())
    }
}

/// One JSON file per key inside a directory
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Store in the platform data directory
    pub fn open_default() -> Self {
        Self::new(Self::default_dir())
    }

    /// `<data_local_dir>/bigslot`, or `./bigslot` when there is none
    pub fn default_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("bigslot")
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File backing a key
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", sanitize_key(key)))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> SlotResult<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> SlotResult<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> SlotResult<bool> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

/// Make a key safe to use as a file name
fn sanitize_key(key: &str) -> String {
    let sanitized: String = key
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            _ => c,
        })
        .collect();

    let trimmed = sanitized.replace("..", "");
    let trimmed = trimmed.trim_matches(|c| c == '.' || c == ' ');
    if trimmed.is_empty() {
        "unnamed".to_string()
    } else {
        trimmed.to_string()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ADAPTER
// ═══════════════════════════════════════════════════════════════════════════════

/// Saves and loads the [`SaveRecord`] under a single key
#[derive(Clone)]
pub struct PersistenceAdapter {
    store: Arc<dyn KeyValueStore>,
    key: String,
}

impl PersistenceAdapter {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            key: SAVE_KEY.to_string(),
        }
    }

    /// Adapter over a fresh [`MemoryStore`]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// Adapter over a [`FileStore`] in `dir`
    pub fn in_dir<P: AsRef<Path>>(dir: P) -> Self {
        Self::new(Arc::new(FileStore::new(dir)))
    }

    /// Builder: store under a different key
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    /// Write the record; returns the serialized form
    pub fn save(&self, record: &SaveRecord) -> SlotResult<String> {
        let json = record.to_json()?;
        if let Err(e) = self.store.set(&self.key, &json) {
            log::warn!("Failed to save '{}': {}", self.key, e);
            return Err(e);
        }
        log::debug!("Saved '{}' ({} bytes)", self.key, json.len());
        Ok(json)
    }

    /// Read the record; `None` when missing or unusable
    pub fn load(&self) -> Option<SaveRecord> {
        let raw = match self.store.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                log::warn!("Failed to read '{}': {}", self.key, e);
                return None;
            }
        };

        match SaveRecord::from_json(&raw) {
            Ok(record) => Some(record),
            Err(e) => {
                log::warn!("Discarding save '{}': {}", self.key, e);
                None
            }
        }
    }

    /// Delete the record; false if there was none
    pub fn clear(&self) -> SlotResult<bool> {
        self.store.remove(&self.key)
    }
}

impl std::fmt::Debug for PersistenceAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistenceAdapter")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SaveRecord {
        SaveRecord {
            gems: 12,
            upgrades: BTreeMap::from([("unlock_wild".to_string(), 1)]),
            stats: LifetimeStats {
                total_winnings: 4_200,
                total_runs: 3,
                longest_run: 7,
                biggest_win: 500,
            },
        }
    }

    #[test]
    fn test_record_format() {
        let json: serde_json::Value = serde_json::from_str(&sample().to_json().unwrap()).unwrap();
        assert_eq!(json["gems"], 12);
        assert_eq!(json["upgrades"]["unlock_wild"], 1);
        assert_eq!(json["stats"]["totalWinnings"], 4_200);
        assert_eq!(json["stats"]["longestRun"], 7);
    }

    #[test]
    fn test_missing_fields_default() {
        let record = SaveRecord::from_json(r#"{"gems": 3, "stats": {"totalRuns": 2}}"#).unwrap();
        assert_eq!(record.gems, 3);
        assert!(record.upgrades.is_empty());
        assert_eq!(record.stats.total_runs, 2);
        assert_eq!(record.stats.biggest_win, 0);
    }

    #[test]
    fn test_memory_round_trip() {
        let adapter = PersistenceAdapter::in_memory();
        assert!(adapter.load().is_none());
        adapter.save(&sample()).unwrap();
        assert_eq!(adapter.load(), Some(sample()));
        assert!(adapter.clear().unwrap());
        assert!(!adapter.clear().unwrap());
        assert!(adapter.load().is_none());
    }

    #[test]
    fn test_corrupt_record_loads_as_none() {
        let store = Arc::new(MemoryStore::new());
        store.set(SAVE_KEY, "{ not json").unwrap();
        let adapter = PersistenceAdapter::new(store.clone());
        assert!(adapter.load().is_none());

        store.set(SAVE_KEY, r#"{"gems": -4}"#).unwrap();
        assert!(adapter.load().is_none());
    }

    #[test]
    fn test_file_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("saves"));
        assert_eq!(store.get("k").unwrap(), None);
        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap(), Some("v".to_string()));
        assert!(store.path_for("k").exists());
        assert!(store.remove("k").unwrap());
        assert!(!store.remove("k").unwrap());
    }

    #[test]
    fn test_sanitize_key() {
        assert_eq!(sanitize_key("bigslot_save"), "bigslot_save");
        assert_eq!(sanitize_key("../../etc/passwd"), "__etc_passwd");
        assert_eq!(sanitize_key("a:b"), "a_b");
        assert_eq!(sanitize_key(".."), "unnamed");
    }
}
