/// Save persistence: a small key-value storage capability plus the
/// autosave/slot layout built on top of it.

use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use thiserror::Error;
use tracing::warn;

use crate::schema::state::{GameState, SaveData};

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("slot {index} out of range (0..{slot_count})")]
    SlotOutOfRange { index: usize, slot_count: usize },
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// String key-value storage. Implementations decide the medium.
pub trait SaveStorage {
    /// Read the value under `key`, `None` if absent.
    fn read(&self, key: &str) -> Result<Option<String>, PersistenceError>;

    /// Store `value` under `key`, replacing any previous value.
    fn write(&self, key: &str, value: &str) -> Result<(), PersistenceError>;

    /// Remove `key`. Removing an absent key succeeds.
    fn remove(&self, key: &str) -> Result<(), PersistenceError>;
}

/// In-memory storage. Clones share the same underlying map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: Rc<RefCell<FxHashMap<String, String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.borrow().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl SaveStorage for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), PersistenceError> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}

/// One `<key>.json` file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// The directory is created lazily on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl SaveStorage for FileStorage {
    fn read(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(error) => Err(error.into()),
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        write_text_atomic(&self.path_for(key), value)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), PersistenceError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(error) => Err(error.into()),
        }
    }
}

fn write_text_atomic(path: &Path, text: &str) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, text)?;
    if let Err(error) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(error);
    }
    Ok(())
}

/// Source of save timestamps.
pub trait Clock {
    /// Milliseconds since the Unix epoch.
    fn now_millis(&self) -> i64;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Always reports the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub i64);

impl Clock for FixedClock {
    fn now_millis(&self) -> i64 {
        self.0
    }
}

/// Autosave plus a fixed number of explicit slots over one storage.
#[derive(Debug, Clone)]
pub struct SaveManager<S> {
    storage: S,
    key_prefix: String,
    slot_count: usize,
    version: String,
}

impl<S: SaveStorage> SaveManager<S> {
    pub fn new(
        storage: S,
        key_prefix: impl Into<String>,
        slot_count: usize,
        version: impl Into<String>,
    ) -> Self {
        Self {
            storage,
            key_prefix: key_prefix.into(),
            slot_count,
            version: version.into(),
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn slot_count(&self) -> usize {
        self.slot_count
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn autosave_key(&self) -> String {
        format!("{}_autosave", self.key_prefix)
    }

    pub fn slot_key(&self, index: usize) -> Result<String, PersistenceError> {
        if index >= self.slot_count {
            return Err(PersistenceError::SlotOutOfRange {
                index,
                slot_count: self.slot_count,
            });
        }
        Ok(format!("{}_slot_{}", self.key_prefix, index))
    }

    /// Wrap `state` in a record tagged with this manager's version.
    pub fn snapshot(&self, state: &GameState, timestamp: i64) -> SaveData {
        SaveData {
            state: state.clone(),
            timestamp,
            version: self.version.clone(),
        }
    }

    pub fn write_autosave(&self, state: &GameState, timestamp: i64) -> Result<(), PersistenceError> {
        self.write_record(&self.autosave_key(), &self.snapshot(state, timestamp))
    }

    pub fn read_autosave(&self) -> Result<Option<SaveData>, PersistenceError> {
        self.read_record(&self.autosave_key())
    }

    pub fn delete_autosave(&self) -> Result<(), PersistenceError> {
        self.storage.remove(&self.autosave_key())
    }

    /// Whether an autosave record exists. Storage errors read as "no".
    pub fn has_autosave(&self) -> bool {
        match self.storage.read(&self.autosave_key()) {
            Ok(found) => found.is_some(),
            Err(error) => {
                warn!(error = %error, "autosave_probe_failed");
                false
            }
        }
    }

    pub fn write_slot(
        &self,
        index: usize,
        state: &GameState,
        timestamp: i64,
    ) -> Result<(), PersistenceError> {
        let key = self.slot_key(index)?;
        self.write_record(&key, &self.snapshot(state, timestamp))
    }

    pub fn read_slot(&self, index: usize) -> Result<Option<SaveData>, PersistenceError> {
        let key = self.slot_key(index)?;
        self.read_record(&key)
    }

    pub fn delete_slot(&self, index: usize) -> Result<(), PersistenceError> {
        let key = self.slot_key(index)?;
        self.storage.remove(&key)
    }

    fn write_record(&self, key: &str, data: &SaveData) -> Result<(), PersistenceError> {
        let json = serde_json::to_string(data)?;
        self.storage.write(key, &json)
    }

    /// Parse a stored record. A version mismatch is only a warning.
    fn read_record(&self, key: &str) -> Result<Option<SaveData>, PersistenceError> {
        let Some(raw) = self.storage.read(key)? else {
            return Ok(None);
        };
        let data: SaveData = serde_json::from_str(&raw)?;
        if data.version != self.version {
            warn!(
                key,
                found = %data.version,
                expected = %self.version,
                "save_version_mismatch"
            );
        }
        Ok(Some(data))
    }
}
