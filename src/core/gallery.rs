/// Gallery of unlockable CGs and endings, notified when an ending is reached.

use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::Path;
use std::rc::Rc;
use thiserror::Error;
use tracing::{info, warn};

use crate::core::persistence::{PersistenceError, SaveStorage};
use crate::schema::state::EndingInfo;

#[derive(Debug, Error)]
pub enum GalleryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

/// Receives a notification each time play reaches an end node.
///
/// Implementations must tolerate repeat notifications for the same ending.
pub trait EndingObserver {
    fn ending_reached(&mut self, ending: &EndingInfo);
}

impl<T: EndingObserver + ?Sized> EndingObserver for Rc<RefCell<T>> {
    fn ending_reached(&mut self, ending: &EndingInfo) {
        self.borrow_mut().ending_reached(ending);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CgCategory {
    Event,
    Ending,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CgItem {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: CgCategory,
    #[serde(default)]
    pub character: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndingEntry {
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub character: Option<String>,
}

/// Everything that can be collected, and which CG each ending unlocks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GalleryCatalog {
    #[serde(default)]
    pub cgs: Vec<CgItem>,
    #[serde(default)]
    pub endings: Vec<EndingEntry>,
    #[serde(default)]
    pub ending_cgs: HashMap<String, String>,
}

impl GalleryCatalog {
    pub fn load_from_ron(path: &Path) -> Result<GalleryCatalog, GalleryError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    pub fn parse_ron(input: &str) -> Result<GalleryCatalog, GalleryError> {
        Ok(ron::from_str(input)?)
    }

    pub fn cg_for_ending(&self, ending_id: &str) -> Option<&str> {
        self.ending_cgs.get(ending_id).map(String::as_str)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndingProgress {
    pub unlocked: usize,
    pub total: usize,
}

/// Unlock state for one catalogue, persisted as two JSON id lists.
pub struct Gallery<S> {
    catalog: GalleryCatalog,
    storage: S,
    cg_key: String,
    endings_key: String,
    unlocked_cgs: Vec<String>,
    unlocked_endings: Vec<String>,
}

impl<S: SaveStorage> Gallery<S> {
    /// Open a gallery, reading previously unlocked ids from `storage`.
    /// Unreadable records are logged and treated as empty.
    pub fn open(
        catalog: GalleryCatalog,
        storage: S,
        cg_key: impl Into<String>,
        endings_key: impl Into<String>,
    ) -> Self {
        let cg_key = cg_key.into();
        let endings_key = endings_key.into();
        let unlocked_cgs = read_id_list(&storage, &cg_key);
        let unlocked_endings = read_id_list(&storage, &endings_key);
        Self {
            catalog,
            storage,
            cg_key,
            endings_key,
            unlocked_cgs,
            unlocked_endings,
        }
    }

    pub fn catalog(&self) -> &GalleryCatalog {
        &self.catalog
    }

    /// Returns `true` if the CG was newly unlocked.
    pub fn unlock_cg(&mut self, cg_id: &str) -> bool {
        if self.is_unlocked(cg_id) {
            return false;
        }
        self.unlocked_cgs.push(cg_id.to_string());
        write_id_list(&self.storage, &self.cg_key, &self.unlocked_cgs);
        true
    }

    /// Returns `true` if the ending was newly unlocked.
    pub fn unlock_ending(&mut self, ending_id: &str) -> bool {
        if self.is_ending_unlocked(ending_id) {
            return false;
        }
        self.unlocked_endings.push(ending_id.to_string());
        write_id_list(&self.storage, &self.endings_key, &self.unlocked_endings);
        true
    }

    pub fn is_unlocked(&self, cg_id: &str) -> bool {
        self.unlocked_cgs.iter().any(|id| id == cg_id)
    }

    pub fn is_ending_unlocked(&self, ending_id: &str) -> bool {
        self.unlocked_endings.iter().any(|id| id == ending_id)
    }

    pub fn unlocked_cgs(&self) -> &[String] {
        &self.unlocked_cgs
    }

    pub fn unlocked_count(&self) -> usize {
        self.unlocked_cgs.len()
    }

    pub fn total_count(&self) -> usize {
        self.catalog.cgs.len()
    }

    /// Unlocked CGs as a rounded percentage of the catalogue.
    pub fn progress(&self) -> u32 {
        let total = self.total_count();
        if total == 0 {
            return 0;
        }
        ((self.unlocked_count() as f64 / total as f64) * 100.0).round() as u32
    }

    pub fn ending_progress(&self) -> EndingProgress {
        EndingProgress {
            unlocked: self.unlocked_endings.len(),
            total: self.catalog.endings.len(),
        }
    }

    /// Forget every unlock, in memory and in storage.
    pub fn reset(&mut self) {
        self.unlocked_cgs.clear();
        self.unlocked_endings.clear();
        for key in [&self.cg_key, &self.endings_key] {
            if let Err(error) = self.storage.remove(key) {
                warn!(key = %key, error = %error, "gallery_reset_failed");
            }
        }
    }
}

impl<S: SaveStorage> EndingObserver for Gallery<S> {
    fn ending_reached(&mut self, ending: &EndingInfo) {
        let new_ending = self.unlock_ending(&ending.id);
        let cg_id = self.catalog.cg_for_ending(&ending.id).map(str::to_string);
        let new_cg = match cg_id.as_deref() {
            Some(cg_id) => self.unlock_cg(cg_id),
            None => false,
        };
        info!(
            ending_id = %ending.id,
            cg_id = cg_id.as_deref().unwrap_or(""),
            new_ending,
            new_cg,
            "gallery_ending_recorded"
        );
    }
}

fn read_id_list<S: SaveStorage>(storage: &S, key: &str) -> Vec<String> {
    let raw = match storage.read(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return Vec::new(),
        Err(error) => {
            warn!(key, error = %error, "gallery_load_failed");
            return Vec::new();
        }
    };
    serde_json::from_str(&raw).unwrap_or_else(|error| {
        warn!(key, error = %error, "gallery_record_corrupt");
        Vec::new()
    })
}

fn write_id_list<S: SaveStorage>(storage: &S, key: &str, ids: &[String]) {
    let result = serde_json::to_string(ids)
        .map_err(PersistenceError::from)
        .and_then(|json| storage.write(key, &json));
    if let Err(error) = result {
        warn!(key, error = %error, "gallery_save_failed");
    }
}
