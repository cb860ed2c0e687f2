//! WASM bindings for vn-engine: a browser player with localStorage saves.

use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::prelude::*;

use vn_engine::core::config::SessionConfig;
use vn_engine::core::gallery::{Gallery, GalleryCatalog};
use vn_engine::core::persistence::{PersistenceError, SaveStorage};
use vn_engine::core::session::GameSession;
use vn_engine::core::validator::validate;
use vn_engine::schema::node::GameNode;
use vn_engine::schema::scenario::Scenario;
use vn_engine::schema::state::EndingInfo;

// ---------------------------------------------------------------------------
// Embedded demo content, compiled into the WASM binary
// ---------------------------------------------------------------------------
mod data {
    pub const DEMO_SCENARIO: &str = include_str!("../../scenarios/campus_days.json");
    pub const DEMO_GALLERY: &str = include_str!("../../scenarios/campus_days.gallery.ron");
}

// ---------------------------------------------------------------------------
// Browser storage
// ---------------------------------------------------------------------------

/// `window.localStorage` as a save backend.
#[derive(Clone)]
pub struct LocalStorage {
    inner: web_sys::Storage,
}

impl LocalStorage {
    pub fn open() -> Result<Self, PersistenceError> {
        let window = web_sys::window()
            .ok_or_else(|| PersistenceError::Unavailable("no window".to_string()))?;
        let inner = window
            .local_storage()
            .map_err(|e| PersistenceError::Unavailable(js_message(&e)))?
            .ok_or_else(|| PersistenceError::Unavailable("localStorage disabled".to_string()))?;
        Ok(Self { inner })
    }
}

impl SaveStorage for LocalStorage {
    fn read(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        self.inner
            .get_item(key)
            .map_err(|e| PersistenceError::Unavailable(js_message(&e)))
    }

    fn write(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        self.inner
            .set_item(key, value)
            .map_err(|e| PersistenceError::Unavailable(js_message(&e)))
    }

    fn remove(&self, key: &str) -> Result<(), PersistenceError> {
        self.inner
            .remove_item(key)
            .map_err(|e| PersistenceError::Unavailable(js_message(&e)))
    }
}

fn js_message(value: &JsValue) -> String {
    value.as_string().unwrap_or_else(|| format!("{value:?}"))
}

// ---------------------------------------------------------------------------
// JSON helper types for communication across the WASM boundary
// ---------------------------------------------------------------------------
#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct NodeView<'a> {
    node_id: &'a str,
    kind: &'a str,
    chapter_label: &'a str,
    speaker: Option<&'a str>,
    text: Option<&'a str>,
    prompt: Option<&'a str>,
    choices: Vec<&'a str>,
    ending: Option<&'a EndingInfo>,
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct SlotView {
    slot: usize,
    saved_at: String,
    chapter_label: String,
    node_id: String,
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct GalleryView<'a> {
    progress: u32,
    unlocked_cgs: &'a [String],
    total_cgs: usize,
    endings_unlocked: usize,
    endings_total: usize,
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, JsError> {
    serde_json::to_string(value).map_err(|e| JsError::new(&format!("Serialization error: {e}")))
}

// ---------------------------------------------------------------------------
// VnPlayer, the main exported struct
// ---------------------------------------------------------------------------
#[wasm_bindgen]
pub struct VnPlayer {
    session: GameSession<LocalStorage>,
    gallery: Rc<RefCell<Gallery<LocalStorage>>>,
}

#[wasm_bindgen]
impl VnPlayer {
    /// Create a player for `scenario_json`, or the bundled demo when omitted.
    #[wasm_bindgen(constructor)]
    pub fn new(scenario_json: Option<String>) -> Result<VnPlayer, JsError> {
        let storage = LocalStorage::open()
            .map_err(|e| JsError::new(&format!("Storage error: {e}")))?;
        let config = SessionConfig::default();

        let catalog = GalleryCatalog::parse_ron(data::DEMO_GALLERY)
            .map_err(|e| JsError::new(&format!("Gallery parse error: {e}")))?;
        let gallery = Rc::new(RefCell::new(Gallery::open(
            catalog,
            storage.clone(),
            config.gallery_key(),
            config.endings_key(),
        )));

        let mut session = GameSession::builder()
            .config(config)
            .storage(storage)
            .observer(Box::new(gallery.clone()))
            .build()
            .map_err(|e| JsError::new(&format!("Session build error: {e}")))?;

        let source = scenario_json.as_deref().unwrap_or(data::DEMO_SCENARIO);
        let scenario = Scenario::parse_json(source)
            .map_err(|e| JsError::new(&format!("Scenario parse error: {e}")))?;
        session
            .load_scenario(scenario)
            .map_err(|e| JsError::new(&e.to_string()))?;

        Ok(VnPlayer { session, gallery })
    }

    /// Validate a scenario document. Returns a JSON array of error strings.
    pub fn validate_scenario(scenario_json: &str) -> Result<String, JsError> {
        let scenario = Scenario::parse_json(scenario_json)
            .map_err(|e| JsError::new(&format!("Scenario parse error: {e}")))?;
        to_json(&validate(&scenario))
    }

    pub fn start_new_game(&mut self) -> bool {
        self.session.start_new_game()
    }

    pub fn continue_game(&mut self) -> bool {
        self.session.continue_game()
    }

    pub fn has_save(&self) -> bool {
        self.session.has_save()
    }

    pub fn return_to_title(&mut self) {
        self.session.return_to_title();
    }

    pub fn advance_scene(&mut self) -> bool {
        self.session.advance_scene()
    }

    /// Pick the `index`-th visible choice.
    pub fn select_choice(&mut self, index: usize) -> bool {
        self.session.select_choice_at(index)
    }

    pub fn is_playing(&self) -> bool {
        self.session.is_playing()
    }

    pub fn is_ended(&self) -> bool {
        self.session.is_ended()
    }

    /// What the UI should show right now, as JSON. `null` at the title.
    pub fn current_view(&self) -> Result<String, JsError> {
        let Some(state) = self.session.state() else {
            return Ok("null".to_string());
        };
        let node = self.session.current_node();
        let mut view = NodeView {
            node_id: &state.current_node_id,
            kind: node.map(|n| n.kind().name()).unwrap_or(""),
            chapter_label: self.session.chapter_label(),
            speaker: None,
            text: None,
            prompt: None,
            choices: self
                .session
                .available_choices()
                .into_iter()
                .map(|choice| choice.text.as_str())
                .collect(),
            ending: self.session.ending(),
        };
        match node {
            Some(GameNode::Scene(scene)) => {
                view.speaker = Some(scene.speaker.as_str());
                view.text = Some(scene.text.as_str());
            }
            Some(GameNode::Choice(choice_node)) => {
                view.prompt = choice_node.prompt.as_deref();
            }
            _ => {}
        }
        to_json(&view)
    }

    /// Variables, flags and transcript of the active playthrough, as JSON.
    pub fn state_json(&self) -> Result<String, JsError> {
        to_json(&self.session.state())
    }

    pub fn log_json(&self) -> Result<String, JsError> {
        to_json(&self.session.log())
    }

    pub fn slot_count(&self) -> usize {
        self.session.saves().slot_count()
    }

    pub fn save_to_slot(&mut self, index: usize) -> bool {
        self.session.save_to_slot(index)
    }

    pub fn load_from_slot(&mut self, index: usize) -> bool {
        self.session.load_from_slot(index)
    }

    pub fn delete_slot(&mut self, index: usize) -> bool {
        self.session.delete_slot(index)
    }

    /// Slot summary as JSON, `None` for an empty slot.
    pub fn slot_info(&self, index: usize) -> Result<Option<String>, JsError> {
        let Some(info) = self.session.slot_info(index) else {
            return Ok(None);
        };
        let saved_at = chrono::DateTime::<chrono::Utc>::from_timestamp_millis(info.timestamp)
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default();
        let view = SlotView {
            slot: index,
            saved_at,
            chapter_label: info.chapter_label,
            node_id: info.node_id,
        };
        to_json(&view).map(Some)
    }

    pub fn gallery_json(&self) -> Result<String, JsError> {
        let gallery = self.gallery.borrow();
        let endings = gallery.ending_progress();
        to_json(&GalleryView {
            progress: gallery.progress(),
            unlocked_cgs: gallery.unlocked_cgs(),
            total_cgs: gallery.total_count(),
            endings_unlocked: endings.unlocked,
            endings_total: endings.total,
        })
    }

    /// The full CG and ending catalogue, as JSON.
    pub fn gallery_catalog(&self) -> Result<String, JsError> {
        to_json(self.gallery.borrow().catalog())
    }

    pub fn reset_gallery(&mut self) {
        self.gallery.borrow_mut().reset();
    }
}
