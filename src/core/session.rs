/// The engine boundary a presentation layer drives.
///
/// `GameSession` owns the loaded scenario, the active playthrough and the
/// save manager. Every entry point is synchronous and completes its whole
/// transition before returning. Failures are logged and reported as
/// `false` / `None`; the previous state is kept.

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::core::config::{ConfigError, SessionConfig};
use crate::core::evaluator::available_choices;
use crate::core::gallery::EndingObserver;
use crate::core::persistence::{Clock, MemoryStorage, SaveManager, SaveStorage, SystemClock};
use crate::core::traversal::{Settled, Transition, Traversal, TraversalError};
use crate::core::validator::validate;
use crate::schema::node::{Choice, GameNode};
use crate::schema::scenario::{Scenario, ScenarioError};
use crate::schema::state::{EndingInfo, GameState, LogEntry, SlotInfo};

struct Playthrough {
    state: GameState,
    ending: Option<EndingInfo>,
}

/// A player's session with one scenario. Built via `GameSession::builder()`.
pub struct GameSession<S> {
    config: SessionConfig,
    scenario: Option<Scenario>,
    saves: SaveManager<S>,
    observer: Option<Box<dyn EndingObserver>>,
    clock: Box<dyn Clock>,
    play: Option<Playthrough>,
}

/// Builder for constructing a `GameSession`.
pub struct SessionBuilder<S> {
    config: SessionConfig,
    config_path: Option<PathBuf>,
    slot_count: Option<usize>,
    save_version: Option<String>,
    storage: S,
    observer: Option<Box<dyn EndingObserver>>,
    clock: Option<Box<dyn Clock>>,
}

impl GameSession<MemoryStorage> {
    /// Start building a session. Storage defaults to an in-memory map.
    pub fn builder() -> SessionBuilder<MemoryStorage> {
        SessionBuilder {
            config: SessionConfig::default(),
            config_path: None,
            slot_count: None,
            save_version: None,
            storage: MemoryStorage::new(),
            observer: None,
            clock: None,
        }
    }
}

impl<S: SaveStorage> GameSession<S> {
    /// Install or replace the scenario. Does not start play.
    ///
    /// The scenario is validated first and rejected with every structural
    /// error if unsound. A successful load ends any active playthrough.
    pub fn load_scenario(&mut self, scenario: Scenario) -> Result<(), ScenarioError> {
        let errors = validate(&scenario);
        if !errors.is_empty() {
            warn!(
                title = %scenario.meta.title,
                error_count = errors.len(),
                "scenario_rejected"
            );
            return Err(ScenarioError::Invalid(errors));
        }

        info!(
            title = %scenario.meta.title,
            nodes = scenario.nodes.len(),
            start = %scenario.start,
            "scenario_loaded"
        );
        self.scenario = Some(scenario);
        self.play = None;
        Ok(())
    }

    pub fn load_scenario_file(&mut self, path: &Path) -> Result<(), ScenarioError> {
        let scenario = Scenario::load_from_json(path)?;
        self.load_scenario(scenario)
    }

    pub fn scenario(&self) -> Option<&Scenario> {
        self.scenario.as_ref()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn saves(&self) -> &SaveManager<S> {
        &self.saves
    }

    /// Begin a fresh playthrough at the scenario's start node and autosave.
    pub fn start_new_game(&mut self) -> bool {
        let Some(scenario) = self.scenario.as_ref() else {
            warn!("start_without_scenario");
            return false;
        };
        let result = self
            .traversal(scenario)
            .begin(self.config.initial_variables);
        match result {
            Ok(transition) => {
                self.settle(transition);
                true
            }
            Err(error) => {
                report_traversal_error("start_new_game", &error);
                false
            }
        }
    }

    /// Resume from the autosave. Returns `false` if there is none or it
    /// cannot be restored.
    pub fn continue_game(&mut self) -> bool {
        match self.saves.read_autosave() {
            Ok(Some(data)) => self.restore("autosave", data.state),
            Ok(None) => {
                debug!("autosave_missing");
                false
            }
            Err(error) => {
                warn!(error = %error, "autosave_load_failed");
                false
            }
        }
    }

    /// Drop the active playthrough. The scenario stays loaded.
    pub fn return_to_title(&mut self) {
        self.play = None;
    }

    /// Move to `node_id`, following jumps and branches until play settles.
    pub fn go_to_node(&mut self, node_id: &str) -> bool {
        self.transition("go_to_node", |traversal, state| {
            traversal.go_to_node(state, node_id)
        })
    }

    /// Continue past the current scene. A no-op unless a scene is current.
    pub fn advance_scene(&mut self) -> bool {
        self.transition("advance_scene", |traversal, state| {
            traversal.advance_scene(state)
        })
    }

    /// Take `choice`. A no-op unless a choice node is current.
    pub fn select_choice(&mut self, choice: &Choice) -> bool {
        self.transition("select_choice", |traversal, state| {
            traversal.select_choice(state, choice)
        })
    }

    /// Take the `index`-th entry of [`GameSession::available_choices`].
    pub fn select_choice_at(&mut self, index: usize) -> bool {
        let Some(choice) = self.available_choices().get(index).map(|c| (*c).clone()) else {
            debug!(index, "choice_index_out_of_range");
            return false;
        };
        self.select_choice(&choice)
    }

    /// Snapshot the current state into slot `index`.
    ///
    /// Refused while no playthrough is active or after an ending.
    pub fn save_to_slot(&mut self, index: usize) -> bool {
        let Some(play) = self.play.as_ref() else {
            debug!(slot = index, "save_without_playthrough");
            return false;
        };
        if play.ending.is_some() {
            debug!(slot = index, "save_after_ending");
            return false;
        }
        match self
            .saves
            .write_slot(index, &play.state, self.clock.now_millis())
        {
            Ok(()) => {
                info!(slot = index, node_id = %play.state.current_node_id, "slot_saved");
                true
            }
            Err(error) => {
                warn!(slot = index, error = %error, "slot_save_failed");
                false
            }
        }
    }

    /// Restore slot `index`. Fails if the slot is empty, unreadable, or its
    /// node no longer exists in the loaded scenario.
    pub fn load_from_slot(&mut self, index: usize) -> bool {
        match self.saves.read_slot(index) {
            Ok(Some(data)) => {
                let restored = self.restore("slot", data.state);
                if restored {
                    info!(slot = index, "slot_loaded");
                }
                restored
            }
            Ok(None) => {
                debug!(slot = index, "slot_empty");
                false
            }
            Err(error) => {
                warn!(slot = index, error = %error, "slot_load_failed");
                false
            }
        }
    }

    pub fn delete_slot(&mut self, index: usize) -> bool {
        match self.saves.delete_slot(index) {
            Ok(()) => true,
            Err(error) => {
                warn!(slot = index, error = %error, "slot_delete_failed");
                false
            }
        }
    }

    /// Menu summary of slot `index`, `None` if empty or unreadable.
    pub fn slot_info(&self, index: usize) -> Option<SlotInfo> {
        match self.saves.read_slot(index) {
            Ok(Some(data)) => Some(SlotInfo {
                timestamp: data.timestamp,
                chapter_label: self
                    .config
                    .chapter_label(&data.state.current_node_id)
                    .to_string(),
                node_id: data.state.current_node_id,
            }),
            Ok(None) => None,
            Err(error) => {
                warn!(slot = index, error = %error, "slot_info_failed");
                None
            }
        }
    }

    /// Whether an autosave exists to continue from.
    pub fn has_save(&self) -> bool {
        self.saves.has_autosave()
    }

    pub fn is_playing(&self) -> bool {
        self.play.is_some()
    }

    pub fn is_ended(&self) -> bool {
        self.ending().is_some()
    }

    pub fn ending(&self) -> Option<&EndingInfo> {
        self.play.as_ref().and_then(|play| play.ending.as_ref())
    }

    pub fn state(&self) -> Option<&GameState> {
        self.play.as_ref().map(|play| &play.state)
    }

    pub fn current_node(&self) -> Option<&GameNode> {
        let state = self.state()?;
        self.scenario.as_ref()?.get_node(&state.current_node_id)
    }

    /// Transcript of the active playthrough, empty when none.
    pub fn log(&self) -> &[LogEntry] {
        self.state().map(|state| state.log.as_slice()).unwrap_or(&[])
    }

    /// Visible choices of the current choice node, in authored order.
    pub fn available_choices(&self) -> Vec<&Choice> {
        match (self.current_node(), self.state()) {
            (Some(GameNode::Choice(node)), Some(state)) => {
                available_choices(&node.choices, &state.variables, &state.flags)
            }
            _ => Vec::new(),
        }
    }

    /// Chapter name of the current node, empty when none applies.
    pub fn chapter_label(&self) -> &str {
        self.state()
            .map(|state| self.config.chapter_label(&state.current_node_id))
            .unwrap_or("")
    }

    fn traversal<'a>(&self, scenario: &'a Scenario) -> Traversal<'a> {
        Traversal::new(scenario).with_max_chain_steps(self.config.max_chain_steps)
    }

    /// Run one transition against the active, unfinished playthrough.
    fn transition<F>(&mut self, action: &'static str, step: F) -> bool
    where
        F: FnOnce(Traversal<'_>, &GameState) -> Result<Transition, TraversalError>,
    {
        let (Some(scenario), Some(play)) = (self.scenario.as_ref(), self.play.as_ref()) else {
            debug!(action, "transition_without_playthrough");
            return false;
        };
        if play.ending.is_some() {
            debug!(action, "transition_after_ending");
            return false;
        }

        let result = step(self.traversal(scenario), &play.state);
        match result {
            Ok(transition) => {
                self.settle(transition);
                true
            }
            Err(error) => {
                report_traversal_error(action, &error);
                false
            }
        }
    }

    /// Publish a finished transition: autosave while play continues, or
    /// record the ending, notify the observer and drop the autosave.
    fn settle(&mut self, transition: Transition) {
        let Transition {
            state,
            settled,
            passed_through,
        } = transition;
        if !passed_through.is_empty() {
            debug!(
                hops = passed_through.len(),
                node_id = %state.current_node_id,
                "chain_resolved"
            );
        }

        match settled {
            Settled::Awaiting(_) => {
                if let Err(error) = self.saves.write_autosave(&state, self.clock.now_millis()) {
                    warn!(node_id = %state.current_node_id, error = %error, "autosave_failed");
                }
                self.play = Some(Playthrough {
                    state,
                    ending: None,
                });
            }
            Settled::Ended(ending) => {
                info!(
                    ending_id = %ending.id,
                    node_id = %state.current_node_id,
                    "ending_reached"
                );
                if let Some(observer) = self.observer.as_mut() {
                    observer.ending_reached(&ending);
                }
                if let Err(error) = self.saves.delete_autosave() {
                    warn!(error = %error, "autosave_delete_failed");
                }
                self.play = Some(Playthrough {
                    state,
                    ending: Some(ending),
                });
            }
        }
    }

    /// Make a loaded state the active playthrough.
    ///
    /// Scene and choice nodes are restored as-is and an end node restores
    /// the ended screen without notifying the observer again. A save that
    /// rests on a jump or branch is walked forward and published the same
    /// way: no autosave is written and the observer is not notified.
    fn restore(&mut self, source: &'static str, state: GameState) -> bool {
        let Some(scenario) = self.scenario.as_ref() else {
            warn!(source, "restore_without_scenario");
            return false;
        };
        let Some(node) = scenario.get_node(&state.current_node_id) else {
            warn!(source, node_id = %state.current_node_id, "scenario_node_not_found");
            return false;
        };

        match node {
            GameNode::Scene(_) | GameNode::Choice(_) => {
                self.play = Some(Playthrough {
                    state,
                    ending: None,
                });
                true
            }
            GameNode::End(end) => {
                let ending = EndingInfo::from(end);
                self.play = Some(Playthrough {
                    state,
                    ending: Some(ending),
                });
                true
            }
            GameNode::Jump(_) | GameNode::Branch(_) => {
                let result = self
                    .traversal(scenario)
                    .go_to_node(&state, &state.current_node_id);
                match result {
                    Ok(transition) => {
                        let ending = match transition.settled {
                            Settled::Ended(ending) => Some(ending),
                            Settled::Awaiting(_) => None,
                        };
                        debug!(
                            source,
                            node_id = %transition.state.current_node_id,
                            "restore_walked_forward"
                        );
                        self.play = Some(Playthrough {
                            state: transition.state,
                            ending,
                        });
                        true
                    }
                    Err(error) => {
                        report_traversal_error(source, &error);
                        false
                    }
                }
            }
        }
    }
}

fn report_traversal_error(action: &'static str, error: &TraversalError) {
    match error {
        TraversalError::NodeNotFound(node_id) => {
            warn!(action, node_id = %node_id, "scenario_node_not_found");
        }
        TraversalError::ChainLimit { from, steps } => {
            warn!(action, from = %from, steps, "traversal_chain_limit");
        }
        TraversalError::WrongNodeKind {
            node_id,
            expected,
            found,
        } => {
            debug!(
                action,
                node_id = %node_id,
                expected = %expected,
                found = %found,
                "transition_ignored"
            );
        }
    }
}

impl<S> SessionBuilder<S> {
    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Load the config from a RON file at build time.
    pub fn config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    /// Overrides the config's slot count.
    pub fn slot_count(mut self, count: usize) -> Self {
        self.slot_count = Some(count);
        self
    }

    /// Overrides the config's save version tag.
    pub fn save_version(mut self, version: impl Into<String>) -> Self {
        self.save_version = Some(version.into());
        self
    }

    pub fn storage<T: SaveStorage>(self, storage: T) -> SessionBuilder<T> {
        SessionBuilder {
            config: self.config,
            config_path: self.config_path,
            slot_count: self.slot_count,
            save_version: self.save_version,
            storage,
            observer: self.observer,
            clock: self.clock,
        }
    }

    pub fn observer(mut self, observer: Box<dyn EndingObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }
}

impl<S: SaveStorage> SessionBuilder<S> {
    pub fn build(self) -> Result<GameSession<S>, ConfigError> {
        let mut config = match self.config_path {
            Some(ref path) => SessionConfig::load_from_ron(path)?,
            None => self.config,
        };
        if let Some(count) = self.slot_count {
            config.slot_count = count;
        }
        if let Some(version) = self.save_version {
            config.save_version = version;
        }

        let saves = SaveManager::new(
            self.storage,
            config.key_prefix.clone(),
            config.slot_count,
            config.save_version.clone(),
        );

        Ok(GameSession {
            config,
            scenario: None,
            saves,
            observer: self.observer,
            clock: self.clock.unwrap_or_else(|| Box::new(SystemClock)),
            play: None,
        })
    }
}
