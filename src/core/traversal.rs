/// Traversal state machine: resolves node semantics and produces the next
/// game state.
///
/// Transitions are pure. Each call borrows the current [`GameState`] and
/// returns a new one, or an error that leaves the caller's state untouched.
/// Jump and branch chains are followed in a bounded loop until a scene,
/// choice or end node is reached.

use thiserror::Error;

use crate::core::evaluator::{apply_effects, apply_flag_effects, resolve_branch};
use crate::schema::node::{Choice, GameNode, NodeKind};
use crate::schema::scenario::Scenario;
use crate::schema::state::{EndingInfo, GameState, LogEntry};
use crate::schema::variables::GameVariables;

/// Default bound on consecutive jump/branch hops in one transition.
pub const DEFAULT_MAX_CHAIN_STEPS: usize = 1000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TraversalError {
    #[error("node not found: {0}")]
    NodeNotFound(String),
    #[error("transition from '{from}' passed {steps} jump/branch nodes without settling (probable infinite loop)")]
    ChainLimit { from: String, steps: usize },
    #[error("current node '{node_id}' is a {found} node, expected {expected}")]
    WrongNodeKind {
        node_id: String,
        expected: NodeKind,
        found: NodeKind,
    },
}

/// Where a transition came to rest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settled {
    /// A scene or choice node waiting for the player.
    Awaiting(NodeKind),
    /// A terminal node.
    Ended(EndingInfo),
}

/// The result of a successful transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub state: GameState,
    pub settled: Settled,
    /// Jump and branch node ids passed on the way, in order.
    pub passed_through: Vec<String>,
}

impl Transition {
    pub fn is_ended(&self) -> bool {
        matches!(self.settled, Settled::Ended(_))
    }
}

/// Resolves transitions against one scenario.
#[derive(Debug, Clone, Copy)]
pub struct Traversal<'a> {
    scenario: &'a Scenario,
    max_chain_steps: usize,
}

impl<'a> Traversal<'a> {
    pub fn new(scenario: &'a Scenario) -> Self {
        Self {
            scenario,
            max_chain_steps: DEFAULT_MAX_CHAIN_STEPS,
        }
    }

    pub fn with_max_chain_steps(mut self, steps: usize) -> Self {
        self.max_chain_steps = steps;
        self
    }

    fn node(&self, id: &str) -> Result<&'a GameNode, TraversalError> {
        self.scenario
            .get_node(id)
            .ok_or_else(|| TraversalError::NodeNotFound(id.to_string()))
    }

    /// Build the opening state of a playthrough.
    ///
    /// An interactive start node becomes current as-is, without being
    /// visited: no transcript line, no effects. A jump, branch or end start
    /// node is entered through [`Traversal::go_to_node`] so play never rests
    /// on a node the player cannot act on.
    pub fn begin(&self, variables: GameVariables) -> Result<Transition, TraversalError> {
        let start = self.scenario.start.as_str();
        let state = GameState::new(start, variables);
        let kind = self.node(start)?.kind();
        if kind.is_interactive() {
            Ok(Transition {
                state,
                settled: Settled::Awaiting(kind),
                passed_through: Vec::new(),
            })
        } else {
            self.go_to_node(&state, start)
        }
    }

    /// Move to `node_id`, following jumps and branches until the story
    /// settles on a scene, choice or end node.
    ///
    /// Visiting a scene appends one transcript line and applies the scene's
    /// effects then flag effects. `current_node_id` of the returned state is
    /// always the settled node.
    pub fn go_to_node(
        &self,
        state: &GameState,
        node_id: &str,
    ) -> Result<Transition, TraversalError> {
        let mut next = state.clone();
        let mut target = node_id.to_string();
        let mut passed_through = Vec::new();

        loop {
            let node = self.node(&target)?;
            next.current_node_id.clone_from(&target);

            let hop = match node {
                GameNode::Scene(scene) => {
                    next.log.push(LogEntry {
                        speaker: scene.speaker.clone(),
                        text: scene.text.clone(),
                        node_id: scene.id.clone(),
                    });
                    next.variables = apply_effects(&scene.effects, &next.variables);
                    next.flags = apply_flag_effects(&scene.flag_effects, &next.flags);
                    return Ok(Transition {
                        state: next,
                        settled: Settled::Awaiting(NodeKind::Scene),
                        passed_through,
                    });
                }
                GameNode::Choice(_) => {
                    return Ok(Transition {
                        state: next,
                        settled: Settled::Awaiting(NodeKind::Choice),
                        passed_through,
                    });
                }
                GameNode::End(end) => {
                    return Ok(Transition {
                        state: next,
                        settled: Settled::Ended(EndingInfo::from(end)),
                        passed_through,
                    });
                }
                GameNode::Jump(jump) => jump.next.clone(),
                GameNode::Branch(branch) => {
                    resolve_branch(branch, &next.variables, &next.flags).to_string()
                }
            };

            if passed_through.len() >= self.max_chain_steps {
                return Err(TraversalError::ChainLimit {
                    from: node_id.to_string(),
                    steps: passed_through.len(),
                });
            }
            passed_through.push(std::mem::replace(&mut target, hop));
        }
    }

    /// Continue past the current scene node.
    pub fn advance_scene(&self, state: &GameState) -> Result<Transition, TraversalError> {
        match self.node(&state.current_node_id)? {
            GameNode::Scene(scene) => self.go_to_node(state, &scene.next),
            other => Err(TraversalError::WrongNodeKind {
                node_id: state.current_node_id.clone(),
                expected: NodeKind::Scene,
                found: other.kind(),
            }),
        }
    }

    /// Apply a choice's effects then flag effects and move to its target.
    ///
    /// The current node must be a choice node. The choice itself is not
    /// checked against that node's options; hosts pass back one of the
    /// choices they were offered.
    pub fn select_choice(
        &self,
        state: &GameState,
        choice: &Choice,
    ) -> Result<Transition, TraversalError> {
        let current = self.node(&state.current_node_id)?;
        if current.kind() != NodeKind::Choice {
            return Err(TraversalError::WrongNodeKind {
                node_id: state.current_node_id.clone(),
                expected: NodeKind::Choice,
                found: current.kind(),
            });
        }

        let mut chosen = state.clone();
        chosen.variables = apply_effects(&choice.effects, &chosen.variables);
        chosen.flags = apply_flag_effects(&choice.flag_effects, &chosen.flags);
        self.go_to_node(&chosen, &choice.next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::variables::VariableKey;

    fn scenario(json: &str) -> Scenario {
        Scenario::parse_json(json).unwrap()
    }

    fn chain_scenario() -> Scenario {
        scenario(
            r#"{"start":"J1","nodes":{
                "J1":{"type":"jump","next":"J2"},
                "J2":{"type":"jump","next":"B1"},
                "B1":{"type":"branch","branches":[
                    {"condition":{"type":"flag","key":"brave"},"next":"S_BRAVE"}],
                    "default":"S_SHY"},
                "S_BRAVE":{"type":"scene","speaker":"서연","text":"Bold.","next":"END"},
                "S_SHY":{"type":"scene","speaker":"서연","text":"Quiet.","next":"END",
                    "effects":[{"op":"inc","key":"affectionB","value":5}]},
                "END":{"type":"end","endingId":"E5","endingTitle":"Alone","endingText":"..."}
            }}"#,
        )
    }

    #[test]
    fn chain_settles_on_scene_in_one_call() {
        let scenario = chain_scenario();
        let traversal = Traversal::new(&scenario);
        let state = GameState::new("X", GameVariables::default());

        let t = traversal.go_to_node(&state, "J1").unwrap();
        assert_eq!(t.state.current_node_id, "S_SHY");
        assert_eq!(t.settled, Settled::Awaiting(NodeKind::Scene));
        assert_eq!(t.passed_through, vec!["J1", "J2", "B1"]);
        assert_eq!(t.state.log.len(), 1);
        assert_eq!(t.state.log[0].node_id, "S_SHY");
        assert_eq!(t.state.variables.affection_b, 5);
    }

    #[test]
    fn branch_reads_flags_at_resolution_time() {
        let scenario = chain_scenario();
        let traversal = Traversal::new(&scenario);
        let mut state = GameState::new("X", GameVariables::default());
        state.flags.insert("brave");

        let t = traversal.go_to_node(&state, "B1").unwrap();
        assert_eq!(t.state.current_node_id, "S_BRAVE");
    }

    #[test]
    fn begin_on_non_interactive_start_resolves_chain() {
        let scenario = chain_scenario();
        let t = Traversal::new(&scenario)
            .begin(GameVariables::default())
            .unwrap();
        assert_eq!(t.state.current_node_id, "S_SHY");
    }

    #[test]
    fn begin_on_scene_places_without_visiting() {
        let scenario = scenario(
            r#"{"start":"S","nodes":{
                "S":{"type":"scene","speaker":"","text":"t","next":"S",
                     "effects":[{"op":"set","key":"honesty","value":0}]}
            }}"#,
        );
        let t = Traversal::new(&scenario)
            .begin(GameVariables::default())
            .unwrap();
        assert_eq!(t.state.current_node_id, "S");
        assert!(t.state.log.is_empty());
        assert_eq!(t.state.variables.honesty, 50);
    }

    #[test]
    fn scene_effects_then_flag_effects() {
        let scenario = scenario(
            r#"{"start":"S","nodes":{
                "S":{"type":"scene","speaker":"하린","text":"t","next":"S",
                     "effects":[{"op":"inc","key":"affectionC","value":120}],
                     "flagEffects":[{"op":"set","key":"rooftop"}]}
            }}"#,
        );
        let state = GameState::new("S", GameVariables::default());
        let t = Traversal::new(&scenario).go_to_node(&state, "S").unwrap();
        assert_eq!(t.state.variables.affection_c, 100);
        assert!(t.state.flags.is_set("rooftop"));
        assert_eq!(t.state.log[0].speaker, "하린");
    }

    #[test]
    fn missing_node_leaves_input_untouched() {
        let scenario = chain_scenario();
        let state = GameState::new("S_SHY", GameVariables::default());
        let err = Traversal::new(&scenario)
            .go_to_node(&state, "NOPE")
            .unwrap_err();
        assert_eq!(err, TraversalError::NodeNotFound("NOPE".to_string()));
        assert_eq!(state.current_node_id, "S_SHY");
    }

    #[test]
    fn jump_cycle_hits_chain_limit() {
        let scenario = scenario(
            r#"{"start":"A","nodes":{
                "A":{"type":"jump","next":"B"},
                "B":{"type":"jump","next":"A"}
            }}"#,
        );
        let state = GameState::new("A", GameVariables::default());
        let err = Traversal::new(&scenario)
            .with_max_chain_steps(50)
            .go_to_node(&state, "A")
            .unwrap_err();
        assert_eq!(
            err,
            TraversalError::ChainLimit {
                from: "A".to_string(),
                steps: 50,
            }
        );
    }

    #[test]
    fn end_node_settles_with_ending_info() {
        let scenario = chain_scenario();
        let state = GameState::new("S_SHY", GameVariables::default());
        let t = Traversal::new(&scenario).advance_scene(&state).unwrap();
        assert!(t.is_ended());
        assert_eq!(
            t.settled,
            Settled::Ended(EndingInfo {
                id: "E5".to_string(),
                title: "Alone".to_string(),
                text: "...".to_string(),
            })
        );
        assert_eq!(t.state.current_node_id, "END");
    }

    #[test]
    fn advance_requires_scene() {
        let scenario = chain_scenario();
        let state = GameState::new("END", GameVariables::default());
        let err = Traversal::new(&scenario).advance_scene(&state).unwrap_err();
        assert!(matches!(
            err,
            TraversalError::WrongNodeKind {
                expected: NodeKind::Scene,
                found: NodeKind::End,
                ..
            }
        ));
    }

    #[test]
    fn select_choice_applies_effects_before_moving() {
        let scenario = scenario(
            r#"{"start":"C","nodes":{
                "C":{"type":"choice","choices":[
                    {"text":"go","next":"B","effects":[{"op":"set","key":"affectionA","value":70}],
                     "flagEffects":[{"op":"set","key":"confessed"}]}]},
                "B":{"type":"branch","branches":[
                    {"condition":{"type":"variable","key":"affectionA","op":">=","value":70},"next":"GOOD"}],
                    "default":"BAD"},
                "GOOD":{"type":"end","endingId":"E1","endingTitle":"","endingText":""},
                "BAD":{"type":"end","endingId":"E5","endingTitle":"","endingText":""}
            }}"#,
        );
        let traversal = Traversal::new(&scenario);
        let state = GameState::new("C", GameVariables::default());
        let GameNode::Choice(node) = scenario.get_node("C").unwrap() else {
            unreachable!()
        };

        let t = traversal.select_choice(&state, &node.choices[0]).unwrap();
        assert_eq!(t.state.current_node_id, "GOOD");
        assert_eq!(t.state.variables.get(VariableKey::AffectionA), 70);
        assert!(t.state.flags.is_set("confessed"));
    }

    #[test]
    fn select_choice_requires_choice_node() {
        let scenario = chain_scenario();
        let state = GameState::new("S_SHY", GameVariables::default());
        let choice = Choice {
            text: "x".to_string(),
            condition: None,
            effects: Vec::new(),
            flag_effects: Vec::new(),
            next: "END".to_string(),
        };
        assert!(Traversal::new(&scenario)
            .select_choice(&state, &choice)
            .is_err());
    }
}
