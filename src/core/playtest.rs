/// Random playthroughs for smoke-testing authored content.
///
/// Drives the pure [`Traversal`] API directly so every failure mode stays
/// visible, where the session boundary would only report `false`.

use rand::rngs::StdRng;
use rand::Rng;
use serde::Serialize;

use crate::core::evaluator::available_choices;
use crate::core::traversal::{Settled, Traversal, TraversalError};
use crate::schema::node::{GameNode, NodeKind};
use crate::schema::scenario::Scenario;
use crate::schema::state::{EndingInfo, GameState};
use crate::schema::variables::GameVariables;

/// How a single random playthrough finished.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Outcome {
    Ending(String),
    /// A choice node with no visible choices.
    NoChoices { node_id: String },
    Failed(String),
    ChainLimit { from: String },
    StepLimit,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlaythroughReport {
    pub outcome: Outcome,
    /// Player actions taken (scene advances plus choices).
    pub steps: usize,
    pub scenes_seen: usize,
    pub final_variables: GameVariables,
}

/// Play `scenario` from its start, advancing every scene and picking
/// uniformly among visible choices, for at most `max_steps` actions.
pub fn random_playthrough(
    scenario: &Scenario,
    initial: GameVariables,
    max_chain_steps: usize,
    max_steps: usize,
    rng: &mut StdRng,
) -> PlaythroughReport {
    let traversal = Traversal::new(scenario).with_max_chain_steps(max_chain_steps);
    let mut state = GameState::new(scenario.start.as_str(), initial);
    let mut settled = match traversal.begin(initial) {
        Ok(transition) => {
            state = transition.state;
            transition.settled
        }
        Err(error) => return report(failure(error), 0, &state),
    };

    for step in 0..max_steps {
        let next = match &settled {
            Settled::Ended(EndingInfo { id, .. }) => {
                return report(Outcome::Ending(id.clone()), step, &state);
            }
            Settled::Awaiting(NodeKind::Choice) => {
                let Some(GameNode::Choice(node)) = scenario.get_node(&state.current_node_id)
                else {
                    return report(
                        Outcome::Failed(format!("'{}' is not a choice node", state.current_node_id)),
                        step,
                        &state,
                    );
                };
                let visible = available_choices(&node.choices, &state.variables, &state.flags);
                if visible.is_empty() {
                    return report(
                        Outcome::NoChoices {
                            node_id: state.current_node_id.clone(),
                        },
                        step,
                        &state,
                    );
                }
                let pick = visible[rng.gen_range(0..visible.len())];
                traversal.select_choice(&state, pick)
            }
            Settled::Awaiting(_) => traversal.advance_scene(&state),
        };

        match next {
            Ok(transition) => {
                state = transition.state;
                settled = transition.settled;
            }
            Err(error) => return report(failure(error), step, &state),
        }
    }

    match settled {
        Settled::Ended(ending) => report(Outcome::Ending(ending.id), max_steps, &state),
        Settled::Awaiting(_) => report(Outcome::StepLimit, max_steps, &state),
    }
}

fn failure(error: TraversalError) -> Outcome {
    match error {
        TraversalError::ChainLimit { from, .. } => Outcome::ChainLimit { from },
        other => Outcome::Failed(other.to_string()),
    }
}

fn report(outcome: Outcome, steps: usize, state: &GameState) -> PlaythroughReport {
    PlaythroughReport {
        outcome,
        steps,
        scenes_seen: state.log.len(),
        final_variables: state.variables,
    }
}
