/// Static integrity checks over a scenario graph.
///
/// Only dangling references are errors. Cycles, unreachable nodes and dead
/// ends are accepted as authorial intent.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::schema::condition::{Comparator, Condition};
use crate::schema::node::GameNode;
use crate::schema::scenario::Scenario;
use crate::schema::variables::VariableKey;

/// Check every node reference in `scenario`, accumulating all failures.
///
/// Returns an empty list iff the scenario is structurally sound. Messages
/// are ordered by node id so reports are stable across runs.
pub fn validate(scenario: &Scenario) -> Vec<String> {
    let mut errors = Vec::new();

    if scenario.start.is_empty() {
        errors.push("start node is not defined".to_string());
    } else if !scenario.contains(&scenario.start) {
        errors.push(format!("start node '{}' not found", scenario.start));
    }

    for id in scenario.sorted_ids() {
        let Some(node) = scenario.get_node(id) else {
            continue;
        };

        if node.id() != id {
            errors.push(format!(
                "node '{}' declares mismatched id '{}'",
                id,
                node.id()
            ));
        }

        let missing = |target: &str| !scenario.contains(target);

        match node {
            GameNode::Scene(scene) => {
                if missing(&scene.next) {
                    errors.push(format!("node '{}' next '{}' not found", id, scene.next));
                }
            }
            GameNode::Jump(jump) => {
                if missing(&jump.next) {
                    errors.push(format!("node '{}' next '{}' not found", id, jump.next));
                }
            }
            GameNode::Choice(choice_node) => {
                for (index, choice) in choice_node.choices.iter().enumerate() {
                    if missing(&choice.next) {
                        errors.push(format!(
                            "node '{}' choice {} next '{}' not found",
                            id, index, choice.next
                        ));
                    }
                }
            }
            GameNode::Branch(branch) => {
                for (index, arm) in branch.branches.iter().enumerate() {
                    if missing(&arm.next) {
                        errors.push(format!(
                            "node '{}' branch {} next '{}' not found",
                            id, index, arm.next
                        ));
                    }
                }
                if missing(&branch.default_next) {
                    errors.push(format!(
                        "node '{}' default '{}' not found",
                        id, branch.default_next
                    ));
                }
            }
            GameNode::End(_) => {}
        }
    }

    errors
}

/// Authoring warnings: things that load and play but are probably mistakes.
///
/// Reports nodes unreachable from start, choice nodes without choices,
/// conditions on unknown variables or with unsupported comparators, and
/// cycles made only of jump/branch nodes.
pub fn lint(scenario: &Scenario) -> Vec<String> {
    let mut warnings = Vec::new();
    let reachable = reachable_from_start(scenario);

    for id in scenario.sorted_ids() {
        let Some(node) = scenario.get_node(id) else {
            continue;
        };
        if !reachable.contains(id) {
            warnings.push(format!("node '{}' is unreachable from start", id));
        }

        match node {
            GameNode::Choice(choice_node) => {
                if choice_node.choices.is_empty() {
                    warnings.push(format!("choice node '{}' has no choices", id));
                }
                for (index, choice) in choice_node.choices.iter().enumerate() {
                    if let Some(condition) = &choice.condition {
                        let place = format!("node '{}' choice {}", id, index);
                        lint_condition(&place, condition, &mut warnings);
                    }
                }
            }
            GameNode::Branch(branch) => {
                for (index, arm) in branch.branches.iter().enumerate() {
                    let place = format!("node '{}' branch {}", id, index);
                    lint_condition(&place, &arm.condition, &mut warnings);
                }
            }
            _ => {}
        }
    }

    for cycle in chain_cycles(scenario) {
        warnings.push(format!("jump/branch cycle: {}", cycle.join(" -> ")));
    }

    warnings
}

fn lint_condition(place: &str, condition: &Condition, warnings: &mut Vec<String>) {
    if let Condition::Variable { key, op, .. } = condition {
        if VariableKey::from_name(key).is_none() {
            warnings.push(format!("{} reads unknown variable '{}'", place, key));
        }
        if let Comparator::Unsupported(raw) = op {
            warnings.push(format!(
                "{} uses unsupported comparator '{}' (never matches)",
                place, raw
            ));
        }
    }
}

fn reachable_from_start(scenario: &Scenario) -> FxHashSet<&str> {
    let mut seen = FxHashSet::default();
    let mut queue = vec![scenario.start.as_str()];
    while let Some(id) = queue.pop() {
        let Some(node) = scenario.get_node(id) else {
            continue;
        };
        if seen.insert(id) {
            queue.extend(node.targets());
        }
    }
    seen
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Visit {
    Active,
    Done,
}

fn is_chain_node(scenario: &Scenario, id: &str) -> bool {
    matches!(
        scenario.get_node(id),
        Some(GameNode::Jump(_) | GameNode::Branch(_))
    )
}

/// Cycles in the subgraph of jump and branch nodes, each listed from its
/// entry node back to itself.
fn chain_cycles(scenario: &Scenario) -> Vec<Vec<String>> {
    let mut marks = FxHashMap::default();
    let mut cycles = Vec::new();
    for id in scenario.sorted_ids() {
        if is_chain_node(scenario, id) && !marks.contains_key(id) {
            visit_chain(scenario, id, &mut marks, &mut cycles);
        }
    }
    cycles
}

/// Distinct jump/branch targets of `id`, in authored order.
fn chain_targets<'a>(scenario: &'a Scenario, id: &str) -> Vec<&'a str> {
    let mut targets: Vec<&'a str> = Vec::new();
    if let Some(node) = scenario.get_node(id) {
        for target in node.targets() {
            if is_chain_node(scenario, target) && !targets.contains(&target) {
                targets.push(target);
            }
        }
    }
    targets
}

/// Depth-first walk from `root` with an explicit frame stack, so chain
/// length never touches the call stack.
fn visit_chain<'a>(
    scenario: &'a Scenario,
    root: &'a str,
    marks: &mut FxHashMap<&'a str, Visit>,
    cycles: &mut Vec<Vec<String>>,
) {
    let mut path: Vec<&'a str> = vec![root];
    let mut frames: Vec<(Vec<&'a str>, usize)> = vec![(chain_targets(scenario, root), 0)];
    marks.insert(root, Visit::Active);

    while let Some(frame) = frames.last_mut() {
        let next = frame.0.get(frame.1).copied();
        frame.1 += 1;
        let Some(target) = next else {
            frames.pop();
            if let Some(done) = path.pop() {
                marks.insert(done, Visit::Done);
            }
            continue;
        };

        match marks.get(target).copied() {
            Some(Visit::Active) => {
                if let Some(pos) = path.iter().position(|entry| *entry == target) {
                    let mut cycle: Vec<String> =
                        path[pos..].iter().map(|entry| entry.to_string()).collect();
                    cycle.push(target.to_string());
                    cycles.push(cycle);
                }
            }
            Some(Visit::Done) => {}
            None => {
                marks.insert(target, Visit::Active);
                path.push(target);
                frames.push((chain_targets(scenario, target), 0));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Scenario {
        Scenario::parse_json(json).unwrap()
    }

    #[test]
    fn sound_scenario_has_no_errors() {
        let scenario = parse(
            r#"{"start":"A","nodes":{
                "A":{"type":"scene","speaker":"","text":"t","next":"B"},
                "B":{"type":"choice","choices":[{"text":"x","next":"C"}]},
                "C":{"type":"branch","branches":[{"condition":{"type":"flag","key":"f"},"next":"A"}],"default":"D"},
                "D":{"type":"jump","next":"E"},
                "E":{"type":"end","endingId":"E1","endingTitle":"","endingText":""}
            }}"#,
        );
        assert!(validate(&scenario).is_empty());
    }

    #[test]
    fn dangling_scene_next_reports_exactly_one_error() {
        let scenario = parse(
            r#"{"start":"A","nodes":{"A":{"type":"scene","speaker":"","text":"t","next":"B"}}}"#,
        );
        let errors = validate(&scenario);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("'A'"));
        assert!(errors[0].contains("'B'"));
    }

    #[test]
    fn empty_start_reported() {
        let scenario = parse(
            r#"{"start":"","nodes":{"E":{"type":"end","endingId":"E","endingTitle":"","endingText":""}}}"#,
        );
        assert_eq!(validate(&scenario), vec!["start node is not defined"]);
    }

    #[test]
    fn unknown_start_reported() {
        let scenario = parse(
            r#"{"start":"nowhere","nodes":{"E":{"type":"end","endingId":"E","endingTitle":"","endingText":""}}}"#,
        );
        assert_eq!(validate(&scenario), vec!["start node 'nowhere' not found"]);
    }

    #[test]
    fn all_failures_accumulate() {
        let scenario = parse(
            r#"{"start":"missing","nodes":{
                "A":{"type":"choice","choices":[{"text":"x","next":"X1"},{"text":"y","next":"X2"}]},
                "B":{"type":"branch","branches":[{"condition":{"type":"flag","key":"f"},"next":"X3"}],"default":"X4"},
                "C":{"type":"jump","next":"X5"}
            }}"#,
        );
        let errors = validate(&scenario);
        assert_eq!(errors.len(), 6, "{errors:#?}");
        assert!(errors[1].contains("choice 0"));
        assert!(errors[2].contains("choice 1"));
        assert!(errors[3].contains("branch 0"));
        assert!(errors[4].contains("default 'X4'"));
        assert!(errors[5].contains("'X5'"));
    }

    #[test]
    fn cycles_and_unreachable_nodes_are_fine() {
        let scenario = parse(
            r#"{"start":"A","nodes":{
                "A":{"type":"jump","next":"B"},
                "B":{"type":"jump","next":"A"},
                "Orphan":{"type":"end","endingId":"O","endingTitle":"","endingText":""}
            }}"#,
        );
        assert!(validate(&scenario).is_empty());
    }

    #[test]
    fn mismatched_node_id_reported() {
        let scenario = parse(
            r#"{"start":"A","nodes":{
                "A":{"type":"end","id":"Z","endingId":"E","endingTitle":"","endingText":""}
            }}"#,
        );
        assert_eq!(
            validate(&scenario),
            vec!["node 'A' declares mismatched id 'Z'"]
        );
    }

    #[test]
    fn lint_clean_scenario_is_quiet() {
        let scenario = parse(
            r#"{"start":"A","nodes":{
                "A":{"type":"scene","speaker":"","text":"t","next":"B"},
                "B":{"type":"branch","branches":[
                    {"condition":{"type":"variable","key":"honesty","op":">","value":60},"next":"E"}],
                    "default":"E"},
                "E":{"type":"end","endingId":"E1","endingTitle":"","endingText":""}
            }}"#,
        );
        assert!(lint(&scenario).is_empty(), "{:?}", lint(&scenario));
    }

    #[test]
    fn lint_reports_authoring_smells() {
        let scenario = parse(
            r#"{"start":"A","nodes":{
                "A":{"type":"choice","choices":[
                    {"text":"x","next":"B","condition":{"type":"variable","key":"charm","op":"=>","value":1}}]},
                "B":{"type":"choice","choices":[]},
                "Orphan":{"type":"end","endingId":"O","endingTitle":"","endingText":""}
            }}"#,
        );
        let warnings = lint(&scenario);
        assert_eq!(warnings.len(), 4, "{warnings:#?}");
        assert!(warnings[0].contains("unknown variable 'charm'"));
        assert!(warnings[1].contains("unsupported comparator '=>'"));
        assert!(warnings[2].contains("'B' has no choices"));
        assert!(warnings[3].contains("'Orphan' is unreachable"));
    }

    #[test]
    fn lint_finds_jump_branch_cycles_only() {
        let scenario = parse(
            r#"{"start":"J1","nodes":{
                "J1":{"type":"jump","next":"B1"},
                "B1":{"type":"branch","branches":[{"condition":{"type":"flag","key":"f"},"next":"S"}],"default":"J1"},
                "S":{"type":"scene","speaker":"","text":"t","next":"J1"}
            }}"#,
        );
        let warnings = lint(&scenario);
        assert_eq!(warnings, vec!["jump/branch cycle: B1 -> J1 -> B1"]);
    }

    fn jump_chain(len: usize, closed: bool) -> Scenario {
        use crate::schema::node::{EndNode, JumpNode};
        use crate::schema::scenario::ScenarioMeta;

        let mut nodes: Vec<GameNode> = (0..len)
            .map(|i| {
                let next = if closed && i + 1 == len {
                    "J0".to_string()
                } else if i + 1 == len {
                    "END".to_string()
                } else {
                    format!("J{}", i + 1)
                };
                GameNode::Jump(JumpNode {
                    id: format!("J{i}"),
                    next,
                })
            })
            .collect();
        nodes.push(GameNode::End(EndNode {
            id: "END".to_string(),
            ending_id: "E".to_string(),
            ending_title: String::new(),
            ending_text: String::new(),
        }));
        Scenario::from_nodes(ScenarioMeta::default(), "J0", nodes)
    }

    #[test]
    fn lint_handles_very_long_jump_chains() {
        let scenario = jump_chain(10_000, false);
        assert!(validate(&scenario).is_empty());
        assert!(lint(&scenario).is_empty());
    }

    #[test]
    fn lint_reports_long_jump_ring_once() {
        let scenario = jump_chain(10_000, true);
        let warnings = lint(&scenario);
        // END is unreachable once the ring closes.
        assert_eq!(warnings.len(), 2, "{:?}", &warnings[..warnings.len().min(3)]);
        assert!(warnings[0].contains("'END' is unreachable"));
        let cycle = warnings[1].trim_start_matches("jump/branch cycle: ");
        assert_eq!(cycle.split(" -> ").count(), 10_001);
        assert!(cycle.starts_with("J0 -> J1 -> "));
        assert!(cycle.ends_with("J9999 -> J0"));
    }
}
