/// Condition and effect evaluation over variables and flags.
///
/// Every function here is pure: inputs are borrowed, outputs are new values.

use crate::schema::condition::{Condition, Effect, EffectOp, FlagEffect, FlagOp};
use crate::schema::flags::GameFlags;
use crate::schema::node::{BranchNode, Choice};
use crate::schema::variables::GameVariables;

/// Test a condition. Never fails: unknown variables and unsupported
/// comparators evaluate to `false`.
pub fn evaluate(condition: &Condition, variables: &GameVariables, flags: &GameFlags) -> bool {
    match condition {
        Condition::Flag { key, expected } => flags.is_set(key) == *expected,
        Condition::Variable { key, op, value } => match variables.get_by_name(key) {
            Some(current) => op.compare(current, *value),
            None => false,
        },
    }
}

/// Apply effects in order, clamping after each one so later effects see
/// the clamped result of earlier ones.
pub fn apply_effects(effects: &[Effect], variables: &GameVariables) -> GameVariables {
    let mut next = *variables;
    for effect in effects {
        let current = next.get(effect.key);
        let raw = match effect.op {
            EffectOp::Set => effect.value,
            EffectOp::Inc => current.saturating_add(effect.value),
            EffectOp::Dec => current.saturating_sub(effect.value),
        };
        next.set(effect.key, raw);
    }
    next
}

/// Apply flag effects in order. `Unset` removes the key outright.
pub fn apply_flag_effects(flag_effects: &[FlagEffect], flags: &GameFlags) -> GameFlags {
    let mut next = flags.clone();
    for effect in flag_effects {
        match effect.op {
            FlagOp::Set => next.insert(effect.key.clone()),
            FlagOp::Unset => next.remove(&effect.key),
        }
    }
    next
}

/// Choices whose condition holds (or that have none), in authored order.
pub fn available_choices<'a>(
    choices: &'a [Choice],
    variables: &GameVariables,
    flags: &GameFlags,
) -> Vec<&'a Choice> {
    choices
        .iter()
        .filter(|choice| match &choice.condition {
            Some(condition) => evaluate(condition, variables, flags),
            None => true,
        })
        .collect()
}

/// First-match branch resolution: the `next` of the first arm whose
/// condition holds, else the node's default.
pub fn resolve_branch<'a>(
    node: &'a BranchNode,
    variables: &GameVariables,
    flags: &GameFlags,
) -> &'a str {
    node.branches
        .iter()
        .find(|arm| evaluate(&arm.condition, variables, flags))
        .map(|arm| arm.next.as_str())
        .unwrap_or(node.default_next.as_str())
}
