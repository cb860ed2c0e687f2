use serde::{Deserialize, Serialize};

use super::condition::{Condition, Effect, FlagEffect};

/// One selectable option of a choice node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Choice {
    pub text: String,
    /// Visibility predicate. `None` means always visible.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub effects: Vec<Effect>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flag_effects: Vec<FlagEffect>,
    pub next: String,
}

/// A line of dialogue or narration. An empty speaker means narration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneNode {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub speaker: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub effects: Vec<Effect>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flag_effects: Vec<FlagEffect>,
    pub next: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceNode {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    pub choices: Vec<Choice>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JumpNode {
    #[serde(default)]
    pub id: String,
    pub next: String,
}

/// One guarded arm of a branch node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchArm {
    pub condition: Condition,
    pub next: String,
}

/// Conditional jump: the first arm whose condition holds wins, otherwise
/// `default_next`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchNode {
    #[serde(default)]
    pub id: String,
    pub branches: Vec<BranchArm>,
    #[serde(rename = "default")]
    pub default_next: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndNode {
    #[serde(default)]
    pub id: String,
    pub ending_id: String,
    pub ending_title: String,
    pub ending_text: String,
}

/// A node of the scenario graph, discriminated by the document's `type` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum GameNode {
    Scene(SceneNode),
    Choice(ChoiceNode),
    Jump(JumpNode),
    Branch(BranchNode),
    End(EndNode),
}

/// Fieldless mirror of [`GameNode`] for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Scene,
    Choice,
    Jump,
    Branch,
    End,
}

impl NodeKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Scene => "scene",
            Self::Choice => "choice",
            Self::Jump => "jump",
            Self::Branch => "branch",
            Self::End => "end",
        }
    }

    /// Whether the player must act before the story moves on.
    pub fn is_interactive(&self) -> bool {
        matches!(self, Self::Scene | Self::Choice)
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl GameNode {
    pub fn id(&self) -> &str {
        match self {
            Self::Scene(n) => &n.id,
            Self::Choice(n) => &n.id,
            Self::Jump(n) => &n.id,
            Self::Branch(n) => &n.id,
            Self::End(n) => &n.id,
        }
    }

    pub(crate) fn id_mut(&mut self) -> &mut String {
        match self {
            Self::Scene(n) => &mut n.id,
            Self::Choice(n) => &mut n.id,
            Self::Jump(n) => &mut n.id,
            Self::Branch(n) => &mut n.id,
            Self::End(n) => &mut n.id,
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Self::Scene(_) => NodeKind::Scene,
            Self::Choice(_) => NodeKind::Choice,
            Self::Jump(_) => NodeKind::Jump,
            Self::Branch(_) => NodeKind::Branch,
            Self::End(_) => NodeKind::End,
        }
    }

    /// Every node id this node can transition to, in authored order.
    pub fn targets(&self) -> Vec<&str> {
        match self {
            Self::Scene(n) => vec![n.next.as_str()],
            Self::Jump(n) => vec![n.next.as_str()],
            Self::Choice(n) => n.choices.iter().map(|c| c.next.as_str()).collect(),
            Self::Branch(n) => n
                .branches
                .iter()
                .map(|b| b.next.as_str())
                .chain(std::iter::once(n.default_next.as_str()))
                .collect(),
            Self::End(_) => Vec::new(),
        }
    }
}
