use serde::{Deserialize, Serialize};

/// Lower bound every variable is clamped to.
pub const VARIABLE_MIN: i32 = 0;
/// Upper bound every variable is clamped to.
pub const VARIABLE_MAX: i32 = 100;

/// Names of the fixed set of numeric variables a scenario can touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VariableKey {
    /// Childhood friend affection.
    AffectionA,
    /// Senior affection.
    AffectionB,
    /// Junior affection.
    AffectionC,
    Honesty,
    Resolve,
}

impl VariableKey {
    pub const ALL: [VariableKey; 5] = [
        Self::AffectionA,
        Self::AffectionB,
        Self::AffectionC,
        Self::Honesty,
        Self::Resolve,
    ];

    /// The key as it appears in scenario documents (e.g. "affectionA").
    pub fn name(&self) -> &'static str {
        match self {
            Self::AffectionA => "affectionA",
            Self::AffectionB => "affectionB",
            Self::AffectionC => "affectionC",
            Self::Honesty => "honesty",
            Self::Resolve => "resolve",
        }
    }

    /// Parse a document key. Returns `None` for names outside the fixed set.
    pub fn from_name(name: &str) -> Option<VariableKey> {
        Self::ALL.into_iter().find(|key| key.name() == name)
    }
}

impl std::fmt::Display for VariableKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Clamp a raw value into `[VARIABLE_MIN, VARIABLE_MAX]`.
pub fn clamp_variable(value: i32) -> i32 {
    value.clamp(VARIABLE_MIN, VARIABLE_MAX)
}

/// Relationship and trait counters for one playthrough.
///
/// Deserialized values are clamped, so configs and saves can never carry
/// a variable outside the range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "RawVariables")]
pub struct GameVariables {
    pub affection_a: i32,
    pub affection_b: i32,
    pub affection_c: i32,
    pub honesty: i32,
    pub resolve: i32,
}

impl Default for GameVariables {
    fn default() -> Self {
        Self {
            affection_a: 0,
            affection_b: 0,
            affection_c: 0,
            honesty: 50,
            resolve: 50,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawVariables {
    affection_a: i32,
    affection_b: i32,
    affection_c: i32,
    honesty: i32,
    resolve: i32,
}

impl From<RawVariables> for GameVariables {
    fn from(raw: RawVariables) -> Self {
        GameVariables {
            affection_a: raw.affection_a,
            affection_b: raw.affection_b,
            affection_c: raw.affection_c,
            honesty: raw.honesty,
            resolve: raw.resolve,
        }
        .clamped()
    }
}

impl GameVariables {
    /// A copy with every variable pulled into range.
    pub fn clamped(self) -> Self {
        Self {
            affection_a: clamp_variable(self.affection_a),
            affection_b: clamp_variable(self.affection_b),
            affection_c: clamp_variable(self.affection_c),
            honesty: clamp_variable(self.honesty),
            resolve: clamp_variable(self.resolve),
        }
    }

    pub fn get(&self, key: VariableKey) -> i32 {
        match key {
            VariableKey::AffectionA => self.affection_a,
            VariableKey::AffectionB => self.affection_b,
            VariableKey::AffectionC => self.affection_c,
            VariableKey::Honesty => self.honesty,
            VariableKey::Resolve => self.resolve,
        }
    }

    /// Store `value` under `key`, clamped to the variable range.
    pub fn set(&mut self, key: VariableKey, value: i32) {
        let slot = match key {
            VariableKey::AffectionA => &mut self.affection_a,
            VariableKey::AffectionB => &mut self.affection_b,
            VariableKey::AffectionC => &mut self.affection_c,
            VariableKey::Honesty => &mut self.honesty,
            VariableKey::Resolve => &mut self.resolve,
        };
        *slot = clamp_variable(value);
    }

    /// Look a variable up by its document name.
    pub fn get_by_name(&self, name: &str) -> Option<i32> {
        VariableKey::from_name(name).map(|key| self.get(key))
    }

    /// Iterate `(key, value)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (VariableKey, i32)> + '_ {
        VariableKey::ALL.into_iter().map(|key| (key, self.get(key)))
    }
}
