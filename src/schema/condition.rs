use serde::{Deserialize, Serialize};

use super::variables::VariableKey;

/// Binary comparison used by variable conditions.
///
/// Parsed from the operator string in the document. Operators outside the
/// supported set are kept as `Unsupported` so the document still loads; such
/// a condition never matches.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Comparator {
    #[default]
    Ge,
    Le,
    Eq,
    Gt,
    Lt,
    Ne,
    Unsupported(String),
}

impl Comparator {
    pub fn symbol(&self) -> &str {
        match self {
            Self::Ge => ">=",
            Self::Le => "<=",
            Self::Eq => "==",
            Self::Gt => ">",
            Self::Lt => "<",
            Self::Ne => "!=",
            Self::Unsupported(raw) => raw,
        }
    }

    /// Apply the comparison `lhs <op> rhs`. Unsupported operators yield `false`.
    pub fn compare(&self, lhs: i32, rhs: i32) -> bool {
        match self {
            Self::Ge => lhs >= rhs,
            Self::Le => lhs <= rhs,
            Self::Eq => lhs == rhs,
            Self::Gt => lhs > rhs,
            Self::Lt => lhs < rhs,
            Self::Ne => lhs != rhs,
            Self::Unsupported(_) => false,
        }
    }
}

impl From<String> for Comparator {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            ">=" => Self::Ge,
            "<=" => Self::Le,
            "==" => Self::Eq,
            ">" => Self::Gt,
            "<" => Self::Lt,
            "!=" => Self::Ne,
            _ => Self::Unsupported(raw),
        }
    }
}

impl From<Comparator> for String {
    fn from(op: Comparator) -> Self {
        op.symbol().to_string()
    }
}

fn default_expected() -> bool {
    true
}

/// A read-only predicate over flags or variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Condition {
    /// True when the flag's presence equals `expected`.
    Flag {
        key: String,
        #[serde(default = "default_expected")]
        expected: bool,
    },
    /// True when `variables[key] <op> value`. Unknown keys never match.
    Variable {
        key: String,
        #[serde(default)]
        op: Comparator,
        #[serde(default)]
        value: i32,
    },
}

impl Condition {
    pub fn flag(key: impl Into<String>) -> Self {
        Self::Flag {
            key: key.into(),
            expected: true,
        }
    }

    pub fn flag_absent(key: impl Into<String>) -> Self {
        Self::Flag {
            key: key.into(),
            expected: false,
        }
    }

    pub fn variable(key: VariableKey, op: Comparator, value: i32) -> Self {
        Self::Variable {
            key: key.name().to_string(),
            op,
            value,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EffectOp {
    Set,
    Inc,
    Dec,
}

/// A mutation of one variable. Results are clamped after each application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Effect {
    pub op: EffectOp,
    pub key: VariableKey,
    pub value: i32,
}

impl Effect {
    pub fn set(key: VariableKey, value: i32) -> Self {
        Self {
            op: EffectOp::Set,
            key,
            value,
        }
    }

    pub fn inc(key: VariableKey, value: i32) -> Self {
        Self {
            op: EffectOp::Inc,
            key,
            value,
        }
    }

    pub fn dec(key: VariableKey, value: i32) -> Self {
        Self {
            op: EffectOp::Dec,
            key,
            value,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlagOp {
    Set,
    Unset,
}

/// Sets or removes one flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagEffect {
    pub op: FlagOp,
    pub key: String,
}

impl FlagEffect {
    pub fn set(key: impl Into<String>) -> Self {
        Self {
            op: FlagOp::Set,
            key: key.into(),
        }
    }

    pub fn unset(key: impl Into<String>) -> Self {
        Self {
            op: FlagOp::Unset,
            key: key.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_condition_defaults_to_expected_true() {
        let cond: Condition = serde_json::from_str(r#"{"type":"flag","key":"met"}"#).unwrap();
        assert_eq!(cond, Condition::flag("met"));
    }

    #[test]
    fn variable_condition_defaults() {
        let cond: Condition =
            serde_json::from_str(r#"{"type":"variable","key":"honesty"}"#).unwrap();
        assert_eq!(
            cond,
            Condition::Variable {
                key: "honesty".to_string(),
                op: Comparator::Ge,
                value: 0,
            }
        );
    }

    #[test]
    fn comparator_symbols_parse() {
        for symbol in [">=", "<=", "==", ">", "<", "!="] {
            let op = Comparator::from(symbol.to_string());
            assert!(!matches!(op, Comparator::Unsupported(_)), "{symbol}");
            assert_eq!(op.symbol(), symbol);
        }
    }

    #[test]
    fn unknown_comparator_loads_and_never_matches() {
        let cond: Condition =
            serde_json::from_str(r#"{"type":"variable","key":"honesty","op":"~=","value":1}"#)
                .unwrap();
        match cond {
            Condition::Variable { op, .. } => {
                assert_eq!(op, Comparator::Unsupported("~=".to_string()));
                assert!(!op.compare(5, 1));
                assert!(!op.compare(1, 1));
            }
            other => panic!("expected variable condition, got {other:?}"),
        }
    }

    #[test]
    fn effect_parses_document_shape() {
        let effect: Effect =
            serde_json::from_str(r#"{"op":"inc","key":"affectionA","value":10}"#).unwrap();
        assert_eq!(effect, Effect::inc(VariableKey::AffectionA, 10));
    }

    #[test]
    fn flag_effect_parses_document_shape() {
        let effect: FlagEffect = serde_json::from_str(r#"{"op":"unset","key":"angry"}"#).unwrap();
        assert_eq!(effect, FlagEffect::unset("angry"));
    }
}
