use std::fmt;

use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::part::fold;

/// Discriminator of an [`Action`], as it appears in the `action` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    ChangeProperty,
    ApplyStyle,
    LoadAndPlace,
}

impl ActionKind {
    pub const ALL: [ActionKind; 3] = [
        ActionKind::ChangeProperty,
        ActionKind::ApplyStyle,
        ActionKind::LoadAndPlace,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::ChangeProperty => "change_property",
            ActionKind::ApplyStyle => "apply_style",
            ActionKind::LoadAndPlace => "load_and_place",
        }
    }

    /// Accepts `apply_style`, `Apply Style`, `apply-style`, ...
    pub fn parse(s: &str) -> Option<Self> {
        let normalized: String = fold(s)
            .chars()
            .map(|c| if c == '-' || c == ' ' { '_' } else { c })
            .collect();
        Self::ALL.into_iter().find(|k| k.as_str() == normalized)
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fuzzy part reference: the first catalog row of `part_type` whose name
/// contains `name_contains`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PartChange {
    pub part_type: String,
    pub name_contains: String,
}

impl PartChange {
    pub fn new(part_type: impl Into<String>, name_contains: impl Into<String>) -> Self {
        Self {
            part_type: part_type.into(),
            name_contains: name_contains.into(),
        }
    }
}

/// Raw value of a `change_property` action. Coercion to the property's real
/// type happens when the plan is applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum PropertyValue {
    Number(f64),
    Text(String),
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Number(n) => write!(f, "{n}"),
            PropertyValue::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    /// Set one scalar field of the design configuration.
    ChangeProperty {
        target: String,
        property: String,
        value: PropertyValue,
    },
    /// Swap a batch of parts, each chosen by fuzzy name match.
    ApplyStyle {
        style_name: String,
        part_changes: Vec<PartChange>,
    },
    /// Import one part into the offline scene. `part_type` narrows the lookup
    /// when present.
    LoadAndPlace {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        part_type: Option<String>,
        part_name: String,
    },
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::ChangeProperty { .. } => ActionKind::ChangeProperty,
            Action::ApplyStyle { .. } => ActionKind::ApplyStyle,
            Action::LoadAndPlace { .. } => ActionKind::LoadAndPlace,
        }
    }
}

/// Ordered list of actions. Later actions win when they touch the same field.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct ActionPlan {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style_name: Option<String>,
    pub actions: Vec<Action>,
}

impl ActionPlan {
    pub fn new(actions: Vec<Action>) -> Self {
        Self {
            style_name: None,
            actions,
        }
    }

    /// Build a single `apply_style` plan from a knowledge-base preset.
    pub fn from_style(style_name: &str, hints: &[PartChange]) -> Self {
        Self {
            style_name: Some(style_name.to_string()),
            actions: vec![Action::ApplyStyle {
                style_name: style_name.to_string(),
                part_changes: hints.to_vec(),
            }],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// JSON Schema of the canonical plan shape, embedded in interpreter prompts.
    pub fn json_schema() -> Value {
        let root = schema_for!(ActionPlan);
        serde_json::to_value(root).unwrap_or(Value::Null)
    }
}
