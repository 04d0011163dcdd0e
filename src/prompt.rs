//! Prompt construction for the command interpreter.

use serde_json::Value;

use crate::interpreter::InterpretMode;
use crate::model::{ActionKind, ActionPlan, Part, PersonaDefinition};

/// Worked examples, one per action kind, showing the exact output shape.
fn examples_for(kind: ActionKind) -> &'static [(&'static str, &'static str)] {
    match kind {
        ActionKind::ChangeProperty => &[
            (
                "make the logo 2x bigger",
                r#"{"action": "change_property", "target": "logo", "property": "scale", "value": 2.0}"#,
            ),
            (
                "give it a navy brim",
                r#"{"action": "change_property", "target": "brim", "property": "color", "value": "navy"}"#,
            ),
        ],
        ActionKind::ApplyStyle => &[
            (
                "I want a cowboy hat",
                r#"{"action": "apply_style", "style_name": "cowboy hat", "part_changes": [{"part_type": "Crown", "name_contains": "Cattleman"}, {"part_type": "Brim", "name_contains": "Wide"}]}"#,
            ),
            (
                "swap in a flat brim",
                r#"{"action": "apply_style", "style_name": "flat brim", "part_changes": [{"part_type": "Brim", "name_contains": "Flat"}]}"#,
            ),
        ],
        ActionKind::LoadAndPlace => &[
            (
                "a baseball cap with a metal buckle",
                r#"{"actions": [{"action": "load_and_place", "part_type": "Crown", "part_name": "6-Panel Classic"}, {"action": "load_and_place", "part_type": "Brim", "part_name": "Curved Brim"}, {"action": "load_and_place", "part_type": "Strap", "part_name": "Metal Buckle Strap"}]}"#,
            ),
            (
                "just the leather strap",
                r#"{"action": "load_and_place", "part_type": "Strap", "part_name": "Leather Strap"}"#,
            ),
        ],
    }
}

const MULTI_ACTION_EXAMPLE: (&str, &str) = (
    "a trucker cap with a red brim",
    r#"{"style_name": "trucker cap", "actions": [{"action": "apply_style", "style_name": "trucker cap", "part_changes": [{"part_type": "Crown", "name_contains": "Trucker"}]}, {"action": "change_property", "target": "brim", "property": "color", "value": "red"}]}"#,
);

fn goal(mode: InterpretMode) -> &'static str {
    match mode {
        InterpretMode::Preview => {
            "Your goal is to translate the user's command into a structured JSON action that updates the live 3D preview of a hat."
        }
        InterpretMode::Assembly => {
            "Your goal is to translate the user's command into a structured JSON action plan that assembles a hat from catalog parts in an offline 3D tool. The primary action is `load_and_place`. If the user asks for a style, use your knowledge base to decide which parts to load."
        }
    }
}

/// Build the full prompt for one command.
///
/// Everything the reasoning service may rely on is in here: persona, the
/// permitted action kinds, style presets, the whole catalog snapshot, the plan
/// schema and worked examples.
pub fn build_prompt(
    command: &str,
    persona: &PersonaDefinition,
    catalog_snapshot: &[Part],
    mode: InterpretMode,
    allowed: &[ActionKind],
) -> String {
    let mut lines = Vec::new();

    lines.push(format!("You are {}.", persona.role.trim()));
    if !persona.personality.trim().is_empty() {
        lines.push(format!("Your personality is: {}.", persona.personality.trim()));
    }
    lines.push(goal(mode).to_string());
    lines.push(String::new());

    lines.push("Actions you may emit:".to_string());
    for kind in allowed {
        lines.push(format!("  - {kind}"));
    }
    let extra: Vec<String> = persona
        .capabilities
        .iter()
        .filter(|c| c.action_kind().is_none_or(|k| allowed.contains(&k)))
        .map(crate::model::Capability::label)
        .collect();
    if !extra.is_empty() {
        lines.push(format!("Your capabilities are: {}", to_json(&extra)));
    }
    if allowed.contains(&ActionKind::ChangeProperty) {
        lines.push(
            "Properties you may change: logo.scale (positive number), brim.color (color name or #rrggbb)."
                .to_string(),
        );
    }
    lines.push(String::new());

    lines.push(format!(
        "Your knowledge base for styles is: {}",
        to_json(&persona.knowledge_base)
    ));
    lines.push(format!(
        "You have these parts available to you (this is the entire catalog): {}",
        to_json(&catalog_snapshot)
    ));
    lines.push(String::new());

    lines.push(
        "Your response MUST be a single, valid JSON object and nothing else. It is either one action object with an \"action\" field, or an object with an \"actions\" list. Refer to parts by a fragment of their catalog name."
            .to_string(),
    );
    lines.push(format!(
        "Schema: {}",
        to_json(&ActionPlan::json_schema())
    ));
    lines.push(String::new());

    lines.push("EXAMPLES:".to_string());
    for kind in allowed {
        for (user, response) in examples_for(*kind) {
            lines.push(format!("- User: \"{user}\" -> {response}"));
        }
    }
    if allowed.contains(&ActionKind::ApplyStyle) && allowed.contains(&ActionKind::ChangeProperty) {
        let (user, response) = MULTI_ACTION_EXAMPLE;
        lines.push(format!("- User: \"{user}\" -> {response}"));
    }
    lines.push(String::new());

    lines.push("Now, parse this command:".to_string());
    lines.push(format!("User command: {}", to_json(&command)));
    lines.push(String::new());
    lines.push("JSON Response:".to_string());

    lines.join("\n")
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| Value::Null.to_string())
}
