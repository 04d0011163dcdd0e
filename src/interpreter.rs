//! Command interpreter: natural language in, validated [`ActionPlan`] out.
//!
//! Understanding is delegated to a [`ReasoningService`]; this module owns the
//! prompt, the timeout, and the validation of whatever text comes back. The raw
//! response is untrusted: it is checked as a `serde_json::Value` before any
//! typed [`Action`] is built, and a single bad action rejects the whole plan.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{InterpretError, TransportFailure};
use crate::llm::{Credential, ReasoningService};
use crate::model::{Action, ActionKind, ActionPlan, Part, PartChange, PersonaDefinition, PropertyValue};
use crate::prompt::build_prompt;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Which family of actions the interpreter produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterpretMode {
    /// Property changes and style swaps for the live preview.
    #[default]
    Preview,
    /// `load_and_place` steps for the offline script.
    Assembly,
}

impl InterpretMode {
    pub fn action_kinds(self) -> &'static [ActionKind] {
        match self {
            InterpretMode::Preview => &[ActionKind::ChangeProperty, ActionKind::ApplyStyle],
            InterpretMode::Assembly => &[ActionKind::LoadAndPlace],
        }
    }
}

pub struct Interpreter {
    service: Arc<dyn ReasoningService>,
    credential: Option<Credential>,
    mode: InterpretMode,
    timeout: Duration,
}

impl Interpreter {
    pub fn new(service: Arc<dyn ReasoningService>, credential: Option<Credential>) -> Self {
        Self {
            service,
            credential,
            mode: InterpretMode::default(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_mode(mut self, mode: InterpretMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn mode(&self) -> InterpretMode {
        self.mode
    }

    pub fn has_credential(&self) -> bool {
        self.credential.is_some()
    }

    /// Action kinds this interpreter accepts for `persona`: the mode's kinds,
    /// narrowed to those the persona names when it names any.
    pub fn allowed_kinds(&self, persona: &PersonaDefinition) -> Vec<ActionKind> {
        let declared = persona.declared_action_kinds();
        self.mode
            .action_kinds()
            .iter()
            .copied()
            .filter(|k| declared.is_empty() || declared.contains(k))
            .collect()
    }

    /// Turn `command` into a validated plan with exactly one call to the
    /// reasoning service. Nothing is retried.
    pub async fn interpret(
        &self,
        command: &str,
        persona: &PersonaDefinition,
        catalog_snapshot: &[Part],
    ) -> Result<ActionPlan, InterpretError> {
        let Some(credential) = &self.credential else {
            return Err(InterpretError::MissingCredential);
        };

        let allowed = self.allowed_kinds(persona);
        if allowed.is_empty() {
            tracing::warn!(mode = ?self.mode, role = %persona.role, "persona declares no action kinds for this mode");
            return Err(InterpretError::malformed(
                format!("no action kinds available in {:?} mode for this persona", self.mode),
                "",
            ));
        }
        let prompt = build_prompt(command, persona, catalog_snapshot, self.mode, &allowed);
        tracing::debug!(mode = ?self.mode, prompt_chars = prompt.len(), "interpreting command");

        let raw = match tokio::time::timeout(self.timeout, self.service.complete(credential, &prompt)).await {
            Ok(Ok(text)) => text,
            Ok(Err(failure)) => {
                tracing::warn!(status = ?failure.status, "reasoning service failed: {failure}");
                return Err(failure.into());
            }
            Err(_) => {
                tracing::warn!(timeout = ?self.timeout, "reasoning service timed out");
                return Err(TransportFailure::timeout(self.timeout).into());
            }
        };

        let plan = parse_response(&raw, &allowed, catalog_snapshot)?;
        tracing::info!(
            actions = plan.actions.len(),
            style = plan.style_name.as_deref().unwrap_or(""),
            "interpreted command"
        );
        Ok(plan)
    }
}

// ── Response validation ──────────────────────────────────────────

/// Parse and validate a raw completion into a plan.
///
/// Accepts a single action object or an object with an `actions` list, optionally
/// fenced or surrounded by prose. Historical key spellings are normalized (see
/// [`normalize_action`]). `catalog_snapshot` is used to translate exact model-file
/// references into name fragments.
pub fn parse_response(
    raw: &str,
    allowed: &[ActionKind],
    catalog_snapshot: &[Part],
) -> Result<ActionPlan, InterpretError> {
    let value = extract_json(raw)
        .ok_or_else(|| InterpretError::malformed("response is not valid JSON", raw))?;
    let top = value
        .as_object()
        .ok_or_else(|| InterpretError::malformed("top level must be a JSON object", raw))?;

    let top_style = optional_str(top, &["style_name"]);
    let raw_actions: Vec<&Value> = match top.get("actions") {
        Some(Value::Array(actions)) => actions.iter().collect(),
        Some(_) => return Err(InterpretError::malformed("\"actions\" must be a list", raw)),
        None if top.contains_key("action") => vec![&value],
        None => {
            return Err(InterpretError::malformed(
                "missing \"action\" discriminator or \"actions\" list",
                raw,
            ))
        }
    };

    let mut actions = Vec::with_capacity(raw_actions.len());
    for (i, raw_action) in raw_actions.into_iter().enumerate() {
        let action = normalize_action(raw_action, top_style.as_deref(), catalog_snapshot)
            .map_err(|reason| InterpretError::malformed(format!("action {}: {reason}", i + 1), raw))?;
        if !allowed.contains(&action.kind()) {
            return Err(InterpretError::malformed(
                format!("action {}: \"{}\" is not permitted here", i + 1, action.kind()),
                raw,
            ));
        }
        actions.push(action);
    }

    let style_name = top_style.or_else(|| {
        actions.iter().find_map(|a| match a {
            Action::ApplyStyle { style_name, .. } if !style_name.is_empty() => {
                Some(style_name.clone())
            }
            _ => None,
        })
    });

    Ok(ActionPlan {
        style_name,
        actions,
    })
}

/// Remove a Markdown code fence (with optional language tag) around the payload.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(after_open) = trimmed.find("```").and_then(|i| trimmed.get(i + 3..)) else {
        return trimmed;
    };
    let body = after_open.trim_start_matches(|c: char| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    let body = match body.find("```") {
        Some(close) => body.get(..close).unwrap_or(body),
        None => body,
    };
    body.trim()
}

fn extract_json(raw: &str) -> Option<Value> {
    // Stray fence markers after a bare object leave nothing useful once
    // stripped, so fall back to the untouched text.
    parse_object_text(strip_code_fence(raw)).or_else(|| parse_object_text(raw.trim()))
}

fn parse_object_text(text: &str) -> Option<Value> {
    if let Ok(value) = serde_json::from_str::<Value>(text) {
        return Some(value);
    }
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(text.get(start..=end)?).ok()
}

/// Validate one action object and map it onto the canonical schema.
///
/// Accepted spellings beyond the canonical ones:
/// `changes` for `part_changes`; `name`/`part_name` for `name_contains`;
/// `new_model_file`/`model_file` resolved to a part name through the snapshot;
/// `name` for `part_name`; `style` for `style_name`.
fn normalize_action(
    value: &Value,
    default_style: Option<&str>,
    catalog_snapshot: &[Part],
) -> Result<Action, String> {
    let obj = value.as_object().ok_or("expected a JSON object")?;
    let kind_raw = obj
        .get("action")
        .ok_or("missing \"action\" discriminator")?
        .as_str()
        .ok_or("\"action\" must be a string")?;
    let kind =
        ActionKind::parse(kind_raw).ok_or_else(|| format!("unrecognized action kind \"{kind_raw}\""))?;

    match kind {
        ActionKind::ChangeProperty => {
            let target = required_str(obj, &["target"])?;
            let property = required_str(obj, &["property"])?;
            let value = match obj.get("value") {
                Some(Value::Number(n)) => {
                    PropertyValue::Number(n.as_f64().ok_or("\"value\" is out of range")?)
                }
                Some(Value::String(s)) => PropertyValue::Text(s.trim().to_string()),
                Some(_) => return Err("\"value\" must be a number or a string".to_string()),
                None => return Err("missing \"value\"".to_string()),
            };
            Ok(Action::ChangeProperty {
                target,
                property,
                value,
            })
        }
        ActionKind::ApplyStyle => {
            let style_name = optional_str(obj, &["style_name", "style"])
                .or_else(|| default_style.map(str::to_string))
                .unwrap_or_default();
            let entries = obj
                .get("part_changes")
                .or_else(|| obj.get("changes"))
                .ok_or("missing \"part_changes\" list")?
                .as_array()
                .ok_or("\"part_changes\" must be a list")?;
            let part_changes = entries
                .iter()
                .map(|entry| normalize_part_change(entry, catalog_snapshot))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Action::ApplyStyle {
                style_name,
                part_changes,
            })
        }
        ActionKind::LoadAndPlace => Ok(Action::LoadAndPlace {
            part_type: optional_str(obj, &["part_type"]),
            part_name: required_str(obj, &["part_name", "name"])?,
        }),
    }
}

fn normalize_part_change(entry: &Value, catalog_snapshot: &[Part]) -> Result<PartChange, String> {
    let obj = entry.as_object().ok_or("part change must be a JSON object")?;
    let part_type = optional_str(obj, &["part_type"]);

    if let Some(fragment) = optional_str(obj, &["name_contains", "name", "part_name"]) {
        let part_type = part_type.ok_or("part change is missing \"part_type\"")?;
        return Ok(PartChange::new(part_type, fragment));
    }

    let model_file = optional_str(obj, &["new_model_file", "model_file"])
        .ok_or("part change needs \"name_contains\"")?;
    match catalog_snapshot.iter().find(|p| p.has_model_file(&model_file)) {
        Some(part) => Ok(PartChange::new(
            part_type.unwrap_or_else(|| part.part_type.clone()),
            part.name.clone(),
        )),
        // Unknown file: keep it as the fragment so the compiler reports it as
        // an unresolved reference.
        None => Ok(PartChange::new(
            part_type.ok_or("part change is missing \"part_type\"")?,
            model_file,
        )),
    }
}

/// First of `keys` holding a non-blank string, trimmed.
fn optional_str(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| obj.get(*k).and_then(Value::as_str))
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

fn required_str(obj: &Map<String, Value>, keys: &[&str]) -> Result<String, String> {
    optional_str(obj, keys).ok_or_else(|| {
        let first = keys.first().copied().unwrap_or_default();
        format!("missing \"{first}\"")
    })
}
