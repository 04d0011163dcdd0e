use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::part::fold;
use super::plan::{ActionKind, PartChange};
use crate::error::PersonaLoadError;
use crate::project::{parse_document, read_document, DocumentFormat};

const BUILTIN_PERSONA: &str = include_str!("../../demos/persona.json");

/// Behavioral contract of the command interpreter: who it is, which actions it
/// may emit, and which style presets it knows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonaDefinition {
    pub role: String,
    pub personality: String,
    #[serde(default)]
    pub capabilities: Vec<Capability>,
    /// Style name → part-selection hints, in document order.
    #[serde(default)]
    pub knowledge_base: IndexMap<String, Vec<PartChange>>,
}

/// A capability descriptor. Either a bare string (`"apply_style"`, or free text)
/// or an object naming the action kind with a description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Capability {
    Named(String),
    Described {
        action: String,
        #[serde(default)]
        description: String,
    },
}

impl Capability {
    /// The action kind this capability grants, if it names one.
    pub fn action_kind(&self) -> Option<ActionKind> {
        match self {
            Capability::Named(name) => ActionKind::parse(name),
            Capability::Described { action, .. } => ActionKind::parse(action),
        }
    }

    pub fn label(&self) -> String {
        match self {
            Capability::Named(name) => name.clone(),
            Capability::Described { action, description } if description.is_empty() => {
                action.clone()
            }
            Capability::Described { action, description } => format!("{action}: {description}"),
        }
    }
}

impl PersonaDefinition {
    /// Load a persona from a `.json`, `.yaml` or `.yml` file.
    pub fn load(path: &Path) -> Result<Self, PersonaLoadError> {
        let persona: Self = read_document(path)?;
        persona.validate()?;
        tracing::info!(
            path = %path.display(),
            styles = persona.knowledge_base.len(),
            "loaded persona"
        );
        Ok(persona)
    }

    /// The persona shipped with the crate (`demos/persona.json`).
    pub fn builtin() -> Result<Self, PersonaLoadError> {
        let persona: Self = parse_document(BUILTIN_PERSONA, DocumentFormat::Json)?;
        persona.validate()?;
        Ok(persona)
    }

    fn validate(&self) -> Result<(), PersonaLoadError> {
        if self.role.trim().is_empty() {
            return Err(PersonaLoadError::Invalid("role must not be empty".to_string()));
        }
        for (style, hints) in &self.knowledge_base {
            if style.trim().is_empty() {
                return Err(PersonaLoadError::Invalid(
                    "knowledge_base contains an unnamed style".to_string(),
                ));
            }
            if let Some(bad) = hints
                .iter()
                .find(|h| h.part_type.trim().is_empty() || h.name_contains.trim().is_empty())
            {
                return Err(PersonaLoadError::Invalid(format!(
                    "style \"{style}\" has an incomplete hint: {bad:?}"
                )));
            }
        }
        Ok(())
    }

    /// Action kinds explicitly named by the capabilities list, in order, deduplicated.
    pub fn declared_action_kinds(&self) -> Vec<ActionKind> {
        let mut kinds = Vec::new();
        for kind in self.capabilities.iter().filter_map(Capability::action_kind) {
            if !kinds.contains(&kind) {
                kinds.push(kind);
            }
        }
        kinds
    }

    /// Case-insensitive lookup of a knowledge-base style.
    pub fn style(&self, name: &str) -> Option<(&str, &[PartChange])> {
        let wanted = fold(name);
        self.knowledge_base
            .iter()
            .find(|(style, _)| fold(style) == wanted)
            .map(|(style, hints)| (style.as_str(), hints.as_slice()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn builtin_persona_is_valid() {
        let persona = PersonaDefinition::builtin().expect("builtin persona parses");
        assert!(!persona.role.is_empty());
        assert!(persona.style("Baseball Cap").is_some());
        assert!(persona
            .declared_action_kinds()
            .contains(&ActionKind::ApplyStyle));
    }

    #[test]
    fn capabilities_accept_strings_and_objects() {
        let json = r#"{
            "role": "a hat designer",
            "personality": "concise",
            "capabilities": [
                "change_property",
                {"action": "apply_style", "description": "swap parts by style"},
                "chat about hats"
            ]
        }"#;
        let persona: PersonaDefinition = parse_document(json, DocumentFormat::Json).unwrap();
        assert_eq!(
            persona.declared_action_kinds(),
            vec![ActionKind::ChangeProperty, ActionKind::ApplyStyle]
        );
        assert_eq!(
            persona.capabilities[1].label(),
            "apply_style: swap parts by style"
        );
        assert!(persona.knowledge_base.is_empty());
    }

    #[test]
    fn yaml_persona_keeps_style_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("persona.yaml");
        std::fs::write(
            &path,
            "role: designer\npersonality: calm\nknowledge_base:\n  trucker:\n    - {part_type: Crown, name_contains: Mesh}\n  bucket hat:\n    - {part_type: Brim, name_contains: Bucket}\n",
        )
        .unwrap();

        let persona = PersonaDefinition::load(&path).unwrap();
        let styles: Vec<&String> = persona.knowledge_base.keys().collect();
        assert_eq!(styles, ["trucker", "bucket hat"]);
        let (name, hints) = persona.style("BUCKET HAT").unwrap();
        assert_eq!(name, "bucket hat");
        assert_eq!(hints, [PartChange::new("Brim", "Bucket")]);
    }

    #[test]
    fn empty_role_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("persona.json");
        std::fs::write(&path, r#"{"role": " ", "personality": "x"}"#).unwrap();
        assert!(matches!(
            PersonaDefinition::load(&path),
            Err(PersonaLoadError::Invalid(_))
        ));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let result = PersonaDefinition::load(Path::new("/definitely/not/here.json"));
        assert!(matches!(result, Err(PersonaLoadError::Read(_))));
    }
}
