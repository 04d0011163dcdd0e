use crate::catalog::Catalog;
use crate::error::PlanWarning;
use crate::model::{Action, ActionPlan, DesignConfiguration, Part, PersonaDefinition};

/// Human-readable table of parts: type, name, material, cost, model file.
pub fn describe_parts<'a>(parts: impl IntoIterator<Item = &'a Part>) -> String {
    let parts: Vec<&Part> = parts.into_iter().collect();
    if parts.is_empty() {
        return "No parts match.".to_string();
    }

    let mut lines = Vec::new();
    lines.push(format!("Parts ({})", parts.len()));
    for p in parts {
        lines.push(format!(
            "  - [{}] {} ({}, ${:.2}) -> {}",
            p.part_type, p.name, p.material, p.unit_cost, p.model_file
        ));
    }
    lines.join("\n")
}

/// Facets for building a filter UI over the catalog.
pub fn describe_catalog(catalog: &Catalog) -> String {
    let mut lines = Vec::new();
    lines.push(format!("Catalog: {} parts", catalog.len()));
    lines.push(format!("  Types: {}", catalog.part_types().join(", ")));
    lines.push(format!("  Materials: {}", catalog.materials().join(", ")));
    if let Some(max) = catalog.max_unit_cost() {
        lines.push(format!("  Max unit cost: ${max:.2}"));
    }
    lines.join("\n")
}

pub fn describe_styles(persona: &PersonaDefinition) -> String {
    if persona.knowledge_base.is_empty() {
        return "No styles defined.".to_string();
    }

    let mut lines = Vec::new();
    lines.push(format!("Styles ({})", persona.knowledge_base.len()));
    for (style, hints) in &persona.knowledge_base {
        let picks: Vec<String> = hints
            .iter()
            .map(|h| format!("{} ~ \"{}\"", h.part_type, h.name_contains))
            .collect();
        lines.push(format!("  - {style}: {}", picks.join(", ")));
    }
    lines.join("\n")
}

pub fn describe_config(config: &DesignConfiguration) -> String {
    let mut lines = Vec::new();

    lines.push(format!("Parts ({})", config.parts.len()));
    if config.parts.is_empty() {
        lines.push("  (none selected)".to_string());
    }
    for slot in &config.parts {
        lines.push(format!("  - {}: {}", slot.part_type, slot.model_file));
    }
    lines.push(format!("Logo scale: {}", config.logo_scale));
    lines.push(format!("Brim color: {}", config.brim_color));

    lines.join("\n")
}

/// One line per action, in plan order.
pub fn describe_plan(plan: &ActionPlan) -> String {
    let mut lines = Vec::new();

    match &plan.style_name {
        Some(style) => lines.push(format!("Plan \"{style}\" ({} actions)", plan.actions.len())),
        None => lines.push(format!("Plan ({} actions)", plan.actions.len())),
    }
    for (i, action) in plan.actions.iter().enumerate() {
        let summary = match action {
            Action::ChangeProperty {
                target,
                property,
                value,
            } => format!("set {target}.{property} = {value}"),
            Action::ApplyStyle {
                style_name,
                part_changes,
            } => {
                let picks: Vec<String> = part_changes
                    .iter()
                    .map(|c| format!("{} ~ \"{}\"", c.part_type, c.name_contains))
                    .collect();
                format!("style \"{style_name}\": {}", picks.join(", "))
            }
            Action::LoadAndPlace {
                part_type: Some(part_type),
                part_name,
            } => format!("load {part_type} \"{part_name}\""),
            Action::LoadAndPlace {
                part_type: None,
                part_name,
            } => format!("load \"{part_name}\""),
        };
        lines.push(format!("  {}. {summary}", i + 1));
    }

    lines.join("\n")
}

pub fn describe_warnings(warnings: &[PlanWarning]) -> String {
    warnings
        .iter()
        .map(|w| format!("warning: {w}"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PartChange, PropertyValue};

    #[test]
    fn plan_lines_are_numbered() {
        let plan = ActionPlan {
            style_name: Some("trucker cap".to_string()),
            actions: vec![
                Action::ApplyStyle {
                    style_name: "trucker cap".to_string(),
                    part_changes: vec![PartChange::new("Crown", "Trucker")],
                },
                Action::ChangeProperty {
                    target: "brim".to_string(),
                    property: "color".to_string(),
                    value: PropertyValue::Text("red".to_string()),
                },
                Action::LoadAndPlace {
                    part_type: None,
                    part_name: "Buckle".to_string(),
                },
            ],
        };
        assert_eq!(
            describe_plan(&plan),
            "Plan \"trucker cap\" (3 actions)\n  1. style \"trucker cap\": Crown ~ \"Trucker\"\n  2. set brim.color = red\n  3. load \"Buckle\""
        );
    }

    #[test]
    fn empty_config_says_so() {
        let text = describe_config(&DesignConfiguration::new());
        assert!(text.contains("(none selected)"));
        assert!(text.contains("Brim color: #808080"));
    }

    #[test]
    fn warnings_are_prefixed() {
        let text = describe_warnings(&[PlanWarning::UnknownProperty {
            target: "logo".to_string(),
            property: "rotation".to_string(),
        }]);
        assert_eq!(text, "warning: Unknown property logo.rotation; ignored");
    }
}
