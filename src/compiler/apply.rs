use serde::Serialize;

use crate::catalog::Catalog;
use crate::error::PlanWarning;
use crate::model::part::fold;
use crate::model::{Action, ActionPlan, Color, DesignConfiguration, Part, PropertyValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApplyOptions {
    /// Brim color used when a `change_property` names a color we can't parse.
    pub fallback_color: Color,
}

impl Default for ApplyOptions {
    fn default() -> Self {
        Self {
            fallback_color: Color::NEUTRAL_GRAY,
        }
    }
}

/// Result of applying a plan: the new configuration plus every non-fatal problem.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Applied {
    pub config: DesignConfiguration,
    pub warnings: Vec<PlanWarning>,
}

/// Properties a `change_property` action may set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Property {
    LogoScale,
    BrimColor,
}

impl Property {
    fn resolve(target: &str, property: &str) -> Option<Self> {
        match (fold(target).as_str(), fold(property).as_str()) {
            ("logo", "scale") => Some(Property::LogoScale),
            ("brim", "color" | "colour") => Some(Property::BrimColor),
            _ => None,
        }
    }
}

/// Apply `plan` to a copy of `config` with default options.
pub fn apply(plan: &ActionPlan, catalog: &Catalog, config: &DesignConfiguration) -> Applied {
    apply_with(plan, catalog, config, &ApplyOptions::default())
}

/// Apply `plan` to a copy of `config`. Never fails: unresolvable parts, unknown
/// properties and bad values become warnings and leave the affected field as it
/// was. Actions run in order, so later ones win.
pub fn apply_with(
    plan: &ActionPlan,
    catalog: &Catalog,
    config: &DesignConfiguration,
    options: &ApplyOptions,
) -> Applied {
    let mut next = config.clone();
    let mut warnings = Vec::new();

    for action in &plan.actions {
        match action {
            Action::ChangeProperty {
                target,
                property,
                value,
            } => {
                if let Err(warning) = change_property(&mut next, target, property, value, options) {
                    tracing::warn!(%warning, "change_property skipped");
                    warnings.push(warning);
                }
            }
            Action::ApplyStyle { part_changes, .. } => {
                for change in part_changes {
                    let found =
                        catalog.find_by_type_and_name_fragment(&change.part_type, &change.name_contains);
                    place(&mut next, &mut warnings, found, Some(&change.part_type), &change.name_contains);
                }
            }
            Action::LoadAndPlace {
                part_type,
                part_name,
            } => {
                let found = catalog.find_by_name_fragment(part_type.as_deref(), part_name);
                place(&mut next, &mut warnings, found, part_type.as_deref(), part_name);
            }
        }
    }

    tracing::info!(
        actions = plan.actions.len(),
        warnings = warnings.len(),
        parts = next.parts.len(),
        "applied plan"
    );
    Applied {
        config: next,
        warnings,
    }
}

fn place(
    config: &mut DesignConfiguration,
    warnings: &mut Vec<PlanWarning>,
    found: Option<&Part>,
    part_type: Option<&str>,
    name_contains: &str,
) {
    match found {
        Some(part) => config.insert_part(&part.part_type, &part.model_file),
        None => {
            let warning = PlanWarning::UnresolvedPart {
                part_type: part_type.map(str::to_string),
                name_contains: name_contains.to_string(),
            };
            tracing::warn!(%warning, "part reference unresolved");
            warnings.push(warning);
        }
    }
}

fn change_property(
    config: &mut DesignConfiguration,
    target: &str,
    property: &str,
    value: &PropertyValue,
    options: &ApplyOptions,
) -> Result<(), PlanWarning> {
    let invalid = |reason: String| PlanWarning::InvalidValue {
        target: target.to_string(),
        property: property.to_string(),
        value: value.to_string(),
        reason,
    };

    match Property::resolve(target, property) {
        Some(Property::LogoScale) => {
            let scale = coerce_scale(value).map_err(invalid)?;
            config.set_logo_scale(scale).map_err(invalid)
        }
        Some(Property::BrimColor) => {
            let raw = value.to_string();
            config.brim_color = Color::parse(&raw).unwrap_or_else(|| {
                tracing::debug!(value = %raw, fallback = %options.fallback_color, "unknown color, using fallback");
                options.fallback_color
            });
            Ok(())
        }
        None => Err(PlanWarning::UnknownProperty {
            target: target.to_string(),
            property: property.to_string(),
        }),
    }
}

/// Numbers pass through; strings like `"2.0"`, `"2"` or `"1.5x"` are parsed.
fn coerce_scale(value: &PropertyValue) -> Result<f64, String> {
    match value {
        PropertyValue::Number(n) => Ok(*n),
        PropertyValue::Text(s) => {
            let trimmed = s.trim();
            let digits = trimmed
                .strip_suffix(['x', 'X'])
                .unwrap_or(trimmed)
                .trim();
            digits
                .parse::<f64>()
                .map_err(|_| format!("\"{trimmed}\" is not a number"))
        }
    }
}
