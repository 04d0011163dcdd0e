use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One row of the part catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    /// Crown, Brim, Strap, Logo, ...
    pub part_type: String,
    /// Display name; fuzzy part references match against it.
    pub name: String,
    pub material: String,
    #[serde(rename = "unit_cost_usd")]
    pub unit_cost: f64,
    /// Opaque file reference. Existence is checked by the renderers, not here.
    pub model_file: String,
    /// Any non-required catalog columns, in header order.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub attributes: IndexMap<String, String>,
}

impl Part {
    /// Case-insensitive, whitespace-tolerant comparison on `part_type`.
    pub fn is_type(&self, part_type: &str) -> bool {
        fold(&self.part_type) == fold(part_type)
    }

    /// Case-insensitive substring test on `name`. A blank fragment matches nothing.
    pub fn name_contains(&self, fragment: &str) -> bool {
        let fragment = fold(fragment);
        !fragment.is_empty() && fold(&self.name).contains(&fragment)
    }

    /// Exact `model_file` comparison, ignoring case and surrounding whitespace.
    pub fn has_model_file(&self, model_file: &str) -> bool {
        fold(&self.model_file) == fold(model_file)
    }
}

/// Normalization used for every case-insensitive comparison in the crate.
pub(crate) fn fold(s: &str) -> String {
    s.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn crown() -> Part {
        Part {
            part_type: "Crown".to_string(),
            name: "6-Panel Classic".to_string(),
            material: "Cotton Twill".to_string(),
            unit_cost: 2.5,
            model_file: "crown_a.glb".to_string(),
            attributes: IndexMap::new(),
        }
    }

    #[test]
    fn type_match_ignores_case_and_whitespace() {
        assert!(crown().is_type(" crown "));
        assert!(!crown().is_type("Brim"));
    }

    #[test]
    fn name_fragment_is_case_insensitive() {
        assert!(crown().name_contains("classic"));
        assert!(crown().name_contains("6-PANEL"));
        assert!(!crown().name_contains("Trucker"));
    }

    #[test]
    fn model_file_match_is_exact_but_case_insensitive() {
        assert!(crown().has_model_file("CROWN_A.glb "));
        assert!(!crown().has_model_file("crown_a"));
        assert!(!crown().has_model_file("crown_b.glb"));
    }

    #[test]
    fn blank_fragment_matches_nothing() {
        assert!(!crown().name_contains(""));
        assert!(!crown().name_contains("   "));
    }
}
