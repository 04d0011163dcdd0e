use serde::{Deserialize, Serialize};

use super::color::Color;
use super::part::fold;

pub const DEFAULT_LOGO_SCALE: f64 = 1.0;

/// The active model for one part type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartSlot {
    #[serde(rename = "type")]
    pub part_type: String,
    pub model_file: String,
}

/// Session-scoped design state. Only the plan compiler produces new values of
/// this type; the interpreter never touches it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignConfiguration {
    /// At most one slot per part type, in first-insertion order.
    pub parts: Vec<PartSlot>,
    pub logo_scale: f64,
    pub brim_color: Color,
}

impl Default for DesignConfiguration {
    fn default() -> Self {
        Self {
            parts: Vec::new(),
            logo_scale: DEFAULT_LOGO_SCALE,
            brim_color: Color::NEUTRAL_GRAY,
        }
    }
}

impl DesignConfiguration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put `model_file` in the slot for `part_type`. An existing slot of the same
    /// type (case-insensitive) is replaced in place; otherwise a slot is appended.
    pub fn insert_part(&mut self, part_type: &str, model_file: &str) {
        let wanted = fold(part_type);
        if let Some(slot) = self.parts.iter_mut().find(|s| fold(&s.part_type) == wanted) {
            slot.part_type = part_type.to_string();
            slot.model_file = model_file.to_string();
        } else {
            self.parts.push(PartSlot {
                part_type: part_type.to_string(),
                model_file: model_file.to_string(),
            });
        }
    }

    pub fn part(&self, part_type: &str) -> Option<&PartSlot> {
        let wanted = fold(part_type);
        self.parts.iter().find(|s| fold(&s.part_type) == wanted)
    }

    /// Set the logo scale. Rejects non-finite and non-positive values.
    pub fn set_logo_scale(&mut self, scale: f64) -> Result<(), String> {
        if !scale.is_finite() {
            return Err("scale must be finite".to_string());
        }
        if scale <= 0.0 {
            return Err("scale must be positive".to_string());
        }
        self.logo_scale = scale;
        Ok(())
    }
}
