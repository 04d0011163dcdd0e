//! Declarative scene document consumed by the browser preview.

use serde::Serialize;
use ts_rs::TS;

use crate::model::{Color, DesignConfiguration};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct ScenePart {
    #[serde(rename = "type")]
    pub part_type: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export)]
pub struct SceneDocument {
    pub parts: Vec<ScenePart>,
    pub logo_scale: f64,
    #[ts(type = "string")]
    pub brim_color: Color,
}

impl SceneDocument {
    /// Project `config` for the viewer, resolving each model file against
    /// `asset_base_url`.
    pub fn from_config(config: &DesignConfiguration, asset_base_url: &str) -> Self {
        Self {
            parts: config
                .parts
                .iter()
                .map(|slot| ScenePart {
                    part_type: slot.part_type.clone(),
                    url: asset_url(asset_base_url, &slot.model_file),
                })
                .collect(),
            logo_scale: config.logo_scale,
            brim_color: config.brim_color,
        }
    }
}

/// `base` without trailing slashes + `/` + `model_file` without leading slashes.
pub fn asset_url(base: &str, model_file: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        model_file.trim_start_matches('/')
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn asset_urls_join_with_one_slash() {
        assert_eq!(asset_url("/models", "crown_a.glb"), "/models/crown_a.glb");
        assert_eq!(asset_url("/models/", "/crown_a.glb"), "/models/crown_a.glb");
        assert_eq!(
            asset_url("https://cdn.example.com/caps//", "brim_a.glb"),
            "https://cdn.example.com/caps/brim_a.glb"
        );
    }

    #[test]
    fn scene_document_shape() {
        let mut config = DesignConfiguration::new();
        config.insert_part("Crown", "crown_a.glb");
        config.insert_part("Brim", "brim_a.glb");
        config.brim_color = Color::rgb(0, 0, 0x80);

        let scene = SceneDocument::from_config(&config, "/models");
        let json = serde_json::to_value(&scene).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "parts": [
                    { "type": "Crown", "url": "/models/crown_a.glb" },
                    { "type": "Brim", "url": "/models/brim_a.glb" },
                ],
                "logo_scale": 1.0,
                "brim_color": "#000080",
            })
        );
    }
}
