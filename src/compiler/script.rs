//! Blender script emission for offline assembly.
//!
//! The output is plain text and a pure function of the plan and catalog: no
//! timestamps, no paths from the machine that generated it (unless the caller
//! passes a model directory override). Missing model files are detected by the
//! script at run time inside Blender, never here.

use std::fmt::Write as _;

use crate::catalog::Catalog;
use crate::paths::MODELS_DIR;
use crate::model::{Action, ActionPlan, Part, PartChange};

/// Camera distance as a multiple of the largest dimension of the imported geometry.
pub const VIEW_DISTANCE_FACTOR: f64 = 2.5;

/// Line printed by the script once it has finished.
pub const COMPLETION_MARKER: &str = "capforge: assembly complete";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptOptions {
    /// Absolute directory holding the `.glb` files. `None` means `models/` next to
    /// the script (or the saved .blend file, or the working directory).
    pub model_dir: Option<String>,
}

const PRELUDE: &str = r"import os

import bpy
from mathutils import Vector

# --- Clear existing mesh objects ---
if bpy.context.active_object and bpy.context.active_object.mode != 'OBJECT':
    bpy.ops.object.mode_set(mode='OBJECT')
bpy.ops.object.select_all(action='DESELECT')
bpy.ops.object.select_by_type(type='MESH')
bpy.ops.object.delete()
";

const RESOLVE_MODEL_DIR: &str = r"
# --- Resolve model directory ---
def resolve_model_dir():
    if MODEL_DIR_OVERRIDE:
        return MODEL_DIR_OVERRIDE
    try:
        base = os.path.dirname(os.path.abspath(__file__))
    except NameError:
        base = ''
    if not base and bpy.data.filepath:
        base = os.path.dirname(bpy.data.filepath)
    if not base:
        base = os.getcwd()
    return os.path.join(base, MODELS_SUBDIR)


model_dir = resolve_model_dir()
imported = []


def import_part(label, model_file):
    model_path = os.path.join(model_dir, model_file)
    if not os.path.exists(model_path):
        print(f'Warning: model file not found for {label} at {model_path}')
        return
    before = set(bpy.data.objects)
    bpy.ops.import_scene.gltf(filepath=model_path)
    imported.extend(obj for obj in bpy.data.objects if obj not in before)
";

const FIT_VIEW: &str = r"
# --- Fit every 3D viewport to the imported geometry ---
def fit_view(objects):
    corners = [
        obj.matrix_world @ Vector(corner)
        for obj in objects
        if obj.type == 'MESH'
        for corner in obj.bound_box
    ]
    if not corners:
        print('No geometry imported; view left unchanged')
        return
    low = Vector((min(c.x for c in corners), min(c.y for c in corners), min(c.z for c in corners)))
    high = Vector((max(c.x for c in corners), max(c.y for c in corners), max(c.z for c in corners)))
    center = (low + high) / 2
    distance = VIEW_DISTANCE_FACTOR * max(max(high - low), 0.001)
    for window in bpy.context.window_manager.windows:
        for area in window.screen.areas:
            if area.type != 'VIEW_3D':
                continue
            for space in area.spaces:
                if space.type == 'VIEW_3D':
                    space.region_3d.view_location = center
                    space.region_3d.view_distance = distance


fit_view(imported)
";

/// Compile `plan` into a Blender script with default options.
pub fn compile(plan: &ActionPlan, catalog: &Catalog) -> String {
    compile_with(plan, catalog, &ScriptOptions::default())
}

/// Compile `plan` into a Blender script. Always succeeds: unresolved parts become
/// printed warnings in the script.
pub fn compile_with(plan: &ActionPlan, catalog: &Catalog, options: &ScriptOptions) -> String {
    let mut out = String::new();

    let title = plan.style_name.as_deref().unwrap_or("custom design");
    let _ = writeln!(out, "# capforge assembly script: {}", comment_text(title));
    out.push_str(PRELUDE);

    out.push('\n');
    let _ = writeln!(out, "VIEW_DISTANCE_FACTOR = {VIEW_DISTANCE_FACTOR:?}");
    let _ = writeln!(
        out,
        "MODEL_DIR_OVERRIDE = {}",
        options.model_dir.as_deref().map_or_else(|| "None".to_string(), py_str)
    );
    let _ = writeln!(out, "MODELS_SUBDIR = {}", py_str(MODELS_DIR));
    out.push_str(RESOLVE_MODEL_DIR);

    let mut unresolved = 0usize;
    for (i, action) in plan.actions.iter().enumerate() {
        let step = i + 1;
        out.push('\n');
        match action {
            Action::LoadAndPlace {
                part_type,
                part_name,
            } => {
                let _ = writeln!(out, "# --- Action {step}: load {} ---", comment_text(part_name));
                let found = catalog.find_by_name_fragment(part_type.as_deref(), part_name);
                unresolved += usize::from(!emit_placement(&mut out, found, part_type.as_deref(), part_name));
            }
            Action::ApplyStyle {
                style_name,
                part_changes,
            } => {
                let _ = writeln!(out, "# --- Action {step}: style {} ---", comment_text(style_name));
                if part_changes.is_empty() {
                    out.push_str("pass\n");
                }
                for PartChange {
                    part_type,
                    name_contains,
                } in part_changes
                {
                    let found = catalog.find_by_type_and_name_fragment(part_type, name_contains);
                    unresolved += usize::from(!emit_placement(&mut out, found, Some(part_type), name_contains));
                }
            }
            Action::ChangeProperty {
                target,
                property,
                value,
            } => {
                let _ = writeln!(
                    out,
                    "# --- Action {step}: {}.{} = {} (preview only) ---",
                    comment_text(target),
                    comment_text(property),
                    comment_text(&value.to_string())
                );
            }
        }
    }

    out.push_str(FIT_VIEW);
    let _ = writeln!(out, "print({})", py_str(COMPLETION_MARKER));

    tracing::info!(
        actions = plan.actions.len(),
        unresolved,
        bytes = out.len(),
        "compiled assembly script"
    );
    out
}

/// Emit one import call, or a printed warning when the reference is unresolved.
/// Returns whether the part resolved.
fn emit_placement(out: &mut String, found: Option<&Part>, part_type: Option<&str>, fragment: &str) -> bool {
    match found {
        Some(part) => {
            let _ = writeln!(out, "import_part({}, {})", py_str(&part.name), py_str(&part.model_file));
            true
        }
        None => {
            let message = match part_type {
                Some(part_type) => format!("Warning: no {part_type} part matches '{fragment}'; skipped"),
                None => format!("Warning: no part matches '{fragment}'; skipped"),
            };
            let _ = writeln!(out, "print({})", py_str(&message));
            false
        }
    }
}

/// Render `s` as a single-quoted Python string literal.
pub fn py_str(s: &str) -> String {
    let mut lit = String::with_capacity(s.len() + 2);
    lit.push('\'');
    for c in s.chars() {
        match c {
            '\\' => lit.push_str("\\\\"),
            '\'' => lit.push_str("\\'"),
            '\n' => lit.push_str("\\n"),
            '\r' => lit.push_str("\\r"),
            '\t' => lit.push_str("\\t"),
            c if c.is_control() => {
                let _ = write!(lit, "\\u{:04x}", u32::from(c));
            }
            c => lit.push(c),
        }
    }
    lit.push('\'');
    lit
}

/// Text safe to place after `#`: control characters become spaces.
fn comment_text(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use indexmap::IndexMap;

    use super::*;
    use crate::model::PropertyValue;

    fn part(part_type: &str, name: &str, file: &str) -> Part {
        Part {
            part_type: part_type.to_string(),
            name: name.to_string(),
            material: "Cotton".to_string(),
            unit_cost: 1.0,
            model_file: file.to_string(),
            attributes: IndexMap::new(),
        }
    }

    fn catalog() -> Catalog {
        Catalog::from_parts(vec![
            part("Crown", "6-Panel Classic", "crown_a.glb"),
            part("Brim", "Curved Brim", "brim_a.glb"),
            part("Strap", "Metal Buckle Strap", "strap_a.glb"),
        ])
    }

    fn place(part_type: Option<&str>, name: &str) -> Action {
        Action::LoadAndPlace {
            part_type: part_type.map(str::to_string),
            part_name: name.to_string(),
        }
    }

    fn assembly() -> ActionPlan {
        ActionPlan::new(vec![
            place(Some("Crown"), "classic"),
            place(None, "curved"),
            place(None, "Flat Brim"),
        ])
    }

    #[test]
    fn compile_is_deterministic() {
        let a = compile(&assembly(), &catalog());
        let b = compile(&assembly(), &catalog());
        assert_eq!(a, b);
    }

    #[test]
    fn resolved_parts_are_imported_unresolved_are_warned() {
        let script = compile(&assembly(), &catalog());
        assert!(script.contains("import_part('6-Panel Classic', 'crown_a.glb')"));
        assert!(script.contains("import_part('Curved Brim', 'brim_a.glb')"));
        assert!(!script.contains("strap_a.glb"));
        assert!(script.contains(r"print('Warning: no part matches \'Flat Brim\'; skipped')"));
        assert_eq!(script.matches("import_part('").count(), 2);
    }

    #[test]
    fn script_has_every_section_in_order() {
        let script = compile(&assembly(), &catalog());
        let clear = script.find("bpy.ops.object.delete()").unwrap();
        let dir = script.find("model_dir = resolve_model_dir()").unwrap();
        let first_import = script.find("import_part('6-Panel").unwrap();
        let fit = script.find("fit_view(imported)").unwrap();
        let done = script.find(COMPLETION_MARKER).unwrap();
        assert!(clear < dir && dir < first_import && first_import < fit && fit < done);
        assert!(script.contains("VIEW_DISTANCE_FACTOR = 2.5\n"));
        assert!(script.contains("bpy.ops.import_scene.gltf(filepath=model_path)"));
        assert!(script.contains("if not os.path.exists(model_path):"));
        assert!(script.ends_with("print('capforge: assembly complete')\n"));
    }

    #[test]
    fn empty_plan_still_produces_a_runnable_script() {
        let script = compile(&ActionPlan::default(), &catalog());
        assert!(script.contains("bpy.ops.object.delete()"));
        assert!(script.contains("fit_view(imported)"));
        assert!(script.contains(COMPLETION_MARKER));
        assert!(!script.contains("import_part('"));
    }

    #[test]
    fn model_dir_override_is_embedded() {
        let script = compile(&assembly(), &catalog());
        assert!(script.contains("MODEL_DIR_OVERRIDE = None\n"));
        assert!(script.contains("MODELS_SUBDIR = 'models'\n"));

        let options = ScriptOptions {
            model_dir: Some(r"C:\caps\models".to_string()),
        };
        let script = compile_with(&assembly(), &catalog(), &options);
        assert!(script.contains(r"MODEL_DIR_OVERRIDE = 'C:\\caps\\models'"));
    }

    #[test]
    fn style_and_property_actions_are_rendered() {
        let plan = ActionPlan {
            style_name: Some("baseball cap".to_string()),
            actions: vec![
                Action::ApplyStyle {
                    style_name: "baseball cap".to_string(),
                    part_changes: vec![PartChange::new("Crown", "6-panel"), PartChange::new("Brim", "Flat")],
                },
                Action::ChangeProperty {
                    target: "logo".to_string(),
                    property: "scale".to_string(),
                    value: PropertyValue::Number(2.0),
                },
            ],
        };
        let script = compile(&plan, &catalog());
        assert!(script.starts_with("# capforge assembly script: baseball cap\n"));
        assert!(script.contains("import_part('6-Panel Classic', 'crown_a.glb')"));
        assert!(script.contains(r"print('Warning: no Brim part matches \'Flat\'; skipped')"));
        assert!(script.contains("# --- Action 2: logo.scale = 2 (preview only) ---"));
    }

    #[test]
    fn hostile_names_cannot_escape_literals_or_comments() {
        let catalog = Catalog::from_parts(vec![part(
            "Crown",
            "O'Neil \"Pro\"\nbpy.ops.wm.quit_blender()",
            "it's.glb",
        )]);
        let plan = ActionPlan {
            style_name: Some("evil\nbpy.ops.wm.quit_blender()".to_string()),
            actions: vec![place(None, "o'neil")],
        };
        let script = compile(&plan, &catalog);
        assert!(script.contains(r#"import_part('O\'Neil "Pro"\nbpy.ops.wm.quit_blender()', 'it\'s.glb')"#));
        assert!(!script
            .lines()
            .any(|line| line.trim_start().starts_with("bpy.ops.wm.quit_blender")));
    }

    #[test]
    fn py_str_escapes() {
        assert_eq!(py_str("plain"), "'plain'");
        assert_eq!(py_str(r"a\b"), r"'a\\b'");
        assert_eq!(py_str("tab\there"), r"'tab\there'");
        assert_eq!(py_str("bell\u{7}"), r"'bell\u0007'");
    }
}
