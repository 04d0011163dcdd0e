use std::sync::Arc;

use serde::Serialize;

use crate::catalog::Catalog;
use crate::compiler::{self, ApplyOptions};
use crate::error::{InterpretError, PlanWarning};
use crate::interpreter::Interpreter;
use crate::model::{ActionPlan, DesignConfiguration, PersonaDefinition};
use crate::scene::SceneDocument;
use crate::settings::DEFAULT_ASSET_BASE_URL;

// ── Design session ───────────────────────────────────────────────

/// One user's design session: the shared catalog and persona, the interpreter,
/// and the only mutable state, the current [`DesignConfiguration`].
///
/// Commands run one at a time. A command either produces a validated plan that
/// is applied, or fails before anything is applied.
pub struct Session {
    catalog: Arc<Catalog>,
    persona: Arc<PersonaDefinition>,
    interpreter: Interpreter,
    config: DesignConfiguration,
    asset_base_url: String,
    apply_options: ApplyOptions,
}

/// What a successful command hands back to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct CommandOutcome {
    pub plan: ActionPlan,
    pub warnings: Vec<PlanWarning>,
    pub scene: SceneDocument,
}

impl Session {
    pub fn new(catalog: Arc<Catalog>, persona: Arc<PersonaDefinition>, interpreter: Interpreter) -> Self {
        Self {
            catalog,
            persona,
            interpreter,
            config: DesignConfiguration::new(),
            asset_base_url: DEFAULT_ASSET_BASE_URL.to_string(),
            apply_options: ApplyOptions::default(),
        }
    }

    pub fn with_asset_base_url(mut self, url: impl Into<String>) -> Self {
        self.asset_base_url = url.into();
        self
    }

    pub fn with_apply_options(mut self, options: ApplyOptions) -> Self {
        self.apply_options = options;
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn persona(&self) -> &PersonaDefinition {
        &self.persona
    }

    pub fn interpreter(&self) -> &Interpreter {
        &self.interpreter
    }

    pub fn config(&self) -> &DesignConfiguration {
        &self.config
    }

    /// Interpret `command` and apply the result. On error the configuration is
    /// left exactly as it was.
    pub async fn submit(&mut self, command: &str) -> Result<CommandOutcome, InterpretError> {
        let plan = self
            .interpreter
            .interpret(command, &self.persona, self.catalog.parts())
            .await?;
        Ok(self.apply_plan(plan))
    }

    /// Apply an already validated plan (e.g. a knowledge-base style).
    pub fn apply_plan(&mut self, plan: ActionPlan) -> CommandOutcome {
        let applied = compiler::apply_with(&plan, &self.catalog, &self.config, &self.apply_options);
        self.config = applied.config;
        CommandOutcome {
            plan,
            warnings: applied.warnings,
            scene: self.scene(),
        }
    }

    pub fn scene(&self) -> SceneDocument {
        SceneDocument::from_config(&self.config, &self.asset_base_url)
    }

    /// Start over with an empty configuration.
    pub fn reset(&mut self) {
        self.config = DesignConfiguration::new();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use indexmap::IndexMap;

    use super::*;
    use crate::error::TransportFailure;
    use crate::llm::{Credential, ReasoningService};
    use crate::model::{Color, Part};

    /// Replies with each canned response in turn.
    struct Scripted {
        replies: Vec<Result<String, TransportFailure>>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ReasoningService for Scripted {
        async fn complete(&self, _: &Credential, _: &str) -> Result<String, TransportFailure> {
            let i = self.calls.fetch_add(1, Ordering::SeqCst);
            self.replies[i].clone()
        }
    }

    fn session(replies: Vec<Result<String, TransportFailure>>) -> Session {
        let part = |part_type: &str, name: &str, file: &str| Part {
            part_type: part_type.to_string(),
            name: name.to_string(),
            material: "Cotton".to_string(),
            unit_cost: 1.0,
            model_file: file.to_string(),
            attributes: IndexMap::new(),
        };
        let catalog = Catalog::from_parts(vec![
            part("Crown", "6-Panel Classic", "crown_a.glb"),
            part("Brim", "Curved Brim", "brim_a.glb"),
        ]);
        let service = Arc::new(Scripted {
            replies,
            calls: AtomicUsize::new(0),
        });
        let interpreter = Interpreter::new(service, Credential::new("key"));
        Session::new(
            Arc::new(catalog),
            Arc::new(PersonaDefinition::builtin().unwrap()),
            interpreter,
        )
        .with_asset_base_url("https://cdn.example.com/caps/")
    }

    #[tokio::test]
    async fn successful_command_updates_config_and_scene() {
        let mut session = session(vec![Ok(
            r#"{"action": "apply_style", "style_name": "classic", "part_changes": [{"part_type": "Crown", "name_contains": "classic"}]}"#.to_string(),
        )]);
        let outcome = session.submit("classic crown please").await.unwrap();
        assert!(outcome.warnings.is_empty());
        assert_eq!(outcome.scene.parts[0].url, "https://cdn.example.com/caps/crown_a.glb");
        assert_eq!(session.config().part("crown").unwrap().model_file, "crown_a.glb");
    }

    #[tokio::test]
    async fn failed_commands_leave_config_unchanged() {
        let mut session = session(vec![
            Ok(r#"{"action": "change_property", "target": "brim", "property": "color", "value": "red"}"#.to_string()),
            Ok("not json at all".to_string()),
            Err(TransportFailure::http(500, "boom")),
            Ok(r#"{"actions": [{"action": "change_property", "target": "brim", "property": "color", "value": "navy"}, {"action": "explode"}]}"#.to_string()),
        ]);
        session.submit("red brim").await.unwrap();
        let before = session.config().clone();
        assert_eq!(before.brim_color, Color::rgb(255, 0, 0));

        for command in ["blue brim", "green brim", "navy brim"] {
            assert!(session.submit(command).await.is_err());
            assert_eq!(session.config(), &before);
        }
    }

    #[test]
    fn styles_apply_without_the_reasoning_service() {
        let mut session = session(Vec::new());
        let plan = {
            let (name, hints) = session.persona().style("baseball cap").unwrap();
            ActionPlan::from_style(name, hints)
        };
        let outcome = session.apply_plan(plan);
        // The test catalog has a crown and a brim but no strap.
        assert_eq!(session.config().parts.len(), 2);
        assert_eq!(outcome.warnings.len(), 1);
        assert_eq!(outcome.plan.style_name.as_deref(), Some("Baseball Cap"));

        session.reset();
        assert_eq!(session.config(), &DesignConfiguration::new());
    }
}
