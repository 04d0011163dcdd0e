use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use capforge::catalog::{Catalog, PartFilter};
use capforge::compiler::{self, ApplyOptions, ScriptOptions};
use capforge::describe;
use capforge::error::{AppError, InterpretError};
use capforge::interpreter::{InterpretMode, Interpreter};
use capforge::llm::{Credential, HttpReasoningService};
use capforge::model::{ActionPlan, DesignConfiguration, PersonaDefinition};
use capforge::paths;
use capforge::project::{atomic_write, ProjectError};
use capforge::scene::SceneDocument;
use capforge::session::Session;
use capforge::settings::{self, AppSettings, LlmConfigInfo, LlmProvider};

// ── CLI argument parsing ─────────────────────────────────────────

#[derive(Parser)]
#[command(name = "capforge-cli", about = "Assemble hats from a part catalog with natural language", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Part catalog (CSV, or TSV when the extension is .tsv)
    #[arg(long, global = true, default_value = "catalog.csv")]
    catalog: PathBuf,

    /// Persona definition (.json/.yaml). Defaults to the built-in persona.
    #[arg(long, global = true)]
    persona: Option<PathBuf>,

    /// Directory holding settings.json and the API key
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    /// Reasoning provider override for this run
    #[arg(long, global = true, value_enum)]
    provider: Option<LlmProvider>,

    /// Output raw JSON instead of formatted text
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List catalog parts, optionally filtered
    Parts {
        /// Keep only these part types (repeatable)
        #[arg(long = "type")]
        part_types: Vec<String>,
        /// Keep only these materials (repeatable)
        #[arg(long = "material")]
        materials: Vec<String>,
        #[arg(long)]
        min_cost: Option<f64>,
        #[arg(long)]
        max_cost: Option<f64>,
    },
    /// Part types, materials and cost range of the catalog
    Facets,
    /// Styles known to the persona
    Styles,
    /// Interpret a command and print the plan without applying it
    Interpret {
        command: String,
        #[arg(long, value_enum, default_value_t = Mode::Preview)]
        mode: Mode,
    },
    /// Interpret a command and apply it to an empty design
    Apply { command: String },
    /// Apply a persona style without calling the reasoning service
    Style { name: String },
    /// Write a Blender assembly script
    Script {
        /// What to build. Ignored when --style is given.
        command: Option<String>,
        /// Use a persona style instead of interpreting a command
        #[arg(long)]
        style: Option<String>,
        /// Output file, or "-" for stdout
        #[arg(long, short, default_value = paths::DEFAULT_SCRIPT_FILE)]
        output: String,
        /// Directory with the model files, baked into the script
        #[arg(long)]
        model_dir: Option<PathBuf>,
    },
    /// Interactive design session over stdin
    Chat,
    /// Show current settings
    Settings,
    /// Store the API key (empty string removes it)
    SetKey { key: String },
}

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    Preview,
    Assembly,
}

impl From<Mode> for InterpretMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Preview => InterpretMode::Preview,
            Mode::Assembly => InterpretMode::Assembly,
        }
    }
}

// ── Context ──────────────────────────────────────────────────────

struct Context {
    config_dir: PathBuf,
    settings: AppSettings,
    json: bool,
}

impl Context {
    fn load(cli: &Cli) -> Result<Self, AppError> {
        let config_dir = cli.config_dir.clone().unwrap_or_else(paths::default_config_dir);
        let mut settings = settings::load_settings(&config_dir)?;
        if let Some(provider) = cli.provider {
            settings.llm.provider = provider;
        }
        Ok(Self {
            config_dir,
            settings,
            json: cli.json,
        })
    }

    fn interpreter(&self, mode: InterpretMode) -> Result<Interpreter, AppError> {
        let timeout = self.settings.request_timeout();
        let service = HttpReasoningService::new(&self.settings.llm, timeout)
            .map_err(InterpretError::from)?;
        let credential = self.settings.llm.api_key.clone().and_then(Credential::new);
        Ok(Interpreter::new(Arc::new(service), credential)
            .with_mode(mode)
            .with_timeout(timeout))
    }

    fn apply_options(&self) -> ApplyOptions {
        ApplyOptions {
            fallback_color: self.settings.fallback_color(),
        }
    }

    /// Print `value` as pretty JSON with `--json`, otherwise the text rendering.
    fn emit<T: Serialize>(&self, value: &T, text: impl FnOnce() -> String) {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
        } else {
            println!("{}", text());
        }
    }
}

fn load_persona(path: Option<&Path>) -> Result<PersonaDefinition, AppError> {
    let persona = match path {
        Some(path) => PersonaDefinition::load(path)?,
        None => PersonaDefinition::builtin()?,
    };
    Ok(persona)
}

fn style_plan(persona: &PersonaDefinition, name: &str) -> Result<ActionPlan, AppError> {
    let (style, hints) = persona.style(name).ok_or_else(|| {
        let known: Vec<&str> = persona.knowledge_base.keys().map(String::as_str).collect();
        AppError::Validation(format!("Unknown style '{name}'. Known styles: {}", known.join(", ")))
    })?;
    Ok(ActionPlan::from_style(style, hints))
}

// ── Commands ─────────────────────────────────────────────────────

async fn run(cli: Cli) -> Result<(), AppError> {
    let ctx = Context::load(&cli)?;

    match cli.command {
        Commands::Settings => {
            #[derive(Serialize)]
            struct SettingsView<'a> {
                config_dir: String,
                asset_base_url: &'a str,
                request_timeout_secs: u64,
                fallback_brim_color: String,
                llm: LlmConfigInfo,
            }
            let view = SettingsView {
                config_dir: ctx.config_dir.display().to_string(),
                asset_base_url: &ctx.settings.asset_base_url,
                request_timeout_secs: ctx.settings.request_timeout_secs,
                fallback_brim_color: ctx.settings.fallback_color().to_string(),
                llm: LlmConfigInfo::from_config(&ctx.settings.llm),
            };
            println!("{}", serde_json::to_string_pretty(&view).unwrap_or_default());
            return Ok(());
        }
        Commands::SetKey { ref key } => {
            settings::save_api_key(&ctx.config_dir, key)?;
            if key.trim().is_empty() {
                println!("API key removed.");
            } else {
                println!("API key saved to {}", paths::credentials_path(&ctx.config_dir).display());
            }
            return Ok(());
        }
        Commands::Styles => {
            let persona = load_persona(cli.persona.as_deref())?;
            ctx.emit(&persona.knowledge_base, || describe::describe_styles(&persona));
            return Ok(());
        }
        _ => {}
    }

    let catalog = Arc::new(Catalog::load(&cli.catalog)?);

    match cli.command {
        Commands::Parts {
            part_types,
            materials,
            min_cost,
            max_cost,
        } => {
            let filter = PartFilter {
                part_types: (!part_types.is_empty()).then_some(part_types),
                materials: (!materials.is_empty()).then_some(materials),
                min_cost,
                max_cost,
            };
            let parts = catalog.filter(&filter);
            ctx.emit(&parts, || describe::describe_parts(parts.iter().copied()));
        }
        Commands::Facets => {
            #[derive(Serialize)]
            struct Facets<'a> {
                part_types: Vec<&'a str>,
                materials: Vec<&'a str>,
                max_unit_cost: Option<f64>,
            }
            let facets = Facets {
                part_types: catalog.part_types(),
                materials: catalog.materials(),
                max_unit_cost: catalog.max_unit_cost(),
            };
            ctx.emit(&facets, || describe::describe_catalog(&catalog));
        }
        Commands::Interpret { ref command, mode } => {
            let persona = load_persona(cli.persona.as_deref())?;
            let plan = ctx
                .interpreter(mode.into())?
                .interpret(command, &persona, catalog.parts())
                .await?;
            ctx.emit(&plan, || describe::describe_plan(&plan));
        }
        Commands::Apply { ref command } => {
            let persona = Arc::new(load_persona(cli.persona.as_deref())?);
            let mut session = new_session(&ctx, catalog, persona, InterpretMode::Preview)?;
            let outcome = session.submit(command).await?;
            ctx.emit(&outcome, || {
                outcome_text(&outcome.plan, &outcome.warnings, session.config())
            });
        }
        Commands::Style { ref name } => {
            let persona = load_persona(cli.persona.as_deref())?;
            let plan = style_plan(&persona, name)?;
            let applied =
                compiler::apply_with(&plan, &catalog, &DesignConfiguration::new(), &ctx.apply_options());
            let scene = SceneDocument::from_config(&applied.config, &ctx.settings.asset_base_url);
            ctx.emit(&scene, || outcome_text(&plan, &applied.warnings, &applied.config));
        }
        Commands::Script {
            ref command,
            ref style,
            ref output,
            ref model_dir,
        } => {
            let persona = load_persona(cli.persona.as_deref())?;
            let plan = match (style, command) {
                (Some(name), _) => style_plan(&persona, name)?,
                (None, Some(command)) => {
                    ctx.interpreter(InterpretMode::Assembly)?
                        .interpret(command, &persona, catalog.parts())
                        .await?
                }
                (None, None) => {
                    return Err(AppError::Validation(
                        "Give a command to interpret or --style NAME".to_string(),
                    ))
                }
            };

            let model_dir = model_dir
                .as_deref()
                .map(std::path::absolute)
                .transpose()
                .map_err(ProjectError::from)?
                .map(|p| p.display().to_string());
            let script = compiler::compile_with(&plan, &catalog, &ScriptOptions { model_dir });

            if output == "-" {
                print!("{script}");
            } else {
                atomic_write(Path::new(output), script.as_bytes())?;
                eprintln!("{}", describe::describe_plan(&plan));
                eprintln!("Script written to {output}");
            }
        }
        Commands::Chat => {
            let persona = Arc::new(load_persona(cli.persona.as_deref())?);
            let session = new_session(&ctx, catalog, persona, InterpretMode::Preview)?;
            run_chat(&ctx, session).await?;
        }
        Commands::Settings | Commands::SetKey { .. } | Commands::Styles => {}
    }

    Ok(())
}

fn new_session(
    ctx: &Context,
    catalog: Arc<Catalog>,
    persona: Arc<PersonaDefinition>,
    mode: InterpretMode,
) -> Result<Session, AppError> {
    Ok(Session::new(catalog, persona, ctx.interpreter(mode)?)
        .with_asset_base_url(ctx.settings.asset_base_url.clone())
        .with_apply_options(ctx.apply_options()))
}

fn outcome_text(
    plan: &ActionPlan,
    warnings: &[capforge::error::PlanWarning],
    config: &DesignConfiguration,
) -> String {
    let mut sections = vec![describe::describe_plan(plan)];
    if !warnings.is_empty() {
        sections.push(describe::describe_warnings(warnings));
    }
    sections.push(describe::describe_config(config));
    sections.join("\n\n")
}

// ── Chat mode ────────────────────────────────────────────────────

const CHAT_HELP: &str = "Type a request (\"make the brim navy\"), or:\n  /style NAME  apply a persona style\n  /show        print the current design\n  /scene       print the scene document\n  /reset       start over\n  /quit        exit";

async fn run_chat(ctx: &Context, mut session: Session) -> Result<(), AppError> {
    if !session.interpreter().has_credential() {
        eprintln!("No API key configured; only /style commands will work. Run `set-key` or set {}.", paths::API_KEY_ENV);
    }
    println!("{CHAT_HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        let _ = std::io::stdout().flush();

        let Some(line) = lines.next_line().await.map_err(ProjectError::from)? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match line.split_once(' ').map_or((line, ""), |(head, rest)| (head, rest.trim())) {
            ("/quit" | "/exit", _) => break,
            ("/help", _) => println!("{CHAT_HELP}"),
            ("/reset", _) => {
                session.reset();
                println!("Design cleared.");
            }
            ("/show", _) => println!("{}", describe::describe_config(session.config())),
            ("/scene", _) => println!(
                "{}",
                serde_json::to_string_pretty(&session.scene()).unwrap_or_default()
            ),
            ("/style", name) => match style_plan(session.persona(), name) {
                Ok(plan) => {
                    let outcome = session.apply_plan(plan);
                    ctx.emit(&outcome, || outcome_text(&outcome.plan, &outcome.warnings, session.config()));
                }
                Err(e) => eprintln!("{e}"),
            },
            _ => match session.submit(line).await {
                Ok(outcome) => {
                    ctx.emit(&outcome, || outcome_text(&outcome.plan, &outcome.warnings, session.config()));
                }
                // Recoverable: report and keep the session going.
                Err(e @ InterpretError::MalformedResponse { .. }) => {
                    eprintln!("{e}");
                    eprintln!("Try rephrasing your request.");
                }
                Err(e) => eprintln!("{e}"),
            },
        }
    }
    Ok(())
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "capforge=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
