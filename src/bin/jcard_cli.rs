//! J-Card CLI - JSON bridge to the binding engine
//!
//! Commands: defaults, check, render, print
//! Outputs JSON (or HTML) to stdout, logs to stderr
//! Exit codes: 0 ok, 1 bad input, 2 configuration error or divergence

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use jcard_core::{
    BindingCatalog, EngineError, FieldKey, FieldKind, FieldRecord, FieldValue, JCard, Layout,
    PrintCopy, SelectedFile, SurfaceRole, Template,
};

#[derive(Parser)]
#[command(name = "jcard-cli")]
#[command(about = "J-Card CLI - live preview and print duplicate from one field set")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the default field-value record
    Defaults,

    /// Check a template against the naming contract
    Check {
        #[command(flatten)]
        page: PageArgs,
    },

    /// Render a record and print one surface
    Render {
        #[command(flatten)]
        page: PageArgs,

        #[command(flatten)]
        edits: EditArgs,

        /// Surface to output
        #[arg(short, long, value_enum, default_value_t = Surface::Duplicate)]
        surface: Surface,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = Format::Json)]
        format: Format,
    },

    /// Render a record and emit a print copy of the duplicate
    Print {
        #[command(flatten)]
        page: PageArgs,

        #[command(flatten)]
        edits: EditArgs,
    },
}

#[derive(Args)]
struct PageArgs {
    /// Template JSON file (built-in j-card when omitted)
    #[arg(short, long)]
    template: Option<PathBuf>,

    /// Selector of the container holding controls and preview
    #[arg(long, default_value = "#jcard")]
    container: String,

    /// Binding catalog JSON file (built-in j-card catalog when omitted)
    #[arg(long)]
    catalog: Option<PathBuf>,
}

#[derive(Args)]
struct EditArgs {
    /// Field-value record JSON file
    #[arg(short, long)]
    record: Option<PathBuf>,

    /// Edit a field after init, as key=value (repeatable)
    #[arg(long = "set", value_name = "KEY=VALUE")]
    sets: Vec<String>,

    /// Image file selected for the cover
    #[arg(long)]
    cover: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Surface {
    Preview,
    Duplicate,
}

impl From<Surface> for SurfaceRole {
    fn from(surface: Surface) -> Self {
        match surface {
            Surface::Preview => SurfaceRole::Preview,
            Surface::Duplicate => SurfaceRole::Duplicate,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Json,
    Html,
}

/// Failure with the exit code it maps to.
struct Failure {
    code: u8,
    message: String,
}

impl Failure {
    fn input(message: impl ToString) -> Self {
        Self {
            code: 1,
            message: message.to_string(),
        }
    }
}

impl From<EngineError> for Failure {
    fn from(e: EngineError) -> Self {
        let code = match e {
            EngineError::Configuration(_) => 2,
            _ => 1,
        };
        Self {
            code,
            message: e.to_string(),
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Defaults => to_json(&FieldRecord::defaults()),
        Commands::Check { page } => check(&page),
        Commands::Render {
            page,
            edits,
            surface,
            format,
        } => render(&page, &edits, surface.into(), format),
        Commands::Print { page, edits } => print(&page, &edits),
    };

    match result {
        Ok(output) => {
            println!("{}", output);
            ExitCode::SUCCESS
        }
        Err(failure) => {
            let output = serde_json::json!({
                "success": false,
                "error": failure.message,
            });
            println!("{}", output);
            ExitCode::from(failure.code)
        }
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, Failure> {
    serde_json::to_string_pretty(value).map_err(Failure::input)
}

fn load_template(page: &PageArgs) -> Result<Template, Failure> {
    match &page.template {
        Some(path) => Template::load(path).map_err(Failure::input),
        None => Ok(Template::jcard()),
    }
}

fn load_catalog(page: &PageArgs) -> Result<BindingCatalog, Failure> {
    match &page.catalog {
        Some(path) => {
            let json = fs::read_to_string(path).map_err(Failure::input)?;
            BindingCatalog::from_json(&json).map_err(Failure::input)
        }
        None => Ok(BindingCatalog::jcard()),
    }
}

fn load_record(path: Option<&Path>) -> Result<FieldRecord, Failure> {
    match path {
        Some(path) => {
            let json = fs::read_to_string(path).map_err(Failure::input)?;
            FieldRecord::from_json(&json).map_err(Failure::input)
        }
        None => Ok(FieldRecord::new()),
    }
}

fn start(page: &PageArgs, record: &FieldRecord) -> Result<(Template, JCard), Failure> {
    let template = load_template(page)?;
    let document = template.document().map_err(|e| Failure {
        code: 2,
        message: e.to_string(),
    })?;
    let jcard = JCard::init_with(
        document,
        &page.container,
        record,
        load_catalog(page)?,
        &Layout::default(),
    )?;
    Ok((template, jcard))
}

fn apply_edits(jcard: &mut JCard, edits: &EditArgs) -> Result<(), Failure> {
    for edit in &edits.sets {
        let (name, raw) = edit
            .split_once('=')
            .ok_or_else(|| Failure::input(format!("Expected KEY=VALUE, got '{}'", edit)))?;
        let key = FieldKey::from_name(name)
            .ok_or_else(|| Failure::input(format!("Unknown field '{}'", name)))?;
        let value = match key.kind() {
            FieldKind::Boolean => FieldValue::Checked(
                raw.parse::<bool>()
                    .map_err(|_| Failure::input(format!("Expected true or false for {}", key)))?,
            ),
            FieldKind::FileRef => {
                return Err(Failure::input(format!("Use --cover to select a file for {}", key)))
            }
            // shells hand over literal "\n"
            _ => FieldValue::Text(raw.replace("\\n", "\n")),
        };
        jcard.set(key, value)?;
    }

    if let Some(path) = &edits.cover {
        let file = SelectedFile::read(path).map_err(Failure::input)?;
        jcard.select_file(FieldKey::Cover, file)?;
    }
    Ok(())
}

fn check(page: &PageArgs) -> Result<String, Failure> {
    let (template, jcard) = start(page, &FieldRecord::new())?;
    to_json(&serde_json::json!({
        "valid": true,
        "template": template.id,
        "templateVersion": template.template_version,
        "prefix": jcard.fields().naming().prefix(),
        "fields": jcard.fields().len(),
        "bindings": jcard.catalog().len(),
        "consistent": jcard.is_consistent(),
    }))
}

fn render(
    page: &PageArgs,
    edits: &EditArgs,
    role: SurfaceRole,
    format: Format,
) -> Result<String, Failure> {
    let record = load_record(edits.record.as_deref())?;
    let (template, mut jcard) = start(page, &record)?;
    apply_edits(&mut jcard, edits)?;

    match format {
        Format::Html => Ok(jcard.to_html(role)),
        Format::Json => to_json(&serde_json::json!({
            "success": true,
            "template": template.id,
            "surface": role,
            "consistent": jcard.is_consistent(),
            "fingerprint": jcard.fingerprint(role).map_err(Failure::input)?,
            "snapshot": jcard.snapshot(role),
        })),
    }
}

fn print(page: &PageArgs, edits: &EditArgs) -> Result<String, Failure> {
    let record = load_record(edits.record.as_deref())?;
    let (_, mut jcard) = start(page, &record)?;
    apply_edits(&mut jcard, edits)?;

    let copy = PrintCopy::prepare(&jcard, &record).map_err(|e| Failure {
        code: 2,
        message: e.to_string(),
    })?;
    to_json(&copy)
}
