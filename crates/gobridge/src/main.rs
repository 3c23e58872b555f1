//! `gobridge` - generate Valibot schemas from Go structs.

mod config;

use anyhow::Context;
use clap::{ArgAction, Parser};
use config::GobridgeConfig;
use gobridge_typegen::{GraphOptions, Options, Project, ValibotOptions, find_go_mod};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gobridge", version)]
#[command(about = "Generate Valibot schemas from the structs of a Go package")]
struct Cli {
    /// Go file whose package is the entry point
    entry: PathBuf,

    /// Project root containing go.mod (default: nearest go.mod above ENTRY)
    #[arg(long, value_name = "DIR")]
    root: Option<PathBuf>,

    /// Output file (stdout if not specified)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Module to import validators from
    #[arg(long, value_name = "NAME")]
    import_source: Option<String>,

    /// Export all schemas (add 'export' keyword)
    #[arg(long)]
    export: bool,

    /// Generate InferOutput type aliases
    #[arg(long)]
    infer_types: bool,

    /// Order by every field of anonymous structs, not just the first
    #[arg(long)]
    all_anonymous_fields: bool,

    /// Print the resolved structs as JSON instead of generating code
    #[arg(long)]
    dump_ir: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    /// Flags win over config, config over built-in defaults.
    fn options(&self, config: &GobridgeConfig) -> Options {
        let defaults = ValibotOptions::default();
        Options {
            valibot: ValibotOptions {
                import_source: self
                    .import_source
                    .clone()
                    .or_else(|| config.output.import_source.clone())
                    .unwrap_or(defaults.import_source),
                export: self.export || config.output.export.unwrap_or(defaults.export),
                infer_types: self.infer_types
                    || config.output.infer_types.unwrap_or(defaults.infer_types),
            },
            graph: GraphOptions {
                all_anonymous_fields: self.all_anonymous_fields
                    || config.ordering.all_anonymous_fields.unwrap_or(false),
            },
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let entry = std::fs::canonicalize(&cli.entry)
        .with_context(|| format!("cannot open {}", cli.entry.display()))?;
    let project = open_project(cli.root.as_deref(), &entry)?;

    let config = GobridgeConfig::load(&project.root)?;
    init_logging(cli.verbose, config.log_level.as_deref());
    tracing::debug!(root = %project.root.display(), entry = %entry.display(), "starting");

    let options = cli.options(&config);
    let text = if cli.dump_ir {
        let structs = gobridge_typegen::resolve(&entry, &project, &options)?;
        let mut json = serde_json::to_string_pretty(&structs)?;
        json.push('\n');
        json
    } else {
        gobridge_typegen::generate(&entry, &project, &options)?
    };

    match &cli.output {
        Some(path) => {
            std::fs::write(path, &text)
                .with_context(|| format!("failed to write {}", path.display()))?;
            tracing::info!(path = %path.display(), "wrote output");
        }
        None => print!("{text}"),
    }
    Ok(())
}

/// An explicit root must have a go.mod. Otherwise the nearest go.mod above
/// the entry decides; without one, every import is external.
fn open_project(root: Option<&Path>, entry: &Path) -> anyhow::Result<Project> {
    if let Some(root) = root {
        let root = std::fs::canonicalize(root)
            .with_context(|| format!("cannot open {}", root.display()))?;
        return Ok(Project::open(root)?);
    }

    match find_go_mod(entry).as_deref().and_then(Path::parent) {
        Some(root) => Ok(Project::open(root)?),
        None => {
            let dir = entry.parent().unwrap_or(Path::new("."));
            tracing::warn!(dir = %dir.display(), "no go.mod found, treating all imports as external");
            Ok(Project::new(dir, None))
        }
    }
}

/// `RUST_LOG` wins, then `-v`, then the configured level, then `warn`.
fn init_logging(verbose: u8, configured: Option<&str>) {
    let directive = match verbose {
        0 => configured.unwrap_or("warn"),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
