//! scenecraft command line.
//!
//! Inspect, migrate and export project files, and estimate generation costs
//! without touching the network.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::SecondsFormat;
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use scenecraft::budget::format_currency;
use scenecraft::gate::{ActionKind, CostGate};
use scenecraft::migrate::Migrator;
use scenecraft::persist::{self, ArtifactKind};
use scenecraft::{ProjectDocument, StudioConfig};

#[derive(Parser, Debug)]
#[command(name = "scenecraft", version, about = "Project file tools for AI video pre-production")]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (defaults to the user config directory)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Load a project file and print a summary
    Inspect {
        file: PathBuf,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Rewrite a project file in the current format
    Migrate {
        file: PathBuf,

        /// Output directory (defaults to the input file's directory)
        #[arg(long, value_name = "DIR")]
        out_dir: Option<PathBuf>,
    },

    /// Package all scene images or voice tracks into a zip archive
    Export {
        file: PathBuf,

        #[arg(long, value_enum)]
        kind: ExportKind,

        /// Output directory (defaults to the current directory)
        #[arg(long, value_name = "DIR")]
        out_dir: Option<PathBuf>,
    },

    /// Estimate the cost of a generation from its input text
    Estimate {
        #[arg(long, value_enum)]
        action: EstimateAction,

        text: String,
    },

    /// Print the effective configuration
    Config,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ExportKind {
    Images,
    Audio,
}

impl From<ExportKind> for ArtifactKind {
    fn from(kind: ExportKind) -> Self {
        match kind {
            ExportKind::Images => ArtifactKind::Image,
            ExportKind::Audio => ArtifactKind::Audio,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum EstimateAction {
    Image,
    Edit,
    Speech,
    VideoPrompt,
}

impl From<EstimateAction> for ActionKind {
    fn from(action: EstimateAction) -> Self {
        match action {
            EstimateAction::Image => ActionKind::GenerateImage,
            EstimateAction::Edit => ActionKind::EditImage,
            EstimateAction::Speech => ActionKind::Speech,
            EstimateAction::VideoPrompt => ActionKind::VideoPrompt,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProjectSummary<'a> {
    name: &'a str,
    last_modified: String,
    scenes: usize,
    characters: usize,
    images: usize,
    image_versions: usize,
    voice_tracks: usize,
    total_input_tokens: u64,
    total_output_tokens: u64,
    total_cost: f64,
}

impl<'a> ProjectSummary<'a> {
    fn new(doc: &'a ProjectDocument) -> Self {
        let scenes = &doc.content.scenes;
        Self {
            name: &doc.name,
            last_modified: doc
                .last_modified_at
                .to_rfc3339_opts(SecondsFormat::Secs, true),
            scenes: scenes.len(),
            characters: doc.content.characters.len(),
            images: scenes.iter().filter(|s| s.primary_image.is_some()).count(),
            image_versions: scenes.iter().map(|s| s.image_history.len()).sum(),
            voice_tracks: scenes.iter().filter(|s| s.audio.is_some()).count(),
            total_input_tokens: doc.usage_stats.total_input_tokens,
            total_output_tokens: doc.usage_stats.total_output_tokens,
            total_cost: doc.usage_stats.total_cost,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {:#}", "Error:".red().bold(), err);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("scenecraft").join("config.toml"))
}

fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.or_else(default_config_path);
    let config = StudioConfig::load(config_path.as_deref()).context("failed to load configuration")?;

    match cli.command {
        Commands::Inspect { file, json } => inspect(&config, &file, json),
        Commands::Migrate { file, out_dir } => migrate(&config, &file, out_dir),
        Commands::Export {
            file,
            kind,
            out_dir,
        } => export(&config, &file, kind.into(), out_dir),
        Commands::Estimate { action, text } => estimate(&config, action.into(), &text),
        Commands::Config => {
            print!("{}", config.to_toml());
            Ok(())
        }
    }
}

fn load(config: &StudioConfig, file: &Path) -> Result<ProjectDocument> {
    let bytes = fs::read(file).with_context(|| format!("failed to read {}", file.display()))?;
    let document = Migrator::new(config.default_voice.clone())
        .load(&bytes)
        .with_context(|| format!("failed to load {}", file.display()))?;
    Ok(document)
}

fn inspect(config: &StudioConfig, file: &Path, json: bool) -> Result<()> {
    let doc = load(config, file)?;
    let summary = ProjectSummary::new(&doc);

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    let name = if doc.name.is_empty() { "(untitled)" } else { doc.name.as_str() };
    println!("{}", name.bold());
    println!("  Last modified: {}", summary.last_modified);
    println!(
        "  {} scenes, {} characters",
        summary.scenes, summary.characters
    );
    println!(
        "  {} images ({} versions), {} voice tracks",
        summary.images, summary.image_versions, summary.voice_tracks
    );
    println!(
        "  Usage: {} input / {} output tokens, {}",
        summary.total_input_tokens,
        summary.total_output_tokens,
        format_currency(summary.total_cost).green()
    );
    Ok(())
}

fn migrate(config: &StudioConfig, file: &Path, out_dir: Option<PathBuf>) -> Result<()> {
    let doc = load(config, file)?;
    let dir = out_dir.unwrap_or_else(|| {
        file.parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    });
    let path = persist::save_to_dir(&doc, &dir)
        .with_context(|| format!("failed to save into {}", dir.display()))?;
    println!("{} {}", "Saved".green(), path.display());
    Ok(())
}

fn export(config: &StudioConfig, file: &Path, kind: ArtifactKind, out_dir: Option<PathBuf>) -> Result<()> {
    let doc = load(config, file)?;
    let Some(bundle) = persist::export_archive(&doc, kind).context("failed to build archive")? else {
        println!("{}", "Nothing to export".yellow());
        return Ok(());
    };

    let dir = out_dir.unwrap_or_else(|| PathBuf::from("."));
    fs::create_dir_all(&dir).with_context(|| format!("failed to create {}", dir.display()))?;
    let path = dir.join(&bundle.file_name);
    fs::write(&path, &bundle.bytes).with_context(|| format!("failed to write {}", path.display()))?;
    println!(
        "{} {} ({} files)",
        "Exported".green(),
        path.display(),
        bundle.entries.len()
    );
    Ok(())
}

fn estimate(config: &StudioConfig, action: ActionKind, text: &str) -> Result<()> {
    let gate: CostGate<()> = CostGate::new(config.pricing, config.estimator(), config.output_estimates);
    let estimate = gate.estimate(action, text);

    println!("{} ({})", estimate.action.to_string().bold(), estimate.model);
    println!("  Input tokens:  {}", estimate.input_tokens);
    println!("  Output tokens: {}", estimate.output_tokens);
    println!("  Estimated cost: {}", format_currency(estimate.total_cost).green());
    Ok(())
}
