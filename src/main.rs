//! Punctuation Analyzer - client for the punctuation analysis service
//!
//! Uploads a Word document, shows the counts for the selected punctuation
//! marks, and saves the CSV summary and graph the service produces.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (missing input, service failure, I/O)
//!   130 - Interrupted

mod backend;
mod cli;
mod config;
mod download;
mod error;
mod models;
mod report;
mod session;

use anyhow::{Context, Result};
use backend::HttpBackend;
use cli::Args;
use config::Config;
use indicatif::{ProgressBar, ProgressStyle};
use models::{ArtifactKind, PunctuationCategory, UploadedFile};
use session::{AnalysisSession, PipelineStep};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

const EXIT_INTERRUPTED: i32 = 130;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config and --list-marks early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }
    if args.list_marks {
        print!("{}", report::generate_category_listing());
        return Ok(());
    }

    // Config comes first so its verbose setting can pick the log level
    let (mut config, source) = load_config(&args);
    config.merge_with_args(&args);

    init_logging(args.log_level(config.general.verbose));

    info!("Punctuation Analyzer v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);
    source.log();

    match run(args, config).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Analysis failed: {:#}", e);
            eprintln!("\n❌ Error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .punctuation.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(config::DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            config::DEFAULT_CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", config::DEFAULT_CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", config::DEFAULT_CONFIG_FILE);
    println!("   Edit it to point at your analysis service and choose default marks.");
    Ok(())
}

/// Initialize logging at `level`.
fn init_logging(level: tracing::Level) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Run one analysis end to end. Returns the exit code.
async fn run(args: Args, config: Config) -> Result<i32> {
    let start_time = Instant::now();
    let mut console = report::Console::stdio(args.format);

    let backend = HttpBackend::new(config.backend.clone())?;
    let mut session = AnalysisSession::new(Duration::from_secs(config.backend.timeout_seconds));

    // Choose the document
    let path = args.file.clone().context("No input file given")?;
    let file = UploadedFile::from_path(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    session.select_file(file);

    // Tick the checklist
    apply_selection(&mut session, &args, &config)?;

    let chosen = session.file().context("No file selected")?;
    console.status(format!(
        "🔬 Analyzing {} ({} bytes, {} marks selected)",
        chosen.name,
        chosen.size(),
        session.selection().len()
    ))?;
    console.status(format!("   Service: {}", config.backend.base_url))?;

    let spinner = if args.quiet {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.enable_steady_tick(Duration::from_millis(120));
        pb
    };

    let outcome = tokio::select! {
        outcome = session.run_analysis_observed(&backend, |step| {
            spinner.set_message(step_message(step));
        }) => Some(outcome),
        _ = tokio::signal::ctrl_c() => None,
    };
    spinner.finish_and_clear();

    let Some(outcome) = outcome else {
        session.abandon();
        warn!("Interrupted; remaining requests abandoned");
        eprintln!("\n⛔ Interrupted.");
        return Ok(EXIT_INTERRUPTED);
    };
    if let Err(e) = outcome {
        debug!(
            "Run ended in state {:?}, last error: {:?}",
            session.state(),
            session.last_error()
        );
        return Err(e.into());
    }

    let result = session
        .result()
        .context("Analysis finished without a result")?;
    let summary = report::ResultReport::new(result, session.selection(), &config.backend.base_url);

    console.report(&summary)?;

    if args.no_download {
        info!("Skipping downloads (--no-download)");
    } else {
        let dir = PathBuf::from(&config.output.directory);
        console.status("")?;
        for kind in [ArtifactKind::Csv, ArtifactKind::Graph] {
            let size = match kind {
                ArtifactKind::Csv => session.csv().map(|a| a.len()),
                ArtifactKind::Graph => session.graph().map(|a| a.len()),
            }
            .unwrap_or(0);
            let saved = session.download(kind, &dir, config.suggested_name(kind))?;
            console.status(format!(
                "   💾 {} ({} bytes) saved to {}",
                kind,
                size,
                saved.display()
            ))?;
        }
    }

    console.status(format!(
        "\n✅ Done in {:.1}s",
        start_time.elapsed().as_secs_f64()
    ))?;

    Ok(0)
}

fn step_message(step: PipelineStep) -> String {
    let action = match step {
        PipelineStep::Analyze => "uploading and analyzing document",
        PipelineStep::ExportCsv => "fetching CSV summary",
        PipelineStep::ExportGraph => "fetching graph",
    };
    format!(
        "Step {}/{}: {}...",
        step.number(),
        PipelineStep::ORDER.len(),
        action
    )
}

/// Tick categories from --all-marks, --marks, or the config defaults.
fn apply_selection(session: &mut AnalysisSession, args: &Args, config: &Config) -> Result<()> {
    if args.all_marks {
        session.select_all_categories();
        return Ok(());
    }

    let marks = match args.parsed_marks().map_err(anyhow::Error::msg)? {
        Some(marks) => marks,
        None => config
            .general
            .default_marks
            .iter()
            .map(|m| m.parse::<PunctuationCategory>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(anyhow::Error::msg)
            .context("Invalid default_marks in config")?,
    };

    session.clear_categories();
    for mark in marks {
        session.toggle_category(mark, true);
    }
    Ok(())
}

/// Where the configuration came from. Logged once logging is up.
enum ConfigSource {
    File(PathBuf),
    Defaults,
    Unreadable(anyhow::Error),
}

impl ConfigSource {
    fn log(&self) {
        match self {
            ConfigSource::File(path) => info!("Loaded config from {}", path.display()),
            ConfigSource::Defaults => debug!("No config file found, using defaults"),
            ConfigSource::Unreadable(e) => warn!("Failed to load config: {:#}", e),
        }
    }
}

/// Load configuration from file or use defaults.
///
/// An explicit `--config` that cannot be loaded is fatal. A broken default
/// file falls back to the built-in settings.
fn load_config(args: &Args) -> (Config, ConfigSource) {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        match Config::load(config_path) {
            Ok(config) => return (config, ConfigSource::File(config_path.clone())),
            Err(e) => {
                eprintln!("Error: {:#}", e);
                std::process::exit(1);
            }
        }
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => (
            config,
            ConfigSource::File(PathBuf::from(config::DEFAULT_CONFIG_FILE)),
        ),
        Ok(None) => (Config::default(), ConfigSource::Defaults),
        Err(e) => (Config::default(), ConfigSource::Unreadable(e)),
    }
}
