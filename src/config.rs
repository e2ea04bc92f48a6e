//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.punctuation.toml` files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default config file name, looked up in the current directory.
pub const DEFAULT_CONFIG_FILE: &str = ".punctuation.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Analysis service settings.
    #[serde(default)]
    pub backend: BackendConfig,

    /// Where and how artifacts are saved.
    #[serde(default)]
    pub output: OutputConfig,
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,

    /// Categories pre-selected when `--marks` is not given.
    #[serde(default)]
    pub default_marks: Vec<String>,
}

/// How the CSV and graph exports obtain their data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ExportMode {
    /// POST the analysis data back to each export endpoint.
    #[default]
    Resubmit,
    /// GET the service's most recently computed result.
    LastResult,
}

/// Analysis service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL the routes are appended to.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-call timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    #[serde(default)]
    pub export_mode: ExportMode,

    #[serde(default)]
    pub routes: RoutesConfig,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: default_timeout(),
            export_mode: ExportMode::default(),
            routes: RoutesConfig::default(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_timeout() -> u64 {
    60
}

/// Endpoint paths relative to `base_url`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutesConfig {
    #[serde(default = "default_analyze_route")]
    pub analyze: String,

    #[serde(default = "default_csv_route")]
    pub csv: String,

    #[serde(default = "default_graph_route")]
    pub graph: String,
}

impl Default for RoutesConfig {
    fn default() -> Self {
        Self {
            analyze: default_analyze_route(),
            csv: default_csv_route(),
            graph: default_graph_route(),
        }
    }
}

fn default_analyze_route() -> String {
    "/analyze".to_string()
}

fn default_csv_route() -> String {
    "/csv".to_string()
}

fn default_graph_route() -> String {
    "/graph".to_string()
}

/// Artifact output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory the CSV and graph are saved into.
    #[serde(default = "default_output_dir")]
    pub directory: String,

    /// Suggested name for the CSV summary.
    #[serde(default = "default_csv_name")]
    pub csv_name: String,

    /// Suggested name for the graph image.
    #[serde(default = "default_graph_name")]
    pub graph_name: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_dir(),
            csv_name: default_csv_name(),
            graph_name: default_graph_name(),
        }
    }
}

fn default_output_dir() -> String {
    ".".to_string()
}

fn default_csv_name() -> String {
    "punctuation_summary.csv".to_string()
}

fn default_graph_name() -> String {
    "combined_punctuation_graph.png".to_string()
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(DEFAULT_CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// Only values the user gave explicitly override the file.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref url) = args.base_url {
            self.backend.base_url = url.clone();
        }
        if let Some(timeout) = args.timeout {
            self.backend.timeout_seconds = timeout;
        }
        if let Some(mode) = args.export_mode {
            self.backend.export_mode = mode;
        }
        if let Some(ref dir) = args.output_dir {
            self.output.directory = dir.display().to_string();
        }
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }

    /// Artifact name for `kind`, as configured.
    pub fn suggested_name(&self, kind: crate::models::ArtifactKind) -> &str {
        match kind {
            crate::models::ArtifactKind::Csv => &self.output.csv_name,
            crate::models::ArtifactKind::Graph => &self.output.graph_name,
        }
    }
}
