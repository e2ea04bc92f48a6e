//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::config::ExportMode;
use crate::models::PunctuationCategory;
use clap::Parser;
use std::path::PathBuf;

/// Punctuation Analyzer - count punctuation in Word documents
///
/// Uploads a .docx file to the punctuation analysis service, prints the
/// counts for the selected marks, and saves the CSV summary and graph.
///
/// Examples:
///   punctuation-analyzer --file report.docx --marks commas,full_stops
///   punctuation-analyzer --file report.docx --all-marks --output-dir results
///   punctuation-analyzer --list-marks
///   punctuation-analyzer --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Word document to analyze (.docx)
    #[arg(
        short,
        long,
        value_name = "DOCX",
        required_unless_present_any = ["init_config", "list_marks"]
    )]
    pub file: Option<PathBuf>,

    /// Punctuation marks to analyze (comma-separated)
    ///
    /// Example: --marks commas,full_stops,em_dashes
    #[arg(short, long, value_name = "LIST", value_delimiter = ',')]
    pub marks: Option<Vec<String>>,

    /// Select all 18 punctuation marks
    #[arg(short, long, conflicts_with = "marks")]
    pub all_marks: bool,

    /// List the available punctuation marks and exit
    #[arg(long)]
    pub list_marks: bool,

    /// Analysis service base URL
    #[arg(long, value_name = "URL", env = "PUNCTUATION_API_URL")]
    pub base_url: Option<String>,

    /// Whether exports resubmit the analysis or fetch the service's last result
    #[arg(long, value_name = "MODE")]
    pub export_mode: Option<ExportMode>,

    /// Per-request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Directory to save the CSV summary and graph into
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Print results without saving the CSV and graph
    #[arg(long)]
    pub no_download: bool,

    /// Result output format (text, json)
    #[arg(long, default_value = "text", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Path to configuration file
    ///
    /// If not specified, looks for .punctuation.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .punctuation.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// How results are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable summary (default)
    #[default]
    Text,
    /// JSON
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.init_config || self.list_marks {
            return Ok(());
        }

        // The file picker only offers Word documents.
        if let Some(ref file) = self.file {
            let is_docx = file
                .extension()
                .map(|e| e.eq_ignore_ascii_case("docx"))
                .unwrap_or(false);
            if !is_docx {
                return Err(format!("Only .docx files are supported: {}", file.display()));
            }
        }

        if let Some(ref url) = self.base_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("Service URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        self.parsed_marks().map(|_| ())
    }

    /// Categories named by `--marks`, or `None` when the flag was not given.
    pub fn parsed_marks(&self) -> Result<Option<Vec<PunctuationCategory>>, String> {
        match self.marks {
            Some(ref marks) => marks
                .iter()
                .filter(|m| !m.trim().is_empty())
                .map(|m| m.parse::<PunctuationCategory>())
                .collect::<Result<Vec<_>, _>>()
                .map(Some),
            None => Ok(None),
        }
    }

    /// Returns the log level based on verbosity settings.
    ///
    /// `config_verbose` is the config file's `general.verbose`. `--quiet` wins over both.
    pub fn log_level(&self, config_verbose: bool) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose || config_verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args() -> Args {
        Args {
            file: Some(PathBuf::from("report.docx")),
            marks: Some(vec!["commas".to_string(), "full_stops".to_string()]),
            all_marks: false,
            list_marks: false,
            base_url: None,
            export_mode: None,
            timeout: None,
            output_dir: None,
            no_download: false,
            format: OutputFormat::Text,
            config: None,
            verbose: false,
            quiet: false,
            init_config: false,
        }
    }

    #[test]
    fn test_valid_args() {
        assert!(make_args().validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_non_docx() {
        let mut args = make_args();
        args.file = Some(PathBuf::from("notes.pdf"));
        assert!(args.validate().is_err());

        args.file = Some(PathBuf::from("REPORT.DOCX"));
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_invalid_url() {
        let mut args = make_args();
        args.base_url = Some("localhost:5000".to_string());
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_parsed_marks() {
        let mut args = make_args();
        assert_eq!(
            args.parsed_marks().unwrap(),
            Some(vec![
                PunctuationCategory::Commas,
                PunctuationCategory::FullStops
            ])
        );

        args.marks = Some(vec!["commas".to_string(), "tildes".to_string()]);
        assert!(args.validate().is_err());

        args.marks = None;
        assert_eq!(args.parsed_marks().unwrap(), None);
    }

    #[test]
    fn test_parse_from_command_line() {
        let args = Args::try_parse_from([
            "punctuation-analyzer",
            "--file",
            "report.docx",
            "--marks",
            "commas,em dashes",
            "--export-mode",
            "last-result",
        ])
        .unwrap();
        assert_eq!(args.export_mode, Some(ExportMode::LastResult));
        assert_eq!(args.parsed_marks().unwrap().unwrap().len(), 2);

        assert!(Args::try_parse_from(["punctuation-analyzer"]).is_err());
        assert!(Args::try_parse_from(["punctuation-analyzer", "--list-marks"]).is_ok());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(false), tracing::Level::INFO);
        assert_eq!(args.log_level(true), tracing::Level::DEBUG);

        args.verbose = true;
        assert_eq!(args.log_level(false), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(false), tracing::Level::ERROR);
        assert_eq!(args.log_level(true), tracing::Level::ERROR);
    }
}
