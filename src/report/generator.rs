//! Result rendering.
//!
//! This module turns an analysis result into the text summary printed
//! after a run, or into JSON for scripting.

use crate::models::{AnalysisResult, PunctuationCategory, SelectionSet};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Metadata about the analysis run.
#[derive(Debug, Clone, Serialize)]
pub struct ReportMetadata {
    pub filename: String,
    pub word_count: u64,
    pub analyzed_at: DateTime<Utc>,
    pub service_url: String,
}

/// One checklist row.
#[derive(Debug, Clone, Serialize)]
pub struct CountRow {
    pub category: PunctuationCategory,
    pub label: String,
    /// `None` when the service did not report this category.
    pub count: Option<u64>,
    pub selected: bool,
}

/// Everything shown to the user after a run.
#[derive(Debug, Clone, Serialize)]
pub struct ResultReport {
    pub metadata: ReportMetadata,
    pub selected: Vec<CountRow>,
    pub selected_total: u64,
    /// Every category the service reported, selected or not.
    pub all_counts: Vec<CountRow>,
    pub reported_total: u64,
}

impl ResultReport {
    pub fn new(result: &AnalysisResult, selection: &SelectionSet, service_url: &str) -> Self {
        let row = |category: PunctuationCategory| CountRow {
            category,
            label: category.label(),
            count: result.counts.get(category),
            selected: selection.contains(category),
        };

        let selected: Vec<CountRow> = selection.iter().map(row).collect();
        let selected_total = selected.iter().filter_map(|r| r.count).sum();
        let all_counts = result.counts.iter().map(|(c, _)| row(c)).collect();

        Self {
            metadata: ReportMetadata {
                filename: result.filename.clone(),
                word_count: result.word_count,
                analyzed_at: Utc::now(),
                service_url: service_url.to_string(),
            },
            selected,
            selected_total,
            all_counts,
            reported_total: result.counts.total(),
        }
    }
}

/// Generate the terminal summary.
pub fn generate_text_report(report: &ResultReport) -> String {
    let mut output = String::new();

    output.push_str(&format!("📄 {}\n", report.metadata.filename));
    output.push_str(&format!("   Word Count: {}\n\n", report.metadata.word_count));

    let width = report
        .selected
        .iter()
        .map(|r| r.label.len())
        .max()
        .unwrap_or(0);

    for row in &report.selected {
        let count = row
            .count
            .map(|n| n.to_string())
            .unwrap_or_else(|| "n/a".to_string());
        output.push_str(&format!("   {:<width$}  {:>6}\n", row.label, count, width = width));
    }

    output.push_str(&format!(
        "   {:<width$}  {:>6}\n",
        "total",
        report.selected_total,
        width = width
    ));

    output
}

/// Generate a JSON report.
pub fn generate_json_report(report: &ResultReport) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

/// Listing for `--list-marks`.
pub fn generate_category_listing() -> String {
    PunctuationCategory::ALL
        .iter()
        .map(|c| format!("{:<24} {}\n", c.as_str(), c.label()))
        .collect()
}
