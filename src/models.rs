//! Data models for the punctuation analyzer.
//!
//! This module contains the closed set of punctuation categories, the
//! user's selection, the uploaded document, and the results and artifacts
//! returned by the analysis service.

use crate::error::BackendError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

/// Number of punctuation categories tracked by the service.
pub const CATEGORY_COUNT: usize = 18;

/// A punctuation class counted by the analysis service.
///
/// Declaration order is the canonical order used for display, CSV columns
/// and the `selected_marks` list sent to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PunctuationCategory {
    Apostrophes,
    Colons,
    Commas,
    CurlyBrackets,
    DoubleInvertedCommas,
    Ellipses,
    EmDashes,
    EnDashes,
    ExclamationMarks,
    FullStops,
    Hyphens,
    OtherPunctuationMarks,
    QuestionMarks,
    RoundBrackets,
    Semicolons,
    Slashes,
    SquareBrackets,
    VerticalBars,
}

impl PunctuationCategory {
    /// All categories in canonical order.
    pub const ALL: [PunctuationCategory; CATEGORY_COUNT] = [
        PunctuationCategory::Apostrophes,
        PunctuationCategory::Colons,
        PunctuationCategory::Commas,
        PunctuationCategory::CurlyBrackets,
        PunctuationCategory::DoubleInvertedCommas,
        PunctuationCategory::Ellipses,
        PunctuationCategory::EmDashes,
        PunctuationCategory::EnDashes,
        PunctuationCategory::ExclamationMarks,
        PunctuationCategory::FullStops,
        PunctuationCategory::Hyphens,
        PunctuationCategory::OtherPunctuationMarks,
        PunctuationCategory::QuestionMarks,
        PunctuationCategory::RoundBrackets,
        PunctuationCategory::Semicolons,
        PunctuationCategory::Slashes,
        PunctuationCategory::SquareBrackets,
        PunctuationCategory::VerticalBars,
    ];

    /// Wire identifier used by the service.
    pub fn as_str(&self) -> &'static str {
        match self {
            PunctuationCategory::Apostrophes => "apostrophes",
            PunctuationCategory::Colons => "colons",
            PunctuationCategory::Commas => "commas",
            PunctuationCategory::CurlyBrackets => "curly_brackets",
            PunctuationCategory::DoubleInvertedCommas => "double_inverted_commas",
            PunctuationCategory::Ellipses => "ellipses",
            PunctuationCategory::EmDashes => "em_dashes",
            PunctuationCategory::EnDashes => "en_dashes",
            PunctuationCategory::ExclamationMarks => "exclamation_marks",
            PunctuationCategory::FullStops => "full_stops",
            PunctuationCategory::Hyphens => "hyphens",
            PunctuationCategory::OtherPunctuationMarks => "other_punctuation_marks",
            PunctuationCategory::QuestionMarks => "question_marks",
            PunctuationCategory::RoundBrackets => "round_brackets",
            PunctuationCategory::Semicolons => "semicolons",
            PunctuationCategory::Slashes => "slashes",
            PunctuationCategory::SquareBrackets => "square_brackets",
            PunctuationCategory::VerticalBars => "vertical_bars",
        }
    }

    /// Human-readable label (underscores replaced by spaces).
    pub fn label(&self) -> String {
        self.as_str().replace('_', " ")
    }

    /// Position in the canonical order.
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Look up a category by its wire identifier.
    pub fn from_wire(key: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.as_str() == key)
    }
}

impl fmt::Display for PunctuationCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PunctuationCategory {
    type Err = String;

    /// Accepts wire identifiers and labels, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace([' ', '-'], "_");
        Self::from_wire(&normalized).ok_or_else(|| format!("Unknown punctuation category: {}", s))
    }
}

/// The set of categories the user has checked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSet {
    marks: BTreeSet<PunctuationCategory>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `category` when `checked`, remove it otherwise. Idempotent.
    pub fn toggle(&mut self, category: PunctuationCategory, checked: bool) {
        if checked {
            self.marks.insert(category);
        } else {
            self.marks.remove(&category);
        }
    }

    pub fn select_all(&mut self) {
        self.marks.extend(PunctuationCategory::ALL);
    }

    pub fn clear(&mut self) {
        self.marks.clear();
    }

    pub fn contains(&self, category: PunctuationCategory) -> bool {
        self.marks.contains(&category)
    }

    pub fn len(&self) -> usize {
        self.marks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.marks.is_empty()
    }

    /// Iterate in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = PunctuationCategory> + '_ {
        self.marks.iter().copied()
    }

    pub fn to_vec(&self) -> Vec<PunctuationCategory> {
        self.iter().collect()
    }
}

impl FromIterator<PunctuationCategory> for SelectionSet {
    fn from_iter<I: IntoIterator<Item = PunctuationCategory>>(iter: I) -> Self {
        Self {
            marks: iter.into_iter().collect(),
        }
    }
}

/// MIME type of a word-processor document.
pub const DOCX_MEDIA_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// The document chosen for analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    /// File name sent to the service.
    pub name: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    /// Create an upload from in-memory bytes.
    #[cfg(test)]
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    /// Read an upload from disk.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document.docx".to_string());

        Ok(Self { name, bytes })
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

/// Per-category occurrence counts, keyed by the closed category set.
///
/// A count is `None` when the service did not report that category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PunctuationCounts {
    counts: [Option<u64>; CATEGORY_COUNT],
}

impl PunctuationCounts {
    pub fn get(&self, category: PunctuationCategory) -> Option<u64> {
        self.counts[category.index()]
    }

    pub fn set(&mut self, category: PunctuationCategory, count: u64) {
        self.counts[category.index()] = Some(count);
    }

    /// Reported categories and their counts, in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (PunctuationCategory, u64)> + '_ {
        PunctuationCategory::ALL
            .iter()
            .filter_map(|c| self.get(*c).map(|n| (*c, n)))
    }

    /// Sum of all reported counts.
    pub fn total(&self) -> u64 {
        self.iter().map(|(_, n)| n).sum()
    }

    /// Counts restricted to `selection`; unreported categories become 0.
    pub fn for_selection(&self, selection: &SelectionSet) -> Map<String, Value> {
        selection
            .iter()
            .map(|c| (c.as_str().to_string(), Value::from(self.get(c).unwrap_or(0))))
            .collect()
    }

    /// Read counts from a JSON object, skipping keys that are not categories.
    fn read_from(object: &Map<String, Value>) -> Result<Self, BackendError> {
        let mut counts = Self::default();

        for (key, value) in object {
            match PunctuationCategory::from_wire(key) {
                Some(category) => {
                    let n = value.as_u64().ok_or_else(|| {
                        BackendError::MalformedResponse(format!(
                            "count for '{}' is not a non-negative integer: {}",
                            key, value
                        ))
                    })?;
                    counts.set(category, n);
                }
                None => debug!("Ignoring unrecognised key in analysis response: {}", key),
            }
        }

        Ok(counts)
    }
}

/// Structured result of the analyze call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisResult {
    pub filename: String,
    pub word_count: u64,
    pub counts: PunctuationCounts,
}

impl AnalysisResult {
    /// Parse and validate the analyze response body.
    ///
    /// Accepts counts either as top-level keys or nested under
    /// `punctuation_counts`.
    pub fn from_json(value: &Value) -> Result<Self, BackendError> {
        let object = value.as_object().ok_or_else(|| {
            BackendError::MalformedResponse("analysis response is not a JSON object".to_string())
        })?;

        let filename = object
            .get("filename")
            .and_then(Value::as_str)
            .ok_or_else(|| BackendError::MalformedResponse("missing 'filename'".to_string()))?
            .to_string();

        let word_count = object
            .get("word_count")
            .and_then(Value::as_u64)
            .ok_or_else(|| {
                BackendError::MalformedResponse(
                    "missing or invalid 'word_count'".to_string(),
                )
            })?;

        let counts = match object.get("punctuation_counts") {
            Some(Value::Object(nested)) => PunctuationCounts::read_from(nested)?,
            Some(other) => {
                return Err(BackendError::MalformedResponse(format!(
                    "'punctuation_counts' is not an object: {}",
                    other
                )))
            }
            None => PunctuationCounts::read_from(object)?,
        };

        Ok(Self {
            filename,
            word_count,
            counts,
        })
    }

    /// Flat JSON form, as resubmitted to the CSV export endpoint.
    pub fn to_wire_json(&self) -> Value {
        let mut object = Map::new();
        object.insert("filename".to_string(), Value::from(self.filename.clone()));
        object.insert("word_count".to_string(), Value::from(self.word_count));
        for (category, n) in self.counts.iter() {
            object.insert(category.as_str().to_string(), Value::from(n));
        }
        Value::Object(object)
    }
}

/// Which downloadable artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Csv,
    Graph,
}

impl ArtifactKind {
    /// Media type the service must return for this artifact.
    pub fn media_type(&self) -> &'static str {
        match self {
            ArtifactKind::Csv => "text/csv",
            ArtifactKind::Graph => "image/png",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactKind::Csv => write!(f, "CSV"),
            ArtifactKind::Graph => write!(f, "graph"),
        }
    }
}

/// An opaque binary payload produced by the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub kind: ArtifactKind,
    pub media_type: String,
    pub bytes: Vec<u8>,
}

impl Artifact {
    pub fn new(kind: ArtifactKind, media_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            kind,
            media_type: media_type.into(),
            bytes,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Body of the graph export call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphRequest {
    pub filename: String,
    pub selected_marks: Vec<PunctuationCategory>,
    pub punctuation_counts: Map<String, Value>,
}

impl GraphRequest {
    /// Build the request for `result`, plotting only the selected categories.
    pub fn new(filename: &str, selection: &SelectionSet, result: &AnalysisResult) -> Self {
        Self {
            filename: filename.to_string(),
            selected_marks: selection.to_vec(),
            punctuation_counts: result.counts.for_selection(selection),
        }
    }
}
