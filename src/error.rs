//! Error types for the analysis client.

use crate::models::ArtifactKind;
use crate::session::PipelineStep;
use std::time::Duration;
use thiserror::Error;

/// Failures talking to the analysis service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Expected {expected} but service sent {actual}")]
    UnexpectedMediaType { expected: String, actual: String },
}

/// Which precondition blocked a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MissingInput {
    #[error("Please choose a .docx file to analyze")]
    File,

    #[error("Please select at least one punctuation mark")]
    Selection,
}

/// Errors surfaced by [`crate::session::AnalysisSession`].
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("{0}")]
    MissingInput(MissingInput),

    #[error("An analysis is already in progress")]
    InFlight,

    #[error("Error analyzing file ({step} failed): {source}")]
    AnalysisFailed {
        step: PipelineStep,
        #[source]
        source: BackendError,
    },

    #[error("No {0} available. Run an analysis first.")]
    ArtifactUnavailable(ArtifactKind),

    #[error("Invalid download name: {0}")]
    InvalidArtifactName(String),

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
}
