//! Session states and pipeline steps.

use crate::error::BackendError;
use crate::models::{AnalysisResult, Artifact};
use std::fmt;

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No file chosen yet.
    Idle,
    /// A file is chosen; no analysis results held.
    FileChosen,
    /// The analyze call is in flight.
    Analyzing,
    /// Result stored; CSV export in flight.
    ResultReady,
    /// CSV stored; graph export in flight.
    CsvReady,
    /// Result, CSV and graph all available.
    Complete,
}

impl SessionState {
    /// True while a run has outstanding remote calls.
    pub fn is_in_flight(&self) -> bool {
        matches!(
            self,
            SessionState::Analyzing | SessionState::ResultReady | SessionState::CsvReady
        )
    }

    /// The step a run in this state is waiting on.
    pub fn pending_step(&self) -> Option<PipelineStep> {
        match self {
            SessionState::Analyzing => Some(PipelineStep::Analyze),
            SessionState::ResultReady => Some(PipelineStep::ExportCsv),
            SessionState::CsvReady => Some(PipelineStep::ExportGraph),
            _ => None,
        }
    }
}

/// The three remote calls, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStep {
    Analyze,
    ExportCsv,
    ExportGraph,
}

impl PipelineStep {
    pub const ORDER: [PipelineStep; 3] = [
        PipelineStep::Analyze,
        PipelineStep::ExportCsv,
        PipelineStep::ExportGraph,
    ];

    /// 1-based position, for progress display.
    pub fn number(&self) -> usize {
        match self {
            PipelineStep::Analyze => 1,
            PipelineStep::ExportCsv => 2,
            PipelineStep::ExportGraph => 3,
        }
    }
}

impl fmt::Display for PipelineStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineStep::Analyze => write!(f, "analysis"),
            PipelineStep::ExportCsv => write!(f, "CSV export"),
            PipelineStep::ExportGraph => write!(f, "graph export"),
        }
    }
}

/// What a remote call produced.
#[derive(Debug, Clone)]
pub enum StepOutcome {
    Analyzed(AnalysisResult),
    CsvExported(Artifact),
    GraphExported(Artifact),
    Failed(PipelineStep, BackendError),
}

impl StepOutcome {
    pub fn step(&self) -> PipelineStep {
        match self {
            StepOutcome::Analyzed(_) => PipelineStep::Analyze,
            StepOutcome::CsvExported(_) => PipelineStep::ExportCsv,
            StepOutcome::GraphExported(_) => PipelineStep::ExportGraph,
            StepOutcome::Failed(step, _) => *step,
        }
    }
}

/// Whether [`super::AnalysisSession::apply`] used an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Applied,
    /// The outcome belonged to an abandoned run or an unexpected step.
    Discarded,
}
