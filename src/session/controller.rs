//! The analysis session controller.
//!
//! Holds the user's file and checklist, drives the three remote calls in
//! order, and keeps result, CSV and graph either all present or all absent
//! once a run settles.

use super::state::{Applied, PipelineStep, SessionState, StepOutcome};
use crate::backend::AnalysisBackend;
use crate::download;
use crate::error::{BackendError, MissingInput, SessionError};
use crate::models::{
    AnalysisResult, Artifact, ArtifactKind, GraphRequest, PunctuationCategory, SelectionSet,
    UploadedFile,
};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Inputs captured when a run starts.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub file: UploadedFile,
    pub selection: SelectionSet,
}

/// Handle for one run. Outcomes are only applied while it is current.
#[derive(Debug, Clone)]
pub struct RunTicket {
    generation: u64,
    pub request: AnalysisRequest,
}

/// Client-side controller for one user.
#[derive(Debug)]
pub struct AnalysisSession {
    file: Option<UploadedFile>,
    selection: SelectionSet,
    result: Option<AnalysisResult>,
    csv: Option<Artifact>,
    graph: Option<Artifact>,
    state: SessionState,
    generation: u64,
    last_error: Option<(PipelineStep, BackendError)>,
    call_timeout: Duration,
}

impl AnalysisSession {
    /// Create an idle session whose remote calls time out after `call_timeout`.
    pub fn new(call_timeout: Duration) -> Self {
        Self {
            file: None,
            selection: SelectionSet::new(),
            result: None,
            csv: None,
            graph: None,
            state: SessionState::Idle,
            generation: 0,
            last_error: None,
            call_timeout,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn file(&self) -> Option<&UploadedFile> {
        self.file.as_ref()
    }

    pub fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    pub fn result(&self) -> Option<&AnalysisResult> {
        self.result.as_ref()
    }

    pub fn csv(&self) -> Option<&Artifact> {
        self.csv.as_ref()
    }

    pub fn graph(&self) -> Option<&Artifact> {
        self.graph.as_ref()
    }

    /// The failure that ended the most recent run, if any.
    pub fn last_error(&self) -> Option<&(PipelineStep, BackendError)> {
        self.last_error.as_ref()
    }

    /// Replace the chosen document. Discards results and abandons any run in flight.
    pub fn select_file(&mut self, file: UploadedFile) {
        info!("Selected file: {} ({} bytes)", file.name, file.size());

        if self.state.is_in_flight() {
            warn!("Abandoning in-flight analysis for new file");
        }

        self.generation += 1;
        self.clear_results();
        self.last_error = None;
        self.file = Some(file);
        self.state = SessionState::FileChosen;
    }

    pub fn toggle_category(&mut self, category: PunctuationCategory, checked: bool) {
        debug!("Toggle {} -> {}", category, checked);
        self.selection.toggle(category, checked);
    }

    pub fn select_all_categories(&mut self) {
        self.selection.select_all();
    }

    pub fn clear_categories(&mut self) {
        self.selection.clear();
    }

    /// Check preconditions and open a new run.
    ///
    /// A run requires a file and at least one selected category. While a run
    /// is in flight further invocations are refused with [`SessionError::InFlight`].
    pub fn begin_run(&mut self) -> Result<RunTicket, SessionError> {
        if self.state.is_in_flight() {
            return Err(SessionError::InFlight);
        }

        let file = self
            .file
            .clone()
            .ok_or(SessionError::MissingInput(MissingInput::File))?;

        if self.selection.is_empty() {
            return Err(SessionError::MissingInput(MissingInput::Selection));
        }

        self.generation += 1;
        self.clear_results();
        self.last_error = None;
        self.state = SessionState::Analyzing;

        debug!("Starting run {} for {}", self.generation, file.name);

        Ok(RunTicket {
            generation: self.generation,
            request: AnalysisRequest {
                file,
                selection: self.selection.clone(),
            },
        })
    }

    /// Apply one step's outcome to the session.
    ///
    /// Outcomes from an abandoned run, or for a step the session is not
    /// waiting on, are discarded without touching state.
    pub fn apply(&mut self, ticket: &RunTicket, outcome: StepOutcome) -> Applied {
        if ticket.generation != self.generation {
            debug!(
                "Discarding stale {} outcome from run {}",
                outcome.step(),
                ticket.generation
            );
            return Applied::Discarded;
        }

        if self.state.pending_step() != Some(outcome.step()) {
            warn!(
                "Discarding {} outcome while in state {:?}",
                outcome.step(),
                self.state
            );
            return Applied::Discarded;
        }

        match outcome {
            StepOutcome::Analyzed(result) => {
                info!(
                    "Analysis received: {} words in {}",
                    result.word_count, result.filename
                );
                self.result = Some(result);
                self.state = SessionState::ResultReady;
            }
            StepOutcome::CsvExported(artifact) => {
                self.csv = Some(artifact);
                self.state = SessionState::CsvReady;
            }
            StepOutcome::GraphExported(artifact) => {
                self.graph = Some(artifact);
                self.state = SessionState::Complete;
                info!("Analysis complete");
            }
            StepOutcome::Failed(step, err) => {
                warn!("{} failed: {}", step, err);
                self.clear_results();
                self.last_error = Some((step, err));
                self.state = SessionState::FileChosen;
            }
        }

        Applied::Applied
    }

    /// Stop waiting on the current run and drop anything it produced.
    pub fn abandon(&mut self) {
        if self.state.is_in_flight() {
            info!("Abandoning run {}", self.generation);
        }

        self.generation += 1;
        self.clear_results();
        self.state = if self.file.is_some() {
            SessionState::FileChosen
        } else {
            SessionState::Idle
        };
    }

    /// Run the full pipeline against `backend`.
    #[cfg(test)]
    pub async fn run_analysis(&mut self, backend: &dyn AnalysisBackend) -> Result<(), SessionError> {
        self.run_analysis_observed(backend, |_| {}).await
    }

    /// Run the full pipeline, calling `observer` before each step starts.
    pub async fn run_analysis_observed<F>(
        &mut self,
        backend: &dyn AnalysisBackend,
        mut observer: F,
    ) -> Result<(), SessionError>
    where
        F: FnMut(PipelineStep),
    {
        let ticket = self.begin_run()?;
        let request = &ticket.request;
        let timeout = self.call_timeout;

        observer(PipelineStep::Analyze);
        let result = match with_timeout(timeout, backend.analyze(&request.file, &request.selection)).await
        {
            Ok(result) => result,
            Err(err) => return self.fail(&ticket, PipelineStep::Analyze, err),
        };
        self.apply(&ticket, StepOutcome::Analyzed(result.clone()));

        observer(PipelineStep::ExportCsv);
        let csv = match with_timeout(timeout, backend.export_csv(&result))
            .await
            .and_then(|a| check_artifact(ArtifactKind::Csv, a))
        {
            Ok(csv) => csv,
            Err(err) => return self.fail(&ticket, PipelineStep::ExportCsv, err),
        };
        self.apply(&ticket, StepOutcome::CsvExported(csv));

        observer(PipelineStep::ExportGraph);
        let graph_request = GraphRequest::new(&request.file.name, &request.selection, &result);
        let graph = match with_timeout(timeout, backend.export_graph(&graph_request))
            .await
            .and_then(|a| check_artifact(ArtifactKind::Graph, a))
        {
            Ok(graph) => graph,
            Err(err) => return self.fail(&ticket, PipelineStep::ExportGraph, err),
        };
        self.apply(&ticket, StepOutcome::GraphExported(graph));

        Ok(())
    }

    /// Save a finished artifact into `dir` as `suggested_name`.
    pub fn download(
        &self,
        kind: ArtifactKind,
        dir: &Path,
        suggested_name: &str,
    ) -> Result<PathBuf, SessionError> {
        if self.state != SessionState::Complete {
            return Err(SessionError::ArtifactUnavailable(kind));
        }

        let artifact = match kind {
            ArtifactKind::Csv => self.csv.as_ref(),
            ArtifactKind::Graph => self.graph.as_ref(),
        }
        .ok_or(SessionError::ArtifactUnavailable(kind))?;

        download::save_artifact(artifact, dir, suggested_name)
    }

    fn fail(
        &mut self,
        ticket: &RunTicket,
        step: PipelineStep,
        err: BackendError,
    ) -> Result<(), SessionError> {
        self.apply(ticket, StepOutcome::Failed(step, err.clone()));
        Err(SessionError::AnalysisFailed { step, source: err })
    }

    fn clear_results(&mut self) {
        self.result = None;
        self.csv = None;
        self.graph = None;
    }
}

async fn with_timeout<T>(
    limit: Duration,
    call: impl Future<Output = Result<T, BackendError>>,
) -> Result<T, BackendError> {
    match tokio::time::timeout(limit, call).await {
        Ok(outcome) => outcome,
        Err(_) => Err(BackendError::Timeout(limit)),
    }
}

/// Reject artifacts that are empty or not of the expected kind.
fn check_artifact(kind: ArtifactKind, artifact: Artifact) -> Result<Artifact, BackendError> {
    if artifact.kind != kind || artifact.media_type != kind.media_type() {
        return Err(BackendError::UnexpectedMediaType {
            expected: kind.media_type().to_string(),
            actual: artifact.media_type,
        });
    }
    if artifact.is_empty() {
        return Err(BackendError::MalformedResponse(format!("{} payload is empty", kind)));
    }
    Ok(artifact)
}
