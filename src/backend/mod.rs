//! Remote analysis service.
//!
//! The session only talks to the service through [`AnalysisBackend`];
//! [`HttpBackend`] is the production implementation.

pub mod http;

pub use http::HttpBackend;

use crate::error::BackendError;
use crate::models::{AnalysisResult, Artifact, GraphRequest, SelectionSet, UploadedFile};
use async_trait::async_trait;

/// The three calls of the analysis pipeline.
#[async_trait]
pub trait AnalysisBackend: Send + Sync {
    /// Upload the document and receive the punctuation counts.
    async fn analyze(
        &self,
        file: &UploadedFile,
        selection: &SelectionSet,
    ) -> Result<AnalysisResult, BackendError>;

    /// Fetch the CSV summary for `result`.
    async fn export_csv(&self, result: &AnalysisResult) -> Result<Artifact, BackendError>;

    /// Fetch the chart image.
    async fn export_graph(&self, request: &GraphRequest) -> Result<Artifact, BackendError>;
}

#[cfg(test)]
pub mod testing {
    //! Scripted in-memory backend for session tests.

    use super::*;
    use crate::models::ArtifactKind;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    /// A call observed by [`ScriptedBackend`].
    #[derive(Debug, Clone, PartialEq)]
    pub enum RecordedCall {
        Analyze { filename: String, marks: Vec<String> },
        ExportCsv { filename: String },
        ExportGraph(GraphRequest),
    }

    /// Backend that replays queued responses and records every call.
    #[derive(Default)]
    pub struct ScriptedBackend {
        analyze: Mutex<VecDeque<Result<AnalysisResult, BackendError>>>,
        csv: Mutex<VecDeque<Result<Artifact, BackendError>>>,
        graph: Mutex<VecDeque<Result<Artifact, BackendError>>>,
        calls: Mutex<Vec<RecordedCall>>,
        delay: Option<Duration>,
    }

    impl ScriptedBackend {
        pub fn new() -> Self {
            Self::default()
        }

        /// Sleep this long inside every call.
        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        pub fn push_analyze(self, response: Result<AnalysisResult, BackendError>) -> Self {
            self.analyze.lock().unwrap().push_back(response);
            self
        }

        pub fn push_csv(self, response: Result<Artifact, BackendError>) -> Self {
            self.csv.lock().unwrap().push_back(response);
            self
        }

        pub fn push_graph(self, response: Result<Artifact, BackendError>) -> Self {
            self.graph.lock().unwrap().push_back(response);
            self
        }

        pub fn calls(&self) -> Vec<RecordedCall> {
            self.calls.lock().unwrap().clone()
        }

        async fn pause(&self) {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
        }

        fn unscripted<T>(call: &str) -> Result<T, BackendError> {
            Err(BackendError::Network(format!("no scripted response for {}", call)))
        }
    }

    #[async_trait]
    impl AnalysisBackend for ScriptedBackend {
        async fn analyze(
            &self,
            file: &UploadedFile,
            selection: &SelectionSet,
        ) -> Result<AnalysisResult, BackendError> {
            self.calls.lock().unwrap().push(RecordedCall::Analyze {
                filename: file.name.clone(),
                marks: selection.iter().map(|c| c.as_str().to_string()).collect(),
            });
            self.pause().await;
            let next = self.analyze.lock().unwrap().pop_front();
            next.unwrap_or_else(|| Self::unscripted("analyze"))
        }

        async fn export_csv(&self, result: &AnalysisResult) -> Result<Artifact, BackendError> {
            self.calls.lock().unwrap().push(RecordedCall::ExportCsv {
                filename: result.filename.clone(),
            });
            self.pause().await;
            let next = self.csv.lock().unwrap().pop_front();
            next.unwrap_or_else(|| Self::unscripted("export_csv"))
        }

        async fn export_graph(&self, request: &GraphRequest) -> Result<Artifact, BackendError> {
            self.calls
                .lock()
                .unwrap()
                .push(RecordedCall::ExportGraph(request.clone()));
            self.pause().await;
            let next = self.graph.lock().unwrap().pop_front();
            next.unwrap_or_else(|| Self::unscripted("export_graph"))
        }
    }

    pub fn csv_artifact(body: &str) -> Artifact {
        Artifact::new(ArtifactKind::Csv, "text/csv", body.as_bytes().to_vec())
    }

    pub fn png_artifact() -> Artifact {
        Artifact::new(
            ArtifactKind::Graph,
            "image/png",
            vec![0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a],
        )
    }
}
