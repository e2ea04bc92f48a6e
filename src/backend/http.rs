//! HTTP client for the punctuation analysis service.

use super::AnalysisBackend;
use crate::config::{BackendConfig, ExportMode};
use crate::error::BackendError;
use crate::models::{
    AnalysisResult, Artifact, ArtifactKind, GraphRequest, SelectionSet, UploadedFile,
    DOCX_MEDIA_TYPE,
};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, Response};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

/// Longest error body echoed back to the user.
const MAX_ERROR_BODY: usize = 512;

/// [`AnalysisBackend`] over HTTP.
pub struct HttpBackend {
    http_client: reqwest::Client,
    config: BackendConfig,
}

impl HttpBackend {
    /// Create a client for the configured service.
    pub fn new(config: BackendConfig) -> Result<Self, BackendError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| BackendError::Network(format!("Failed to create HTTP client: {}", e)))?;

        info!(
            "Using analysis service at {} ({:?} exports)",
            config.base_url, config.export_mode
        );

        Ok(Self {
            http_client,
            config,
        })
    }

    fn endpoint(&self, route: &str) -> String {
        join_url(&self.config.base_url, route)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, BackendError> {
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                BackendError::Timeout(Duration::from_secs(self.config.timeout_seconds))
            } else if e.is_connect() {
                BackendError::Network(format!(
                    "Cannot connect to analysis service at {}",
                    self.config.base_url
                ))
            } else {
                BackendError::Network(format!("Failed to send request: {}", e))
            }
        })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Status {
                status,
                body: summarize_error_body(&body),
            });
        }

        Ok(response)
    }

    async fn fetch_artifact(
        &self,
        kind: ArtifactKind,
        request: RequestBuilder,
    ) -> Result<Artifact, BackendError> {
        let response = self.send(request).await?;

        let declared = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(media_type_essence);

        let media_type = match declared {
            Some(actual) if actual != kind.media_type() => {
                return Err(BackendError::UnexpectedMediaType {
                    expected: kind.media_type().to_string(),
                    actual,
                })
            }
            Some(actual) => actual,
            None => {
                debug!("No Content-Type on {} response, assuming {}", kind, kind.media_type());
                kind.media_type().to_string()
            }
        };

        let bytes = response
            .bytes()
            .await
            .map_err(|e| BackendError::Network(format!("Failed to read {} body: {}", kind, e)))?;

        if bytes.is_empty() {
            return Err(BackendError::MalformedResponse(format!(
                "{} payload is empty",
                kind
            )));
        }

        debug!("Received {} bytes of {}", bytes.len(), media_type);
        Ok(Artifact::new(kind, media_type, bytes.to_vec()))
    }
}

#[async_trait]
impl AnalysisBackend for HttpBackend {
    async fn analyze(
        &self,
        file: &UploadedFile,
        selection: &SelectionSet,
    ) -> Result<AnalysisResult, BackendError> {
        let url = self.endpoint(&self.config.routes.analyze);
        debug!("POST {} ({} bytes)", url, file.size());

        let part = Part::bytes(file.bytes.clone())
            .file_name(file.name.clone())
            .mime_str(DOCX_MEDIA_TYPE)
            .map_err(|e| BackendError::Network(format!("Failed to build upload: {}", e)))?;

        let mut form = Form::new().part("file", part);
        if !selection.is_empty() {
            let marks = serde_json::to_string(&selection.to_vec())
                .map_err(|e| BackendError::Network(format!("Failed to encode selection: {}", e)))?;
            form = form.text("selected_marks", marks);
        }

        let response = self
            .send(self.http_client.post(&url).multipart(form))
            .await?;

        let body: Value = response
            .json()
            .await
            .map_err(|e| BackendError::MalformedResponse(format!("invalid JSON: {}", e)))?;

        AnalysisResult::from_json(&body)
    }

    async fn export_csv(&self, result: &AnalysisResult) -> Result<Artifact, BackendError> {
        let url = self.endpoint(&self.config.routes.csv);

        let request = match self.config.export_mode {
            ExportMode::Resubmit => {
                debug!("POST {}", url);
                self.http_client.post(&url).json(&result.to_wire_json())
            }
            ExportMode::LastResult => {
                debug!("GET {}", url);
                self.http_client.get(&url)
            }
        };

        self.fetch_artifact(ArtifactKind::Csv, request).await
    }

    async fn export_graph(&self, graph: &GraphRequest) -> Result<Artifact, BackendError> {
        let url = self.endpoint(&self.config.routes.graph);

        let request = match self.config.export_mode {
            ExportMode::Resubmit => {
                debug!("POST {} ({} marks)", url, graph.selected_marks.len());
                self.http_client.post(&url).json(graph)
            }
            ExportMode::LastResult => {
                debug!("GET {}", url);
                self.http_client.get(&url)
            }
        };

        self.fetch_artifact(ArtifactKind::Graph, request).await
    }
}

/// Join a base URL and a route with exactly one slash between them.
fn join_url(base: &str, route: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        route.trim_start_matches('/')
    )
}

/// `text/csv; charset=utf-8` -> `text/csv`
fn media_type_essence(header: &str) -> String {
    header
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Prefer the service's `{"error": ...}` message, else a truncated body.
fn summarize_error_body(body: &str) -> String {
    if let Ok(Value::Object(object)) = serde_json::from_str::<Value>(body) {
        if let Some(message) = object.get("error").and_then(Value::as_str) {
            return message.to_string();
        }
    }

    let trimmed = body.trim();
    if trimmed.len() <= MAX_ERROR_BODY {
        return trimmed.to_string();
    }

    let mut end = MAX_ERROR_BODY;
    while !trimmed.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &trimmed[..end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PunctuationCategory;
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Serve one canned HTTP response and hand back the raw request.
    async fn serve_once(
        status: &'static str,
        content_type: Option<&'static str>,
        body: Vec<u8>,
    ) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let request = read_request(&mut socket).await;

            let mut head = format!(
                "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n",
                status,
                body.len()
            );
            if let Some(content_type) = content_type {
                head.push_str(&format!("Content-Type: {}\r\n", content_type));
            }
            head.push_str("\r\n");

            socket.write_all(head.as_bytes()).await.unwrap();
            socket.write_all(&body).await.unwrap();
            socket.shutdown().await.unwrap();
            request
        });

        (base_url, handle)
    }

    async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];

        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);

            let text = String::from_utf8_lossy(&buf).to_string();
            if let Some(header_end) = text.find("\r\n\r\n") {
                let head = text[..header_end].to_ascii_lowercase();
                let body_len = buf.len() - (header_end + 4);

                if head.contains("transfer-encoding: chunked") {
                    if text.ends_with("0\r\n\r\n") {
                        break;
                    }
                    continue;
                }

                let expected = head
                    .lines()
                    .find_map(|l| l.strip_prefix("content-length:"))
                    .and_then(|v| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if body_len >= expected {
                    break;
                }
            }
        }

        String::from_utf8_lossy(&buf).to_string()
    }

    fn backend_for(base_url: &str, mode: ExportMode) -> HttpBackend {
        let config = BackendConfig {
            base_url: base_url.to_string(),
            timeout_seconds: 5,
            export_mode: mode,
            ..BackendConfig::default()
        };
        HttpBackend::new(config).unwrap()
    }

    fn sample_result() -> AnalysisResult {
        AnalysisResult::from_json(&json!({
            "filename": "report.docx",
            "word_count": 120,
            "commas": 5,
            "full_stops": 10
        }))
        .unwrap()
    }

    #[test]
    fn test_join_url() {
        assert_eq!(join_url("http://h/api/", "/analyze"), "http://h/api/analyze");
        assert_eq!(join_url("http://h", "csv"), "http://h/csv");
    }

    #[test]
    fn test_media_type_essence() {
        assert_eq!(media_type_essence("text/csv; charset=utf-8"), "text/csv");
        assert_eq!(media_type_essence("Image/PNG"), "image/png");
    }

    #[test]
    fn test_summarize_error_body() {
        assert_eq!(
            summarize_error_body(r#"{"error": "No file uploaded"}"#),
            "No file uploaded"
        );
        assert_eq!(summarize_error_body("  boom \n"), "boom");

        let long = "é".repeat(MAX_ERROR_BODY);
        let summary = summarize_error_body(&long);
        assert!(summary.ends_with("..."));
        assert!(summary.len() <= MAX_ERROR_BODY + 3);
    }

    #[tokio::test]
    async fn test_analyze_uploads_multipart() {
        let body = serde_json::to_vec(&json!({
            "filename": "report.docx",
            "word_count": 120,
            "commas": 5,
            "full_stops": 10
        }))
        .unwrap();
        let (base_url, server) = serve_once("200 OK", Some("application/json"), body).await;
        let backend = backend_for(&base_url, ExportMode::Resubmit);

        let file = UploadedFile::from_bytes("report.docx", b"PK\x03\x04docx".to_vec());
        let selection: SelectionSet =
            [PunctuationCategory::Commas, PunctuationCategory::FullStops]
                .into_iter()
                .collect();

        let result = backend.analyze(&file, &selection).await.unwrap();
        assert_eq!(result, sample_result());

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /analyze "));
        assert!(request.contains("filename=\"report.docx\""));
        assert!(request.contains("name=\"selected_marks\""));
        assert!(request.contains(r#"["commas","full_stops"]"#));
    }

    #[tokio::test]
    async fn test_analyze_maps_status_errors() {
        let (base_url, server) = serve_once(
            "400 Bad Request",
            Some("application/json"),
            br#"{"error": "No file uploaded"}"#.to_vec(),
        )
        .await;
        let backend = backend_for(&base_url, ExportMode::Resubmit);
        let file = UploadedFile::from_bytes("report.docx", vec![1]);

        let err = backend
            .analyze(&file, &SelectionSet::new())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            BackendError::Status {
                status: 400,
                body: "No file uploaded".to_string()
            }
        );
        let request = server.await.unwrap();
        assert!(!request.contains("selected_marks"));
    }

    #[tokio::test]
    async fn test_export_csv_resubmits_result() {
        let (base_url, server) = serve_once(
            "200 OK",
            Some("text/csv; charset=utf-8"),
            b"filename,word_count\nreport.docx,120\n".to_vec(),
        )
        .await;
        let backend = backend_for(&base_url, ExportMode::Resubmit);

        let artifact = backend.export_csv(&sample_result()).await.unwrap();
        assert_eq!(artifact.kind, ArtifactKind::Csv);
        assert_eq!(artifact.media_type, "text/csv");
        assert!(!artifact.is_empty());

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /csv "));
        assert!(request.contains("\"word_count\":120"));
    }

    #[tokio::test]
    async fn test_export_graph_last_result_uses_get() {
        let (base_url, server) =
            serve_once("200 OK", Some("image/png"), vec![0x89, b'P', b'N', b'G']).await;
        let backend = backend_for(&base_url, ExportMode::LastResult);

        let selection: SelectionSet = [PunctuationCategory::Commas].into_iter().collect();
        let request = GraphRequest::new("report.docx", &selection, &sample_result());
        let artifact = backend.export_graph(&request).await.unwrap();
        assert_eq!(artifact.media_type, "image/png");

        let raw = server.await.unwrap();
        assert!(raw.starts_with("GET /graph "));
    }

    #[tokio::test]
    async fn test_export_rejects_wrong_media_type() {
        let (base_url, _server) = serve_once(
            "200 OK",
            Some("application/json"),
            br#"{"error": "CSV not found"}"#.to_vec(),
        )
        .await;
        let backend = backend_for(&base_url, ExportMode::LastResult);

        let err = backend.export_csv(&sample_result()).await.unwrap_err();
        assert_eq!(
            err,
            BackendError::UnexpectedMediaType {
                expected: "text/csv".to_string(),
                actual: "application/json".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_export_rejects_empty_payload() {
        let (base_url, _server) = serve_once("200 OK", None, Vec::new()).await;
        let backend = backend_for(&base_url, ExportMode::LastResult);

        let err = backend.export_csv(&sample_result()).await.unwrap_err();
        assert!(matches!(err, BackendError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let backend = backend_for(&base_url, ExportMode::Resubmit);
        let err = backend.export_csv(&sample_result()).await.unwrap_err();
        assert!(matches!(err, BackendError::Network(_)));
    }
}
