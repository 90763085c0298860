//! HttpAnalysisService - multipart client for the analysis backend

use std::time::{Duration, Instant};

use contracts::{AnalysisService, ContractError, LogArtifact, ResultModel, ServiceConfig};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use tracing::{debug, instrument, warn};

use crate::decode::{decode_health, decode_report, decode_result, truncate};

/// Analysis service reached over HTTP
///
/// - `POST {base_url}/analyze` (multipart `file`) -> result JSON
/// - `POST {base_url}/report` (multipart `file`) -> `{"report": text}`
/// - `GET {base_url}/health` -> `{"status": "healthy"}`
#[derive(Debug, Clone)]
pub struct HttpAnalysisService {
    client: Client,
    base_url: String,
}

impl HttpAnalysisService {
    /// Build a client from service configuration
    pub fn new(config: &ServiceConfig) -> Result<Self, ContractError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ContractError::upstream("connect", e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn form(artifact: &LogArtifact) -> Result<Form, ContractError> {
        let part = Part::bytes(artifact.bytes.to_vec())
            .file_name(artifact.file_name.clone())
            .mime_str(artifact.format.mime_type())
            .map_err(|e| ContractError::upstream("upload", e.to_string()))?;
        Ok(Form::new().part("file", part))
    }

    /// POST the artifact and return the raw body of a 2xx response
    async fn upload(
        &self,
        operation: &'static str,
        artifact: &LogArtifact,
    ) -> Result<Vec<u8>, ContractError> {
        let started = Instant::now();
        let result = self.upload_inner(operation, artifact).await;
        observability::record_upstream_call(
            operation,
            result.is_ok(),
            started.elapsed().as_secs_f64() * 1000.0,
        );
        result
    }

    async fn upload_inner(
        &self,
        operation: &'static str,
        artifact: &LogArtifact,
    ) -> Result<Vec<u8>, ContractError> {
        let response = self
            .client
            .post(self.endpoint(operation))
            .multipart(Self::form(artifact)?)
            .send()
            .await
            .map_err(|e| ContractError::upstream(operation, transport_message(&e)))?;

        read_body(operation, response).await
    }
}

impl AnalysisService for HttpAnalysisService {
    fn name(&self) -> &str {
        "http"
    }

    #[instrument(
        name = "http_analysis_analyze",
        skip(self, artifact),
        fields(base_url = %self.base_url, file = %artifact.file_name, bytes = artifact.len())
    )]
    async fn analyze(&self, artifact: &LogArtifact) -> Result<ResultModel, ContractError> {
        let body = self.upload("analyze", artifact).await?;
        let result = decode_result(&body)?;
        debug!(issues = result.issues.len(), "analysis result received");
        Ok(result)
    }

    #[instrument(
        name = "http_analysis_report",
        skip(self, artifact),
        fields(base_url = %self.base_url, file = %artifact.file_name)
    )]
    async fn report(&self, artifact: &LogArtifact) -> Result<String, ContractError> {
        let body = self.upload("report", artifact).await?;
        decode_report(&body)
    }

    #[instrument(name = "http_analysis_health", skip(self), fields(base_url = %self.base_url))]
    async fn health(&self) -> Result<(), ContractError> {
        let response = self
            .client
            .get(self.endpoint("health"))
            .send()
            .await
            .map_err(|e| ContractError::upstream("health", transport_message(&e)))?;
        let body = read_body("health", response).await?;
        decode_health(&body)
    }
}

async fn read_body(
    operation: &str,
    response: reqwest::Response,
) -> Result<Vec<u8>, ContractError> {
    let status = response.status();
    let body = response
        .bytes()
        .await
        .map_err(|e| ContractError::upstream(operation, transport_message(&e)))?;

    if !status.is_success() {
        let text = String::from_utf8_lossy(&body);
        warn!(operation, %status, "analysis service returned an error status");
        return Err(ContractError::upstream(operation, status_message(status, &text)));
    }

    Ok(body.to_vec())
}

fn status_message(status: StatusCode, body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        format!("service responded with {status}")
    } else {
        format!("service responded with {status}: {}", truncate(body))
    }
}

fn transport_message(error: &reqwest::Error) -> String {
    if error.is_timeout() {
        "request timed out".to_string()
    } else if error.is_connect() {
        format!("could not reach analysis service: {error}")
    } else {
        error.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    const RESULT: &str = r#"{
        "kpis": {
            "avg_latency_ms": 45.2, "p95_latency_ms": 78.5, "max_latency_ms": 120.0,
            "path_length": 8.5, "straight_line_distance": 5.8, "path_efficiency": 0.68,
            "max_curvature": 0.15, "jerk_spikes": 3, "stalls": 1, "near_misses": 0
        },
        "issues": [],
        "derived": {
            "polyline": [],
            "obstacles_time_series": [{"t": 0.0, "obstacles": [], "pos": [0, 0]}],
            "latency_timeline": [{"t": 0.0, "latency": 45}],
            "speed_timeline": [{"t": 0.0, "speed": 0.0}],
            "curvature_timeline": [{"t": 0.0, "curvature": 0.0}]
        }
    }"#;

    /// Serve one canned HTTP response; returns the base URL and the raw request
    async fn serve_once(
        status_line: &'static str,
        body: &'static str,
    ) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let request = read_request(&mut stream).await;
            let response = format!(
                "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.unwrap();
            request
        });

        (format!("http://{addr}"), handle)
    }

    async fn read_request(stream: &mut tokio::net::TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = stream.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);

            let text = String::from_utf8_lossy(&buf);
            if let Some(header_end) = text.find("\r\n\r\n") {
                let content_length = text[..header_end]
                    .lines()
                    .find_map(|l| {
                        let lower = l.to_ascii_lowercase();
                        lower
                            .strip_prefix("content-length:")
                            .map(|v| v.trim().parse::<usize>().unwrap_or(0))
                    })
                    .unwrap_or(0);
                if buf.len() >= header_end + 4 + content_length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    fn service(base_url: String) -> HttpAnalysisService {
        HttpAnalysisService::new(&ServiceConfig {
            base_url,
            timeout_secs: 5,
        })
        .unwrap()
    }

    fn artifact() -> LogArtifact {
        LogArtifact::from_bytes("run_01.json", br#"{"run_id":"run_01","frames":[]}"#.to_vec())
            .unwrap()
    }

    #[tokio::test]
    async fn test_analyze_sends_multipart_file() {
        let (base_url, server) = serve_once("200 OK", RESULT).await;
        let result = service(base_url).analyze(&artifact()).await.unwrap();
        assert_eq!(result.kpis.stalls, 1.0);

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /analyze"));
        assert!(request.contains("name=\"file\""));
        assert!(request.contains("filename=\"run_01.json\""));
        assert!(request.contains("run_01"));
    }

    #[tokio::test]
    async fn test_error_body_with_ok_status() {
        let (base_url, _server) = serve_once("200 OK", r#"{"error": "Expecting value"}"#).await;
        let err = service(base_url).analyze(&artifact()).await.unwrap_err();
        assert!(matches!(err, ContractError::Upstream { .. }));
    }

    #[tokio::test]
    async fn test_non_success_status() {
        let (base_url, _server) =
            serve_once("500 Internal Server Error", r#"{"detail": "boom"}"#).await;
        let err = service(base_url).report(&artifact()).await.unwrap_err();
        assert!(err.to_string().contains("500"));
    }

    #[tokio::test]
    async fn test_report() {
        let (base_url, server) =
            serve_once("200 OK", r##"{"report": "# Planning Log Analysis Report"}"##).await;
        let report = service(format!("{base_url}/")).report(&artifact()).await.unwrap();
        assert!(report.contains("Analysis Report"));
        assert!(server.await.unwrap().starts_with("POST /report"));
    }

    #[tokio::test]
    async fn test_health() {
        let (base_url, server) = serve_once("200 OK", r#"{"status": "healthy"}"#).await;
        service(base_url).health().await.unwrap();
        assert!(server.await.unwrap().starts_with("GET /health"));
    }

    #[tokio::test]
    async fn test_unreachable_service() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = service(format!("http://{addr}"))
            .analyze(&artifact())
            .await
            .unwrap_err();
        assert!(err.is_upstream());
    }
}
