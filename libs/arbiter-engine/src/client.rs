//! Remote Execution Client - Judge0-Compatible Backend Access
//!
//! **Core Responsibility:**
//! Submit jobs, fetch their results, and probe backend health.
//!
//! **Critical Architectural Boundary:**
//! - Client knows HOW to talk to the backend (HTTP, wire format, encoding)
//! - Client does NOT retry; polling cadence belongs to the orchestrator
//! - Client does NOT compare outputs
//! - Client does NOT fall back; it reports `BackendUnavailable` upward
//!
//! Submissions are fire-and-forget (`wait=false`). "Still queued/running"
//! comes back from `fetch_result` as a normal non-terminal status.

use arbiter_common::types::{ExecutionRequest, HealthReport, JobHandle, JobResult, StatusKind};
use arbiter_common::{ClientError, EngineConfig, LanguageCatalog};
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Seam between the orchestrator and whatever actually runs code
#[async_trait]
pub trait ExecutionBackend: Send + Sync {
    /// Short-timeout availability gate. Never fails.
    async fn probe_health(&self) -> HealthReport;

    async fn submit_one(&self, request: &ExecutionRequest) -> Result<JobHandle, ClientError>;

    async fn fetch_result(&self, handle: &JobHandle) -> Result<JobResult, ClientError>;

    fn list_languages(&self) -> &'static LanguageCatalog {
        LanguageCatalog::global()
    }
}

/// Reject requests the backend must never see
pub fn validate_request(request: &ExecutionRequest) -> Result<(), ClientError> {
    let catalog = LanguageCatalog::global();
    if !catalog.is_supported(request.language_id) {
        let supported = catalog
            .ids()
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        return Err(ClientError::UnsupportedLanguage {
            id: request.language_id,
            supported,
        });
    }
    if request.source_code.trim().is_empty() {
        return Err(ClientError::EmptySource);
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct RemoteExecutionClient {
    http: reqwest::Client,
    base_url: String,
    request_timeout: Duration,
    health_timeout: Duration,
    base64_encoded: bool,
}

#[derive(Debug, Serialize)]
struct SubmissionBody {
    source_code: String,
    language_id: u32,
    stdin: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    expected_output: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: String,
}

#[derive(Debug, Deserialize)]
struct StatusBody {
    id: u32,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct LanguageBody {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct SubmissionResponse {
    stdout: Option<String>,
    stderr: Option<String>,
    compile_output: Option<String>,
    message: Option<String>,
    /// Seconds, sent as a string by Judge0
    time: Option<serde_json::Value>,
    /// Kilobytes
    memory: Option<f64>,
    status: Option<StatusBody>,
    language: Option<LanguageBody>,
}

impl RemoteExecutionClient {
    pub fn new(config: &EngineConfig) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| {
                ClientError::BackendUnavailable(format!("failed to build HTTP client: {}", e))
            })?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            request_timeout: config.request_timeout(),
            health_timeout: config.health_probe_timeout(),
            base64_encoded: config.base64_encoded,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn encode(&self, text: &str) -> String {
        if self.base64_encoded {
            general_purpose::STANDARD.encode(text)
        } else {
            text.to_string()
        }
    }

    /// Judge0 wraps base64 output at 60 columns, so whitespace is stripped first
    fn decode(&self, text: Option<String>) -> Result<String, ClientError> {
        let text = text.unwrap_or_default();
        if !self.base64_encoded || text.is_empty() {
            return Ok(text);
        }
        let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
        let bytes = general_purpose::STANDARD
            .decode(compact)
            .map_err(|e| ClientError::Decode(format!("invalid base64 field: {}", e)))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    fn transport_error(&self, err: reqwest::Error, timeout: Duration) -> ClientError {
        if err.is_timeout() {
            ClientError::Timeout(timeout)
        } else if err.is_decode() {
            ClientError::Decode(err.to_string())
        } else {
            ClientError::BackendUnavailable(err.to_string())
        }
    }

    async fn status_error(response: reqwest::Response) -> ClientError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| {
                v.get("message")
                    .or_else(|| v.get("error"))
                    .and_then(|m| m.as_str())
                    .map(str::to_string)
            })
            .unwrap_or(body);

        match status {
            StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT => {
                ClientError::BackendUnavailable(format!("{}: {}", status, message))
            }
            _ => ClientError::Rejected {
                status: status.as_u16(),
                message,
            },
        }
    }

    fn into_job_result(&self, body: SubmissionResponse) -> Result<JobResult, ClientError> {
        let status_body = body
            .status
            .ok_or_else(|| ClientError::Decode("response has no status".to_string()))?;
        let status = StatusKind::from_backend(status_body.id, &status_body.description);

        let mut result = JobResult::new(status);
        result.stdout = self.decode(body.stdout)?;
        result.stderr = self.decode(body.stderr)?;
        result.compile_output = self.decode(body.compile_output)?;
        result.message = self.decode(body.message)?;
        result.time_ms = body.time.as_ref().map(seconds_to_millis).unwrap_or(0);
        result.memory_kb = body.memory.map(|kb| kb.max(0.0).round() as u64).unwrap_or(0);
        result.language = body.language.map(|l| l.name).filter(|n| !n.is_empty());
        Ok(result)
    }
}

fn seconds_to_millis(value: &serde_json::Value) -> u64 {
    let seconds = match value {
        serde_json::Value::String(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        serde_json::Value::Number(n) => n.as_f64().unwrap_or(0.0),
        _ => 0.0,
    };
    (seconds.max(0.0) * 1000.0).round() as u64
}

#[async_trait]
impl ExecutionBackend for RemoteExecutionClient {
    async fn probe_health(&self) -> HealthReport {
        let url = format!("{}/languages", self.base_url);
        let response = self
            .http
            .get(&url)
            .timeout(self.health_timeout)
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => {
                let count = resp
                    .json::<Vec<serde_json::Value>>()
                    .await
                    .map(|langs| langs.len())
                    .unwrap_or(0);
                debug!(base_url = %self.base_url, languages = count, "Backend healthy");
                HealthReport::healthy(format!(
                    "Execution backend is available ({} languages)",
                    count
                ))
            }
            Ok(resp) => {
                warn!(base_url = %self.base_url, status = %resp.status(), "Backend health probe failed");
                HealthReport::unhealthy(format!(
                    "Execution backend is not available: HTTP {}",
                    resp.status()
                ))
            }
            Err(e) => {
                warn!(base_url = %self.base_url, error = %e, "Backend unreachable");
                HealthReport::unhealthy(format!("Execution backend is not available: {}", e))
            }
        }
    }

    async fn submit_one(&self, request: &ExecutionRequest) -> Result<JobHandle, ClientError> {
        validate_request(request)?;

        let body = SubmissionBody {
            source_code: self.encode(&request.source_code),
            language_id: request.language_id,
            stdin: self.encode(&request.input),
            expected_output: request.expected_output.as_deref().map(|e| self.encode(e)),
        };
        let url = format!(
            "{}/submissions?base64_encoded={}&wait=false",
            self.base_url, self.base64_encoded
        );

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(e, self.request_timeout))?;

        if !response.status().is_success() {
            return Err(Self::status_error(response).await);
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))?;

        info!(
            token = %token.token,
            language_id = request.language_id,
            "Submission accepted by backend"
        );
        Ok(JobHandle::remote(token.token))
    }

    async fn fetch_result(&self, handle: &JobHandle) -> Result<JobResult, ClientError> {
        let url = format!(
            "{}/submissions/{}?base64_encoded={}",
            self.base_url,
            handle.token(),
            self.base64_encoded
        );

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| self.transport_error(e, self.request_timeout))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(ClientError::NotFound(handle.token().to_string()));
        }
        if !response.status().is_success() {
            return Err(Self::status_error(response).await);
        }

        let body: SubmissionResponse = response
            .json()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))?;
        let result = self.into_job_result(body)?;

        debug!(token = %handle, status = ?result.status, "Fetched submission");
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_request() {
        assert!(validate_request(&ExecutionRequest::new("print(1)", 71, "")).is_ok());

        let err = validate_request(&ExecutionRequest::new("print(1)", 9999, "")).unwrap_err();
        assert!(matches!(err, ClientError::UnsupportedLanguage { id: 9999, .. }));
        assert!(err.to_string().contains("71"));

        let err = validate_request(&ExecutionRequest::new("  \n\t", 71, "")).unwrap_err();
        assert_eq!(err, ClientError::EmptySource);
    }

    #[test]
    fn test_seconds_to_millis() {
        assert_eq!(seconds_to_millis(&serde_json::json!("0.002")), 2);
        assert_eq!(seconds_to_millis(&serde_json::json!(1.5)), 1500);
        assert_eq!(seconds_to_millis(&serde_json::json!(null)), 0);
        assert_eq!(seconds_to_millis(&serde_json::json!("n/a")), 0);
    }

    #[test]
    fn test_decode_wrapped_base64() {
        let config = EngineConfig {
            base64_encoded: true,
            ..EngineConfig::default()
        };
        let client = RemoteExecutionClient::new(&config).unwrap();
        assert_eq!(client.encode("hi\n"), "aGkK");
        assert_eq!(client.decode(Some("aG\nkK\n".to_string())).unwrap(), "hi\n");
        assert_eq!(client.decode(None).unwrap(), "");
        assert!(matches!(
            client.decode(Some("***".to_string())),
            Err(ClientError::Decode(_))
        ));
    }
}
