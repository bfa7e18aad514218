// HTTP route handlers for the Arbiter API

use arbiter_common::types::{ExecutionRequest, JobHandle, TestCase};
use arbiter_common::{ClientError, LanguageCatalog, ValidationError};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateRequest {
    pub source_code: String,
    pub language_id: u32,
    #[serde(default)]
    pub test_cases: Vec<TestCase>,
    #[serde(default)]
    pub problem_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    pub source_code: String,
    pub language_id: u32,
    #[serde(default)]
    pub stdin: Option<String>,
    #[serde(default)]
    pub test_cases: Option<Vec<TestCase>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub success: bool,
    pub tokens: Vec<String>,
    pub degraded: bool,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(json!({
            "success": false,
            "error": message.into(),
        })),
    )
        .into_response()
}

fn client_error_response(e: &ClientError) -> Response {
    if e.is_input_error() {
        warn!(error = %e, "Rejected request");
        error_response(StatusCode::BAD_REQUEST, e.to_string())
    } else {
        error!(error = %e, "Request failed");
        error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    }
}

/// POST /validate - Judge source code against a set of test cases
pub async fn validate(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ValidateRequest>,
) -> Response {
    let result = state
        .validator
        .validate(
            &payload.source_code,
            payload.language_id,
            &payload.test_cases,
            payload.problem_id,
        )
        .await;

    match result {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(ValidationError::EmptyTestCases) => {
            error_response(StatusCode::BAD_REQUEST, ValidationError::EmptyTestCases.to_string())
        }
        Err(ValidationError::Client(e)) => client_error_response(&e),
    }
}

/// POST /submissions - Dispatch one job, or one per test case
pub async fn submit(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SubmitRequest>,
) -> Response {
    let requests: Vec<ExecutionRequest> = match payload.test_cases {
        Some(cases) if !cases.is_empty() => cases
            .into_iter()
            .map(|case| {
                ExecutionRequest::new(payload.source_code.as_str(), payload.language_id, case.input)
                    .with_expected_output(case.expected_output)
            })
            .collect(),
        _ => vec![ExecutionRequest::new(
            payload.source_code,
            payload.language_id,
            payload.stdin.unwrap_or_default(),
        )],
    };

    match state.orchestrator.dispatch_all(requests).await {
        Ok(handles) => {
            let degraded = handles.iter().any(|h| h.is_fallback());
            info!(
                language_id = payload.language_id,
                jobs = handles.len(),
                degraded,
                "Submissions dispatched"
            );
            (
                StatusCode::CREATED,
                Json(SubmitResponse {
                    success: true,
                    tokens: handles.iter().map(|h| h.token().to_string()).collect(),
                    degraded,
                }),
            )
                .into_response()
        }
        Err(e) => client_error_response(&e),
    }
}

/// GET /submissions/{tokens} - Current result for one token, or a
/// comma-separated batch
pub async fn get_results(
    State(state): State<Arc<AppState>>,
    Path(tokens): Path<String>,
) -> Response {
    let tokens: Vec<String> = tokens
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect();

    match tokens.as_slice() {
        [] => error_response(StatusCode::BAD_REQUEST, "At least one token is required"),
        [token] => {
            let handle = JobHandle::from_token(token.as_str());
            let result = state.orchestrator.lookup(&handle).await;
            info!(token = %token, status = ?result.status, "Result retrieved");
            (StatusCode::OK, Json(result)).into_response()
        }
        many => {
            let batch = state.orchestrator.lookup_all(many).await;
            info!(total = batch.total, passed = batch.passed, "Batch results retrieved");
            (StatusCode::OK, Json(batch)).into_response()
        }
    }
}

/// GET /languages - Supported language ids
pub async fn list_languages() -> impl IntoResponse {
    let catalog = LanguageCatalog::global();
    (
        StatusCode::OK,
        Json(json!({
            "success": true,
            "count": catalog.len(),
            "languages": catalog.entries(),
        })),
    )
}

/// GET /health - Reports backend availability; the API itself is up if this answers
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let report = state.orchestrator.probe_health().await;
    let mode = if report.is_healthy() { "remote" } else { "fallback" };
    (
        StatusCode::OK,
        Json(json!({
            "success": true,
            "backend": report,
            "mode": mode,
        })),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbiter_common::types::{BatchLookup, JobResult, StatusKind, ValidationReport};
    use arbiter_common::EngineConfig;

    /// State pointing at a closed port, so every job runs in fallback mode
    async fn make_state() -> Arc<AppState> {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let config = EngineConfig {
            base_url: format!("http://{}", addr),
            health_probe_timeout_ms: 500,
            poll_delay_ms: 5,
            ..EngineConfig::default()
        };
        Arc::new(AppState::new(&config).unwrap())
    }

    async fn body_json<T: serde::de::DeserializeOwned>(response: Response) -> T {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn two_sum_request(test_cases: Vec<TestCase>) -> ValidateRequest {
        ValidateRequest {
            source_code: "def two_sum(nums, target):\n    seen = {}\n    for i, n in enumerate(nums):\n        if target - n in seen:\n            return [seen[target - n], i]\n        seen[n] = i\n".to_string(),
            language_id: 71,
            test_cases,
            problem_id: Some("two-sum".to_string()),
        }
    }

    #[tokio::test]
    async fn test_validate_in_degraded_mode() {
        let state = make_state().await;
        let payload = two_sum_request(vec![
            TestCase::new("[2,7,11,15]\n9", "[0,1]"),
            TestCase::new("[3,2,4]\n6", "[1,2]"),
        ]);

        let response = validate(State(state), Json(payload)).await;
        assert_eq!(response.status(), StatusCode::OK);

        let report: ValidationReport = body_json(response).await;
        assert!(report.degraded);
        assert!(report.summary.all_passed);
        assert_eq!(report.problem_id.as_deref(), Some("two-sum"));
        assert_eq!(report.message, "All 2 test cases passed!");
    }

    #[tokio::test]
    async fn test_validate_rejects_bad_input() {
        let state = make_state().await;

        let response = validate(State(state.clone()), Json(two_sum_request(vec![]))).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let mut payload = two_sum_request(vec![TestCase::new("1", "1")]);
        payload.language_id = 1;
        let response = validate(State(state), Json(payload)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = body_json(response).await;
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().contains("Unsupported language"));
    }

    #[tokio::test]
    async fn test_submit_then_fetch_batch() {
        let state = make_state().await;
        let payload = SubmitRequest {
            source_code: "print(input())".to_string(),
            language_id: 71,
            stdin: None,
            test_cases: Some(vec![TestCase::new("a", "a"), TestCase::new("b", "b")]),
        };

        let response = submit(State(state.clone()), Json(payload)).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let submitted: serde_json::Value = body_json(response).await;
        assert_eq!(submitted["degraded"], true);
        let tokens: Vec<String> = serde_json::from_value(submitted["tokens"].clone()).unwrap();
        assert_eq!(tokens.len(), 2);

        let response = get_results(State(state.clone()), Path(tokens.join(","))).await;
        let batch: BatchLookup = body_json(response).await;
        assert_eq!(batch.total, 2);
        assert!(batch.results.iter().all(|r| r.simulated));

        let response = get_results(State(state), Path(tokens[0].clone())).await;
        let single: JobResult = body_json(response).await;
        assert_eq!(single.status, StatusKind::Accepted);
    }

    #[tokio::test]
    async fn test_get_results_requires_token() {
        let state = make_state().await;
        let response = get_results(State(state), Path(" , ".to_string())).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_health_reports_fallback_mode() {
        let state = make_state().await;
        let response = health_check(State(state)).await.into_response();
        let body: serde_json::Value = body_json(response).await;
        assert_eq!(body["mode"], "fallback");
        assert_eq!(body["backend"]["state"], "unhealthy");
    }
}
