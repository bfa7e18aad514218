use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Token prefix for jobs simulated locally by the fallback executor
pub const FALLBACK_PREFIX: &str = "fallback_";
/// Token prefix for submissions the backend refused outright
pub const REJECTED_PREFIX: &str = "rejected_";

/// One unit of work for the execution backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRequest {
    pub source_code: String,
    pub language_id: u32,
    #[serde(default)]
    pub input: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_output: Option<String>,
}

impl ExecutionRequest {
    pub fn new(source_code: impl Into<String>, language_id: u32, input: impl Into<String>) -> Self {
        Self {
            source_code: source_code.into(),
            language_id,
            input: input.into(),
            expected_output: None,
        }
    }

    pub fn with_expected_output(mut self, expected: impl Into<String>) -> Self {
        self.expected_output = Some(expected.into());
        self
    }
}

/// Caller-supplied test case
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    #[serde(default)]
    pub input: String,
    #[serde(default, alias = "output")]
    pub expected_output: String,
}

impl TestCase {
    pub fn new(input: impl Into<String>, expected_output: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            expected_output: expected_output.into(),
        }
    }
}

/// How a [`JobHandle`] is resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleRoute {
    /// Real backend token, resolved by polling
    Remote,
    /// Simulated locally, resolved by recomputation
    Fallback,
    /// Submission was refused, resolves to an error without a network call
    Rejected,
}

/// Opaque token for one dispatched execution request.
///
/// The token prefix is the only thing used to decide how a handle resolves.
/// Fallback handles keep the request they were issued for so the result can
/// be recomputed; rejected handles keep the refusal diagnostic.
#[derive(Debug, Clone)]
pub struct JobHandle {
    token: String,
    request: Option<Arc<ExecutionRequest>>,
    diagnostic: Option<String>,
}

impl JobHandle {
    /// Wrap a token issued by the remote backend
    pub fn remote(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            request: None,
            diagnostic: None,
        }
    }

    pub fn fallback(request: ExecutionRequest) -> Self {
        Self {
            token: format!("{}{}", FALLBACK_PREFIX, Uuid::new_v4().simple()),
            request: Some(Arc::new(request)),
            diagnostic: None,
        }
    }

    pub fn rejected(diagnostic: impl Into<String>) -> Self {
        Self {
            token: format!("{}{}", REJECTED_PREFIX, Uuid::new_v4().simple()),
            request: None,
            diagnostic: Some(diagnostic.into()),
        }
    }

    /// Rebuild a handle from a bare token, e.g. one a caller stored earlier.
    /// Fallback tokens rebuilt this way no longer know their request.
    pub fn from_token(token: impl Into<String>) -> Self {
        Self::remote(token)
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn route(&self) -> HandleRoute {
        if self.token.starts_with(FALLBACK_PREFIX) {
            HandleRoute::Fallback
        } else if self.token.starts_with(REJECTED_PREFIX) {
            HandleRoute::Rejected
        } else {
            HandleRoute::Remote
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.route() == HandleRoute::Fallback
    }

    pub fn request(&self) -> Option<&ExecutionRequest> {
        self.request.as_deref()
    }

    pub fn diagnostic(&self) -> Option<&str> {
        self.diagnostic.as_deref()
    }
}

impl fmt::Display for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.token)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusKind {
    Queued,
    Running,
    Accepted,
    WrongAnswer,
    TimeLimitExceeded,
    MemoryLimitExceeded,
    CompilationError,
    RuntimeError,
    Error,
}

impl StatusKind {
    /// Map a Judge0 status id and description onto a status kind
    pub fn from_backend(id: u32, description: &str) -> Self {
        if description.contains("Memory Limit") {
            return StatusKind::MemoryLimitExceeded;
        }
        match id {
            1 => StatusKind::Queued,
            2 => StatusKind::Running,
            3 => StatusKind::Accepted,
            4 => StatusKind::WrongAnswer,
            5 => StatusKind::TimeLimitExceeded,
            6 => StatusKind::CompilationError,
            7..=12 => StatusKind::RuntimeError,
            _ => StatusKind::Error,
        }
    }

    /// Anything other than Queued/Running
    pub fn is_terminal(&self) -> bool {
        !matches!(self, StatusKind::Queued | StatusKind::Running)
    }

    pub fn description(&self) -> &'static str {
        match self {
            StatusKind::Queued => "In Queue",
            StatusKind::Running => "Processing",
            StatusKind::Accepted => "Accepted",
            StatusKind::WrongAnswer => "Wrong Answer",
            StatusKind::TimeLimitExceeded => "Time Limit Exceeded",
            StatusKind::MemoryLimitExceeded => "Memory Limit Exceeded",
            StatusKind::CompilationError => "Compilation Error",
            StatusKind::RuntimeError => "Runtime Error",
            StatusKind::Error => "Error",
        }
    }
}

impl fmt::Display for StatusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Outcome of one job. `passed` always mirrors `status == Accepted`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobResult {
    pub status: StatusKind,
    pub stdout: String,
    pub stderr: String,
    pub compile_output: String,
    pub message: String,
    pub time_ms: u64,
    pub memory_kb: u64,
    pub passed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Set when the result came from the fallback executor
    #[serde(default)]
    pub simulated: bool,
}

impl JobResult {
    pub fn new(status: StatusKind) -> Self {
        Self {
            status,
            stdout: String::new(),
            stderr: String::new(),
            compile_output: String::new(),
            message: String::new(),
            time_ms: 0,
            memory_kb: 0,
            passed: status == StatusKind::Accepted,
            language: None,
            simulated: false,
        }
    }

    /// Fault result: retry budget exhausted, token unknown, transport gone
    pub fn error(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            stderr: message.clone(),
            message,
            ..Self::new(StatusKind::Error)
        }
    }

    pub fn with_stdout(mut self, stdout: impl Into<String>) -> Self {
        self.stdout = stdout.into();
        self
    }

    pub fn with_stderr(mut self, stderr: impl Into<String>) -> Self {
        self.stderr = stderr.into();
        self
    }

    pub fn with_usage(mut self, time_ms: u64, memory_kb: u64) -> Self {
        self.time_ms = time_ms;
        self.memory_kb = memory_kb;
        self
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// First non-empty of stderr and compile output
    pub fn diagnostic(&self) -> Option<&str> {
        [&self.stderr, &self.compile_output]
            .into_iter()
            .map(|s| s.trim())
            .find(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCaseOutcome {
    /// 1-based
    pub index: usize,
    pub input: String,
    pub expected_output: String,
    pub actual_output: String,
    pub status: StatusKind,
    pub passed: bool,
    pub time_ms: u64,
    pub memory_kb: u64,
    pub comparison_note: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationSummary {
    pub total: usize,
    pub passed_count: usize,
    pub failed_count: usize,
    pub all_passed: bool,
    pub avg_time_ms: f64,
    pub avg_memory_kb: f64,
}

impl ValidationSummary {
    pub fn from_outcomes(outcomes: &[TestCaseOutcome]) -> Self {
        let total = outcomes.len();
        let passed_count = outcomes.iter().filter(|o| o.passed).count();
        let (time, memory) = outcomes
            .iter()
            .fold((0u64, 0u64), |(t, m), o| (t + o.time_ms, m + o.memory_kb));
        let (avg_time_ms, avg_memory_kb) = if total == 0 {
            (0.0, 0.0)
        } else {
            (time as f64 / total as f64, memory as f64 / total as f64)
        };

        Self {
            total,
            passed_count,
            failed_count: total - passed_count,
            all_passed: total > 0 && passed_count == total,
            avg_time_ms,
            avg_memory_kb,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub problem_id: Option<String>,
    pub summary: ValidationSummary,
    pub outcomes: Vec<TestCaseOutcome>,
    pub message: String,
    /// True when any test case was simulated by the fallback executor
    pub degraded: bool,
    pub completed_at: DateTime<Utc>,
}

/// Results of a one-shot lookup over many tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchLookup {
    pub results: Vec<JobResult>,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
}

impl BatchLookup {
    pub fn new(results: Vec<JobResult>) -> Self {
        let passed = results.iter().filter(|r| r.passed).count();
        Self {
            total: results.len(),
            failed: results.len() - passed,
            passed,
            results,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    Healthy,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub state: HealthState,
    pub message: String,
}

impl HealthReport {
    pub fn healthy(message: impl Into<String>) -> Self {
        Self {
            state: HealthState::Healthy,
            message: message.into(),
        }
    }

    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self {
            state: HealthState::Unhealthy,
            message: message.into(),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.state == HealthState::Healthy
    }
}
