//! Validation Aggregator - Test-Case Judging
//!
//! **Core Responsibility:**
//! Run a source file against every test case and produce one report.
//!
//! The backend sees each case's expected output and reports its own verdict,
//! but `passed` on an outcome comes from [`compare`] alone. The only status
//! that overrides the comparator is `Error`: a job that never completed has
//! no output worth comparing.

use crate::comparator::compare;
use crate::orchestrator::Orchestrator;
use arbiter_common::types::{
    ExecutionRequest, JobResult, StatusKind, TestCase, TestCaseOutcome, ValidationReport,
    ValidationSummary,
};
use arbiter_common::ValidationError;
use chrono::Utc;
use tracing::{info, instrument};

#[derive(Clone)]
pub struct Validator {
    orchestrator: Orchestrator,
}

impl Validator {
    pub fn new(orchestrator: Orchestrator) -> Self {
        Self { orchestrator }
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    /// Judge `source_code` against every test case.
    ///
    /// Fails only for malformed input: an empty case list, an unsupported
    /// language or blank source. Per-job faults show up as failed outcomes.
    #[instrument(skip(self, source_code, test_cases), fields(cases = test_cases.len()))]
    pub async fn validate(
        &self,
        source_code: &str,
        language_id: u32,
        test_cases: &[TestCase],
        problem_id: Option<String>,
    ) -> Result<ValidationReport, ValidationError> {
        if test_cases.is_empty() {
            return Err(ValidationError::EmptyTestCases);
        }

        let requests = test_cases
            .iter()
            .map(|case| {
                ExecutionRequest::new(source_code, language_id, case.input.as_str())
                    .with_expected_output(case.expected_output.as_str())
            })
            .collect();

        let handles = self.orchestrator.dispatch_all(requests).await?;
        let degraded = handles.iter().any(|h| h.is_fallback());
        let results = self.orchestrator.await_all(&handles).await;

        let outcomes: Vec<TestCaseOutcome> = test_cases
            .iter()
            .zip(results)
            .enumerate()
            .map(|(i, (case, result))| build_outcome(i + 1, case, result))
            .collect();

        let summary = ValidationSummary::from_outcomes(&outcomes);
        let message = if summary.all_passed {
            format!("All {} test cases passed!", summary.total)
        } else {
            format!(
                "{} out of {} test cases failed.",
                summary.failed_count, summary.total
            )
        };

        info!(
            problem_id = problem_id.as_deref().unwrap_or("-"),
            language_id,
            passed = summary.passed_count,
            failed = summary.failed_count,
            degraded,
            "Validation complete"
        );

        Ok(ValidationReport {
            problem_id,
            summary,
            outcomes,
            message,
            degraded,
            completed_at: Utc::now(),
        })
    }
}

fn build_outcome(index: usize, case: &TestCase, result: JobResult) -> TestCaseOutcome {
    let (passed, comparison_note) = if result.status == StatusKind::Error {
        let reason = result.diagnostic().unwrap_or("unknown fault");
        (false, format!("Job did not complete: {}", reason))
    } else {
        let verdict = compare(&result.stdout, &case.expected_output);
        (verdict.passed, verdict.note)
    };

    TestCaseOutcome {
        index,
        input: case.input.clone(),
        expected_output: case.expected_output.clone(),
        error: result.diagnostic().map(str::to_string),
        actual_output: result.stdout,
        status: result.status,
        passed,
        time_ms: result.time_ms,
        memory_kb: result.memory_kb,
        comparison_note,
    }
}
