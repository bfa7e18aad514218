//! Fallback Executor - Local Simulation in Degraded Mode
//!
//! **Core Responsibility:**
//! Produce a [`JobResult`] shaped exactly like the backend's when the remote
//! execution backend is unreachable.
//!
//! **This does not execute code.** Results are derived from:
//! - A language-agnostic well-formedness check → `CompilationError`
//! - A pluggable classifier for the pair-sum problem shape: plausible
//!   solutions get the true answer from a reference algorithm, anything else
//!   gets a fixed placeholder answer
//! - A generic "executed" placeholder for every other input
//!
//! Every simulated result has `simulated = true` and carries a degraded-mode
//! note. Time and memory figures are random within fixed bounds but seeded
//! from the request, so recomputing the same request is byte-identical.

use crate::heuristics::{check_well_formed, HeuristicClassifier, PairSumClassifier, Plausibility};
use arbiter_common::types::{ExecutionRequest, JobResult, StatusKind};
use arbiter_common::LanguageCatalog;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::any::Any;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::panic::{self, AssertUnwindSafe};
use tracing::debug;

pub const DEGRADED_NOTE: &str =
    "Simulated result - execution backend is not available (degraded mode)";
/// stdout for inputs with no recognized problem shape
pub const PLACEHOLDER_STDOUT: &str = "Code executed successfully (simulated)";
/// stdout for pair-sum solutions the classifier rejects
pub const INCORRECT_PAIR_SUM_STDOUT: &str = "[0, 1]";

pub struct FallbackExecutor {
    classifier: Box<dyn HeuristicClassifier>,
}

impl Default for FallbackExecutor {
    fn default() -> Self {
        Self::with_classifier(PairSumClassifier)
    }
}

impl std::fmt::Debug for FallbackExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallbackExecutor")
            .field("classifier", &self.classifier.name())
            .finish()
    }
}

impl FallbackExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_classifier(classifier: impl HeuristicClassifier + 'static) -> Self {
        Self {
            classifier: Box::new(classifier),
        }
    }

    /// Simulate one request. Never panics: internal faults, including a
    /// panicking classifier, become `RuntimeError` with the fault in stderr.
    pub fn run(&self, request: &ExecutionRequest) -> JobResult {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.simulate(request)));

        let mut result = match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(fault)) => runtime_error(&fault),
            Err(payload) => runtime_error(&panic_message(payload)),
        };

        result.language = LanguageCatalog::global()
            .name(request.language_id)
            .map(str::to_string);
        result.simulated = true;
        if result.message.is_empty() {
            result.message = DEGRADED_NOTE.to_string();
        }

        debug!(
            status = ?result.status,
            classifier = self.classifier.name(),
            "Fallback execution simulated"
        );
        result
    }

    /// Result for a fallback token whose request is no longer known
    pub fn run_detached(&self, token: &str) -> JobResult {
        let mut rng = StdRng::seed_from_u64(seed_of(&token));
        let mut result = placeholder(&mut rng);
        result.simulated = true;
        result.message = DEGRADED_NOTE.to_string();
        result
    }

    fn simulate(&self, request: &ExecutionRequest) -> Result<JobResult, String> {
        if let Err(issue) = check_well_formed(&request.source_code, request.language_id) {
            let diagnostic = issue.to_string();
            let mut result = JobResult::new(StatusKind::CompilationError).with_stderr(&diagnostic);
            result.compile_output = diagnostic;
            result.message = format!("Compilation failed. {}", DEGRADED_NOTE);
            return Ok(result);
        }

        let mut rng = StdRng::seed_from_u64(seed_of(&(
            &request.source_code,
            &request.input,
            request.language_id,
        )));

        let Some((nums, target)) = parse_pair_sum_input(&request.input) else {
            return Ok(placeholder(&mut rng));
        };

        let stdout = match self.classifier.classify(&request.source_code) {
            Plausibility::PlausibleCorrect => {
                let pair = two_sum(&nums, target)?;
                serde_json::to_string(&pair).map_err(|e| e.to_string())?
            }
            Plausibility::PlausibleIncorrect => INCORRECT_PAIR_SUM_STDOUT.to_string(),
        };

        Ok(JobResult::new(StatusKind::Accepted)
            .with_stdout(stdout)
            .with_usage(rng.random_range(10..60), rng.random_range(100..600)))
    }
}

fn placeholder(rng: &mut StdRng) -> JobResult {
    JobResult::new(StatusKind::Accepted)
        .with_stdout(PLACEHOLDER_STDOUT)
        .with_usage(rng.random_range(10..110), rng.random_range(100..1100))
}

fn runtime_error(fault: &str) -> JobResult {
    let mut result = JobResult::new(StatusKind::RuntimeError)
        .with_stderr(format!("Simulated runtime error: {}", fault));
    result.message = format!("Execution failed. {}", DEGRADED_NOTE);
    result
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn seed_of<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// First non-empty line a JSON integer array, second an integer target
fn parse_pair_sum_input(input: &str) -> Option<(Vec<i64>, i64)> {
    let mut lines = input.lines().map(str::trim).filter(|l| !l.is_empty());
    let nums: Vec<i64> = serde_json::from_str(lines.next()?).ok()?;
    let target: i64 = lines.next()?.parse().ok()?;
    Some((nums, target))
}

/// Reference hash-map solution; empty when no pair sums to target
fn two_sum(nums: &[i64], target: i64) -> Result<Vec<usize>, String> {
    let mut seen: HashMap<i64, usize> = HashMap::new();
    for (i, &n) in nums.iter().enumerate() {
        let complement = target
            .checked_sub(n)
            .ok_or_else(|| format!("integer overflow computing {} - {}", target, n))?;
        if let Some(&j) = seen.get(&complement) {
            return Ok(vec![j, i]);
        }
        seen.insert(n, i);
    }
    Ok(Vec::new())
}
