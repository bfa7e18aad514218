//! Dispatch & Poll Orchestrator - Concurrent Job Lifecycle
//!
//! **Responsibility:**
//! Fan requests out to the backend, poll each job to a terminal status, and
//! hand results back in input order.
//!
//! **Architecture:**
//! 1. Validate every request up front (input errors never reach the backend)
//! 2. Probe backend health once; unhealthy → every request goes to the
//!    fallback executor
//! 3. One task per request, capped by a semaphore, each tagged with its
//!    input index so completion order never affects output order
//! 4. Poll with a fixed budget and delay; `NotFound` and mid-poll
//!    `BackendUnavailable` end the loop at once
//!
//! Once a real submission succeeded its job is never simulated. A job that
//! cannot be resolved ends as `StatusKind::Error`, and siblings carry on.

use crate::client::{validate_request, ExecutionBackend};
use crate::fallback::FallbackExecutor;
use arbiter_common::types::{
    BatchLookup, ExecutionRequest, HandleRoute, HealthReport, JobHandle, JobResult,
};
use arbiter_common::{ClientError, EngineConfig};
use futures_util::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};

#[derive(Clone)]
pub struct Orchestrator {
    backend: Arc<dyn ExecutionBackend>,
    fallback: Arc<FallbackExecutor>,
    permits: Arc<Semaphore>,
    poll_attempts: u32,
    poll_delay: Duration,
}

impl Orchestrator {
    pub fn new(
        backend: Arc<dyn ExecutionBackend>,
        fallback: FallbackExecutor,
        config: &EngineConfig,
    ) -> Self {
        Self {
            backend,
            fallback: Arc::new(fallback),
            permits: Arc::new(Semaphore::new(config.max_concurrent_dispatch.max(1))),
            poll_attempts: config.poll_attempts.max(1),
            poll_delay: config.poll_delay(),
        }
    }

    pub fn backend(&self) -> &Arc<dyn ExecutionBackend> {
        &self.backend
    }

    pub async fn probe_health(&self) -> HealthReport {
        self.backend.probe_health().await
    }

    /// Submit every request concurrently; handles come back in input order
    #[instrument(skip_all, fields(requests = requests.len()))]
    pub async fn dispatch_all(
        &self,
        requests: Vec<ExecutionRequest>,
    ) -> Result<Vec<JobHandle>, ClientError> {
        for request in &requests {
            validate_request(request)?;
        }
        if requests.is_empty() {
            return Ok(Vec::new());
        }

        let health = self.backend.probe_health().await;
        if !health.is_healthy() {
            warn!(
                message = %health.message,
                "Backend unhealthy, routing every request to the fallback executor"
            );
            return Ok(requests.into_iter().map(JobHandle::fallback).collect());
        }

        let tasks: Vec<_> = requests
            .into_iter()
            .enumerate()
            .map(|(index, request)| {
                let this = self.clone();
                tokio::spawn(async move { this.dispatch_one(index, request).await })
            })
            .collect();

        let handles = join_all(tasks)
            .await
            .into_iter()
            .map(|joined| {
                joined.unwrap_or_else(|e| JobHandle::rejected(format!("dispatch task failed: {}", e)))
            })
            .collect();

        Ok(handles)
    }

    async fn dispatch_one(&self, index: usize, request: ExecutionRequest) -> JobHandle {
        let _permit = self.permits.clone().acquire_owned().await.ok();

        match self.backend.submit_one(&request).await {
            Ok(handle) => {
                debug!(index, token = %handle, "Dispatched");
                handle
            }
            Err(e) if e.routes_to_fallback() => {
                warn!(index, error = %e, "Submission failed, routing to fallback executor");
                JobHandle::fallback(request)
            }
            Err(e) => {
                warn!(index, error = %e, "Submission rejected");
                JobHandle::rejected(e.to_string())
            }
        }
    }

    /// Resolve one handle to a terminal result
    pub async fn await_result(&self, handle: &JobHandle) -> JobResult {
        match handle.route() {
            HandleRoute::Remote => self.poll(handle).await,
            _ => self.resolve_locally(handle),
        }
    }

    /// Await every handle concurrently; results come back in input order.
    /// One failing job never cancels its siblings.
    #[instrument(skip_all, fields(handles = handles.len()))]
    pub async fn await_all(&self, handles: &[JobHandle]) -> Vec<JobResult> {
        let tasks: Vec<_> = handles
            .iter()
            .cloned()
            .map(|handle| {
                let this = self.clone();
                tokio::spawn(async move {
                    let _permit = this.permits.clone().acquire_owned().await.ok();
                    this.await_result(&handle).await
                })
            })
            .collect();

        join_all(tasks)
            .await
            .into_iter()
            .map(|joined| {
                joined.unwrap_or_else(|e| JobResult::error(format!("poll task failed: {}", e)))
            })
            .collect()
    }

    /// Single fetch without polling, for callers that poll themselves
    pub async fn lookup(&self, handle: &JobHandle) -> JobResult {
        match handle.route() {
            HandleRoute::Remote => match self.backend.fetch_result(handle).await {
                Ok(result) => result,
                Err(e) => {
                    warn!(token = %handle, error = %e, "Lookup failed");
                    JobResult::error(e.to_string())
                }
            },
            _ => self.resolve_locally(handle),
        }
    }

    /// Look up many tokens at once, sharing the dispatch concurrency cap
    pub async fn lookup_all(&self, tokens: &[String]) -> BatchLookup {
        let lookups = tokens.iter().map(|token| {
            let handle = JobHandle::from_token(token.as_str());
            async move {
                let _permit = self.permits.clone().acquire_owned().await.ok();
                self.lookup(&handle).await
            }
        });
        BatchLookup::new(join_all(lookups).await)
    }

    fn resolve_locally(&self, handle: &JobHandle) -> JobResult {
        match handle.route() {
            HandleRoute::Fallback => match handle.request() {
                Some(request) => self.fallback.run(request),
                None => self.fallback.run_detached(handle.token()),
            },
            _ => JobResult::error(
                handle
                    .diagnostic()
                    .unwrap_or("Submission was rejected by the execution backend"),
            ),
        }
    }

    async fn poll(&self, handle: &JobHandle) -> JobResult {
        let mut last = String::from("no response from backend");

        for attempt in 1..=self.poll_attempts {
            match self.backend.fetch_result(handle).await {
                Ok(result) if result.is_terminal() => {
                    debug!(token = %handle, attempt, status = ?result.status, "Job finished");
                    return result;
                }
                Ok(result) => {
                    debug!(
                        token = %handle,
                        attempt,
                        max_attempts = self.poll_attempts,
                        status = ?result.status,
                        "Job still pending"
                    );
                    last = format!("submission still {}", result.status.description());
                }
                Err(e) if e.is_terminal_for_poll() => {
                    warn!(token = %handle, attempt, error = %e, "Polling aborted");
                    return JobResult::error(e.to_string());
                }
                Err(e) => {
                    warn!(token = %handle, attempt, error = %e, "Poll attempt failed");
                    last = e.to_string();
                }
            }

            if attempt < self.poll_attempts {
                tokio::time::sleep(self.poll_delay).await;
            }
        }

        let exhausted = ClientError::RetryBudgetExhausted {
            attempts: self.poll_attempts,
            last,
        };
        info!(token = %handle, error = %exhausted, "Giving up on job");
        JobResult::error(exhausted.to_string())
    }
}
