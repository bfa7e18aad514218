// Scripted in-memory backend for orchestrator and validator tests

use crate::client::ExecutionBackend;
use arbiter_common::types::{ExecutionRequest, HealthReport, JobHandle, JobResult, StatusKind};
use arbiter_common::{ClientError, EngineConfig};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// What the backend does with one submission
#[derive(Debug, Clone)]
pub enum Plan {
    /// Reports Running for `pending` polls, then `result`
    Complete {
        pending: u32,
        result: JobResult,
        submit_delay_ms: u64,
    },
    /// Never leaves Queued
    NeverFinishes,
    SubmitFails(ClientError),
    /// Every fetch fails with this error
    FetchFails(ClientError),
}

impl Plan {
    pub fn accepted(stdout: &str) -> Self {
        Plan::Complete {
            pending: 0,
            result: JobResult::new(StatusKind::Accepted)
                .with_stdout(stdout)
                .with_usage(10, 1000),
            submit_delay_ms: 0,
        }
    }
}

type Responder = Box<dyn Fn(&ExecutionRequest) -> Plan + Send + Sync>;

pub struct ScriptedBackend {
    healthy: bool,
    responder: Responder,
    jobs: Mutex<HashMap<String, (Plan, u32)>>,
    submitted: Mutex<Vec<ExecutionRequest>>,
    next_token: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    fetch_delay_ms: u64,
    fetches_in_flight: AtomicUsize,
    max_fetches_in_flight: AtomicUsize,
}

impl ScriptedBackend {
    pub fn new(responder: impl Fn(&ExecutionRequest) -> Plan + Send + Sync + 'static) -> Self {
        Self {
            healthy: true,
            responder: Box::new(responder),
            jobs: Mutex::new(HashMap::new()),
            submitted: Mutex::new(Vec::new()),
            next_token: AtomicUsize::new(1),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            fetch_delay_ms: 0,
            fetches_in_flight: AtomicUsize::new(0),
            max_fetches_in_flight: AtomicUsize::new(0),
        }
    }

    /// Every fetch sleeps this long before answering
    pub fn with_fetch_delay(mut self, delay_ms: u64) -> Self {
        self.fetch_delay_ms = delay_ms;
        self
    }

    pub fn unhealthy() -> Self {
        Self {
            healthy: false,
            ..Self::new(|_| Plan::NeverFinishes)
        }
    }

    pub fn submissions(&self) -> usize {
        self.submitted.lock().unwrap().len()
    }

    pub fn submitted_requests(&self) -> Vec<ExecutionRequest> {
        self.submitted.lock().unwrap().clone()
    }

    pub fn polls(&self, token: &str) -> u32 {
        self.jobs
            .lock()
            .unwrap()
            .get(token)
            .map(|(_, polls)| *polls)
            .unwrap_or(0)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn max_fetches_in_flight(&self) -> usize {
        self.max_fetches_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ExecutionBackend for ScriptedBackend {
    async fn probe_health(&self) -> HealthReport {
        if self.healthy {
            HealthReport::healthy("scripted backend")
        } else {
            HealthReport::unhealthy("scripted backend is down")
        }
    }

    async fn submit_one(&self, request: &ExecutionRequest) -> Result<JobHandle, ClientError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let plan = (self.responder)(request);
        if let Plan::Complete { submit_delay_ms, .. } = &plan {
            tokio::time::sleep(Duration::from_millis(*submit_delay_ms)).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        self.submitted.lock().unwrap().push(request.clone());
        if let Plan::SubmitFails(e) = plan {
            return Err(e);
        }

        let token = format!("tok-{}", self.next_token.fetch_add(1, Ordering::SeqCst));
        self.jobs.lock().unwrap().insert(token.clone(), (plan, 0));
        Ok(JobHandle::remote(token))
    }

    async fn fetch_result(&self, handle: &JobHandle) -> Result<JobResult, ClientError> {
        let now = self.fetches_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_fetches_in_flight.fetch_max(now, Ordering::SeqCst);
        if self.fetch_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.fetch_delay_ms)).await;
        }
        self.fetches_in_flight.fetch_sub(1, Ordering::SeqCst);

        let mut jobs = self.jobs.lock().unwrap();
        let Some((plan, polls)) = jobs.get_mut(handle.token()) else {
            return Err(ClientError::NotFound(handle.token().to_string()));
        };
        *polls += 1;

        match plan {
            Plan::Complete { pending, result, .. } => {
                if *polls <= *pending {
                    Ok(JobResult::new(StatusKind::Running))
                } else {
                    Ok(result.clone())
                }
            }
            Plan::NeverFinishes => Ok(JobResult::new(StatusKind::Queued)),
            Plan::FetchFails(e) => Err(e.clone()),
            Plan::SubmitFails(e) => Err(e.clone()),
        }
    }
}

/// Fast polling so budget-exhaustion tests finish quickly
pub fn fast_config() -> EngineConfig {
    EngineConfig {
        poll_attempts: 5,
        poll_delay_ms: 5,
        max_concurrent_dispatch: 4,
        ..EngineConfig::default()
    }
}
