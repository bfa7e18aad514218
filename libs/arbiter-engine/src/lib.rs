//! Judging orchestrator: dispatches execution requests to a remote backend,
//! polls them to completion, falls back to local simulation when the backend
//! is down, and compares and aggregates the results.

pub mod client;
pub mod comparator;
pub mod fallback;
pub mod heuristics;
pub mod orchestrator;
pub mod validator;

#[cfg(test)]
mod test_support;

pub use client::{ExecutionBackend, RemoteExecutionClient};
pub use comparator::{compare, Comparison};
pub use fallback::FallbackExecutor;
pub use orchestrator::Orchestrator;
pub use validator::Validator;
