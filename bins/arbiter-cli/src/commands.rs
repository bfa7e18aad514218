// CLI commands for driving the judging engine
use anyhow::{bail, Context, Result};
use arbiter_common::types::{ExecutionRequest, JobHandle, JobResult, TestCase, ValidationReport};
use arbiter_common::{EngineConfig, LanguageCatalog};
use arbiter_engine::{FallbackExecutor, Orchestrator, RemoteExecutionClient, Validator};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// Test-case files are either a bare array or wrapped in `testCases`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CasesFile {
    List(Vec<TestCase>),
    Wrapped {
        #[serde(rename = "testCases")]
        test_cases: Vec<TestCase>,
    },
}

pub fn load_config(backend_url: Option<&str>) -> Result<EngineConfig> {
    let mut config = EngineConfig::from_env().context("Invalid engine configuration")?;
    if let Some(url) = backend_url {
        config.base_url = url.trim_end_matches('/').to_string();
    }
    Ok(config)
}

fn build_orchestrator(config: &EngineConfig) -> Result<Orchestrator> {
    let client = RemoteExecutionClient::new(config).context("Failed to build backend client")?;
    Ok(Orchestrator::new(Arc::new(client), FallbackExecutor::new(), config))
}

/// Accept a numeric id or a catalog name
fn resolve_language(language: &str) -> Result<u32> {
    let catalog = LanguageCatalog::global();
    let id = match language.trim().parse::<u32>() {
        Ok(id) => id,
        Err(_) => match catalog.id_for(language.trim()) {
            Some(id) => id,
            None => bail!(
                "Unknown language '{}'. Run `arbiter-cli languages` to see supported languages",
                language
            ),
        },
    };
    if !catalog.is_supported(id) {
        bail!("Language id {} is not supported", id);
    }
    Ok(id)
}

fn read_source(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn parse_cases(content: &str) -> Result<Vec<TestCase>> {
    let cases = match serde_json::from_str::<CasesFile>(content)
        .context("Test-case file must be a JSON array or an object with testCases")?
    {
        CasesFile::List(cases) => cases,
        CasesFile::Wrapped { test_cases } => test_cases,
    };
    if cases.is_empty() {
        bail!("Test-case file contains no test cases");
    }
    Ok(cases)
}

fn print_result(token: &str, result: &JobResult) {
    let icon = if result.passed { "✅" } else { "❌" };
    println!("{} {} - {}", icon, token, result.status);
    if result.simulated {
        println!("   ⚠️  simulated (backend unavailable)");
    }
    println!("   time: {} ms, memory: {} KB", result.time_ms, result.memory_kb);
    if !result.stdout.is_empty() {
        println!("   stdout: {}", result.stdout.trim_end());
    }
    if let Some(diagnostic) = result.diagnostic() {
        println!("   stderr: {}", diagnostic);
    }
}

fn print_report(report: &ValidationReport) {
    for outcome in &report.outcomes {
        let icon = if outcome.passed { "✅" } else { "❌" };
        println!(
            "{} Test {} - {} ({} ms, {} KB)",
            icon, outcome.index, outcome.status, outcome.time_ms, outcome.memory_kb
        );
        if !outcome.passed {
            println!("   {}", outcome.comparison_note);
            if let Some(error) = &outcome.error {
                println!("   error: {}", error);
            }
        }
    }

    println!(
        "\n📊 {} passed, {} failed (avg {:.1} ms, {:.1} KB)",
        report.summary.passed_count,
        report.summary.failed_count,
        report.summary.avg_time_ms,
        report.summary.avg_memory_kb
    );
    if report.degraded {
        println!("⚠️  Backend unavailable: some results were simulated locally");
    }
    println!("{}", report.message);
}

pub async fn validate(
    config: &EngineConfig,
    source: &Path,
    language: &str,
    cases: &Path,
    problem_id: Option<String>,
    json: bool,
) -> Result<()> {
    let language_id = resolve_language(language)?;
    let source_code = read_source(source)?;
    let test_cases = parse_cases(&read_source(cases)?)?;

    if !json {
        println!(
            "🚀 Validating {} against {} test case(s)...",
            source.display(),
            test_cases.len()
        );
    }

    let validator = Validator::new(build_orchestrator(config)?);
    let report = validator
        .validate(&source_code, language_id, &test_cases, problem_id)
        .await
        .context("Validation failed")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if !report.summary.all_passed {
        bail!(
            "{} of {} test case(s) failed",
            report.summary.failed_count,
            report.summary.total
        );
    }
    Ok(())
}

pub async fn submit(
    config: &EngineConfig,
    source: &Path,
    language: &str,
    stdin: &str,
    wait: bool,
) -> Result<()> {
    let language_id = resolve_language(language)?;
    let request = ExecutionRequest::new(read_source(source)?, language_id, stdin);

    let orchestrator = build_orchestrator(config)?;
    let handles = orchestrator
        .dispatch_all(vec![request])
        .await
        .context("Submission failed")?;

    for handle in &handles {
        println!("📝 Token: {}", handle);
        if handle.is_fallback() {
            println!("⚠️  Backend unavailable: this job runs in simulated mode");
        }
        if wait {
            let result = orchestrator.await_result(handle).await;
            print_result(handle.token(), &result);
        }
    }
    Ok(())
}

pub async fn fetch_results(config: &EngineConfig, tokens: &[String]) -> Result<()> {
    let orchestrator = build_orchestrator(config)?;

    if let [token] = tokens {
        let result = orchestrator.lookup(&JobHandle::from_token(token.as_str())).await;
        print_result(token, &result);
        return Ok(());
    }

    let batch = orchestrator.lookup_all(tokens).await;
    for (token, result) in tokens.iter().zip(&batch.results) {
        print_result(token, result);
    }
    println!(
        "\n📊 {} total, {} passed, {} failed",
        batch.total, batch.passed, batch.failed
    );
    Ok(())
}

pub fn list_languages() {
    let catalog = LanguageCatalog::global();
    println!("📋 {} supported languages:", catalog.len());
    for entry in catalog.entries() {
        println!("  {:>4}  {}", entry.id, entry.name);
    }
}

pub async fn health(config: &EngineConfig) -> Result<()> {
    let orchestrator = build_orchestrator(config)?;
    let report = orchestrator.probe_health().await;

    if report.is_healthy() {
        println!("✅ {} ({})", report.message, config.base_url);
    } else {
        println!("❌ {} ({})", report.message, config.base_url);
        println!("   Jobs will run in simulated fallback mode");
    }
    Ok(())
}
