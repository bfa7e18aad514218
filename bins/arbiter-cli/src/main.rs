mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "arbiter-cli")]
#[command(about = "Arbiter CLI - Judge code against a Judge0-compatible backend", long_about = None)]
struct Cli {
    /// Backend URL (overrides ARBITER_BACKEND_URL)
    #[arg(long, global = true)]
    backend_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run source code against a test-case file and print the verdict
    Validate {
        /// Source file to judge
        #[arg(short, long)]
        source: PathBuf,

        /// Language id or name (e.g. 71, python3)
        #[arg(short, long)]
        language: String,

        /// JSON file: an array of {input, expectedOutput} or {"testCases": [...]}
        #[arg(short, long)]
        cases: PathBuf,

        /// Problem identifier echoed in the report
        #[arg(short, long)]
        problem_id: Option<String>,

        /// Print the full report as JSON
        #[arg(long, default_value = "false")]
        json: bool,
    },

    /// Submit source code once and print the job token
    Submit {
        #[arg(short, long)]
        source: PathBuf,

        #[arg(short, long)]
        language: String,

        /// Standard input for the program
        #[arg(long, default_value = "")]
        stdin: String,

        /// Wait for the job to finish and print its result
        #[arg(short, long, default_value = "false")]
        wait: bool,
    },

    /// Fetch current results for one or more tokens
    Result {
        #[arg(required = true)]
        tokens: Vec<String>,
    },

    /// List supported languages
    Languages,

    /// Check whether the backend is reachable
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config = commands::load_config(cli.backend_url.as_deref())?;

    match cli.command {
        Commands::Validate {
            source,
            language,
            cases,
            problem_id,
            json,
        } => {
            commands::validate(&config, &source, &language, &cases, problem_id, json).await?;
        }
        Commands::Submit {
            source,
            language,
            stdin,
            wait,
        } => {
            commands::submit(&config, &source, &language, &stdin, wait).await?;
        }
        Commands::Result { tokens } => {
            commands::fetch_results(&config, &tokens).await?;
        }
        Commands::Languages => {
            commands::list_languages();
        }
        Commands::Health => {
            commands::health(&config).await?;
        }
    }

    Ok(())
}
