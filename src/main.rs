//! Omnidesk case synchronizer
//!
//! Pulls helpdesk cases from the Omnidesk API into a local SQLite table.
//! Safe to re-run: every case is upserted on its Omnidesk `case_id`.

// omnisync/src/main.rs
mod config;
mod dates;
mod errors;
mod omni;
mod store;
mod sync;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use config::AppConfig;
use errors::AppError;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "omnisync")]
#[command(version, about = "Load Omnidesk cases into a local SQLite database")]
struct Cli {
    /// Start of the period, YYYY-MM-DD (e.g. 2020-12-31). Defaults to the
    /// same day of the previous month.
    #[arg(long = "from-date", alias = "from_date", value_name = "YYYY-MM-DD")]
    from_date: Option<NaiveDate>,

    /// Path to the JSON configuration file
    #[arg(long, default_value = "config.json")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match run_app(cli).await {
        Ok(_) => {
            println!("✅ Done.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("❌ {}", describe_failure(&e));
            eprintln!("Details: {:?}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run_app(cli: Cli) -> Result<()> {
    let app_config = load_app_config(&cli.config)?;

    println!("⚙️ Loading Omnidesk cases...");
    let report = sync::run_sync_flow(&app_config, cli.from_date)
        .await
        .context("Sync process failed")?;
    println!(
        "✓ {} cases synchronized (updated since {}), {} in the database.",
        report.cases_written, report.from_date, report.rows_in_store
    );
    Ok(())
}

/// Loads the configuration file; any failure is reported as a config error.
fn load_app_config(config_path: &Path) -> Result<AppConfig> {
    AppConfig::load_from_json(config_path)
        .map_err(|e| AppError::Config(format!("{:#}", e)))
        .context(format!(
            "Failed to load application configuration from {}",
            config_path.display()
        ))
}

/// Operator-facing summary for each failure kind.
fn describe_failure(err: &anyhow::Error) -> &'static str {
    match err.downcast_ref::<AppError>() {
        Some(AppError::NetworkUnavailable(_)) => "Cannot connect to Omnidesk.",
        Some(AppError::MalformedResponse(_)) => {
            "Omnidesk answered in an unexpected format; the API may have changed. \
             Contact the maintainer to update this tool."
        }
        Some(AppError::Store(_)) | Some(AppError::Io(_)) => "Failed to write to the database.",
        Some(AppError::Config(_)) | Some(AppError::UrlParse(_)) => "Invalid configuration.",
        None => "Synchronization failed.",
    }
}
