// omnisync/src/sync/mod.rs
pub(crate) mod logic;

use anyhow::Result;
use chrono::{Local, NaiveDate};

use crate::config::{AppConfig, load_sync_config_from_json};

pub use logic::{SyncReport, SyncRun};

/// Public entry point for the sync process.
/// Builds the run configuration and synchronizes cases updated since
/// `from_date` (one month back from today when absent).
pub async fn run_sync_flow(app_config: &AppConfig, from_date: Option<NaiveDate>) -> Result<SyncReport> {
    let sync_config = load_sync_config_from_json(&app_config.raw_json_config)?;
    tracing::debug!("Sync configuration: {:?}", sync_config);

    let today = Local::now().date_naive();
    Ok(SyncRun::new(sync_config).run(from_date, today).await?)
}
