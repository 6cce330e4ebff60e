// omnisync/src/sync/logic.rs
use chrono::NaiveDate;

use crate::config::SyncConfig;
use crate::dates::same_day_previous_month;
use crate::errors::Result;
use crate::omni::{OmniClient, PageFetcher, SyncLoader};
use crate::store::CaseStore;

/// Outcome of one successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub from_date: NaiveDate,
    pub cases_written: usize,
    pub rows_in_store: i64,
}

/// One synchronization of Omnidesk cases into the local store.
pub struct SyncRun {
    config: SyncConfig,
}

impl SyncRun {
    pub fn new(config: SyncConfig) -> Self {
        Self { config }
    }

    /// Runs the whole pipeline:
    /// 1. Opens the store and makes sure the `cases` table exists.
    /// 2. Picks the start date (`from_date`, or one month before `today`).
    /// 3. Loads every page of cases updated since then.
    /// 4. Upserts all of them in a single transaction.
    ///
    /// Either every fetched case is committed or nothing is.
    pub async fn run(&self, from_date: Option<NaiveDate>, today: NaiveDate) -> Result<SyncReport> {
        let store = CaseStore::open(&self.config.database_path).await?;

        let from_date = from_date.unwrap_or_else(|| same_day_previous_month(today));
        tracing::info!("Loading Omnidesk cases updated since {}", from_date);

        let loader = SyncLoader::new(PageFetcher::new(OmniClient::new(&self.config)?));
        let cases = loader.load(from_date).await?;

        let cases_written = store.upsert_all(&cases).await?;
        let rows_in_store = store.count().await?;
        tracing::info!(
            "Committed {} cases to {} ({} rows total)",
            cases_written,
            self.config.database_path.display(),
            rows_in_store
        );
        store.close().await;

        Ok(SyncReport {
            from_date,
            cases_written,
            rows_in_store,
        })
    }
}
