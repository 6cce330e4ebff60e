// omnisync/src/omni/loader.rs
use chrono::NaiveDate;
use std::time::Duration;

use super::pages::{PageResponse, RawCase};
use crate::errors::Result;

/// Page size the API uses for `cases.json`.
pub const ITEMS_PER_PAGE: u64 = 100;

/// Pause between consecutive page requests.
const PAGE_PAUSE: Duration = Duration::from_millis(500);

/// Anything that can return one page of cases.
pub trait PageSource {
    async fn fetch(&self, page: u64, from_date: NaiveDate) -> Result<PageResponse>;
}

/// Position of the loader in the paginated listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncCursor {
    pub page: u64,
    pub from_date: NaiveDate,
}

impl SyncCursor {
    pub fn new(from_date: NaiveDate) -> Self {
        Self { page: 0, from_date }
    }
}

/// Walks every page of the case list, starting at page 0.
pub struct SyncLoader<S> {
    source: S,
}

impl<S: PageSource> SyncLoader<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Collects all cases updated since `from_date`, in API order.
    ///
    /// The number of pages is recomputed from every response because new
    /// cases may arrive (or old ones vanish) while we are paging. Any fetch
    /// error aborts the whole load.
    pub async fn load(&self, from_date: NaiveDate) -> Result<Vec<RawCase>> {
        let mut result = Vec::new();
        let mut cursor = SyncCursor::new(from_date);

        loop {
            let page = self.source.fetch(cursor.page, cursor.from_date).await?;
            let pages_needed = page.pages_needed(ITEMS_PER_PAGE);
            tracing::debug!(
                page = cursor.page,
                cases = page.cases.len(),
                total_count = ?page.total_count,
                pages_needed,
                "Fetched page"
            );
            result.extend(page.cases);

            cursor.page += 1;
            if cursor.page < pages_needed {
                tokio::time::sleep(PAGE_PAUSE).await;
            } else {
                break;
            }
        }

        tracing::info!(
            "Loaded {} cases from {} page(s) since {}",
            result.len(),
            cursor.page,
            from_date
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AppError;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Serves canned pages in order and records the requested page indexes.
    struct ScriptedSource {
        pages: Mutex<VecDeque<Result<PageResponse>>>,
        requested: Mutex<Vec<(u64, NaiveDate)>>,
    }

    impl ScriptedSource {
        fn new(pages: Vec<Result<PageResponse>>) -> Self {
            Self {
                pages: Mutex::new(pages.into()),
                requested: Mutex::new(Vec::new()),
            }
        }

        fn requested_pages(&self) -> Vec<u64> {
            self.requested.lock().unwrap().iter().map(|(p, _)| *p).collect()
        }
    }

    impl PageSource for &ScriptedSource {
        async fn fetch(&self, page: u64, from_date: NaiveDate) -> Result<PageResponse> {
            self.requested.lock().unwrap().push((page, from_date));
            self.pages
                .lock()
                .unwrap()
                .pop_front()
                .expect("loader asked for more pages than scripted")
        }
    }

    fn page(first_id: i64, count: usize, total_count: Option<u64>) -> Result<PageResponse> {
        let cases = (0..count)
            .map(|i| {
                json!({ "case_id": first_id + i as i64 })
                    .as_object()
                    .cloned()
                    .unwrap()
            })
            .collect();
        Ok(PageResponse { cases, total_count })
    }

    fn from_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 12, 1).unwrap()
    }

    fn ids(cases: &[RawCase]) -> Vec<i64> {
        cases.iter().map(|c| c["case_id"].as_i64().unwrap()).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_constant_total_fetches_ceil_pages_in_order() -> anyhow::Result<()> {
        let source = ScriptedSource::new(vec![
            page(0, 100, Some(250)),
            page(100, 100, Some(250)),
            page(200, 50, Some(250)),
        ]);

        let cases = SyncLoader::new(&source).load(from_date()).await?;

        assert_eq!(source.requested_pages(), vec![0, 1, 2]);
        assert_eq!(cases.len(), 250);
        assert_eq!(ids(&cases), (0..250).collect::<Vec<_>>());
        assert!(
            source
                .requested
                .lock()
                .unwrap()
                .iter()
                .all(|(_, d)| *d == from_date())
        );
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_shrinking_total_stops_early() -> anyhow::Result<()> {
        let source = ScriptedSource::new(vec![page(0, 100, Some(80))]);

        let cases = SyncLoader::new(&source).load(from_date()).await?;

        assert_eq!(source.requested_pages(), vec![0]);
        assert_eq!(cases.len(), 100);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_total_shrinks_after_first_page() -> anyhow::Result<()> {
        // Page 0 promises three pages, page 1 says only 150 remain.
        let source = ScriptedSource::new(vec![
            page(0, 100, Some(300)),
            page(100, 50, Some(150)),
        ]);

        let cases = SyncLoader::new(&source).load(from_date()).await?;

        assert_eq!(source.requested_pages(), vec![0, 1]);
        assert_eq!(cases.len(), 150);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_growing_total_fetches_extra_page() -> anyhow::Result<()> {
        let source = ScriptedSource::new(vec![
            page(0, 100, Some(200)),
            page(100, 100, Some(201)),
            page(200, 1, Some(201)),
        ]);

        let cases = SyncLoader::new(&source).load(from_date()).await?;

        assert_eq!(source.requested_pages(), vec![0, 1, 2]);
        assert_eq!(ids(&cases).last(), Some(&200));
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_total_loads_one_page() -> anyhow::Result<()> {
        let source = ScriptedSource::new(vec![page(0, 3, None)]);

        let cases = SyncLoader::new(&source).load(from_date()).await?;

        assert_eq!(source.requested_pages(), vec![0]);
        assert_eq!(cases.len(), 3);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_listing() -> anyhow::Result<()> {
        let source = ScriptedSource::new(vec![page(0, 0, Some(0))]);

        let cases = SyncLoader::new(&source).load(from_date()).await?;

        assert_eq!(source.requested_pages(), vec![0]);
        assert!(cases.is_empty());
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_error_aborts_load() {
        let source = ScriptedSource::new(vec![
            page(0, 100, Some(300)),
            Err(AppError::NetworkUnavailable("connection reset".to_string())),
        ]);

        let result = SyncLoader::new(&source).load(from_date()).await;

        assert!(matches!(result, Err(AppError::NetworkUnavailable(_))));
        assert_eq!(source.requested_pages(), vec![0, 1]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pauses_between_pages_only() -> anyhow::Result<()> {
        let source = ScriptedSource::new(vec![
            page(0, 100, Some(150)),
            page(100, 50, Some(150)),
        ]);

        let started = tokio::time::Instant::now();
        SyncLoader::new(&source).load(from_date()).await?;

        let elapsed = started.elapsed();
        assert!(elapsed >= PAGE_PAUSE, "no pause: {:?}", elapsed);
        assert!(elapsed < PAGE_PAUSE * 2, "paused after last page: {:?}", elapsed);
        Ok(())
    }
}
