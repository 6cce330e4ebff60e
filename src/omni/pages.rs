// omnisync/src/omni/pages.rs
use chrono::NaiveDate;
use serde_json::{Map, Value};
use std::cmp::Ordering;

use super::client::OmniClient;
use super::loader::PageSource;
use crate::errors::{AppError, Result};

pub const CASES_PATH: &str = "cases.json";

/// One case exactly as the API returned it.
pub type RawCase = Map<String, Value>;

/// A parsed page of the case list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageResponse {
    pub cases: Vec<RawCase>,
    pub total_count: Option<u64>,
}

impl PageResponse {
    /// How many pages the advertised total spans. With no total the page
    /// just received is taken as the only one.
    pub fn pages_needed(&self, items_per_page: u64) -> u64 {
        match self.total_count {
            Some(total) => total.div_ceil(items_per_page),
            None => 1,
        }
    }
}

/// Fetches single pages of `cases.json`.
pub struct PageFetcher {
    client: OmniClient,
}

impl PageFetcher {
    pub fn new(client: OmniClient) -> Self {
        Self { client }
    }

    pub async fn fetch_page(&self, page: u64, from_date: NaiveDate) -> Result<PageResponse> {
        let query = [
            ("page", page.to_string()),
            ("from_time", from_date.format("%Y-%m-%d").to_string()),
        ];
        let body = self.client.get_json(CASES_PATH, &query).await?;
        parse_page(body)
    }
}

impl PageSource for PageFetcher {
    async fn fetch(&self, page: u64, from_date: NaiveDate) -> Result<PageResponse> {
        self.fetch_page(page, from_date).await
    }
}

/// Splits a list response into its cases and `total_count`.
///
/// The API answers with an object such as
/// `{"0": {"case": {...}}, "1": {"case": {...}}, "total_count": 2}`.
/// Cases come back ordered by their numeric key.
pub fn parse_page(body: Value) -> Result<PageResponse> {
    let Value::Object(entries) = body else {
        return Err(AppError::malformed("case list is not a JSON object"));
    };

    let mut numbered = Vec::new();
    let mut total_count = None;

    for (key, value) in entries {
        if is_case_key(&key) {
            let case = extract_case(&key, value)?;
            numbered.push((key, case));
        } else if key == "total_count" {
            total_count = Some(value.as_u64().ok_or_else(|| {
                AppError::malformed(format!(
                    "total_count must be a non-negative integer, got {}",
                    value
                ))
            })?);
        }
    }

    if total_count.is_none() {
        tracing::warn!("Response carries no total_count; treating it as the last page");
    }

    numbered.sort_by(|(a, _), (b, _)| compare_case_keys(a, b));

    Ok(PageResponse {
        cases: numbered.into_iter().map(|(_, case)| case).collect(),
        total_count,
    })
}

fn is_case_key(key: &str) -> bool {
    !key.is_empty() && key.bytes().all(|b| b.is_ascii_digit())
}

/// Orders digit-only keys by numeric value without parsing them, so keys of
/// any length compare correctly. Equal values ("1", "01") fall back to the
/// raw key and both are kept.
fn compare_case_keys(a: &str, b: &str) -> Ordering {
    let a_digits = a.trim_start_matches('0');
    let b_digits = b.trim_start_matches('0');
    a_digits
        .len()
        .cmp(&b_digits.len())
        .then_with(|| a_digits.cmp(b_digits))
        .then_with(|| a.cmp(b))
}

fn extract_case(key: &str, entry: Value) -> Result<RawCase> {
    let Value::Object(mut wrapper) = entry else {
        return Err(AppError::malformed(format!("entry {} is not an object", key)));
    };
    match wrapper.remove("case") {
        Some(Value::Object(case)) => Ok(case),
        Some(_) => Err(AppError::malformed(format!("entry {}.case is not an object", key))),
        None => Err(AppError::malformed(format!("entry {} has no case field", key))),
    }
}
