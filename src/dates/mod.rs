// omnisync/src/dates/mod.rs
use chrono::{Datelike, Days, NaiveDate};

/// Finds the date "one month ago" with the same day-of-month as `date`.
///
/// Subtracting 28, 29, 30 and 31 days in turn covers every month length, so
/// the first candidate whose day matches is the answer. When the previous
/// month is too short to contain that day (31 March has no 31 February),
/// the last day of the previous month is returned instead.
///
/// * 2022-01-31 -> 2021-12-31
/// * 2020-03-31 -> 2020-02-29
/// * 2022-03-31 -> 2022-02-28
pub fn same_day_previous_month(date: NaiveDate) -> NaiveDate {
    (28..=31)
        .filter_map(|days| date.checked_sub_days(Days::new(days)))
        .find(|candidate| candidate.day() == date.day())
        .or_else(|| last_day_of_previous_month(date))
        // Only NaiveDate::MIN has no previous month.
        .unwrap_or(date)
}

fn last_day_of_previous_month(date: NaiveDate) -> Option<NaiveDate> {
    date.with_day(1)?.pred_opt()
}
