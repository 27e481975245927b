//! Time-series normalization: sorting, merging, current value and
//! twice-monthly down-sampling for charts.

use crate::domain::{DataPoint, DataSeries, DataSeriesWithCurrent, MetricsError};
use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};
use std::collections::BTreeMap;

/// Days of the month kept when down-sampling.
const SAMPLE_DAYS: [u32; 2] = [1, 15];

/// Build the chart series and headline value for `series`.
///
/// The input is copied and sorted ascending; `current_value` is the value of
/// the latest point regardless of filtering. Unless `skip_filtering` is set,
/// the returned series keeps only points on the 1st and 15th of each month
/// (UTC) plus the latest point. With fewer than two matching points the full
/// sorted series is returned instead.
///
/// # Errors
///
/// [`MetricsError::EmptySeries`] when `series` has no points.
pub fn get_series_with_current(
    series: &[DataPoint],
    skip_filtering: bool,
) -> Result<DataSeriesWithCurrent, MetricsError> {
    let mut sorted = series.to_vec();
    sorted.sort_by_key(|p| p.date);

    let current_value = sorted.last().ok_or(MetricsError::EmptySeries)?.value;

    let series = if skip_filtering {
        sorted
    } else {
        filter_first_and_fifteenth(sorted)
    };

    Ok(DataSeriesWithCurrent { series, current_value })
}

/// Down-sample an ascending series to the 1st/15th of each month.
fn filter_first_and_fifteenth(sorted: DataSeries) -> DataSeries {
    let Some(latest) = sorted.last().copied() else {
        return sorted;
    };

    let mut filtered: DataSeries = sorted
        .iter()
        .filter(|p| SAMPLE_DAYS.contains(&p.date.day()))
        .copied()
        .collect();

    if filtered.len() < 2 {
        return sorted;
    }
    if filtered.last().map(|p| p.date) != Some(latest.date) {
        filtered.push(latest);
    }
    filtered
}

/// Merge several series into one, summing values that share a date.
pub fn merge_series<I>(series: I) -> DataSeries
where
    I: IntoIterator<Item = DataSeries>,
{
    let mut by_date: BTreeMap<DateTime<Utc>, f64> = BTreeMap::new();
    for point in series.into_iter().flatten() {
        *by_date.entry(point.date).or_insert(0.0) += point.value;
    }
    by_date
        .into_iter()
        .map(|(date, value)| DataPoint::new(date, value))
        .collect()
}

/// Parse upstream date strings: `YYYY-MM-DD`, RFC 3339, or epoch seconds.
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    raw.parse::<i64>().ok().and_then(from_epoch_secs)
}

pub fn from_epoch_secs(secs: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(secs, 0).single()
}

/// Date of the latest point, used to stamp `lastUpdated`.
pub fn latest_date(series: &[DataPoint]) -> Option<DateTime<Utc>> {
    series.iter().map(|p| p.date).max()
}
