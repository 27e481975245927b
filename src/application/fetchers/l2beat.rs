//! L2BEAT scaling metrics.

use super::{sources, Endpoint, MetricsService};
use crate::application::series::{from_epoch_secs, get_series_with_current, latest_date};
use crate::domain::upstream_models::{L2beatChart, L2beatChartResponse, L2beatSummaryResponse};
use crate::domain::{
    CachePolicy, DataPoint, DataSeries, DataSeriesWithCurrent, L2Activity, L2ScalingSummary, MetricsError, Revalidate,
    TimestampedMetric, UpstreamRequest,
};
use crate::infrastructure::FetchMode;

/// Value columns of the tvs chart summed into one series.
const TVS_VALUE_COLUMNS: [&str; 3] = ["native", "canonical", "external"];

const SECONDS_PER_DAY: f64 = 86_400.0;

impl MetricsService {
    /// Total value secured across all tracked layer 2 projects.
    pub async fn l2_scaling_summary(&self) -> Result<TimestampedMetric<L2ScalingSummary>, MetricsError> {
        let result = self.fetch_l2_scaling_summary().await;
        self.resolve(Endpoint::L2beatSummary, sources::l2beat(), result)
    }

    /// Daily total value secured over the last year.
    pub async fn l2_tvs_series(
        &self,
        skip_filtering: bool,
    ) -> Result<TimestampedMetric<DataSeriesWithCurrent>, MetricsError> {
        let result = self.fetch_l2_tvs_series(skip_filtering).await;
        self.resolve(Endpoint::L2beatTvsSeries, sources::l2beat(), result)
    }

    /// Transactions and user operations over the most recent day.
    pub async fn l2_activity(&self) -> Result<TimestampedMetric<L2Activity>, MetricsError> {
        let result = self.fetch_l2_activity().await;
        self.resolve(Endpoint::L2beatActivity, sources::l2beat(), result)
    }

    async fn fetch_l2_scaling_summary(&self) -> Result<TimestampedMetric<L2ScalingSummary>, MetricsError> {
        let url = format!("{}/scaling/summary", self.urls.l2beat);
        let policy = CachePolicy::new(Revalidate::Hour, "l2beat:scaling:summary");
        let response: L2beatSummaryResponse = self
            .fetch_json(UpstreamRequest::get(url), &policy, FetchMode::Retrying)
            .await?;

        let projects = response.data.projects;
        let summary = L2ScalingSummary {
            total_value_secured: projects
                .values()
                .filter_map(|p| p.tvs.as_ref())
                .map(|tvs| tvs.breakdown.total)
                .sum(),
            project_count: projects.len() as u32,
        };
        Ok(TimestampedMetric::new(summary, None, sources::l2beat()))
    }

    async fn fetch_l2_tvs_series(
        &self,
        skip_filtering: bool,
    ) -> Result<TimestampedMetric<DataSeriesWithCurrent>, MetricsError> {
        let url = format!("{}/scaling/tvs?range=1y", self.urls.l2beat);
        let policy = CachePolicy::new(Revalidate::Day, "l2beat:scaling:tvs:1y");
        let response: L2beatChartResponse = self
            .fetch_json(UpstreamRequest::get(url.clone()), &policy, FetchMode::Retrying)
            .await?;

        let series = tvs_series(&response.data.chart).map_err(|message| MetricsError::data_shape(&url, message))?;
        let data = get_series_with_current(&series, skip_filtering)?;
        Ok(TimestampedMetric::new(data, latest_date(&series), sources::l2beat()))
    }

    async fn fetch_l2_activity(&self) -> Result<TimestampedMetric<L2Activity>, MetricsError> {
        let url = format!("{}/scaling/activity?range=30d", self.urls.l2beat);
        let policy = CachePolicy::new(Revalidate::Hour, "l2beat:scaling:activity:30d");
        let response: L2beatChartResponse = self
            .fetch_json(UpstreamRequest::get(url.clone()), &policy, FetchMode::Retrying)
            .await?;

        let chart = &response.data.chart;
        let (timestamp, count, uops) = match (chart.column("timestamp"), chart.column("count"), chart.column("uopsCount")) {
            (Some(t), Some(c), Some(u)) => (t, c, u),
            _ => return Err(MetricsError::data_shape(&url, "activity chart lacks timestamp/count/uopsCount")),
        };
        let last = chart.data.last().ok_or(MetricsError::EmptySeries)?;
        let cell = |idx: usize| last.get(idx).copied().flatten().unwrap_or(0.0);

        let activity = L2Activity {
            tx_count_24h: cell(count),
            uops_per_second: cell(uops) / SECONDS_PER_DAY,
        };
        let updated = from_epoch_secs(cell(timestamp) as i64);
        Ok(TimestampedMetric::new(activity, updated, sources::l2beat()))
    }
}

/// Sum the value columns of each chart row into a dated series.
fn tvs_series(chart: &L2beatChart) -> Result<DataSeries, String> {
    let timestamp = chart
        .column("timestamp")
        .ok_or_else(|| "tvs chart has no timestamp column".to_string())?;
    let values: Vec<usize> = TVS_VALUE_COLUMNS.iter().filter_map(|c| chart.column(c)).collect();
    if values.is_empty() {
        return Err(format!("tvs chart has none of the columns {:?}", TVS_VALUE_COLUMNS));
    }

    Ok(chart
        .data
        .iter()
        .filter_map(|row| {
            let date = from_epoch_secs(row.get(timestamp).copied().flatten()? as i64)?;
            let value = values.iter().filter_map(|&i| row.get(i).copied().flatten()).sum();
            Some(DataPoint::new(date, value))
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use std::sync::Arc;

    const SUMMARY: &str = r#"{"data": {"projects": {
        "arbitrum": {"name": "Arbitrum One", "tvs": {"breakdown": {"total": 15.5}}},
        "base": {"name": "Base", "tvs": {"breakdown": {"total": 10.0}}},
        "paused": {"name": "Paused"}
    }}}"#;

    // 2024-01-01, 2024-01-02, 2024-01-15
    const TVS: &str = r#"{"data": {"chart": {
        "types": ["timestamp", "native", "canonical", "external", "ethPrice"],
        "data": [
            [1704067200, 1.0, 2.0, 3.0, 2300.0],
            [1704153600, 1.0, 1.0, null, 2310.0],
            [1705276800, 2.0, 2.0, 2.0, 2500.0]
        ]
    }}}"#;

    const ACTIVITY: &str = r#"{"data": {"chart": {
        "types": ["timestamp", "count", "uopsCount"],
        "data": [[1705190400, 100.0, 86400.0], [1705276800, 200.0, 172800.0]]
    }}}"#;

    #[tokio::test]
    async fn test_summary_sums_project_tvs() {
        let svc = service(Arc::new(RoutedTransport::new().route("/scaling/summary", 200, SUMMARY)));
        let metric = svc.l2_scaling_summary().await.unwrap();
        assert_eq!(metric.data.total_value_secured, 25.5);
        assert_eq!(metric.data.project_count, 3);
    }

    #[tokio::test]
    async fn test_tvs_series_sums_value_columns() {
        let svc = service(Arc::new(RoutedTransport::new().route("/scaling/tvs", 200, TVS)));
        let metric = svc.l2_tvs_series(true).await.unwrap();
        let values: Vec<f64> = metric.data.series.iter().map(|p| p.value).collect();
        assert_eq!(values, vec![6.0, 2.0, 6.0]);
        assert_eq!(metric.data.current_value, 6.0);
        assert_eq!(metric.last_updated, 1_705_276_800_000);
    }

    #[tokio::test]
    async fn test_tvs_series_filters_to_sample_days_by_default() {
        let svc = service(Arc::new(RoutedTransport::new().route("/scaling/tvs", 200, TVS)));
        let metric = svc.l2_tvs_series(false).await.unwrap();
        assert_eq!(metric.data.series.len(), 2);
    }

    #[tokio::test]
    async fn test_activity_uses_latest_row() {
        let svc = service(Arc::new(RoutedTransport::new().route("/scaling/activity", 200, ACTIVITY)));
        let metric = svc.l2_activity().await.unwrap();
        assert_eq!(metric.data.tx_count_24h, 200.0);
        assert_eq!(metric.data.uops_per_second, 2.0);
        assert_eq!(metric.last_updated, 1_705_276_800_000);
    }

    #[tokio::test]
    async fn test_unexpected_chart_degrades() {
        let body = r#"{"data": {"chart": {"types": ["day", "value"], "data": [[1, 2]]}}}"#;
        let svc = service(Arc::new(RoutedTransport::new().route("/scaling/tvs", 200, body)));
        let metric = svc.l2_tvs_series(false).await.unwrap();
        assert_eq!(metric.data, DataSeriesWithCurrent::default());
    }
}
