//! Metrics for catalog fetches and mapping passes
//!
//! Recorded through the `metrics` facade. The binary calls [`init`] when a
//! Pushgateway is configured, which installs the Prometheus recorder; the run then
//! ends with [`push_to_gateway`]. Without [`init`] every call below is a no-op, so a
//! process embedding the library can install its own recorder instead.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::fmt;
use std::sync::OnceLock;
use std::time::Instant;
use tracing::info;

const PUSH_JOB: &str = "quiz_image_sync";

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Installs the Prometheus recorder without an HTTP listener. Calling it again is a no-op.
pub fn init() -> anyhow::Result<()> {
    if METRICS_HANDLE.get().is_some() {
        return Ok(());
    }
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install Prometheus recorder: {}", e))?;
    METRICS_HANDLE.set(handle).ok();
    info!("Metrics recorder installed");
    Ok(())
}

/// Current metrics in the Prometheus text format, if [`init`] ran.
pub fn render() -> Option<String> {
    METRICS_HANDLE.get().map(|handle| handle.render())
}

pub fn push_url(base: &str, instance: &str) -> String {
    format!(
        "{}/metrics/job/{}/instance/{}",
        base.trim_end_matches('/'),
        PUSH_JOB,
        instance
    )
}

/// Sends everything recorded so far to a Pushgateway at `base`.
pub async fn push_to_gateway(base: &str, instance: &str) -> anyhow::Result<()> {
    let body = render().ok_or_else(|| anyhow::anyhow!("metrics recorder not installed"))?;
    let url = push_url(base, instance);
    let resp = reqwest::Client::new()
        .post(&url)
        .header("Content-Type", "text/plain; version=0.0.4")
        .body(body)
        .send()
        .await?;
    if !resp.status().is_success() {
        anyhow::bail!("pushgateway returned HTTP {}", resp.status());
    }
    info!("Pushed metrics to {}", url);
    Ok(())
}

/// Enum representing all metric names used in the system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    // Catalog metrics
    CatalogPagesFetched,
    CatalogEntriesReceived,
    CatalogFetchErrors,
    CatalogFetchDuration,

    // Mapping metrics
    MappingRecordsTranslated,
    MappingRecordsNotFound,
    MappingRecordsUntouched,
    MappingPassesCompleted,
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::CatalogPagesFetched => "quiz_sync_catalog_pages_fetched_total",
            MetricName::CatalogEntriesReceived => "quiz_sync_catalog_entries_received_total",
            MetricName::CatalogFetchErrors => "quiz_sync_catalog_fetch_errors_total",
            MetricName::CatalogFetchDuration => "quiz_sync_catalog_fetch_duration_seconds",
            MetricName::MappingRecordsTranslated => "quiz_sync_mapping_records_translated_total",
            MetricName::MappingRecordsNotFound => "quiz_sync_mapping_records_not_found_total",
            MetricName::MappingRecordsUntouched => "quiz_sync_mapping_records_untouched_total",
            MetricName::MappingPassesCompleted => "quiz_sync_mapping_passes_completed_total",
        }
    }

    pub fn all_metrics() -> impl Iterator<Item = MetricName> {
        use MetricName::*;
        [
            CatalogPagesFetched,
            CatalogEntriesReceived,
            CatalogFetchErrors,
            CatalogFetchDuration,
            MappingRecordsTranslated,
            MappingRecordsNotFound,
            MappingRecordsUntouched,
            MappingPassesCompleted,
        ]
        .into_iter()
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Records elapsed time into a histogram when dropped
pub struct TimingGuard {
    start: Instant,
    histogram: MetricName,
}

impl TimingGuard {
    pub fn new(histogram: MetricName) -> Self {
        Self {
            start: Instant::now(),
            histogram,
        }
    }
}

impl Drop for TimingGuard {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        ::metrics::histogram!(self.histogram.as_str()).record(duration);
    }
}

pub mod catalog {
    use super::{MetricName, TimingGuard};

    pub fn fetch_timer() -> TimingGuard {
        TimingGuard::new(MetricName::CatalogFetchDuration)
    }

    pub fn page_fetched(entries: usize) {
        ::metrics::counter!(MetricName::CatalogPagesFetched.as_str()).increment(1);
        ::metrics::counter!(MetricName::CatalogEntriesReceived.as_str()).increment(entries as u64);
    }

    pub fn fetch_failed(kind: &'static str) {
        ::metrics::counter!(MetricName::CatalogFetchErrors.as_str(), "kind" => kind).increment(1);
    }
}

pub mod mapping {
    use super::MetricName;

    pub fn pass_completed(translated: usize, not_found: usize, untouched: usize) {
        ::metrics::counter!(MetricName::MappingRecordsTranslated.as_str()).increment(translated as u64);
        ::metrics::counter!(MetricName::MappingRecordsNotFound.as_str()).increment(not_found as u64);
        ::metrics::counter!(MetricName::MappingRecordsUntouched.as_str()).increment(untouched as u64);
        ::metrics::counter!(MetricName::MappingPassesCompleted.as_str()).increment(1);
    }
}
