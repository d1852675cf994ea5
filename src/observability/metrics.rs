//! Metrics for scraper runs, recorded through the `metrics` facade.
//!
//! Without an installed recorder every call is a no-op. The binary installs a
//! Prometheus recorder when asked to write a textfile at the end of a run.

use crate::types::Retailer;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::fmt;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    RequestsTotal,
    RateLimitedTotal,
    FetchDuration,
    ProductsTotal,
    SnapshotProducts,
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::RequestsTotal => "grocery_requests_total",
            MetricName::RateLimitedTotal => "grocery_rate_limited_total",
            MetricName::FetchDuration => "grocery_fetch_duration_seconds",
            MetricName::ProductsTotal => "grocery_products_total",
            MetricName::SnapshotProducts => "grocery_snapshot_products",
        }
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Product counting stages within a retailer run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetched,
    Normalized,
    Skipped,
    Failed,
}

impl Stage {
    fn as_str(&self) -> &'static str {
        match self {
            Stage::Fetched => "fetched",
            Stage::Normalized => "normalized",
            Stage::Skipped => "skipped",
            Stage::Failed => "failed",
        }
    }
}

/// Install the Prometheus recorder; the handle renders the text exposition format
pub fn init() -> Result<PrometheusHandle, String> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {}", e))?;
    info!("Metrics recorder installed");
    Ok(handle)
}

/// Render all recorded metrics into `path`, textfile-collector style
pub fn write_textfile(handle: &PrometheusHandle, path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, handle.render())
}

pub fn request(retailer: Retailer, outcome: &'static str) {
    counter!(MetricName::RequestsTotal.as_str(), "retailer" => retailer.id(), "outcome" => outcome)
        .increment(1);
}

pub fn rate_limited(retailer: Retailer) {
    counter!(MetricName::RateLimitedTotal.as_str(), "retailer" => retailer.id()).increment(1);
}

pub fn fetch_duration(retailer: Retailer, secs: f64) {
    histogram!(MetricName::FetchDuration.as_str(), "retailer" => retailer.id()).record(secs);
}

pub fn products(retailer: Retailer, stage: Stage, count: usize) {
    counter!(
        MetricName::ProductsTotal.as_str(),
        "retailer" => retailer.id(),
        "stage" => stage.as_str()
    )
    .increment(count as u64);
}

pub fn snapshot_products(count: usize) {
    gauge!(MetricName::SnapshotProducts.as_str()).set(count as f64);
}
