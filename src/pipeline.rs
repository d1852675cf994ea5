use crate::error::Result;
use crate::merge::{carry_over, merge_products};
use crate::observability::{self, Stage};
use crate::snapshot::Snapshot;
use crate::types::{Product, RawProductData, Retailer, RetailerApi};
use serde::Serialize;
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, info, instrument, warn, Instrument};

/// Outcome of one retailer within a run
#[derive(Debug, Clone, Serialize)]
pub struct RetailerReport {
    pub retailer: Retailer,
    pub fetched: usize,
    pub normalized: usize,
    pub skipped: usize,
    pub errors: Vec<String>,
}

impl RetailerReport {
    fn new(retailer: Retailer) -> Self {
        Self {
            retailer,
            fetched: 0,
            normalized: 0,
            skipped: 0,
            errors: Vec::new(),
        }
    }

    /// Nothing usable came back and something went wrong
    pub fn is_failed(&self) -> bool {
        self.normalized == 0 && !self.errors.is_empty()
    }
}

/// Where and how the snapshot is written
#[derive(Debug, Clone)]
pub struct SnapshotOptions {
    pub path: PathBuf,
    pub keep_previous_on_failure: bool,
}

/// Result of a complete pipeline run
#[derive(Debug, Serialize)]
pub struct PipelineResult {
    pub reports: Vec<RetailerReport>,
    pub total_products: usize,
    pub unique_products: usize,
    pub carried_over: usize,
    pub output_file: String,
    pub written: bool,
    pub duration_secs: f64,
}

impl PipelineResult {
    /// True when every retailer ran without a single recorded error
    pub fn is_complete(&self) -> bool {
        self.reports.iter().all(|r| r.errors.is_empty())
    }

    pub fn failed_retailers(&self) -> HashSet<Retailer> {
        self.reports
            .iter()
            .filter(|r| r.is_failed())
            .map(|r| r.retailer)
            .collect()
    }

    /// Retailers whose previous records stand in for this run: the failed
    /// ones and those that were not run at all
    pub fn retailers_to_carry(&self) -> HashSet<Retailer> {
        let mut carry = self.failed_retailers();
        carry.extend(
            Retailer::ALL
                .into_iter()
                .filter(|r| !self.reports.iter().any(|report| report.retailer == *r)),
        );
        carry
    }
}

pub struct Pipeline;

impl Pipeline {
    /// Normalize a single raw item; `None` when the crawler says to skip it
    fn process_product(api: &dyn RetailerApi, raw: &RawProductData) -> Result<Option<Product>> {
        let (should_skip, skip_reason) = api.should_skip(raw);
        if should_skip {
            debug!("Skipping product: {}", skip_reason);
            return Ok(None);
        }
        api.get_product(raw).map(Some)
    }

    /// Fetch and normalize everything from one retailer
    pub async fn run_retailer(api: &dyn RetailerApi) -> (Vec<Product>, RetailerReport) {
        let retailer = api.retailer();
        let mut report = RetailerReport::new(retailer);
        let mut products = Vec::new();

        let listing = match api.get_product_list().await {
            Ok(listing) => listing,
            Err(e) => {
                warn!("Fetching {} failed: {}", retailer, e);
                report.errors.push(e.to_string());
                return (products, report);
            }
        };
        report.fetched = listing.items.len();
        report.errors.extend(listing.errors);

        for raw in &listing.items {
            match Self::process_product(api, raw) {
                Ok(Some(product)) => products.push(product),
                Ok(None) => report.skipped += 1,
                Err(e) => {
                    warn!("Dropping item from {}: {}", retailer, e);
                    report.errors.push(e.to_string());
                }
            }
        }
        report.normalized = products.len();

        observability::products(retailer, Stage::Fetched, report.fetched);
        observability::products(retailer, Stage::Normalized, report.normalized);
        observability::products(retailer, Stage::Skipped, report.skipped);
        observability::products(
            retailer,
            Stage::Failed,
            report.fetched - report.normalized - report.skipped,
        );
        info!(
            fetched = report.fetched,
            normalized = report.normalized,
            skipped = report.skipped,
            errors = report.errors.len(),
            "Retailer finished"
        );
        (products, report)
    }

    /// Run every retailer in turn, one request at a time
    pub async fn collect(apis: &[Box<dyn RetailerApi>]) -> (Vec<Product>, Vec<RetailerReport>) {
        let mut all_products = Vec::new();
        let mut reports = Vec::with_capacity(apis.len());
        for api in apis {
            let span = tracing::info_span!("retailer", retailer = api.retailer().id());
            let (products, report) = Self::run_retailer(api.as_ref()).instrument(span).await;
            all_products.extend(products);
            reports.push(report);
        }
        (all_products, reports)
    }

    /// Collect, deduplicate and write the snapshot
    #[instrument(skip(apis, options), fields(output = %options.path.display()))]
    pub async fn run(
        apis: &[Box<dyn RetailerApi>],
        options: &SnapshotOptions,
    ) -> Result<PipelineResult> {
        let started = Instant::now();
        let (all_products, reports) = Self::collect(apis).await;
        let total_products = all_products.len();
        let mut products = merge_products(all_products);

        let mut result = PipelineResult {
            reports,
            total_products,
            unique_products: 0,
            carried_over: 0,
            output_file: options.path.display().to_string(),
            written: false,
            duration_secs: 0.0,
        };

        let carry = result.retailers_to_carry();
        if options.keep_previous_on_failure && !carry.is_empty() {
            match Snapshot::load(&options.path) {
                Ok(Some(previous)) => {
                    let (merged, carried) = carry_over(&previous.products, products, &carry);
                    info!("Carried over {} products from the previous snapshot", carried);
                    products = merged;
                    result.carried_over = carried;
                }
                Ok(None) => {}
                Err(e) => warn!("Previous snapshot unreadable, nothing carried over: {}", e),
            }
        }

        result.unique_products = products.len();
        if products.is_empty() {
            warn!("No products; not updating {}", options.path.display());
        } else {
            Snapshot::new(products).write(&options.path)?;
            observability::snapshot_products(result.unique_products);
            result.written = true;
        }

        result.duration_secs = started.elapsed().as_secs_f64();
        info!(
            unique = result.unique_products,
            total = result.total_products,
            "Finished in {:.2} s",
            result.duration_secs
        );
        Ok(result)
    }
}
