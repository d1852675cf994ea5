use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use grocery_scraper::apis::{create_crawler, create_crawlers};
use grocery_scraper::config::Config;
use grocery_scraper::ingestion::Fetcher;
use grocery_scraper::observability::{self, metrics};
use grocery_scraper::pipeline::{Pipeline, PipelineResult, SnapshotOptions};
use grocery_scraper::types::Retailer;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "grocery_scraper")]
#[command(about = "Grocery price scraper writing a JSON snapshot for the price page")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to a TOML config file (defaults to ./config.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape all retailers and write the snapshot
    Run {
        /// Specific retailers to run (comma-separated). Available: pyaterochka, chizhik.
        /// Retailers left out keep their products from the previous snapshot
        /// unless --no-carry-over is given
        #[arg(long)]
        retailers: Option<String>,
        /// Snapshot path, overriding config
        #[arg(long)]
        output: Option<PathBuf>,
        /// Do not reuse the previous snapshot for retailers that failed or were not run
        #[arg(long)]
        no_carry_over: bool,
        /// Exit with an error when any retailer reported errors
        #[arg(long)]
        strict: bool,
        /// Write Prometheus metrics to this file at the end of the run
        #[arg(long)]
        metrics_file: Option<PathBuf>,
    },
    /// Scrape one retailer and print its products as JSON, without writing the snapshot
    Fetch {
        #[arg(long)]
        retailer: String,
        /// Print at most this many products
        #[arg(long)]
        limit: Option<usize>,
    },
    /// List known retailers
    Retailers,
}

fn parse_retailers(list: Option<&str>) -> anyhow::Result<Vec<Retailer>> {
    match list {
        None => Ok(Retailer::ALL.to_vec()),
        Some(list) => list
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| s.parse::<Retailer>().map_err(anyhow::Error::from))
            .collect(),
    }
}

fn print_summary(result: &PipelineResult) {
    println!("\n📊 Run results:");
    for report in &result.reports {
        println!(
            "   {}: fetched {}, normalized {}, skipped {}, errors {}",
            report.retailer,
            report.fetched,
            report.normalized,
            report.skipped,
            report.errors.len()
        );
    }
    println!("   Total products: {}", result.total_products);
    println!("   Unique products: {}", result.unique_products);
    if result.carried_over > 0 {
        println!("   Carried over from previous snapshot: {}", result.carried_over);
    }
    if result.written {
        println!("   Output file: {}", result.output_file);
    } else {
        println!("   No products; {} not updated", result.output_file);
    }
    println!("   Finished in {:.2} s", result.duration_secs);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    observability::init_logging();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref()).context("loading configuration")?;

    match cli.command {
        Commands::Run {
            retailers,
            output,
            no_carry_over,
            strict,
            metrics_file,
        } => {
            let metrics_handle = match &metrics_file {
                Some(_) => Some(metrics::init().map_err(anyhow::Error::msg)?),
                None => None,
            };

            let retailers = parse_retailers(retailers.as_deref())?;
            let fetcher = Arc::new(Fetcher::from_config(&config.http)?);
            let crawlers = create_crawlers(&retailers, &config, fetcher)?;
            if crawlers.is_empty() {
                bail!("No enabled retailers to run");
            }

            let options = SnapshotOptions {
                path: output.unwrap_or_else(|| config.output.path.clone()),
                keep_previous_on_failure: config.output.keep_previous_on_failure && !no_carry_over,
            };

            println!("🔄 Running scraper...");
            let result = Pipeline::run(&crawlers, &options).await?;
            print_summary(&result);

            for report in result.reports.iter().filter(|r| !r.errors.is_empty()) {
                warn!(
                    retailer = report.retailer.id(),
                    "{} errors encountered",
                    report.errors.len()
                );
                for e in &report.errors {
                    println!("   - {}: {}", report.retailer, e);
                }
            }

            if let (Some(path), Some(handle)) = (&metrics_file, &metrics_handle) {
                if let Err(e) = metrics::write_textfile(handle, path) {
                    error!("Failed to write metrics to {}: {}", path.display(), e);
                } else {
                    info!("Metrics written to {}", path.display());
                }
            }

            if strict && !result.is_complete() {
                bail!("Run incomplete: some retailers reported errors");
            }
        }
        Commands::Fetch { retailer, limit } => {
            let retailer: Retailer = retailer.parse()?;
            let fetcher = Arc::new(Fetcher::from_config(&config.http)?);
            let crawler = create_crawler(retailer, &config, fetcher)?;

            let (mut products, report) = Pipeline::run_retailer(crawler.as_ref()).await;
            if let Some(limit) = limit {
                products.truncate(limit);
            }
            for e in &report.errors {
                warn!("{}", e);
            }
            println!("{}", serde_json::to_string_pretty(&products)?);
        }
        Commands::Retailers => {
            for retailer in Retailer::ALL {
                let state = if config.is_enabled(retailer) { "enabled" } else { "disabled" };
                println!("{:<12} {:<10} {}", retailer.id(), retailer.display_name(), state);
            }
        }
    }
    Ok(())
}
