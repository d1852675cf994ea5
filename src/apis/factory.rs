use crate::apis::chizhik::ChizhikCrawler;
use crate::apis::pyaterochka::PyaterochkaCrawler;
use crate::config::Config;
use crate::error::Result;
use crate::ingestion::Fetcher;
use crate::types::{Retailer, RetailerApi};
use std::sync::Arc;
use tracing::warn;

/// Build the crawler for one retailer
pub fn create_crawler(
    retailer: Retailer,
    config: &Config,
    fetcher: Arc<Fetcher>,
) -> Result<Box<dyn RetailerApi>> {
    Ok(match retailer {
        Retailer::Pyaterochka => Box::new(PyaterochkaCrawler::new(
            fetcher,
            config.pyaterochka.clone(),
        )),
        Retailer::Chizhik => Box::new(ChizhikCrawler::new(fetcher, config.chizhik.clone())?),
    })
}

/// Build crawlers for the requested retailers, leaving out those disabled in config
pub fn create_crawlers(
    retailers: &[Retailer],
    config: &Config,
    fetcher: Arc<Fetcher>,
) -> Result<Vec<Box<dyn RetailerApi>>> {
    let mut crawlers = Vec::with_capacity(retailers.len());
    for &retailer in retailers {
        if !config.is_enabled(retailer) {
            warn!("{} is disabled in config, skipping", retailer.id());
            continue;
        }
        crawlers.push(create_crawler(retailer, config, fetcher.clone())?);
    }
    Ok(crawlers)
}
