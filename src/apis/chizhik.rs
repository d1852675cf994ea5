use crate::app::ports::HttpRequest;
use crate::config::{parse_selector, ChizhikConfig};
use crate::error::{Result, ScraperError};
use crate::ingestion::Fetcher;
use crate::normalize::{clean_name, parse_price_text, pricing};
use crate::types::{Product, ProductListing, RawProductData, Retailer, RetailerApi};
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Compiled CSS selectors for the search result page
pub struct SearchSelectors {
    card: Selector,
    name: Selector,
    price: Selector,
    old_price: Selector,
    image: Selector,
}

impl SearchSelectors {
    pub fn from_config(config: &ChizhikConfig) -> Result<Self> {
        Ok(Self {
            card: parse_selector("card_selector", &config.card_selector)?,
            name: parse_selector("name_selector", &config.name_selector)?,
            price: parse_selector("price_selector", &config.price_selector)?,
            old_price: parse_selector("old_price_selector", &config.old_price_selector)?,
            image: parse_selector("image_selector", &config.image_selector)?,
        })
    }
}

/// Search page crawler: one query per search term, product cards scraped from HTML
pub struct ChizhikCrawler {
    fetcher: Arc<Fetcher>,
    config: ChizhikConfig,
    selectors: SearchSelectors,
    base_url: Option<Url>,
}

impl ChizhikCrawler {
    pub fn new(fetcher: Arc<Fetcher>, config: ChizhikConfig) -> Result<Self> {
        let selectors = SearchSelectors::from_config(&config)?;
        let base_url = Url::parse(&config.search_url).ok();
        Ok(Self {
            fetcher,
            config,
            selectors,
            base_url,
        })
    }

    async fn search(&self, term: &str) -> Result<Vec<RawProductData>> {
        let request = HttpRequest::new(self.config.search_url.clone()).query("query", term);
        let html = self.fetcher.get_text(Retailer::Chizhik, &request).await?;
        Ok(parse_search_page(
            &html,
            term,
            &self.selectors,
            self.base_url.as_ref(),
        ))
    }
}

fn element_text(element: &ElementRef) -> String {
    clean_name(&element.text().collect::<String>())
}

fn select_text(card: &ElementRef, selector: &Selector) -> Option<String> {
    card.select(selector)
        .next()
        .map(|el| element_text(&el))
        .filter(|t| !t.is_empty())
}

fn select_image(card: &ElementRef, selector: &Selector, base_url: Option<&Url>) -> Option<String> {
    let img = card.select(selector).next()?;
    let src = img
        .value()
        .attr("src")
        .or_else(|| img.value().attr("data-src"))
        .map(str::trim)
        .filter(|s| !s.is_empty())?;
    match base_url {
        Some(base) => base.join(src).ok().map(String::from),
        None => Some(src.to_string()),
    }
}

/// Extract product cards from a search result page.
///
/// Cards without a name or a price are dropped. Each item is tagged with the
/// search term as its category.
pub fn parse_search_page(
    html: &str,
    term: &str,
    selectors: &SearchSelectors,
    base_url: Option<&Url>,
) -> Vec<RawProductData> {
    let document = Html::parse_document(html);
    let mut items = Vec::new();

    for card in document.select(&selectors.card) {
        let (Some(name), Some(price)) = (
            select_text(&card, &selectors.name),
            select_text(&card, &selectors.price),
        ) else {
            continue;
        };
        items.push(json!({
            "name": name,
            "price": price,
            "old_price": select_text(&card, &selectors.old_price),
            "img_url": select_image(&card, &selectors.image, base_url),
            "category": term,
        }));
    }

    debug!("Extracted {} cards for '{}'", items.len(), term);
    items
}

#[async_trait::async_trait]
impl RetailerApi for ChizhikCrawler {
    fn retailer(&self) -> Retailer {
        Retailer::Chizhik
    }

    #[instrument(skip(self))]
    async fn get_product_list(&self) -> Result<ProductListing> {
        let mut listing = ProductListing::default();
        let mut pages = 0usize;

        for term in &self.config.search_terms {
            info!("Searching for '{}'", term);
            match self.search(term).await {
                Ok(items) => {
                    pages += 1;
                    listing.items.extend(items);
                }
                Err(e) => {
                    warn!("Search for '{}' failed: {}", term, e);
                    listing.errors.push(format!("search term {term}: {e}"));
                }
            }
        }

        // Pages loaded but no card matched: the markup has likely changed
        if pages > 0 && listing.items.is_empty() {
            let message = format!(
                "no product cards matched '{}' on {} search pages",
                self.config.card_selector, pages
            );
            warn!("{}", message);
            listing.errors.push(message);
        }

        info!(
            "Successfully fetched {} products from {}",
            listing.items.len(),
            Retailer::Chizhik
        );
        Ok(listing)
    }

    fn get_product(&self, raw_data: &RawProductData) -> Result<Product> {
        let name = raw_data["name"]
            .as_str()
            .map(clean_name)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| ScraperError::MissingField("name not found".into()))?;
        let price_text = raw_data["price"]
            .as_str()
            .ok_or_else(|| ScraperError::MissingField(format!("price not found for '{name}'")))?;
        let price = parse_price_text(price_text).ok_or_else(|| {
            ScraperError::Parse(format!("price '{price_text}' for '{name}'"))
        })?;
        let old_price = raw_data["old_price"].as_str().and_then(parse_price_text);
        let pricing = pricing(price, old_price, None);

        Ok(Product {
            name,
            price: pricing.price,
            old_price: pricing.old_price,
            discount_percent: pricing.discount_percent,
            category: raw_data["category"].as_str().unwrap_or_default().to_string(),
            retailer: Retailer::Chizhik,
            img_url: match &raw_data["img_url"] {
                Value::String(s) => Some(s.clone()),
                _ => None,
            },
        })
    }
}
