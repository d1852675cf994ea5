use crate::app::ports::HttpRequest;
use crate::config::PyaterochkaConfig;
use crate::error::{Result, ScraperError};
use crate::ingestion::Fetcher;
use crate::normalize::{clean_name, pricing, value_to_price};
use crate::types::{Product, ProductListing, RawProductData, Retailer, RetailerApi};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Catalog API crawler: store → category tree → products per category
pub struct PyaterochkaCrawler {
    fetcher: Arc<Fetcher>,
    config: PyaterochkaConfig,
}

/// One entry of the catalog tree
#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    pub id: String,
    pub name: String,
}

impl PyaterochkaCrawler {
    pub fn new(fetcher: Arc<Fetcher>, config: PyaterochkaConfig) -> Self {
        Self { fetcher, config }
    }

    fn request(&self, url: String) -> HttpRequest {
        HttpRequest::new(url).header("Referer", &self.config.referer)
    }

    fn store_url(&self, sap_code: &str) -> String {
        format!("{}/stores/{}", self.config.base_url.trim_end_matches('/'), sap_code)
    }

    /// Resolve the SAP code of the store whose catalog is scraped
    async fn resolve_store(&self) -> Result<String> {
        if let Some(store_id) = self.config.store_id.as_deref().filter(|s| !s.trim().is_empty()) {
            debug!("Using configured store {}", store_id);
            return Ok(store_id.trim().to_string());
        }

        let request = self
            .request(self.config.store_lookup_url.clone())
            .query("lon", self.config.longitude)
            .query("lat", self.config.latitude);
        let body = self.fetcher.get_json(Retailer::Pyaterochka, &request).await?;
        let sap_code = extract_sap_code(&body).ok_or_else(|| {
            ScraperError::MissingField("sap_code not found in store lookup".into())
        })?;
        info!("Resolved store {}", sap_code);
        Ok(sap_code)
    }

    async fn fetch_categories(&self, sap_code: &str) -> Result<Vec<Category>> {
        let request = self
            .request(format!("{}/categories", self.store_url(sap_code)))
            .query("mode", "delivery")
            .query("include_restrict", "true");
        let body = self.fetcher.get_json(Retailer::Pyaterochka, &request).await?;
        parse_categories(&body)
    }

    async fn fetch_category_products(
        &self,
        sap_code: &str,
        category: &Category,
    ) -> Result<Vec<RawProductData>> {
        let request = self
            .request(format!(
                "{}/categories/{}/products",
                self.store_url(sap_code),
                category.id
            ))
            .query("mode", "delivery")
            .query("include_restrict", "true")
            .query("limit", self.config.products_limit);
        let body = self.fetcher.get_json(Retailer::Pyaterochka, &request).await?;
        parse_products(&body, &category.name)
    }
}

/// First SAP code found among the shapes the store endpoints have returned
pub fn extract_sap_code(body: &Value) -> Option<String> {
    let candidates = [
        &body["sap_code"],
        &body["selectedStore"]["sapCode"],
        &body["store"]["sap_code"],
        &body["data"]["sap_code"],
    ];
    candidates.into_iter().find_map(|v| match v {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Top-level categories; the tree comes either bare or wrapped in `categories`.
///
/// Any other shape, or a tree without a single usable entry, is an error so
/// the run is reported as failed instead of as an empty catalog.
pub fn parse_categories(body: &Value) -> Result<Vec<Category>> {
    let list = body
        .as_array()
        .or_else(|| body["categories"].as_array())
        .ok_or_else(|| {
            ScraperError::Parse(format!("unrecognized category tree: {}", shape(body)))
        })?;

    let categories: Vec<Category> = list
        .iter()
        .filter_map(|c| {
            let id = match &c["id"] {
                Value::String(s) if !s.is_empty() => s.clone(),
                Value::Number(n) => n.to_string(),
                _ => return None,
            };
            let name = c["name"].as_str().map(clean_name).unwrap_or_default();
            Some(Category { id, name })
        })
        .collect();

    if categories.is_empty() {
        return Err(ScraperError::MissingField(
            "no categories with an id in the catalog".into(),
        ));
    }
    Ok(categories)
}

/// Products of one category, each tagged with the category name
pub fn parse_products(body: &Value, category_name: &str) -> Result<Vec<RawProductData>> {
    let items = body["products"].as_array().ok_or_else(|| {
        ScraperError::MissingField(format!(
            "products array for category '{category_name}' ({})",
            shape(body)
        ))
    })?;

    Ok(items
        .iter()
        .filter(|item| item.is_object())
        .map(|item| {
            let mut item = item.clone();
            item["category"] = category_name.into();
            item
        })
        .collect())
}

/// Short description of a payload for error messages
fn shape(body: &Value) -> String {
    match body {
        Value::Object(map) => {
            let keys: Vec<&str> = map.keys().map(String::as_str).take(5).collect();
            format!("object with keys [{}]", keys.join(", "))
        }
        Value::Array(_) => "array".to_string(),
        Value::Null => "null".to_string(),
        _ => "scalar".to_string(),
    }
}

fn first_price(raw: &Value, paths: &[&[&str]]) -> Option<f64> {
    paths.iter().find_map(|path| {
        let value = path.iter().fold(raw, |v, key| &v[*key]);
        value_to_price(value)
    })
}

fn first_image(raw: &Value) -> Option<String> {
    [
        &raw["image_links"]["normal"][0],
        &raw["image_links"]["small"][0],
        &raw["img_link"],
    ]
    .into_iter()
    .find_map(|v| v.as_str().filter(|s| !s.is_empty()).map(str::to_string))
}

#[async_trait::async_trait]
impl RetailerApi for PyaterochkaCrawler {
    fn retailer(&self) -> Retailer {
        Retailer::Pyaterochka
    }

    #[instrument(skip(self))]
    async fn get_product_list(&self) -> Result<ProductListing> {
        let sap_code = self.resolve_store().await?;
        let categories = self.fetch_categories(&sap_code).await?;
        info!("Found {} categories", categories.len());

        let mut listing = ProductListing::default();
        for category in &categories {
            match self.fetch_category_products(&sap_code, category).await {
                Ok(items) => {
                    debug!("Category '{}' returned {} products", category.name, items.len());
                    listing.items.extend(items);
                }
                Err(e) => {
                    warn!("Category '{}' failed: {}", category.name, e);
                    listing
                        .errors
                        .push(format!("category {} ({}): {}", category.name, category.id, e));
                }
            }
        }

        info!(
            "Successfully fetched {} products from {}",
            listing.items.len(),
            Retailer::Pyaterochka
        );
        Ok(listing)
    }

    fn get_product(&self, raw_data: &RawProductData) -> Result<Product> {
        let name = raw_data["name"]
            .as_str()
            .map(clean_name)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| ScraperError::MissingField("name not found".into()))?;

        let price = first_price(
            raw_data,
            &[
                &["prices", "discount"],
                &["prices", "regular"],
                &["current_prices", "price_promo__min"],
                &["current_prices", "price_reg__min"],
                &["current_price"],
                &["price_reg__min"],
            ],
        )
        .ok_or_else(|| ScraperError::MissingField(format!("price not found for '{name}'")))?;

        let old_price = first_price(
            raw_data,
            &[&["prices", "regular"], &["current_prices", "price_reg__min"]],
        );
        let provider_discount = raw_data["discount_percent"]
            .as_u64()
            .and_then(|d| u32::try_from(d).ok());
        let pricing = pricing(price, old_price, provider_discount);

        Ok(Product {
            name,
            price: pricing.price,
            old_price: pricing.old_price,
            discount_percent: pricing.discount_percent,
            category: raw_data["category"].as_str().unwrap_or_default().to_string(),
            retailer: Retailer::Pyaterochka,
            img_url: first_image(raw_data),
        })
    }

    fn should_skip(&self, raw_data: &RawProductData) -> (bool, String) {
        let blank = raw_data["name"]
            .as_str()
            .map(|n| n.trim().is_empty())
            .unwrap_or(true);
        if blank {
            return (true, "Skipping product without a name".to_string());
        }
        (false, String::new())
    }
}
