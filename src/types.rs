use crate::constants::{CHIZHIK_API, CHIZHIK_NAME, PYATEROCHKA_API, PYATEROCHKA_NAME};
use crate::error::{Result, ScraperError};
use crate::normalize::value_to_price;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Raw product data as parsed from a retailer payload, before normalization
pub type RawProductData = serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Retailer {
    Pyaterochka,
    Chizhik,
}

impl Retailer {
    pub const ALL: [Retailer; 2] = [Retailer::Pyaterochka, Retailer::Chizhik];

    /// Identifier used on the command line and in config sections
    pub fn id(&self) -> &'static str {
        match self {
            Retailer::Pyaterochka => PYATEROCHKA_API,
            Retailer::Chizhik => CHIZHIK_API,
        }
    }

    /// Name shown by the front end
    pub fn display_name(&self) -> &'static str {
        match self {
            Retailer::Pyaterochka => PYATEROCHKA_NAME,
            Retailer::Chizhik => CHIZHIK_NAME,
        }
    }
}

impl fmt::Display for Retailer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for Retailer {
    type Err = ScraperError;

    fn from_str(s: &str) -> Result<Self> {
        let needle = s.trim().to_lowercase();
        Retailer::ALL
            .into_iter()
            .find(|r| r.id() == needle || r.display_name().to_lowercase() == needle)
            .ok_or_else(|| ScraperError::Config(format!("Unknown retailer: {s}")))
    }
}

impl Serialize for Retailer {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.display_name())
    }
}

impl<'de> Deserialize<'de> for Retailer {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A normalized product record as written to the snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub name: String,
    #[serde(deserialize_with = "deserialize_price")]
    pub price: f64,
    #[serde(
        default,
        deserialize_with = "deserialize_optional_price",
        skip_serializing_if = "Option::is_none"
    )]
    pub old_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount_percent: Option<u32>,
    #[serde(default)]
    pub category: String,
    #[serde(alias = "store")]
    pub retailer: Retailer,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub img_url: Option<String>,
}

// Snapshots written before prices were numeric hold shelf text like "89,99 ₽"
fn deserialize_price<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<f64, D::Error> {
    let value = Value::deserialize(deserializer)?;
    value_to_price(&value).ok_or_else(|| de::Error::custom(format!("unreadable price: {value}")))
}

fn deserialize_optional_price<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<f64>, D::Error> {
    Ok(value_to_price(&Value::deserialize(deserializer)?))
}

/// Items fetched from one retailer plus the request failures met along the way
#[derive(Debug, Default)]
pub struct ProductListing {
    pub items: Vec<RawProductData>,
    pub errors: Vec<String>,
}

/// Core trait that every retailer crawler implements
#[async_trait::async_trait]
pub trait RetailerApi: Send + Sync {
    fn retailer(&self) -> Retailer;

    /// Fetch all raw product items from this retailer
    async fn get_product_list(&self) -> Result<ProductListing>;

    /// Normalize one raw item into a product record
    fn get_product(&self, raw_data: &RawProductData) -> Result<Product>;

    /// Determine if an item should be skipped
    fn should_skip(&self, _raw_data: &RawProductData) -> (bool, String) {
        (false, String::new())
    }
}
