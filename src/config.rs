use crate::constants::*;
use crate::error::{Result, ScraperError};
use scraper::Selector;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub http: HttpConfig,
    pub pyaterochka: PyaterochkaConfig,
    pub chizhik: ChizhikConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub user_agent: String,
    pub accept: String,
    pub accept_language: String,
    pub timeout_seconds: u64,
    /// Minimum gap between two consecutive requests
    pub delay_ms: u64,
    /// Retries after a 429 before giving up on a request
    pub max_retries: u32,
    pub retry_base_ms: u64,
    pub retry_max_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept: DEFAULT_ACCEPT.to_string(),
            accept_language: DEFAULT_ACCEPT_LANGUAGE.to_string(),
            timeout_seconds: 30,
            delay_ms: 1000,
            max_retries: 3,
            retry_base_ms: 2000,
            retry_max_ms: 30_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PyaterochkaConfig {
    pub enabled: bool,
    pub base_url: String,
    pub store_lookup_url: String,
    /// SAP code of the store; when set the store lookup is skipped
    pub store_id: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub products_limit: u32,
    pub referer: String,
}

impl Default for PyaterochkaConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: PYATEROCHKA_BASE_URL.to_string(),
            store_lookup_url: PYATEROCHKA_STORE_LOOKUP_URL.to_string(),
            store_id: None,
            latitude: DEFAULT_LATITUDE,
            longitude: DEFAULT_LONGITUDE,
            products_limit: PYATEROCHKA_PRODUCTS_LIMIT,
            referer: PYATEROCHKA_REFERER.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChizhikConfig {
    pub enabled: bool,
    pub search_url: String,
    pub search_terms: Vec<String>,
    pub card_selector: String,
    pub name_selector: String,
    pub price_selector: String,
    pub old_price_selector: String,
    pub image_selector: String,
}

impl Default for ChizhikConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            search_url: CHIZHIK_SEARCH_URL.to_string(),
            search_terms: CHIZHIK_SEARCH_TERMS.iter().map(|s| s.to_string()).collect(),
            card_selector: "div.product-card".to_string(),
            name_selector: "h3.product-name".to_string(),
            price_selector: "span.price".to_string(),
            old_price_selector: "span.old-price".to_string(),
            image_selector: "img".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub path: PathBuf,
    /// Reuse the previous snapshot's products for a retailer that failed this run
    pub keep_previous_on_failure: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_OUTPUT_PATH),
            keep_previous_on_failure: true,
        }
    }
}

impl Config {
    /// Load configuration from `path`, or from `config.toml` when it exists.
    ///
    /// An explicitly given path must exist. Environment overrides are applied
    /// afterwards and the result is validated.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_PATH))?
            }
            None => {
                debug!("No {} found, using defaults", DEFAULT_CONFIG_PATH);
                Self::default()
            }
        };
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            ScraperError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let config: Config = toml::from_str(&content)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(env_value)
    }

    /// Apply `GROCERY_*` overrides read through `lookup`; blank values are ignored
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(v) = lookup("GROCERY_OUTPUT") {
            self.output.path = PathBuf::from(v);
        }
        if let Some(v) = lookup("GROCERY_PYATEROCHKA_STORE") {
            self.pyaterochka.store_id = Some(v);
        }
        if let Some(v) = lookup("GROCERY_DELAY_MS") {
            self.http.delay_ms = v
                .trim()
                .parse()
                .map_err(|e| ScraperError::Config(format!("GROCERY_DELAY_MS '{v}': {e}")))?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.pyaterochka.products_limit == 0 {
            return Err(ScraperError::Config(
                "pyaterochka.products_limit must be greater than zero".into(),
            ));
        }
        if self.http.retry_base_ms > self.http.retry_max_ms {
            return Err(ScraperError::Config(
                "http.retry_base_ms must not exceed http.retry_max_ms".into(),
            ));
        }
        for (key, selector) in [
            ("card_selector", &self.chizhik.card_selector),
            ("name_selector", &self.chizhik.name_selector),
            ("price_selector", &self.chizhik.price_selector),
            ("old_price_selector", &self.chizhik.old_price_selector),
            ("image_selector", &self.chizhik.image_selector),
        ] {
            parse_selector(key, selector)?;
        }
        Ok(())
    }

    pub fn is_enabled(&self, retailer: crate::types::Retailer) -> bool {
        match retailer {
            crate::types::Retailer::Pyaterochka => self.pyaterochka.enabled,
            crate::types::Retailer::Chizhik => self.chizhik.enabled,
        }
    }
}

pub(crate) fn parse_selector(key: &str, selector: &str) -> Result<Selector> {
    Selector::parse(selector)
        .map_err(|e| ScraperError::Config(format!("chizhik.{key} '{selector}': {e}")))
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key).ok()
}
