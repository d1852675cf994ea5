#![allow(dead_code)]

use async_trait::async_trait;
use grocery_scraper::app::ports::{HttpClientPort, HttpGetResult, HttpRequest};
use grocery_scraper::config::{Config, HttpConfig};
use grocery_scraper::error::Result;
use std::sync::Mutex;

type Matcher = Box<dyn Fn(&HttpRequest) -> bool + Send + Sync>;

/// In-memory HTTP client answering from a list of routes
pub struct FakeHttp {
    routes: Vec<(Matcher, u16, String)>,
    pub requests: Mutex<Vec<HttpRequest>>,
}

impl FakeHttp {
    pub fn new() -> Self {
        Self {
            routes: Vec::new(),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Answer requests to exactly `url`
    pub fn route(self, url: &str, status: u16, body: &str) -> Self {
        let url = url.to_string();
        self.route_when(move |r| r.url == url, status, body)
    }

    /// Answer requests to `url` carrying `query=<term>`
    pub fn route_query(self, url: &str, term: &str, status: u16, body: &str) -> Self {
        let url = url.to_string();
        let term = term.to_string();
        self.route_when(
            move |r| r.url == url && r.query.iter().any(|(k, v)| k == "query" && *v == term),
            status,
            body,
        )
    }

    pub fn route_when<F>(mut self, matcher: F, status: u16, body: &str) -> Self
    where
        F: Fn(&HttpRequest) -> bool + Send + Sync + 'static,
    {
        self.routes.push((Box::new(matcher), status, body.to_string()));
        self
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl HttpClientPort for FakeHttp {
    async fn get(&self, request: &HttpRequest) -> Result<HttpGetResult> {
        self.requests.lock().unwrap().push(request.clone());
        // Unrouted URLs answer 404 like a server that has no such page
        let (status, body) = self
            .routes
            .iter()
            .find(|(matcher, _, _)| matcher(request))
            .map(|(_, status, body)| (*status, body.as_str()))
            .unwrap_or((404, ""));
        let content_type = if body.trim_start().starts_with('<') {
            "text/html"
        } else {
            "application/json"
        };
        Ok(HttpGetResult {
            status,
            bytes: body.as_bytes().to_vec(),
            content_type: content_type.to_string(),
            retry_after: None,
        })
    }
}

/// Config with no pacing or retry waits
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.http = HttpConfig {
        delay_ms: 0,
        max_retries: 1,
        retry_base_ms: 0,
        retry_max_ms: 0,
        ..HttpConfig::default()
    };
    config.pyaterochka.base_url = "https://catalog.test/api".to_string();
    config.pyaterochka.store_lookup_url = "https://catalog.test/stores".to_string();
    config.chizhik.search_url = "https://search.test/search".to_string();
    config
}

pub const CHIZHIK_PAGE: &str = r#"
<html><body>
  <div class="products">
    <div class="product-card">
      <img src="/images/milk.png">
      <h3 class="product-name">  Молоко Простоквашино 3,2%  </h3>
      <span class="price">89,99 ₽</span>
      <span class="old-price">109,99 ₽</span>
    </div>
    <div class="product-card">
      <h3 class="product-name">Молоко Домик в деревне</h3>
      <span class="price">1 099 ₽</span>
    </div>
    <div class="product-card">
      <h3 class="product-name">Без цены</h3>
    </div>
    <div class="product-card">
      <span class="price">10 ₽</span>
    </div>
  </div>
</body></html>
"#;
