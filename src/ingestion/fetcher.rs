use crate::app::ports::{HttpClientPort, HttpGetResult, HttpRequest};
use crate::config::HttpConfig;
use crate::error::{Result, ScraperError};
use crate::infra::http_client::ReqwestHttp;
use crate::ingestion::backoff::ExponentialBackoff;
use crate::observability;
use crate::types::Retailer;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, warn};

const TOO_MANY_REQUESTS: u16 = 429;

/// Paced HTTP fetcher shared by all crawlers.
///
/// Holds its lock for the whole exchange, so at most one request is in flight
/// and consecutive requests start at least `delay` apart. A 429 answer is
/// retried up to `max_retries` times.
pub struct Fetcher {
    http: Arc<dyn HttpClientPort>,
    delay: Duration,
    max_retries: u32,
    max_wait: Duration,
    backoff: ExponentialBackoff,
    last_request: Mutex<Option<Instant>>,
}

impl Fetcher {
    pub fn new(http: Arc<dyn HttpClientPort>, config: &HttpConfig) -> Self {
        Self {
            http,
            delay: Duration::from_millis(config.delay_ms),
            max_retries: config.max_retries,
            max_wait: Duration::from_millis(config.retry_max_ms),
            backoff: ExponentialBackoff::new(config.retry_base_ms, config.retry_max_ms),
            last_request: Mutex::new(None),
        }
    }

    /// Fetcher backed by a real `reqwest` client
    pub fn from_config(config: &HttpConfig) -> Result<Self> {
        let http = ReqwestHttp::new(config)?;
        Ok(Self::new(Arc::new(http), config))
    }

    pub async fn get(&self, retailer: Retailer, request: &HttpRequest) -> Result<HttpGetResult> {
        let mut last = self.last_request.lock().await;
        let mut attempt: u32 = 0;

        loop {
            if let Some(previous) = *last {
                let since = previous.elapsed();
                if since < self.delay {
                    tokio::time::sleep(self.delay - since).await;
                }
            }

            let started = Instant::now();
            *last = Some(started);
            debug!(url = %request.url, attempt, "GET");

            let resp = match self.http.get(request).await {
                Ok(resp) => resp,
                Err(e) => {
                    observability::request(retailer, "error");
                    return Err(e);
                }
            };
            observability::fetch_duration(retailer, started.elapsed().as_secs_f64());

            if resp.status == TOO_MANY_REQUESTS {
                observability::rate_limited(retailer);
                if attempt >= self.max_retries {
                    observability::request(retailer, "rate_limited");
                    return Err(ScraperError::RateLimited {
                        url: request.url.clone(),
                        attempts: attempt + 1,
                    });
                }
                let wait = self.retry_wait(resp.retry_after, attempt);
                warn!(
                    url = %request.url,
                    attempt = attempt + 1,
                    wait_ms = wait.as_millis() as u64,
                    "Rate limited, retrying"
                );
                tokio::time::sleep(wait).await;
                attempt += 1;
                continue;
            }

            if !resp.is_success() {
                observability::request(retailer, "status");
                return Err(ScraperError::Status {
                    url: request.url.clone(),
                    status: resp.status,
                });
            }

            observability::request(retailer, "ok");
            return Ok(resp);
        }
    }

    /// Wait before retrying a 429: the server's `Retry-After` when given,
    /// otherwise the backoff delay, never more than `retry_max_ms`
    fn retry_wait(&self, retry_after: Option<u64>, attempt: u32) -> Duration {
        retry_after
            .map(Duration::from_secs)
            .unwrap_or_else(|| self.backoff.delay(attempt))
            .min(self.max_wait)
    }

    /// GET and decode a JSON body. An HTML block page served with 200 ends up
    /// here, so the error names the content type the server sent.
    pub async fn get_json(&self, retailer: Retailer, request: &HttpRequest) -> Result<Value> {
        let resp = self.get(retailer, request).await?;
        serde_json::from_slice(&resp.bytes).map_err(|e| {
            warn!(url = %request.url, content_type = %resp.content_type, "Body is not JSON");
            ScraperError::UnexpectedContent {
                url: request.url.clone(),
                content_type: resp.content_type.clone(),
                reason: e.to_string(),
            }
        })
    }

    pub async fn get_text(&self, retailer: Retailer, request: &HttpRequest) -> Result<String> {
        let resp = self.get(retailer, request).await?;
        Ok(String::from_utf8_lossy(&resp.bytes).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;

    struct ScriptedHttp {
        responses: StdMutex<VecDeque<HttpGetResult>>,
        calls: StdMutex<usize>,
    }

    impl ScriptedHttp {
        fn new(statuses: &[u16]) -> Self {
            Self::with_retry_after(statuses, None)
        }

        fn html(statuses: &[u16]) -> Self {
            let mut http = Self::new(statuses);
            for resp in http.responses.get_mut().unwrap().iter_mut() {
                resp.bytes = b"<html>Access denied</html>".to_vec();
                resp.content_type = "text/html".into();
            }
            http
        }

        fn with_retry_after(statuses: &[u16], retry_after: Option<u64>) -> Self {
            let responses = statuses
                .iter()
                .map(|&status| HttpGetResult {
                    status,
                    bytes: br#"{"ok":true}"#.to_vec(),
                    content_type: "application/json".into(),
                    retry_after: (status == TOO_MANY_REQUESTS).then_some(retry_after).flatten(),
                })
                .collect();
            Self {
                responses: StdMutex::new(responses),
                calls: StdMutex::new(0),
            }
        }

        fn calls(&self) -> usize {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl HttpClientPort for ScriptedHttp {
        async fn get(&self, _request: &HttpRequest) -> Result<HttpGetResult> {
            *self.calls.lock().unwrap() += 1;
            Ok(self
                .responses
                .lock()
                .unwrap()
                .pop_front()
                .expect("script exhausted"))
        }
    }

    fn fast_config(max_retries: u32) -> HttpConfig {
        HttpConfig {
            delay_ms: 0,
            max_retries,
            retry_base_ms: 0,
            retry_max_ms: 0,
            ..HttpConfig::default()
        }
    }

    #[tokio::test]
    async fn retries_after_rate_limit_then_succeeds() {
        let http = Arc::new(ScriptedHttp::new(&[429, 429, 200]));
        let fetcher = Fetcher::new(http.clone(), &fast_config(3));

        let body = fetcher
            .get_json(Retailer::Chizhik, &HttpRequest::new("https://example.test"))
            .await
            .unwrap();

        assert_eq!(body["ok"], true);
        assert_eq!(http.calls(), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let http = Arc::new(ScriptedHttp::new(&[429, 429, 429, 200]));
        let fetcher = Fetcher::new(http.clone(), &fast_config(2));

        let err = fetcher
            .get(Retailer::Chizhik, &HttpRequest::new("https://example.test"))
            .await
            .unwrap_err();

        assert!(matches!(err, ScraperError::RateLimited { attempts: 3, .. }));
        assert_eq!(http.calls(), 3);
    }

    #[tokio::test]
    async fn non_success_status_is_not_retried() {
        let http = Arc::new(ScriptedHttp::new(&[503, 200]));
        let fetcher = Fetcher::new(http.clone(), &fast_config(3));

        let err = fetcher
            .get(Retailer::Pyaterochka, &HttpRequest::new("https://example.test"))
            .await
            .unwrap_err();

        assert!(matches!(err, ScraperError::Status { status: 503, .. }));
        assert_eq!(http.calls(), 1);
    }

    #[tokio::test]
    async fn non_json_body_reports_content_type() {
        let fetcher = Fetcher::new(Arc::new(ScriptedHttp::html(&[200])), &fast_config(0));

        let err = fetcher
            .get_json(Retailer::Pyaterochka, &HttpRequest::new("https://example.test/api"))
            .await
            .unwrap_err();

        match err {
            ScraperError::UnexpectedContent { url, content_type, .. } => {
                assert_eq!(url, "https://example.test/api");
                assert_eq!(content_type, "text/html");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn retry_after_wins_over_backoff_and_is_capped() {
        let config = HttpConfig {
            retry_base_ms: 100,
            retry_max_ms: 5_000,
            ..fast_config(3)
        };
        let fetcher = Fetcher::new(Arc::new(ScriptedHttp::new(&[])), &config);

        assert_eq!(fetcher.retry_wait(Some(2), 0), Duration::from_secs(2));
        assert_eq!(fetcher.retry_wait(Some(120), 0), Duration::from_millis(5_000));
        assert_eq!(fetcher.retry_wait(Some(0), 2), Duration::ZERO);

        let fallback = fetcher.retry_wait(None, 1);
        assert!(fallback >= Duration::from_millis(180) && fallback <= Duration::from_millis(220));
    }

    #[tokio::test]
    async fn long_retry_after_is_cut_to_max_wait() {
        let http = Arc::new(ScriptedHttp::with_retry_after(&[429, 200], Some(60)));
        let config = HttpConfig {
            retry_max_ms: 50,
            ..fast_config(1)
        };
        let fetcher = Fetcher::new(http.clone(), &config);

        let started = Instant::now();
        fetcher
            .get(Retailer::Pyaterochka, &HttpRequest::new("https://example.test"))
            .await
            .unwrap();
        let elapsed = started.elapsed();

        assert_eq!(http.calls(), 2);
        assert!(elapsed >= Duration::from_millis(50));
        assert!(elapsed < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn consecutive_requests_are_paced() {
        let http = Arc::new(ScriptedHttp::new(&[200, 200]));
        let config = HttpConfig {
            delay_ms: 50,
            ..fast_config(0)
        };
        let fetcher = Fetcher::new(http, &config);
        let request = HttpRequest::new("https://example.test");

        let started = Instant::now();
        fetcher.get(Retailer::Chizhik, &request).await.unwrap();
        fetcher.get(Retailer::Chizhik, &request).await.unwrap();

        assert!(started.elapsed() >= Duration::from_millis(50));
    }
}
