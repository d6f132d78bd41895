//! Outbound HTTP for link checking and asset downloads.
//!
//! ### Existence probes
//! - `HEAD` without following redirects; the caller interprets the status
//!
//! ### Downloads
//! - `GET` following up to 5 redirects
//! - Max body bytes: 20MB (configurable)
//!
//! ### Retries
//! - Network failures and 5xx responses are retried with exponential
//!   backoff (`retries` extra attempts, starting at `retry_backoff`)

pub mod url;

use bytes::Bytes;
use reqwest::{Client, StatusCode, Url, header};
use std::future::Future;
use std::time::{Duration, Instant};

pub use url::{LinkTarget, UrlError, bare_host, canonicalize, resolve_link};

use folio_core::{AppConfig, Error};

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "folio/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 20MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects a download follows (default: 5)
    pub max_redirects: usize,

    /// Extra attempts after a retryable failure (default: 2)
    pub retries: u32,

    /// Delay before the first retry, doubled each time (default: 500ms)
    pub retry_backoff: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "folio/0.1".to_string(),
            max_bytes: 20 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
            retries: 2,
            retry_backoff: Duration::from_millis(500),
        }
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            retries: config.retries,
            retry_backoff: config.retry_backoff(),
            ..Default::default()
        }
    }
}

/// Response from a download.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// The original URL requested
    pub url: Url,
    /// The final URL after redirects
    pub final_url: Url,
    /// HTTP status code
    pub status: StatusCode,
    /// Content-Type header
    pub content_type: Option<String>,
    /// Response body bytes
    pub bytes: Bytes,
    /// Time taken to fetch in milliseconds
    pub fetch_ms: u64,
}

/// Outcome of one attempt inside the retry loop.
enum Attempt<T> {
    /// Final answer, returned as is.
    Done(Result<T, Error>),
    /// Worth another try; returned if no attempts remain.
    Retry(Result<T, Error>),
}

/// HTTP client used by the link repairer.
pub struct FetchClient {
    http: Client,
    probe: Client,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::HttpError(format!("failed to build HTTP client: {}", e)))?;

        let probe = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::none())
            .use_rustls_tls()
            .build()
            .map_err(|e| Error::HttpError(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, probe, config })
    }

    /// Status of a `HEAD` request, without following redirects.
    pub async fn head_status(&self, url: &Url) -> Result<StatusCode, Error> {
        let probe = &self.probe;
        self.with_retry(url, move || async move {
            match probe.head(url.clone()).send().await {
                Ok(response) if response.status().is_server_error() => Attempt::Retry(Ok(response.status())),
                Ok(response) => Attempt::Done(Ok(response.status())),
                Err(e) => Attempt::Retry(Err(network_error(&e))),
            }
        })
        .await
    }

    /// Download a URL, enforcing the byte limit.
    pub async fn fetch(&self, url: &Url) -> Result<FetchResponse, Error> {
        let start = Instant::now();
        let this = self;
        self.with_retry(url, move || async move {
            let response = match this.http.get(url.clone()).send().await {
                Ok(response) => response,
                Err(e) => return Attempt::Retry(Err(network_error(&e))),
            };

            let status = response.status();
            if status.is_server_error() {
                return Attempt::Retry(Err(Error::HttpError(format!("status {}", status.as_u16()))));
            }
            if !status.is_success() {
                return Attempt::Done(Err(Error::HttpError(format!("status {}", status.as_u16()))));
            }

            Attempt::Done(this.read_body(url, start, response).await)
        })
        .await
    }

    async fn read_body(&self, url: &Url, start: Instant, response: reqwest::Response) -> Result<FetchResponse, Error> {
        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", len, self.config.max_bytes)));
        }

        let status = response.status();
        let final_url = response.url().clone();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::HttpError(format!("failed to read response: {}", e)))?;

        if bytes.len() > self.config.max_bytes {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", bytes.len(), self.config.max_bytes)));
        }

        let fetch_ms = start.elapsed().as_millis() as u64;
        tracing::debug!("fetched {} -> {} in {}ms ({} bytes)", url, final_url, fetch_ms, bytes.len());

        Ok(FetchResponse { url: url.clone(), final_url, status, content_type, bytes, fetch_ms })
    }

    async fn with_retry<T, F, Fut>(&self, url: &Url, mut op: F) -> Result<T, Error>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Attempt<T>>,
    {
        let mut delay = self.config.retry_backoff;
        let mut attempt = 0;
        loop {
            match op().await {
                Attempt::Done(result) => return result,
                Attempt::Retry(result) if attempt >= self.config.retries => return result,
                Attempt::Retry(_) => {
                    attempt += 1;
                    tracing::warn!(url = %url, attempt, "retrying request");
                    tokio::time::sleep(delay).await;
                    delay = delay.saturating_mul(2);
                }
            }
        }
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }
}

fn network_error(err: &reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::FetchTimeout(err.to_string())
    } else {
        Error::HttpError(format!("network error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_config_default() {
        let config = FetchConfig::default();
        assert_eq!(config.user_agent, "folio/0.1");
        assert_eq!(config.max_bytes, 20 * 1024 * 1024);
        assert_eq!(config.timeout, Duration::from_millis(20000));
        assert_eq!(config.max_redirects, 5);
        assert_eq!(config.retries, 2);
    }

    #[test]
    fn test_fetch_config_from_app_config() {
        let app = AppConfig { user_agent: "test/1".into(), retries: 0, timeout_ms: 1500, ..Default::default() };
        let config = FetchConfig::from(&app);
        assert_eq!(config.user_agent, "test/1");
        assert_eq!(config.retries, 0);
        assert_eq!(config.timeout, Duration::from_millis(1500));
    }

    #[tokio::test]
    async fn test_fetch_client_new() {
        let client = FetchClient::new(FetchConfig::default());
        assert!(client.is_ok());
    }

    #[tokio::test]
    async fn test_retry_gives_up_after_configured_attempts() {
        let config = FetchConfig { retries: 2, retry_backoff: Duration::from_millis(1), ..Default::default() };
        let client = FetchClient::new(config).unwrap();
        let url = Url::parse("http://example.invalid/").unwrap();

        let mut calls = 0;
        let result: Result<(), Error> = client
            .with_retry(&url, || {
                calls += 1;
                async { Attempt::Retry(Err(Error::HttpError("network error: refused".into()))) }
            })
            .await;

        assert!(matches!(result, Err(Error::HttpError(_))));
        assert_eq!(calls, 3);
    }

    #[tokio::test]
    async fn test_retry_stops_on_done() {
        let client = FetchClient::new(FetchConfig::default()).unwrap();
        let url = Url::parse("http://example.invalid/").unwrap();

        let mut calls = 0;
        let result = client
            .with_retry(&url, || {
                calls += 1;
                async { Attempt::Done(Ok(7)) }
            })
            .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls, 1);
    }
}
