use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use thiserror::Error;
use tokio_retry::RetryIf;
use tokio_retry::strategy::ExponentialBackoff;

use crate::config::FetcherConfig;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("unexpected HTTP status {0}")]
    HttpStatus(u16),

    #[error("too many redirects")]
    TooManyRedirects,
}

impl FetchError {
    /// Transient failures are worth a retry; 4xx and DNS-level failures are
    /// treated as permanent for the cycle.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Timeout => true,
            FetchError::HttpStatus(code) => *code >= 500 || *code == 429,
            FetchError::Connect(_) | FetchError::TooManyRedirects => false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PageContent {
    pub final_url: String,
    pub body: String,
}

/// Retrieves product pages. Some storefronts reject default HTTP clients, so
/// requests carry a realistic browser identity per site family.
pub struct PageFetcher {
    client: reqwest::Client,
    config: FetcherConfig,
}

const CHROME_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const TURKISH_ACCEPT_LANGUAGE: &str = "tr-TR,tr;q=0.9,en-US;q=0.8,en;q=0.7";
const HTML_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

impl PageFetcher {
    pub fn new(config: FetcherConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout))
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()?;
        Ok(Self { client, config })
    }

    /// Fetch a product page, retrying transient failures with exponential
    /// backoff up to the configured bound.
    pub async fn fetch(&self, url: &str, source_id: &str) -> Result<PageContent, FetchError> {
        let strategy = ExponentialBackoff::from_millis(2)
            .factor(self.config.retry_delay_ms)
            .take(self.config.retry_attempts as usize);

        RetryIf::spawn(
            strategy,
            || self.attempt(url, source_id),
            |err: &FetchError| err.is_transient(),
        )
        .await
    }

    async fn attempt(&self, url: &str, source_id: &str) -> Result<PageContent, FetchError> {
        let response = self
            .client
            .get(url)
            .headers(self.request_headers(source_id))
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus(status.as_u16()));
        }

        let final_url = response.url().to_string();
        let body = response.text().await.map_err(map_reqwest_error)?;

        Ok(PageContent { final_url, body })
    }

    fn request_headers(&self, source_id: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        let user_agent = match source_id {
            "amazon" | "hepsiburada" | "trendyol" => CHROME_USER_AGENT,
            _ => self.config.user_agent.as_str(),
        };
        if let Ok(value) = HeaderValue::from_str(user_agent) {
            headers.insert(USER_AGENT, value);
        }
        headers.insert(ACCEPT, HeaderValue::from_static(HTML_ACCEPT));
        if matches!(source_id, "amazon" | "hepsiburada" | "trendyol") {
            headers.insert(
                ACCEPT_LANGUAGE,
                HeaderValue::from_static(TURKISH_ACCEPT_LANGUAGE),
            );
        }
        headers
    }
}

fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout
    } else if err.is_redirect() {
        FetchError::TooManyRedirects
    } else {
        FetchError::Connect(err.to_string())
    }
}
