//! Shared HTTP client for all extractors.
//!
//! Exchange sites reject the default `reqwest` identification, and two of them
//! only serve their data endpoints once a session cookie has been set by the
//! homepage. The [`Fetcher`] therefore sends browser headers, keeps a cookie
//! store, and exposes a [`Fetcher::warm_up`] step. Every request carries its
//! own timeout.
//!
//! For tests, `base_override` reroutes every request to a local server while
//! the sources keep their real origins for link resolution.

use crate::errors::ExtractError;
use crate::utils::truncate_for_log;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue, REFERER};
use reqwest::{Client, StatusCode};
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, instrument, warn};
use url::Url;

pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

#[derive(Debug, Clone)]
pub struct HttpSettings {
    /// Timeout applied to each individual request.
    pub request_timeout: Duration,
    /// Pause between a warm-up request and the real one.
    pub warmup_delay: Duration,
    /// Send every request here instead of the source's origin.
    pub base_override: Option<Url>,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            warmup_delay: Duration::from_millis(2000),
            base_override: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    settings: HttpSettings,
}

impl Fetcher {
    pub fn new(settings: HttpSettings) -> Result<Self, reqwest::Error> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/json;q=0.9,*/*;q=0.8"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

        let client = Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .default_headers(headers)
            .cookie_store(true)
            .build()?;
        Ok(Self { client, settings })
    }

    /// Where a request for `origin` + `path` is actually sent.
    pub fn endpoint_url(&self, origin: &str, path: &str) -> Result<Url, ExtractError> {
        let base = match &self.settings.base_override {
            Some(base) => base.clone(),
            None => Url::parse(origin)?,
        };
        Ok(base.join(path)?)
    }

    /// GET `origin` + `path` and return the body.
    ///
    /// 401/403 become [`ExtractError::Auth`]; any other non-success status
    /// becomes [`ExtractError::Status`].
    #[instrument(level = "info", skip(self))]
    pub async fn get_text(&self, origin: &str, path: &str) -> Result<String, ExtractError> {
        let url = self.endpoint_url(origin, path)?;
        let t0 = Instant::now();
        let response = self
            .client
            .get(url.clone())
            .header(REFERER, origin)
            .timeout(self.settings.request_timeout)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ExtractError::Auth {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            return Err(ExtractError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        debug!(
            %url,
            bytes = body.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            preview = %truncate_for_log(&body, 120),
            "Fetched"
        );
        Ok(body)
    }

    /// Visit the site's homepage so its session cookies land in the store,
    /// then wait the configured delay.
    ///
    /// A failed warm-up is only logged: the data request that follows reports
    /// the real problem.
    #[instrument(level = "info", skip(self))]
    pub async fn warm_up(&self, origin: &str) {
        if let Err(e) = self.get_text(origin, "/").await {
            warn!(error = %e, "Warm-up request failed; trying the data endpoint anyway");
        }
        if !self.settings.warmup_delay.is_zero() {
            sleep(self.settings.warmup_delay).await;
        }
    }
}
