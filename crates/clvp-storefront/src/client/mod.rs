//! HTTP client for storefront product pages.

mod origin;

use std::time::Duration;

use clvp_core::AppConfig;
use reqwest::Client;
use url::Url;

use crate::error::StorefrontError;
use crate::retry::retry_with_backoff;

pub use origin::resolve_product_url;

/// HTTP client for server-rendered product pages.
///
/// Maps 429, 404 and other non-2xx responses to typed errors. Transient
/// errors (429, 5xx, network failures) are retried with exponential backoff
/// up to `max_retries` additional attempts.
#[derive(Debug, Clone)]
pub struct StorefrontClient {
    client: Client,
    /// Maximum number of retry attempts after the first failure.
    max_retries: u32,
    /// Base delay for exponential backoff: `backoff_base_ms * 2^attempt`.
    backoff_base_ms: u64,
}

impl StorefrontClient {
    /// Creates a `StorefrontClient` with configured timeout, `User-Agent`, and
    /// retry policy. Set `max_retries` to `0` to disable retries.
    ///
    /// # Errors
    ///
    /// Returns [`StorefrontError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(
        timeout_secs: u64,
        user_agent: &str,
        max_retries: u32,
        backoff_base_ms: u64,
    ) -> Result<Self, StorefrontError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;
        Ok(Self {
            client,
            max_retries,
            backoff_base_ms,
        })
    }

    /// # Errors
    ///
    /// Returns [`StorefrontError::Http`] if the client cannot be constructed.
    pub fn from_config(config: &AppConfig) -> Result<Self, StorefrontError> {
        Self::new(
            config.request_timeout_secs,
            &config.user_agent,
            config.max_retries,
            config.retry_backoff_base_ms,
        )
    }

    /// Fetches a product page and returns its HTML body.
    ///
    /// # Errors
    ///
    /// - [`StorefrontError::RateLimited`]: HTTP 429 after all retries.
    /// - [`StorefrontError::NotFound`]: HTTP 404 (not retried).
    /// - [`StorefrontError::UnexpectedStatus`]: any other non-2xx status
    ///   (5xx retried, 4xx not).
    /// - [`StorefrontError::Http`]: network or TLS failure after all retries.
    pub async fn fetch_page(&self, url: &Url) -> Result<String, StorefrontError> {
        let referer = url.origin().ascii_serialization();

        retry_with_backoff(self.max_retries, self.backoff_base_ms, || {
            let referer = referer.clone();
            async move {
                tracing::debug!(url = %url, "fetching product page");
                let response = self
                    .client
                    .get(url.clone())
                    .header(
                        reqwest::header::ACCEPT,
                        "text/html,application/xhtml+xml;q=0.9,*/*;q=0.8",
                    )
                    .header(reqwest::header::ACCEPT_LANGUAGE, "en-US,en;q=0.9")
                    .header(reqwest::header::REFERER, &referer)
                    .send()
                    .await?;
                let status = response.status();

                if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                    let retry_after_secs = response
                        .headers()
                        .get(reqwest::header::RETRY_AFTER)
                        .and_then(|v| v.to_str().ok())
                        .and_then(|s| s.parse::<u64>().ok())
                        .unwrap_or(60);
                    return Err(StorefrontError::RateLimited {
                        domain: origin::extract_domain(url),
                        retry_after_secs,
                    });
                }

                if status == reqwest::StatusCode::NOT_FOUND {
                    return Err(StorefrontError::NotFound {
                        url: url.to_string(),
                    });
                }

                if !status.is_success() {
                    return Err(StorefrontError::UnexpectedStatus {
                        status: status.as_u16(),
                        url: url.to_string(),
                    });
                }

                Ok(response.text().await?)
            }
        })
        .await
    }
}

#[cfg(test)]
#[path = "../client_test.rs"]
mod tests;
