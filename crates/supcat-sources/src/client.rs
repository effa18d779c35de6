use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde_json::Value;

use crate::error::SourceError;
use crate::rate_limit::retry_with_backoff;

/// Shared outbound HTTP client for supplier endpoints.
///
/// Every call carries the configured per-call timeout, so a supplier that
/// never answers surfaces as [`SourceError::Http`] instead of stalling a run.
/// Transient errors (429, network failures, timeouts) are retried with
/// exponential backoff up to `max_retries` additional attempts.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    /// Maximum number of retry attempts after the first failure.
    max_retries: u32,
    /// Base delay in seconds for exponential backoff: `backoff_base_secs * 2^attempt`.
    backoff_base_secs: u64,
}

impl HttpFetcher {
    /// Creates a fetcher with configured timeout, `User-Agent`, and retry policy.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(
        timeout_secs: u64,
        user_agent: &str,
        max_retries: u32,
        backoff_base_secs: u64,
    ) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;
        Ok(Self {
            client,
            max_retries,
            backoff_base_secs,
        })
    }

    /// Builds a fetcher from the runtime config's `SUPCAT_HTTP_*` settings.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Http`] if the client cannot be constructed.
    pub fn from_app_config(config: &supcat_core::AppConfig) -> Result<Self, SourceError> {
        Self::new(
            config.http_timeout_secs,
            &config.http_user_agent,
            config.http_max_retries,
            config.http_retry_backoff_base_secs,
        )
    }

    /// GETs `url` and returns the body as text.
    ///
    /// # Errors
    ///
    /// - [`SourceError::RateLimited`]: HTTP 429 after all retries.
    /// - [`SourceError::NotFound`]: HTTP 404 (not retried).
    /// - [`SourceError::UnexpectedStatus`]: any other non-2xx status (not retried).
    /// - [`SourceError::Http`]: network failure or timeout after all retries.
    pub async fn get_text(&self, url: &str, bearer: Option<&str>) -> Result<String, SourceError> {
        retry_with_backoff(self.max_retries, self.backoff_base_secs, || async move {
            let mut request = self.client.get(url);
            if let Some(token) = bearer {
                request = request.bearer_auth(token);
            }
            let response = send_checked(request, url).await?;
            Ok(response.text().await?)
        })
        .await
    }

    /// GETs `url` and parses the body as JSON.
    ///
    /// # Errors
    ///
    /// Same as [`Self::get_text`], plus [`SourceError::Deserialize`] when the
    /// body is not valid JSON.
    pub async fn get_json(&self, url: &str, bearer: Option<&str>) -> Result<Value, SourceError> {
        let body = self.get_text(url, bearer).await?;
        serde_json::from_str(&body).map_err(|e| SourceError::Deserialize {
            context: url.to_owned(),
            source: e,
        })
    }

    /// POSTs `body` as JSON to `url`, discarding the response body.
    ///
    /// This is a single attempt; callers that need a retry budget loop
    /// themselves.
    ///
    /// # Errors
    ///
    /// Returns the same status and transport errors as [`Self::get_text`].
    pub async fn post_json(&self, url: &str, body: &Value) -> Result<(), SourceError> {
        send_checked(self.client.post(url).json(body), url).await?;
        Ok(())
    }
}

async fn send_checked(request: RequestBuilder, url: &str) -> Result<Response, SourceError> {
    let response = request.send().await?;
    let status = response.status();

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after_secs = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(60);
        return Err(SourceError::RateLimited {
            domain: extract_domain(url),
            retry_after_secs,
        });
    }

    if status == StatusCode::NOT_FOUND {
        return Err(SourceError::NotFound {
            url: url.to_owned(),
        });
    }

    if !status.is_success() {
        return Err(SourceError::UnexpectedStatus {
            status: status.as_u16(),
            url: url.to_owned(),
        });
    }

    Ok(response)
}

/// Extracts the hostname from a URL for use in error messages.
///
/// Falls back to the full URL string if parsing fails.
pub(crate) fn extract_domain(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_owned))
        .unwrap_or_else(|| url.to_owned())
}
