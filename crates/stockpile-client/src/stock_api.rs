//! Client for the cursor-paginated stock ratings API.
//!
//! The API serves one page per `GET` on its endpoint. The first page is
//! requested without parameters; later pages pass the previous response's
//! `next_page` value back as the `next_page` query parameter. An empty or
//! missing `next_page` marks the last page.

use std::time::Duration;

use reqwest::header::{AUTHORIZATION, HeaderValue};
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use stockpile_core::HttpConfig;
use stockpile_core::error::AppError;
use stockpile_core::models::{Page, Stock};
use tokio::time::sleep;

/// Wire format of one API page.
///
/// ```json
/// {
///     "items": [ { "ticker": "BSBR", ... } ],
///     "next_page": "BSBR"
/// }
/// ```
#[derive(Deserialize, Debug)]
struct StockPageResponse {
    #[serde(default)]
    items: Vec<Stock>,
    #[serde(default)]
    next_page: Option<String>,
}

/// HTTP client for the stock ratings API.
///
/// # Examples
///
/// ```no_run
/// use stockpile_client::StockApiClient;
/// use stockpile_core::traits::PageProvider;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = StockApiClient::new("https://api.example.com/swechallenge/list", "secret")?;
/// let page = client.fetch_page(None).await?;
/// println!("First page has {} ratings", page.items.len());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct StockApiClient {
    client: Client,
    endpoint: Url,
    authorization: Option<HeaderValue>,
    config: HttpConfig,
}

impl StockApiClient {
    /// Maximum backoff delay between retries.
    const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

    /// Longest response body excerpt carried in an error message.
    const ERROR_BODY_LIMIT: usize = 512;

    /// Creates a client with the default HTTP configuration.
    ///
    /// # Arguments
    ///
    /// * `endpoint` - Full URL of the list endpoint
    /// * `token` - API token; sent as `Authorization: Bearer <token>`
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidUrl` if the endpoint is empty or malformed.
    /// Returns `AppError::ConfigError` if the token cannot be sent as a header.
    pub fn new(endpoint: &str, token: &str) -> Result<Self, AppError> {
        Self::with_config(endpoint, token, HttpConfig::default())
    }

    /// Creates a client with a custom HTTP configuration.
    pub fn with_config(endpoint: &str, token: &str, config: HttpConfig) -> Result<Self, AppError> {
        if endpoint.trim().is_empty() {
            return Err(AppError::InvalidUrl(
                "empty API endpoint (check API_ENDPOINT)".to_string(),
            ));
        }
        let endpoint =
            Url::parse(endpoint).map_err(|_| AppError::InvalidUrl(endpoint.to_string()))?;

        let authorization = bearer_header(token)?;

        let client = Client::builder()
            .user_agent(concat!("stockpile/", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout)
            .build()
            .map_err(|e| AppError::ClientError(e.to_string()))?;

        Ok(Self {
            client,
            endpoint,
            authorization,
            config,
        })
    }

    /// Returns the endpoint this client pages through.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Fetches one page of ratings.
    ///
    /// # Arguments
    ///
    /// * `cursor` - `None` for the first page, otherwise a previous `next_page`
    ///
    /// # Errors
    ///
    /// Returns `AppError::ClientError` for non-retryable HTTP statuses,
    /// `AppError::SerializationError` for malformed bodies, and the last
    /// transport error once retries are exhausted.
    pub async fn fetch_stocks(&self, cursor: Option<&str>) -> Result<Page<Stock>, AppError> {
        let url = self.page_url(cursor);
        let response = self.request_with_retry(&url).await?;

        let body = response
            .text()
            .await
            .map_err(|e| AppError::ClientError(format!("Failed to read response: {}", e)))?;
        let parsed: StockPageResponse = serde_json::from_str(&body)?;

        let received = parsed.items.len();
        let items: Vec<Stock> = parsed
            .items
            .into_iter()
            .filter(|stock| !stock.ticker.trim().is_empty())
            .collect();
        if items.len() < received {
            tracing::warn!(
                dropped = received - items.len(),
                cursor,
                "Dropping ratings without a ticker"
            );
        }

        tracing::debug!(
            cursor,
            items = items.len(),
            next_page = parsed.next_page.as_deref(),
            "Fetched ratings page"
        );
        Ok(Page::new(items, parsed.next_page))
    }

    fn page_url(&self, cursor: Option<&str>) -> Url {
        let mut url = self.endpoint.clone();
        if let Some(cursor) = cursor {
            url.query_pairs_mut().append_pair("next_page", cursor);
        }
        url
    }

    /// Sends a GET, retrying rate limits, server errors, timeouts, and
    /// connection failures with exponential backoff.
    async fn request_with_retry(&self, url: &Url) -> Result<reqwest::Response, AppError> {
        let max_attempts = self.config.max_retries + 1;
        let mut last_error = AppError::Generic("No attempts made".to_string());

        for attempt in 1..=max_attempts {
            let mut request = self.client.get(url.clone());
            if let Some(auth) = &self.authorization {
                request = request.header(AUTHORIZATION, auth.clone());
            }

            let retry_after = match request.send().await {
                Ok(resp) => {
                    let status = resp.status();

                    if status.is_success() {
                        return Ok(resp);
                    }

                    if status == StatusCode::TOO_MANY_REQUESTS {
                        last_error = AppError::RateLimitExceeded;
                        resp.headers()
                            .get("retry-after")
                            .and_then(|v| v.to_str().ok())
                            .and_then(|v| v.parse::<u64>().ok())
                            .map(Duration::from_secs)
                    } else if status.is_server_error() {
                        last_error = AppError::ClientError(format!(
                            "Server error: HTTP {}",
                            status.as_u16()
                        ));
                        None
                    } else {
                        let body = resp.text().await.unwrap_or_default();
                        return Err(AppError::ClientError(format!(
                            "HTTP {} from {}: {}",
                            status.as_u16(),
                            url,
                            truncate(&body, Self::ERROR_BODY_LIMIT)
                        )));
                    }
                }
                Err(e) => {
                    last_error = if e.is_timeout() {
                        AppError::Timeout(self.config.timeout.as_secs())
                    } else if e.is_connect() {
                        AppError::NetworkError(format!("Connection failed: {}", e))
                    } else {
                        AppError::ClientError(e.to_string())
                    };

                    if !last_error.is_retryable() {
                        return Err(last_error);
                    }
                    None
                }
            };

            if attempt < max_attempts {
                let delay = retry_after.unwrap_or_else(|| {
                    self.config
                        .retry_base_delay
                        .saturating_mul(2_u32.saturating_pow(attempt - 1))
                        .min(Self::MAX_RETRY_DELAY)
                });
                tracing::warn!(
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %last_error,
                    "Request failed, retrying"
                );
                sleep(delay).await;
            }
        }

        tracing::warn!(url = %url, error = %last_error, "Giving up after retries");
        Err(last_error)
    }
}

impl stockpile_core::traits::PageProvider for StockApiClient {
    type Item = Stock;

    async fn fetch_page(&self, cursor: Option<&str>) -> Result<Page<Stock>, AppError> {
        self.fetch_stocks(cursor).await
    }
}

/// Builds the `Authorization` header value for `token`.
///
/// A value already carrying the `Bearer ` scheme is sent unchanged; an empty
/// token sends no header at all.
fn bearer_header(token: &str) -> Result<Option<HeaderValue>, AppError> {
    let token = token.trim();
    if token.is_empty() {
        return Ok(None);
    }
    let value = if token.starts_with("Bearer ") {
        token.to_string()
    } else {
        format!("Bearer {}", token)
    };
    let mut header = HeaderValue::from_str(&value).map_err(|_| {
        AppError::ConfigError("AUTHENTICATION contains invalid header characters".to_string())
    })?;
    header.set_sensitive(true);
    Ok(Some(header))
}

fn truncate(body: &str, limit: usize) -> &str {
    match body.char_indices().nth(limit) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}
