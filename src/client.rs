//! HTTP client for the m3ter API.
//!
//! Wraps `reqwest` with the three behaviors every call needs: OAuth2
//! client-credentials authentication with a cached bearer token, client-side
//! rate limiting, and classification of non-2xx responses into
//! [`ProviderError`] variants.

use std::time::Duration;

use reqwest::Method;
use serde::Deserialize;
use serde_json::Value as Json;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::error::ProviderError;

/// Default API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.m3ter.com";

/// Default request rate. The API throttles aggressively, so calls are paced
/// rather than burst.
pub const DEFAULT_REQUESTS_PER_SECOND: u32 = 10;

/// Page size used when walking list endpoints.
const LIST_PAGE_SIZE: &str = "200";

/// Seconds subtracted from a token's lifetime before it is refreshed.
const TOKEN_EXPIRY_MARGIN: u64 = 60;

/// Configuration for [`Client`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// The m3ter organization all requests are scoped to.
    pub organization_id: String,
    /// OAuth2 client id.
    pub access_key: String,
    /// OAuth2 client secret.
    pub secret_key: String,
    /// API endpoint, [`DEFAULT_BASE_URL`] unless overridden.
    pub base_url: String,
    /// Client-side request pacing.
    pub requests_per_second: u32,
}

impl ClientConfig {
    /// Create a configuration with default endpoint and rate.
    pub fn new(
        organization_id: impl Into<String>,
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        Self {
            organization_id: organization_id.into(),
            access_key: access_key.into(),
            secret_key: secret_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            requests_per_second: DEFAULT_REQUESTS_PER_SECOND,
        }
    }

    /// Override the API endpoint. Trailing slashes are stripped.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let url: String = base_url.into();
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

struct CachedToken {
    token: String,
    expires_at: Instant,
}

/// Paces requests to a fixed minimum interval.
///
/// The m3ter limiter allows no burst, so a simple next-permitted-instant
/// under a mutex is equivalent to a token bucket of depth one.
struct RateLimiter {
    interval: Duration,
    next: Mutex<Option<Instant>>,
}

impl RateLimiter {
    fn new(requests_per_second: u32) -> Self {
        let rps = requests_per_second.max(1);
        Self {
            interval: Duration::from_secs(1) / rps,
            next: Mutex::new(None),
        }
    }

    async fn acquire(&self) {
        let at = {
            let mut next = self.next.lock().await;
            let now = Instant::now();
            let at = match *next {
                Some(t) if t > now => t,
                _ => now,
            };
            *next = Some(at + self.interval);
            at
        };
        tokio::time::sleep_until(at).await;
    }
}

/// Authenticated, rate-limited client for the m3ter API.
pub struct Client {
    http: reqwest::Client,
    config: ClientConfig,
    limiter: RateLimiter,
    token: Mutex<Option<CachedToken>>,
}

impl Client {
    /// Create a client from a configuration.
    pub fn new(config: ClientConfig) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        let limiter = RateLimiter::new(config.requests_per_second);
        Ok(Self {
            http,
            config,
            limiter,
            token: Mutex::new(None),
        })
    }

    /// The organization this client is scoped to.
    pub fn organization_id(&self) -> &str {
        &self.config.organization_id
    }

    async fn bearer_token(&self) -> Result<String, ProviderError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.expires_at > Instant::now() {
                return Ok(token.token.clone());
            }
        }

        // The token endpoint counts against the same rate limit.
        self.limiter.acquire().await;
        debug!(url = %self.config.base_url, "requesting access token");
        let response = self
            .http
            .post(format!("{}/oauth/token", self.config.base_url))
            .basic_auth(&self.config.access_key, Some(&self.config.secret_key))
            .json(&serde_json::json!({"grant_type": "client_credentials"}))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(status.as_u16(), body));
        }

        let token: TokenResponse = response.json().await?;
        let lifetime = token
            .expires_in
            .unwrap_or(TOKEN_EXPIRY_MARGIN)
            .saturating_sub(TOKEN_EXPIRY_MARGIN);
        *cached = Some(CachedToken {
            token: token.access_token.clone(),
            expires_at: Instant::now() + Duration::from_secs(lifetime.max(1)),
        });
        Ok(token.access_token)
    }

    /// Issue a request against an organization-scoped path.
    ///
    /// `path` starts with `/` and must already have user-supplied segments
    /// percent-escaped via [`escape`]. Returns the decoded response body, or
    /// `None` when the body is empty.
    pub async fn execute(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&Json>,
    ) -> Result<Option<Json>, ProviderError> {
        let token = self.bearer_token().await?;
        self.limiter.acquire().await;

        let url = format!(
            "{}/organizations/{}{}",
            self.config.base_url,
            escape(&self.config.organization_id),
            path
        );
        trace!(%method, %url, "issuing API request");

        let mut request = self.http.request(method, url).bearer_auth(token);
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(ProviderError::from_status(status.as_u16(), text));
        }
        if text.is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(&text)?))
    }

    /// GET a single entity.
    pub async fn get(&self, path: &str) -> Result<Option<Json>, ProviderError> {
        self.execute(Method::GET, path, &[], None).await
    }

    /// POST a new entity.
    pub async fn post(&self, path: &str, body: &Json) -> Result<Option<Json>, ProviderError> {
        self.execute(Method::POST, path, &[], Some(body)).await
    }

    /// PUT a full entity document.
    pub async fn put(&self, path: &str, body: &Json) -> Result<Option<Json>, ProviderError> {
        self.execute(Method::PUT, path, &[], Some(body)).await
    }

    /// DELETE an entity.
    pub async fn delete(&self, path: &str) -> Result<Option<Json>, ProviderError> {
        self.execute(Method::DELETE, path, &[], None).await
    }

    /// Walk a paginated list endpoint, concatenating the `data` arrays of
    /// every page until `nextToken` runs out.
    pub async fn list(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Vec<Json>, ProviderError> {
        let mut items = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let mut page_query: Vec<(&str, &str)> = query.to_vec();
            page_query.push(("pageSize", LIST_PAGE_SIZE));
            if let Some(token) = next_token.as_deref() {
                page_query.push(("nextToken", token));
            }

            let page = self
                .execute(Method::GET, path, &page_query, None)
                .await?
                .unwrap_or(Json::Null);

            if let Some(data) = page.get("data").and_then(Json::as_array) {
                items.extend(data.iter().cloned());
            }

            next_token = page
                .get("nextToken")
                .and_then(Json::as_str)
                .filter(|t| !t.is_empty())
                .map(str::to_string);
            if next_token.is_none() {
                return Ok(items);
            }
        }
    }
}

/// Percent-escape a user-supplied path segment.
pub fn escape(segment: &str) -> String {
    urlencoding::encode(segment).into_owned()
}
