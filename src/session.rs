//! Authenticated, retrying HTTP session for the GitHub REST API
//!
//! A single [`GitHubSession`] is built per invocation and shared by every
//! request. Transient failures (rate limiting and gateway errors) are retried
//! here so callers only ever see the final response.

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, RETRY_AFTER, USER_AGENT};
use reqwest::{Client, Method, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{RepoRuleError, Result};

pub const GITHUB_API_URL: &str = "https://api.github.com";
const GITHUB_ACCEPT: &str = "application/vnd.github.v3+json";
const GITHUB_API_VERSION: &str = "2022-11-28";

/// Retry behaviour for transient GitHub API failures
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base of the exponential backoff in milliseconds
    #[serde(default = "default_backoff_factor_ms")]
    pub backoff_factor_ms: u64,

    /// Upper bound for a single computed backoff
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    /// Status codes that trigger a retry
    #[serde(default = "default_retry_statuses")]
    pub retry_statuses: Vec<u16>,

    /// HTTP methods that may be retried
    #[serde(default = "default_retry_methods")]
    pub retry_methods: Vec<String>,

    /// Honour a numeric Retry-After header on 429 and 503
    #[serde(default = "default_true")]
    pub respect_retry_after: bool,
}

fn default_max_retries() -> u32 {
    5
}
fn default_backoff_factor_ms() -> u64 {
    1000
}
fn default_max_backoff_ms() -> u64 {
    120_000
}
fn default_retry_statuses() -> Vec<u16> {
    vec![429, 500, 502, 503, 504]
}
fn default_retry_methods() -> Vec<String> {
    vec!["GET".to_string(), "POST".to_string(), "PATCH".to_string()]
}
fn default_true() -> bool {
    true
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            backoff_factor_ms: default_backoff_factor_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            retry_statuses: default_retry_statuses(),
            retry_methods: default_retry_methods(),
            respect_retry_after: default_true(),
        }
    }
}

impl RetryPolicy {
    /// Policy that never retries
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Delay before the given retry (1-based).
    ///
    /// The first retry is immediate, later ones back off exponentially.
    pub fn backoff(&self, retry: u32) -> Duration {
        if retry <= 1 {
            return Duration::ZERO;
        }
        let exponent = (retry - 1).min(32);
        let millis = self.backoff_factor_ms.saturating_mul(1u64 << exponent);
        Duration::from_millis(millis.min(self.max_backoff_ms))
    }

    pub fn allows_method(&self, method: &Method) -> bool {
        self.retry_methods
            .iter()
            .any(|m| m.eq_ignore_ascii_case(method.as_str()))
    }

    pub fn retries_status(&self, status: StatusCode) -> bool {
        self.retry_statuses.contains(&status.as_u16())
    }

    /// Delay requested by a numeric `Retry-After` on 429 or 503, capped at
    /// `max_backoff_ms`
    pub fn retry_after(&self, status: StatusCode, header: Option<&str>) -> Option<Duration> {
        if !self.respect_retry_after {
            return None;
        }
        if status != StatusCode::TOO_MANY_REQUESTS && status != StatusCode::SERVICE_UNAVAILABLE {
            return None;
        }
        let secs = header?.trim().parse::<u64>().ok()?;
        Some(Duration::from_secs(secs).min(Duration::from_millis(self.max_backoff_ms)))
    }
}

/// Everything needed to build a [`GitHubSession`]
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub api_url: String,
    pub token: Option<String>,
    pub retry: RetryPolicy,
    pub timeout: Option<Duration>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            api_url: GITHUB_API_URL.to_string(),
            token: None,
            retry: RetryPolicy::default(),
            timeout: Some(Duration::from_secs(30)),
        }
    }
}

/// Reusable HTTP client carrying GitHub headers and the retry policy
#[derive(Debug, Clone)]
pub struct GitHubSession {
    client: Client,
    api_url: String,
    retry: RetryPolicy,
}

impl GitHubSession {
    pub fn new(config: &SessionConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(GITHUB_ACCEPT));
        headers.insert(
            "x-github-api-version",
            HeaderValue::from_static(GITHUB_API_VERSION),
        );

        match config.token.as_deref() {
            Some(token) => match HeaderValue::from_str(&format!("Bearer {}", token)) {
                Ok(mut value) => {
                    value.set_sensitive(true);
                    headers.insert(AUTHORIZATION, value);
                }
                Err(_) => warn!("GitHub token contains invalid characters, sending unauthenticated requests"),
            },
            None => debug!("No GitHub token configured, sending unauthenticated requests"),
        }

        let user_agent = format!("reporule/{}", env!("CARGO_PKG_VERSION"));
        if let Ok(value) = HeaderValue::from_str(&user_agent) {
            headers.insert(USER_AGENT, value);
        }

        let mut builder = Client::builder().default_headers(headers);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|source| RepoRuleError::Http {
            method: "BUILD".to_string(),
            url: config.api_url.clone(),
            source,
        })?;

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            retry: config.retry.clone(),
        })
    }

    /// Absolute URL for an API path such as `/orgs/starfleet`
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }

    pub async fn get(&self, url: &str) -> Result<Response> {
        self.send(Method::GET, url, None).await
    }

    pub async fn post_json(&self, url: &str, body: &serde_json::Value) -> Result<Response> {
        self.send(Method::POST, url, Some(body)).await
    }

    /// Send a request, retrying transient failures per the policy.
    ///
    /// Returns the final response whatever its status.
    pub async fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<Response> {
        let retryable = self.retry.allows_method(&method);
        let mut retry = 0u32;

        loop {
            let mut request = self.client.request(method.clone(), url);
            if let Some(body) = body {
                request = request.json(body);
            }

            let budget_left = retryable && retry < self.retry.max_retries;

            match request.send().await {
                Ok(response) => {
                    let status = response.status();
                    if !(budget_left && self.retry.retries_status(status)) {
                        return Ok(response);
                    }
                    retry += 1;
                    let delay = self
                        .retry_after(&response)
                        .unwrap_or_else(|| self.retry.backoff(retry));
                    warn!(
                        %method,
                        url,
                        status = status.as_u16(),
                        retry,
                        delay_ms = delay.as_millis() as u64,
                        "Transient GitHub API response, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(source) => {
                    let transient = source.is_connect() || source.is_timeout();
                    if !(budget_left && transient) {
                        return Err(RepoRuleError::Http {
                            method: method.to_string(),
                            url: url.to_string(),
                            source,
                        });
                    }
                    retry += 1;
                    let delay = self.retry.backoff(retry);
                    warn!(%method, url, retry, error = %source, "HTTP request failed, retrying");
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    fn retry_after(&self, response: &Response) -> Option<Duration> {
        let header = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|value| value.to_str().ok());
        self.retry.retry_after(response.status(), header)
    }
}

/// Turn a non-success response into an [`RepoRuleError::Api`]
pub(crate) async fn ensure_success(method: &str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let url = response.url().to_string();
    let body = response.text().await.unwrap_or_default();
    Err(RepoRuleError::Api {
        method: method.to_string(),
        url,
        status: status.as_u16(),
        body,
    })
}

/// Read a JSON body into `T`, reporting failures with the request method and URL
pub(crate) async fn decode_json<T: serde::de::DeserializeOwned>(
    method: &str,
    response: Response,
) -> Result<T> {
    let url = response.url().to_string();
    let text = response.text().await.map_err(|source| RepoRuleError::Http {
        method: method.to_string(),
        url: url.clone(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| RepoRuleError::Decode {
        method: method.to_string(),
        url,
        source,
    })
}
