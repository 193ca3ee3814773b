//! Common utilities for service clients
//!
//! This module provides the HTTP plumbing shared by the Cachet and
//! PagerDuty clients.

use std::fmt;
use std::time::{Duration, Instant};

use log::{debug, warn};
use reqwest::{header, Client};
use serde::{de::DeserializeOwned, Serialize};
use url::Url;

use crate::error::{ErrorContext, Result, ServiceError};

/// UserAgent structure for identifying the client to upstream services
#[derive(Debug, Clone)]
pub struct UserAgent {
    /// Application name
    pub app_name: String,

    /// Version string
    pub version: String,

    /// Optional extra info
    pub extra: Option<String>,
}

impl Default for UserAgent {
    fn default() -> Self {
        Self {
            app_name: "Status-Bridge".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            extra: Some("bridge-sdk".to_string()),
        }
    }
}

impl fmt::Display for UserAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.app_name, self.version)?;

        if let Some(ref extra) = self.extra {
            write!(f, " ({})", extra)?;
        }

        Ok(())
    }
}

/// Build a standard HTTP client with default settings
///
/// `default_headers` are sent on every request; clients use them to carry
/// their authentication token.
pub fn build_http_client(
    user_agent: Option<UserAgent>,
    timeout: Option<Duration>,
    default_headers: header::HeaderMap,
) -> Result<Client> {
    let mut headers = default_headers;
    let ua = user_agent.unwrap_or_default().to_string();

    headers.insert(
        header::USER_AGENT,
        header::HeaderValue::from_str(&ua)
            .map_err(|e| ServiceError::configuration(format!("Invalid user agent: {}", e)))?,
    );

    reqwest::Client::builder()
        .default_headers(headers)
        .timeout(timeout.unwrap_or_else(|| Duration::from_secs(30)))
        .gzip(true)
        .build()
        .map_err(|e| ServiceError::configuration(format!("Failed to build HTTP client: {}", e)))
}

/// Build a sensitive header value (excluded from debug output)
pub fn secret_header(value: &str) -> Result<header::HeaderValue> {
    let mut value = header::HeaderValue::from_str(value)
        .map_err(|e| ServiceError::configuration(format!("Invalid credential: {}", e)))?;
    value.set_sensitive(true);
    Ok(value)
}

/// Strip any trailing slash from a base URL
///
/// An unparseable URL is kept as-is; the first request made with it fails
/// and surfaces the problem.
pub fn normalize_base_url(base_url: &str) -> String {
    if let Err(e) = Url::parse(base_url) {
        warn!("Base URL '{}' is not a valid URL: {}", base_url, e);
    }
    base_url.trim_end_matches('/').to_string()
}

/// Parse error response from HTTP response
pub async fn parse_error_response(
    service_name: &str,
    endpoint: &str,
    response: reqwest::Response,
) -> ServiceError {
    let status = response.status();
    let mut context = ErrorContext::for_service(service_name)
        .status_code(status.as_u16())
        .endpoint(endpoint);

    let body = match response.text().await {
        Ok(body) => body,
        Err(e) => format!("Failed to read error response: {}", e),
    };

    let error = crate::error::mapping::map_http_error(status, &body, &mut context);
    error.with_context(context.response_body(body))
}

/// JSON-over-HTTP transport bound to one service's base URL
#[derive(Debug, Clone)]
pub struct JsonTransport {
    http_client: Client,
    base_url: String,
    service: &'static str,
}

impl JsonTransport {
    pub fn new(http_client: Client, base_url: String, service: &'static str) -> Self {
        Self {
            http_client,
            base_url,
            service,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'))
    }

    /// Execute a GET request and decode the JSON response
    pub async fn get<R>(&self, endpoint: &str, query: &[(&str, String)]) -> Result<R>
    where
        R: DeserializeOwned,
    {
        let url = self.url(endpoint);
        debug!("Sending request to {}: GET {}", self.service, url);

        let start_time = Instant::now();
        let response = self
            .http_client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(ServiceError::from)?;

        self.decode(endpoint, start_time, response).await
    }

    /// Execute a POST request with a JSON body and decode the JSON response
    pub async fn post<T, R>(&self, endpoint: &str, body: &T) -> Result<R>
    where
        T: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = self.url(endpoint);
        debug!("Sending request to {}: POST {}", self.service, url);

        let start_time = Instant::now();
        let response = self
            .http_client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(ServiceError::from)?;

        self.decode(endpoint, start_time, response).await
    }

    async fn decode<R>(
        &self,
        endpoint: &str,
        start_time: Instant,
        response: reqwest::Response,
    ) -> Result<R>
    where
        R: DeserializeOwned,
    {
        let status = response.status();

        if !status.is_success() {
            let error = parse_error_response(self.service, endpoint, response).await;
            warn!(
                "{} {} failed after {:?}: {}",
                self.service,
                endpoint,
                start_time.elapsed(),
                error
            );
            return Err(error);
        }

        let body = response.bytes().await.map_err(ServiceError::from)?;
        debug!(
            "{} {} -> {} in {:?}",
            self.service,
            endpoint,
            status.as_u16(),
            start_time.elapsed()
        );

        serde_json::from_slice::<R>(&body).map_err(|e| {
            ServiceError::parsing(format!("Failed to parse response: {}", e)).with_context(
                ErrorContext::for_service(self.service)
                    .status_code(status.as_u16())
                    .endpoint(endpoint)
                    .response_body(String::from_utf8_lossy(&body)),
            )
        })
    }
}
