//! The injected network capability.
//!
//! Everything above this module talks to [`HttpTransport`]; the production
//! implementation is [`ReqwestTransport`], tests substitute their own.

use crate::error::{NetError, Result};
use async_trait::async_trait;
use reqwest::header::SET_COOKIE;
use reqwest::Client;
use std::time::Duration;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// A GET request issued by the framework.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub timeout: Duration,
}

impl FetchRequest {
    /// GET `url` with no extra headers and the default timeout.
    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn with_headers(mut self, headers: Vec<(String, String)>) -> Self {
        self.headers.extend(headers);
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Status, final URL and decoded body of a completed request.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub url: String,
    pub status: u16,
    pub body: String,
    /// Raw `Set-Cookie` header values
    pub set_cookies: Vec<String>,
}

impl FetchResponse {
    #[must_use]
    pub fn new(url: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            status,
            body: body.into(),
            set_cookies: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Performs HTTP GETs on behalf of scrapers and the compliance checker.
///
/// Implementations return `Ok` for every response that arrived, whatever its
/// status; `Err` is reserved for transport failures (timeouts, resets, DNS).
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse>;
}

/// `reqwest`-backed transport with a shared connection pool.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Build a transport with connection pooling and redirect following.
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| NetError::Client(format!("failed to create HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse> {
        let mut builder = self.client.get(&request.url).timeout(request.timeout);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| classify(&request.url, &e))?;

        let status = response.status().as_u16();
        let url = response.url().to_string();
        let set_cookies = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .map(str::to_string)
            .collect();

        let body = response
            .text()
            .await
            .map_err(|e| classify(&request.url, &e))?;

        tracing::debug!(url = %url, status, bytes = body.len(), "fetched");

        Ok(FetchResponse {
            url,
            status,
            body,
            set_cookies,
        })
    }
}

fn classify(url: &str, error: &reqwest::Error) -> NetError {
    if error.is_timeout() {
        NetError::Timeout {
            url: url.to_string(),
        }
    } else {
        NetError::Connection {
            url: url.to_string(),
            message: error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder() {
        let request = FetchRequest::get("https://www.target.com/robots.txt")
            .with_header("User-Agent", "shelfscan")
            .with_timeout(Duration::from_secs(5));
        assert_eq!(request.headers.len(), 1);
        assert_eq!(request.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_response_success_range() {
        assert!(FetchResponse::new("https://a.com", 200, "").is_success());
        assert!(FetchResponse::new("https://a.com", 204, "").is_success());
        assert!(!FetchResponse::new("https://a.com", 301, "").is_success());
        assert!(!FetchResponse::new("https://a.com", 503, "").is_success());
    }

    #[test]
    fn test_reqwest_transport_builds() {
        assert!(ReqwestTransport::new().is_ok());
    }
}
