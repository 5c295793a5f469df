//! The fetch gateway every source goes through.
//!
//! [`ScrapeContext::fetch_page`] is the only way a scraper reaches the
//! network: compliance gate first, then for every attempt the rate limiter,
//! the domain session headers, the transport call and response
//! classification. Transient failures are retried with exponential backoff.

use crate::error::{Result, ScrapeError};
use crate::extract::detect_challenge;
use shelfscan_core::{AppConfig, ScrapingConfig};
use shelfscan_net::{
    request_target, ComplianceChecker, CompliancePolicy, FetchRequest, FetchResponse,
    HttpTransport, RateLimitPolicy, RateLimiter, SessionManager,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Extra backoff factor applied when the site answers HTTP 429.
const RATE_LIMIT_BACKOFF_MULTIPLIER: u32 = 3;

/// Retry bounds for transient fetch failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per fetch, including the first
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &ScrapingConfig) -> Self {
        Self {
            max_attempts: config.max_retries.max(1),
            base_delay: Duration::from_millis(config.retry_base_delay_ms),
        }
    }

    /// Delay before the attempt following `attempt` (zero-based).
    #[must_use]
    pub fn delay_for(&self, attempt: u32, rate_limited: bool) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        let delay = self.base_delay.saturating_mul(factor);
        if rate_limited {
            delay.saturating_mul(RATE_LIMIT_BACKOFF_MULTIPLIER)
        } else {
            delay
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&ScrapingConfig::default())
    }
}

/// How much a single search may collect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchLimits {
    pub max_results: usize,
    pub max_pages: u32,
}

impl SearchLimits {
    pub fn from_config(config: &ScrapingConfig) -> Self {
        Self {
            max_results: config.max_results_per_source,
            max_pages: config.max_pages.max(1),
        }
    }
}

impl Default for SearchLimits {
    fn default() -> Self {
        Self::from_config(&ScrapingConfig::default())
    }
}

/// A successfully fetched page.
#[derive(Debug, Clone)]
pub struct Page {
    /// Final URL after redirects
    pub url: String,
    pub status: u16,
    pub body: String,
}

/// Shared collaborators handed to every scraper at construction time.
///
/// Cloning is cheap; clones share the compliance cache, rate limit state and
/// sessions.
#[derive(Clone)]
pub struct ScrapeContext {
    transport: Arc<dyn HttpTransport>,
    compliance: Arc<ComplianceChecker>,
    limiter: Arc<RateLimiter>,
    sessions: Arc<SessionManager>,
    retry: RetryPolicy,
    limits: SearchLimits,
    request_timeout: Duration,
}

impl std::fmt::Debug for ScrapeContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScrapeContext")
            .field("retry", &self.retry)
            .field("limits", &self.limits)
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}

impl ScrapeContext {
    /// Assemble a context from explicit collaborators with default limits.
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        compliance: Arc<ComplianceChecker>,
        limiter: Arc<RateLimiter>,
        sessions: Arc<SessionManager>,
    ) -> Self {
        Self {
            transport,
            compliance,
            limiter,
            sessions,
            retry: RetryPolicy::default(),
            limits: SearchLimits::default(),
            request_timeout: ScrapingConfig::default().request_timeout(),
        }
    }

    /// Build every collaborator from configuration around one transport.
    pub fn from_config(config: &AppConfig, transport: Arc<dyn HttpTransport>) -> Self {
        let compliance = Arc::new(ComplianceChecker::new(
            Arc::clone(&transport),
            CompliancePolicy::from_config(&config.compliance),
        ));
        let limiter = Arc::new(RateLimiter::new(RateLimitPolicy::from_config(
            &config.rate_limit,
        )));

        Self::new(transport, compliance, limiter, Arc::new(SessionManager::new()))
            .with_retry_policy(RetryPolicy::from_config(&config.scraping))
            .with_limits(SearchLimits::from_config(&config.scraping))
            .with_request_timeout(config.scraping.request_timeout())
    }

    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn with_limits(mut self, limits: SearchLimits) -> Self {
        self.limits = limits;
        self
    }

    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn compliance(&self) -> &Arc<ComplianceChecker> {
        &self.compliance
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    pub fn limits(&self) -> SearchLimits {
        self.limits
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Fetch `url` through the compliance gate, rate limiter and session.
    ///
    /// A compliance denial returns before any request is issued. Timeouts,
    /// transport errors, 5xx and 429 are retried; everything else surfaces
    /// on the first occurrence.
    pub async fn fetch_page(&self, url: &str) -> Result<Page> {
        let (domain, path) =
            request_target(url).map_err(|e| ScrapeError::InvalidUrl(e.to_string()))?;

        if !self.compliance.is_allowed(&domain, &path).await {
            warn!(domain = %domain, path = %path, "fetch blocked by robots.txt");
            return Err(ScrapeError::ComplianceDenied {
                url: url.to_string(),
            });
        }

        let session = self.sessions.session_for(&domain);
        let mut attempt = 0;

        loop {
            self.limiter.acquire(&domain).await;

            let request = FetchRequest::get(url)
                .with_headers(session.request_headers())
                .with_timeout(self.request_timeout);

            let outcome = match self.transport.fetch(request).await {
                Ok(response) => {
                    session.store_cookies(&response.set_cookies);
                    classify(url, response)
                }
                Err(e) => Err(ScrapeError::from_net(url, e, attempt + 1)),
            };

            match outcome {
                Ok(page) => {
                    debug!(domain = %domain, status = page.status, attempt, "page fetched");
                    return Ok(page);
                }
                Err(e) if e.is_retryable() && attempt + 1 < self.retry.max_attempts => {
                    let throttled = matches!(e, ScrapeError::HttpStatus { status: 429, .. });
                    let delay = self.retry.delay_for(attempt, throttled);
                    warn!(
                        domain = %domain,
                        attempt = attempt + 1,
                        max_attempts = self.retry.max_attempts,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %e,
                        "fetch failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    if e.is_retryable() {
                        error!(domain = %domain, attempts = attempt + 1, error = %e, "fetch retries exhausted");
                    } else if let ScrapeError::AntiBotBlocked { indicator, .. } = &e {
                        warn!(domain = %domain, indicator = %indicator, "anti-bot challenge, consider rotating identity");
                    }
                    return Err(e);
                }
            }
        }
    }
}

fn classify(url: &str, response: FetchResponse) -> Result<Page> {
    match response.status {
        403 => Err(ScrapeError::AntiBotBlocked {
            url: url.to_string(),
            indicator: "HTTP 403".to_string(),
        }),
        status if (200..300).contains(&status) => {
            if let Some(indicator) = detect_challenge(&response.body) {
                return Err(ScrapeError::AntiBotBlocked {
                    url: url.to_string(),
                    indicator: indicator.to_string(),
                });
            }
            Ok(Page {
                url: response.url,
                status,
                body: response.body,
            })
        }
        status => Err(ScrapeError::HttpStatus {
            url: url.to_string(),
            status,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles() {
        let retry = RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(2000),
        };
        assert_eq!(retry.delay_for(0, false), Duration::from_millis(2000));
        assert_eq!(retry.delay_for(1, false), Duration::from_millis(4000));
        assert_eq!(retry.delay_for(2, false), Duration::from_millis(8000));
    }

    #[test]
    fn test_rate_limited_backoff_longer() {
        let retry = RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
        };
        assert_eq!(retry.delay_for(1, true), Duration::from_millis(6000));
    }

    #[test]
    fn test_retry_policy_from_config() {
        let retry = RetryPolicy::default();
        assert_eq!(retry.max_attempts, 3);
        assert_eq!(retry.base_delay, Duration::from_millis(2000));
    }

    #[test]
    fn test_classify_statuses() {
        let url = "https://www.target.com/s?searchTerm=mouse";

        let page = classify(url, FetchResponse::new(url, 200, "<html></html>")).unwrap();
        assert_eq!(page.status, 200);

        let blocked = classify(url, FetchResponse::new(url, 403, "Forbidden")).unwrap_err();
        assert!(matches!(blocked, ScrapeError::AntiBotBlocked { .. }));

        let challenge = classify(
            url,
            FetchResponse::new(url, 200, "<div id=\"px-captcha\"></div>"),
        )
        .unwrap_err();
        assert!(matches!(
            challenge,
            ScrapeError::AntiBotBlocked { ref indicator, .. } if indicator == "perimeterx"
        ));

        let with_widget = classify(
            url,
            FetchResponse::new(
                url,
                200,
                r#"<div data-test="product-card">Mouse</div><div class="g-recaptcha"></div><script src="/cdn-cgi/challenge-platform/main.js"></script>"#,
            ),
        );
        assert!(with_widget.is_ok());

        let missing = classify(url, FetchResponse::new(url, 404, "")).unwrap_err();
        assert!(missing.is_not_found());

        let down = classify(url, FetchResponse::new(url, 502, "")).unwrap_err();
        assert!(down.is_retryable());
    }
}
