//! Per-domain request spacing.
//!
//! Each domain has its own async lock, so waiting on one domain never delays
//! another. The lock is held across the sleep: concurrent callers for the same
//! domain queue up and are released one interval apart.

use rand::Rng;
use shelfscan_core::RateLimitConfig;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Interval bounds applied between consecutive requests to one domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub min_interval: Duration,
    pub max_interval: Duration,
    /// Every N requests the cooldown range is used instead (0 = never)
    pub cooldown_every: u32,
    pub cooldown_min: Duration,
    pub cooldown_max: Duration,
}

impl RateLimitPolicy {
    /// A constant interval with no jitter and no cooldown.
    pub fn fixed(interval: Duration) -> Self {
        Self {
            min_interval: interval,
            max_interval: interval,
            cooldown_every: 0,
            cooldown_min: interval,
            cooldown_max: interval,
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self {
            min_interval: Duration::from_millis(config.min_delay_ms),
            max_interval: Duration::from_millis(config.max_delay_ms),
            cooldown_every: config.cooldown_every,
            cooldown_min: Duration::from_millis(config.cooldown_min_ms),
            cooldown_max: Duration::from_millis(config.cooldown_max_ms),
        }
    }

    /// Interval to enforce before the request following `completed` earlier ones.
    fn interval_after(&self, completed: u64) -> Duration {
        let cooldown = self.cooldown_every > 0
            && completed > 0
            && completed % u64::from(self.cooldown_every) == 0;

        let drawn = if cooldown {
            jitter(self.cooldown_min, self.cooldown_max)
        } else {
            jitter(self.min_interval, self.max_interval)
        };
        drawn.max(self.min_interval)
    }
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self::from_config(&RateLimitConfig::default())
    }
}

fn jitter(min: Duration, max: Duration) -> Duration {
    if max <= min {
        return min;
    }
    let low = u64::try_from(min.as_millis()).unwrap_or(u64::MAX);
    let high = u64::try_from(max.as_millis()).unwrap_or(u64::MAX);
    Duration::from_millis(rand::thread_rng().gen_range(low..=high))
}

#[derive(Debug, Default)]
struct DomainState {
    last_request: Option<Instant>,
    completed: u64,
}

/// Enforces the minimum spacing between requests to the same domain.
#[derive(Debug)]
pub struct RateLimiter {
    policy: RateLimitPolicy,
    domains: Mutex<HashMap<String, Arc<tokio::sync::Mutex<DomainState>>>>,
}

impl RateLimiter {
    pub fn new(policy: RateLimitPolicy) -> Self {
        Self {
            policy,
            domains: Mutex::new(HashMap::new()),
        }
    }

    pub fn policy(&self) -> &RateLimitPolicy {
        &self.policy
    }

    /// Wait until a request to `domain` is allowed, then record and return its start instant.
    pub async fn acquire(&self, domain: &str) -> Instant {
        let slot = self.slot(domain);
        let mut state = slot.lock().await;

        if let Some(last) = state.last_request {
            let interval = self.policy.interval_after(state.completed);
            let elapsed = last.elapsed();
            if elapsed < interval {
                let wait = interval - elapsed;
                debug!(
                    domain = %domain,
                    wait_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX),
                    "rate limit wait"
                );
                tokio::time::sleep(wait).await;
            }
        }

        let now = Instant::now();
        state.last_request = Some(now);
        state.completed += 1;
        now
    }

    /// Start instant of the most recent request to `domain`.
    pub async fn last_request(&self, domain: &str) -> Option<Instant> {
        let slot = self
            .domains
            .lock()
            .expect("acquire rate limiter map lock")
            .get(&domain_key(domain))
            .cloned()?;
        let state = slot.lock().await;
        state.last_request
    }

    fn slot(&self, domain: &str) -> Arc<tokio::sync::Mutex<DomainState>> {
        let mut domains = self.domains.lock().expect("acquire rate limiter map lock");
        Arc::clone(domains.entry(domain_key(domain)).or_default())
    }
}

fn domain_key(domain: &str) -> String {
    domain.trim().to_ascii_lowercase()
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimitPolicy::default())
    }
}
