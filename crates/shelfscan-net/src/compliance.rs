//! robots.txt compliance gate with a per-domain TTL cache.
//!
//! Each domain's robots file is fetched at most once per TTL; concurrent checks
//! for a cold domain wait on a single fetch. Fetch failures (5xx, transport
//! errors, non-robots bodies) are cached for the shorter failure TTL and
//! resolved by the configured [`FailPolicy`].

use crate::error::Result;
use crate::robots::RobotsRules;
use crate::transport::{FetchRequest, HttpTransport};
use crate::urls::request_target;
use shelfscan_core::{ComplianceConfig, FailPolicy};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

const ROBOTS_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Settings for [`ComplianceChecker`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompliancePolicy {
    /// How long successfully fetched rules stay cached
    pub ttl: Duration,
    /// How long a failed fetch is remembered before retrying
    pub failure_ttl: Duration,
    pub fail_policy: FailPolicy,
    /// Token matched against `User-agent` groups
    pub user_agent_token: String,
    /// Scheme used to build the robots.txt URL
    pub scheme: String,
}

impl CompliancePolicy {
    pub fn from_config(config: &ComplianceConfig) -> Self {
        Self {
            ttl: Duration::from_secs(config.cache_ttl_secs),
            failure_ttl: Duration::from_secs(config.failure_ttl_secs),
            fail_policy: config.fail_policy,
            user_agent_token: config.user_agent_token.clone(),
            scheme: "https".to_string(),
        }
    }
}

impl Default for CompliancePolicy {
    fn default() -> Self {
        Self::from_config(&ComplianceConfig::default())
    }
}

#[derive(Debug, Clone)]
enum Verdict {
    Rules(RobotsRules),
    Unavailable,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    verdict: Verdict,
    expires_at: Instant,
}

/// Decides whether a path on a domain may be fetched.
pub struct ComplianceChecker {
    transport: Arc<dyn HttpTransport>,
    policy: CompliancePolicy,
    cache: Mutex<HashMap<String, CacheEntry>>,
    fetch_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl std::fmt::Debug for ComplianceChecker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComplianceChecker")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl ComplianceChecker {
    pub fn new(transport: Arc<dyn HttpTransport>, policy: CompliancePolicy) -> Self {
        Self {
            transport,
            policy,
            cache: Mutex::new(HashMap::new()),
            fetch_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn policy(&self) -> &CompliancePolicy {
        &self.policy
    }

    /// Whether `path` on `domain` may be fetched.
    ///
    /// Never fails: an unavailable robots file resolves to the fail policy.
    pub async fn is_allowed(&self, domain: &str, path: &str) -> bool {
        let domain = domain.trim().to_ascii_lowercase();

        if let Some(allowed) = self.cached_decision(&domain, path) {
            return allowed;
        }

        let lock = self.fetch_lock(&domain);
        let _guard = lock.lock().await;

        // Another caller may have populated the cache while we waited
        if let Some(allowed) = self.cached_decision(&domain, path) {
            return allowed;
        }

        let entry = self.fetch_entry(&domain).await;
        let allowed = self.decide(&entry.verdict, path);
        self.cache
            .lock()
            .expect("acquire robots cache lock")
            .insert(domain.clone(), entry);

        if !allowed {
            info!(domain = %domain, path = %path, "robots.txt disallows path");
        }
        allowed
    }

    /// Same as [`is_allowed`](Self::is_allowed) for a full URL.
    ///
    /// Unparseable URLs are rejected.
    pub async fn is_url_allowed(&self, url: &str) -> Result<bool> {
        let (domain, path) = request_target(url)?;
        Ok(self.is_allowed(&domain, &path).await)
    }

    /// Drop the cached entry for `domain`. Returns `true` if one existed.
    pub fn invalidate(&self, domain: &str) -> bool {
        self.cache
            .lock()
            .expect("acquire robots cache lock")
            .remove(&domain.trim().to_ascii_lowercase())
            .is_some()
    }

    /// Domains with an unexpired cache entry, sorted.
    pub fn cached_domains(&self) -> Vec<String> {
        let now = Instant::now();
        let mut domains: Vec<String> = self
            .cache
            .lock()
            .expect("acquire robots cache lock")
            .iter()
            .filter(|(_, entry)| entry.expires_at > now)
            .map(|(domain, _)| domain.clone())
            .collect();
        domains.sort();
        domains
    }

    fn cached_decision(&self, domain: &str, path: &str) -> Option<bool> {
        let cache = self.cache.lock().expect("acquire robots cache lock");
        let entry = cache.get(domain)?;
        if entry.expires_at <= Instant::now() {
            return None;
        }
        Some(self.decide(&entry.verdict, path))
    }

    fn decide(&self, verdict: &Verdict, path: &str) -> bool {
        match verdict {
            Verdict::Rules(rules) => rules.is_allowed(&self.policy.user_agent_token, path),
            Verdict::Unavailable => self.policy.fail_policy == FailPolicy::Open,
        }
    }

    fn fetch_lock(&self, domain: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.fetch_locks.lock().expect("acquire robots fetch locks");
        Arc::clone(locks.entry(domain.to_string()).or_default())
    }

    async fn fetch_entry(&self, domain: &str) -> CacheEntry {
        let url = format!("{}://{}/robots.txt", self.policy.scheme, domain);
        let request = FetchRequest::get(&url)
            .with_header("User-Agent", self.policy.user_agent_token.as_str())
            .with_timeout(ROBOTS_FETCH_TIMEOUT);

        let verdict = match self.transport.fetch(request).await {
            Ok(response) if response.is_success() => match RobotsRules::parse(&response.body) {
                Ok(rules) => {
                    debug!(domain = %domain, groups = rules.group_count(), "cached robots.txt");
                    Verdict::Rules(rules)
                }
                Err(e) => {
                    warn!(domain = %domain, error = %e, "unusable robots.txt");
                    Verdict::Unavailable
                }
            },
            Ok(response) if (400..500).contains(&response.status) => {
                debug!(domain = %domain, status = response.status, "no robots.txt, allowing all");
                Verdict::Rules(RobotsRules::allow_all())
            }
            Ok(response) => {
                warn!(domain = %domain, status = response.status, "robots.txt fetch failed");
                Verdict::Unavailable
            }
            Err(e) => {
                warn!(domain = %domain, error = %e, "robots.txt fetch failed");
                Verdict::Unavailable
            }
        };

        let ttl = match verdict {
            Verdict::Rules(_) => self.policy.ttl,
            Verdict::Unavailable => {
                if self.policy.fail_policy == FailPolicy::Open {
                    warn!(domain = %domain, "robots.txt unavailable, failing open");
                }
                self.policy.failure_ttl
            }
        };

        CacheEntry {
            verdict,
            expires_at: Instant::now() + ttl,
        }
    }
}
