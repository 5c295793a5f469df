//! Reusable per-domain request context: identity, base headers, cookies.

use crate::identity::Identity;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use tracing::debug;

/// Request context for one domain, shared by every scraper targeting it.
#[derive(Debug)]
pub struct Session {
    domain: String,
    identity: RwLock<Identity>,
    cookies: Mutex<BTreeMap<String, String>>,
    requests: AtomicU64,
}

impl Session {
    fn new(domain: &str) -> Self {
        Self {
            domain: domain.to_string(),
            identity: RwLock::new(Identity::randomized()),
            cookies: Mutex::new(BTreeMap::new()),
            requests: AtomicU64::new(0),
        }
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn identity(&self) -> Identity {
        self.identity
            .read()
            .expect("acquire read lock on identity")
            .clone()
    }

    /// Headers for the next request, including stored cookies.
    pub fn request_headers(&self) -> Vec<(String, String)> {
        self.requests.fetch_add(1, Ordering::Relaxed);
        let identity = self.identity();

        let mut headers = vec![
            ("User-Agent".to_string(), identity.user_agent),
            (
                "Accept".to_string(),
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8".to_string(),
            ),
            ("Accept-Language".to_string(), identity.accept_language),
            ("Referer".to_string(), format!("https://{}/", self.domain)),
            ("Upgrade-Insecure-Requests".to_string(), "1".to_string()),
            ("DNT".to_string(), "1".to_string()),
        ];

        let cookies = self.cookies.lock().expect("acquire cookie jar lock");
        if !cookies.is_empty() {
            let header = cookies
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join("; ");
            headers.push(("Cookie".to_string(), header));
        }

        headers
    }

    /// Record `Set-Cookie` values from a response.
    pub fn store_cookies(&self, set_cookies: &[String]) {
        if set_cookies.is_empty() {
            return;
        }
        let mut cookies = self.cookies.lock().expect("acquire cookie jar lock");
        for raw in set_cookies {
            let pair = raw.split(';').next().unwrap_or_default();
            if let Some((name, value)) = pair.split_once('=') {
                let name = name.trim();
                if !name.is_empty() {
                    cookies.insert(name.to_string(), value.trim().to_string());
                }
            }
        }
    }

    /// Switch to a different identity and forget cookies tied to the old one.
    pub fn rotate_identity(&self) {
        let mut identity = self.identity.write().expect("acquire write lock on identity");
        let next = identity.rotated();
        *identity = next;
        self.cookies.lock().expect("acquire cookie jar lock").clear();
        debug!(domain = %self.domain, "rotated session identity");
    }

    pub fn cookie_count(&self) -> usize {
        self.cookies.lock().expect("acquire cookie jar lock").len()
    }

    pub fn request_count(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }
}

/// Lazily creates and caches one [`Session`] per domain.
#[derive(Debug, Default)]
pub struct SessionManager {
    sessions: RwLock<HashMap<String, Arc<Session>>>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Session for `domain`, created on first use.
    pub fn session_for(&self, domain: &str) -> Arc<Session> {
        if let Some(session) = self
            .sessions
            .read()
            .expect("acquire read lock on sessions")
            .get(domain)
        {
            return Arc::clone(session);
        }

        let mut sessions = self.sessions.write().expect("acquire write lock on sessions");
        Arc::clone(sessions.entry(domain.to_string()).or_insert_with(|| {
            debug!(domain = %domain, "created session");
            Arc::new(Session::new(domain))
        }))
    }

    /// Rotate the identity of an existing session. Returns `false` if none exists.
    pub fn rotate_identity(&self, domain: &str) -> bool {
        let session = self
            .sessions
            .read()
            .expect("acquire read lock on sessions")
            .get(domain)
            .cloned();

        match session {
            Some(session) => {
                session.rotate_identity();
                true
            }
            None => false,
        }
    }

    /// Discard a domain's session; the next request starts fresh.
    pub fn reset(&self, domain: &str) -> bool {
        self.sessions
            .write()
            .expect("acquire write lock on sessions")
            .remove(domain)
            .is_some()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().expect("acquire read lock on sessions").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
