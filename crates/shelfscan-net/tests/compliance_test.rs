use async_trait::async_trait;
use shelfscan_core::FailPolicy;
use shelfscan_net::{
    ComplianceChecker, CompliancePolicy, FetchRequest, FetchResponse, HttpTransport, NetError,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Clone)]
enum Reply {
    Status(u16, &'static str),
    Timeout,
}

/// Serves canned robots.txt replies and counts requests per URL.
struct RobotsServer {
    replies: Mutex<HashMap<String, Reply>>,
    calls: AtomicUsize,
    latency: Duration,
}

impl RobotsServer {
    fn new() -> Self {
        Self {
            replies: Mutex::new(HashMap::new()),
            calls: AtomicUsize::new(0),
            latency: Duration::ZERO,
        }
    }

    fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    fn reply(self, domain: &str, reply: Reply) -> Self {
        self.set(domain, reply);
        self
    }

    fn set(&self, domain: &str, reply: Reply) {
        self.replies
            .lock()
            .unwrap()
            .insert(format!("https://{domain}/robots.txt"), reply);
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HttpTransport for RobotsServer {
    async fn fetch(&self, request: FetchRequest) -> shelfscan_net::Result<FetchResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let reply = self.replies.lock().unwrap().get(&request.url).cloned();
        match reply {
            Some(Reply::Status(status, body)) => Ok(FetchResponse::new(request.url, status, body)),
            Some(Reply::Timeout) => Err(NetError::Timeout { url: request.url }),
            None => Ok(FetchResponse::new(request.url, 404, "")),
        }
    }
}

const ROBOTS: &str = "User-agent: *\nDisallow: /checkout\nAllow: /\n";

fn checker(server: &Arc<RobotsServer>, fail_policy: FailPolicy) -> ComplianceChecker {
    let policy = CompliancePolicy {
        fail_policy,
        ..CompliancePolicy::default()
    };
    ComplianceChecker::new(server.clone(), policy)
}

#[tokio::test(start_paused = true)]
async fn test_rules_fetched_once_within_ttl() {
    let server = Arc::new(RobotsServer::new().reply("www.target.com", Reply::Status(200, ROBOTS)));
    let checker = checker(&server, FailPolicy::Closed);

    assert!(checker.is_allowed("www.target.com", "/s?searchTerm=mouse").await);
    assert!(!checker.is_allowed("www.target.com", "/checkout").await);
    assert!(checker.is_allowed("WWW.TARGET.COM", "/p/item").await);

    assert_eq!(server.calls(), 1);
    assert_eq!(checker.cached_domains(), vec!["www.target.com".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_rules_refetched_after_ttl() {
    let server = Arc::new(RobotsServer::new().reply("www.target.com", Reply::Status(200, ROBOTS)));
    let checker = checker(&server, FailPolicy::Closed);

    assert!(checker.is_allowed("www.target.com", "/").await);
    tokio::time::advance(Duration::from_secs(24 * 60 * 60 + 1)).await;
    assert!(checker.cached_domains().is_empty());

    assert!(checker.is_allowed("www.target.com", "/").await);
    assert_eq!(server.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_checks_share_one_fetch() {
    let server = Arc::new(
        RobotsServer::new()
            .with_latency(Duration::from_millis(200))
            .reply("www.bestbuy.com", Reply::Status(200, ROBOTS)),
    );
    let checker = Arc::new(checker(&server, FailPolicy::Closed));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let checker = Arc::clone(&checker);
            tokio::spawn(async move {
                checker
                    .is_allowed("www.bestbuy.com", &format!("/site/{i}"))
                    .await
            })
        })
        .collect();

    for handle in handles {
        assert!(handle.await.unwrap());
    }
    assert_eq!(server.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_server_error_fails_closed() {
    let server = Arc::new(
        RobotsServer::new().reply("www.walmart.com", Reply::Status(503, "Service Unavailable")),
    );
    let checker = checker(&server, FailPolicy::Closed);

    assert!(!checker.is_allowed("www.walmart.com", "/search?q=mouse").await);
    assert!(!checker.is_allowed("www.walmart.com", "/").await);
    assert_eq!(server.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_transport_failure_fails_open_when_configured() {
    let server = Arc::new(RobotsServer::new().reply("www.newegg.com", Reply::Timeout));
    let checker = checker(&server, FailPolicy::Open);

    assert!(checker.is_allowed("www.newegg.com", "/p/pl?d=mouse").await);
}

#[tokio::test(start_paused = true)]
async fn test_failure_retried_after_failure_ttl() {
    let server = Arc::new(RobotsServer::new().reply("www.walmart.com", Reply::Timeout));
    let checker = checker(&server, FailPolicy::Closed);

    assert!(!checker.is_allowed("www.walmart.com", "/").await);

    server.set("www.walmart.com", Reply::Status(200, ROBOTS));
    tokio::time::advance(Duration::from_secs(60)).await;
    assert!(!checker.is_allowed("www.walmart.com", "/").await);
    assert_eq!(server.calls(), 1);

    tokio::time::advance(Duration::from_secs(600)).await;
    assert!(checker.is_allowed("www.walmart.com", "/").await);
    assert_eq!(server.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_missing_robots_allows_all() {
    let server = Arc::new(RobotsServer::new());
    let checker = checker(&server, FailPolicy::Closed);

    assert!(checker.is_allowed("shop.example.com", "/anything").await);
}

#[tokio::test(start_paused = true)]
async fn test_html_body_treated_as_failure() {
    let server = Arc::new(RobotsServer::new().reply(
        "www.target.com",
        Reply::Status(200, "<html><body>Access Denied</body></html>"),
    ));
    let checker = checker(&server, FailPolicy::Closed);

    assert!(!checker.is_allowed("www.target.com", "/").await);
}

#[tokio::test(start_paused = true)]
async fn test_invalidate_forces_refetch() {
    let server = Arc::new(RobotsServer::new().reply("www.target.com", Reply::Status(200, ROBOTS)));
    let checker = checker(&server, FailPolicy::Closed);

    assert!(checker.is_allowed("www.target.com", "/").await);
    assert!(checker.invalidate("www.target.com"));
    assert!(!checker.invalidate("www.target.com"));

    assert!(checker.is_allowed("www.target.com", "/").await);
    assert_eq!(server.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_url_check() {
    let server = Arc::new(RobotsServer::new().reply("www.target.com", Reply::Status(200, ROBOTS)));
    let checker = checker(&server, FailPolicy::Closed);

    assert!(checker
        .is_url_allowed("https://www.target.com/s?searchTerm=mouse")
        .await
        .unwrap());
    assert!(!checker
        .is_url_allowed("https://www.target.com/checkout")
        .await
        .unwrap());
    assert!(checker.is_url_allowed("not a url").await.is_err());
}
