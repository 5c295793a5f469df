//! Network plumbing shared by every scraper.
//!
//! Provides the injectable HTTP transport, the robots.txt compliance gate,
//! per-domain rate limiting and reusable sessions with rotating identities.

pub mod compliance;
pub mod error;
pub mod identity;
pub mod rate_limit;
pub mod robots;
pub mod session;
pub mod transport;
pub mod urls;

pub use compliance::{ComplianceChecker, CompliancePolicy};
pub use error::{NetError, Result};
pub use identity::Identity;
pub use rate_limit::{RateLimitPolicy, RateLimiter};
pub use robots::RobotsRules;
pub use session::{Session, SessionManager};
pub use transport::{FetchRequest, FetchResponse, HttpTransport, ReqwestTransport};
pub use urls::{absolutize, extract_domain, request_target};
