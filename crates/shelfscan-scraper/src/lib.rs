//! Shelfscan Scraper - the uniform contract behind every retail source.
//!
//! A source either implements [`ProductScraper`] directly or supplies
//! [`SiteAdapter`] parsing hooks and is wrapped in a [`SiteScraper`]. Either
//! way every network call goes through [`ScrapeContext::fetch_page`], which
//! enforces the robots.txt gate, per-domain rate limiting, session headers,
//! retry with exponential backoff and anti-bot detection.
//!
//! # Example
//!
//! ```rust,no_run
//! use shelfscan_core::{AppConfig, SourceName};
//! use shelfscan_net::ReqwestTransport;
//! use shelfscan_scraper::sources::BestBuyAdapter;
//! use shelfscan_scraper::{ProductScraper, ScrapeContext, SiteScraper};
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let context = ScrapeContext::from_config(&AppConfig::default(), Arc::new(ReqwestTransport::new()?));
//! let scraper = SiteScraper::new(BestBuyAdapter::new(SourceName::new("bestbuy")?), context);
//!
//! for record in scraper.search("wireless mouse").await? {
//!     println!("{} {:?}", record.title, record.price);
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

#[allow(missing_docs)]
pub mod context;
pub mod contract;
#[allow(missing_docs)]
pub mod error;
#[allow(missing_docs)]
pub mod extract;
#[allow(missing_docs)]
pub mod sources;

// Re-export commonly used types
pub use context::{Page, RetryPolicy, ScrapeContext, SearchLimits};
pub use contract::{Listing, ProductScraper, SiteAdapter, SiteScraper};
pub use error::{ErrorKind, Result, ScrapeError, SourceError};
