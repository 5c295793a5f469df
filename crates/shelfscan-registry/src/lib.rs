//! Shelfscan Registry - the catalog that fans a query out across sources.
//!
//! Sources are registered by name and category with a factory; the registry
//! builds each scraper on first use and caches it. [`ScraperRegistry::batch_search`]
//! dispatches one search per selected source through a bounded worker pool,
//! isolates every failure (errors, deadline expiry, panics) into that
//! source's result entry, and keeps per-source success/failure counters.
//!
//! # Example
//!
//! ```rust,no_run
//! use shelfscan_core::AppConfig;
//! use shelfscan_net::ReqwestTransport;
//! use shelfscan_registry::ScraperRegistry;
//! use shelfscan_scraper::ScrapeContext;
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::default();
//! let context = ScrapeContext::from_config(&config, Arc::new(ReqwestTransport::new()?));
//! let registry = ScraperRegistry::with_default_sources(context, &config)?;
//!
//! let electronics = vec!["Electronics".to_string()];
//! let batch = registry
//!     .batch_search("wireless mouse", None, Some(electronics.as_slice()))
//!     .await?;
//! println!("{} records", batch.total_records());
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
pub mod batch;
mod catalog;
#[allow(missing_docs)]
pub mod descriptor;
pub mod error;
pub mod registry;
#[allow(missing_docs)]
pub mod selection;

// Re-export commonly used types
pub use batch::{BatchResults, SourceResult};
pub use descriptor::{ScraperFactory, SourceDescriptor, SourceStats};
pub use error::{RegistryError, Result};
pub use registry::ScraperRegistry;
pub use selection::SourceSelection;
