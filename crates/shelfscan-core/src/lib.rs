//! Shelfscan Core - foundation crate for the shelfscan retail scraper framework.
//!
//! This crate provides the product record every source emits, shared newtypes,
//! error handling and configuration management that the other crates depend on.
//!
//! # Modules
//!
//! - [`error`] - Central error types using thiserror
//! - [`config`] - TOML-based configuration with platform paths
//! - [`types`] - Shared newtypes (`SourceName`, `Category`, `Timestamp`)
//! - [`product`] - `ProductRecord` and exact `Price`
//!
//! # Example
//!
//! ```rust
//! use shelfscan_core::{Price, ProductRecord, SourceName};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let record = ProductRecord::new(
//!     "USB-C Cable",
//!     "https://www.example.com/p/1",
//!     SourceName::new("example")?,
//! )
//! .with_price(Price::parse("9.99"))
//! .with_stock(true);
//!
//! record.validate()?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod config;
pub mod error;
pub mod product;
pub mod types;

// Re-export commonly used types
pub use config::{
    AppConfig, ComplianceConfig, FailPolicy, RateLimitConfig, RegistryConfig, ScrapingConfig,
};
pub use error::{ConfigError, ConfigResult, Result, ShelfscanError};
pub use product::{Identifiers, Price, ProductRecord};
pub use types::{Category, SourceName, Timestamp};
