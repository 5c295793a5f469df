//! Error types for the registry.

use thiserror::Error;

/// Errors raised synchronously by registry operations.
///
/// Per-source scrape failures never surface here; they are recorded in the
/// batch result map instead.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// A source name that was never registered
    #[error("unknown source: {name}")]
    UnknownSource {
        /// The requested name
        name: String,
    },

    /// Registration rejected (malformed name or empty category)
    #[error("invalid registration: {0}")]
    InvalidRegistration(#[from] shelfscan_core::ShelfscanError),
}

/// Result type for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;
