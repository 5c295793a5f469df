//! Core error types shared by every shelfscan crate.

use thiserror::Error;

/// Central error type for core operations (validation, configuration, I/O).
#[derive(Error, Debug)]
pub enum ShelfscanError {
    /// Configuration errors (file loading, parsing, validation)
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors (invalid names, malformed records)
    #[error("validation error: {0}")]
    Validation(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to determine config directory path
    #[error("could not determine config directory (platform base directories not available)")]
    NoConfigDir,

    /// Failed to parse TOML
    #[error("failed to parse config TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Failed to serialize config
    #[error("failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    /// I/O error reading/writing config
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration value
    #[error("invalid config value for {field}: {reason}")]
    InvalidValue {
        /// Field name
        field: String,
        /// Reason for invalidity
        reason: String,
    },
}

/// Result type alias using `ShelfscanError`.
pub type Result<T> = std::result::Result<T, ShelfscanError>;

/// Result type alias for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ShelfscanError::Validation("empty title".to_string());
        assert_eq!(err.to_string(), "validation error: empty title");

        let err = ConfigError::InvalidValue {
            field: "rate_limit.min_delay_ms".to_string(),
            reason: "greater than max_delay_ms".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid config value for rate_limit.min_delay_ms: greater than max_delay_ms"
        );
    }

    #[test]
    fn test_error_from_config() {
        let err: ShelfscanError = ConfigError::NoConfigDir.into();
        assert!(matches!(err, ShelfscanError::Config(_)));
    }
}
