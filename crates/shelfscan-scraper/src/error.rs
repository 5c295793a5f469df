use serde::{Deserialize, Serialize};
use shelfscan_net::NetError;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ScrapeError {
    #[error("robots.txt disallows {url}")]
    ComplianceDenied { url: String },

    #[error("request timed out after {attempts} attempt(s): {url}")]
    NetworkTimeout { url: String, attempts: u32 },

    #[error("network error for {url}: {message}")]
    Network { url: String, message: String },

    #[error("HTTP {status} from {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("failed to parse {field} from {url}: {reason}")]
    Parse {
        field: String,
        url: String,
        reason: String,
    },

    #[error("anti-bot challenge at {url} ({indicator})")]
    AntiBotBlocked { url: String, indicator: String },

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

pub type Result<T> = std::result::Result<T, ScrapeError>;

impl ScrapeError {
    pub fn parse(field: impl Into<String>, url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Parse {
            field: field.into(),
            url: url.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn from_net(url: &str, error: NetError, attempts: u32) -> Self {
        match error {
            NetError::Timeout { .. } => Self::NetworkTimeout {
                url: url.to_string(),
                attempts,
            },
            NetError::InvalidUrl(message) => Self::InvalidUrl(message),
            other => Self::Network {
                url: url.to_string(),
                message: other.to_string(),
            },
        }
    }

    /// Transient failures worth another attempt: timeouts, transport errors,
    /// server errors and HTTP 429.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::NetworkTimeout { .. } | Self::Network { .. } => true,
            Self::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// The page does not exist (HTTP 404 or 410).
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::HttpStatus { status: 404 | 410, .. })
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ComplianceDenied { .. } => ErrorKind::ComplianceDenied,
            Self::NetworkTimeout { .. } => ErrorKind::NetworkTimeout,
            Self::Network { .. } => ErrorKind::NetworkError,
            Self::HttpStatus { .. } => ErrorKind::HttpStatus,
            Self::Parse { .. } => ErrorKind::ParseError,
            Self::AntiBotBlocked { .. } => ErrorKind::AntiBotBlocked,
            Self::InvalidUrl(_) => ErrorKind::InvalidUrl,
        }
    }
}

/// Machine-readable failure category carried in batch results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ComplianceDenied,
    NetworkTimeout,
    NetworkError,
    HttpStatus,
    ParseError,
    AntiBotBlocked,
    InvalidUrl,
    /// The per-source deadline expired
    Timeout,
    /// The scraper panicked
    Panicked,
    /// The source is registered but disabled
    Disabled,
}

impl ErrorKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ComplianceDenied => "compliance_denied",
            Self::NetworkTimeout => "network_timeout",
            Self::NetworkError => "network_error",
            Self::HttpStatus => "http_status",
            Self::ParseError => "parse_error",
            Self::AntiBotBlocked => "anti_bot_blocked",
            Self::InvalidUrl => "invalid_url",
            Self::Timeout => "timeout",
            Self::Panicked => "panicked",
            Self::Disabled => "disabled",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed, serializable failure description for one source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceError {
    pub kind: ErrorKind,
    pub message: String,
}

impl SourceError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl From<&ScrapeError> for SourceError {
    fn from(error: &ScrapeError) -> Self {
        Self::new(error.kind(), error.to_string())
    }
}

impl From<ScrapeError> for SourceError {
    fn from(error: ScrapeError) -> Self {
        Self::from(&error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        let timeout = ScrapeError::NetworkTimeout {
            url: "https://www.target.com".to_string(),
            attempts: 1,
        };
        assert!(timeout.is_retryable());

        let server = ScrapeError::HttpStatus {
            url: "https://www.target.com".to_string(),
            status: 503,
        };
        assert!(server.is_retryable());

        let throttled = ScrapeError::HttpStatus {
            url: "https://www.target.com".to_string(),
            status: 429,
        };
        assert!(throttled.is_retryable());

        let gone = ScrapeError::HttpStatus {
            url: "https://www.target.com".to_string(),
            status: 410,
        };
        assert!(!gone.is_retryable());
        assert!(gone.is_not_found());

        let parse = ScrapeError::parse("price", "https://www.target.com", "no price node");
        assert!(!parse.is_retryable());

        let denied = ScrapeError::ComplianceDenied {
            url: "https://www.target.com/checkout".to_string(),
        };
        assert!(!denied.is_retryable());
    }

    #[test]
    fn test_from_net_error() {
        let err = ScrapeError::from_net(
            "https://www.bestbuy.com",
            NetError::Timeout {
                url: "https://www.bestbuy.com".to_string(),
            },
            3,
        );
        assert!(matches!(err, ScrapeError::NetworkTimeout { attempts: 3, .. }));

        let err = ScrapeError::from_net(
            "https://www.bestbuy.com",
            NetError::Connection {
                url: "https://www.bestbuy.com".to_string(),
                message: "reset".to_string(),
            },
            1,
        );
        assert_eq!(err.kind(), ErrorKind::NetworkError);
    }

    #[test]
    fn test_source_error_serialization() {
        let error = SourceError::from(ScrapeError::parse(
            "product cards",
            "https://www.newegg.com/p/pl?d=mouse",
            "layout changed",
        ));
        assert_eq!(error.kind, ErrorKind::ParseError);

        let json = serde_json::to_value(&error).unwrap();
        assert_eq!(json["kind"], "parse_error");
        assert!(json["message"].as_str().unwrap().contains("product cards"));

        let back: SourceError = serde_json::from_value(json).unwrap();
        assert_eq!(back, error);
    }

    #[test]
    fn test_kind_display_matches_serde() {
        for kind in [
            ErrorKind::ComplianceDenied,
            ErrorKind::AntiBotBlocked,
            ErrorKind::Timeout,
            ErrorKind::Panicked,
            ErrorKind::Disabled,
        ] {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{kind}\""));
        }
    }
}
