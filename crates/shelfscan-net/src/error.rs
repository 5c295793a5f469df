use thiserror::Error;

pub type Result<T> = std::result::Result<T, NetError>;

#[derive(Debug, Error)]
pub enum NetError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("request timed out: {url}")]
    Timeout { url: String },

    #[error("request to {url} failed: {message}")]
    Connection { url: String, message: String },

    #[error("HTTP client error: {0}")]
    Client(String),

    #[error("robots.txt is not a rules file: {0}")]
    MalformedRobots(String),
}

impl NetError {
    /// Whether the failure was the request deadline expiring.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}
