//! Error handling

use std::fmt;

/// Startup and setup errors for the alien ceramics generator.
#[derive(Debug)]
pub enum CeramicsError {
    /// Missing or malformed credential, or an unusable setting
    Configuration(String),
    /// The image API could not be reached or handshaken with
    Connection(String),
    /// A vocabulary or color table failed to load
    Vocabulary(String),
    /// Filesystem failures (directories, journal)
    Io(std::io::Error),
}

impl fmt::Display for CeramicsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration(msg) => write!(f, "Configuration error: {msg}"),
            Self::Connection(msg) => write!(f, "Connection error: {msg}"),
            Self::Vocabulary(msg) => write!(f, "Vocabulary error: {msg}"),
            Self::Io(err) => write!(f, "I/O error: {err}"),
        }
    }
}

impl std::error::Error for CeramicsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for CeramicsError {
    fn from(err: std::io::Error) -> Self {
        CeramicsError::Io(err)
    }
}

impl From<serde_json::Error> for CeramicsError {
    fn from(err: serde_json::Error) -> Self {
        CeramicsError::Vocabulary(err.to_string())
    }
}

impl From<url::ParseError> for CeramicsError {
    fn from(err: url::ParseError) -> Self {
        CeramicsError::Configuration(format!("invalid API URL: {err}"))
    }
}

/// Failures reported by an image generation client for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    /// The credential was rejected, nothing further will succeed
    Authentication(String),
    /// The service asked us to slow down
    RateLimited(String),
    /// Anything else that went wrong for this request
    Failed(String),
}

impl GenerationError {
    /// True when retrying the same request later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited(_))
    }
}

impl fmt::Display for GenerationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Authentication(msg) => write!(f, "Authentication failed: {msg}"),
            Self::RateLimited(msg) => write!(f, "Rate limit reached: {msg}"),
            Self::Failed(msg) => write!(f, "Generation failed: {msg}"),
        }
    }
}

impl std::error::Error for GenerationError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_rate_limits_are_retryable() {
        assert!(GenerationError::RateLimited("slow down".into()).is_retryable());
        assert!(!GenerationError::Authentication("nope".into()).is_retryable());
        assert!(!GenerationError::Failed("boom".into()).is_retryable());
    }

    #[test]
    fn io_errors_keep_their_source() {
        let err = CeramicsError::from(std::io::Error::other("disk full"));
        assert!(std::error::Error::source(&err).is_some());
        assert_eq!(err.to_string(), "I/O error: disk full");
    }
}
