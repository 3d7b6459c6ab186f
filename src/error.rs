//! Unified error types for Apiary

use thiserror::Error;

/// Unified Result type
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for Apiary
#[derive(Error, Debug)]
pub enum Error {
    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Transport errors (broker unreachable, connection refused, reset)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Broker response deadline missed
    #[error("Broker timeout: {0}")]
    BrokerTimeout(String),

    /// Broker protocol errors (malformed command or reply)
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// No free browser of the requested type in the pool
    #[error("No browsers available: {0}")]
    NoBrowsersAvailable(String),

    /// An action was attempted without holding a lease
    #[error("Session not acquired")]
    SessionNotAcquired,

    /// A remote assertion reported failure
    #[error("Assertion failed: {0}")]
    AssertionFailed(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new configuration error
    pub fn configuration<S: Into<String>>(msg: S) -> Self {
        Error::Configuration(msg.into())
    }

    /// Create a new transport error
    pub fn transport<S: Into<String>>(msg: S) -> Self {
        Error::Transport(msg.into())
    }

    /// Create a new broker timeout error
    pub fn broker_timeout<S: Into<String>>(msg: S) -> Self {
        Error::BrokerTimeout(msg.into())
    }

    /// Create a new protocol error
    pub fn protocol<S: Into<String>>(msg: S) -> Self {
        Error::Protocol(msg.into())
    }

    /// Create a new no-browsers-available error
    pub fn no_browsers<S: Into<String>>(browser_type: S) -> Self {
        Error::NoBrowsersAvailable(browser_type.into())
    }

    /// Create a new assertion-failed error
    pub fn assertion_failed<S: Into<String>>(msg: S) -> Self {
        Error::AssertionFailed(msg.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Error::Internal(msg.into())
    }

    /// Whether a failed broker operation may be retried.
    ///
    /// Only connection-level faults and missed response deadlines qualify.
    /// Everything else (malformed calls, allocation misses, state errors)
    /// propagates on the first attempt.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Transport(_) | Error::BrokerTimeout(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(Error::transport("connection refused").is_transient());
        assert!(Error::broker_timeout("no reply in 5s").is_transient());

        assert!(!Error::protocol("ERR unknown command").is_transient());
        assert!(!Error::no_browsers("chrome").is_transient());
        assert!(!Error::SessionNotAcquired.is_transient());
        assert!(!Error::configuration("missing broker address").is_transient());
    }

    #[test]
    fn test_error_display() {
        let err = Error::no_browsers("firefox");
        assert_eq!(err.to_string(), "No browsers available: firefox");

        let err = Error::SessionNotAcquired;
        assert_eq!(err.to_string(), "Session not acquired");
    }
}
