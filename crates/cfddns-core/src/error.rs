//! Error types for the cfddns system
//!
//! Every failure is an [`Error`]. The engine asks [`Error::severity`] whether a
//! failure ends the process or only the current cycle.

use thiserror::Error;

/// Result type alias for cfddns operations
pub type Result<T> = std::result::Result<T, Error>;

/// How the reconciliation loop reacts to an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Logged at the loop boundary, followed by the normal sleep
    Recoverable,
    /// Ends the loop; the daemon exits
    Fatal,
}

/// Core error type for the cfddns system
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Credentials rejected by the provider (HTTP 404 on record lookup)
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Non-success HTTP status on record lookup
    #[error("HTTP error {status}: {body}")]
    HttpStatus {
        /// HTTP status code
        status: u16,
        /// Response body (may be empty)
        body: String,
    },

    /// Network-level failure on record lookup (DNS, connect, timeout, unreadable body)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Public IP lookup failed
    #[error("IP resolver error: {0}")]
    IpResolver(String),

    /// Provider call failed outside of record lookup
    #[error("Provider error ({provider}): {message}")]
    Provider {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
    },

    /// Settings file I/O
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create an HTTP status error
    pub fn http_status(status: u16, body: impl Into<String>) -> Self {
        Self::HttpStatus {
            status,
            body: body.into(),
        }
    }

    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create an IP resolver error
    pub fn ip_resolver(msg: impl Into<String>) -> Self {
        Self::IpResolver(msg.into())
    }

    /// Create a provider-specific error
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Classify this error for the reconciliation loop
    ///
    /// Only the record lookup produces [`Severity::Fatal`] errors
    /// (authentication, HTTP status, transport). Everything else is absorbed
    /// at the loop boundary.
    pub fn severity(&self) -> Severity {
        match self {
            Error::Authentication(_) | Error::HttpStatus { .. } | Error::Transport(_) => {
                Severity::Fatal
            }
            _ => Severity::Recoverable,
        }
    }

    /// Shorthand for `severity() == Severity::Fatal`
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}
