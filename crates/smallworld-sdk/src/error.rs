//! Error types for the graph gateway

use thiserror::Error;

/// Errors raised by a [`GraphGateway`](crate::GraphGateway) or one of its sessions
#[derive(Error, Debug)]
pub enum GatewayError {
    /// The store could not be reached
    #[error("Connection error: {0}")]
    Connection(String),

    /// The store rejected the credentials
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// The store ran the statement and reported a failure
    #[error("Store error {code}: {message}")]
    Store { code: String, message: String },

    /// The session was already closed
    #[error("Session is closed")]
    SessionClosed,

    /// The store answered with something we could not interpret
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl GatewayError {
    /// Build a store error from a status code and message
    pub fn store(code: impl Into<String>, message: impl Into<String>) -> Self {
        GatewayError::Store {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Whether a managed transaction may retry after this error.
    ///
    /// Transient store codes (`Neo.TransientError.*`), unreachable stores and
    /// timed out requests are retryable; everything else is surfaced as-is.
    pub fn is_transient(&self) -> bool {
        match self {
            GatewayError::Store { code, .. } => code.starts_with("Neo.TransientError."),
            GatewayError::Connection(_) => true,
            GatewayError::Http(e) => {
                e.is_connect()
                    || e.is_timeout()
                    || e.status().map(|s| s.is_server_error()).unwrap_or(false)
            }
            _ => false,
        }
    }

    /// Whether this error means the store itself is unusable (bad address, bad credentials)
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            GatewayError::Connection(_) | GatewayError::Authentication(_) | GatewayError::Http(_)
        )
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(GatewayError::store("Neo.TransientError.Transaction.DeadlockDetected", "deadlock").is_transient());
        assert!(GatewayError::Connection("refused".to_string()).is_transient());
        assert!(!GatewayError::store("Neo.ClientError.Statement.SyntaxError", "bad").is_transient());
        assert!(!GatewayError::SessionClosed.is_transient());
        assert!(!GatewayError::Authentication("denied".to_string()).is_transient());
    }

    #[test]
    fn test_transport_classification() {
        assert!(GatewayError::Authentication("denied".to_string()).is_transport());
        assert!(!GatewayError::store("Neo.ClientError.Statement.SyntaxError", "bad").is_transport());
    }
}
