//! Exchange Transport Trait
//!
//! The transport moves an already-encoded envelope to the exchange and hands
//! back the raw response body. Beyond recognizing a SOAP fault on an error
//! status it knows nothing about payload semantics. It never retries: a retry
//! is a new order attempt with a new reference number.

use async_trait::async_trait;
use thiserror::Error;
use zeroize::Zeroizing;

/// Errors raised while talking to the exchange
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TransportError {
    #[error("Request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Circuit breaker open, exchange calls suspended")]
    CircuitOpen,

    #[error("Unexpected HTTP status {status}")]
    HttpStatus { status: u16 },

    /// Error status whose body is a SOAP fault; the exchange processed and
    /// refused the request
    #[error("Exchange returned a SOAP fault (HTTP {status}): {reason}")]
    Fault { status: u16, reason: String },

    #[error("Request failed: {0}")]
    Request(String),
}

impl TransportError {
    /// Failures where the exchange may never have seen the request
    pub fn is_transient(&self) -> bool {
        match self {
            TransportError::Timeout { .. }
            | TransportError::Connection(_)
            | TransportError::CircuitOpen
            | TransportError::Request(_) => true,
            TransportError::HttpStatus { status } => {
                *status == 408 || *status == 429 || *status >= 500
            }
            TransportError::Fault { .. } => false,
        }
    }
}

/// One outbound call. The envelope may carry a session token or password,
/// so it is wiped on drop.
pub struct ExchangeRequest {
    /// Operation-specific action identifier attached to the request
    pub action: String,
    /// Short operation name, used only for logging
    pub operation: &'static str,
    pub envelope: Zeroizing<String>,
}

impl std::fmt::Debug for ExchangeRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExchangeRequest")
            .field("action", &self.action)
            .field("operation", &self.operation)
            .field("envelope_len", &self.envelope.len())
            .finish()
    }
}

#[async_trait]
pub trait ExchangeTransport: Send + Sync {
    /// Send the envelope and return the raw response body
    async fn send(&self, request: ExchangeRequest) -> Result<String, TransportError>;
}
