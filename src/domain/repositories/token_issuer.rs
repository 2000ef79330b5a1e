//! Session token issuance seam

use super::credential_store::CredentialError;
use super::exchange_transport::TransportError;
use crate::domain::entities::credentials::BrokerCredentials;
use async_trait::async_trait;
use thiserror::Error;
use zeroize::Zeroizing;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum TokenError {
    #[error("Exchange refused session token ({code}): {message}")]
    Rejected { code: String, message: String },

    #[error("Token request failed: {0}")]
    Transport(#[from] TransportError),

    #[error("Token response unreadable: {0}")]
    Malformed(String),

    #[error(transparent)]
    Credential(#[from] CredentialError),
}

#[async_trait]
pub trait TokenIssuer: Send + Sync {
    /// Obtain a fresh order-entry token. Side-effect free on the exchange
    /// beyond invalidating older tokens, so concurrent calls are safe.
    async fn issue(&self, credentials: &BrokerCredentials) -> Result<Zeroizing<String>, TokenError>;
}
