//! Credential vault seam. Implementations decrypt on demand and must not
//! cache plaintext between calls.

use crate::domain::entities::credentials::BrokerCredentials;
use crate::domain::errors::GatewayError;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum CredentialError {
    #[error("No broker credentials configured for advisor {0}")]
    NotConfigured(String),

    #[error("Broker credentials for advisor {0} are inactive")]
    Inactive(String),

    #[error("Failed to decrypt broker credentials: {0}")]
    Decryption(String),

    #[error("Credential storage error: {0}")]
    Storage(String),
}

impl From<CredentialError> for GatewayError {
    fn from(error: CredentialError) -> Self {
        GatewayError::Credential(error.to_string())
    }
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Load and decrypt the advisor's broker credentials
    async fn decrypted(&self, advisor_id: &str) -> Result<BrokerCredentials, CredentialError>;
}
