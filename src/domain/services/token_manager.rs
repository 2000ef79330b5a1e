//! Per-advisor session token cache.
//!
//! Tokens are fetched lazily and replaced once they come within the refresh
//! skew of expiry. The cache lock is never held across the network call, so
//! concurrent requests for the same advisor may each refresh; the last write
//! wins and every caller still gets a valid token.

use crate::domain::entities::credentials::SessionToken;
use crate::domain::repositories::credential_store::CredentialStore;
use crate::domain::repositories::token_issuer::{TokenError, TokenIssuer};
use chrono::{Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy)]
pub struct TokenPolicy {
    pub ttl: Duration,
    pub refresh_skew: Duration,
}

impl Default for TokenPolicy {
    fn default() -> Self {
        Self {
            ttl: Duration::seconds(3600),
            refresh_skew: Duration::seconds(300),
        }
    }
}

pub struct AuthTokenManager {
    credentials: Arc<dyn CredentialStore>,
    issuer: Arc<dyn TokenIssuer>,
    policy: TokenPolicy,
    cache: RwLock<HashMap<String, SessionToken>>,
}

impl AuthTokenManager {
    pub fn new(
        credentials: Arc<dyn CredentialStore>,
        issuer: Arc<dyn TokenIssuer>,
        policy: TokenPolicy,
    ) -> Self {
        Self {
            credentials,
            issuer,
            policy,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Valid token for the advisor, issuing a new one when absent or stale
    pub async fn token_for(&self, advisor_id: &str) -> Result<SessionToken, TokenError> {
        let now = Utc::now();
        {
            let cache = self.cache.read().await;
            if let Some(token) = cache.get(advisor_id) {
                if !token.is_expired(now, self.policy.refresh_skew) {
                    debug!("Using cached session token for advisor {}", advisor_id);
                    return Ok(token.clone());
                }
            }
        }

        // Plaintext credentials live only for the duration of the issue call
        let credentials = self.credentials.decrypted(advisor_id).await?;
        let value = self.issuer.issue(&credentials).await?;
        drop(credentials);

        let token = SessionToken::new(value, Utc::now() + self.policy.ttl);
        info!(
            "Issued session token for advisor {} (expires {})",
            advisor_id,
            token.expires_at()
        );

        self.cache
            .write()
            .await
            .insert(advisor_id.to_string(), token.clone());
        Ok(token)
    }

    /// Drop the cached token so the next call issues a fresh one
    pub async fn invalidate(&self, advisor_id: &str) {
        if self.cache.write().await.remove(advisor_id).is_some() {
            info!("Invalidated session token for advisor {}", advisor_id);
        }
    }
}
