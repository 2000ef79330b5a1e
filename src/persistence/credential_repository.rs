//! Encrypted broker credential vault.
//!
//! Passwords and pass keys are encrypted with the master key before they are
//! written and decrypted on every read. Nothing decrypted is kept on the
//! repository between calls.

use super::models::CredentialRecord;
use super::DbPool;
use crate::domain::entities::credentials::{BrokerCredentials, BrokerIdentity};
use crate::domain::repositories::credential_store::{CredentialError, CredentialStore};
use crate::secrets::SecretCipher;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub struct SqliteCredentialStore {
    pool: DbPool,
    cipher: Arc<SecretCipher>,
}

impl SqliteCredentialStore {
    pub fn new(pool: DbPool, cipher: Arc<SecretCipher>) -> Self {
        Self { pool, cipher }
    }

    /// Insert or replace an advisor's broker credentials
    pub async fn store_credentials(
        &self,
        identity: &BrokerIdentity,
        password: &str,
        pass_key: &str,
    ) -> Result<(), CredentialError> {
        let password_enc = self
            .cipher
            .encrypt(password)
            .map_err(|e| CredentialError::Storage(e.to_string()))?;
        let pass_key_enc = self
            .cipher
            .encrypt(pass_key)
            .map_err(|e| CredentialError::Storage(e.to_string()))?;
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO broker_credentials (
                advisor_id, member_id, user_id, arn, euin,
                password_enc, pass_key_enc, is_active, created_at, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 1, ?8, ?8)
            ON CONFLICT(advisor_id) DO UPDATE SET
                member_id = excluded.member_id,
                user_id = excluded.user_id,
                arn = excluded.arn,
                euin = excluded.euin,
                password_enc = excluded.password_enc,
                pass_key_enc = excluded.pass_key_enc,
                is_active = 1,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&identity.advisor_id)
        .bind(&identity.member_id)
        .bind(&identity.user_id)
        .bind(&identity.arn)
        .bind(&identity.euin)
        .bind(&password_enc)
        .bind(&pass_key_enc)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to store credentials for advisor {}: {}", identity.advisor_id, e);
            CredentialError::Storage(format!("Failed to store credentials: {}", e))
        })?;

        info!(
            "Stored broker credentials for advisor {} (member {})",
            identity.advisor_id, identity.member_id
        );
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for SqliteCredentialStore {
    async fn decrypted(&self, advisor_id: &str) -> Result<BrokerCredentials, CredentialError> {
        let record = sqlx::query_as::<_, CredentialRecord>(
            r#"
            SELECT advisor_id, member_id, user_id, arn, euin,
                   password_enc, pass_key_enc, is_active
            FROM broker_credentials
            WHERE advisor_id = ?1
            "#,
        )
        .bind(advisor_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to load credentials for advisor {}: {}", advisor_id, e);
            CredentialError::Storage(format!("Failed to load credentials: {}", e))
        })?
        .ok_or_else(|| CredentialError::NotConfigured(advisor_id.to_string()))?;

        if !record.is_active {
            warn!("Broker credentials for advisor {} are inactive", advisor_id);
            return Err(CredentialError::Inactive(advisor_id.to_string()));
        }

        let password = self.cipher.decrypt(&record.password_enc).map_err(|e| {
            error!("Password decryption failed for advisor {}", advisor_id);
            CredentialError::Decryption(e.to_string())
        })?;
        let pass_key = self.cipher.decrypt(&record.pass_key_enc).map_err(|e| {
            error!("Pass key decryption failed for advisor {}", advisor_id);
            CredentialError::Decryption(e.to_string())
        })?;

        debug!("Decrypted broker credentials for advisor {}", advisor_id);
        Ok(BrokerCredentials {
            identity: BrokerIdentity {
                advisor_id: record.advisor_id,
                member_id: record.member_id,
                user_id: record.user_id,
                arn: record.arn,
                euin: record.euin,
            },
            password,
            pass_key,
        })
    }
}
