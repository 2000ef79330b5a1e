//! Advisor/client ownership table

use super::DbPool;
use crate::domain::repositories::client_directory::ClientDirectory;
use crate::domain::repositories::order_repository::RepositoryError;
use async_trait::async_trait;
use tracing::{debug, error};

pub struct SqliteClientDirectory {
    pool: DbPool,
}

impl SqliteClientDirectory {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Assign `client_id` to `advisor_id`, replacing any previous owner
    pub async fn register_client(
        &self,
        client_id: &str,
        advisor_id: &str,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO advisor_clients (client_id, advisor_id)
            VALUES (?1, ?2)
            ON CONFLICT(client_id) DO UPDATE SET advisor_id = excluded.advisor_id
            "#,
        )
        .bind(client_id)
        .bind(advisor_id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to register client {}: {}", client_id, e);
            RepositoryError::Storage(format!("Failed to register client: {}", e))
        })?;

        debug!("Client {} assigned to advisor {}", client_id, advisor_id);
        Ok(())
    }
}

#[async_trait]
impl ClientDirectory for SqliteClientDirectory {
    async fn is_owned_by(&self, client_id: &str, advisor_id: &str) -> Result<bool, RepositoryError> {
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM advisor_clients WHERE client_id = ?1 AND advisor_id = ?2",
        )
        .bind(client_id)
        .bind(advisor_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to check ownership of client {}: {}", client_id, e);
            RepositoryError::Storage(format!("Failed to check client ownership: {}", e))
        })?;

        Ok(count.0 > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::{init_database, DatabaseConfig};

    #[tokio::test]
    async fn test_ownership() {
        let pool = init_database(&DatabaseConfig::in_memory()).await.unwrap();
        let directory = SqliteClientDirectory::new(pool);

        directory.register_client("c-1", "adv-1").await.unwrap();

        assert!(directory.is_owned_by("c-1", "adv-1").await.unwrap());
        assert!(!directory.is_owned_by("c-1", "adv-2").await.unwrap());
        assert!(!directory.is_owned_by("c-9", "adv-1").await.unwrap());
    }

    #[tokio::test]
    async fn test_reassignment() {
        let pool = init_database(&DatabaseConfig::in_memory()).await.unwrap();
        let directory = SqliteClientDirectory::new(pool);

        directory.register_client("c-1", "adv-1").await.unwrap();
        directory.register_client("c-1", "adv-2").await.unwrap();

        assert!(!directory.is_owned_by("c-1", "adv-1").await.unwrap());
        assert!(directory.is_owned_by("c-1", "adv-2").await.unwrap());
    }
}
