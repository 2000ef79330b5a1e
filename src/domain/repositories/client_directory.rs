//! Ownership lookup against the externally-owned client directory

use super::order_repository::RepositoryError;
use async_trait::async_trait;

#[async_trait]
pub trait ClientDirectory: Send + Sync {
    /// True when `client_id` belongs to `advisor_id`
    async fn is_owned_by(&self, client_id: &str, advisor_id: &str) -> Result<bool, RepositoryError>;
}
