//! SQLite order store

use super::models::OrderRecord;
use super::{is_unique_violation, DbPool};
use crate::domain::entities::order::{NewOrder, Order, OrderFilter};
use crate::domain::repositories::order_repository::{
    OrderRepository, OrderTransition, RepositoryError,
};
use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, error};
use uuid::Uuid;

pub struct SqliteOrderRepository {
    pool: DbPool,
}

impl SqliteOrderRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn current_status(&self, order_id: &str) -> Result<Option<String>, RepositoryError> {
        let row: Option<(String,)> = sqlx::query_as("SELECT status FROM orders WHERE id = ?1")
            .bind(order_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                error!("Failed to read status of order {}: {}", order_id, e);
                RepositoryError::Storage(format!("Failed to read order status: {}", e))
            })?;
        Ok(row.map(|(status,)| status))
    }
}

#[async_trait]
impl OrderRepository for SqliteOrderRepository {
    async fn create(&self, order: NewOrder) -> Result<Order, RepositoryError> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        let record = sqlx::query_as::<_, OrderRecord>(
            r#"
            INSERT INTO orders (
                id, advisor_id, client_id, member_id, reference_number,
                order_type, trans_code, buy_sell, buy_sell_type,
                scheme_code, to_scheme_code, folio_number,
                amount, redemption_amount, units, all_units, redeem_date, remarks,
                status, created_at, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, 'CREATED', ?19, ?19)
            RETURNING *
            "#,
        )
        .bind(&id)
        .bind(&order.advisor_id)
        .bind(&order.client_id)
        .bind(&order.member_id)
        .bind(&order.reference_number)
        .bind(order.order_type.as_str())
        .bind(&order.trans_code)
        .bind(&order.buy_sell)
        .bind(&order.buy_sell_type)
        .bind(&order.scheme_code)
        .bind(&order.to_scheme_code)
        .bind(&order.folio_number)
        .bind(order.amount)
        .bind(order.redemption_amount)
        .bind(order.units)
        .bind(order.all_units)
        .bind(order.redeem_date)
        .bind(&order.remarks)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                return RepositoryError::DuplicateReference {
                    member_id: order.member_id.clone(),
                    reference_number: order.reference_number.clone(),
                };
            }
            error!("Failed to create order: {}", e);
            RepositoryError::Storage(format!("Failed to create order: {}", e))
        })?;

        debug!(
            "Created {} order {} with reference {}",
            record.order_type, record.id, record.reference_number
        );
        Order::try_from(record)
    }

    async fn transition(
        &self,
        order_id: &str,
        transition: OrderTransition,
    ) -> Result<Order, RepositoryError> {
        let now = Utc::now();
        let status = transition.target_status();
        let (exchange_order_number, response_code, message, submitted_at) = match transition {
            OrderTransition::Submitted {
                exchange_order_number,
                response_code,
                message,
            } => (exchange_order_number, response_code, message, Some(now)),
            OrderTransition::Rejected {
                response_code,
                message,
            } => (None, response_code, message, None),
        };

        let record = sqlx::query_as::<_, OrderRecord>(
            r#"
            UPDATE orders
            SET status = ?1, exchange_order_number = ?2, response_code = ?3,
                response_message = ?4, submitted_at = ?5, updated_at = ?6
            WHERE id = ?7 AND status = 'CREATED'
            RETURNING *
            "#,
        )
        .bind(status.as_str())
        .bind(&exchange_order_number)
        .bind(&response_code)
        .bind(&message)
        .bind(submitted_at)
        .bind(now)
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to move order {} to {}: {}", order_id, status, e);
            RepositoryError::Storage(format!("Failed to update order: {}", e))
        })?;

        match record {
            Some(record) => {
                debug!("Order {} is now {}", order_id, status);
                Order::try_from(record)
            }
            None => match self.current_status(order_id).await? {
                None => Err(RepositoryError::NotFound(order_id.to_string())),
                Some(_) => Err(RepositoryError::InvalidTransition {
                    order_id: order_id.to_string(),
                    to: status,
                }),
            },
        }
    }

    async fn find_for_advisor(
        &self,
        advisor_id: &str,
        order_id: &str,
    ) -> Result<Option<Order>, RepositoryError> {
        let record = sqlx::query_as::<_, OrderRecord>(
            "SELECT * FROM orders WHERE id = ?1 AND advisor_id = ?2",
        )
        .bind(order_id)
        .bind(advisor_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to get order {}: {}", order_id, e);
            RepositoryError::Storage(format!("Failed to get order: {}", e))
        })?;

        record.map(Order::try_from).transpose()
    }

    async fn list_for_advisor(
        &self,
        advisor_id: &str,
        filter: &OrderFilter,
    ) -> Result<Vec<Order>, RepositoryError> {
        let records = sqlx::query_as::<_, OrderRecord>(
            r#"
            SELECT * FROM orders
            WHERE advisor_id = ?1
              AND (?2 IS NULL OR client_id = ?2)
              AND (?3 IS NULL OR status = ?3)
              AND (?4 IS NULL OR order_type = ?4)
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?5 OFFSET ?6
            "#,
        )
        .bind(advisor_id)
        .bind(&filter.client_id)
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.order_type.map(|t| t.as_str()))
        .bind(i64::from(filter.limit()))
        .bind(i64::from(filter.offset()))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to list orders for advisor {}: {}", advisor_id, e);
            RepositoryError::Storage(format!("Failed to list orders: {}", e))
        })?;

        records.into_iter().map(Order::try_from).collect()
    }
}
