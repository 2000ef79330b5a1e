//! Order Repository Trait
//!
//! Durable store for order rows. Reference numbers are unique per member id,
//! enforced by the store itself rather than by in-process locking.

use crate::domain::entities::order::{NewOrder, Order, OrderFilter, OrderStatus};
use crate::domain::errors::GatewayError;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum RepositoryError {
    #[error("Reference number {reference_number} already used for member {member_id}")]
    DuplicateReference {
        member_id: String,
        reference_number: String,
    },

    #[error("Order not found: {0}")]
    NotFound(String),

    #[error("Order {order_id} cannot move to {to}: not in CREATED state")]
    InvalidTransition { order_id: String, to: OrderStatus },

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<RepositoryError> for GatewayError {
    fn from(error: RepositoryError) -> Self {
        GatewayError::Persistence(error.to_string())
    }
}

/// Terminal outcome applied to a `Created` order
#[derive(Debug, Clone, PartialEq)]
pub enum OrderTransition {
    Submitted {
        exchange_order_number: Option<String>,
        response_code: Option<String>,
        message: String,
    },
    Rejected {
        response_code: Option<String>,
        message: String,
    },
}

impl OrderTransition {
    pub fn target_status(&self) -> OrderStatus {
        match self {
            OrderTransition::Submitted { .. } => OrderStatus::Submitted,
            OrderTransition::Rejected { .. } => OrderStatus::Rejected,
        }
    }
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Insert a new order in `Created` state
    async fn create(&self, order: NewOrder) -> Result<Order, RepositoryError>;

    /// Move a `Created` order to its terminal state
    async fn transition(
        &self,
        order_id: &str,
        transition: OrderTransition,
    ) -> Result<Order, RepositoryError>;

    /// Fetch an order owned by the advisor
    async fn find_for_advisor(
        &self,
        advisor_id: &str,
        order_id: &str,
    ) -> Result<Option<Order>, RepositoryError>;

    /// Page through the advisor's orders, newest first
    async fn list_for_advisor(
        &self,
        advisor_id: &str,
        filter: &OrderFilter,
    ) -> Result<Vec<Order>, RepositoryError>;
}
