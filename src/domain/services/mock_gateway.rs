//! Deterministic exchange stand-in for non-production environments

use super::error_mapper::Acceptance;
use crate::domain::entities::order::OrderType;
use chrono::{DateTime, Utc};

pub const MOCK_MESSAGE_PREFIX: &str = "[MOCK]";

/// Synthesize an accepted outcome: `{prefix}{epoch millis}` as the exchange
/// order id and a message marked as simulated
pub fn simulate(order_type: OrderType, now: DateTime<Utc>) -> Acceptance {
    Acceptance {
        exchange_order_id: Some(format!("{}{}", order_type.mock_prefix(), now.timestamp_millis())),
        response_code: Some("100".to_string()),
        message: format!(
            "{} {} request submitted successfully",
            MOCK_MESSAGE_PREFIX,
            describe(order_type)
        ),
    }
}

fn describe(order_type: OrderType) -> &'static str {
    match order_type {
        OrderType::Purchase => "Purchase",
        OrderType::Redemption => "Redemption",
        OrderType::Switch => "Switch",
        OrderType::Spread => "Spread",
        OrderType::ChangeOfBroker => "Change of Broker",
    }
}
