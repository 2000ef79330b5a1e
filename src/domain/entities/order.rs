use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Kind of exchange transaction an order represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    Purchase,
    Redemption,
    Switch,
    Spread,
    #[serde(rename = "COB")]
    ChangeOfBroker,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::Purchase => "PURCHASE",
            OrderType::Redemption => "REDEMPTION",
            OrderType::Switch => "SWITCH",
            OrderType::Spread => "SPREAD",
            OrderType::ChangeOfBroker => "COB",
        }
    }

    /// Short tag used in synthesized exchange order ids
    pub fn mock_prefix(&self) -> &'static str {
        match self {
            OrderType::Purchase => "PUR",
            OrderType::Redemption => "RED",
            OrderType::Switch => "SWT",
            OrderType::Spread => "SPR",
            OrderType::ChangeOfBroker => "COB",
        }
    }
}

impl std::fmt::Display for OrderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for OrderType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PURCHASE" => Ok(OrderType::Purchase),
            "REDEMPTION" => Ok(OrderType::Redemption),
            "SWITCH" => Ok(OrderType::Switch),
            "SPREAD" => Ok(OrderType::Spread),
            "COB" => Ok(OrderType::ChangeOfBroker),
            other => Err(format!("Unknown order type: {}", other)),
        }
    }
}

/// Persistence state of an order.
///
/// `Created` is the only non-terminal state: every order leaves it exactly
/// once, either to `Submitted` or to `Rejected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Created,
    Submitted,
    Rejected,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Created => "CREATED",
            OrderStatus::Submitted => "SUBMITTED",
            OrderStatus::Rejected => "REJECTED",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREATED" => Ok(OrderStatus::Created),
            "SUBMITTED" => Ok(OrderStatus::Submitted),
            "REJECTED" => Ok(OrderStatus::Rejected),
            other => Err(format!("Unknown order status: {}", other)),
        }
    }
}

/// Order about to be persisted in `Created` state
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    pub advisor_id: String,
    pub client_id: String,
    pub member_id: String,
    pub reference_number: String,
    pub order_type: OrderType,
    pub trans_code: String,
    pub buy_sell: String,
    pub buy_sell_type: Option<String>,
    pub scheme_code: String,
    pub to_scheme_code: Option<String>,
    pub folio_number: Option<String>,
    pub amount: Option<f64>,
    /// Spread orders only; `amount` holds the purchase leg
    pub redemption_amount: Option<f64>,
    pub units: Option<f64>,
    pub all_units: bool,
    pub redeem_date: Option<NaiveDate>,
    pub remarks: Option<String>,
}

impl NewOrder {
    /// Minimal draft; operation-specific fields are filled by the caller
    pub fn draft(
        order_type: OrderType,
        client_id: &str,
        scheme_code: &str,
        buy_sell: &str,
    ) -> Self {
        Self {
            advisor_id: String::new(),
            client_id: client_id.to_string(),
            member_id: String::new(),
            reference_number: String::new(),
            order_type,
            trans_code: "NEW".to_string(),
            buy_sell: buy_sell.to_string(),
            buy_sell_type: None,
            scheme_code: scheme_code.to_string(),
            to_scheme_code: None,
            folio_number: None,
            amount: None,
            redemption_amount: None,
            units: None,
            all_units: false,
            redeem_date: None,
            remarks: None,
        }
    }
}

/// One submission attempt as stored
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub advisor_id: String,
    pub client_id: String,
    pub member_id: String,
    pub reference_number: String,
    pub order_type: OrderType,
    pub trans_code: String,
    pub buy_sell: String,
    pub buy_sell_type: Option<String>,
    pub scheme_code: String,
    pub to_scheme_code: Option<String>,
    pub folio_number: Option<String>,
    pub amount: Option<f64>,
    /// Spread orders only; `amount` holds the purchase leg
    pub redemption_amount: Option<f64>,
    pub units: Option<f64>,
    pub all_units: bool,
    pub redeem_date: Option<NaiveDate>,
    pub remarks: Option<String>,
    pub status: OrderStatus,
    pub exchange_order_number: Option<String>,
    pub response_code: Option<String>,
    pub response_message: Option<String>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Result handed back to the caller of an order placement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacementResult {
    pub success: bool,
    pub order_id: String,
    pub exchange_order_id: Option<String>,
    pub message: String,
}

impl PlacementResult {
    pub fn submitted(order_id: &str, exchange_order_id: Option<String>, message: String) -> Self {
        Self {
            success: true,
            order_id: order_id.to_string(),
            exchange_order_id,
            message,
        }
    }

    pub fn rejected(order_id: &str, message: String) -> Self {
        Self {
            success: false,
            order_id: order_id.to_string(),
            exchange_order_id: None,
            message,
        }
    }
}

/// Filter for the advisor-scoped order listing
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderFilter {
    pub client_id: Option<String>,
    pub status: Option<OrderStatus>,
    pub order_type: Option<OrderType>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl OrderFilter {
    pub const MAX_LIMIT: u32 = 100;
    pub const DEFAULT_LIMIT: u32 = 20;

    pub fn limit(&self) -> u32 {
        self.limit
            .unwrap_or(Self::DEFAULT_LIMIT)
            .clamp(1, Self::MAX_LIMIT)
    }

    pub fn offset(&self) -> u32 {
        self.page.unwrap_or(1).max(1).saturating_sub(1) * self.limit()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_type_round_trips_through_str() {
        for t in [
            OrderType::Purchase,
            OrderType::Redemption,
            OrderType::Switch,
            OrderType::Spread,
            OrderType::ChangeOfBroker,
        ] {
            assert_eq!(t.as_str().parse::<OrderType>().unwrap(), t);
        }
        assert!("SIP".parse::<OrderType>().is_err());
    }

    #[test]
    fn test_filter_clamps_limit_and_page() {
        let filter = OrderFilter {
            limit: Some(500),
            page: Some(3),
            ..Default::default()
        };
        assert_eq!(filter.limit(), 100);
        assert_eq!(filter.offset(), 200);

        let filter = OrderFilter {
            limit: Some(0),
            page: Some(0),
            ..Default::default()
        };
        assert_eq!(filter.limit(), 1);
        assert_eq!(filter.offset(), 0);
    }

    #[test]
    fn test_placement_result_serializes_camel_case() {
        let result = PlacementResult::submitted("o-1", Some("ORD123".into()), "Accepted".into());
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["exchangeOrderId"], "ORD123");
        assert_eq!(json["orderId"], "o-1");
        assert_eq!(json["success"], true);
    }
}
