//! Operation-specific order requests.
//!
//! Each request knows how to validate itself, how to describe the row that
//! gets persisted, and how to lay out its positional wire fields. Everything
//! else (authorization, persistence, transport, state transitions) is shared
//! by the order gateway.

pub mod change_of_broker;
pub mod purchase;
pub mod redemption;
pub mod spread;
pub mod switch;

pub use change_of_broker::ChangeOfBrokerRequest;
pub use purchase::PurchaseRequest;
pub use redemption::RedemptionRequest;
pub use spread::SpreadRequest;
pub use switch::SwitchRequest;

use crate::domain::entities::credentials::BrokerIdentity;
use crate::domain::entities::order::{NewOrder, OrderType};
use crate::domain::errors::GatewayError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

/// Values known only once the order row exists and a token is in hand
pub struct WireContext<'a> {
    pub reference_number: &'a str,
    pub identity: &'a BrokerIdentity,
    pub token: &'a str,
}

pub trait OrderRequest: Send + Sync {
    fn order_type(&self) -> OrderType;

    fn client_id(&self) -> &str;

    /// Input invariants, checked before anything is persisted
    fn validate(&self, today: NaiveDate) -> Result<(), GatewayError>;

    /// Row to persist. Advisor, member and reference number are filled in by
    /// the gateway.
    fn draft(&self) -> NewOrder;

    /// Positional parameter fields, in exchange order
    fn wire_fields(&self, ctx: &WireContext<'_>) -> Zeroizing<Vec<String>>;
}

/// Whether a lumpsum purchase opens a new folio or adds to an existing one
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BuySellType {
    #[default]
    Fresh,
    Additional,
}

impl BuySellType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuySellType::Fresh => "FRESH",
            BuySellType::Additional => "ADDITIONAL",
        }
    }
}

pub(crate) const DP_TXN_MODE_PHYSICAL: &str = "P";
pub(crate) const KYC_COMPLIANT: &str = "Y";

pub(crate) fn yes_no(flag: bool) -> &'static str {
    if flag {
        "Y"
    } else {
        "N"
    }
}

pub(crate) fn number_field(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

pub(crate) fn text_field(value: Option<&String>) -> String {
    value.cloned().unwrap_or_default()
}

/// Reject values that would corrupt the pipe layout
pub(crate) fn check_wire_safe(field: &str, value: &str) -> Result<(), GatewayError> {
    if value.contains('|') {
        return Err(GatewayError::Validation(format!(
            "{} must not contain '|'",
            field
        )));
    }
    if value.chars().any(char::is_control) {
        return Err(GatewayError::Validation(format!(
            "{} must not contain control characters",
            field
        )));
    }
    Ok(())
}

pub(crate) fn require_text(field: &str, value: &str) -> Result<(), GatewayError> {
    if value.trim().is_empty() {
        return Err(GatewayError::Validation(format!("{} is required", field)));
    }
    check_wire_safe(field, value)
}

pub(crate) fn optional_text(field: &str, value: Option<&String>) -> Result<(), GatewayError> {
    match value {
        Some(v) => check_wire_safe(field, v),
        None => Ok(()),
    }
}

pub(crate) fn require_positive(field: &str, value: f64) -> Result<(), GatewayError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(GatewayError::Validation(format!(
            "{} must be a positive number",
            field
        )));
    }
    Ok(())
}

pub(crate) fn optional_positive(field: &str, value: Option<f64>) -> Result<(), GatewayError> {
    match value {
        Some(v) => require_positive(field, v),
        None => Ok(()),
    }
}

/// Exactly one way of sizing a sell-side order must be given
pub(crate) fn exactly_one_quantity(
    all_units: bool,
    units: Option<f64>,
    amount: Option<f64>,
) -> Result<(), GatewayError> {
    optional_positive("units", units)?;
    optional_positive("amount", amount)?;

    let given = [all_units, units.is_some(), amount.is_some()]
        .iter()
        .filter(|g| **g)
        .count();
    match given {
        1 => Ok(()),
        0 => Err(GatewayError::Validation(
            "Either allUnits or a quantity must be specified".to_string(),
        )),
        _ => Err(GatewayError::Validation(
            "Specify only one of allUnits, units or amount".to_string(),
        )),
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_safety() {
        assert!(check_wire_safe("remarks", "plain text").is_ok());
        assert!(check_wire_safe("remarks", "a|b").is_err());
        assert!(check_wire_safe("remarks", "line\nbreak").is_err());
    }

    #[test]
    fn test_required_text() {
        assert!(require_text("clientId", "").is_err());
        assert!(require_text("clientId", "   ").is_err());
        assert!(require_text("clientId", "C1").is_ok());
    }

    #[test]
    fn test_positive_numbers() {
        assert!(require_positive("amount", 100.0).is_ok());
        assert!(require_positive("amount", 0.0).is_err());
        assert!(require_positive("amount", -5.0).is_err());
        assert!(require_positive("amount", f64::NAN).is_err());
        assert!(require_positive("amount", f64::INFINITY).is_err());
    }

    #[test]
    fn test_exactly_one_quantity() {
        assert!(exactly_one_quantity(true, None, None).is_ok());
        assert!(exactly_one_quantity(false, Some(10.0), None).is_ok());
        assert!(exactly_one_quantity(false, None, Some(500.0)).is_ok());
        assert!(exactly_one_quantity(false, None, None).is_err());
        assert!(exactly_one_quantity(true, Some(10.0), None).is_err());
        assert!(exactly_one_quantity(false, Some(-1.0), None).is_err());
    }

    #[test]
    fn test_number_field_formatting() {
        assert_eq!(number_field(Some(5000.0)), "5000");
        assert_eq!(number_field(Some(12.5)), "12.5");
        assert_eq!(number_field(None), "");
    }
}
