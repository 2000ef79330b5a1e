//! Catalog of exchange operations and their fixed wire names

use crate::domain::entities::order::OrderType;

/// Target namespace of the order-entry service
pub const SERVICE_NAMESPACE: &str = "http://bsestarmf.in/";

/// Prefix of every order-entry action identifier
pub const ACTION_BASE: &str = "http://bsestarmf.in/MFOrderEntry/";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Session token request
    GetPassword,
    /// Lumpsum purchase and redemption
    OrderEntry,
    SwitchOrderEntry,
    SpreadOrderEntry,
    ChangeOfBrokerEntry,
}

impl Operation {
    pub fn for_order_type(order_type: OrderType) -> Self {
        match order_type {
            OrderType::Purchase | OrderType::Redemption => Operation::OrderEntry,
            OrderType::Switch => Operation::SwitchOrderEntry,
            OrderType::Spread => Operation::SpreadOrderEntry,
            OrderType::ChangeOfBroker => Operation::ChangeOfBrokerEntry,
        }
    }

    /// Root element of the request body
    pub fn root_element(&self) -> &'static str {
        match self {
            Operation::GetPassword => "getPassword",
            Operation::OrderEntry => "orderEntryParam",
            Operation::SwitchOrderEntry => "switchOrderEntryParam",
            Operation::SpreadOrderEntry => "spreadOrderEntryParam",
            Operation::ChangeOfBrokerEntry => "changeOfBrokerEntryParam",
        }
    }

    pub fn action(&self) -> String {
        format!("{}{}", ACTION_BASE, self.root_element())
    }

    pub fn response_element(&self) -> String {
        format!("{}Response", self.root_element())
    }

    pub fn result_element(&self) -> String {
        format!("{}Result", self.root_element())
    }

    /// Number of positional fields in the pipe-delimited parameter, if the
    /// operation uses one
    pub fn field_count(&self) -> Option<usize> {
        match self {
            Operation::GetPassword => None,
            Operation::OrderEntry => Some(26),
            Operation::SwitchOrderEntry => Some(25),
            Operation::SpreadOrderEntry => Some(27),
            Operation::ChangeOfBrokerEntry => Some(16),
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.root_element())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_of_broker_names() {
        let op = Operation::ChangeOfBrokerEntry;
        assert_eq!(op.root_element(), "changeOfBrokerEntryParam");
        assert_eq!(op.response_element(), "changeOfBrokerEntryParamResponse");
        assert_eq!(op.result_element(), "changeOfBrokerEntryParamResult");
        assert_eq!(
            op.action(),
            "http://bsestarmf.in/MFOrderEntry/changeOfBrokerEntryParam"
        );
        assert_eq!(op.field_count(), Some(16));
    }

    #[test]
    fn test_order_types_share_order_entry() {
        assert_eq!(
            Operation::for_order_type(OrderType::Purchase),
            Operation::OrderEntry
        );
        assert_eq!(
            Operation::for_order_type(OrderType::Redemption),
            Operation::OrderEntry
        );
        assert_eq!(
            Operation::for_order_type(OrderType::ChangeOfBroker),
            Operation::ChangeOfBrokerEntry
        );
    }
}
