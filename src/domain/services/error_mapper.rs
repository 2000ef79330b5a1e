//! Classification of exchange outcomes into the gateway error taxonomy.
//!
//! No retry policy lives here. A transient failure ends the current order;
//! the caller decides whether to submit a fresh attempt.

use crate::domain::errors::GatewayError;
use crate::domain::repositories::exchange_transport::TransportError;
use crate::domain::repositories::token_issuer::TokenError;
use crate::protocol::response::{ParseError, VendorResult};

/// Successful exchange outcome, ready to be persisted as SUBMITTED
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Acceptance {
    pub exchange_order_id: Option<String>,
    pub response_code: Option<String>,
    pub message: String,
}

/// Map a transport failure
pub fn from_transport(error: TransportError) -> GatewayError {
    if let TransportError::Fault { reason, .. } = error {
        return from_parse(ParseError::Fault(reason));
    }
    if error.is_transient() {
        GatewayError::TransientNetwork(error.to_string())
    } else {
        GatewayError::Parse(error.to_string())
    }
}

pub fn from_parse(error: ParseError) -> GatewayError {
    match error {
        ParseError::EmptyBody | ParseError::EmptyResult => {
            GatewayError::Parse("Empty response from exchange".to_string())
        }
        other => GatewayError::Parse(other.to_string()),
    }
}

/// Token acquisition happens after the order row exists, so a missing
/// credential here is an order outcome rather than a precondition failure.
pub fn from_token(error: TokenError) -> GatewayError {
    match error {
        TokenError::Transport(transport) => from_transport(transport),
        TokenError::Rejected { code, message } => GatewayError::VendorRejection { code, message },
        TokenError::Malformed(detail) => GatewayError::Parse(detail),
        TokenError::Credential(credential) => {
            GatewayError::Parse(format!("Session token unavailable: {}", credential))
        }
    }
}

/// `"100"` is the only success sentinel; every other code is terminal
pub fn classify_result(result: VendorResult) -> Result<Acceptance, GatewayError> {
    if result.is_success() {
        Ok(Acceptance {
            exchange_order_id: result.order_id,
            response_code: Some(result.status_code),
            message: result.message,
        })
    } else {
        Err(GatewayError::VendorRejection {
            code: result.status_code,
            message: result.message,
        })
    }
}
