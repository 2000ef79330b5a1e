use std::fmt;
use thiserror::Error;

/// Failure taxonomy for order placement.
///
/// Variants raised before the order row exists (`Validation`, `Authorization`,
/// `Credential`) propagate to the caller. Everything after persistence is
/// folded into a rejected `PlacementResult` instead.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum GatewayError {
    /// Malformed or incomplete caller input
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Client is not owned by the requesting advisor
    #[error("Client not found or access denied: {client_id}")]
    Authorization { client_id: String },

    /// No usable decrypted broker credential for the advisor
    #[error("Broker credentials unavailable: {0}")]
    Credential(String),

    /// Timeout, connection failure or open circuit during transport
    #[error("Exchange temporarily unreachable: {0}")]
    TransientNetwork(String),

    /// Parsed, non-success status code from the exchange
    #[error("Exchange rejected request ({code}): {message}")]
    VendorRejection { code: String, message: String },

    /// Response body absent or in no recognized shape
    #[error("Unreadable exchange response: {0}")]
    Parse(String),

    /// Local storage failure
    #[error("Persistence failure: {0}")]
    Persistence(String),

    /// Gateway wiring or settings are unusable
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl GatewayError {
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            GatewayError::Validation(_) => ErrorSeverity::Minor,
            GatewayError::Authorization { .. } => ErrorSeverity::Minor,
            GatewayError::VendorRejection { .. } => ErrorSeverity::Moderate,
            GatewayError::TransientNetwork(_) => ErrorSeverity::Moderate,
            GatewayError::Credential(_) => ErrorSeverity::Moderate,
            GatewayError::Parse(_) => ErrorSeverity::Critical,
            GatewayError::Persistence(_) => ErrorSeverity::Critical,
            GatewayError::Configuration(_) => ErrorSeverity::Critical,
        }
    }

    /// Whether a fresh attempt (with a new reference number) may succeed.
    ///
    /// Every non-"100" vendor code is treated as terminal until the
    /// exchange's code table distinguishes throttling from rejection.
    pub fn is_retryable(&self) -> bool {
        matches!(self, GatewayError::TransientNetwork(_))
    }

    /// True for errors that must surface before any order row is written
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            GatewayError::Validation(_)
                | GatewayError::Authorization { .. }
                | GatewayError::Credential(_)
        )
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            GatewayError::Validation(_) => "ERR_VALIDATION",
            GatewayError::Authorization { .. } => "ERR_AUTHORIZATION",
            GatewayError::Credential(_) => "ERR_CREDENTIAL",
            GatewayError::TransientNetwork(_) => "ERR_TRANSIENT_NETWORK",
            GatewayError::VendorRejection { .. } => "ERR_VENDOR_REJECTION",
            GatewayError::Parse(_) => "ERR_PARSE",
            GatewayError::Persistence(_) => "ERR_PERSISTENCE",
            GatewayError::Configuration(_) => "ERR_CONFIGURATION",
        }
    }

    /// Text recorded as the order's response message when this error ends it
    pub fn outcome_message(&self) -> String {
        match self {
            GatewayError::VendorRejection { message, .. } => message.clone(),
            GatewayError::Parse(diagnostic) => diagnostic.clone(),
            GatewayError::TransientNetwork(detail) => format!(
                "Exchange temporarily unreachable ({}); resubmit to retry",
                detail
            ),
            other => other.to_string(),
        }
    }

    /// Vendor status code, when the exchange produced one
    pub fn vendor_code(&self) -> Option<&str> {
        match self {
            GatewayError::VendorRejection { code, .. } => Some(code),
            _ => None,
        }
    }
}

/// Severity levels for gateway errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// Caller mistakes, expected during normal use
    Minor,
    /// Exchange-side outcomes worth watching
    Moderate,
    /// Local faults that need attention
    Critical,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorSeverity::Minor => write!(f, "Minor"),
            ErrorSeverity::Moderate => write!(f, "Moderate"),
            ErrorSeverity::Critical => write!(f, "Critical"),
        }
    }
}

impl From<GatewayError> for String {
    fn from(error: GatewayError) -> Self {
        error.to_string()
    }
}
