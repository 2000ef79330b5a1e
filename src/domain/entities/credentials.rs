//! Advisor-scoped broker identity and session material.
//!
//! Plaintext secrets only ever live inside `Zeroizing` buffers and are wiped
//! when the owning value is dropped. None of these types implement `Display`,
//! and their `Debug` output redacts secret fields.

use chrono::{DateTime, Duration, Utc};
use zeroize::Zeroizing;

/// Non-secret part of an advisor's broker registration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerIdentity {
    pub advisor_id: String,
    pub member_id: String,
    pub user_id: String,
    pub arn: Option<String>,
    pub euin: Option<String>,
}

impl BrokerIdentity {
    /// "Y" when an EUIN is on file, "N" otherwise
    pub fn euin_flag(&self) -> &'static str {
        match self.euin.as_deref() {
            Some(e) if !e.is_empty() => "Y",
            _ => "N",
        }
    }
}

/// Decrypted broker credentials, valid for the duration of one call
pub struct BrokerCredentials {
    pub identity: BrokerIdentity,
    pub password: Zeroizing<String>,
    pub pass_key: Zeroizing<String>,
}

impl std::fmt::Debug for BrokerCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrokerCredentials")
            .field("identity", &self.identity)
            .field("password", &"***")
            .field("pass_key", &"***")
            .finish()
    }
}

/// Order-entry session token issued by the exchange
#[derive(Clone)]
pub struct SessionToken {
    value: Zeroizing<String>,
    expires_at: DateTime<Utc>,
}

impl SessionToken {
    pub fn new(value: Zeroizing<String>, expires_at: DateTime<Utc>) -> Self {
        Self { value, expires_at }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// True when the token expires within `skew` of `now`
    pub fn is_expired(&self, now: DateTime<Utc>, skew: Duration) -> bool {
        now + skew >= self.expires_at
    }
}

impl std::fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionToken")
            .field("value", &"***")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}
