use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::Next,
    response::Response,
};
use std::collections::HashMap;
use std::sync::Arc;

/// Minimum required key length (256 bits of base64)
pub const MIN_KEY_LENGTH: usize = 32;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AuthConfigError {
    #[error("API_KEYS environment variable is not set")]
    Missing,

    #[error("API key entry {0} is not in key:advisor form")]
    MalformedEntry(usize),

    #[error("API key entry {index} is too weak (length: {length})")]
    WeakKey { index: usize, length: usize },

    #[error("No valid API keys found in API_KEYS")]
    Empty,
}

/// Advisor resolved from the request's API key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvisorId(pub String);

/// API key to advisor id mapping
#[derive(Clone, Default)]
pub struct ApiKeyRegistry {
    advisors: HashMap<String, String>,
}

impl std::fmt::Debug for ApiKeyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKeyRegistry")
            .field("keys", &self.advisors.len())
            .finish()
    }
}

impl ApiKeyRegistry {
    /// Load from `API_KEYS=key:advisor,key:advisor`
    pub fn from_env() -> Result<Self, AuthConfigError> {
        let raw = std::env::var("API_KEYS").map_err(|_| AuthConfigError::Missing)?;
        Self::parse(&raw)
    }

    pub fn parse(raw: &str) -> Result<Self, AuthConfigError> {
        let mut advisors = HashMap::new();

        for (index, entry) in raw.split(',').enumerate() {
            let entry = entry.trim();
            if entry.is_empty() {
                continue;
            }

            let (key, advisor) = entry
                .split_once(':')
                .map(|(k, a)| (k.trim(), a.trim()))
                .filter(|(k, a)| !k.is_empty() && !a.is_empty())
                .ok_or(AuthConfigError::MalformedEntry(index))?;

            if key.len() < MIN_KEY_LENGTH {
                tracing::error!(
                    "SECURITY ERROR: API key is too weak (length: {}, minimum: {})",
                    key.len(),
                    MIN_KEY_LENGTH
                );
                return Err(AuthConfigError::WeakKey {
                    index,
                    length: key.len(),
                });
            }
            advisors.insert(key.to_string(), advisor.to_string());
        }

        if advisors.is_empty() {
            return Err(AuthConfigError::Empty);
        }

        tracing::info!(
            "API authentication initialized with {} valid key(s)",
            advisors.len()
        );
        Ok(Self { advisors })
    }

    pub fn with_key(mut self, key: &str, advisor_id: &str) -> Self {
        self.advisors.insert(key.to_string(), advisor_id.to_string());
        self
    }

    pub fn advisor_for(&self, key: &str) -> Option<&str> {
        self.advisors.get(key).map(String::as_str)
    }
}

/// Resolve the bearer key to an advisor and attach it to the request
pub async fn require_auth(
    State(keys): State<Arc<ApiKeyRegistry>>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    let advisor = match auth_header {
        Some(auth) if auth.starts_with("Bearer ") => match keys.advisor_for(&auth[7..]) {
            Some(advisor) => advisor.to_string(),
            None => {
                tracing::warn!("Invalid API key attempted");
                return Err(StatusCode::UNAUTHORIZED);
            }
        },
        Some(_) => {
            tracing::warn!("Invalid Authorization header format (expected Bearer token)");
            return Err(StatusCode::UNAUTHORIZED);
        }
        None => {
            tracing::warn!("Missing Authorization header");
            return Err(StatusCode::UNAUTHORIZED);
        }
    };

    request.extensions_mut().insert(AdvisorId(advisor));
    Ok(next.run(request).await)
}
