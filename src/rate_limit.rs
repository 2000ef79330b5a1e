use crate::auth::AdvisorId;
use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;

/// Rate limiter configuration
pub struct RateLimiterConfig {
    /// Maximum order requests per minute for one advisor
    pub requests_per_minute: u32,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: 30,
        }
    }
}

/// Per-advisor rate limiter
pub type AdvisorRateLimiter = Arc<DefaultKeyedRateLimiter<String>>;

pub fn create_rate_limiter(config: RateLimiterConfig) -> AdvisorRateLimiter {
    let per_minute = NonZeroU32::new(config.requests_per_minute).unwrap_or(NonZeroU32::MIN);
    Arc::new(RateLimiter::keyed(Quota::per_minute(per_minute)))
}

/// Throttle requests by the advisor attached by `require_auth`
pub async fn rate_limit_middleware(
    State(limiter): State<AdvisorRateLimiter>,
    request: Request,
    next: Next,
) -> Response {
    let Some(AdvisorId(advisor)) = request.extensions().get::<AdvisorId>().cloned() else {
        return next.run(request).await;
    };

    match limiter.check_key(&advisor) {
        Ok(_) => next.run(request).await,
        Err(_) => {
            tracing::warn!("Rate limit exceeded for advisor {}", advisor);
            (
                StatusCode::TOO_MANY_REQUESTS,
                "Rate limit exceeded. Please try again later.",
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limits_each_advisor_separately() {
        let limiter = create_rate_limiter(RateLimiterConfig {
            requests_per_minute: 2,
        });
        let a = "adv-1".to_string();
        let b = "adv-2".to_string();

        assert!(limiter.check_key(&a).is_ok());
        assert!(limiter.check_key(&a).is_ok());
        assert!(limiter.check_key(&a).is_err());
        assert!(limiter.check_key(&b).is_ok());
    }

    #[test]
    fn test_zero_quota_clamped() {
        let limiter = create_rate_limiter(RateLimiterConfig {
            requests_per_minute: 0,
        });
        assert!(limiter.check_key(&"adv-1".to_string()).is_ok());
    }

    #[test]
    fn test_default_config() {
        assert_eq!(RateLimiterConfig::default().requests_per_minute, 30);
    }
}
