use crate::domain::errors::GatewayError;
use crate::domain::services::order_gateway::ExecutionMode;
use crate::domain::services::token_manager::TokenPolicy;
use crate::infrastructure::circuit_breaker::CircuitBreakerConfig;
use crate::persistence::DatabaseConfig;
use std::fmt::Display;
use std::net::SocketAddr;
use std::ops::RangeInclusive;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

pub const DEFAULT_EXCHANGE_BASE_URL: &str = "https://bsestarmfdemo.bseindia.com";
pub const DEFAULT_ORDER_ENTRY_PATH: &str = "/MFOrderEntry/MFOrder.svc";

/// Runtime configuration for the gateway process
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub exchange_base_url: String,
    pub order_entry_path: String,
    pub exchange_timeout_ms: u64, // 1s to 2min
    pub execution_mode: ExecutionMode,
    pub token_ttl_seconds: i64,
    pub token_refresh_skew_seconds: i64,
    pub circuit_failure_threshold: u32,
    pub circuit_reset_seconds: u64,
    pub bind_addr: SocketAddr,
    pub orders_per_minute: u32, // per advisor
    pub database: DatabaseConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            exchange_base_url: DEFAULT_EXCHANGE_BASE_URL.to_string(),
            order_entry_path: DEFAULT_ORDER_ENTRY_PATH.to_string(),
            exchange_timeout_ms: 30_000,
            execution_mode: ExecutionMode::Live,
            token_ttl_seconds: 3600,
            token_refresh_skew_seconds: 300,
            circuit_failure_threshold: 5,
            circuit_reset_seconds: 60,
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            orders_per_minute: 30,
            database: DatabaseConfig::default(),
        }
    }
}

impl GatewayConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> GatewayConfig {
        let mut config = Self::from_lookup(|key| std::env::var(key).ok());
        config.database = DatabaseConfig::from_env();
        config
    }

    /// Build from any key lookup; invalid values fall back to defaults with a warning
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> GatewayConfig {
        let mut config = GatewayConfig::default();

        if let Some(raw) = lookup("EXCHANGE_BASE_URL") {
            match Url::parse(raw.trim()) {
                Ok(url) if matches!(url.scheme(), "http" | "https") => {
                    config.exchange_base_url = url.to_string();
                }
                Ok(url) => {
                    tracing::warn!(
                        "Invalid EXCHANGE_BASE_URL scheme '{}' (must be http or https), using default: {}",
                        url.scheme(),
                        config.exchange_base_url
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        "Failed to parse EXCHANGE_BASE_URL '{}': {}, using default: {}",
                        raw,
                        e,
                        config.exchange_base_url
                    );
                }
            }
        }

        if let Some(path) = lookup("EXCHANGE_ORDER_ENTRY_PATH") {
            let path = path.trim();
            if path.is_empty() {
                tracing::warn!(
                    "Empty EXCHANGE_ORDER_ENTRY_PATH, using default: {}",
                    config.order_entry_path
                );
            } else {
                config.order_entry_path = path.to_string();
            }
        }

        config.exchange_timeout_ms = parse_in_range(
            &lookup,
            "EXCHANGE_TIMEOUT_MS",
            1_000..=120_000,
            config.exchange_timeout_ms,
        );

        if let Some(mock) = lookup("EXCHANGE_MOCK_MODE") {
            config.execution_mode =
                ExecutionMode::from_mock_flag(mock.to_lowercase() == "true" || mock == "1");
        }

        config.token_ttl_seconds =
            parse_in_range(&lookup, "TOKEN_TTL_SECONDS", 60..=86_400, config.token_ttl_seconds);
        config.token_refresh_skew_seconds = parse_in_range(
            &lookup,
            "TOKEN_REFRESH_SKEW_SECONDS",
            0..=3_600,
            config.token_refresh_skew_seconds,
        );
        if config.token_refresh_skew_seconds >= config.token_ttl_seconds {
            tracing::warn!(
                "TOKEN_REFRESH_SKEW_SECONDS ({}) must be below TOKEN_TTL_SECONDS ({}), using {}",
                config.token_refresh_skew_seconds,
                config.token_ttl_seconds,
                config.token_ttl_seconds / 12
            );
            config.token_refresh_skew_seconds = config.token_ttl_seconds / 12;
        }

        config.circuit_failure_threshold = parse_in_range(
            &lookup,
            "CIRCUIT_FAILURE_THRESHOLD",
            1..=100,
            config.circuit_failure_threshold,
        );
        config.circuit_reset_seconds = parse_in_range(
            &lookup,
            "CIRCUIT_RESET_SECONDS",
            1..=3_600,
            config.circuit_reset_seconds,
        );

        if let Some(addr) = lookup("API_BIND_ADDR") {
            match addr.trim().parse::<SocketAddr>() {
                Ok(value) => config.bind_addr = value,
                Err(e) => {
                    tracing::warn!(
                        "Failed to parse API_BIND_ADDR '{}': {}, using default: {}",
                        addr,
                        e,
                        config.bind_addr
                    );
                }
            }
        }

        config.orders_per_minute = parse_in_range(
            &lookup,
            "ORDERS_PER_MINUTE",
            1..=10_000,
            config.orders_per_minute,
        );

        config
    }

    /// Order-entry service URL
    pub fn order_entry_url(&self) -> Result<Url, GatewayError> {
        let base = Url::parse(&self.exchange_base_url).map_err(|e| {
            GatewayError::Configuration(format!(
                "Invalid exchange base URL '{}': {}",
                self.exchange_base_url, e
            ))
        })?;
        base.join(&self.order_entry_path).map_err(|e| {
            GatewayError::Configuration(format!(
                "Invalid order entry path '{}': {}",
                self.order_entry_path, e
            ))
        })
    }

    pub fn exchange_timeout(&self) -> Duration {
        Duration::from_millis(self.exchange_timeout_ms)
    }

    pub fn token_policy(&self) -> TokenPolicy {
        TokenPolicy {
            ttl: chrono::Duration::seconds(self.token_ttl_seconds),
            refresh_skew: chrono::Duration::seconds(self.token_refresh_skew_seconds),
        }
    }

    pub fn circuit_breaker(&self) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: self.circuit_failure_threshold,
            reset_timeout: Duration::from_secs(self.circuit_reset_seconds),
        }
    }
}

fn parse_in_range<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    range: RangeInclusive<T>,
    default: T,
) -> T
where
    T: FromStr + PartialOrd + Display + Copy,
    T::Err: Display,
{
    let Some(raw) = lookup(key) else {
        return default;
    };

    match raw.trim().parse::<T>() {
        Ok(value) if range.contains(&value) => value,
        Ok(value) => {
            tracing::warn!(
                "Invalid {} value: {} (must be between {} and {}), using default: {}",
                key,
                value,
                range.start(),
                range.end(),
                default
            );
            default
        }
        Err(e) => {
            tracing::warn!(
                "Failed to parse {} '{}': {}, using default: {}",
                key,
                raw,
                e,
                default
            );
            default
        }
    }
}
