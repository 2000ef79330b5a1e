//! Persistence Layer
//!
//! SQLite storage via sqlx for orders, encrypted broker credentials and the
//! advisor/client ownership directory.
//!
//! # Database Schema
//!
//! ## orders
//! - id: UUID
//! - advisor_id, client_id, member_id
//! - reference_number: unique per member_id
//! - order_type: PURCHASE | REDEMPTION | SWITCH | SPREAD | COB
//! - trans_code, buy_sell, buy_sell_type
//! - scheme_code, to_scheme_code, folio_number
//! - amount, redemption_amount (spread only), units, all_units, redeem_date, remarks
//! - status: CREATED | SUBMITTED | REJECTED
//! - exchange_order_number, response_code, response_message
//! - submitted_at, created_at, updated_at
//!
//! ## broker_credentials
//! - advisor_id (PK), member_id, user_id, arn, euin
//! - password_enc, pass_key_enc: `iv:authTag:ciphertext`
//! - is_active
//!
//! ## advisor_clients
//! - client_id (PK), advisor_id

pub mod client_directory;
pub mod credential_repository;
pub mod models;
pub mod order_repository;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::ConnectOptions;
use std::path::Path;
use std::str::FromStr;
use tracing::info;

pub type DbPool = SqlitePool;

#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Database connection error: {0}")]
    ConnectionError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrationError(String),
}

/// Open the pool described by `config` and apply migrations.
///
/// In-memory databases are private to each connection, so they get a single
/// long-lived connection.
pub async fn init_database(config: &DatabaseConfig) -> Result<DbPool, DatabaseError> {
    info!("Initializing database: {}", config.url);

    if let Some(db_path) = config.url.strip_prefix("sqlite://") {
        if let Some(parent) = Path::new(db_path).parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::ConnectionError(sqlx::Error::Configuration(Box::new(e)))
            })?;
        }
    }

    let level = if config.log_queries {
        tracing::log::LevelFilter::Debug
    } else {
        tracing::log::LevelFilter::Trace
    };
    let options = SqliteConnectOptions::from_str(&config.url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .log_statements(level);

    let in_memory = config.url.contains(":memory:");
    let mut pool_options = SqlitePoolOptions::new();
    pool_options = if in_memory {
        pool_options
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        pool_options.max_connections(config.max_connections)
    };

    let pool = pool_options.connect_with(options).await?;
    run_migrations(&pool).await?;

    info!("Database initialized");
    Ok(pool)
}

async fn run_migrations(pool: &DbPool) -> Result<(), DatabaseError> {
    info!("Running database migrations...");

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS orders (
            id TEXT PRIMARY KEY,
            advisor_id TEXT NOT NULL,
            client_id TEXT NOT NULL,
            member_id TEXT NOT NULL,
            reference_number TEXT NOT NULL,
            order_type TEXT NOT NULL
                CHECK(order_type IN ('PURCHASE', 'REDEMPTION', 'SWITCH', 'SPREAD', 'COB')),
            trans_code TEXT NOT NULL,
            buy_sell TEXT NOT NULL,
            buy_sell_type TEXT,
            scheme_code TEXT NOT NULL,
            to_scheme_code TEXT,
            folio_number TEXT,
            amount REAL,
            redemption_amount REAL,
            units REAL,
            all_units BOOLEAN NOT NULL DEFAULT 0,
            redeem_date DATE,
            remarks TEXT,
            status TEXT NOT NULL CHECK(status IN ('CREATED', 'SUBMITTED', 'REJECTED')),
            exchange_order_number TEXT,
            response_code TEXT,
            response_message TEXT,
            submitted_at DATETIME,
            created_at DATETIME NOT NULL,
            updated_at DATETIME NOT NULL,
            UNIQUE(member_id, reference_number)
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| DatabaseError::MigrationError(format!("Failed to create orders table: {}", e)))?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS broker_credentials (
            advisor_id TEXT PRIMARY KEY,
            member_id TEXT NOT NULL,
            user_id TEXT NOT NULL,
            arn TEXT,
            euin TEXT,
            password_enc TEXT NOT NULL,
            pass_key_enc TEXT NOT NULL,
            is_active BOOLEAN NOT NULL DEFAULT 1,
            created_at DATETIME NOT NULL,
            updated_at DATETIME NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| {
        DatabaseError::MigrationError(format!("Failed to create broker_credentials table: {}", e))
    })?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS advisor_clients (
            client_id TEXT PRIMARY KEY,
            advisor_id TEXT NOT NULL,
            created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| {
        DatabaseError::MigrationError(format!("Failed to create advisor_clients table: {}", e))
    })?;

    for statement in [
        "CREATE INDEX IF NOT EXISTS idx_orders_advisor_created ON orders(advisor_id, created_at)",
        "CREATE INDEX IF NOT EXISTS idx_orders_client ON orders(client_id)",
        "CREATE INDEX IF NOT EXISTS idx_orders_status ON orders(status)",
        "CREATE INDEX IF NOT EXISTS idx_advisor_clients_advisor ON advisor_clients(advisor_id)",
    ] {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(|e| DatabaseError::MigrationError(format!("Failed to create index: {}", e)))?;
    }

    info!("Database migrations completed");
    Ok(())
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// e.g. "sqlite://data/starmf.db"
    pub url: String,
    pub max_connections: u32,
    pub log_queries: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://data/starmf.db".to_string(),
            max_connections: 5,
            log_queries: cfg!(debug_assertions),
        }
    }
}

impl DatabaseConfig {
    pub fn in_memory() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
            ..Self::default()
        }
    }

    pub fn from_env() -> Self {
        let defaults = Self::default();

        let url = std::env::var("DATABASE_URL").unwrap_or(defaults.url);

        let max_connections = std::env::var("DATABASE_MAX_CONNECTIONS")
            .ok()
            .and_then(|s| s.parse().ok())
            .filter(|n| *n > 0)
            .unwrap_or(defaults.max_connections);

        let log_queries = std::env::var("DATABASE_LOG_QUERIES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.log_queries);

        Self {
            url,
            max_connections,
            log_queries,
        }
    }
}

/// True when `error` is a UNIQUE constraint violation
pub(crate) fn is_unique_violation(error: &sqlx::Error) -> bool {
    matches!(error, sqlx::Error::Database(db) if db.is_unique_violation())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_migrations_create_tables() {
        let pool = init_database(&DatabaseConfig::in_memory()).await.unwrap();

        let result: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name IN ('orders', 'broker_credentials', 'advisor_clients')",
        )
        .fetch_one(&pool)
        .await
        .unwrap();

        assert_eq!(result.0, 3);
    }

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let pool = init_database(&DatabaseConfig::in_memory()).await.unwrap();
        assert!(run_migrations(&pool).await.is_ok());
    }

    #[test]
    fn test_database_config_default() {
        let config = DatabaseConfig::default();
        assert_eq!(config.url, "sqlite://data/starmf.db");
        assert_eq!(config.max_connections, 5);
    }
}
