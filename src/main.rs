use starmf_gateway::api;
use starmf_gateway::auth::ApiKeyRegistry;
use starmf_gateway::config::GatewayConfig;
use starmf_gateway::domain::repositories::exchange_transport::ExchangeTransport;
use starmf_gateway::domain::services::order_gateway::{ExecutionMode, OrderGateway};
use starmf_gateway::domain::services::token_manager::AuthTokenManager;
use starmf_gateway::infrastructure::http_transport::HttpExchangeTransport;
use starmf_gateway::infrastructure::soap_token_issuer::SoapTokenIssuer;
use starmf_gateway::persistence::client_directory::SqliteClientDirectory;
use starmf_gateway::persistence::credential_repository::SqliteCredentialStore;
use starmf_gateway::persistence::init_database;
use starmf_gateway::persistence::order_repository::SqliteOrderRepository;
use starmf_gateway::protocol::SoapEncoder;
use starmf_gateway::rate_limit::{create_rate_limiter, RateLimiterConfig};
use starmf_gateway::secrets::{SecretCipher, SecretConfig};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Failed to load .env: {}", e);
        }
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "starmf_gateway=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = GatewayConfig::from_env();
    let endpoint = config.order_entry_url()?;
    info!("StAR MF gateway starting against {}", endpoint);
    if config.execution_mode == ExecutionMode::Mock {
        warn!("Mock mode enabled: orders are simulated and never reach the exchange");
    }

    let pool = init_database(&config.database).await?;

    let cipher = Arc::new(SecretCipher::load(&SecretConfig::from_env())?);
    let credentials = Arc::new(SqliteCredentialStore::new(pool.clone(), cipher));

    let transport: Arc<dyn ExchangeTransport> = Arc::new(HttpExchangeTransport::new(
        endpoint.clone(),
        config.exchange_timeout(),
        config.circuit_breaker(),
    )?);
    let encoder = SoapEncoder::new(endpoint.as_str());

    let tokens = Arc::new(AuthTokenManager::new(
        credentials.clone(),
        Arc::new(SoapTokenIssuer::new(transport.clone(), encoder.clone())),
        config.token_policy(),
    ));

    let gateway = Arc::new(OrderGateway::new(
        Arc::new(SqliteOrderRepository::new(pool.clone())),
        Arc::new(SqliteClientDirectory::new(pool)),
        credentials,
        tokens,
        transport,
        encoder,
        config.execution_mode,
    ));

    let keys = Arc::new(ApiKeyRegistry::from_env()?);
    let limiter = create_rate_limiter(RateLimiterConfig {
        requests_per_minute: config.orders_per_minute,
    });
    let app = api::router(gateway, keys, limiter);

    info!("Listening on {}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;

    let shutdown_signal = async {
        let ctrl_c = async {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("Received Ctrl+C signal"),
                Err(e) => error!("Failed to install Ctrl+C handler: {}", e),
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut sig) => {
                    sig.recv().await;
                    info!("Received SIGTERM signal");
                }
                Err(e) => error!("Failed to install SIGTERM handler: {}", e),
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {},
            _ = terminate => {},
        }
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("Shutdown complete");
    Ok(())
}
