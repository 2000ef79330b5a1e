//! HTTP surface over the order gateway.
//!
//! Every `/api/v1/orders` route requires a bearer API key, which resolves to
//! the advisor the request acts for. Placement responses always carry a
//! `PlacementResult`; only failures raised before an order row exists are
//! mapped to error statuses.

use crate::auth::{require_auth, AdvisorId, ApiKeyRegistry};
use crate::domain::entities::order::{Order, OrderFilter, PlacementResult};
use crate::domain::errors::GatewayError;
use crate::domain::services::order_gateway::{ExecutionMode, OrderGateway};
use crate::domain::services::orders::{
    ChangeOfBrokerRequest, OrderRequest, PurchaseRequest, RedemptionRequest, SpreadRequest,
    SwitchRequest,
};
use crate::rate_limit::{rate_limit_middleware, AdvisorRateLimiter};
use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

/// Largest accepted request body
pub const MAX_BODY_BYTES: usize = 64 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<OrderGateway>,
}

pub fn router(
    gateway: Arc<OrderGateway>,
    keys: Arc<ApiKeyRegistry>,
    limiter: AdvisorRateLimiter,
) -> Router {
    let state = AppState { gateway };

    let orders = Router::new()
        .route("/", get(list_orders))
        .route("/purchase", post(place::<PurchaseRequest>))
        .route("/redeem", post(place::<RedemptionRequest>))
        .route("/switch", post(place::<SwitchRequest>))
        .route("/spread", post(place::<SpreadRequest>))
        .route("/cob", post(place::<ChangeOfBrokerRequest>))
        .route("/:id", get(get_order))
        .route_layer(middleware::from_fn_with_state(limiter, rate_limit_middleware))
        .route_layer(middleware::from_fn_with_state(keys, require_auth));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1/orders", orders)
        .with_state(state)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
}

async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    let mode = match state.gateway.mode() {
        ExecutionMode::Live => "live",
        ExecutionMode::Mock => "mock",
    };
    Json(json!({ "status": "ok", "mode": mode }))
}

async fn place<R>(
    State(state): State<AppState>,
    Extension(AdvisorId(advisor_id)): Extension<AdvisorId>,
    payload: Result<Json<R>, JsonRejection>,
) -> Result<(StatusCode, Json<PlacementResult>), GatewayError>
where
    R: OrderRequest + DeserializeOwned + 'static,
{
    let Json(request) = payload.map_err(|e| GatewayError::Validation(e.body_text()))?;
    let result = state.gateway.place(&advisor_id, &request).await?;
    Ok((StatusCode::CREATED, Json(result)))
}

#[derive(Serialize)]
struct OrderPage {
    data: Vec<Order>,
    page: u32,
    limit: u32,
}

async fn list_orders(
    State(state): State<AppState>,
    Extension(AdvisorId(advisor_id)): Extension<AdvisorId>,
    filter: Result<Query<OrderFilter>, QueryRejection>,
) -> Result<Json<OrderPage>, GatewayError> {
    let Query(filter) = filter.map_err(|e| GatewayError::Validation(e.body_text()))?;
    let data = state.gateway.list_orders(&advisor_id, &filter).await?;
    Ok(Json(OrderPage {
        data,
        page: filter.page.unwrap_or(1).max(1),
        limit: filter.limit(),
    }))
}

async fn get_order(
    State(state): State<AppState>,
    Extension(AdvisorId(advisor_id)): Extension<AdvisorId>,
    Path(order_id): Path<String>,
) -> Result<Response, GatewayError> {
    match state.gateway.get_order(&advisor_id, &order_id).await? {
        Some(order) => Ok(Json(order).into_response()),
        None => Ok((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "ERR_NOT_FOUND", "message": "Order not found" })),
        )
            .into_response()),
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = match &self {
            GatewayError::Validation(_) => StatusCode::BAD_REQUEST,
            GatewayError::Authorization { .. } => StatusCode::NOT_FOUND,
            GatewayError::Credential(_) => StatusCode::PRECONDITION_FAILED,
            GatewayError::Configuration(_) | GatewayError::Persistence(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            _ => StatusCode::BAD_GATEWAY,
        };

        let message = match &self {
            GatewayError::Authorization { .. } => "Client not found or access denied".to_string(),
            GatewayError::Configuration(_) | GatewayError::Persistence(_) => {
                error!("[{}] {}", self.severity(), self);
                "Internal error".to_string()
            }
            other => {
                warn!("[{}] {}", other.severity(), other);
                other.to_string()
            }
        };

        (
            status,
            Json(json!({ "error": self.error_code(), "message": message })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::credentials::BrokerIdentity;
    use crate::domain::repositories::exchange_transport::{
        ExchangeRequest, ExchangeTransport, TransportError,
    };
    use crate::domain::services::token_manager::{AuthTokenManager, TokenPolicy};
    use crate::infrastructure::soap_token_issuer::SoapTokenIssuer;
    use crate::persistence::client_directory::SqliteClientDirectory;
    use crate::persistence::credential_repository::SqliteCredentialStore;
    use crate::persistence::order_repository::SqliteOrderRepository;
    use crate::persistence::{init_database, DatabaseConfig};
    use crate::protocol::SoapEncoder;
    use crate::rate_limit::{create_rate_limiter, RateLimiterConfig};
    use crate::secrets::SecretCipher;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request};
    use tower::ServiceExt;

    const KEY: &str = "test-key-0123456789abcdef0123456789abcdef";

    struct OfflineTransport;

    #[async_trait]
    impl ExchangeTransport for OfflineTransport {
        async fn send(&self, _request: ExchangeRequest) -> Result<String, TransportError> {
            Err(TransportError::Connection("offline".to_string()))
        }
    }

    async fn app() -> Router {
        let pool = init_database(&DatabaseConfig::in_memory()).await.unwrap();
        let cipher = Arc::new(SecretCipher::new(&[5u8; 32]).unwrap());

        let credentials = Arc::new(SqliteCredentialStore::new(pool.clone(), cipher));
        credentials
            .store_credentials(
                &BrokerIdentity {
                    advisor_id: "adv-1".to_string(),
                    member_id: "10001".to_string(),
                    user_id: "1000101".to_string(),
                    arn: Some("ARN-1".to_string()),
                    euin: None,
                },
                "pw",
                "pk",
            )
            .await
            .unwrap();

        let clients = Arc::new(SqliteClientDirectory::new(pool.clone()));
        clients.register_client("C1", "adv-1").await.unwrap();
        clients.register_client("C2", "adv-2").await.unwrap();

        let transport: Arc<dyn ExchangeTransport> = Arc::new(OfflineTransport);
        let encoder = SoapEncoder::new("https://example.test/MFOrderEntry/MFOrder.svc");
        let tokens = Arc::new(AuthTokenManager::new(
            credentials.clone(),
            Arc::new(SoapTokenIssuer::new(transport.clone(), encoder.clone())),
            TokenPolicy::default(),
        ));
        let gateway = OrderGateway::new(
            Arc::new(SqliteOrderRepository::new(pool)),
            clients,
            credentials,
            tokens,
            transport,
            encoder,
            ExecutionMode::Mock,
        );

        router(
            Arc::new(gateway),
            Arc::new(ApiKeyRegistry::default().with_key(KEY, "adv-1")),
            create_rate_limiter(RateLimiterConfig {
                requests_per_minute: 100,
            }),
        )
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", KEY))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_authed(uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", KEY))
            .body(Body::empty())
            .unwrap()
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_is_public() {
        let response = app()
            .await
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["mode"], "mock");
    }

    #[tokio::test]
    async fn test_orders_require_api_key() {
        let response = app()
            .await
            .oneshot(Request::builder().uri("/api/v1/orders").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_mock_cob_placement_then_lookup() {
        let app = app().await;

        let response = app
            .clone()
            .oneshot(post_json(
                "/api/v1/orders/cob",
                json!({ "clientId": "C1", "schemeCode": "INF123", "folioNumber": "F1", "allUnits": true }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let placed = json_body(response).await;
        assert_eq!(placed["success"], true);
        assert!(placed["exchangeOrderId"].as_str().unwrap().starts_with("COB"));
        assert!(placed["message"].as_str().unwrap().starts_with("[MOCK]"));

        let order_id = placed["orderId"].as_str().unwrap().to_string();
        let response = app
            .clone()
            .oneshot(get_authed(&format!("/api/v1/orders/{}", order_id)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let order = json_body(response).await;
        assert_eq!(order["status"], "SUBMITTED");
        assert_eq!(order["orderType"], "COB");

        let response = app.oneshot(get_authed("/api/v1/orders?status=SUBMITTED")).await.unwrap();
        let page = json_body(response).await;
        assert_eq!(page["data"].as_array().unwrap().len(), 1);
        assert_eq!(page["limit"], 20);
    }

    #[tokio::test]
    async fn test_foreign_client_is_not_found() {
        let response = app()
            .await
            .oneshot(post_json(
                "/api/v1/orders/purchase",
                json!({ "clientId": "C2", "schemeCode": "INF123", "amount": 1000 }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = json_body(response).await;
        assert_eq!(body["error"], "ERR_AUTHORIZATION");
        assert_eq!(body["message"], "Client not found or access denied");
    }

    #[tokio::test]
    async fn test_invalid_payload_is_bad_request() {
        let app = app().await;

        let response = app
            .clone()
            .oneshot(post_json(
                "/api/v1/orders/purchase",
                json!({ "clientId": "C1", "schemeCode": "INF123", "amount": -5 }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "ERR_VALIDATION");

        let response = app
            .oneshot(post_json("/api/v1/orders/redeem", json!({ "clientId": 7 })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_order_is_not_found() {
        let response = app()
            .await
            .oneshot(get_authed("/api/v1/orders/does-not-exist"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
