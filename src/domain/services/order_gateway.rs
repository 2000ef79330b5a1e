//! OrderGateway service - drives one order placement from validated intent to
//! a terminal persisted state.
//!
//! The flow is the same for every order type:
//! validate, authorize, resolve the broker identity, persist as CREATED, then
//! either simulate (mock mode) or take the live path (token, encode, send,
//! parse, classify), and finally persist SUBMITTED or REJECTED.
//!
//! Failures before the row exists propagate as `GatewayError`. Once the row
//! exists every outcome, including internal errors, is folded into a
//! `PlacementResult` and the row always leaves CREATED.
//!
//! A SOAP fault leaves the advisor's session in doubt, so the cached token is
//! dropped and the next order fetches a fresh one.

use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::domain::entities::credentials::BrokerIdentity;
use crate::domain::entities::order::{Order, OrderFilter, PlacementResult};
use crate::domain::errors::GatewayError;
use crate::domain::repositories::client_directory::ClientDirectory;
use crate::domain::repositories::credential_store::CredentialStore;
use crate::domain::repositories::exchange_transport::{
    ExchangeRequest, ExchangeTransport, TransportError,
};
use crate::domain::repositories::order_repository::{
    OrderRepository, OrderTransition, RepositoryError,
};
use crate::domain::services::error_mapper::{self, Acceptance};
use crate::domain::services::mock_gateway;
use crate::domain::services::orders::{
    ChangeOfBrokerRequest, OrderRequest, PurchaseRequest, RedemptionRequest, SpreadRequest,
    SwitchRequest, WireContext,
};
use crate::domain::services::reference_number::ReferenceNumberGenerator;
use crate::domain::services::token_manager::AuthTokenManager;
use crate::protocol::{parse_response, Operation, ParseError, SoapEncoder};

/// Attempts at inserting an order before giving up on reference collisions
pub const MAX_REFERENCE_ATTEMPTS: u32 = 3;

/// Whether orders reach the exchange or are answered by the simulator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    Live,
    Mock,
}

impl ExecutionMode {
    pub fn from_mock_flag(mock: bool) -> Self {
        if mock {
            ExecutionMode::Mock
        } else {
            ExecutionMode::Live
        }
    }
}

pub struct OrderGateway {
    orders: Arc<dyn OrderRepository>,
    clients: Arc<dyn ClientDirectory>,
    credentials: Arc<dyn CredentialStore>,
    tokens: Arc<AuthTokenManager>,
    transport: Arc<dyn ExchangeTransport>,
    encoder: SoapEncoder,
    references: ReferenceNumberGenerator,
    mode: ExecutionMode,
}

impl OrderGateway {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        clients: Arc<dyn ClientDirectory>,
        credentials: Arc<dyn CredentialStore>,
        tokens: Arc<AuthTokenManager>,
        transport: Arc<dyn ExchangeTransport>,
        encoder: SoapEncoder,
        mode: ExecutionMode,
    ) -> Self {
        Self {
            orders,
            clients,
            credentials,
            tokens,
            transport,
            encoder,
            references: ReferenceNumberGenerator::new(),
            mode,
        }
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    pub async fn place_purchase(
        &self,
        advisor_id: &str,
        request: &PurchaseRequest,
    ) -> Result<PlacementResult, GatewayError> {
        self.place(advisor_id, request).await
    }

    pub async fn place_redemption(
        &self,
        advisor_id: &str,
        request: &RedemptionRequest,
    ) -> Result<PlacementResult, GatewayError> {
        self.place(advisor_id, request).await
    }

    pub async fn place_switch(
        &self,
        advisor_id: &str,
        request: &SwitchRequest,
    ) -> Result<PlacementResult, GatewayError> {
        self.place(advisor_id, request).await
    }

    pub async fn place_spread(
        &self,
        advisor_id: &str,
        request: &SpreadRequest,
    ) -> Result<PlacementResult, GatewayError> {
        self.place(advisor_id, request).await
    }

    pub async fn place_change_of_broker(
        &self,
        advisor_id: &str,
        request: &ChangeOfBrokerRequest,
    ) -> Result<PlacementResult, GatewayError> {
        self.place(advisor_id, request).await
    }

    /// Place one order of any type
    pub async fn place<R: OrderRequest>(
        &self,
        advisor_id: &str,
        request: &R,
    ) -> Result<PlacementResult, GatewayError> {
        let identity = self.admit(advisor_id, request).await.map_err(|e| {
            if e.is_precondition() {
                warn!(
                    "{} for advisor {} refused [{}]: {}",
                    request.order_type(),
                    advisor_id,
                    e.error_code(),
                    e
                );
            } else {
                error!(
                    "{} for advisor {} failed before persistence [{}]: {}",
                    request.order_type(),
                    advisor_id,
                    e.error_code(),
                    e
                );
            }
            e
        })?;

        let order = self.create_order(advisor_id, &identity, request).await?;
        info!(
            "Placing {} order {} for advisor {} (reference {})",
            order.order_type, order.id, advisor_id, order.reference_number
        );

        let outcome = match self.mode {
            ExecutionMode::Mock => Ok(mock_gateway::simulate(order.order_type, Utc::now())),
            ExecutionMode::Live => self.submit(&order, &identity, request).await,
        };

        Ok(self.finish(&order, outcome).await)
    }

    /// Order owned by the advisor, if any
    pub async fn get_order(
        &self,
        advisor_id: &str,
        order_id: &str,
    ) -> Result<Option<Order>, GatewayError> {
        Ok(self.orders.find_for_advisor(advisor_id, order_id).await?)
    }

    pub async fn list_orders(
        &self,
        advisor_id: &str,
        filter: &OrderFilter,
    ) -> Result<Vec<Order>, GatewayError> {
        Ok(self.orders.list_for_advisor(advisor_id, filter).await?)
    }

    /// Validation, ownership and broker identity; nothing is persisted
    async fn admit<R: OrderRequest>(
        &self,
        advisor_id: &str,
        request: &R,
    ) -> Result<BrokerIdentity, GatewayError> {
        request.validate(Utc::now().date_naive())?;

        if !self
            .clients
            .is_owned_by(request.client_id(), advisor_id)
            .await?
        {
            return Err(GatewayError::Authorization {
                client_id: request.client_id().to_string(),
            });
        }

        // Secrets are dropped here; only the identity is carried forward
        Ok(self.credentials.decrypted(advisor_id).await?.identity)
    }

    async fn create_order<R: OrderRequest>(
        &self,
        advisor_id: &str,
        identity: &BrokerIdentity,
        request: &R,
    ) -> Result<Order, GatewayError> {
        for attempt in 1..=MAX_REFERENCE_ATTEMPTS {
            let mut draft = request.draft();
            draft.advisor_id = advisor_id.to_string();
            draft.member_id = identity.member_id.clone();
            draft.reference_number = self.references.next(&identity.member_id);

            match self.orders.create(draft).await {
                Ok(order) => return Ok(order),
                Err(RepositoryError::DuplicateReference {
                    reference_number, ..
                }) => {
                    warn!(
                        "Reference number {} already taken (attempt {}/{}), regenerating",
                        reference_number, attempt, MAX_REFERENCE_ATTEMPTS
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(GatewayError::Persistence(format!(
            "No unique reference number for member {} after {} attempts",
            identity.member_id, MAX_REFERENCE_ATTEMPTS
        )))
    }

    async fn submit<R: OrderRequest>(
        &self,
        order: &Order,
        identity: &BrokerIdentity,
        request: &R,
    ) -> Result<Acceptance, GatewayError> {
        let token = self
            .tokens
            .token_for(&order.advisor_id)
            .await
            .map_err(error_mapper::from_token)?;

        let operation = Operation::for_order_type(order.order_type);
        let envelope = {
            let fields = request.wire_fields(&WireContext {
                reference_number: &order.reference_number,
                identity,
                token: token.value(),
            });
            self.encoder.encode_params(operation, &fields)?
        };
        drop(token);

        let sent = self
            .transport
            .send(ExchangeRequest {
                action: operation.action(),
                operation: operation.root_element(),
                envelope,
            })
            .await;
        let body = match sent {
            Ok(body) => body,
            Err(e @ TransportError::Fault { .. }) => {
                self.tokens.invalidate(&order.advisor_id).await;
                return Err(error_mapper::from_transport(e));
            }
            Err(e) => return Err(error_mapper::from_transport(e)),
        };

        match parse_response(operation, &body) {
            Ok(result) => error_mapper::classify_result(result),
            Err(e @ ParseError::Fault(_)) => {
                self.tokens.invalidate(&order.advisor_id).await;
                Err(error_mapper::from_parse(e))
            }
            Err(e) => Err(error_mapper::from_parse(e)),
        }
    }

    async fn finish(&self, order: &Order, outcome: Result<Acceptance, GatewayError>) -> PlacementResult {
        let accepted = match outcome {
            Ok(accepted) => accepted,
            Err(e) => return self.reject(order, &e).await,
        };

        let transition = OrderTransition::Submitted {
            exchange_order_number: accepted.exchange_order_id.clone(),
            response_code: accepted.response_code.clone(),
            message: accepted.message.clone(),
        };

        match self.orders.transition(&order.id, transition).await {
            Ok(_) => {
                info!(
                    "Order {} SUBMITTED (exchange order {})",
                    order.id,
                    accepted.exchange_order_id.as_deref().unwrap_or("-")
                );
                PlacementResult::submitted(&order.id, accepted.exchange_order_id, accepted.message)
            }
            Err(e) => {
                error!(
                    "Exchange accepted order {} but SUBMITTED could not be recorded: {}",
                    order.id, e
                );
                self.reject(order, &GatewayError::from(e)).await
            }
        }
    }

    async fn reject(&self, order: &Order, cause: &GatewayError) -> PlacementResult {
        let message = cause.outcome_message();
        warn!(
            "Order {} REJECTED [{}] ({}): {}",
            order.id,
            cause.error_code(),
            cause.severity(),
            message
        );

        let transition = OrderTransition::Rejected {
            response_code: cause.vendor_code().map(str::to_string),
            message: message.clone(),
        };
        if let Err(e) = self.orders.transition(&order.id, transition).await {
            error!("Failed to record REJECTED for order {}: {}", order.id, e);
        }

        PlacementResult::rejected(&order.id, message)
    }
}
