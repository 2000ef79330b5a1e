//! reqwest-backed exchange transport.
//!
//! Posts SOAP 1.2 envelopes with a finite timeout behind a circuit breaker.
//! Logs operation, endpoint, latency and status only; request and response
//! bodies may carry tokens or passwords and are never logged. An error status
//! carrying a SOAP fault is reported as [`TransportError::Fault`] and does not
//! count against the circuit.

use crate::domain::repositories::exchange_transport::{
    ExchangeRequest, ExchangeTransport, TransportError,
};
use crate::infrastructure::circuit_breaker::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError,
};
use crate::protocol::fault_reason;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use url::Url;

pub struct HttpExchangeTransport {
    client: Client,
    endpoint: Url,
    timeout: Duration,
    breaker: CircuitBreaker,
}

impl HttpExchangeTransport {
    pub fn new(
        endpoint: Url,
        timeout: Duration,
        breaker: CircuitBreakerConfig,
    ) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Request(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint,
            timeout,
            breaker: CircuitBreaker::new("exchange", breaker),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn post(&self, request: &ExchangeRequest) -> Result<String, TransportError> {
        let started = Instant::now();

        let response = self
            .client
            .post(self.endpoint.clone())
            .header(
                CONTENT_TYPE,
                format!(
                    "application/soap+xml; charset=utf-8; action=\"{}\"",
                    request.action
                ),
            )
            .header("SOAPAction", request.action.as_str())
            .body(request.envelope.as_str().to_owned())
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        let latency_ms = started.elapsed().as_millis();

        if !status.is_success() {
            warn!(
                "{} to {} returned HTTP {} in {}ms",
                request.operation, self.endpoint, status, latency_ms
            );
            // SOAP 1.2 reports faults with 400/500; those are answers, not outages
            let fault = match response.text().await {
                Ok(body) => fault_reason(&body),
                Err(e) => {
                    debug!("Could not read HTTP {} body: {}", status, e);
                    None
                }
            };
            return Err(match fault {
                Some(reason) => TransportError::Fault {
                    status: status.as_u16(),
                    reason,
                },
                None => TransportError::HttpStatus {
                    status: status.as_u16(),
                },
            });
        }

        debug!(
            "{} to {} returned HTTP {} in {}ms",
            request.operation, self.endpoint, status, latency_ms
        );

        response.text().await.map_err(|e| self.classify(e))
    }

    fn classify(&self, error: reqwest::Error) -> TransportError {
        if error.is_timeout() {
            TransportError::Timeout {
                timeout_ms: self.timeout.as_millis() as u64,
            }
        } else if error.is_connect() {
            TransportError::Connection(error.to_string())
        } else {
            TransportError::Request(error.to_string())
        }
    }
}

#[async_trait]
impl ExchangeTransport for HttpExchangeTransport {
    async fn send(&self, request: ExchangeRequest) -> Result<String, TransportError> {
        match self
            .breaker
            .call(|| self.post(&request), TransportError::is_transient)
            .await
        {
            Ok(body) => Ok(body),
            Err(CircuitBreakerError::Open) => {
                warn!("{} refused: exchange circuit open", request.operation);
                Err(TransportError::CircuitOpen)
            }
            Err(CircuitBreakerError::Inner(e)) => {
                warn!("{} failed: {}", request.operation, e);
                Err(e)
            }
        }
    }
}
