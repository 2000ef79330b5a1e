//! Session tokens via the exchange `getPassword` operation

use crate::domain::entities::credentials::BrokerCredentials;
use crate::domain::repositories::exchange_transport::{ExchangeRequest, ExchangeTransport};
use crate::domain::repositories::token_issuer::{TokenError, TokenIssuer};
use crate::protocol::response::{parse_envelope, BodyContent, SUCCESS_CODE};
use crate::protocol::{Operation, SoapEncoder};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};
use zeroize::Zeroizing;

pub struct SoapTokenIssuer {
    transport: Arc<dyn ExchangeTransport>,
    encoder: SoapEncoder,
}

impl SoapTokenIssuer {
    pub fn new(transport: Arc<dyn ExchangeTransport>, encoder: SoapEncoder) -> Self {
        Self { transport, encoder }
    }
}

#[async_trait]
impl TokenIssuer for SoapTokenIssuer {
    async fn issue(&self, credentials: &BrokerCredentials) -> Result<Zeroizing<String>, TokenError> {
        let operation = Operation::GetPassword;
        let envelope = self.encoder.encode_children(
            operation,
            &[
                ("UserId", credentials.identity.user_id.as_str()),
                ("Password", credentials.password.as_str()),
                ("PassKey", credentials.pass_key.as_str()),
            ],
        );

        let body = Zeroizing::new(
            self.transport
                .send(ExchangeRequest {
                    action: operation.action(),
                    operation: operation.root_element(),
                    envelope,
                })
                .await?,
        );

        let parsed = parse_envelope(operation, &body).map_err(|e| TokenError::Malformed(e.to_string()))?;
        let raw = match parsed.content {
            BodyContent::Result(raw) => Zeroizing::new(raw),
            BodyContent::Fault(reason) => {
                return Err(TokenError::Malformed(format!("SOAP fault: {}", reason)))
            }
        };

        let (code, rest) = raw
            .trim()
            .split_once('|')
            .ok_or_else(|| TokenError::Malformed("token response not in code|token form".to_string()))?;

        if code != SUCCESS_CODE {
            warn!(
                "Token request for member {} refused with code {}",
                credentials.identity.member_id, code
            );
            return Err(TokenError::Rejected {
                code: code.to_string(),
                message: rest.to_string(),
            });
        }
        if rest.is_empty() || rest.contains('|') {
            return Err(TokenError::Malformed(
                "token response not in code|token form".to_string(),
            ));
        }

        info!("Session token issued for member {}", credentials.identity.member_id);
        Ok(Zeroizing::new(rest.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::credentials::BrokerIdentity;
    use crate::domain::repositories::exchange_transport::TransportError;
    use std::sync::Mutex;

    struct CannedTransport {
        reply: Result<String, TransportError>,
        seen: Mutex<Vec<String>>,
    }

    impl CannedTransport {
        fn new(reply: Result<String, TransportError>) -> Arc<Self> {
            Arc::new(Self {
                reply,
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ExchangeTransport for CannedTransport {
        async fn send(&self, request: ExchangeRequest) -> Result<String, TransportError> {
            self.seen.lock().unwrap().push(request.envelope.to_string());
            self.reply.clone()
        }
    }

    fn credentials() -> BrokerCredentials {
        BrokerCredentials {
            identity: BrokerIdentity {
                advisor_id: "adv-1".to_string(),
                member_id: "10001".to_string(),
                user_id: "1000101".to_string(),
                arn: None,
                euin: None,
            },
            password: Zeroizing::new("s3cret".to_string()),
            pass_key: Zeroizing::new("pk1".to_string()),
        }
    }

    fn reply(result: &str) -> String {
        format!(
            r#"<s:Envelope xmlns:s="http://www.w3.org/2003/05/soap-envelope"><s:Body><getPasswordResponse xmlns="http://bsestarmf.in/"><getPasswordResult>{}</getPasswordResult></getPasswordResponse></s:Body></s:Envelope>"#,
            result
        )
    }

    fn issuer(transport: Arc<CannedTransport>) -> SoapTokenIssuer {
        SoapTokenIssuer::new(transport, SoapEncoder::new("https://example.test/svc"))
    }

    #[tokio::test]
    async fn test_issues_token_from_success_reply() {
        let transport = CannedTransport::new(Ok(reply("100|TOKEN-ABC")));
        let token = issuer(transport.clone()).issue(&credentials()).await.unwrap();
        assert_eq!(token.as_str(), "TOKEN-ABC");

        let sent = transport.seen.lock().unwrap()[0].clone();
        assert!(sent.contains("<bses:UserId>1000101</bses:UserId>"));
        assert!(sent.contains("<bses:PassKey>pk1</bses:PassKey>"));
    }

    #[tokio::test]
    async fn test_rejected_credentials() {
        let transport = CannedTransport::new(Ok(reply("101|Invalid Password")));
        let err = issuer(transport).issue(&credentials()).await.unwrap_err();
        assert_eq!(
            err,
            TokenError::Rejected {
                code: "101".to_string(),
                message: "Invalid Password".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_transport_failure_passes_through() {
        let transport = CannedTransport::new(Err(TransportError::Timeout { timeout_ms: 30000 }));
        let err = issuer(transport).issue(&credentials()).await.unwrap_err();
        assert_eq!(
            err,
            TokenError::Transport(TransportError::Timeout { timeout_ms: 30000 })
        );
    }

    #[tokio::test]
    async fn test_unexpected_shape_is_malformed() {
        let transport = CannedTransport::new(Ok(reply("100|A|B")));
        let err = issuer(transport).issue(&credentials()).await.unwrap_err();
        assert!(matches!(err, TokenError::Malformed(_)));
    }
}
