pub mod circuit_breaker;
pub mod http_transport;
pub mod soap_token_issuer;
