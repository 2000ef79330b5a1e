pub mod client_directory;
pub mod credential_store;
pub mod exchange_transport;
pub mod order_repository;
pub mod token_issuer;
